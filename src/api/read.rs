//! Entry points for opening streaming reads.

use std::path::Path;
use std::sync::Arc;

use crate::error::ReaderError;
use crate::reader::context::ReadContext;
use crate::reader::RowStream;
use crate::schema::ColumnKind;
use crate::source::SharedBuffer;

use super::options::CsvOptions;

/// Open a local file for streaming row iteration.
///
/// The file is memory-mapped; no data row is decoded until the stream is
/// advanced.
///
/// # Example
/// ```no_run
/// use railcar::{scan_csv, CsvOptions};
///
/// # fn main() -> Result<(), railcar::ReaderError> {
/// let mut rows = scan_csv("data.csv", CsvOptions::default())?;
/// while let Some(row) = rows.advance()? {
///     println!("{:?}", row.get("name"));
/// }
/// # Ok(())
/// # }
/// ```
pub fn scan_csv(path: impl AsRef<Path>, options: CsvOptions) -> Result<RowStream, ReaderError> {
    let buffer = SharedBuffer::open_path(path)?;
    scan_csv_buffer(buffer, options)
}

/// Open an in-memory slice for streaming row iteration.
///
/// The slice is copied once into a shared buffer; rows then reference that
/// buffer without further copying.
pub fn scan_csv_slice(data: &[u8], options: CsvOptions) -> Result<RowStream, ReaderError> {
    scan_csv_buffer(SharedBuffer::from_slice(data), options)
}

/// Open an already-shared buffer for streaming row iteration.
pub fn scan_csv_buffer(
    buffer: SharedBuffer,
    options: CsvOptions,
) -> Result<RowStream, ReaderError> {
    let ctx = ReadContext::build(buffer, options)?;
    Ok(RowStream::new(ctx))
}

/// Resolve a file's schema without iterating any data rows.
///
/// Returns the ordered `(name, kind)` pairs the stream would start with;
/// widening during a later iteration can extend this.
pub fn read_schema(
    path: impl AsRef<Path>,
    options: CsvOptions,
) -> Result<Vec<(Arc<str>, ColumnKind)>, ReaderError> {
    let buffer = SharedBuffer::open_path(path)?;
    let ctx = ReadContext::build(buffer, options)?;
    Ok(ctx.schema.fields())
}
