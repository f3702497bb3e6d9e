//! Low-memory streaming row reader for delimited text.
//!
//! This library iterates CSV-like input one row at a time, buffering only
//! the current row's decoded values. Each row is exposed as a lazily
//! materialized [`RowView`]: string fields stay as position+length spans
//! into the shared input buffer until a caller asks for them, and leaf
//! values default to strings unless explicit per-column types are declared.
//!
//! # Quick start
//!
//! ```
//! use railcar::{scan_csv_slice, ColumnKind, CsvOptions};
//!
//! # fn main() -> Result<(), railcar::ReaderError> {
//! let data = b"name,score\nada,92\ngrace,97\n";
//! let options = CsvOptions::new().with_column_type("score", ColumnKind::Int64);
//!
//! let mut rows = scan_csv_slice(data, options)?;
//! while let Some(row) = rows.advance()? {
//!     let name = row.get("name").unwrap();
//!     let score = row.get("score").unwrap();
//!     println!("{:?} scored {:?}", name.as_str(), score.as_i64());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Buffer reuse
//!
//! With [`CsvOptions::with_buffer_reuse`] enabled, every issued view aliases
//! one snapshot buffer that is overwritten on each advance. This removes the
//! per-row allocation, at the cost of a strict usage contract: consume or
//! copy a view's fields before the next advance. A retained view observes
//! the next row's data; that aliasing is the documented trade-off, not a
//! bug.
//!
//! # Ragged input
//!
//! When a row carries more raw fields than previously known, the schema
//! widens: synthetic `Column<k>` names are appended and iteration continues.
//! Widening is monotonic for the life of a stream and never retroactively
//! changes values in previously issued views; earlier rows read as missing
//! in the appended columns.

pub mod api;
pub mod error;
pub mod reader;
pub mod schema;
pub mod source;

// Re-export main types
pub use api::{
    read_schema, scan_csv, scan_csv_buffer, scan_csv_slice, ColumnSelection, ColumnTarget,
    CsvOptions, StringMode, TypeSpec,
};
pub use error::{AccessError, ReadWarning, ReaderError, SourceError, WarningKind};
pub use reader::{
    CellValue, CodePool, ColumnRef, CustomDecodeFn, CustomScalar, CustomType, CustomTypeRegistry,
    InlineStr, RowStream, RowView, Span, TypeTag, Value,
};
pub use schema::{Column, ColumnKind, InlineTier, ParseOptions, Schema};
pub use source::SharedBuffer;
