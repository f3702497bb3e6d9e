//! Public configuration and entry points.

pub mod columns;
pub mod options;
pub mod read;

pub use columns::{resolve_drop, resolve_selection, ColumnSelection};
pub use options::{ColumnTarget, CsvOptions, StringMode, TypeSpec};
pub use read::{read_schema, scan_csv, scan_csv_buffer, scan_csv_slice};
