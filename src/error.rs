//! Error and warning types for streaming reads.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::schema::ColumnKind;

/// Errors that can occur while acquiring the raw input bytes.
#[derive(Debug, Error)]
pub enum SourceError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Path not found
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Caller misuse of a [`RowView`](crate::reader::RowView) accessor.
///
/// Every variant signals a programming error, never a data condition: an
/// unknown column name or out-of-range index is always surfaced rather than
/// silently converted to a missing value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The given name is not a known column.
    #[error("unknown column name: {0:?}")]
    UnknownColumn(String),
    /// The given 0-based index is outside the current column count.
    #[error("column index {index} out of range for {width} columns")]
    IndexOutOfRange {
        /// The index the caller asked for.
        index: usize,
        /// The number of columns currently known.
        width: usize,
    },
    /// `parse_as`/`detect` was called on a column that is not stored as a
    /// lazy string span.
    #[error("column {column:?} is stored as {kind:?}; typed parsing requires a lazy string column")]
    WrongRepresentation {
        /// Name of the offending column.
        column: String,
        /// The column's declared representation.
        kind: ColumnKind,
    },
}

/// Top-level fatal error type for streaming reads.
///
/// Recoverable cell-level failures never surface here; they become
/// [`ReadWarning`]s unless strict mode is enabled.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Source error
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Invalid construction-time configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A cell failed to decode while strict mode is enabled.
    #[error("malformed cell in column {column:?}, row {row}, offset {offset}: {message}")]
    MalformedCell {
        /// 1-based data row number.
        row: usize,
        /// Name of the column whose cell failed to decode.
        column: String,
        /// Byte offset of the cell in the input buffer.
        offset: u64,
        /// Human-readable failure description.
        message: String,
    },

    /// The schema registry and a column slot fell out of sync.
    ///
    /// This indicates a bug in the reader, not a problem with the data.
    #[error("internal representation mismatch in column {column:?}, row {row}: {message}")]
    Internal {
        /// 1-based data row number.
        row: usize,
        /// Name of the column whose slot did not match its declared kind.
        column: String,
        /// Description of the mismatch.
        message: String,
    },

    /// Accessor misuse surfaced through a fallible entry point.
    #[error(transparent)]
    Access(#[from] AccessError),
}

/// Types of recoverable cell-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A cell's bytes could not be decoded as the column's declared type.
    MalformedCell,
    /// A row produced fewer fields than the known column count.
    MissingFields,
    /// A quoted field was not closed before the end of the input.
    UnterminatedQuote,
    /// Extra characters followed a closing quote before the next delimiter.
    TrailingCharacters,
}

/// A recoverable condition recorded during iteration.
///
/// Warnings are rate-limited by the configured `max_warnings`; once the cap
/// is reached further warnings are silently dropped and iteration continues
/// unaffected.
#[derive(Debug, Clone)]
pub struct ReadWarning {
    /// The kind of condition that occurred.
    pub kind: WarningKind,
    /// 1-based data row number where the condition occurred.
    pub row: usize,
    /// Column name, when the condition is attributable to one column.
    pub column: Option<Arc<str>>,
    /// Byte offset in the input buffer.
    pub offset: u64,
    /// Human-readable description.
    pub message: String,
}

impl std::fmt::Display for ReadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.column {
            Some(column) => write!(
                f,
                "{:?} in column {:?}, row {}, offset {}: {}",
                self.kind, column, self.row, self.offset, self.message
            ),
            None => write!(
                f,
                "{:?} in row {}, offset {}: {}",
                self.kind, self.row, self.offset, self.message
            ),
        }
    }
}
