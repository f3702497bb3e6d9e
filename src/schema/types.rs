//! Column kinds, per-column parse options, and column descriptors.

use std::sync::Arc;

use crate::reader::value::TypeTag;

/// Capacity tiers for inline string columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineTier {
    /// Up to 7 bytes.
    S7,
    /// Up to 15 bytes.
    S15,
    /// Up to 31 bytes.
    S31,
    /// Up to 63 bytes.
    S63,
}

impl InlineTier {
    /// Maximum stored length in bytes.
    pub fn capacity(self) -> usize {
        match self {
            InlineTier::S7 => 7,
            InlineTier::S15 => 15,
            InlineTier::S31 => 31,
            InlineTier::S63 => 63,
        }
    }

    /// Smallest tier that can hold `len` bytes.
    pub fn for_len(len: usize) -> Option<Self> {
        match len {
            0..=7 => Some(InlineTier::S7),
            8..=15 => Some(InlineTier::S15),
            16..=31 => Some(InlineTier::S31),
            32..=63 => Some(InlineTier::S63),
            _ => None,
        }
    }
}

/// Declared physical representation of a column.
///
/// `String` is the default for undeclared columns: field text stays in the
/// input buffer as a lazy span until a caller materializes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Lazy string span into the shared input buffer.
    String,
    /// Missing-only column; every cell decodes to the missing sentinel.
    Missing,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 128-bit signed integer.
    Int128,
    /// 64-bit IEEE 754 floating point.
    Float64,
    /// Fixed-capacity inline string of the given tier.
    Inline(InlineTier),
    /// Owned, independently allocated string.
    Str,
    /// Calendar date.
    Date,
    /// Date and time of day.
    DateTime,
    /// Time of day.
    Time,
    /// Boolean.
    Bool,
    /// Pooled code; field text is interned per column and the slot stores
    /// the raw `u32` code.
    Code,
    /// Caller-defined representation resolved through the custom-type
    /// registry.
    Custom(TypeTag),
}

/// Per-column tokenization and value-parsing rules.
///
/// Every column carries its own copy so heterogeneous formatting (a comma
/// decimal separator in one column, a bespoke date format in another) does
/// not leak across columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Quote byte opening and closing quoted fields.
    pub quote: u8,
    /// Escape byte inside quoted fields; equal to `quote` for doubled-quote
    /// escaping.
    pub escape: u8,
    /// Decimal separator byte for float parsing.
    pub decimal: u8,
    /// Date format (chrono syntax); ISO `%Y-%m-%d` when absent.
    pub date_format: Option<String>,
    /// Datetime format; ISO with `T` or space separator when absent.
    pub datetime_format: Option<String>,
    /// Time format; `%H:%M:%S%.f` when absent.
    pub time_format: Option<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            escape: b'"',
            decimal: b'.',
            date_format: None,
            datetime_format: None,
            time_format: None,
        }
    }
}

/// Descriptor for one logical (selected) column.
#[derive(Debug, Clone)]
pub struct Column {
    /// Column name, unique within the schema.
    pub name: Arc<str>,
    /// Position among currently selected columns.
    pub logical: usize,
    /// Raw position of the field in a source row.
    pub physical: usize,
    /// Declared physical representation.
    pub kind: ColumnKind,
    /// Tokenization and value-parsing rules for this column.
    pub opts: ParseOptions,
}
