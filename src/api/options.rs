//! Construction-time configuration for streaming reads.

use crate::error::ReaderError;
use crate::reader::value::{CustomDecodeFn, CustomTypeRegistry, TypeTag};
use crate::schema::{ColumnKind, ParseOptions};

use super::columns::ColumnSelection;

/// How lazy string columns materialize when accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringMode {
    /// Zero-copy view into the shared input buffer; allocates only when a
    /// field contains escape sequences.
    #[default]
    Lazy,
    /// Every access returns an independently owned string.
    Owned,
}

/// Addresses one column for a per-column override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnTarget {
    /// By resolved column name.
    Name(String),
    /// By 0-based logical index.
    Index(usize),
}

impl From<&str> for ColumnTarget {
    fn from(name: &str) -> Self {
        ColumnTarget::Name(name.to_string())
    }
}

impl From<String> for ColumnTarget {
    fn from(name: String) -> Self {
        ColumnTarget::Name(name)
    }
}

impl From<usize> for ColumnTarget {
    fn from(index: usize) -> Self {
        ColumnTarget::Index(index)
    }
}

/// A declared non-default representation for one column.
#[derive(Debug, Clone)]
pub struct TypeSpec {
    /// Which column the declaration applies to.
    pub target: ColumnTarget,
    /// The declared representation.
    pub kind: ColumnKind,
    /// Optional format string for temporal kinds (chrono syntax).
    pub format: Option<String>,
}

/// Options controlling how delimited text is read.
///
/// # Example
/// ```
/// use railcar::{ColumnKind, CsvOptions};
///
/// let options = CsvOptions::new()
///     .with_delimiter(b';')
///     .with_column_type("count", ColumnKind::Int64)
///     .with_missing_values(["NA"])
///     .with_limit(1000);
/// ```
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter byte (default: `,`).
    pub delimiter: u8,
    /// Quote byte (default: `"`).
    pub quote: u8,
    /// Escape byte inside quoted fields (default: `"`, i.e. doubled quotes).
    pub escape: u8,
    /// Decimal separator for float parsing (default: `.`).
    pub decimal: u8,
    /// Whether the first non-skipped row holds column names (default: true).
    pub header: bool,
    /// Explicit column names, overriding any header row.
    pub names: Option<Vec<String>>,
    /// Rows to skip before the header (default: 0).
    pub skip_rows: usize,
    /// Maximum number of data rows to produce.
    pub limit: Option<usize>,
    /// Restrict the logical columns to this selection.
    pub select: Option<ColumnSelection>,
    /// Exclude these columns; mutually exclusive with `select`.
    pub drop: Option<ColumnSelection>,
    /// Per-column representation declarations.
    pub types: Vec<TypeSpec>,
    /// Default date format (chrono syntax); ISO when absent.
    pub date_format: Option<String>,
    /// Default datetime format; ISO when absent.
    pub datetime_format: Option<String>,
    /// Default time format; `%H:%M:%S%.f` when absent.
    pub time_format: Option<String>,
    /// Byte sequences decoding to the missing sentinel (default: `[""]`).
    pub missing_values: Vec<String>,
    /// Lazy zero-copy vs. owned string materialization.
    pub string_mode: StringMode,
    /// Reuse one shared snapshot buffer across rows (default: false).
    ///
    /// When enabled, every issued row view aliases the same snapshot, which
    /// is destructively overwritten on each advance. A view must be fully
    /// consumed before the next advance; a retained view observes the next
    /// row's data.
    pub reuse_buffer: bool,
    /// Abort iteration on the first malformed cell instead of recording a
    /// warning (default: false).
    pub strict: bool,
    /// Cap on emitted malformed-cell warnings (default: 100).
    pub max_warnings: usize,
    /// Extension representations available to `ColumnKind::Custom` columns.
    pub custom_types: CustomTypeRegistry,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            escape: b'"',
            decimal: b'.',
            header: true,
            names: None,
            skip_rows: 0,
            limit: None,
            select: None,
            drop: None,
            types: Vec::new(),
            date_format: None,
            datetime_format: None,
            time_format: None,
            missing_values: vec![String::new()],
            string_mode: StringMode::Lazy,
            reuse_buffer: false,
            strict: false,
            max_warnings: 100,
            custom_types: CustomTypeRegistry::new(),
        }
    }
}

impl CsvOptions {
    /// Options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the quote byte.
    pub fn with_quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    /// Set the escape byte used inside quoted fields.
    pub fn with_escape(mut self, escape: u8) -> Self {
        self.escape = escape;
        self
    }

    /// Set the decimal separator for float parsing.
    pub fn with_decimal_separator(mut self, decimal: u8) -> Self {
        self.decimal = decimal;
        self
    }

    /// Declare whether the input starts with a header row.
    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    /// Provide explicit column names.
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Skip this many rows before reading the header.
    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    /// Produce at most this many data rows.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Restrict the logical columns to a selection.
    pub fn with_select(mut self, selection: ColumnSelection) -> Self {
        self.select = Some(selection);
        self
    }

    /// Exclude the selected columns.
    pub fn with_drop(mut self, selection: ColumnSelection) -> Self {
        self.drop = Some(selection);
        self
    }

    /// Declare a column's representation.
    pub fn with_column_type(mut self, target: impl Into<ColumnTarget>, kind: ColumnKind) -> Self {
        self.types.push(TypeSpec {
            target: target.into(),
            kind,
            format: None,
        });
        self
    }

    /// Declare a temporal column's representation together with its format.
    pub fn with_column_type_format(
        mut self,
        target: impl Into<ColumnTarget>,
        kind: ColumnKind,
        format: impl Into<String>,
    ) -> Self {
        self.types.push(TypeSpec {
            target: target.into(),
            kind,
            format: Some(format.into()),
        });
        self
    }

    /// Set the default date format.
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    /// Set the default datetime format.
    pub fn with_datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_format = Some(format.into());
        self
    }

    /// Set the default time format.
    pub fn with_time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = Some(format.into());
        self
    }

    /// Replace the missing-value sentinels.
    pub fn with_missing_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Set the string materialization mode.
    pub fn with_string_mode(mut self, mode: StringMode) -> Self {
        self.string_mode = mode;
        self
    }

    /// Materialize strings as independently owned values.
    pub fn owned_strings(mut self) -> Self {
        self.string_mode = StringMode::Owned;
        self
    }

    /// Toggle destructive snapshot-buffer reuse.
    pub fn with_buffer_reuse(mut self, reuse: bool) -> Self {
        self.reuse_buffer = reuse;
        self
    }

    /// Abort on the first malformed cell.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Cap the number of emitted warnings.
    pub fn with_max_warnings(mut self, max_warnings: usize) -> Self {
        self.max_warnings = max_warnings;
        self
    }

    /// Register an extension representation for `ColumnKind::Custom` columns.
    pub fn with_custom_type(
        mut self,
        tag: TypeTag,
        name: impl Into<std::sync::Arc<str>>,
        decode: CustomDecodeFn,
    ) -> Self {
        self.custom_types.register(tag, name, decode);
        self
    }

    /// The global tokenization and parsing rules, as a per-column template.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            delimiter: self.delimiter,
            quote: self.quote,
            escape: self.escape,
            decimal: self.decimal,
            date_format: self.date_format.clone(),
            datetime_format: self.datetime_format.clone(),
            time_format: self.time_format.clone(),
        }
    }

    /// Check the options for internally inconsistent settings.
    pub fn validate(&self) -> Result<(), ReaderError> {
        if self.delimiter == self.quote {
            return Err(ReaderError::Configuration(
                "delimiter and quote must differ".to_string(),
            ));
        }
        for byte in [self.delimiter, self.quote] {
            if byte == b'\r' || byte == b'\n' {
                return Err(ReaderError::Configuration(
                    "delimiter and quote must not be row terminators".to_string(),
                ));
            }
        }
        if self.select.is_some() && self.drop.is_some() {
            return Err(ReaderError::Configuration(
                "select and drop are mutually exclusive".to_string(),
            ));
        }
        for spec in &self.types {
            if let ColumnKind::Custom(tag) = spec.kind {
                if self.custom_types.lookup(tag).is_none() {
                    return Err(ReaderError::Configuration(format!(
                        "no custom type registered for tag {:?}",
                        tag
                    )));
                }
            }
        }
        Ok(())
    }
}
