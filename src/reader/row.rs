//! The row view: an ephemeral accessor over one row's value snapshot.

use std::borrow::Cow;
use std::sync::{Arc, RwLock};

use super::read_lock;
use super::value::{CellValue, CustomTypeRegistry, Value};
use crate::api::options::StringMode;
use crate::error::AccessError;
use crate::reader::decode;
use crate::schema::{ColumnKind, ParseOptions, Schema};
use crate::source::SharedBuffer;

/// Addresses a column by 0-based logical index or by name.
#[derive(Debug, Clone, Copy)]
pub enum ColumnRef<'a> {
    /// 0-based logical index.
    Index(usize),
    /// Column name.
    Name(&'a str),
}

impl From<usize> for ColumnRef<'_> {
    fn from(index: usize) -> Self {
        ColumnRef::Index(index)
    }
}

impl<'a> From<&'a str> for ColumnRef<'a> {
    fn from(name: &'a str) -> Self {
        ColumnRef::Name(name)
    }
}

/// A non-owning accessor bound to one row's value snapshot.
///
/// Only produced by [`RowStream`](super::RowStream) iteration, never
/// constructed directly. The view keeps the input buffer alive; string
/// access is zero-copy in lazy string mode.
///
/// In reuse mode the view aliases the session's single snapshot and must be
/// fully consumed (or its fields copied out) before the next advance; see
/// [`RowStream`](super::RowStream) for the aliasing contract.
pub struct RowView {
    schema: Arc<RwLock<Schema>>,
    values: Arc<RwLock<Vec<Value>>>,
    buffer: SharedBuffer,
    width: usize,
    version: u64,
    string_mode: StringMode,
    custom: Arc<CustomTypeRegistry>,
    row_number: usize,
}

impl RowView {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        schema: Arc<RwLock<Schema>>,
        values: Arc<RwLock<Vec<Value>>>,
        buffer: SharedBuffer,
        width: usize,
        version: u64,
        string_mode: StringMode,
        custom: Arc<CustomTypeRegistry>,
        row_number: usize,
    ) -> Self {
        Self {
            schema,
            values,
            buffer,
            width,
            version,
            string_mode,
            custom,
            row_number,
        }
    }

    /// 1-based data row number this view was issued for.
    pub fn row_number(&self) -> usize {
        self.row_number
    }

    /// Number of columns known when this view was issued.
    pub fn issued_width(&self) -> usize {
        self.width
    }

    /// Schema version when this view was issued.
    pub fn schema_version(&self) -> u64 {
        self.version
    }

    /// Current number of columns, reflecting widening.
    pub fn len(&self) -> usize {
        read_lock(&self.schema).len()
    }

    /// Whether no columns are known.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ordered `(name, kind)` pairs, reflecting widening at access time.
    pub fn schema(&self) -> Vec<(Arc<str>, ColumnKind)> {
        read_lock(&self.schema).fields()
    }

    /// Look up a cell by 0-based index or name.
    ///
    /// Lazy string columns materialize per the configured string mode: a
    /// zero-copy view into the shared buffer (owned only when escape
    /// sequences must collapse) or an independently owned string.
    ///
    /// A logical index beyond this view's snapshot (possible only when the
    /// view predates a later widening) yields `Missing`.
    ///
    /// # Errors
    /// An unknown name or out-of-range index is caller misuse and always
    /// surfaces as an [`AccessError`]; it is never converted to `Missing`.
    pub fn get<'a>(&self, col: impl Into<ColumnRef<'a>>) -> Result<CellValue<'_>, AccessError> {
        let logical = self.resolve(col.into())?;
        let value = self.slot(logical);
        Ok(self.materialize(logical, value))
    }

    /// Re-decode a lazy string cell's exact byte range as `kind`.
    ///
    /// Valid only for columns stored as lazy string spans; any other
    /// representation is caller misuse
    /// ([`AccessError::WrongRepresentation`]). A missing span yields
    /// `Missing`, as does a decode failure; decoding honors the column's
    /// parse options and matches slot decoding exactly. No side effects
    /// beyond reading the shared buffer.
    pub fn parse_as<'a>(
        &self,
        kind: ColumnKind,
        col: impl Into<ColumnRef<'a>>,
    ) -> Result<CellValue<'_>, AccessError> {
        let (span, opts) = match self.lazy_span(col.into())? {
            Some(found) => found,
            None => return Ok(CellValue::Missing),
        };
        let raw = span.bytes(self.buffer.as_ref());
        let content: Cow<'_, [u8]> = if span.is_escaped() {
            Cow::Owned(decode::unescape(raw, opts.quote, opts.escape))
        } else {
            Cow::Borrowed(raw)
        };
        let parsed = match kind {
            ColumnKind::Bool => decode::parse_bool(&content).map(CellValue::Bool),
            ColumnKind::Int16 => decode::parse_i16(&content).map(CellValue::Int16),
            ColumnKind::Int32 => decode::parse_i32(&content).map(CellValue::Int32),
            ColumnKind::Int64 => decode::parse_i64(&content).map(CellValue::Int64),
            ColumnKind::Int128 => decode::parse_i128(&content).map(CellValue::Int128),
            ColumnKind::Float64 => {
                decode::parse_f64(&content, opts.decimal).map(CellValue::Float64)
            }
            ColumnKind::Date => decode::parse_date(&content, &opts).map(CellValue::Date),
            ColumnKind::DateTime => {
                decode::parse_datetime(&content, &opts).map(CellValue::DateTime)
            }
            ColumnKind::Time => decode::parse_time(&content, &opts).map(CellValue::Time),
            ColumnKind::String | ColumnKind::Str | ColumnKind::Inline(_) => {
                Some(CellValue::Str(lossy_cow(content)))
            }
            ColumnKind::Custom(tag) => self
                .custom
                .lookup(tag)
                .and_then(|entry| (entry.decode)(&content, &opts))
                .map(CellValue::Custom),
            ColumnKind::Missing | ColumnKind::Code => None,
        };
        Ok(parsed.unwrap_or(CellValue::Missing))
    }

    /// Infer the best-fitting concrete value for a lazy string cell.
    ///
    /// Candidates are tried in priority order: boolean, integer, float,
    /// date, datetime, time. With no match the plain string value already
    /// present is returned. Deterministic: repeated calls on an unchanged
    /// span return equal results. Same preconditions as [`RowView::parse_as`].
    pub fn detect<'a>(&self, col: impl Into<ColumnRef<'a>>) -> Result<CellValue<'_>, AccessError> {
        let (span, opts) = match self.lazy_span(col.into())? {
            Some(found) => found,
            None => return Ok(CellValue::Missing),
        };
        let raw = span.bytes(self.buffer.as_ref());
        let content: Cow<'_, [u8]> = if span.is_escaped() {
            Cow::Owned(decode::unescape(raw, opts.quote, opts.escape))
        } else {
            Cow::Borrowed(raw)
        };
        if let Some(found) = decode::detect(&content, &opts) {
            return Ok(found);
        }
        Ok(CellValue::Str(lossy_cow(content)))
    }

    fn resolve(&self, col: ColumnRef<'_>) -> Result<usize, AccessError> {
        let schema = read_lock(&self.schema);
        match col {
            ColumnRef::Name(name) => schema
                .lookup(name)
                .ok_or_else(|| AccessError::UnknownColumn(name.to_string())),
            ColumnRef::Index(index) => {
                if index < schema.len() {
                    Ok(index)
                } else {
                    Err(AccessError::IndexOutOfRange {
                        index,
                        width: schema.len(),
                    })
                }
            }
        }
    }

    /// Copy the slot value at `logical` out of the snapshot.
    ///
    /// An index beyond the snapshot means the view predates a widening; the
    /// columns appended since then read as missing.
    fn slot(&self, logical: usize) -> Value {
        let values = read_lock(&self.values);
        values.get(logical).cloned().unwrap_or(Value::Missing)
    }

    /// Resolve a typed-parse target to its span, enforcing the lazy-string
    /// precondition. `Ok(None)` means the cell is missing.
    fn lazy_span(
        &self,
        col: ColumnRef<'_>,
    ) -> Result<Option<(super::span::Span, ParseOptions)>, AccessError> {
        let logical = self.resolve(col)?;
        let (name, declared, opts) = {
            let schema = read_lock(&self.schema);
            let column = schema
                .column(logical)
                .ok_or(AccessError::IndexOutOfRange {
                    index: logical,
                    width: schema.len(),
                })?;
            (Arc::clone(&column.name), column.kind, column.opts.clone())
        };
        if declared != ColumnKind::String {
            return Err(AccessError::WrongRepresentation {
                column: name.to_string(),
                kind: declared,
            });
        }
        match self.slot(logical) {
            Value::Lazy(span) if !span.is_missing() => Ok(Some((span, opts))),
            Value::Lazy(_) | Value::Missing => Ok(None),
            _ => Err(AccessError::WrongRepresentation {
                column: name.to_string(),
                kind: declared,
            }),
        }
    }

    fn materialize(&self, logical: usize, value: Value) -> CellValue<'_> {
        match value {
            Value::Missing => CellValue::Missing,
            Value::Lazy(span) => {
                if span.is_missing() {
                    return CellValue::Missing;
                }
                let (quote, escape) = {
                    let schema = read_lock(&self.schema);
                    match schema.column(logical) {
                        Some(column) => (column.opts.quote, column.opts.escape),
                        None => (b'"', b'"'),
                    }
                };
                let raw = span.bytes(self.buffer.as_ref());
                let text: Cow<'_, str> = if span.is_escaped() {
                    Cow::Owned(
                        String::from_utf8_lossy(&decode::unescape(raw, quote, escape))
                            .into_owned(),
                    )
                } else {
                    String::from_utf8_lossy(raw)
                };
                match self.string_mode {
                    StringMode::Lazy => CellValue::Str(text),
                    StringMode::Owned => CellValue::Str(Cow::Owned(text.into_owned())),
                }
            }
            Value::Int16(v) => CellValue::Int16(v),
            Value::Int32(v) => CellValue::Int32(v),
            Value::Int64(v) => CellValue::Int64(v),
            Value::Int128(v) => CellValue::Int128(v),
            Value::Float64(v) => CellValue::Float64(v),
            Value::Inline7(v) => CellValue::Str(Cow::Owned(v.as_str().to_string())),
            Value::Inline15(v) => CellValue::Str(Cow::Owned(v.as_str().to_string())),
            Value::Inline31(v) => CellValue::Str(Cow::Owned(v.as_str().to_string())),
            Value::Inline63(v) => CellValue::Str(Cow::Owned(v.as_str().to_string())),
            Value::Str(v) => CellValue::Str(Cow::Owned(v.to_string())),
            Value::Date(v) => CellValue::Date(v),
            Value::DateTime(v) => CellValue::DateTime(v),
            Value::Time(v) => CellValue::Time(v),
            Value::Bool(v) => CellValue::Bool(v),
            Value::Code(v) => CellValue::Code(v),
            Value::Custom(_, v) => CellValue::Custom(v),
        }
    }
}

impl std::fmt::Debug for RowView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowView")
            .field("row_number", &self.row_number)
            .field("issued_width", &self.width)
            .field("schema_version", &self.version)
            .finish()
    }
}

/// Lossily decode field bytes as UTF-8, borrowing where possible.
fn lossy_cow(content: Cow<'_, [u8]>) -> Cow<'_, str> {
    match content {
        Cow::Borrowed(bytes) => String::from_utf8_lossy(bytes),
        Cow::Owned(bytes) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
    }
}
