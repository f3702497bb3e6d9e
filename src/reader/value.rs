//! Column slot values, materialized cells, and the custom-type registry.
//!
//! [`Value`] is the closed set of physical representations a column slot can
//! hold during streaming. Dispatch over it is a plain `match`, so an unknown
//! representation is a compile-time impossibility; the open extension point
//! is [`CustomTypeRegistry`], consulted only for `Custom`-kinded columns.

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::span::Span;
use crate::schema::ParseOptions;

/// A fixed-capacity inline string of at most `N` bytes.
///
/// Short text stored directly in the slot, with no heap allocation. The
/// capacity tiers exposed through column kinds are 7, 15, 31 and 63 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineStr<const N: usize> {
    len: u8,
    buf: [u8; N],
}

impl<const N: usize> InlineStr<N> {
    /// Store `text` inline, or `None` if it exceeds the capacity.
    pub fn new(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() > N {
            return None;
        }
        let mut buf = [0u8; N];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(Self {
            len: bytes.len() as u8,
            buf,
        })
    }

    /// Store raw bytes inline; they must be valid UTF-8 and fit the capacity.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        std::str::from_utf8(bytes).ok().and_then(Self::new)
    }

    /// The stored text.
    pub fn as_str(&self) -> &str {
        // Only constructed from validated UTF-8.
        std::str::from_utf8(&self.buf[..self.len as usize]).unwrap_or("")
    }

    /// Length of the stored text in bytes.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether the stored text is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Identifier for a registered custom representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag(pub u32);

/// A caller-defined scalar stored in `Custom`-kinded column slots.
pub trait CustomScalar: fmt::Debug + Send + Sync {
    /// Downcasting hook for callers that know the concrete type.
    fn as_any(&self) -> &dyn Any;
    /// Canonical text form of the value.
    fn render(&self) -> String;
}

/// Decode raw field bytes into a custom scalar; `None` means decode failure.
pub type CustomDecodeFn = fn(&[u8], &ParseOptions) -> Option<Arc<dyn CustomScalar>>;

/// One registered extension representation.
#[derive(Clone)]
pub struct CustomType {
    /// Tag matching [`ColumnKind::Custom`](crate::schema::ColumnKind).
    pub tag: TypeTag,
    /// Human-readable name used in diagnostics.
    pub name: Arc<str>,
    /// Field decoder for this representation.
    pub decode: CustomDecodeFn,
}

/// Ordered, open table of extension representations.
///
/// Entries are checked in registration order when a column's declared kind
/// falls outside the closed built-in set. Registering the same tag twice is
/// allowed; the earlier registration wins.
#[derive(Clone, Default)]
pub struct CustomTypeRegistry {
    entries: Vec<CustomType>,
}

impl CustomTypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a representation to the registry.
    pub fn register(&mut self, tag: TypeTag, name: impl Into<Arc<str>>, decode: CustomDecodeFn) {
        self.entries.push(CustomType {
            tag,
            name: name.into(),
            decode,
        });
    }

    /// Find the first entry registered for `tag`.
    pub fn lookup(&self, tag: TypeTag) -> Option<&CustomType> {
        self.entries.iter().find(|entry| entry.tag == tag)
    }

    /// Number of registered representations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CustomTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.entries.iter().map(|e| e.name.as_ref()).collect();
        f.debug_struct("CustomTypeRegistry")
            .field("entries", &names)
            .finish()
    }
}

/// Per-column intern table backing `Code`-kinded columns.
///
/// Maps distinct field text to dense `u32` codes in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct CodePool {
    strings: Vec<Arc<str>>,
    index: HashMap<Arc<str>, u32>,
}

impl CodePool {
    /// Intern `text`, returning its stable code.
    pub fn intern(&mut self, text: &str) -> u32 {
        if let Some(&code) = self.index.get(text) {
            return code;
        }
        let code = self.strings.len() as u32;
        let shared: Arc<str> = Arc::from(text);
        self.strings.push(Arc::clone(&shared));
        self.index.insert(shared, code);
        code
    }

    /// Resolve a code back to its text.
    pub fn get(&self, code: u32) -> Option<&str> {
        self.strings.get(code as usize).map(|s| s.as_ref())
    }

    /// Number of distinct interned strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// A single decoded value for the current row of one logical column.
///
/// Exactly one variant exists per declared
/// [`ColumnKind`](crate::schema::ColumnKind). Cloning is cheap: lazy spans
/// copy coordinates, not text, and owned variants are reference-counted.
#[derive(Debug, Clone)]
pub enum Value {
    /// The missing sentinel.
    Missing,
    /// Lazy string span into the shared input buffer.
    Lazy(Span),
    /// 16-bit signed integer.
    Int16(i16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 128-bit signed integer.
    Int128(i128),
    /// 64-bit IEEE 754 floating point.
    Float64(f64),
    /// Inline string, 7-byte tier.
    Inline7(InlineStr<7>),
    /// Inline string, 15-byte tier.
    Inline15(InlineStr<15>),
    /// Inline string, 31-byte tier.
    Inline31(InlineStr<31>),
    /// Inline string, 63-byte tier.
    Inline63(InlineStr<63>),
    /// Owned, independently allocated string.
    Str(Arc<str>),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time of day.
    DateTime(NaiveDateTime),
    /// Time of day.
    Time(NaiveTime),
    /// Boolean.
    Bool(bool),
    /// Raw pooled code; resolve through the session's [`CodePool`].
    Code(u32),
    /// Caller-defined scalar from the custom-type registry.
    Custom(TypeTag, Arc<dyn CustomScalar>),
}

impl Value {
    /// Whether this slot holds the missing sentinel, including a lazy span
    /// flagged missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Lazy(span) => span.is_missing(),
            _ => false,
        }
    }
}

/// A materialized cell handed to callers by `RowView` accessors.
///
/// String content borrows from the shared input buffer in lazy string mode
/// (`Cow::Borrowed`) and is owned otherwise.
#[derive(Debug, Clone)]
pub enum CellValue<'a> {
    /// The missing sentinel.
    Missing,
    /// String content.
    Str(Cow<'a, str>),
    /// 16-bit signed integer.
    Int16(i16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 128-bit signed integer.
    Int128(i128),
    /// 64-bit IEEE 754 floating point.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time of day.
    DateTime(NaiveDateTime),
    /// Time of day.
    Time(NaiveTime),
    /// Raw pooled code.
    Code(u32),
    /// Caller-defined scalar.
    Custom(Arc<dyn CustomScalar>),
}

impl<'a> CellValue<'a> {
    /// Whether this cell is missing.
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// String content, if this cell is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Str(text) => Some(text.as_ref()),
            _ => None,
        }
    }

    /// Integer content widened to `i64`, if it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int16(v) => Some(*v as i64),
            CellValue::Int32(v) => Some(*v as i64),
            CellValue::Int64(v) => Some(*v),
            CellValue::Int128(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Integer content widened to `i128`.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            CellValue::Int16(v) => Some(*v as i128),
            CellValue::Int32(v) => Some(*v as i128),
            CellValue::Int64(v) => Some(*v as i128),
            CellValue::Int128(v) => Some(*v),
            _ => None,
        }
    }

    /// Float content, widening integer cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float64(v) => Some(*v),
            CellValue::Int16(v) => Some(*v as f64),
            CellValue::Int32(v) => Some(*v as f64),
            CellValue::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Boolean content.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Date content.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(v) => Some(*v),
            _ => None,
        }
    }

    /// Datetime content.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// Time content.
    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            CellValue::Time(v) => Some(*v),
            _ => None,
        }
    }

    /// Detach the cell from the input buffer.
    pub fn into_owned(self) -> CellValue<'static> {
        match self {
            CellValue::Missing => CellValue::Missing,
            CellValue::Str(text) => CellValue::Str(Cow::Owned(text.into_owned())),
            CellValue::Int16(v) => CellValue::Int16(v),
            CellValue::Int32(v) => CellValue::Int32(v),
            CellValue::Int64(v) => CellValue::Int64(v),
            CellValue::Int128(v) => CellValue::Int128(v),
            CellValue::Float64(v) => CellValue::Float64(v),
            CellValue::Bool(v) => CellValue::Bool(v),
            CellValue::Date(v) => CellValue::Date(v),
            CellValue::DateTime(v) => CellValue::DateTime(v),
            CellValue::Time(v) => CellValue::Time(v),
            CellValue::Code(v) => CellValue::Code(v),
            CellValue::Custom(v) => CellValue::Custom(v),
        }
    }
}

impl PartialEq for CellValue<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Missing, CellValue::Missing) => true,
            (CellValue::Str(a), CellValue::Str(b)) => a == b,
            (CellValue::Int16(a), CellValue::Int16(b)) => a == b,
            (CellValue::Int32(a), CellValue::Int32(b)) => a == b,
            (CellValue::Int64(a), CellValue::Int64(b)) => a == b,
            (CellValue::Int128(a), CellValue::Int128(b)) => a == b,
            (CellValue::Float64(a), CellValue::Float64(b)) => a == b,
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            (CellValue::Date(a), CellValue::Date(b)) => a == b,
            (CellValue::DateTime(a), CellValue::DateTime(b)) => a == b,
            (CellValue::Time(a), CellValue::Time(b)) => a == b,
            (CellValue::Code(a), CellValue::Code(b)) => a == b,
            (CellValue::Custom(a), CellValue::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
