//! Streaming row reader components.
//!
//! This module holds the reading pipeline: the row-parse primitive, typed
//! field decoding ([`decode`]), the per-session state machine ([`stream`]),
//! and the per-row accessor ([`row`]).

pub(crate) mod context;
pub mod decode;
pub mod row;
pub(crate) mod scan;
pub mod span;
pub mod stream;
pub mod value;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use row::{ColumnRef, RowView};
pub use span::Span;
pub use stream::RowStream;
pub use value::{
    CellValue, CodePool, CustomDecodeFn, CustomScalar, CustomType, CustomTypeRegistry, InlineStr,
    TypeTag, Value,
};

/// Acquire a read guard, tolerating lock poisoning.
///
/// A poisoned lock only means a panic unwound mid-access elsewhere; the
/// protected data is still structurally valid for reading.
pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Acquire a write guard, tolerating lock poisoning.
pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
