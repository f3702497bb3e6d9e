//! Column selection and resolution against header names.

use std::sync::Arc;

use crate::error::ReaderError;

/// Column selection by name or 0-based raw index.
///
/// # Example
/// ```
/// use railcar::ColumnSelection;
///
/// let by_name = ColumnSelection::from_names(["id", "name"]);
/// let by_index = ColumnSelection::from_indices([0, 2]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnSelection {
    /// Select columns by name.
    Names(Vec<Arc<str>>),
    /// Select columns by 0-based raw index.
    Indices(Vec<usize>),
}

impl ColumnSelection {
    /// Create a selection from names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self::Names(names.into_iter().map(Into::into).collect())
    }

    /// Create a selection from 0-based raw indices.
    pub fn from_indices<I>(indices: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        Self::Indices(indices.into_iter().collect())
    }

    /// Whether the selection names no columns.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Names(names) => names.is_empty(),
            Self::Indices(indices) => indices.is_empty(),
        }
    }

    /// Number of columns selected.
    pub fn len(&self) -> usize {
        match self {
            Self::Names(names) => names.len(),
            Self::Indices(indices) => indices.len(),
        }
    }
}

/// Resolve a selection to sorted, deduplicated raw indices.
///
/// Raw indices must stay strictly increasing in logical order, so the
/// selection's own ordering is not preserved.
///
/// # Errors
/// Returns [`ReaderError::Configuration`] for an unknown name or an
/// out-of-range index.
pub fn resolve_selection(
    selection: &ColumnSelection,
    header: &[Arc<str>],
) -> Result<Vec<usize>, ReaderError> {
    let mut physical = match selection {
        ColumnSelection::Names(names) => {
            let mut resolved = Vec::with_capacity(names.len());
            for name in names {
                let index = header
                    .iter()
                    .position(|h| h.as_ref() == name.as_ref())
                    .ok_or_else(|| {
                        ReaderError::Configuration(format!("unknown column name: {:?}", name))
                    })?;
                resolved.push(index);
            }
            resolved
        }
        ColumnSelection::Indices(indices) => {
            for &index in indices {
                if index >= header.len() {
                    return Err(ReaderError::Configuration(format!(
                        "column index {} out of range for {} columns",
                        index,
                        header.len()
                    )));
                }
            }
            indices.clone()
        }
    };
    physical.sort_unstable();
    physical.dedup();
    Ok(physical)
}

/// Resolve a drop-selection to the raw indices that remain.
pub fn resolve_drop(
    selection: &ColumnSelection,
    header: &[Arc<str>],
) -> Result<Vec<usize>, ReaderError> {
    let dropped = resolve_selection(selection, header)?;
    Ok((0..header.len())
        .filter(|index| !dropped.contains(index))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<Arc<str>> {
        names.iter().map(|n| Arc::from(*n)).collect()
    }

    #[test]
    fn test_selection_constructors() {
        let names = ColumnSelection::from_names(["a", "b"]);
        assert_eq!(names.len(), 2);
        assert!(!names.is_empty());

        let indices = ColumnSelection::from_indices([3, 1]);
        assert_eq!(indices.len(), 2);
    }

    #[test]
    fn test_resolve_names() {
        let header = header(&["a", "b", "c"]);
        let selection = ColumnSelection::from_names(["c", "a"]);
        let physical = resolve_selection(&selection, &header).unwrap();
        assert_eq!(physical, vec![0, 2]);
    }

    #[test]
    fn test_resolve_unknown_name() {
        let header = header(&["a", "b"]);
        let selection = ColumnSelection::from_names(["nope"]);
        assert!(matches!(
            resolve_selection(&selection, &header),
            Err(ReaderError::Configuration(_))
        ));
    }

    #[test]
    fn test_resolve_indices_sorted_and_deduped() {
        let header = header(&["a", "b", "c"]);
        let selection = ColumnSelection::from_indices([2, 0, 2]);
        let physical = resolve_selection(&selection, &header).unwrap();
        assert_eq!(physical, vec![0, 2]);
    }

    #[test]
    fn test_resolve_index_out_of_range() {
        let header = header(&["a"]);
        let selection = ColumnSelection::from_indices([1]);
        assert!(matches!(
            resolve_selection(&selection, &header),
            Err(ReaderError::Configuration(_))
        ));
    }

    #[test]
    fn test_resolve_drop() {
        let header = header(&["a", "b", "c"]);
        let selection = ColumnSelection::from_names(["b"]);
        let physical = resolve_drop(&selection, &header).unwrap();
        assert_eq!(physical, vec![0, 2]);
    }
}
