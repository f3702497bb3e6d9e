//! The schema registry: the ordered set of logical columns currently known.
//!
//! The registry is mutable only by widening, which appends columns when a
//! row reports more raw fields than previously seen. It never shrinks, and
//! every widening bumps a version counter so row views can detect that they
//! predate a later schema state.

mod types;

use std::collections::HashMap;
use std::sync::Arc;

pub use types::{Column, ColumnKind, InlineTier, ParseOptions};

/// Ordered registry of the currently selected columns.
///
/// Invariants, maintained by construction and by [`Schema::widen`]:
/// - `names.len() == columnmap.len() == columns.len()` at all times;
/// - physical indices are strictly increasing in logical order;
/// - names are unique (collisions are uniquified with a `_<n>` suffix).
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<Column>,
    names: Vec<Arc<str>>,
    lookup: HashMap<Arc<str>, usize>,
    columnmap: Vec<usize>,
    /// Raw field count known from the source, independent of selection.
    known_physical: usize,
    /// Options template applied to columns appended by widening.
    widen_opts: ParseOptions,
    version: u64,
}

impl Schema {
    /// Build a registry from resolved column descriptors.
    ///
    /// `known_physical` is the raw field count observed at setup time; it can
    /// exceed the selected column count when some columns were dropped.
    pub fn new(mut columns: Vec<Column>, known_physical: usize, widen_opts: ParseOptions) -> Self {
        let mut names = Vec::with_capacity(columns.len());
        let mut lookup = HashMap::with_capacity(columns.len());
        let mut columnmap = Vec::with_capacity(columns.len());
        let mut max_physical = 0usize;

        for (logical, column) in columns.iter_mut().enumerate() {
            column.logical = logical;
            names.push(Arc::clone(&column.name));
            lookup.insert(Arc::clone(&column.name), logical);
            columnmap.push(column.physical);
            max_physical = max_physical.max(column.physical + 1);
            debug_assert!(
                logical == 0 || columnmap[logical - 1] < column.physical,
                "physical indices must be strictly increasing in logical order"
            );
        }

        Self {
            columns,
            names,
            lookup,
            columnmap,
            known_physical: known_physical.max(max_physical),
            widen_opts,
            version: 0,
        }
    }

    /// An empty registry that widens with the given options template.
    pub fn empty(widen_opts: ParseOptions) -> Self {
        Self::new(Vec::new(), 0, widen_opts)
    }

    /// Number of logical columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no columns are known.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Ordered column names.
    pub fn names(&self) -> &[Arc<str>] {
        &self.names
    }

    /// Ordered column descriptors.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Descriptor of the logical column at `index`.
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Resolve a name to its logical index.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Logical-to-physical index map.
    pub fn columnmap(&self) -> &[usize] {
        &self.columnmap
    }

    /// Raw field count known from the source.
    pub fn known_physical(&self) -> usize {
        self.known_physical
    }

    /// Version counter, bumped on every widening.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Ordered `(name, kind)` pairs for the currently selected columns.
    pub fn fields(&self) -> Vec<(Arc<str>, ColumnKind)> {
        self.columns
            .iter()
            .map(|c| (Arc::clone(&c.name), c.kind))
            .collect()
    }

    /// Grow the registry to cover `new_physical_width` raw fields.
    ///
    /// Appends one lazy-string column per new raw field, named `Column<k>`
    /// with `k` the 1-based raw position (uniquified on collision). Returns
    /// the number of columns added. Monotonic and irreversible: a smaller
    /// width is a no-op and previously issued row views are unaffected.
    pub fn widen(&mut self, new_physical_width: usize) -> usize {
        if new_physical_width <= self.known_physical {
            return 0;
        }
        let mut added = 0;
        for physical in self.known_physical..new_physical_width {
            let name = self.unique_name(&format!("Column{}", physical + 1));
            let logical = self.columns.len();
            self.columns.push(Column {
                name: Arc::clone(&name),
                logical,
                physical,
                kind: ColumnKind::String,
                opts: self.widen_opts.clone(),
            });
            self.names.push(Arc::clone(&name));
            self.lookup.insert(name, logical);
            self.columnmap.push(physical);
            added += 1;
        }
        self.known_physical = new_physical_width;
        self.version += 1;
        added
    }

    /// Produce a name not yet present in the registry.
    fn unique_name(&self, base: &str) -> Arc<str> {
        if !self.lookup.contains_key(base) {
            return Arc::from(base);
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", base, n);
            if !self.lookup.contains_key(candidate.as_str()) {
                return Arc::from(candidate);
            }
            n += 1;
        }
    }
}
