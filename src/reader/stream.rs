//! The streaming session: iteration, widening, snapshotting, and dispatch.
//!
//! `RowStream` owns the input buffer, the per-column value slots, and the
//! schema registry. Each `advance` scans one raw row, decodes it into the
//! slots, snapshots the slots, and hands out a [`RowView`] bound to that
//! snapshot.

use std::borrow::Cow;
use std::sync::{Arc, RwLock};

use tracing::warn;

use super::context::ReadContext;
use super::row::RowView;
use super::scan::{scan_row, ScannedField};
use super::span::Span;
use super::value::{CodePool, CustomTypeRegistry, Value};
use super::{read_lock, write_lock};
use crate::api::options::StringMode;
use crate::error::{ReadWarning, ReaderError, WarningKind};
use crate::reader::decode;
use crate::reader::value::InlineStr;
use crate::schema::{Column, ColumnKind, InlineTier, ParseOptions, Schema};
use crate::source::SharedBuffer;

/// Rate-limited collector for recoverable cell-level conditions.
#[derive(Debug)]
struct WarningSink {
    max: usize,
    emitted: Vec<ReadWarning>,
    suppressed: bool,
    failed_rows: usize,
    last_failed_row: usize,
}

impl WarningSink {
    fn new(max: usize) -> Self {
        Self {
            max,
            emitted: Vec::new(),
            suppressed: false,
            failed_rows: 0,
            last_failed_row: 0,
        }
    }

    fn record(&mut self, warning: ReadWarning) {
        if warning.row != self.last_failed_row {
            self.failed_rows += 1;
            self.last_failed_row = warning.row;
        }
        if self.emitted.len() < self.max {
            warn!(row = warning.row, offset = warning.offset, "{}", warning);
            self.emitted.push(warning);
        } else if !self.suppressed {
            warn!(
                cap = self.max,
                "warning cap reached; further cell warnings suppressed"
            );
            self.suppressed = true;
        }
    }
}

/// Iteration settings resolved from the construction-time options.
#[derive(Debug)]
struct StreamConfig {
    opts: ParseOptions,
    missing_values: Vec<Vec<u8>>,
    string_mode: StringMode,
    reuse_buffer: bool,
    strict: bool,
    limit: Option<usize>,
}

/// A streaming session over one delimited-text input.
///
/// Produced by [`scan_csv`](crate::api::scan_csv) and friends; iteration is
/// strictly sequential and pull-based. `advance` is the only suspension
/// point, and exclusive mutable access makes concurrent advancing
/// impossible. Dropping the session releases the input buffer once every
/// outstanding [`RowView`] is gone.
///
/// # Buffer reuse
///
/// With `reuse_buffer` enabled, all issued views alias one shared snapshot
/// that is destructively overwritten on every advance. Consume or copy a
/// view's fields before advancing; a retained view observes the next row's
/// data. That aliasing is the intended zero-copy trade-off, not a bug.
#[derive(Debug)]
pub struct RowStream {
    buffer: SharedBuffer,
    schema: Arc<RwLock<Schema>>,
    custom: Arc<CustomTypeRegistry>,
    config: StreamConfig,
    slots: Vec<Value>,
    scratch: Vec<ScannedField>,
    /// Raw-position to logical-index map, rebuilt after widening.
    phys_map: Vec<Option<usize>>,
    phys_version: u64,
    pools: Vec<CodePool>,
    snapshot: Arc<RwLock<Vec<Value>>>,
    pos: usize,
    rows_read: usize,
    sink: WarningSink,
    finished: bool,
}

impl RowStream {
    pub(crate) fn new(ctx: ReadContext) -> Self {
        let width = ctx.schema.len();
        let config = StreamConfig {
            opts: ctx.options.parse_options(),
            missing_values: ctx
                .options
                .missing_values
                .iter()
                .map(|s| s.clone().into_bytes())
                .collect(),
            string_mode: ctx.options.string_mode,
            reuse_buffer: ctx.options.reuse_buffer,
            strict: ctx.options.strict,
            limit: ctx.options.limit,
        };
        let max_warnings = ctx.options.max_warnings;
        let custom = Arc::new(ctx.options.custom_types.clone());
        Self {
            buffer: ctx.buffer,
            schema: Arc::new(RwLock::new(ctx.schema)),
            custom,
            config,
            slots: vec![Value::Missing; width],
            scratch: Vec::new(),
            phys_map: Vec::new(),
            phys_version: u64::MAX,
            pools: vec![CodePool::default(); width],
            snapshot: Arc::new(RwLock::new(Vec::new())),
            pos: ctx.data_start,
            rows_read: 0,
            sink: WarningSink::new(max_warnings),
            finished: false,
        }
    }

    /// Ordered `(name, kind)` pairs for the currently selected columns.
    ///
    /// Available before and during iteration; reflects widening.
    pub fn schema(&self) -> Vec<(Arc<str>, ColumnKind)> {
        read_lock(&self.schema).fields()
    }

    /// Number of data rows produced so far.
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Number of rows that recorded at least one recoverable condition.
    pub fn failed_rows(&self) -> usize {
        self.sink.failed_rows
    }

    /// Warnings emitted before the cap was reached.
    pub fn warnings(&self) -> &[ReadWarning] {
        &self.sink.emitted
    }

    /// Whether iteration has terminated.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Intern table of the `Code`-kinded column at `logical`, if any.
    pub fn pool(&self, logical: usize) -> Option<&CodePool> {
        self.pools.get(logical)
    }

    /// Produce the next row view, `Ok(None)` at normal termination.
    ///
    /// Row limit and end of input are normal termination. Malformed cells
    /// become missing values plus rate-limited warnings unless strict mode
    /// is configured, in which case the first one aborts iteration.
    pub fn advance(&mut self) -> Result<Option<RowView>, ReaderError> {
        if self.finished {
            return Ok(None);
        }
        if let Some(limit) = self.config.limit {
            if self.rows_read >= limit {
                self.finished = true;
                return Ok(None);
            }
        }
        if self.pos >= self.buffer.len() {
            self.finished = true;
            return Ok(None);
        }

        let row = self.rows_read + 1;
        let row_start = self.pos;
        self.scratch.clear();
        let next = scan_row(
            self.buffer.as_ref(),
            self.pos,
            &self.config.opts,
            &mut self.scratch,
        );
        let fields = self.scratch.len();

        let schema_arc = Arc::clone(&self.schema);
        {
            let mut schema = write_lock(&schema_arc);
            if fields > schema.known_physical() {
                let added = schema.widen(fields);
                for _ in 0..added {
                    self.slots.push(Value::Missing);
                    self.pools.push(CodePool::default());
                }
            }
            if schema.version() != self.phys_version {
                self.phys_map.clear();
                self.phys_map.resize(schema.known_physical(), None);
                for (logical, &raw) in schema.columnmap().iter().enumerate() {
                    self.phys_map[raw] = Some(logical);
                }
                self.phys_version = schema.version();
            }
        }

        let schema = read_lock(&schema_arc);
        if let Err(err) = self.fill_slots(&schema, row, row_start) {
            self.finished = true;
            return Err(err);
        }

        let width = schema.len();
        let values = if self.config.reuse_buffer {
            let snapshot_arc = Arc::clone(&self.snapshot);
            {
                let mut snap = write_lock(&snapshot_arc);
                snap.resize(width, Value::Missing);
                for logical in 0..width {
                    let column = &schema.columns()[logical];
                    match dispatch(column, &self.slots[logical], &self.custom, row) {
                        Ok(value) => snap[logical] = value,
                        Err(err) => {
                            drop(snap);
                            self.finished = true;
                            return Err(err);
                        }
                    }
                }
            }
            Arc::clone(&self.snapshot)
        } else {
            let mut values = Vec::with_capacity(width);
            for logical in 0..width {
                let column = &schema.columns()[logical];
                match dispatch(column, &self.slots[logical], &self.custom, row) {
                    Ok(value) => values.push(value),
                    Err(err) => {
                        self.finished = true;
                        return Err(err);
                    }
                }
            }
            Arc::new(RwLock::new(values))
        };
        let version = schema.version();
        drop(schema);

        self.pos = next;
        self.rows_read = row;
        Ok(Some(RowView::new(
            Arc::clone(&self.schema),
            values,
            self.buffer.clone(),
            width,
            version,
            self.config.string_mode,
            Arc::clone(&self.custom),
            row,
        )))
    }

    /// Decode the scanned fields into the logical column slots.
    fn fill_slots(
        &mut self,
        schema: &Schema,
        row: usize,
        row_start: usize,
    ) -> Result<(), ReaderError> {
        let width = schema.len();
        if self.slots.len() < width {
            self.slots.resize(width, Value::Missing);
        }
        for slot in &mut self.slots {
            *slot = Value::Missing;
        }

        let buf = self.buffer.as_ref();
        let scratch = &self.scratch;
        let phys_map = &self.phys_map;
        let config = &self.config;
        let custom = &self.custom;
        let slots = &mut self.slots;
        let pools = &mut self.pools;
        let sink = &mut self.sink;

        for (raw, field) in scratch.iter().enumerate() {
            let Some(logical) = phys_map.get(raw).copied().flatten() else {
                continue;
            };
            let column = &schema.columns()[logical];

            if let Some(kind) = field.warning {
                let message = match kind {
                    WarningKind::UnterminatedQuote => "quoted field not closed".to_string(),
                    WarningKind::TrailingCharacters => {
                        "characters after closing quote".to_string()
                    }
                    _ => "malformed field".to_string(),
                };
                if config.strict {
                    return Err(ReaderError::MalformedCell {
                        row,
                        column: column.name.to_string(),
                        offset: field.span.pos(),
                        message,
                    });
                }
                sink.record(ReadWarning {
                    kind,
                    row,
                    column: Some(Arc::clone(&column.name)),
                    offset: field.span.pos(),
                    message,
                });
            }

            let raw_bytes = field.span.bytes(buf);
            let content: Cow<'_, [u8]> = if field.span.is_escaped() {
                Cow::Owned(decode::unescape(raw_bytes, column.opts.quote, column.opts.escape))
            } else {
                Cow::Borrowed(raw_bytes)
            };

            if config
                .missing_values
                .iter()
                .any(|sentinel| sentinel.as_slice() == &content[..])
            {
                slots[logical] = if column.kind == ColumnKind::String {
                    Value::Lazy(Span::missing())
                } else {
                    Value::Missing
                };
                continue;
            }

            let decoded = match column.kind {
                ColumnKind::String => Some(Value::Lazy(field.span)),
                ColumnKind::Missing => Some(Value::Missing),
                ColumnKind::Int16 => decode::parse_i16(&content).map(Value::Int16),
                ColumnKind::Int32 => decode::parse_i32(&content).map(Value::Int32),
                ColumnKind::Int64 => decode::parse_i64(&content).map(Value::Int64),
                ColumnKind::Int128 => decode::parse_i128(&content).map(Value::Int128),
                ColumnKind::Float64 => {
                    decode::parse_f64(&content, column.opts.decimal).map(Value::Float64)
                }
                ColumnKind::Bool => decode::parse_bool(&content).map(Value::Bool),
                ColumnKind::Date => decode::parse_date(&content, &column.opts).map(Value::Date),
                ColumnKind::DateTime => {
                    decode::parse_datetime(&content, &column.opts).map(Value::DateTime)
                }
                ColumnKind::Time => decode::parse_time(&content, &column.opts).map(Value::Time),
                ColumnKind::Inline(tier) => inline_value(tier, &content),
                ColumnKind::Str => Some(Value::Str(Arc::from(
                    String::from_utf8_lossy(&content).into_owned(),
                ))),
                ColumnKind::Code => {
                    let text = String::from_utf8_lossy(&content);
                    Some(Value::Code(pools[logical].intern(&text)))
                }
                ColumnKind::Custom(tag) => match custom.lookup(tag) {
                    Some(entry) => {
                        (entry.decode)(&content, &column.opts).map(|v| Value::Custom(tag, v))
                    }
                    None => {
                        return Err(ReaderError::Internal {
                            row,
                            column: column.name.to_string(),
                            message: format!(
                                "column declares custom tag {:?} with no registry entry",
                                tag
                            ),
                        });
                    }
                },
            };

            match decoded {
                Some(value) => slots[logical] = value,
                None => {
                    let message = format!(
                        "cannot decode {:?} as {:?}",
                        String::from_utf8_lossy(&content),
                        column.kind
                    );
                    if config.strict {
                        return Err(ReaderError::MalformedCell {
                            row,
                            column: column.name.to_string(),
                            offset: field.span.pos(),
                            message,
                        });
                    }
                    sink.record(ReadWarning {
                        kind: WarningKind::MalformedCell,
                        row,
                        column: Some(Arc::clone(&column.name)),
                        offset: field.span.pos(),
                        message,
                    });
                    slots[logical] = Value::Missing;
                }
            }
        }

        // Short rows leave their absent columns missing.
        if scratch.len() < schema.known_physical() {
            if let Some(column) = schema
                .columns()
                .iter()
                .find(|c| c.physical >= scratch.len())
            {
                let message = format!(
                    "expected {} fields, found {}",
                    schema.known_physical(),
                    scratch.len()
                );
                if config.strict {
                    return Err(ReaderError::MalformedCell {
                        row,
                        column: column.name.to_string(),
                        offset: row_start as u64,
                        message,
                    });
                }
                sink.record(ReadWarning {
                    kind: WarningKind::MissingFields,
                    row,
                    column: Some(Arc::clone(&column.name)),
                    offset: row_start as u64,
                    message,
                });
            }
        }

        Ok(())
    }
}

impl Iterator for RowStream {
    type Item = Result<RowView, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().transpose()
    }
}

/// Decode a field into an inline slot of the declared tier.
fn inline_value(tier: InlineTier, content: &[u8]) -> Option<Value> {
    match tier {
        InlineTier::S7 => InlineStr::<7>::from_bytes(content).map(Value::Inline7),
        InlineTier::S15 => InlineStr::<15>::from_bytes(content).map(Value::Inline15),
        InlineTier::S31 => InlineStr::<31>::from_bytes(content).map(Value::Inline31),
        InlineTier::S63 => InlineStr::<63>::from_bytes(content).map(Value::Inline63),
    }
}

/// Copy a slot value into the snapshot, checking the declared kind against
/// the slot's concrete representation.
///
/// A pair with no built-in match and no custom-registry entry means the
/// schema registry and the slot fell out of sync; that is a reader bug and
/// surfaces as [`ReaderError::Internal`], never as a data error.
fn dispatch(
    column: &Column,
    slot: &Value,
    custom: &CustomTypeRegistry,
    row: usize,
) -> Result<Value, ReaderError> {
    let value = match (column.kind, slot) {
        (_, Value::Missing) => Value::Missing,
        (ColumnKind::String, Value::Lazy(span)) => Value::Lazy(*span),
        (ColumnKind::Int16, Value::Int16(v)) => Value::Int16(*v),
        (ColumnKind::Int32, Value::Int32(v)) => Value::Int32(*v),
        (ColumnKind::Int64, Value::Int64(v)) => Value::Int64(*v),
        (ColumnKind::Int128, Value::Int128(v)) => Value::Int128(*v),
        (ColumnKind::Float64, Value::Float64(v)) => Value::Float64(*v),
        (ColumnKind::Inline(InlineTier::S7), Value::Inline7(v)) => Value::Inline7(*v),
        (ColumnKind::Inline(InlineTier::S15), Value::Inline15(v)) => Value::Inline15(*v),
        (ColumnKind::Inline(InlineTier::S31), Value::Inline31(v)) => Value::Inline31(*v),
        (ColumnKind::Inline(InlineTier::S63), Value::Inline63(v)) => Value::Inline63(*v),
        (ColumnKind::Str, Value::Str(v)) => Value::Str(Arc::clone(v)),
        (ColumnKind::Date, Value::Date(v)) => Value::Date(*v),
        (ColumnKind::DateTime, Value::DateTime(v)) => Value::DateTime(*v),
        (ColumnKind::Time, Value::Time(v)) => Value::Time(*v),
        (ColumnKind::Bool, Value::Bool(v)) => Value::Bool(*v),
        (ColumnKind::Code, Value::Code(v)) => Value::Code(*v),
        (ColumnKind::Custom(tag), Value::Custom(slot_tag, v)) if tag == *slot_tag => {
            if custom.lookup(tag).is_none() {
                return Err(ReaderError::Internal {
                    row,
                    column: column.name.to_string(),
                    message: format!("custom tag {:?} has no registry entry", tag),
                });
            }
            Value::Custom(*slot_tag, Arc::clone(v))
        }
        _ => {
            return Err(ReaderError::Internal {
                row,
                column: column.name.to_string(),
                message: format!(
                    "declared kind {:?} does not match slot value {:?}",
                    column.kind, slot
                ),
            });
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, kind: ColumnKind) -> Column {
        Column {
            name: Arc::from(name),
            logical: 0,
            physical: 0,
            kind,
            opts: ParseOptions::default(),
        }
    }

    #[test]
    fn test_dispatch_matching_pair() {
        let registry = CustomTypeRegistry::new();
        let col = column("n", ColumnKind::Int64);
        let value = dispatch(&col, &Value::Int64(7), &registry, 1).unwrap();
        assert!(matches!(value, Value::Int64(7)));
    }

    #[test]
    fn test_dispatch_missing_is_universal() {
        let registry = CustomTypeRegistry::new();
        let col = column("n", ColumnKind::Date);
        let value = dispatch(&col, &Value::Missing, &registry, 1).unwrap();
        assert!(matches!(value, Value::Missing));
    }

    #[test]
    fn test_dispatch_mismatch_is_internal_error() {
        let registry = CustomTypeRegistry::new();
        let col = column("n", ColumnKind::Int64);
        let err = dispatch(&col, &Value::Bool(true), &registry, 3).unwrap_err();
        assert!(matches!(err, ReaderError::Internal { row: 3, .. }));
    }

    #[test]
    fn test_warning_sink_caps_emission() {
        let mut sink = WarningSink::new(2);
        for row in 1..=5 {
            sink.record(ReadWarning {
                kind: WarningKind::MalformedCell,
                row,
                column: None,
                offset: 0,
                message: "bad".to_string(),
            });
        }
        assert_eq!(sink.emitted.len(), 2);
        assert_eq!(sink.failed_rows, 5);
        assert!(sink.suppressed);
    }

    #[test]
    fn test_warning_sink_counts_rows_once() {
        let mut sink = WarningSink::new(10);
        for _ in 0..3 {
            sink.record(ReadWarning {
                kind: WarningKind::MalformedCell,
                row: 1,
                column: None,
                offset: 0,
                message: "bad".to_string(),
            });
        }
        assert_eq!(sink.failed_rows, 1);
        assert_eq!(sink.emitted.len(), 3);
    }

    #[test]
    fn test_inline_value_tiers() {
        assert!(matches!(
            inline_value(InlineTier::S7, b"short"),
            Some(Value::Inline7(_))
        ));
        assert!(inline_value(InlineTier::S7, b"much too long").is_none());
        assert!(matches!(
            inline_value(InlineTier::S15, b"much too long"),
            Some(Value::Inline15(_))
        ));
    }
}
