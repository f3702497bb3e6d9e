//! Session setup: header handling, selection, and schema construction.
//!
//! `ReadContext::build` turns a raw buffer plus options into everything a
//! session needs to start iterating: the resolved schema registry, the
//! offset of the first data row, and the retained options.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::scan::{scan_row, ScannedField};
use crate::api::columns::{resolve_drop, resolve_selection};
use crate::api::options::{ColumnTarget, CsvOptions};
use crate::error::ReaderError;
use crate::reader::decode::unescape;
use crate::schema::{Column, ColumnKind, ParseOptions, Schema};
use crate::source::SharedBuffer;

/// Everything resolved at setup time for one reading session.
#[derive(Debug)]
pub(crate) struct ReadContext {
    pub schema: Schema,
    pub buffer: SharedBuffer,
    pub data_start: usize,
    pub options: CsvOptions,
}

impl ReadContext {
    /// Resolve options against the buffer's header region.
    pub fn build(buffer: SharedBuffer, options: CsvOptions) -> Result<Self, ReaderError> {
        options.validate()?;
        let popts = options.parse_options();
        let buf = buffer.as_ref();
        let mut fields: Vec<ScannedField> = Vec::new();
        let mut pos = 0usize;

        for _ in 0..options.skip_rows {
            fields.clear();
            pos = scan_row(buf, pos, &popts, &mut fields);
        }

        let raw_names: Vec<String> = if let Some(provided) = options.names.clone() {
            if options.header {
                fields.clear();
                pos = scan_row(buf, pos, &popts, &mut fields);
            }
            provided
        } else if options.header {
            fields.clear();
            pos = scan_row(buf, pos, &popts, &mut fields);
            fields
                .iter()
                .enumerate()
                .map(|(raw, field)| {
                    let name = field_text(buf, field, &popts);
                    if name.is_empty() {
                        format!("Column{}", raw + 1)
                    } else {
                        name
                    }
                })
                .collect()
        } else {
            // Peek the first data row for its field count; do not consume it.
            fields.clear();
            scan_row(buf, pos, &popts, &mut fields);
            (1..=fields.len()).map(|raw| format!("Column{}", raw)).collect()
        };

        let raw_names = uniquify(raw_names);
        let known_physical = raw_names.len();

        let physical: Vec<usize> = match (&options.select, &options.drop) {
            (Some(selection), None) => resolve_selection(selection, &raw_names)?,
            (None, Some(selection)) => resolve_drop(selection, &raw_names)?,
            (None, None) => (0..raw_names.len()).collect(),
            // validate() rejects select together with drop
            (Some(_), Some(_)) => unreachable!(),
        };

        let mut columns: Vec<Column> = physical
            .iter()
            .enumerate()
            .map(|(logical, &raw)| Column {
                name: Arc::clone(&raw_names[raw]),
                logical,
                physical: raw,
                kind: ColumnKind::String,
                opts: popts.clone(),
            })
            .collect();

        apply_type_specs(&mut columns, &options)?;

        debug!(
            columns = columns.len(),
            raw_fields = known_physical,
            data_start = pos,
            "resolved read context"
        );

        Ok(Self {
            schema: Schema::new(columns, known_physical, popts),
            buffer,
            data_start: pos,
            options,
        })
    }
}

/// Materialize one scanned field as header text.
fn field_text(buf: &[u8], field: &ScannedField, opts: &ParseOptions) -> String {
    let raw = field.span.bytes(buf);
    if field.span.is_escaped() {
        String::from_utf8_lossy(&unescape(raw, opts.quote, opts.escape)).into_owned()
    } else {
        String::from_utf8_lossy(raw).into_owned()
    }
}

/// Make every name unique, suffixing collisions with `_<n>`.
fn uniquify(names: Vec<String>) -> Vec<Arc<str>> {
    let mut used: HashSet<String> = HashSet::with_capacity(names.len());
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let unique = if used.contains(&name) {
            let mut n = 1;
            loop {
                let candidate = format!("{}_{}", name, n);
                if !used.contains(&candidate) {
                    break candidate;
                }
                n += 1;
            }
        } else {
            name
        };
        used.insert(unique.clone());
        out.push(Arc::from(unique));
    }
    out
}

/// Apply declared column representations and formats.
fn apply_type_specs(columns: &mut [Column], options: &CsvOptions) -> Result<(), ReaderError> {
    for spec in &options.types {
        let logical = match &spec.target {
            ColumnTarget::Name(name) => columns
                .iter()
                .position(|c| c.name.as_ref() == name.as_str())
                .ok_or_else(|| {
                    ReaderError::Configuration(format!(
                        "type declared for unknown column: {:?}",
                        name
                    ))
                })?,
            ColumnTarget::Index(index) => {
                if *index >= columns.len() {
                    return Err(ReaderError::Configuration(format!(
                        "type declared for column index {} out of range for {} columns",
                        index,
                        columns.len()
                    )));
                }
                *index
            }
        };
        let column = &mut columns[logical];
        column.kind = spec.kind;
        if let Some(format) = &spec.format {
            match spec.kind {
                ColumnKind::Date => column.opts.date_format = Some(format.clone()),
                ColumnKind::DateTime => column.opts.datetime_format = Some(format.clone()),
                ColumnKind::Time => column.opts.time_format = Some(format.clone()),
                _ => {
                    return Err(ReaderError::Configuration(format!(
                        "format override on column {:?} requires a temporal kind",
                        column.name
                    )))
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::columns::ColumnSelection;

    fn build(data: &[u8], options: CsvOptions) -> ReadContext {
        ReadContext::build(SharedBuffer::from_slice(data), options).unwrap()
    }

    #[test]
    fn test_build_with_header() {
        let ctx = build(b"a,b\n1,2\n", CsvOptions::default());
        assert_eq!(ctx.schema.names()[0].as_ref(), "a");
        assert_eq!(ctx.schema.names()[1].as_ref(), "b");
        assert_eq!(ctx.data_start, 4);
        assert_eq!(ctx.schema.known_physical(), 2);
    }

    #[test]
    fn test_build_without_header_synthesizes_names() {
        let ctx = build(b"1,2,3\n", CsvOptions::default().with_header(false));
        assert_eq!(ctx.schema.names()[0].as_ref(), "Column1");
        assert_eq!(ctx.schema.names()[2].as_ref(), "Column3");
        assert_eq!(ctx.data_start, 0);
    }

    #[test]
    fn test_build_with_provided_names_consumes_header() {
        let ctx = build(
            b"a,b\n1,2\n",
            CsvOptions::default().with_names(["x", "y"]),
        );
        assert_eq!(ctx.schema.names()[0].as_ref(), "x");
        assert_eq!(ctx.data_start, 4);
    }

    #[test]
    fn test_build_with_provided_names_no_header() {
        let ctx = build(
            b"1,2\n",
            CsvOptions::default().with_header(false).with_names(["x", "y"]),
        );
        assert_eq!(ctx.schema.names()[1].as_ref(), "y");
        assert_eq!(ctx.data_start, 0);
    }

    #[test]
    fn test_build_uniquifies_duplicate_header_names() {
        let ctx = build(b"a,a,a\n", CsvOptions::default());
        assert_eq!(ctx.schema.names()[0].as_ref(), "a");
        assert_eq!(ctx.schema.names()[1].as_ref(), "a_1");
        assert_eq!(ctx.schema.names()[2].as_ref(), "a_2");
    }

    #[test]
    fn test_build_names_empty_header_cell() {
        let ctx = build(b"a,,c\n", CsvOptions::default());
        assert_eq!(ctx.schema.names()[1].as_ref(), "Column2");
    }

    #[test]
    fn test_build_skip_rows() {
        let ctx = build(
            b"junk\nmore junk\na,b\n1,2\n",
            CsvOptions::default().with_skip_rows(2),
        );
        assert_eq!(ctx.schema.names()[0].as_ref(), "a");
        assert_eq!(&ctx.buffer.as_ref()[ctx.data_start..], b"1,2\n");
    }

    #[test]
    fn test_build_select_keeps_raw_positions() {
        let ctx = build(
            b"a,b,c\n1,2,3\n",
            CsvOptions::default().with_select(ColumnSelection::from_names(["c", "a"])),
        );
        assert_eq!(ctx.schema.len(), 2);
        assert_eq!(ctx.schema.columnmap(), &[0, 2]);
        assert_eq!(ctx.schema.known_physical(), 3);
    }

    #[test]
    fn test_build_drop() {
        let ctx = build(
            b"a,b,c\n",
            CsvOptions::default().with_drop(ColumnSelection::from_indices([1])),
        );
        assert_eq!(ctx.schema.names()[0].as_ref(), "a");
        assert_eq!(ctx.schema.names()[1].as_ref(), "c");
    }

    #[test]
    fn test_build_applies_type_specs() {
        let ctx = build(
            b"id,when\n",
            CsvOptions::default()
                .with_column_type("id", ColumnKind::Int64)
                .with_column_type_format("when", ColumnKind::Date, "%d/%m/%Y"),
        );
        assert_eq!(ctx.schema.column(0).unwrap().kind, ColumnKind::Int64);
        let when = ctx.schema.column(1).unwrap();
        assert_eq!(when.kind, ColumnKind::Date);
        assert_eq!(when.opts.date_format.as_deref(), Some("%d/%m/%Y"));
    }

    #[test]
    fn test_build_rejects_unknown_type_target() {
        let err = ReadContext::build(
            SharedBuffer::from_slice(b"a\n"),
            CsvOptions::default().with_column_type("nope", ColumnKind::Int64),
        )
        .unwrap_err();
        assert!(matches!(err, ReaderError::Configuration(_)));
    }

    #[test]
    fn test_build_rejects_format_on_non_temporal_kind() {
        let err = ReadContext::build(
            SharedBuffer::from_slice(b"a\n"),
            CsvOptions::default().with_column_type_format("a", ColumnKind::Int64, "%Y"),
        )
        .unwrap_err();
        assert!(matches!(err, ReaderError::Configuration(_)));
    }

    #[test]
    fn test_build_empty_input() {
        let ctx = build(b"", CsvOptions::default());
        assert!(ctx.schema.is_empty());
        assert_eq!(ctx.data_start, 0);
    }
}
