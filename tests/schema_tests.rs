//! Integration tests for schema resolution and the options surface.

use railcar::{
    scan_csv_slice, ColumnKind, ColumnSelection, CsvOptions, InlineTier, ReaderError, StringMode,
};

#[test]
fn test_schema_available_before_iteration() {
    let rows = scan_csv_slice(
        b"id,name,score\n1,ada,92\n",
        CsvOptions::default().with_column_type("score", ColumnKind::Float64),
    )
    .unwrap();
    let schema = rows.schema();
    assert_eq!(schema.len(), 3);
    assert_eq!(schema[0].0.as_ref(), "id");
    assert_eq!(schema[0].1, ColumnKind::String);
    assert_eq!(schema[2].0.as_ref(), "score");
    assert_eq!(schema[2].1, ColumnKind::Float64);
}

#[test]
fn test_duplicate_header_names_are_uniquified() {
    let mut rows = scan_csv_slice(b"x,x\n1,2\n", CsvOptions::default()).unwrap();
    let schema = rows.schema();
    assert_eq!(schema[0].0.as_ref(), "x");
    assert_eq!(schema[1].0.as_ref(), "x_1");
    let row = rows.advance().unwrap().unwrap();
    assert_eq!(row.get("x").unwrap().as_str(), Some("1"));
    assert_eq!(row.get("x_1").unwrap().as_str(), Some("2"));
}

#[test]
fn test_provided_names_override_header() {
    let mut rows = scan_csv_slice(
        b"a,b\n1,2\n",
        CsvOptions::default().with_names(["left", "right"]),
    )
    .unwrap();
    let row = rows.advance().unwrap().unwrap();
    assert_eq!(row.get("left").unwrap().as_str(), Some("1"));
    assert_eq!(row.get("right").unwrap().as_str(), Some("2"));
}

#[test]
fn test_selection_with_unknown_name_fails_at_setup() {
    let err = scan_csv_slice(
        b"a,b\n",
        CsvOptions::default().with_select(ColumnSelection::from_names(["ghost"])),
    )
    .unwrap_err();
    assert!(matches!(err, ReaderError::Configuration(_)));
}

#[test]
fn test_selection_with_out_of_range_index_fails_at_setup() {
    let err = scan_csv_slice(
        b"a,b\n",
        CsvOptions::default().with_select(ColumnSelection::from_indices([7])),
    )
    .unwrap_err();
    assert!(matches!(err, ReaderError::Configuration(_)));
}

#[test]
fn test_select_and_drop_are_mutually_exclusive() {
    let err = scan_csv_slice(
        b"a,b\n",
        CsvOptions::default()
            .with_select(ColumnSelection::from_names(["a"]))
            .with_drop(ColumnSelection::from_names(["b"])),
    )
    .unwrap_err();
    assert!(matches!(err, ReaderError::Configuration(_)));
}

#[test]
fn test_type_override_by_index() {
    let rows = scan_csv_slice(
        b"a,b\n",
        CsvOptions::default().with_column_type(1, ColumnKind::Int32),
    )
    .unwrap();
    assert_eq!(rows.schema()[1].1, ColumnKind::Int32);
}

#[test]
fn test_type_override_applies_after_selection() {
    // Index targets address logical (selected) columns, not raw positions.
    let rows = scan_csv_slice(
        b"a,b,c\n",
        CsvOptions::default()
            .with_select(ColumnSelection::from_names(["b", "c"]))
            .with_column_type(0, ColumnKind::Bool),
    )
    .unwrap();
    let schema = rows.schema();
    assert_eq!(schema[0].0.as_ref(), "b");
    assert_eq!(schema[0].1, ColumnKind::Bool);
}

#[test]
fn test_inline_tier_kinds_survive_schema_query() {
    let rows = scan_csv_slice(
        b"a\n",
        CsvOptions::default().with_column_type("a", ColumnKind::Inline(InlineTier::S15)),
    )
    .unwrap();
    assert_eq!(rows.schema()[0].1, ColumnKind::Inline(InlineTier::S15));
}

#[test]
fn test_string_mode_default_is_lazy() {
    assert_eq!(CsvOptions::default().string_mode, StringMode::Lazy);
}

#[test]
fn test_widened_schema_visible_through_stream_and_views() {
    let mut rows = scan_csv_slice(b"a\n1\n2,3,4\n", CsvOptions::default()).unwrap();
    let first = rows.advance().unwrap().unwrap();
    assert_eq!(rows.schema().len(), 1);
    let _second = rows.advance().unwrap().unwrap();
    assert_eq!(rows.schema().len(), 3);
    // The earlier view reflects widening at access time.
    assert_eq!(first.schema().len(), 3);
    assert_eq!(first.issued_width(), 1);
}
