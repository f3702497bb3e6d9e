//! Typed parsing of raw field bytes.
//!
//! These helpers are shared by slot decoding during row scanning and by the
//! on-demand `parse_as`/`detect` accessors, so a value parses identically no
//! matter which path asked for it.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::reader::value::CellValue;
use crate::schema::ParseOptions;

const DATE_DEFAULT: &str = "%Y-%m-%d";
const DATETIME_DEFAULTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const TIME_DEFAULT: &str = "%H:%M:%S%.f";

fn text(bytes: &[u8]) -> Option<&str> {
    let s = std::str::from_utf8(bytes).ok()?.trim_matches(' ');
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parse a boolean. Accepts `true`/`false` in any ASCII case.
pub fn parse_bool(bytes: &[u8]) -> Option<bool> {
    let s = text(bytes)?;
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parse a 64-bit signed integer.
pub fn parse_i64(bytes: &[u8]) -> Option<i64> {
    text(bytes)?.parse().ok()
}

/// Parse a 128-bit signed integer.
pub fn parse_i128(bytes: &[u8]) -> Option<i128> {
    text(bytes)?.parse().ok()
}

/// Parse a 16-bit signed integer.
pub fn parse_i16(bytes: &[u8]) -> Option<i16> {
    text(bytes)?.parse().ok()
}

/// Parse a 32-bit signed integer.
pub fn parse_i32(bytes: &[u8]) -> Option<i32> {
    text(bytes)?.parse().ok()
}

/// Parse a 64-bit float, honoring the column's decimal separator.
pub fn parse_f64(bytes: &[u8], decimal: u8) -> Option<f64> {
    let s = text(bytes)?;
    if decimal == b'.' {
        s.parse().ok()
    } else {
        let normalized = s.replace(decimal as char, ".");
        normalized.parse().ok()
    }
}

/// Parse a calendar date with the column's format, ISO by default.
pub fn parse_date(bytes: &[u8], opts: &ParseOptions) -> Option<NaiveDate> {
    let s = text(bytes)?;
    let format = opts.date_format.as_deref().unwrap_or(DATE_DEFAULT);
    NaiveDate::parse_from_str(s, format).ok()
}

/// Parse a datetime with the column's format; tries `T` and space separated
/// ISO forms by default.
pub fn parse_datetime(bytes: &[u8], opts: &ParseOptions) -> Option<NaiveDateTime> {
    let s = text(bytes)?;
    match opts.datetime_format.as_deref() {
        Some(format) => NaiveDateTime::parse_from_str(s, format).ok(),
        None => DATETIME_DEFAULTS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok()),
    }
}

/// Parse a time of day with the column's format.
pub fn parse_time(bytes: &[u8], opts: &ParseOptions) -> Option<NaiveTime> {
    let s = text(bytes)?;
    let format = opts.time_format.as_deref().unwrap_or(TIME_DEFAULT);
    NaiveTime::parse_from_str(s, format).ok()
}

/// Collapse escape sequences inside a quoted field body.
///
/// Handles both doubled-quote escaping (`escape == quote`) and a distinct
/// escape byte preceding a quote or another escape byte.
pub fn unescape(bytes: &[u8], quote: u8, escape: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == escape && i + 1 < bytes.len() && (bytes[i + 1] == quote || bytes[i + 1] == escape) {
            out.push(bytes[i + 1]);
            i += 2;
        } else {
            out.push(b);
            i += 1;
        }
    }
    out
}

/// Infer the best-fitting concrete value for a raw field.
///
/// Candidates are tried in a fixed priority order: boolean, integer (64-bit,
/// then 128-bit), float, date, datetime, time. Returns `None` when nothing
/// matches, leaving the field a plain string. Pure function of the bytes and
/// options, so repeated calls on unchanged input return equal results.
pub fn detect(bytes: &[u8], opts: &ParseOptions) -> Option<CellValue<'static>> {
    if let Some(v) = parse_bool(bytes) {
        return Some(CellValue::Bool(v));
    }
    if let Some(v) = parse_i64(bytes) {
        return Some(CellValue::Int64(v));
    }
    if let Some(v) = parse_i128(bytes) {
        return Some(CellValue::Int128(v));
    }
    if let Some(v) = parse_f64(bytes, opts.decimal) {
        return Some(CellValue::Float64(v));
    }
    if let Some(v) = parse_date(bytes, opts) {
        return Some(CellValue::Date(v));
    }
    if let Some(v) = parse_datetime(bytes, opts) {
        return Some(CellValue::DateTime(v));
    }
    if let Some(v) = parse_time(bytes, opts) {
        return Some(CellValue::Time(v));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool(b"true"), Some(true));
        assert_eq!(parse_bool(b"FALSE"), Some(false));
        assert_eq!(parse_bool(b"True"), Some(true));
        assert_eq!(parse_bool(b"1"), None);
        assert_eq!(parse_bool(b""), None);
    }

    #[test]
    fn test_parse_integers() {
        assert_eq!(parse_i64(b"42"), Some(42));
        assert_eq!(parse_i64(b"-7"), Some(-7));
        assert_eq!(parse_i64(b" 42 "), Some(42));
        assert_eq!(parse_i64(b"4.2"), None);
        assert_eq!(parse_i16(b"40000"), None);
        assert_eq!(parse_i32(b"40000"), Some(40000));
        assert_eq!(
            parse_i128(b"170141183460469231731687303715884105727"),
            Some(i128::MAX)
        );
    }

    #[test]
    fn test_parse_f64_decimal_separator() {
        assert_eq!(parse_f64(b"3.25", b'.'), Some(3.25));
        assert_eq!(parse_f64(b"3,25", b','), Some(3.25));
        assert_eq!(parse_f64(b"3,25", b'.'), None);
        assert_eq!(parse_f64(b"abc", b'.'), None);
    }

    #[test]
    fn test_parse_date_default_and_custom() {
        let opts = ParseOptions::default();
        assert_eq!(
            parse_date(b"2021-03-04", &opts),
            NaiveDate::from_ymd_opt(2021, 3, 4)
        );
        assert_eq!(parse_date(b"04/03/2021", &opts), None);

        let custom = ParseOptions {
            date_format: Some("%d/%m/%Y".to_string()),
            ..Default::default()
        };
        assert_eq!(
            parse_date(b"04/03/2021", &custom),
            NaiveDate::from_ymd_opt(2021, 3, 4)
        );
    }

    #[test]
    fn test_parse_datetime_both_separators() {
        let opts = ParseOptions::default();
        let expected = NaiveDate::from_ymd_opt(2021, 3, 4)
            .unwrap()
            .and_hms_opt(12, 30, 0);
        assert_eq!(parse_datetime(b"2021-03-04T12:30:00", &opts), expected);
        assert_eq!(parse_datetime(b"2021-03-04 12:30:00", &opts), expected);
        assert_eq!(parse_datetime(b"2021-03-04", &opts), None);
    }

    #[test]
    fn test_parse_time() {
        let opts = ParseOptions::default();
        assert_eq!(
            parse_time(b"12:30:05", &opts),
            NaiveTime::from_hms_opt(12, 30, 5)
        );
        assert_eq!(parse_time(b"noon", &opts), None);
    }

    #[test]
    fn test_unescape_doubled_quotes() {
        assert_eq!(unescape(b"say \"\"hi\"\"", b'"', b'"'), b"say \"hi\"");
    }

    #[test]
    fn test_unescape_backslash() {
        assert_eq!(unescape(br#"say \"hi\""#, b'"', b'\\'), br#"say "hi""#);
        assert_eq!(unescape(br#"a\\b"#, b'"', b'\\'), br"a\b");
    }

    #[test]
    fn test_detect_priority_order() {
        let opts = ParseOptions::default();
        assert_eq!(detect(b"true", &opts), Some(CellValue::Bool(true)));
        assert_eq!(detect(b"17", &opts), Some(CellValue::Int64(17)));
        assert_eq!(detect(b"17.5", &opts), Some(CellValue::Float64(17.5)));
        assert_eq!(
            detect(b"2021-03-04", &opts),
            Some(CellValue::Date(NaiveDate::from_ymd_opt(2021, 3, 4).unwrap()))
        );
        assert!(matches!(
            detect(b"2021-03-04 12:30:00", &opts),
            Some(CellValue::DateTime(_))
        ));
        assert!(matches!(
            detect(b"12:30:00", &opts),
            Some(CellValue::Time(_))
        ));
        assert_eq!(detect(b"plain text", &opts), None);
    }

    #[test]
    fn test_detect_wide_integer() {
        let opts = ParseOptions::default();
        assert_eq!(
            detect(b"170141183460469231731687303715884105727", &opts),
            Some(CellValue::Int128(i128::MAX))
        );
    }

    #[test]
    fn test_detect_is_deterministic() {
        let opts = ParseOptions::default();
        let first = detect(b"3.5", &opts);
        let second = detect(b"3.5", &opts);
        assert_eq!(first, second);
    }
}
