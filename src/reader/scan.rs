//! The row-parse primitive: scanning one raw row into field spans.
//!
//! `scan_row` performs byte-level tokenization only. Decoding the scanned
//! spans into typed column slots is the session's job, so the scanner stays
//! a pure function of the buffer and the tokenization options.

use super::span::Span;
use crate::error::WarningKind;
use crate::schema::ParseOptions;

/// One scanned field: its content span plus quoting diagnostics.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScannedField {
    /// Content bytes, excluding any enclosing quotes.
    pub span: Span,
    /// Whether the field was quoted.
    pub quoted: bool,
    /// Structural problem noticed while scanning, if any.
    pub warning: Option<WarningKind>,
}

/// Scan a single row starting at `offset`, pushing its fields.
///
/// Returns the offset of the next row. Handles quoted fields with either
/// doubled-quote or distinct-escape-byte escaping, and LF / CRLF / CR row
/// terminators. Scanning at or past the end of the buffer pushes nothing.
pub(crate) fn scan_row(
    buf: &[u8],
    offset: usize,
    opts: &ParseOptions,
    fields: &mut Vec<ScannedField>,
) -> usize {
    let len = buf.len();
    let delim = opts.delimiter;
    let quote = opts.quote;
    let escape = opts.escape;
    let mut i = offset;
    if i >= len {
        return i;
    }

    loop {
        let field = if i < len && buf[i] == quote {
            let start = i + 1;
            let mut j = start;
            let mut escaped = false;
            let mut warning = None;
            let end;
            loop {
                if j >= len {
                    warning = Some(WarningKind::UnterminatedQuote);
                    end = len;
                    i = len;
                    break;
                }
                let b = buf[j];
                if escape == quote {
                    if b == quote {
                        if j + 1 < len && buf[j + 1] == quote {
                            escaped = true;
                            j += 2;
                            continue;
                        }
                        end = j;
                        i = j + 1;
                        break;
                    }
                    j += 1;
                } else if b == escape && j + 1 < len {
                    escaped = true;
                    j += 2;
                } else if b == quote {
                    end = j;
                    i = j + 1;
                    break;
                } else {
                    j += 1;
                }
            }
            // A closing quote must be followed by a delimiter or row end.
            if warning.is_none() && i < len && buf[i] != delim && buf[i] != b'\r' && buf[i] != b'\n'
            {
                warning = Some(WarningKind::TrailingCharacters);
                while i < len && buf[i] != delim && buf[i] != b'\r' && buf[i] != b'\n' {
                    i += 1;
                }
            }
            let mut span = Span::new(start as u64, (end - start) as u32);
            if escaped {
                span = span.with_escapes();
            }
            ScannedField {
                span,
                quoted: true,
                warning,
            }
        } else {
            let start = i;
            while i < len && buf[i] != delim && buf[i] != b'\r' && buf[i] != b'\n' {
                i += 1;
            }
            ScannedField {
                span: Span::new(start as u64, (i - start) as u32),
                quoted: false,
                warning: None,
            }
        };
        fields.push(field);

        if i >= len {
            return len;
        }
        let b = buf[i];
        if b == delim {
            i += 1;
        } else if b == b'\r' {
            i += 1;
            if i < len && buf[i] == b'\n' {
                i += 1;
            }
            return i;
        } else if b == b'\n' {
            return i + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(input: &[u8], offset: usize) -> (Vec<ScannedField>, usize) {
        let opts = ParseOptions::default();
        let mut fields = Vec::new();
        let next = scan_row(input, offset, &opts, &mut fields);
        (fields, next)
    }

    fn texts<'a>(input: &'a [u8], fields: &[ScannedField]) -> Vec<&'a [u8]> {
        fields.iter().map(|f| f.span.bytes(input)).collect()
    }

    #[test]
    fn test_scan_basic_row() {
        let input = b"a,b,c\n1,2,3\n";
        let (fields, next) = scan(input, 0);
        assert_eq!(texts(input, &fields), vec![b"a" as &[u8], b"b", b"c"]);
        assert_eq!(next, 6);
        let (fields, next) = scan(input, next);
        assert_eq!(texts(input, &fields), vec![b"1" as &[u8], b"2", b"3"]);
        assert_eq!(next, 12);
    }

    #[test]
    fn test_scan_without_trailing_newline() {
        let input = b"1,2";
        let (fields, next) = scan(input, 0);
        assert_eq!(texts(input, &fields), vec![b"1" as &[u8], b"2"]);
        assert_eq!(next, 3);
    }

    #[test]
    fn test_scan_crlf() {
        let input = b"1,2\r\n3,4\r";
        let (fields, next) = scan(input, 0);
        assert_eq!(fields.len(), 2);
        assert_eq!(next, 5);
        let (fields, next) = scan(input, next);
        assert_eq!(texts(input, &fields), vec![b"3" as &[u8], b"4"]);
        assert_eq!(next, 9);
    }

    #[test]
    fn test_scan_trailing_delimiter_yields_empty_field() {
        let input = b"a,\n";
        let (fields, _) = scan(input, 0);
        assert_eq!(texts(input, &fields), vec![b"a" as &[u8], b""]);
    }

    #[test]
    fn test_scan_blank_line_is_one_empty_field() {
        let input = b"\nx\n";
        let (fields, next) = scan(input, 0);
        assert_eq!(fields.len(), 1);
        assert!(fields[0].span.is_empty());
        assert_eq!(next, 1);
    }

    #[test]
    fn test_scan_quoted_field() {
        let input = b"\"a,b\",c\n";
        let (fields, _) = scan(input, 0);
        assert_eq!(texts(input, &fields), vec![b"a,b" as &[u8], b"c"]);
        assert!(fields[0].quoted);
        assert!(!fields[0].span.is_escaped());
    }

    #[test]
    fn test_scan_doubled_quote_escape() {
        let input = b"\"say \"\"hi\"\"\",x\n";
        let (fields, _) = scan(input, 0);
        assert_eq!(fields[0].span.bytes(input), b"say \"\"hi\"\"");
        assert!(fields[0].span.is_escaped());
        assert_eq!(fields[1].span.bytes(input), b"x");
    }

    #[test]
    fn test_scan_backslash_escape() {
        let input = br#""say \"hi\"",x"#;
        let opts = ParseOptions {
            escape: b'\\',
            ..Default::default()
        };
        let mut fields = Vec::new();
        scan_row(input, 0, &opts, &mut fields);
        assert_eq!(fields[0].span.bytes(input), br#"say \"hi\""#);
        assert!(fields[0].span.is_escaped());
        assert_eq!(fields[1].span.bytes(input), b"x");
    }

    #[test]
    fn test_scan_unterminated_quote() {
        let input = b"\"never closed";
        let (fields, next) = scan(input, 0);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].warning, Some(WarningKind::UnterminatedQuote));
        assert_eq!(fields[0].span.bytes(input), b"never closed");
        assert_eq!(next, input.len());
    }

    #[test]
    fn test_scan_trailing_characters_after_quote() {
        let input = b"\"ok\"junk,b\n";
        let (fields, _) = scan(input, 0);
        assert_eq!(fields[0].warning, Some(WarningKind::TrailingCharacters));
        assert_eq!(fields[0].span.bytes(input), b"ok");
        assert_eq!(fields[1].span.bytes(input), b"b");
    }

    #[test]
    fn test_scan_past_end_pushes_nothing() {
        let input = b"a,b\n";
        let mut fields = Vec::new();
        let next = scan_row(input, 4, &ParseOptions::default(), &mut fields);
        assert!(fields.is_empty());
        assert_eq!(next, 4);
    }

    #[test]
    fn test_scan_custom_delimiter() {
        let input = b"a;b;c\n";
        let opts = ParseOptions {
            delimiter: b';',
            ..Default::default()
        };
        let mut fields = Vec::new();
        scan_row(input, 0, &opts, &mut fields);
        assert_eq!(fields.len(), 3);
    }
}
