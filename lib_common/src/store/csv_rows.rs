use std::io::{self, Write};
use std::mem::take;

use thiserror::Error;

/// Why a text could not be split into records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason}")]
pub struct ParseError {
    /// 1-based line where the offending record (or quote) starts.
    pub line: usize,
    /// What was wrong with it.
    pub reason: String,
}

/// Splits delimited text into records. Handles quoted fields, doubled quotes
/// and CRLF line endings; blank lines are skipped.
///
/// The first record fixes the width. A wider record is an error, a narrower
/// one is padded with empty fields. A quote left open at the end of the text
/// is an error.
pub fn parse_records(text: &str, sep: char) -> Result<Vec<Vec<String>>, ParseError> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut quote_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_line = line;
            }
            c if c == sep && !in_quotes => record.push(take(&mut field)),
            '\r' | '\n' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(take(&mut field));
                flush_record(&mut records, &mut record, record_line)?;
                line += 1;
                record_line = line;
            }
            _ => {
                if ch == '\n' {
                    line += 1;
                }
                field.push(ch);
            }
        }
    }

    if in_quotes {
        return Err(ParseError {
            line: quote_line,
            reason: "quoted field is never closed".to_string(),
        });
    }

    // Last line without a trailing newline.
    record.push(field);
    flush_record(&mut records, &mut record, record_line)?;

    Ok(records)
}

fn flush_record(
    records: &mut Vec<Vec<String>>,
    record: &mut Vec<String>,
    line: usize,
) -> Result<(), ParseError> {
    if record.len() == 1 && record[0].is_empty() {
        record.clear();
        return Ok(());
    }
    if let Some(width) = records.first().map(Vec::len) {
        if record.len() > width {
            return Err(ParseError {
                line,
                reason: format!("expected {} fields, saw {}", width, record.len()),
            });
        }
        record.resize(width, String::new());
    }
    records.push(take(record));
    Ok(())
}

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Writes one record followed by `\n`, quoting fields where required.
pub fn write_record<W: Write>(mut w: W, record: &[String], sep: char) -> io::Result<()> {
    for (i, field) in record.iter().enumerate() {
        if i > 0 {
            write!(w, "{}", sep)?;
        }
        if needs_quotes(field, sep) {
            write!(w, "\"{}\"", field.replace('"', "\"\""))?;
        } else {
            w.write_all(field.as_bytes())?;
        }
    }
    writeln!(w)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn parses_header_and_rows() {
        let rows = parse_records("a,b\n1,2\n", ',').unwrap();
        assert_eq!(rows, vec![rec(&["a", "b"]), rec(&["1", "2"])]);
    }

    #[test]
    fn tolerates_crlf_blank_lines_and_missing_final_newline() {
        let rows = parse_records("a,b\r\n\r\n1,2\r\n3,4", ',').unwrap();
        assert_eq!(rows, vec![rec(&["a", "b"]), rec(&["1", "2"]), rec(&["3", "4"])]);
    }

    #[test]
    fn keeps_empty_fields() {
        let rows = parse_records("a,b,c\n1,,3\n,,\n", ',').unwrap();
        assert_eq!(rows[1], rec(&["1", "", "3"]));
        assert_eq!(rows[2], rec(&["", "", ""]));
    }

    #[test]
    fn quoted_fields_keep_separators_quotes_and_newlines() {
        let rows = parse_records("name,note\n\"Albany, NY\",\"say \"\"hi\"\"\nthere\"\n", ',').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], rec(&["Albany, NY", "say \"hi\"\nthere"]));
    }

    #[test]
    fn writer_quotes_only_when_needed() {
        let mut out = Vec::new();
        write_record(&mut out, &rec(&["plain", "a,b", "q\"q"]), ',').unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "plain,\"a,b\",\"q\"\"q\"\n");
    }

    #[test]
    fn empty_input_has_no_records() {
        assert!(parse_records("", ',').unwrap().is_empty());
        assert!(parse_records("\n\n", ',').unwrap().is_empty());
    }

    #[test]
    fn short_rows_are_padded_to_the_header() {
        let rows = parse_records("a,b,c\n1\n2,3\n", ',').unwrap();
        assert_eq!(rows[1], rec(&["1", "", ""]));
        assert_eq!(rows[2], rec(&["2", "3", ""]));
    }

    #[test]
    fn wide_row_is_rejected_with_its_line() {
        let err = parse_records("a,b\n1,2\n\n7,8,9,10\n", ',').unwrap_err();
        assert_eq!(err.line, 4);
        assert_eq!(err.reason, "expected 2 fields, saw 4");
    }

    #[test]
    fn unclosed_quote_is_rejected_where_it_opens() {
        let err = parse_records("a,b\n\"3,4\n5,6\n", ',').unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn line_numbers_count_newlines_inside_quotes() {
        let err = parse_records("a,b\n\"x\ny\",1\n1,2,3\n", ',').unwrap_err();
        assert_eq!(err.line, 4);
    }
}
