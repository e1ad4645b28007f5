// src/csv.rs
use std::io::{self, Write};
use std::mem::take;

/* ---------------- Parsing ---------------- */

/// One non-blank line (or quoted multi-line record) of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Source text of the record, without the line terminator.
    pub raw: String,
    /// Cells, or why the record could not be split.
    pub cells: Result<Vec<String>, String>,
}

/// Minimal CSV/TSV parser (quotes + CRLF tolerant).
///
/// Unlike a lenient reader, a broken record is kept and marked so the caller
/// can report it instead of silently reading garbage.
pub fn parse_records(text: &str, sep: char) -> Vec<Record> {
    let mut records = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut after_quote = false;
    let mut error: Option<String> = None;
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if matches!(chars.peek(), Some((_, '"'))) {
                    chars.next(); // double-quote escape
                    field.push('"');
                } else {
                    in_quotes = false;
                    after_quote = true;
                }
            }
            '"' if field.is_empty() && !after_quote => in_quotes = true,
            c if c == sep && !in_quotes => {
                row.push(take(&mut field));
                after_quote = false;
            }
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some((_, '\n'))) {
                    chars.next();
                }
                row.push(take(&mut field));
                push_record(&mut records, &text[start..idx], take(&mut row), error.take());
                start = chars.peek().map(|(i, _)| *i).unwrap_or(text.len());
                after_quote = false;
            }
            _ => {
                if after_quote && error.is_none() {
                    error = Some("unexpected text after closing quote".into());
                }
                field.push(ch);
            }
        }
    }

    if in_quotes {
        error = Some("unterminated quoted field".into());
    }
    if start < text.len() {
        row.push(field);
        push_record(&mut records, &text[start..], row, error);
    }

    records
}

fn push_record(records: &mut Vec<Record>, raw: &str, row: Vec<String>, error: Option<String>) {
    let blank = row.len() == 1 && row[0].trim().is_empty();
    if blank && error.is_none() {
        return;
    }
    records.push(Record {
        raw: raw.to_string(),
        cells: match error {
            Some(reason) => Err(reason),
            None => Ok(row),
        },
    });
}

/* ---------------- Writing ---------------- */

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV/TSV row to any writer.
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S], sep: char) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        let cell = cell.as_ref();
        if !first {
            write!(w, "{}", sep)?;
        } else {
            first = false;
        }
        if needs_quotes(cell, sep) {
            let escaped = cell.replace('"', "\"\"");
            write!(w, "\"{}\"", escaped)?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(record: &Record) -> Vec<&str> {
        record
            .cells
            .as_ref()
            .unwrap()
            .iter()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn parses_quotes_and_crlf() {
        let text = "keyword,notes\r\n\"blue, navy\",x\r\n\r\n\"say \"\"hi\"\"\",y";
        let records = parse_records(text, ',');
        assert_eq!(records.len(), 3);
        assert_eq!(cells(&records[1]), vec!["blue, navy", "x"]);
        assert_eq!(cells(&records[2]), vec!["say \"hi\"", "y"]);
        assert_eq!(records[1].raw, "\"blue, navy\",x");
    }

    #[test]
    fn quoted_newline_stays_in_field() {
        let records = parse_records("a\tb\n\"two\nlines\"\tc\n", '\t');
        assert_eq!(records.len(), 2);
        assert_eq!(cells(&records[1]), vec!["two\nlines", "c"]);
    }

    #[test]
    fn broken_records_are_marked() {
        let records = parse_records("keyword\n\"ok\" trailing\nfine\n\"never closed", ',');
        assert_eq!(records.len(), 4);
        assert!(records[1].cells.is_err());
        assert_eq!(cells(&records[2]), vec!["fine"]);
        assert_eq!(
            records[3].cells,
            Err("unterminated quoted field".to_string())
        );
    }

    #[test]
    fn write_row_quotes_when_needed() {
        let mut buf = Vec::new();
        write_row(&mut buf, &["plain", "a,b", "say \"hi\""], ',').unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "plain,\"a,b\",\"say \"\"hi\"\"\"\n");
    }
}
