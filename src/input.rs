use crate::csv::{Record, parse_records};
use crate::model::{InputError, Keyword, MalformedRow};
use std::fs;
use std::path::Path;

/// A keyword row, or the reason that row could not be read.
pub type KeywordRow = Result<Keyword, MalformedRow>;

/// Reads the keyword list. `.tsv` files are tab-separated, anything else is CSV.
///
/// Only a missing file or a header without a `keyword` column fails the whole
/// read; a broken row or a blank keyword cell comes back as an `Err` entry in
/// its place.
pub fn read_keywords(path: &Path) -> Result<Vec<KeywordRow>, InputError> {
    let text = fs::read_to_string(path)?;
    let sep = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => '\t',
        _ => ',',
    };
    parse_keywords(&text, sep, &path.display().to_string())
}

pub fn parse_keywords(
    text: &str,
    sep: char,
    source: &str,
) -> Result<Vec<KeywordRow>, InputError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = parse_records(text, sep).into_iter();

    let column = records
        .next()
        .and_then(|header| header.cells.ok())
        .and_then(|cells| {
            cells
                .iter()
                .position(|cell| cell.trim().eq_ignore_ascii_case("keyword"))
        })
        .ok_or_else(|| InputError::MissingKeywordColumn(source.to_string()))?;

    let rows = records
        .enumerate()
        .map(|(idx, Record { raw, cells })| -> KeywordRow {
            let row = idx + 1;
            let malformed = |reason: String| MalformedRow {
                row,
                raw: raw.clone(),
                reason,
            };
            let cells = cells.map_err(malformed)?;
            match cells.get(column).map(|cell| cell.trim()) {
                Some("") => Err(malformed("empty keyword".into())),
                Some(cell) => Ok(Keyword::new(row, cell)),
                None => Err(malformed(format!(
                    "row has {} cell(s), keyword column is #{}",
                    cells.len(),
                    column + 1
                ))),
            }
        })
        .collect();

    Ok(rows)
}
