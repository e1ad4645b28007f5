// Utility functions
use chrono::{DateTime, Utc};
use std::mem::take;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Parses an RFC 3339 string into `DateTime<Utc>`, if possible.
pub fn parse_datetime(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Turns free text into a file-name-safe kebab-case stem.
pub fn to_kebab_case(text: &str) -> String {
    split_words(&fold_text(text, false))
        .iter()
        .map(|w| w.replace(['\'', '.', ','], ""))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Compatibility-decomposes, drops diacritics, folds apostrophe variants and lowercases.
pub fn fold_text(text: &str, case_sensitive: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        let ch = match ch {
            '\u{2018}' | '\u{2019}' | '\u{02BC}' | '`' => '\'',
            other => other,
        };
        if case_sensitive {
            out.push(ch);
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

/// Splits folded text into words on whitespace and punctuation.
///
/// An apostrophe between letters stays in the word (`men's`), as does a `.`
/// or `,` between digits (`10.5`). Letter/digit runs are never split (`32gb`).
pub fn split_words(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_alphanumeric() {
            current.push(ch);
            continue;
        }
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        let inner = match ch {
            '\'' => prev.is_some_and(char::is_alphabetic) && next.is_some_and(char::is_alphabetic),
            '.' | ',' => {
                prev.is_some_and(|c| c.is_ascii_digit()) && next.is_some_and(|c| c.is_ascii_digit())
            }
            _ => false,
        };
        if inner {
            current.push(ch);
        } else if !current.is_empty() {
            words.push(take(&mut current));
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
}

/// True when `needle` occurs as a contiguous run of whole words in `haystack`.
pub fn contains_word_run(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty()
        && needle.len() <= haystack.len()
        && haystack.windows(needle.len()).any(|window| window == needle)
}
