// Core structs: Keyword, Token, Product, MatchResult, ProductVerdict, KeywordReport
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// One row of the keyword input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    /// 1-based data row in the input file (header excluded).
    pub row: usize,
    pub text: String,
}

impl Keyword {
    pub fn new(row: usize, text: impl Into<String>) -> Self {
        Self {
            row,
            text: text.into(),
        }
    }
}

/// Attribute type a token is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenClass {
    Color,
    Size,
    Gender,
    Category,
    Material,
    Brand,
    FreeText,
}

impl TokenClass {
    pub fn is_classified(self) -> bool {
        self != TokenClass::FreeText
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenClass::Color => "color",
            TokenClass::Size => "size",
            TokenClass::Gender => "gender",
            TokenClass::Category => "category",
            TokenClass::Material => "material",
            TokenClass::Brand => "brand",
            TokenClass::FreeText => "free_text",
        }
    }
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Folded text; a collapsed phrase keeps its words separated by single spaces.
    pub text: String,
    pub class: TokenClass,
    /// Other members of the token's synonym group, folded.
    pub synonyms: Vec<String>,
    /// Row of the keyword this token was derived from.
    pub keyword_row: usize,
    /// Position within the keyword's token sequence.
    pub position: usize,
}

impl Token {
    pub fn is_classified(&self) -> bool {
        self.class.is_classified()
    }

    pub fn words(&self) -> Vec<String> {
        self.text.split(' ').map(str::to_string).collect()
    }

    /// `blue[color]`, used in reports and logs.
    pub fn label(&self) -> String {
        format!("{}[{}]", self.text, self.class)
    }
}

/// One scraped search result. Field names are stored trimmed and lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Product {
    pub id: String,
    pub fields: BTreeMap<String, String>,
}

impl Product {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_field(name, value);
        self
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(field_key(name), value.into());
    }

    /// Missing fields read as empty text.
    pub fn field(&self, name: &str) -> &str {
        self.fields
            .get(&field_key(name))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn title(&self) -> &str {
        self.field("title")
    }
}

pub fn field_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedVia {
    /// Hit inside a field mapped to the token's class.
    FieldExact,
    /// Hit in the combined corpus.
    CorpusFallback,
    Unmatched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub position: usize,
    pub via: MatchedVia,
    /// The literal token text or the synonym that was found.
    pub term: Option<String>,
    pub by_synonym: bool,
    /// Field holding the evidence.
    pub field: Option<String>,
    /// Unmatched classified token: first class field that had a value, and that value.
    pub observed: Option<(String, String)>,
}

impl MatchResult {
    pub fn hit(
        position: usize,
        via: MatchedVia,
        term: &str,
        by_synonym: bool,
        field: &str,
    ) -> Self {
        Self {
            position,
            via,
            term: Some(term.to_string()),
            by_synonym,
            field: Some(field.to_string()),
            observed: None,
        }
    }

    pub fn unmatched(position: usize, observed: Option<(String, String)>) -> Self {
        Self {
            position,
            via: MatchedVia::Unmatched,
            term: None,
            by_synonym: false,
            field: None,
            observed,
        }
    }

    pub fn matched(&self) -> bool {
        self.via != MatchedVia::Unmatched
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductVerdict {
    pub product_id: String,
    pub title: String,
    /// 1-based position in the search results.
    pub position: usize,
    pub results: Vec<MatchResult>,
    pub unmatched: Vec<Token>,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoDataReason {
    EmptyResults,
    ScrapeFailed(String),
}

impl fmt::Display for NoDataReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoDataReason::EmptyResults => write!(f, "search returned no products"),
            NoDataReason::ScrapeFailed(msg) => write!(f, "scrape failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordStatus {
    Passed,
    Flagged,
    /// Keyword produced no tokens; every product passes.
    Unconstrained,
    NoData(NoDataReason),
    InvalidInput(String),
}

impl KeywordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordStatus::Passed => "passed",
            KeywordStatus::Flagged => "flagged",
            KeywordStatus::Unconstrained => "unconstrained",
            KeywordStatus::NoData(_) => "no_data",
            KeywordStatus::InvalidInput(_) => "invalid_input",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordReport {
    pub keyword: Keyword,
    pub tokens: Vec<Token>,
    pub verdicts: Vec<ProductVerdict>,
    pub status: KeywordStatus,
    pub failing_count: usize,
    pub total_count: usize,
    /// Number of failing products per token, in token order.
    pub token_failures: Vec<(Token, usize)>,
}

impl KeywordReport {
    pub fn flagged(&self) -> bool {
        self.status == KeywordStatus::Flagged
    }

    /// Share of products that passed, if there were any.
    pub fn relevance_pct(&self) -> Option<f64> {
        if self.total_count == 0 {
            return None;
        }
        let passing = self.total_count - self.failing_count;
        Some(passing as f64 / self.total_count as f64 * 100.0)
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub query: String,
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("http error: {0}")]
    HttpError(String),
    #[error("request timed out")]
    Timeout,
    #[error("invalid response (status {status})")]
    InvalidResponse { status: u16, body: String },
    #[error(transparent)]
    Parse(#[from] ParserError),
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("html parse error: {0}")]
    HtmlParseError(String),
    #[error("json parse error: {0}")]
    JsonParseError(String),
    #[error("missing field: {0}")]
    MissingField(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("invalid datetime in database: {0}")]
    InvalidDatetime(String),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot read keyword file: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}: no 'keyword' column in header")]
    MissingKeywordColumn(String),
}

/// A keyword row that could not be read; it is reported in place.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("row {row}: {reason}")]
pub struct MalformedRow {
    pub row: usize,
    pub raw: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures that end a whole batch run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Report(#[from] ReportError),
}
