use crate::model::{ConfigError, TokenClass};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpusMatch {
    /// Token words must appear as whole words.
    #[default]
    WordBoundary,
    /// Free-text tokens may match as a plain substring of the corpus.
    Contains,
}

/// Vocabularies, synonym tables and matching policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub stop_words: Vec<String>,
    pub phrases: Vec<String>,
    pub vocabularies: BTreeMap<TokenClass, Vec<String>>,
    /// Canonical term -> aliases.
    pub synonyms: BTreeMap<String, Vec<String>>,
    pub class_fields: BTreeMap<TokenClass, Vec<String>>,
    /// Words that force the class of the word after them, e.g. "size".
    pub class_markers: BTreeMap<String, TokenClass>,
    /// Fields that make up the corpus; empty means every non-identifier field.
    pub corpus_fields: Vec<String>,
    pub free_text_tolerance: usize,
    /// Skips lowercasing for keywords, product fields and every table here.
    /// Vocabulary terms must then be listed in each casing that should
    /// classify: with the lowercase defaults, `Blue` is free text.
    pub case_sensitive: bool,
    pub corpus_match: CorpusMatch,
    pub fallback_on_field_conflict: bool,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for MatchConfig {
    fn default() -> Self {
        let vocabularies = BTreeMap::from([
            (
                TokenClass::Color,
                strings(&[
                    "black", "white", "red", "blue", "green", "yellow", "pink", "purple",
                    "orange", "brown", "grey", "gray", "beige", "navy", "silver", "gold",
                ]),
            ),
            (
                TokenClass::Size,
                strings(&["xxs", "xs", "xl", "xxl", "xxxl", "small", "medium", "large"]),
            ),
            (
                TokenClass::Gender,
                strings(&[
                    "men's", "mens", "men", "women's", "womens", "women", "boys", "girls",
                    "kids", "unisex",
                ]),
            ),
            (
                TokenClass::Material,
                strings(&[
                    "cotton", "leather", "wool", "polyester", "denim", "silk", "linen", "suede",
                ]),
            ),
        ]);

        let synonyms = BTreeMap::from([
            ("men's".to_string(), strings(&["mens", "men"])),
            ("women's".to_string(), strings(&["womens", "women"])),
            ("grey".to_string(), strings(&["gray"])),
        ]);

        let class_fields = BTreeMap::from([
            (TokenClass::Color, strings(&["color", "colour"])),
            (TokenClass::Size, strings(&["size"])),
            (TokenClass::Gender, strings(&["gender", "department"])),
            (TokenClass::Category, strings(&["category", "breadcrumb", "product_type"])),
            (TokenClass::Material, strings(&["material"])),
            (TokenClass::Brand, strings(&["brand"])),
        ]);

        Self {
            stop_words: strings(&[
                "a", "an", "the", "for", "and", "with", "of", "in", "on", "to", "by",
            ]),
            phrases: Vec::new(),
            vocabularies,
            synonyms,
            class_fields,
            class_markers: BTreeMap::from([("size".to_string(), TokenClass::Size)]),
            corpus_fields: Vec::new(),
            free_text_tolerance: 0,
            case_sensitive: false,
            corpus_match: CorpusMatch::WordBoundary,
            fallback_on_field_conflict: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiBackend {
    pub endpoint: String,
    #[serde(default)]
    pub shop_id: Option<String>,
    #[serde(default = "default_result_size")]
    pub result_size: usize,
    #[serde(default = "default_id_field")]
    pub id_field: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HtmlBackend {
    pub search_url: String,
    #[serde(default = "default_query_param")]
    pub query_param: String,
    #[serde(default = "default_page_param")]
    pub page_param: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    pub item_selector: String,
    #[serde(default)]
    pub id_selector: Option<String>,
    #[serde(default = "default_id_attr")]
    pub id_attr: String,
    /// Product field name -> CSS selector, relative to the item.
    pub field_selectors: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchBackend {
    Api(ApiBackend),
    Html(HtmlBackend),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    pub backend: SearchBackend,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub keywords_path: PathBuf,
    pub report_path: PathBuf,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub llm_export_dir: Option<PathBuf>,
    #[serde(default = "default_debug_html_dir")]
    pub debug_html_dir: PathBuf,
    #[serde(default = "default_max_concurrent_keywords")]
    pub max_concurrent_keywords: usize,
    /// Re-run the batch on this interval instead of exiting after one pass.
    #[serde(default)]
    pub check_interval_seconds: Option<u64>,
    #[serde(default)]
    pub matching: MatchConfig,
    pub scraper: ScraperConfig,
}

fn default_result_size() -> usize {
    500
}

fn default_id_field() -> String {
    "product_id".into()
}

fn default_query_param() -> String {
    "q".into()
}

fn default_page_param() -> String {
    "page".into()
}

fn default_max_pages() -> usize {
    1
}

fn default_id_attr() -> String {
    "href".into()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) SearchAuditor/0.1".into()
}

fn default_page_delay_ms() -> u64 {
    500
}

fn default_debug_html_dir() -> PathBuf {
    PathBuf::from("logs/html")
}

fn default_max_concurrent_keywords() -> usize {
    4
}

pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content)?;
    if config.max_concurrent_keywords == 0 {
        return Err(ConfigError::Invalid(
            "max_concurrent_keywords must be at least 1".into(),
        ));
    }
    if let SearchBackend::Html(html) = &config.scraper.backend {
        if html.field_selectors.is_empty() {
            return Err(ConfigError::Invalid(
                "html backend needs at least one field selector".into(),
            ));
        }
    }
    Ok(config)
}
