use crate::analyzer::invalid_input;
use crate::config::AppConfig;
use crate::export::write_llm_digest;
use crate::input::KeywordRow;
use crate::lexicon::Lexicon;
use crate::model::{Keyword, KeywordReport, NoDataReason, ScrapeRequest, ScraperError};
use crate::pipeline::Received;
use crate::scraper::Scraper;
use crate::utils::to_kebab_case;
use futures::stream::{self, StreamExt};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_concurrent: usize,
    /// Where bodies of failed responses are saved.
    pub debug_html_dir: Option<PathBuf>,
    pub llm_export_dir: Option<PathBuf>,
}

impl RunOptions {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            max_concurrent: cfg.max_concurrent_keywords,
            debug_html_dir: Some(cfg.debug_html_dir.clone()),
            llm_export_dir: cfg.llm_export_dir.clone(),
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            debug_html_dir: None,
            llm_export_dir: None,
        }
    }
}

/// Validates every keyword row, at most `max_concurrent` at a time.
///
/// One report per row, sorted back into input order. Nothing here fails the
/// batch: bad rows and failed searches become reports of their own.
pub async fn run_batch<S: Scraper + ?Sized>(
    rows: Vec<KeywordRow>,
    scraper: &S,
    lexicon: &Lexicon,
    options: &RunOptions,
) -> Vec<KeywordReport> {
    let mut reports: Vec<KeywordReport> = stream::iter(rows)
        .map(|row| async move {
            match row {
                Ok(keyword) => process_keyword(keyword, scraper, lexicon, options).await,
                Err(bad) => {
                    warn!("Skipping malformed {}", bad);
                    invalid_input(bad.row, &bad.raw, &bad.reason)
                }
            }
        })
        .buffer_unordered(options.max_concurrent.max(1))
        .collect()
        .await;

    reports.sort_by_key(|report| report.keyword.row);
    reports
}

/// Searches for one keyword and validates what came back.
pub async fn process_keyword<S: Scraper + ?Sized>(
    keyword: Keyword,
    scraper: &S,
    lexicon: &Lexicon,
    options: &RunOptions,
) -> KeywordReport {
    info!("Processing keyword #{}: {}", keyword.row, keyword.text);
    let tokenized = Received::new(keyword).tokenize(lexicon);
    debug!(
        "Tokens: {}",
        tokenized
            .tokens()
            .iter()
            .map(|t| t.label())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let request = ScrapeRequest {
        query: tokenized.keyword().text.clone(),
    };
    let products = match scraper.search(&request).await {
        Ok(products) => products,
        Err(ScraperError::InvalidResponse { status, body }) => {
            warn!("Search for '{}' returned status {}", request.query, status);
            if let Some(dir) = &options.debug_html_dir {
                save_debug_body(dir, &request.query, &body);
            }
            return tokenized.no_data(NoDataReason::ScrapeFailed(format!(
                "invalid response (status {})",
                status
            )));
        }
        Err(e) => {
            warn!("Scraper error for '{}': {}", request.query, e);
            return tokenized.no_data(NoDataReason::ScrapeFailed(e.to_string()));
        }
    };
    info!("'{}': {} products", request.query, products.len());

    if let Some(dir) = &options.llm_export_dir {
        if !products.is_empty() {
            match write_llm_digest(dir, tokenized.keyword(), &products) {
                Ok(path) => debug!("LLM digest saved: {}", path.display()),
                Err(e) => warn!("Failed to write LLM digest: {}", e),
            }
        }
    }

    match tokenized.normalize(&products, lexicon) {
        Ok(normalized) => normalized.match_tokens(lexicon).aggregate(lexicon),
        Err(report) => {
            warn!("No products for '{}'", request.query);
            report
        }
    }
}

/// Saves a failed response body for debugging.
fn save_debug_body(folder: &Path, query: &str, body: &str) {
    if let Err(e) = fs::create_dir_all(folder) {
        warn!("Failed to create debug folder: {}", e);
        return;
    }
    let filename = folder.join(format!("debug-{}.html", to_kebab_case(query)));
    if let Err(e) = fs::write(&filename, body) {
        warn!("Failed to write debug HTML: {}", e);
    } else {
        info!("Saved debug HTML: {}", filename.display());
    }
}
