use chrono::Utc;
use search_auditor::config::{AppConfig, load_config};
use search_auditor::input::read_keywords;
use search_auditor::lexicon::Lexicon;
use search_auditor::model::{KeywordReport, RunError};
use search_auditor::report::write_report;
use search_auditor::runner::{RunOptions, run_batch};
use search_auditor::scraper::ScraperImpl;
use search_auditor::storage::ReportStore;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::time::{Duration, sleep};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.json"));

    let config: Arc<AppConfig> = match load_config(&config_path) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error ({}): {}", config_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    // Malformed vocabularies or synonym tables make every verdict suspect
    let lexicon = match Lexicon::compile(&config.matching) {
        Ok(lexicon) => Arc::new(lexicon),
        Err(e) => {
            error!("Matching config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let scraper = match ScraperImpl::new(&config.scraper) {
        Ok(scraper) => scraper,
        Err(e) => {
            error!("Failed to initialize scraper: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let store = match &config.db_path {
        Some(path) => match ReportStore::new(path) {
            Ok(store) => Some(store),
            Err(e) => {
                error!("Failed to initialize storage: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let options = RunOptions::from_config(&config);

    loop {
        info!("Starting run...");
        if let Err(e) = run_once(&config, &scraper, &lexicon, &options, store.as_ref()).await {
            error!("Run failed: {}", e);
            if config.check_interval_seconds.is_none() {
                return ExitCode::FAILURE;
            }
        }

        let Some(interval) = config.check_interval_seconds else {
            return ExitCode::SUCCESS;
        };
        info!("Waiting for timer ({}s) or Ctrl-C...", interval);
        tokio::select! {
            _ = sleep(Duration::from_secs(interval)) => {
                info!("Timer triggered.");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down.");
                return ExitCode::SUCCESS;
            }
        }
    }
}

/// Reads the keyword list, validates every keyword and writes the report.
async fn run_once(
    config: &AppConfig,
    scraper: &ScraperImpl,
    lexicon: &Lexicon,
    options: &RunOptions,
    store: Option<&ReportStore>,
) -> Result<(), RunError> {
    let started_at = Utc::now();
    let rows = read_keywords(&config.keywords_path)?;
    info!("Keywords to process: {}", rows.len());

    let reports = run_batch(rows, scraper, lexicon, options).await;

    if let Some(store) = store {
        log_status_changes(store, &reports);
        match store.record_run(started_at, &reports) {
            Ok(run_id) => info!("Run #{} saved to history", run_id),
            Err(e) => warn!("History save failed: {}", e),
        }
    }

    let flagged = reports.iter().filter(|r| r.flagged()).count();
    let written = write_report(&config.report_path, reports)?;
    info!("Run finished: {} keywords, {} flagged", written, flagged);
    Ok(())
}

fn log_status_changes(store: &ReportStore, reports: &[KeywordReport]) {
    for report in reports {
        match store.last_status(&report.keyword.text) {
            Ok(Some(prev)) if prev.status != report.status.as_str() => {
                info!(
                    "'{}' changed: {} -> {} (last checked {})",
                    report.keyword.text,
                    prev.status,
                    report.status.as_str(),
                    prev.recorded_at
                );
            }
            Ok(_) => {}
            Err(e) => warn!("History lookup failed: {}", e),
        }
    }
}
