use search_auditor::config::MatchConfig;
use search_auditor::input::parse_keywords;
use search_auditor::lexicon::Lexicon;
use search_auditor::model::{
    KeywordStatus, NoDataReason, Product, ScrapeRequest, ScraperError, TokenClass,
};
use search_auditor::report::write_report;
use search_auditor::runner::{RunOptions, run_batch};
use search_auditor::scraper::Scraper;
use search_auditor::storage::ReportStore;
use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::{Duration, sleep};

enum Canned {
    Products(Vec<Product>),
    Status(u16),
    Timeout,
}

/// Answers searches from a fixed table; unknown queries find nothing.
struct MockScraper {
    results: HashMap<String, (u64, Canned)>,
    calls: AtomicUsize,
}

impl MockScraper {
    fn new() -> Self {
        Self {
            results: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn with(mut self, query: &str, delay_ms: u64, canned: Canned) -> Self {
        self.results.insert(query.to_string(), (delay_ms, canned));
        self
    }
}

#[async_trait::async_trait]
impl Scraper for MockScraper {
    async fn search(&self, req: &ScrapeRequest) -> Result<Vec<Product>, ScraperError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some((delay_ms, canned)) = self.results.get(&req.query) else {
            return Ok(Vec::new());
        };
        sleep(Duration::from_millis(*delay_ms)).await;
        match canned {
            Canned::Products(products) => Ok(products.clone()),
            Canned::Status(status) => Err(ScraperError::InvalidResponse {
                status: *status,
                body: "<html>blocked</html>".into(),
            }),
            Canned::Timeout => Err(ScraperError::Timeout),
        }
    }
}

fn lexicon() -> Lexicon {
    let mut cfg = MatchConfig::default();
    cfg.vocabularies.insert(
        TokenClass::Category,
        vec!["running shoes".into(), "jacket".into()],
    );
    Lexicon::compile(&cfg).unwrap()
}

fn scraper() -> MockScraper {
    MockScraper::new()
        .with(
            "men's blue running shoes",
            60,
            Canned::Products(vec![
                Product::new("1")
                    .with_field("title", "Men's Running Shoes Model X")
                    .with_field("color", "Blue"),
                Product::new("2")
                    .with_field("title", "Men's Running Shoes Model Y")
                    .with_field("color", "Red"),
            ]),
        )
        .with(
            "blue jacket",
            0,
            Canned::Products(vec![Product::new("3")
                .with_field("title", "Blue Jacket")
                .with_field("description", "Lightweight shell")]),
        )
        .with("red jacket", 20, Canned::Status(429))
        .with("wool socks", 5, Canned::Timeout)
}

const KEYWORDS: &str = "id,keyword\n\
    a,men's blue running shoes\n\
    b,blue jacket\n\
    c\n\
    d,red jacket\n\
    e,wool socks\n\
    f,green scarf\n\
    g,\n";

#[tokio::test]
async fn batch_reports_every_row_in_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let options = RunOptions {
        max_concurrent: 3,
        debug_html_dir: Some(dir.path().join("html")),
        llm_export_dir: Some(dir.path().join("llm")),
    };
    let rows = parse_keywords(KEYWORDS, ',', "keywords.csv").unwrap();
    let scraper = scraper();

    let reports = run_batch(rows, &scraper, &lexicon(), &options).await;

    let rows: Vec<usize> = reports.iter().map(|r| r.keyword.row).collect();
    assert_eq!(rows, vec![1, 2, 3, 4, 5, 6, 7]);
    let statuses: Vec<&str> = reports.iter().map(|r| r.status.as_str()).collect();
    assert_eq!(
        statuses,
        vec![
            "flagged",
            "passed",
            "invalid_input",
            "no_data",
            "no_data",
            "no_data",
            "invalid_input",
        ]
    );
    // Neither the malformed row nor the blank keyword reaches the scraper.
    assert_eq!(scraper.calls.load(Ordering::SeqCst), 5);

    assert_eq!(reports[0].failing_count, 1);
    assert_eq!(reports[0].total_count, 2);
    assert_eq!(
        reports[3].status,
        KeywordStatus::NoData(NoDataReason::ScrapeFailed("invalid response (status 429)".into()))
    );
    assert_eq!(
        reports[4].status,
        KeywordStatus::NoData(NoDataReason::ScrapeFailed("request timed out".into()))
    );
    assert_eq!(reports[5].status, KeywordStatus::NoData(NoDataReason::EmptyResults));
    assert_eq!(
        reports[6].status,
        KeywordStatus::InvalidInput("empty keyword".into())
    );

    let debug_path = dir.path().join("html").join("debug-red-jacket.html");
    let debug = fs::read_to_string(debug_path).unwrap();
    assert_eq!(debug, "<html>blocked</html>");
    let digest = fs::read_to_string(dir.path().join("llm").join("002-blue-jacket.txt")).unwrap();
    assert!(digest.contains("prod 1:\ntitle: Blue Jacket\ndescription: Lightweight shell"));
}

#[tokio::test]
async fn report_and_history_written_after_batch() {
    let dir = tempfile::tempdir().unwrap();
    let rows = parse_keywords(KEYWORDS, ',', "keywords.csv").unwrap();
    let reports = run_batch(rows, &scraper(), &lexicon(), &RunOptions::default()).await;

    let store = ReportStore::new(&dir.path().join("history.db")).unwrap();
    store.record_run(chrono::Utc::now(), &reports).unwrap();
    let prev = store.last_status("blue jacket").unwrap().unwrap();
    assert_eq!(prev.status, "passed");

    let path = dir.path().join("report.csv");
    assert_eq!(write_report(&path, reports).unwrap(), 7);
    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 8);
    assert!(lines[0].starts_with("row,keyword,status,flagged"));
    assert!(lines[1].starts_with("1,men's blue running shoes,flagged,true,1,2,50.0,"));
    assert!(lines[1].contains("missing blue[color] (color: red)"));
    assert!(lines[3].starts_with("3,c,invalid_input,false"));
}

#[tokio::test]
async fn single_worker_gives_same_reports() {
    let lex = lexicon();
    let parallel = run_batch(
        parse_keywords(KEYWORDS, ',', "k.csv").unwrap(),
        &scraper(),
        &lex,
        &RunOptions::default(),
    )
    .await;
    let serial = run_batch(
        parse_keywords(KEYWORDS, ',', "k.csv").unwrap(),
        &scraper(),
        &lex,
        &RunOptions {
            max_concurrent: 1,
            ..RunOptions::default()
        },
    )
    .await;
    assert_eq!(parallel, serial);
}
