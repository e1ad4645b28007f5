use crate::config::{ApiBackend, HtmlBackend, ScraperConfig, SearchBackend};
use crate::model::{Product, ScrapeRequest, ScraperError};
use crate::parser::{ApiParser, HtmlParser, Parser};
use crate::scraper::traits::Scraper;
use rand::Rng;
use reqwest::{Client, RequestBuilder};
use serde_json::json;
use tokio::time::{Duration, sleep};
use tracing::debug;

/// Backend config plus, for HTML listings, the selectors compiled once.
enum Backend {
    Api(ApiBackend),
    Html(HtmlBackend, HtmlParser),
}

pub struct ScraperImpl {
    client: Client,
    backend: Backend,
    page_delay: Duration,
}

impl ScraperImpl {
    pub fn new(cfg: &ScraperConfig) -> Result<Self, ScraperError> {
        let backend = match &cfg.backend {
            SearchBackend::Api(api) => Backend::Api(api.clone()),
            SearchBackend::Html(html) => {
                Backend::Html(html.clone(), HtmlParser::from_backend(html)?)
            }
        };
        let client = Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .build()
            .map_err(|e| ScraperError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            backend,
            page_delay: Duration::from_millis(cfg.page_delay_ms),
        })
    }

    async fn search_api(
        &self,
        api: &ApiBackend,
        req: &ScrapeRequest,
    ) -> Result<Vec<Product>, ScraperError> {
        let mut request = self.client.post(&api.endpoint).json(&json!({
            "query": req.query,
            "size": api.result_size,
            "force_exploding_variants": false,
        }));
        if let Some(shop_id) = &api.shop_id {
            request = request.query(&[("shop_id", shop_id.as_str())]);
        }
        let body = send(request).await?;
        Ok(ApiParser::new(&api.id_field).parse(&body)?)
    }

    async fn search_html(
        &self,
        html: &HtmlBackend,
        parser: &HtmlParser,
        req: &ScrapeRequest,
    ) -> Result<Vec<Product>, ScraperError> {
        let mut products = Vec::new();
        for page in 1..=html.max_pages.max(1) {
            if page > 1 {
                sleep(jittered_delay(self.page_delay)).await;
            }
            let page_number = page.to_string();
            let request = self.client.get(&html.search_url).query(&[
                (html.query_param.as_str(), req.query.as_str()),
                (html.page_param.as_str(), page_number.as_str()),
            ]);
            let body = send(request).await?;
            // The parsed document is dropped before the next await.
            let found = parser.parse_from(&body, products.len() + 1);
            debug!("'{}' page {}: {} products", req.query, page, found.len());
            if found.is_empty() {
                break;
            }
            products.extend(found);
        }
        Ok(products)
    }
}

#[async_trait::async_trait]
impl Scraper for ScraperImpl {
    async fn search(&self, req: &ScrapeRequest) -> Result<Vec<Product>, ScraperError> {
        match &self.backend {
            Backend::Api(api) => self.search_api(api, req).await,
            Backend::Html(html, parser) => self.search_html(html, parser, req).await,
        }
    }
}

async fn send(request: RequestBuilder) -> Result<String, ScraperError> {
    let response = request.send().await.map_err(map_reqwest_error)?;
    let status = response.status();
    let body = response.text().await.map_err(map_reqwest_error)?;
    if !status.is_success() {
        return Err(ScraperError::InvalidResponse {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

fn map_reqwest_error(e: reqwest::Error) -> ScraperError {
    if e.is_timeout() {
        ScraperError::Timeout
    } else {
        ScraperError::HttpError(e.to_string())
    }
}

/// Base delay plus up to 50% random jitter.
fn jittered_delay(base: Duration) -> Duration {
    let base_ms = base.as_millis() as u64;
    if base_ms == 0 {
        return base;
    }
    let jitter = rand::rng().random_range(0..=base_ms / 2);
    Duration::from_millis(base_ms + jitter)
}
