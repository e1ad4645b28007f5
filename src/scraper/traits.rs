use crate::model::{Product, ScrapeRequest, ScraperError};

/// Runs a site search and returns the products in result order.
#[async_trait::async_trait]
pub trait Scraper: Send + Sync {
    async fn search(&self, req: &ScrapeRequest) -> Result<Vec<Product>, ScraperError>;
}
