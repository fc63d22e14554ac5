//! Content source abstractions and the plain HTTP cursor fetcher

use async_trait::async_trait;
use std::time::Duration;

use super::post::{RawPage, RawPost};
use crate::error::{BlogError, Result};

/// Fetches a continuation page by its cursor URL
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<RawPage>;
}

/// Queries the headless content repository
#[async_trait]
pub trait ContentSource: PageFetcher {
    /// First page of documents of `doc_type`
    async fn get_by_type(&self, doc_type: &str, page_size: Option<usize>) -> Result<RawPage>;

    /// The document of `doc_type` whose uid is `uid`, or `NotFound`
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawPost>;
}

/// Collect every uid of `doc_type` by following continuation cursors
pub async fn all_uids<S>(source: &S, doc_type: &str) -> Result<Vec<String>>
where
    S: ContentSource + ?Sized,
{
    let mut page = source.get_by_type(doc_type, None).await?;
    let mut uids: Vec<String> = page.results.iter().map(|p| p.uid.clone()).collect();

    while let Some(cursor) = page.cursor().map(str::to_string) {
        page = source.fetch_page(&cursor).await?;
        uids.extend(page.results.iter().map(|p| p.uid.clone()));
    }

    tracing::debug!("Collected {} {} uids", uids.len(), doc_type);
    Ok(uids)
}

/// Issue a GET and parse the body as JSON. Every failure maps to `BlogError::Network`.
pub(crate) async fn get_json(request: reqwest::RequestBuilder, url: &str) -> Result<serde_json::Value> {
    tracing::debug!("GET {}", url);

    let response = request
        .send()
        .await
        .map_err(|e| BlogError::network(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(BlogError::network(url, format!("HTTP status {}", status)));
    }

    let body = response
        .text()
        .await
        .map_err(|e| BlogError::network(url, e))?;

    serde_json::from_str(&body).map_err(|e| BlogError::network(url, format!("invalid JSON: {}", e)))
}

/// Build the shared HTTP client
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("cms-blog/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| BlogError::config(format!("failed to build HTTP client: {}", e)))
}

/// Fetches cursor URLs with a plain GET
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(http_client(timeout)?))
    }

    /// Share an existing client and its connection pool
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<RawPage> {
        let value = get_json(self.client.get(url), url).await?;
        RawPage::from_value(value)
    }
}
