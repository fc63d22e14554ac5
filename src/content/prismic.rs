//! Prismic REST API v2 client

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::post::{RawPage, RawPost};
use super::source::{get_json, http_client, ContentSource, HttpPageFetcher, PageFetcher};
use crate::config::PrismicConfig;
use crate::error::{BlogError, Result};

/// API root document, only the refs are of interest
#[derive(Debug, Deserialize)]
struct ApiRoot {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// Content source backed by a Prismic repository
pub struct PrismicClient {
    http: reqwest::Client,
    /// Follows `next_page` cursors, which already carry the query
    pages: HttpPageFetcher,
    endpoint: String,
    access_token: Option<String>,
    master_ref: OnceCell<String>,
}

impl PrismicClient {
    /// Create a client for the configured repository
    pub fn new(config: &PrismicConfig) -> Result<Self> {
        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        if endpoint.is_empty() {
            return Err(BlogError::config(
                "prismic.endpoint is not set (or set PRISMIC_API_ENDPOINT)",
            ));
        }

        let http = http_client(Duration::from_secs(config.timeout_secs))?;
        Ok(Self {
            pages: HttpPageFetcher::with_client(http.clone()),
            http,
            endpoint,
            access_token: config.access_token.clone(),
            master_ref: OnceCell::new(),
        })
    }

    /// The master ref, fetched from the API root on first use
    async fn master_ref(&self) -> Result<&str> {
        let reference = self
            .master_ref
            .get_or_try_init(|| async {
                let url = self.url(&self.endpoint, &[])?;
                let value = get_json(self.http.get(url.clone()), url.as_str()).await?;
                let root: ApiRoot = serde_json::from_value(value)
                    .map_err(|e| BlogError::malformed(format!("API root: {}", e)))?;
                root.refs
                    .into_iter()
                    .find(|r| r.is_master_ref)
                    .map(|r| r.reference)
                    .ok_or_else(|| BlogError::malformed("API root has no master ref"))
            })
            .await?;
        Ok(reference.as_str())
    }

    /// Build a URL, appending the access token when configured
    fn url(&self, base: &str, params: &[(&str, String)]) -> Result<reqwest::Url> {
        let mut params: Vec<(&str, String)> = params.to_vec();
        if let Some(token) = &self.access_token {
            params.push(("access_token", token.clone()));
        }
        reqwest::Url::parse_with_params(base, &params)
            .map_err(|e| BlogError::config(format!("invalid endpoint '{}': {}", base, e)))
    }

    async fn search(&self, predicate: String, page_size: Option<usize>) -> Result<RawPage> {
        let mut params = vec![("ref", self.master_ref().await?.to_string()), ("q", predicate)];
        if let Some(size) = page_size {
            params.push(("pageSize", size.to_string()));
        }

        let url = self.url(&format!("{}/documents/search", self.endpoint), &params)?;
        let value = get_json(self.http.get(url.clone()), url.as_str()).await?;
        RawPage::from_value(value)
    }
}

/// `[[at(path, "value")]]` predicate with the value as a quoted string literal
fn at_predicate(path: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!(r#"[[at({}, "{}")]]"#, path, escaped)
}

#[async_trait]
impl PageFetcher for PrismicClient {
    async fn fetch_page(&self, url: &str) -> Result<RawPage> {
        self.pages.fetch_page(url).await
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn get_by_type(&self, doc_type: &str, page_size: Option<usize>) -> Result<RawPage> {
        self.search(at_predicate("document.type", doc_type), page_size)
            .await
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawPost> {
        let path = format!("my.{}.uid", doc_type);
        let page = self.search(at_predicate(&path, uid), Some(1)).await?;
        page.results
            .into_iter()
            .next()
            .ok_or_else(|| BlogError::NotFound {
                slug: uid.to_string(),
            })
    }
}
