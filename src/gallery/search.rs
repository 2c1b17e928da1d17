//! Image search client for the Pixabay API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// One hit of a search. `url` is absent when the provider gave no usable image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub url: Option<String>,
}

/// One provider page of results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    /// Number of hits the provider will serve for this query.
    pub total_hits: u64,
    pub items: Vec<ImageRef>,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Keyword search over an image provider.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    /// Fetch 1-based `page` of results for `query`.
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage, SearchError>;
}

/// Lowercase, trim and collapse inner whitespace.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Deserialize, Debug)]
struct ApiResponse {
    #[serde(default)]
    total: u64,
    #[serde(rename = "totalHits", default)]
    total_hits: u64,
    #[serde(default)]
    hits: Vec<ApiHit>,
}

#[derive(Deserialize, Debug)]
struct ApiHit {
    #[serde(rename = "fullHDURL")]
    full_hd_url: Option<String>,
    #[serde(rename = "largeImageURL")]
    large_image_url: Option<String>,
}

pub struct PixabayClient {
    api_key: String,
    api_url: String,
    per_page: u32,
    large_image_fallback: bool,
    client: reqwest::Client,
}

impl PixabayClient {
    pub fn new(
        api_key: String,
        api_url: String,
        per_page: u32,
        timeout: Duration,
        large_image_fallback: bool,
    ) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            api_url,
            per_page,
            large_image_fallback,
            client,
        })
    }
}

#[async_trait]
impl ImageSearch for PixabayClient {
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage, SearchError> {
        let query = normalize_query(query);
        info!("🔎 Searching \"{}\" page {}", query, page);

        let page_param = page.to_string();
        let per_page_param = self.per_page.to_string();
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("image_type", "photo"),
                ("safesearch", "true"),
                ("q", query.as_str()),
                ("page", page_param.as_str()),
                ("per_page", per_page_param.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Http(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("failed to read response: {e}")))?;

        debug!("Pixabay response status: {status}");

        if status == StatusCode::BAD_REQUEST && is_page_out_of_range(&body) {
            info!("Page {} is past the end of \"{}\"", page, query);
            return Ok(SearchPage::default());
        }
        if !status.is_success() {
            return Err(SearchError::Api { status: status.as_u16(), body });
        }

        parse_response(&body, self.large_image_fallback)
    }
}

fn is_page_out_of_range(body: &str) -> bool {
    body.contains("out of valid range")
}

fn parse_response(body: &str, large_image_fallback: bool) -> Result<SearchPage, SearchError> {
    let parsed: ApiResponse =
        serde_json::from_str(body).map_err(|e| SearchError::Parse(e.to_string()))?;

    debug!("Pixabay total={} totalHits={}", parsed.total, parsed.total_hits);

    let items = parsed
        .hits
        .into_iter()
        .map(|hit| {
            let url = match hit.full_hd_url {
                Some(url) => Some(url),
                None if large_image_fallback => hit.large_image_url,
                None => None,
            };
            ImageRef { url }
        })
        .collect();

    Ok(SearchPage {
        total_hits: parsed.total_hits,
        items,
    })
}
