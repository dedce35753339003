//! Google Custom Search client.
//!
//! Every runtime failure (transport, status, timeout, malformed body) turns
//! into [`SearchOutcome::Degraded`]; only missing credentials are an error,
//! and those are caught before a client can be built.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::core::config::SearchCredentials;
use crate::core::errors::ApiError;

const GOOGLE_CSE_URL: &str = "https://www.googleapis.com/customsearch/v1";
pub const MAX_RESULTS: usize = 5;
pub const SEARCH_LANGUAGE: &str = "lang_es";
pub const SEARCH_COUNTRY: &str = "co";
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Dense 1-based rank.
    pub position: u32,
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub display_link: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Hits(Vec<SearchHit>),
    Degraded { reason: String },
}

impl SearchOutcome {
    pub fn into_hits(self) -> Vec<SearchHit> {
        match self {
            SearchOutcome::Hits(hits) => hits,
            SearchOutcome::Degraded { .. } => Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SearchOutcome::Degraded { .. })
    }
}

#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &str, num_results: usize) -> SearchOutcome;
}

pub struct GoogleCseClient {
    credentials: SearchCredentials,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleCseClient {
    /// Google endpoint over a shared client built with [`build_client`].
    pub fn new(credentials: SearchCredentials, client: reqwest::Client) -> Self {
        Self::with_client(credentials, GOOGLE_CSE_URL, client)
    }

    pub fn with_endpoint(
        credentials: SearchCredentials,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        Ok(Self::with_client(credentials, base_url, build_client(timeout)?))
    }

    pub fn with_client(credentials: SearchCredentials, base_url: &str, client: reqwest::Client) -> Self {
        Self {
            credentials,
            base_url: base_url.to_string(),
            client,
        }
    }

    fn request_url(&self, query: &str, num: usize) -> String {
        format!(
            "{}?key={}&cx={}&q={}&num={}&lr={}&gl={}",
            self.base_url,
            urlencoding::encode(&self.credentials.api_key),
            urlencoding::encode(&self.credentials.engine_id),
            urlencoding::encode(query),
            num,
            SEARCH_LANGUAGE,
            SEARCH_COUNTRY
        )
    }

    async fn google_search(&self, query: &str, num: usize) -> Result<Vec<SearchHit>, ApiError> {
        let response = self
            .client
            .get(self.request_url(query, num))
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !response.status().is_success() {
            return Err(ApiError::Internal(format!(
                "Google search failed: {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await.map_err(ApiError::internal)?;
        Ok(parse_items(&payload))
    }
}

pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ApiError::internal)
}

#[async_trait]
impl WebSearcher for GoogleCseClient {
    async fn search(&self, query: &str, num_results: usize) -> SearchOutcome {
        let num = num_results.min(MAX_RESULTS);
        if num == 0 || query.trim().is_empty() {
            return SearchOutcome::Hits(Vec::new());
        }

        match self.google_search(query, num).await {
            Ok(hits) => {
                tracing::debug!(query = %query, hits = hits.len(), "web search finished");
                SearchOutcome::Hits(hits)
            }
            Err(err) => {
                tracing::warn!(query = %query, "web search degraded: {}", err);
                SearchOutcome::Degraded {
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// Items without a link are dropped, as are repeated links; positions are
/// assigned after filtering so they stay dense.
fn parse_items(payload: &Value) -> Vec<SearchHit> {
    let Some(items) = payload.get("items").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    let field = |item: &Value, key: &str| {
        item.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string()
    };

    let mut seen = HashSet::new();
    let mut hits = Vec::new();
    for item in items {
        let url = field(item, "link");
        if url.is_empty() || !seen.insert(url.clone()) {
            continue;
        }
        hits.push(SearchHit {
            position: hits.len() as u32 + 1,
            title: field(item, "title"),
            url,
            snippet: field(item, "snippet"),
            display_link: field(item, "displayLink"),
        });
    }
    hits
}
