//! Upstream gateway: free-text completion and document-store search against
//! one configured endpoint.
//!
//! This is the sole boundary converting raw transport failures into a typed
//! result; callers never see a reqwest error. Every call is single-attempt.

use serde::{Deserialize, Serialize};

/// Sentinel reason when the completion call cannot reach the service.
pub const UPSTREAM_UNREACHABLE: &str = "upstream-unreachable";
/// Sentinel reason when the search call cannot reach the service.
pub const SEARCH_UNREACHABLE: &str = "search-unreachable";

/// One file entry from a search response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub url: String,
}

/// Outcome of one gateway call, consumed once by the relay path or the
/// progress controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayResult {
    /// Completion text from the remote processor.
    Text(String),
    /// Search hits; empty when the service responded but listed no files.
    Files(Vec<FileEntry>),
    /// Transport or parse failure, normalized to a sentinel reason.
    Failure(&'static str),
}

#[derive(Debug, thiserror::Error)]
enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream api error: {0}")]
    Api(String),
}

#[derive(Debug, Serialize)]
struct CompleteRequest<'a> {
    text: &'a str,
    #[serde(rename = "chatId")]
    chat_id: i64,
}

#[derive(Debug, Deserialize)]
struct CompleteResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    action: &'static str,
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    files: Option<Vec<FileEntry>>,
}

/// Async seam over the upstream service so the router and progress controller
/// can be exercised against mocks.
#[async_trait::async_trait]
pub trait UpstreamBackend: Send + Sync {
    /// Relay free text; `GatewayResult::Text` on success.
    async fn complete(&self, text: &str, chat_id: i64) -> GatewayResult;
    /// Search the document store; `GatewayResult::Files` on success.
    async fn search(&self, query: &str) -> GatewayResult;
}

/// HTTP client for the configured upstream endpoint.
#[derive(Clone)]
pub struct UpstreamClient {
    base_url: String,
    client: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    async fn post_json<T, B>(&self, body: &B) -> Result<T, UpstreamError>
    where
        T: serde::de::DeserializeOwned,
        B: Serialize,
    {
        let res = self.client.post(&self.base_url).json(body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(UpstreamError::Api(format!("{} {}", status, body)));
        }
        Ok(res.json().await?)
    }
}

#[async_trait::async_trait]
impl UpstreamBackend for UpstreamClient {
    /// POST `{text, chatId}`; expects `{response}`.
    async fn complete(&self, text: &str, chat_id: i64) -> GatewayResult {
        let body = CompleteRequest { text, chat_id };
        match self.post_json::<CompleteResponse, _>(&body).await {
            Ok(data) => GatewayResult::Text(data.response),
            Err(e) => {
                log::debug!("upstream complete failed: {}", e);
                GatewayResult::Failure(UPSTREAM_UNREACHABLE)
            }
        }
    }

    /// POST `{action: "DRIVE_SEARCH", query}`; expects `{files?}`. A missing
    /// or empty file list is a successful no-hit response, not a failure.
    async fn search(&self, query: &str) -> GatewayResult {
        let body = SearchRequest {
            action: "DRIVE_SEARCH",
            query,
        };
        match self.post_json::<SearchResponse, _>(&body).await {
            Ok(data) => GatewayResult::Files(data.files.unwrap_or_default()),
            Err(e) => {
                log::debug!("upstream search failed: {}", e);
                GatewayResult::Failure(SEARCH_UNREACHABLE)
            }
        }
    }
}
