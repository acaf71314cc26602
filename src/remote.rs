//! HTTP client for the remote index service.
//!
//! Wraps the three service endpoints behind [`RemoteClient`]:
//! - `POST /v1/blobs` uploads a batch of blobs
//! - `POST /v1/blobs/delete` retires blob ids
//! - `POST /v1/search` queries the indexed project
//!
//! # Retry Strategy
//!
//! Transient failures retry with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use serde::Deserialize;

use crate::config::Config;
use crate::error::UplinkError;
use crate::models::{Blob, SearchHit};

/// Authenticated client for one remote service.
///
/// Cheap to clone; the inner reqwest client shares its connection pool.
#[derive(Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    max_retries: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

impl RemoteClient {
    pub fn new(config: &Config) -> Result<Self, UplinkError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| UplinkError::RemoteUnavailable(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Upload one batch of blobs for `project`.
    pub async fn upload_blobs(&self, project: &str, blobs: &[Blob]) -> Result<(), UplinkError> {
        let body = serde_json::json!({
            "project": project,
            "blobs": blobs,
        });
        self.post_with_retry("/v1/blobs", &body).await?;
        Ok(())
    }

    /// Retire one batch of blob ids for `project`.
    pub async fn delete_blobs(
        &self,
        project: &str,
        blob_ids: &[String],
    ) -> Result<(), UplinkError> {
        let body = serde_json::json!({
            "project": project,
            "blobIds": blob_ids,
        });
        self.post_with_retry("/v1/blobs/delete", &body).await?;
        Ok(())
    }

    /// Run a search query against the remote index.
    ///
    /// All matching, scoring, and ordering happens on the service side;
    /// the hits come back ready to display.
    pub async fn search(&self, project: &str, query: &str) -> Result<Vec<SearchHit>, UplinkError> {
        let body = serde_json::json!({
            "project": project,
            "query": query,
        });
        let response = self.post_with_retry("/v1/search", &body).await?;
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| UplinkError::RemoteUnavailable(format!("invalid search response: {e}")))?;
        Ok(parsed.results)
    }

    /// POST `body` to `path` with retry/backoff.
    ///
    /// - HTTP 429 or 5xx → retry with exponential backoff
    /// - HTTP 4xx (not 429) → fail immediately
    /// - Network error → retry
    async fn post_with_retry(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, UplinkError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .http
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.token))
                .json(body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let message = response.text().await.unwrap_or_default();
                        last_err = Some(UplinkError::RemoteApi {
                            status: status.as_u16(),
                            message,
                        });
                        continue;
                    }

                    // Client error (not 429): don't retry
                    let message = response.text().await.unwrap_or_default();
                    return Err(UplinkError::RemoteApi {
                        status: status.as_u16(),
                        message,
                    });
                }
                Err(e) => {
                    last_err = Some(UplinkError::RemoteUnavailable(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            UplinkError::RemoteUnavailable("request failed after retries".to_string())
        }))
    }
}
