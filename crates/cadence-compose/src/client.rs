// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the content-generation collaborator.
//!
//! Handles request construction, authentication, and transient error retry.
//! Generation requests get up to 2 inline retries on 429/5xx before the
//! failure surfaces to the dispatcher as retryable; refusals (422) surface
//! as permanent so the retry manager skips them.

use std::time::Duration;

use async_trait::async_trait;
use cadence_core::traits::compose::{ComposeRequest, ComposedContent, ContentComposer};
use cadence_core::CadenceError;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::types::{ComposeApiError, InsightsResponse};

/// Inline retry budget for transient generation failures.
const MAX_INLINE_RETRIES: u32 = 2;

/// HTTP client for the compose service.
#[derive(Debug, Clone)]
pub struct ComposeClient {
    client: reqwest::Client,
    base_url: String,
}

impl ComposeClient {
    /// Creates a new compose client.
    pub fn new(base_url: String, api_key: Option<&str>, timeout_secs: u64) -> Result<Self, CadenceError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            headers.insert(
                "x-api-key",
                HeaderValue::from_str(key)
                    .map_err(|e| CadenceError::Config(format!("invalid API key header value: {e}")))?,
            );
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CadenceError::Compose {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_compose(&self, request: &ComposeRequest) -> Result<ComposedContent, CadenceError> {
        let url = format!("{}/v1/compose", self.base_url);
        let mut last_error = None;

        for attempt in 0..=MAX_INLINE_RETRIES {
            if attempt > 0 {
                warn!(attempt, "retrying compose request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| CadenceError::Compose {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "compose response received");

            if status.is_success() {
                return response.json::<ComposedContent>().await.map_err(|e| {
                    CadenceError::Compose {
                        message: format!("malformed compose response: {e}"),
                        source: Some(Box::new(e)),
                    }
                });
            }

            let body = response.text().await.unwrap_or_default();

            // A refusal is a policy decision, not a transient fault.
            if status == StatusCode::UNPROCESSABLE_ENTITY {
                let reason = serde_json::from_str::<ComposeApiError>(&body)
                    .map(|e| e.error)
                    .unwrap_or(body);
                return Err(CadenceError::PermanentDelivery(format!(
                    "composer refused: {reason}"
                )));
            }

            if is_transient(status) && attempt < MAX_INLINE_RETRIES {
                last_error = Some(CadenceError::Compose {
                    message: format!("compose service returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            return Err(CadenceError::Compose {
                message: format!("compose service returned {status}: {body}"),
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| CadenceError::Compose {
            message: "compose request failed after retries".into(),
            source: None,
        }))
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl ContentComposer for ComposeClient {
    async fn compose(&self, request: &ComposeRequest) -> Result<ComposedContent, CadenceError> {
        self.post_compose(request).await
    }

    async fn insights(&self, lead_company: &str) -> Result<Option<String>, CadenceError> {
        let url = format!("{}/v1/insights", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("company", lead_company)])
            .send()
            .await
            .map_err(|e| CadenceError::Compose {
                message: format!("insights request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        // Insights are best-effort: anything but success means none.
        if !response.status().is_success() {
            debug!(status = %response.status(), "no insights available");
            return Ok(None);
        }

        let parsed: InsightsResponse = response.json().await.map_err(|e| CadenceError::Compose {
            message: format!("malformed insights response: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(parsed.insights)
    }
}
