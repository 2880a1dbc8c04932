// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the telephony provider (Bland-style API).
//!
//! Starts outbound calls; completion data arrives asynchronously through the
//! webhook ingestor, keyed by the provider call id returned here.

use std::time::Duration;

use async_trait::async_trait;
use cadence_core::traits::transport::CallTransport;
use cadence_core::CadenceError;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct StartCallResponse {
    call_id: String,
}

/// Production telephony client.
#[derive(Debug, Clone)]
pub struct TelephonyClient {
    client: reqwest::Client,
    base_url: String,
    callback_url: Option<String>,
}

impl TelephonyClient {
    pub fn new(
        base_url: String,
        callback_url: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, CadenceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CadenceError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            callback_url,
        })
    }
}

#[async_trait]
impl CallTransport for TelephonyClient {
    async fn start_call(
        &self,
        phone_number: &str,
        script: &str,
        api_key: &SecretString,
    ) -> Result<String, CadenceError> {
        let url = format!("{}/v1/calls", self.base_url);
        let body = serde_json::json!({
            "phone_number": phone_number,
            "task": script,
            "webhook": self.callback_url,
        });

        let response = self
            .client
            .post(&url)
            .header("authorization", api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| CadenceError::Transport {
                message: format!("telephony request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if status.is_success() {
            let parsed: StartCallResponse =
                response.json().await.map_err(|e| CadenceError::Transport {
                    message: format!("malformed telephony response: {e}"),
                    source: Some(Box::new(e)),
                })?;
            tracing::info!(call_id = %parsed.call_id, "call initiated");
            return Ok(parsed.call_id);
        }

        let text = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                CadenceError::Auth(format!("telephony auth failed: {text}"))
            }
            StatusCode::TOO_MANY_REQUESTS => CadenceError::RateLimited(text),
            StatusCode::PAYMENT_REQUIRED => {
                // Provider "insufficient_credit" behaves like a window cap.
                CadenceError::RateLimited(format!("insufficient credit: {text}"))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                CadenceError::PermanentDelivery(format!("invalid call request: {text}"))
            }
            _ => CadenceError::Transport {
                message: format!("telephony returned {status}: {text}"),
                source: None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn key() -> SecretString {
        SecretString::new("test-key".to_string())
    }

    #[tokio::test]
    async fn start_call_returns_provider_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/calls"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"call_id": "bl-42", "status": "queued"})),
            )
            .mount(&server)
            .await;

        let client = TelephonyClient::new(server.uri(), None, 5).unwrap();
        let call_id = client.start_call("+15550100", "Hi, this is...", &key()).await.unwrap();
        assert_eq!(call_id, "bl-42");
    }

    #[tokio::test]
    async fn auth_failure_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/calls"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = TelephonyClient::new(server.uri(), None, 5).unwrap();
        let err = client.start_call("+15550100", "s", &key()).await.unwrap_err();
        assert!(matches!(err, CadenceError::Auth(_)));
    }

    #[tokio::test]
    async fn rate_limit_and_invalid_number_map_to_their_classes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/calls"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/calls"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid phone number"))
            .mount(&server)
            .await;

        let client = TelephonyClient::new(server.uri(), None, 5).unwrap();
        let err = client.start_call("+15550100", "s", &key()).await.unwrap_err();
        assert!(matches!(err, CadenceError::RateLimited(_)));
        let err = client.start_call("bogus", "s", &key()).await.unwrap_err();
        assert!(matches!(err, CadenceError::PermanentDelivery(_)));
    }
}
