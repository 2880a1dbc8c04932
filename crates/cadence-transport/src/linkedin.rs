// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the LinkedIn integrator (Unipile-style API).

use std::time::Duration;

use async_trait::async_trait;
use cadence_core::traits::transport::{LinkedinSendOutcome, LinkedinTransport};
use cadence_core::CadenceError;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    message_id: String,
    chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendInvitationResponse {
    invitation_id: String,
}

/// Production LinkedIn integrator client.
#[derive(Debug, Clone)]
pub struct LinkedinClient {
    client: reqwest::Client,
    base_url: String,
}

impl LinkedinClient {
    pub fn new(base_url: String, api_key: Option<&str>, timeout_secs: u64) -> Result<Self, CadenceError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            headers.insert(
                "x-api-key",
                HeaderValue::from_str(key)
                    .map_err(|e| CadenceError::Config(format!("invalid API key header value: {e}")))?,
            );
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CadenceError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn map_failure(status: StatusCode, body: String) -> CadenceError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                CadenceError::Auth(format!("linkedin integrator auth failed: {body}"))
            }
            StatusCode::TOO_MANY_REQUESTS => CadenceError::RateLimited(body),
            StatusCode::NOT_FOUND => {
                CadenceError::PermanentDelivery(format!("linkedin profile not found: {body}"))
            }
            StatusCode::UNPROCESSABLE_ENTITY => {
                CadenceError::PermanentDelivery(format!("linkedin rejected request: {body}"))
            }
            _ => CadenceError::Transport {
                message: format!("linkedin integrator returned {status}: {body}"),
                source: None,
            },
        }
    }
}

#[async_trait]
impl LinkedinTransport for LinkedinClient {
    async fn send_message(
        &self,
        account_id: &str,
        attendee_id: &str,
        chat_id: Option<&str>,
        text: &str,
        inmail: bool,
    ) -> Result<LinkedinSendOutcome, CadenceError> {
        let url = format!("{}/api/v1/messages", self.base_url);
        let body = serde_json::json!({
            "account_id": account_id,
            "attendee_id": if chat_id.is_none() { Some(attendee_id) } else { None },
            "chat_id": chat_id,
            "text": text,
            "inmail": inmail,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CadenceError::Transport {
                message: format!("linkedin message request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if status.is_success() {
            let parsed: SendMessageResponse =
                response.json().await.map_err(|e| CadenceError::Transport {
                    message: format!("malformed linkedin response: {e}"),
                    source: Some(Box::new(e)),
                })?;
            return Ok(LinkedinSendOutcome {
                provider_message_id: parsed.message_id,
                chat_id: parsed.chat_id,
            });
        }
        let text = response.text().await.unwrap_or_default();
        Err(Self::map_failure(status, text))
    }

    async fn send_invitation(
        &self,
        account_id: &str,
        attendee_id: &str,
        message: &str,
    ) -> Result<LinkedinSendOutcome, CadenceError> {
        let url = format!("{}/api/v1/invitations", self.base_url);
        let body = serde_json::json!({
            "account_id": account_id,
            "provider_id": attendee_id,
            // Invitation notes are capped by the provider.
            "message": message.chars().take(300).collect::<String>(),
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CadenceError::Transport {
                message: format!("linkedin invitation request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if status.is_success() {
            let parsed: SendInvitationResponse =
                response.json().await.map_err(|e| CadenceError::Transport {
                    message: format!("malformed linkedin response: {e}"),
                    source: Some(Box::new(e)),
                })?;
            return Ok(LinkedinSendOutcome {
                provider_message_id: parsed.invitation_id,
                chat_id: None,
            });
        }
        let text = response.text().await.unwrap_or_default();
        Err(Self::map_failure(status, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn message_send_returns_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message_id": "lm-1",
                "chat_id": "chat-9"
            })))
            .mount(&server)
            .await;

        let client = LinkedinClient::new(server.uri(), Some("key"), 5).unwrap();
        let outcome = client
            .send_message("acct-1", "lead-urn", None, "Hello", false)
            .await
            .unwrap();
        assert_eq!(outcome.provider_message_id, "lm-1");
        assert_eq!(outcome.chat_id.as_deref(), Some("chat-9"));
    }

    #[tokio::test]
    async fn missing_profile_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/invitations"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = LinkedinClient::new(server.uri(), None, 5).unwrap();
        let err = client
            .send_invitation("acct-1", "gone-urn", "Hi")
            .await
            .unwrap_err();
        assert!(matches!(err, CadenceError::PermanentDelivery(_)));
    }

    #[tokio::test]
    async fn provider_cap_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/invitations"))
            .respond_with(ResponseTemplate::new(429).set_body_string("daily cap"))
            .mount(&server)
            .await;

        let client = LinkedinClient::new(server.uri(), None, 5).unwrap();
        let err = client.send_invitation("acct-1", "urn", "Hi").await.unwrap_err();
        assert!(matches!(err, CadenceError::RateLimited(_)));
    }
}
