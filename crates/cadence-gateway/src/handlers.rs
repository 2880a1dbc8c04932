// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the webhook gateway.
//!
//! Signed provider routes (telephony, LinkedIn) read the raw body so the
//! HMAC covers exactly the delivered bytes. Signature failures return 401 so
//! the provider retries. All handlers delegate to the `ingest` module.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cadence_core::LinkedinAccountStatus;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::verify_signature;
use crate::ingest::{self, CallCompletion};
use crate::server::GatewayState;

/// 1x1 transparent GIF served by the tracking endpoint.
const PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Generic acknowledgement body.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub status: &'static str,
    pub changed: bool,
}

fn ack(changed: bool) -> Response {
    (StatusCode::OK, Json(AckResponse { status: "ok", changed })).into_response()
}

fn internal_error(err: impl std::fmt::Display) -> Response {
    warn!(error = %err, "webhook handler failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

fn bad_request(msg: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "invalid signature".to_string(),
        }),
    )
        .into_response()
}

fn signature_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-cadence-signature")
        .or_else(|| headers.get("x-signature"))
        .and_then(|v| v.to_str().ok())
}

// --- Email ---

#[derive(Debug, Deserialize)]
pub struct ReplyPayload {
    pub email_log_id: String,
    #[serde(default)]
    pub from_email: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// POST /webhooks/email/reply
pub async fn post_email_reply(
    State(state): State<GatewayState>,
    Json(payload): Json<ReplyPayload>,
) -> Response {
    match ingest::reply_received(
        &state.db,
        &payload.email_log_id,
        payload.from_email.as_deref(),
        payload.body.as_deref(),
    )
    .await
    {
        Ok(changed) => ack(changed),
        Err(err) => internal_error(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct BouncePayload {
    pub company_id: String,
    pub email: String,
    #[serde(default = "default_hard")]
    pub hard: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

fn default_hard() -> bool {
    true
}

/// POST /webhooks/email/bounce
pub async fn post_email_bounce(
    State(state): State<GatewayState>,
    Json(payload): Json<BouncePayload>,
) -> Response {
    let reason = payload.reason.as_deref().unwrap_or("bounce notification");
    match ingest::email_bounced(&state.db, &payload.company_id, &payload.email, payload.hard, reason)
        .await
    {
        Ok(outcome) => ack(outcome.lead_matched),
        Err(err) => internal_error(err),
    }
}

/// GET /track/open/:log_id
///
/// Always serves the pixel; the open flag only advances for plausible user
/// agents.
pub async fn get_tracking_pixel(
    State(state): State<GatewayState>,
    Path(log_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if let Err(err) = ingest::email_opened(&state.db, &log_id, user_agent).await {
        warn!(log_id, error = %err, "open tracking failed");
    }
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, "no-store, max-age=0"),
        ],
        PIXEL_GIF.to_vec(),
    )
        .into_response()
}

// --- Call ---

#[derive(Debug, Deserialize)]
pub struct CallCompletedPayload {
    pub call_id: String,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub meeting_booked: bool,
}

/// POST /webhooks/call/completed (signed)
pub async fn post_call_completed(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !verify_signature(
        state.telephony_secret.as_deref(),
        &body,
        signature_header(&headers),
    ) {
        return unauthorized();
    }
    let payload: CallCompletedPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => return bad_request("malformed call completion payload"),
    };
    let completion = CallCompletion {
        provider_call_id: payload.call_id,
        duration_secs: payload.duration,
        sentiment: payload.sentiment,
        summary: payload.summary,
        transcript: payload.transcript,
        recording_url: payload.recording_url,
        meeting_booked: payload.meeting_booked,
    };
    match ingest::call_completed(&state.db, &completion).await {
        Ok(matched) => ack(matched),
        Err(err) => internal_error(err),
    }
}

// --- LinkedIn ---

#[derive(Debug, Deserialize)]
pub struct LinkedinStatusPayload {
    pub account_id: String,
    pub status: String,
}

/// POST /webhooks/linkedin/account-status (signed)
pub async fn post_linkedin_status(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !verify_signature(
        state.linkedin_secret.as_deref(),
        &body,
        signature_header(&headers),
    ) {
        return unauthorized();
    }
    let payload: LinkedinStatusPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => return bad_request("malformed account status payload"),
    };
    // Providers report "OK" / "CREDENTIALS" style states; map them onto ours.
    let status = match payload.status.to_uppercase().as_str() {
        "OK" | "CONNECTED" => LinkedinAccountStatus::Connected,
        "CREDENTIALS" | "CREDENTIALS_REQUIRED" => LinkedinAccountStatus::CredentialsRequired,
        _ => LinkedinAccountStatus::Disconnected,
    };
    match ingest::linkedin_account_status(&state.db, &payload.account_id, status).await {
        Ok(changed) => ack(changed),
        Err(err) => internal_error(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct LinkedinMessagePayload {
    pub chat_id: String,
    #[serde(default)]
    pub event: Option<String>,
}

/// POST /webhooks/linkedin/message (signed)
pub async fn post_linkedin_message(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !verify_signature(
        state.linkedin_secret.as_deref(),
        &body,
        signature_header(&headers),
    ) {
        return unauthorized();
    }
    let payload: LinkedinMessagePayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => return bad_request("malformed linkedin message payload"),
    };
    // Only inbound messages flip the reply flag; reactions and read receipts
    // are acknowledged without effect.
    if payload.event.as_deref().unwrap_or("message_received") != "message_received" {
        return ack(false);
    }
    match ingest::linkedin_message_received(&state.db, &payload.chat_id).await {
        Ok(changed) => ack(changed),
        Err(err) => internal_error(err),
    }
}

// --- Health ---

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health (unauthenticated)
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_is_a_gif() {
        assert_eq!(&PIXEL_GIF[..6], b"GIF89a");
    }

    #[test]
    fn bounce_payload_defaults_to_hard() {
        let payload: BouncePayload =
            serde_json::from_str(r#"{"company_id": "co-1", "email": "x@y.test"}"#).unwrap();
        assert!(payload.hard);
        assert!(payload.reason.is_none());
    }

    #[test]
    fn call_payload_tolerates_missing_fields() {
        let payload: CallCompletedPayload =
            serde_json::from_str(r#"{"call_id": "bl-1"}"#).unwrap();
        assert_eq!(payload.call_id, "bl-1");
        assert!(payload.duration.is_none());
        assert!(!payload.meeting_booked);
    }
}
