// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end webhook gateway tests: real engine over mock transports, real
//! axum router driven with in-process HTTP requests.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use cadence_core::Channel;
use cadence_engine::{poller, reminders, runs};
use cadence_gateway::{server, GatewayState};
use cadence_test_utils::TestHarness;
use http_body_util::BodyExt;
use tower::util::ServiceExt;

fn gateway(harness: &TestHarness, linkedin_secret: Option<&str>) -> axum::Router {
    server::router(GatewayState {
        db: harness.db.clone(),
        linkedin_secret: linkedin_secret.map(str::to_string),
        telephony_secret: None,
    })
}

fn sign(secret: &str, body: &[u8]) -> String {
    use ring::hmac;
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let tag = hmac::sign(&key, body);
    tag.as_ref().iter().map(|b| format!("{b:02x}")).collect()
}

async fn first_log_id(harness: &TestHarness) -> String {
    harness
        .db
        .connection()
        .call(|conn| {
            conn.query_row("SELECT id FROM email_logs", [], |r| r.get(0))
                .map_err(Into::into)
        })
        .await
        .unwrap()
}

/// A reply webhook stops the reminder chain for the thread.
#[tokio::test]
async fn reply_webhook_stops_reminders() {
    let harness = TestHarness::builder()
        .with_leads(1)
        .with_reminders(2, 2)
        .build()
        .await
        .unwrap();
    runs::start_run(&harness.engine, &harness.campaign_id).await.unwrap();
    poller::poll_once(&harness.engine, Channel::Email).await.unwrap();
    let log_id = first_log_id(&harness).await;
    harness.backdate_log_sent(&log_id, 3).await.unwrap();

    let app = gateway(&harness, None);
    let payload = serde_json::json!({
        "email_log_id": log_id,
        "from_email": "lead0@example.test",
        "body": "Sounds good, let's talk."
    });
    let response = app
        .oneshot(
            Request::post("/webhooks/email/reply")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // With the reply recorded, the scheduler finds nothing.
    assert_eq!(reminders::run_pass(&harness.engine).await.unwrap(), 0);
    assert_eq!(harness.email.sent_count(), 1);
}

/// Bounce webhook: the second queued email for the lead is cancelled, the
/// lead is marked bounced, and no reminders are ever enqueued.
#[tokio::test]
async fn bounce_webhook_cancels_pending_items() {
    let harness = TestHarness::builder()
        .with_leads(1)
        .with_reminders(2, 2)
        .with_config(|c| c.poller.batch_cap = 1)
        .build()
        .await
        .unwrap();
    runs::start_run(&harness.engine, &harness.campaign_id).await.unwrap();
    poller::poll_once(&harness.engine, Channel::Email).await.unwrap();
    let log_id = first_log_id(&harness).await;
    harness.backdate_log_sent(&log_id, 3).await.unwrap();
    // A reminder item is queued and still pending when the bounce arrives.
    assert_eq!(reminders::run_pass(&harness.engine).await.unwrap(), 1);

    let app = gateway(&harness, None);
    let payload = serde_json::json!({
        "company_id": harness.company_id,
        "email": "lead0@example.test",
        "hard": true,
        "reason": "550 user unknown"
    });
    let response = app
        .oneshot(
            Request::post("/webhooks/email/bounce")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, bounced): (String, i64) = harness
        .db
        .connection()
        .call(|conn| {
            let status: String = conn.query_row(
                "SELECT status FROM queue_items WHERE stage = 'r1'",
                [],
                |r| r.get(0),
            )?;
            let bounced: i64 = conn.query_row(
                "SELECT email_bounced FROM leads WHERE id = 'lead-0'",
                [],
                |r| r.get(0),
            )?;
            Ok((status, bounced))
        })
        .await
        .unwrap();
    assert_eq!(status, "cancelled");
    assert_eq!(bounced, 1);

    // The bounced lead never re-enters the reminder chain.
    assert_eq!(reminders::run_pass(&harness.engine).await.unwrap(), 0);
    assert_eq!(harness.email.sent_count(), 1);
}

/// The tracking pixel records opens for real browsers and ignores bots,
/// serving the GIF either way.
#[tokio::test]
async fn tracking_pixel_counts_only_real_opens() {
    let harness = TestHarness::builder().with_leads(1).build().await.unwrap();
    runs::start_run(&harness.engine, &harness.campaign_id).await.unwrap();
    poller::poll_once(&harness.engine, Channel::Email).await.unwrap();
    let log_id = first_log_id(&harness).await;

    // Bot fetch: pixel served, open not counted.
    let response = gateway(&harness, None)
        .oneshot(
            Request::get(format!("/track/open/{log_id}"))
                .header("user-agent", "python-requests/2.28.0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..6], b"GIF89a");

    let opened_after_bot: i64 = harness
        .db
        .connection()
        .call(|conn| {
            conn.query_row("SELECT has_opened FROM email_logs", [], |r| r.get(0))
                .map_err(Into::into)
        })
        .await
        .unwrap();
    assert_eq!(opened_after_bot, 0);

    // Browser fetch counts.
    let response = gateway(&harness, None)
        .oneshot(
            Request::get(format!("/track/open/{log_id}"))
                .header(
                    "user-agent",
                    "Mozilla/5.0 (Macintosh) AppleWebKit/537.36 Chrome/120.0 Safari/537.36",
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let opened: i64 = harness
        .db
        .connection()
        .call(|conn| {
            conn.query_row("SELECT has_opened FROM email_logs", [], |r| r.get(0))
                .map_err(Into::into)
        })
        .await
        .unwrap();
    assert_eq!(opened, 1);
}

/// Signed LinkedIn webhooks: a bad signature is rejected with 401 (so the
/// provider retries); a good one pauses the channel.
#[tokio::test]
async fn linkedin_status_webhook_verifies_signature() {
    let harness = TestHarness::builder().build().await.unwrap();
    let secret = "webhook-secret";
    let payload = serde_json::json!({"account_id": "uni-test", "status": "CREDENTIALS"});
    let body = payload.to_string();

    // Wrong signature.
    let response = gateway(&harness, Some(secret))
        .oneshot(
            Request::post("/webhooks/linkedin/account-status")
                .header("content-type", "application/json")
                .header("x-cadence-signature", "deadbeef")
                .body(Body::from(body.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Correct signature.
    let signature = sign(secret, body.as_bytes());
    let response = gateway(&harness, Some(secret))
        .oneshot(
            Request::post("/webhooks/linkedin/account-status")
                .header("content-type", "application/json")
                .header("x-cadence-signature", signature)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status: String = harness
        .db
        .connection()
        .call(|conn| {
            conn.query_row("SELECT linkedin_status FROM companies", [], |r| r.get(0))
                .map_err(Into::into)
        })
        .await
        .unwrap();
    assert_eq!(status, "credentials_required");

    // The paused tenant's LinkedIn queue is skipped by the poller.
    assert_eq!(
        poller::poll_once(&harness.engine, Channel::Linkedin).await.unwrap(),
        0
    );
}

/// Call completion webhook fills in the record created at dispatch time.
#[tokio::test]
async fn call_completion_webhook_round_trip() {
    let harness = TestHarness::builder()
        .with_campaign_type("call")
        .with_leads(1)
        .build()
        .await
        .unwrap();
    runs::start_run(&harness.engine, &harness.campaign_id).await.unwrap();
    poller::poll_once(&harness.engine, Channel::Call).await.unwrap();
    assert_eq!(harness.call.call_count(), 1);

    let provider_call_id: String = harness
        .db
        .connection()
        .call(|conn| {
            conn.query_row("SELECT provider_call_id FROM call_records", [], |r| r.get(0))
                .map_err(Into::into)
        })
        .await
        .unwrap();

    let payload = serde_json::json!({
        "call_id": provider_call_id,
        "duration": 95,
        "sentiment": "positive",
        "summary": "Booked a demo for Tuesday",
        "meeting_booked": true
    });
    let response = gateway(&harness, None)
        .oneshot(
            Request::post("/webhooks/call/completed")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, booked): (String, i64) = harness
        .db
        .connection()
        .call(|conn| {
            conn.query_row(
                "SELECT status, has_meeting_booked FROM call_records",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .map_err(Into::into)
        })
        .await
        .unwrap();
    assert_eq!(status, "completed");
    assert_eq!(booked, 1);
}

/// Health endpoint is unauthenticated.
#[tokio::test]
async fn health_endpoint_responds() {
    let harness = TestHarness::builder().build().await.unwrap();
    let response = gateway(&harness, Some("secret"))
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
