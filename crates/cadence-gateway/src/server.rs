// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, shared state, and graceful shutdown for the webhook
//! ingestor and the tracking-pixel endpoint.

use axum::routing::{get, post};
use axum::Router;
use cadence_core::CadenceError;
use cadence_storage::Database;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub db: Database,
    /// HMAC secret for LinkedIn integrator webhooks.
    pub linkedin_secret: Option<String>,
    /// HMAC secret for telephony webhooks.
    pub telephony_secret: Option<String>,
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the gateway router over the given state.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/track/open/:log_id", get(handlers::get_tracking_pixel))
        .route("/webhooks/email/reply", post(handlers::post_email_reply))
        .route("/webhooks/email/bounce", post(handlers::post_email_bounce))
        .route("/webhooks/call/completed", post(handlers::post_call_completed))
        .route(
            "/webhooks/linkedin/account-status",
            post(handlers::post_linkedin_status),
        )
        .route(
            "/webhooks/linkedin/message",
            post(handlers::post_linkedin_message),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway server; returns when the token cancels.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    token: CancellationToken,
) -> Result<(), CadenceError> {
    let app = router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CadenceError::Transport {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .map_err(|e| CadenceError::Transport {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn router_builds_over_state() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("g.db").to_str().unwrap())
            .await
            .unwrap();
        let state = GatewayState {
            db,
            linkedin_secret: None,
            telephony_secret: None,
        };
        let _router = router(state.clone());
        let _cloned = state.clone();
    }
}
