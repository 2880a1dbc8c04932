// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content-generation contract.
//!
//! Message bodies, call scripts, and LinkedIn copy are synthesized by an
//! upstream AI collaborator. The engine only depends on this trait; the
//! HTTP-backed implementation lives in `cadence-compose`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CadenceError;
use crate::types::Channel;

/// Engagement signals forwarded to the composer so reminder behaviour can
/// adapt. The engine records them; it never interprets them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngagementSignals {
    pub has_opened: bool,
    pub has_replied: bool,
}

/// A request for personalized outreach content.
#[derive(Debug, Clone, Serialize)]
pub struct ComposeRequest {
    pub channel: Channel,
    pub stage: String,
    /// Strategy tag for reminder stages (e.g. "gentle", "social-proof").
    /// Opaque to the engine.
    pub strategy: Option<String>,
    pub lead: serde_json::Value,
    pub company: serde_json::Value,
    pub product: serde_json::Value,
    pub campaign_template: String,
    /// Best-effort cached insights about the lead's company.
    pub insights: Option<String>,
    /// Body of the message this one follows up on, for reminder stages.
    pub prior_body: Option<String>,
    pub signals: EngagementSignals,
}

/// Output of the content-generation contract, per channel:
/// email gets `subject` + `body`, call gets `body` as the script,
/// linkedin gets `body` as the message and optionally `invitation`.
#[derive(Debug, Clone, Deserialize)]
pub struct ComposedContent {
    pub subject: Option<String>,
    pub body: String,
    pub invitation: Option<String>,
}

/// Generates personalized outreach content.
#[async_trait]
pub trait ContentComposer: Send + Sync {
    /// Produce content for one queue item. Implementations apply their own
    /// bounded inline retry for transient failures (up to 2 attempts) before
    /// surfacing a retryable error; policy refusals surface as
    /// [`CadenceError::PermanentDelivery`].
    async fn compose(&self, request: &ComposeRequest) -> Result<ComposedContent, CadenceError>;

    /// Best-effort company insights for a lead, cached upstream.
    /// `None` when the collaborator has nothing useful.
    async fn insights(&self, lead_company: &str) -> Result<Option<String>, CadenceError>;
}
