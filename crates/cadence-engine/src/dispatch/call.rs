// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call dispatcher.
//!
//! Lease-time work-window enforcement happens at the store; this module
//! composes the script, starts the call, and records the provider call id.
//! The call record completes later via the webhook ingestor.

use cadence_core::traits::compose::{ComposeRequest, EngagementSignals};
use cadence_core::{CadenceError, Channel};
use cadence_storage::models::QueueItem;
use cadence_storage::queries::logs;
use tracing::info;

use crate::context::Engine;
use crate::dispatch::{resolve, run_is_cancelled, terminate_cancelled, terminate_sent};

pub async fn dispatch(engine: &Engine, item: &QueueItem) -> Result<(), CadenceError> {
    let resolved = resolve(engine, item).await?;

    let phone_number = resolved
        .lead
        .phone_number
        .clone()
        .ok_or_else(|| CadenceError::DataIntegrity("lead has no phone number".to_string()))?;
    if resolved.lead.do_not_contact {
        return terminate_cancelled(engine, item, "lead on do-not-contact list").await;
    }

    let template = resolved
        .campaign
        .call_script_template
        .clone()
        .or_else(|| resolved.campaign.template.clone())
        .ok_or_else(|| {
            CadenceError::DataIntegrity("campaign missing call script template".to_string())
        })?;

    let insights = match resolved.lead.company_name.as_deref() {
        Some(company) => engine.composer.insights(company).await.unwrap_or(None),
        None => None,
    };

    let request = ComposeRequest {
        channel: Channel::Call,
        stage: item.stage.clone(),
        strategy: None,
        lead: serde_json::to_value(&resolved.lead).unwrap_or_default(),
        company: crate::dispatch::company_profile(&resolved.company),
        product: serde_json::to_value(&resolved.product).unwrap_or_default(),
        campaign_template: template,
        insights,
        prior_body: None,
        signals: EngagementSignals::default(),
    };
    let content = engine.composer.compose(&request).await?;

    if run_is_cancelled(engine, item).await? {
        return terminate_cancelled(engine, item, "run cancelled").await;
    }

    let api_key = engine.telephony_api_key()?;
    let provider_call_id = engine
        .call_transport
        .start_call(&phone_number, &content.body, &api_key)
        .await?;

    logs::create_call_record(
        &engine.db,
        &item.company_id,
        &item.campaign_id,
        &item.run_id,
        &item.lead_id,
        &provider_call_id,
    )
    .await?;

    terminate_sent(engine, item).await?;
    info!(
        item_id = item.id,
        company_id = %item.company_id,
        run_id = %item.run_id,
        provider_call_id = %provider_call_id,
        "call initiated"
    );
    Ok(())
}
