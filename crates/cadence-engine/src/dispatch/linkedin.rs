// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LinkedIn dispatcher.
//!
//! Sub-action per network distance: first-degree leads get a direct message
//! (continuing any existing chat); second/third-degree leads get an
//! invitation when the campaign carries an invitation template, else an
//! InMail when enabled, else the item is skipped with the reason recorded.
//! A per-account lock enforces the intra-send delay, and the provider's
//! daily invitation cap defers remaining invitations to the next local day.

use cadence_core::traits::compose::{ComposeRequest, EngagementSignals};
use cadence_core::traits::transport::LinkedinAction;
use cadence_core::{CadenceError, Channel, NetworkDistance};
use cadence_storage::models::QueueItem;
use cadence_storage::queries::{logs, queue};
use cadence_storage::{iso_after, now_iso};
use tracing::info;

use crate::context::Engine;
use crate::dispatch::{resolve, run_is_cancelled, terminate_cancelled, terminate_sent};
use crate::retry::until_next_day_start;

pub async fn dispatch(engine: &Engine, item: &QueueItem) -> Result<(), CadenceError> {
    let resolved = resolve(engine, item).await?;

    let attendee_id = resolved
        .lead
        .linkedin_id
        .clone()
        .ok_or_else(|| CadenceError::DataIntegrity("lead has no LinkedIn id".to_string()))?;
    if resolved.lead.do_not_contact {
        return terminate_cancelled(engine, item, "lead on do-not-contact list").await;
    }

    let account_id = resolved
        .company
        .linkedin_account_id
        .clone()
        .ok_or_else(|| CadenceError::Auth("company has no LinkedIn account".to_string()))?;
    if resolved.company.linkedin_status != "connected" {
        return Err(CadenceError::Auth(format!(
            "linkedin account status is {}",
            resolved.company.linkedin_status
        )));
    }

    // Pick the sub-action by network distance.
    let distance = resolved
        .lead
        .linkedin_network_distance
        .as_deref()
        .and_then(|d| d.parse::<NetworkDistance>().ok())
        .unwrap_or(NetworkDistance::Second);

    let action = if distance == NetworkDistance::First {
        LinkedinAction::Message
    } else if resolved.campaign.linkedin_invitation_template.is_some() {
        LinkedinAction::Invitation
    } else if resolved.campaign.inmail_enabled {
        LinkedinAction::Inmail
    } else {
        return terminate_cancelled(
            engine,
            item,
            "not connected and no invitation template or InMail",
        )
        .await;
    };

    // Daily invitation cap mirrors the provider limit; hitting it defers the
    // item to the next local day without consuming its retry budget.
    if action == LinkedinAction::Invitation {
        let day_ago = iso_after(chrono::Duration::days(-1));
        let sent_today =
            logs::count_invitations_since(&engine.db, &item.company_id, &day_ago).await?;
        if sent_today >= i64::from(engine.config.linkedin.daily_invitation_cap) {
            let delay =
                until_next_day_start(chrono::Utc::now(), resolved.company.utc_offset_minutes);
            queue::requeue(
                &engine.db,
                item.id,
                &iso_after(delay),
                item.retry_count,
                Some("daily invitation cap reached"),
            )
            .await?;
            info!(item_id = item.id, "invitation deferred to next day (daily cap)");
            return Ok(());
        }
    }

    let template = match action {
        LinkedinAction::Invitation => resolved
            .campaign
            .linkedin_invitation_template
            .clone()
            .unwrap_or_default(),
        _ => resolved
            .campaign
            .linkedin_message_template
            .clone()
            .or_else(|| resolved.campaign.template.clone())
            .ok_or_else(|| {
                CadenceError::DataIntegrity("campaign missing LinkedIn template".to_string())
            })?,
    };

    let insights = match resolved.lead.company_name.as_deref() {
        Some(company) => engine.composer.insights(company).await.unwrap_or(None),
        None => None,
    };
    let request = ComposeRequest {
        channel: Channel::Linkedin,
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

    // Serialize sends per account and hold the lock through the intra-send
    // delay so the account never bursts.
    let lock = engine.linkedin_lock(&account_id);
    let guard = lock.lock().await;

    let outcome = match action {
        LinkedinAction::Message | LinkedinAction::Inmail => {
            let chat_id = logs::latest_chat_for_lead(&engine.db, &item.lead_id).await?;
            engine
                .linkedin_transport
                .send_message(
                    &account_id,
                    &attendee_id,
                    chat_id.as_deref(),
                    &content.body,
                    action == LinkedinAction::Inmail,
                )
                .await?
        }
        LinkedinAction::Invitation => {
            let note = content.invitation.as_deref().unwrap_or(&content.body);
            engine
                .linkedin_transport
                .send_invitation(&account_id, &attendee_id, note)
                .await?
        }
    };

    let delay = std::time::Duration::from_secs(engine.config.linkedin.intra_send_delay_secs);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    drop(guard);

    logs::create_linkedin_log(
        &engine.db,
        &item.company_id,
        &item.campaign_id,
        &item.run_id,
        &item.lead_id,
        outcome.chat_id.as_deref(),
        Some(&outcome.provider_message_id),
        action.as_str(),
        &now_iso(),
    )
    .await?;

    terminate_sent(engine, item).await?;
    info!(
        item_id = item.id,
        company_id = %item.company_id,
        run_id = %item.run_id,
        action = action.as_str(),
        "linkedin outreach sent"
    );
    Ok(())
}
