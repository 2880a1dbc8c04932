// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email dispatcher.
//!
//! The log row is written before the send so its id can be embedded in the
//! tracking pixel and the plus-addressed reply-to. Exactly one assistant
//! detail row is written per successful send. Reminder items reuse their
//! parent log and advance its cadence fields instead of creating a new one.

use cadence_core::addressing::{add_tracking_pixel, reply_to_for_log, sender_name_from_email};
use cadence_core::traits::compose::{ComposeRequest, EngagementSignals};
use cadence_core::traits::transport::EmailMessage;
use cadence_core::{CadenceError, Channel, Stage};
use cadence_storage::models::QueueItem;
use cadence_storage::now_iso;
use cadence_storage::queries::{leads, logs};
use tracing::info;

use crate::context::Engine;
use crate::dispatch::{resolve, run_is_cancelled, terminate_cancelled, terminate_sent};

pub async fn dispatch(engine: &Engine, item: &QueueItem) -> Result<(), CadenceError> {
    let resolved = resolve(engine, item).await?;
    let stage = item
        .parsed_stage()
        .ok_or_else(|| CadenceError::DataIntegrity(format!("bad stage: {}", item.stage)))?;

    let lead_email = resolved
        .lead
        .email
        .clone()
        .ok_or_else(|| CadenceError::DataIntegrity("lead has no email address".to_string()))?;
    let template = resolved
        .campaign
        .template
        .clone()
        .ok_or_else(|| CadenceError::DataIntegrity("campaign missing email template".to_string()))?;
    let account_email = resolved
        .company
        .account_email
        .clone()
        .ok_or_else(|| CadenceError::Auth("company has no email account".to_string()))?;
    let account_type = resolved
        .company
        .account_type
        .clone()
        .ok_or_else(|| CadenceError::Auth("company has no email provider type".to_string()))?;

    // Suppression: bounced or opted-out contacts never get mail.
    if resolved.lead.email_bounced
        || resolved.lead.do_not_contact
        || leads::is_do_not_contact(&engine.db, &item.company_id, &lead_email).await?
    {
        return terminate_cancelled(engine, item, "recipient on do-not-contact list").await;
    }

    // Reminder items carry the log of the thread they follow up on.
    let (parent_log, prior_detail, strategy) = match stage {
        Stage::Initial => (None, None, None),
        Stage::Reminder(k) => {
            let log_id = item.parent_log_id.as_deref().ok_or_else(|| {
                CadenceError::DataIntegrity("reminder item without parent log".to_string())
            })?;
            let log = logs::get_email_log(&engine.db, log_id).await?.ok_or_else(|| {
                CadenceError::DataIntegrity(format!("parent email log {log_id} not found"))
            })?;
            // The reply may have landed after this item was enqueued.
            if log.has_replied || log.has_meeting_booked {
                return terminate_cancelled(engine, item, "thread already answered").await;
            }
            let detail = logs::first_assistant_detail(&engine.db, log_id).await?;
            let strategy = engine
                .config
                .reminders
                .strategy_for(k)
                .map(str::to_string);
            (Some(log), detail, strategy)
        }
    };

    // Insights are best-effort; generation failure must not fail the item.
    let insights = match resolved.lead.company_name.as_deref() {
        Some(company) => engine.composer.insights(company).await.unwrap_or(None),
        None => None,
    };

    let request = ComposeRequest {
        channel: Channel::Email,
        stage: item.stage.clone(),
        strategy,
        lead: serde_json::to_value(&resolved.lead).unwrap_or_default(),
        company: crate::dispatch::company_profile(&resolved.company),
        product: serde_json::to_value(&resolved.product).unwrap_or_default(),
        campaign_template: template.clone(),
        insights,
        prior_body: prior_detail.as_ref().and_then(|d| d.body.clone()),
        signals: EngagementSignals {
            has_opened: parent_log.as_ref().map(|l| l.has_opened).unwrap_or(false),
            has_replied: false,
        },
    };
    let content = engine.composer.compose(&request).await?;

    let subject = match (&content.subject, &prior_detail) {
        (Some(subject), _) => subject.clone(),
        (None, Some(detail)) => {
            let original = detail.subject.clone().unwrap_or_default();
            if original.starts_with("Re:") {
                original
            } else {
                format!("Re: {original}")
            }
        }
        (None, None) => {
            return Err(CadenceError::Compose {
                message: "composer returned no subject for initial email".to_string(),
                source: None,
            })
        }
    };

    // Log row first: its id keys the tracking pixel and reply-to.
    let log_id = match &parent_log {
        Some(log) => log.id.clone(),
        None => {
            logs::create_email_log(
                &engine.db,
                &item.company_id,
                &item.campaign_id,
                &item.run_id,
                &item.lead_id,
            )
            .await?
        }
    };

    if run_is_cancelled(engine, item).await? {
        return terminate_cancelled(engine, item, "run cancelled").await;
    }

    let body = if template.contains("{email_body}") {
        template.replace("{email_body}", &content.body)
    } else {
        content.body.clone()
    };
    let body_with_pixel =
        add_tracking_pixel(&body, &engine.config.gateway.public_base_url, &log_id);

    let password = match (
        &resolved.company.account_password_sealed,
        &resolved.company.account_nonce,
    ) {
        (Some(sealed), Some(nonce)) => engine.vault.open(sealed, nonce)?,
        _ => return Err(CadenceError::Auth("company email password not set".to_string())),
    };

    let from_name = sender_name_from_email(&account_email, &resolved.company.name);
    let message = EmailMessage {
        from_name: from_name.clone(),
        from_email: account_email.clone(),
        to_email: lead_email.clone(),
        subject: subject.clone(),
        html_body: body_with_pixel,
        reply_to: reply_to_for_log(&account_email, &log_id),
        in_reply_to: parent_log
            .as_ref()
            .and_then(|l| l.provider_message_id.clone()),
    };

    let provider_message_id = engine
        .email_transport
        .send(&account_email, &password, &account_type, &message)
        .await?;

    let now = now_iso();
    match stage {
        Stage::Initial => {
            logs::set_email_sent(&engine.db, &log_id, &provider_message_id, &now).await?;
        }
        Stage::Reminder(_) => {
            logs::set_reminder_stage(&engine.db, &log_id, &item.stage, &now).await?;
        }
    }
    logs::create_email_detail(
        &engine.db,
        &log_id,
        Some(&provider_message_id),
        Some(&subject),
        Some(&body),
        "assistant",
        Some(&from_name),
        Some(&account_email),
        Some(&lead_email),
        match stage {
            Stage::Initial => None,
            Stage::Reminder(_) => Some(item.stage.as_str()),
        },
        &now,
    )
    .await?;

    terminate_sent(engine, item).await?;
    info!(
        item_id = item.id,
        company_id = %item.company_id,
        run_id = %item.run_id,
        log_id = %log_id,
        to = %lead_email,
        stage = %item.stage,
        "email dispatched"
    );
    Ok(())
}
