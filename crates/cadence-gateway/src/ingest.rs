// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciliation of provider events against stored state.
//!
//! Every function here is idempotent under duplicate delivery: the flag
//! updates are conditional, cancellations only touch pending rows, and the
//! call completion upsert keys on the provider call id. The HTTP handlers
//! are thin wrappers over this module.

use cadence_core::{CadenceError, Channel, LinkedinAccountStatus};
use cadence_storage::queries::{companies, leads, logs, queue};
use cadence_storage::{now_iso, Database};
use tracing::{info, warn};

use crate::open_detector;

/// Outcome of a bounce reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BounceOutcome {
    pub lead_matched: bool,
    pub items_cancelled: usize,
}

/// An inbound reply for an email thread: flag the log and append the lead's
/// message to the thread. Returns whether this delivery changed state.
pub async fn reply_received(
    db: &Database,
    email_log_id: &str,
    from_email: Option<&str>,
    body: Option<&str>,
) -> Result<bool, CadenceError> {
    let Some(log) = logs::get_email_log(db, email_log_id).await? else {
        warn!(email_log_id, "reply for unknown email log");
        return Ok(false);
    };

    let changed = logs::mark_replied(db, &log.id).await?;
    if changed {
        logs::create_email_detail(
            db,
            &log.id,
            None,
            None,
            body,
            "lead",
            None,
            from_email,
            None,
            None,
            &now_iso(),
        )
        .await?;
        info!(email_log_id, "reply recorded");
    }
    Ok(changed)
}

/// A bounce for a tenant's recipient: suppress the address, invalidate the
/// lead's email contact on hard bounces, and clear its pending email items.
pub async fn email_bounced(
    db: &Database,
    company_id: &str,
    email: &str,
    hard: bool,
    reason: &str,
) -> Result<BounceOutcome, CadenceError> {
    leads::add_do_not_contact(db, company_id, email, reason).await?;

    let lead = leads::get_lead_by_email(db, company_id, email).await?;
    let Some(lead) = lead else {
        info!(email, "bounce for address with no matching lead");
        return Ok(BounceOutcome {
            lead_matched: false,
            items_cancelled: 0,
        });
    };

    if hard {
        leads::mark_email_bounced(db, company_id, email).await?;
    }
    let items_cancelled =
        queue::cancel_pending_for_lead(db, &lead.id, Channel::Email, "bounced").await?;
    info!(email, hard, items_cancelled, "bounce reconciled");
    Ok(BounceOutcome {
        lead_matched: true,
        items_cancelled,
    })
}

/// A tracking-pixel fetch: count it as an open only for plausible user
/// agents. Idempotent.
pub async fn email_opened(
    db: &Database,
    email_log_id: &str,
    user_agent: &str,
) -> Result<bool, CadenceError> {
    if !open_detector::is_valid_open(user_agent) {
        return Ok(false);
    }
    logs::mark_opened(db, email_log_id).await
}

/// Call-completion payload fields from the telephony provider.
#[derive(Debug, Clone, Default)]
pub struct CallCompletion {
    pub provider_call_id: String,
    pub duration_secs: Option<i64>,
    pub sentiment: Option<String>,
    pub summary: Option<String>,
    pub transcript: Option<String>,
    pub recording_url: Option<String>,
    pub meeting_booked: bool,
}

/// Complete a call record from the provider webhook.
pub async fn call_completed(db: &Database, completion: &CallCompletion) -> Result<bool, CadenceError> {
    let matched = logs::complete_call_record(
        db,
        &completion.provider_call_id,
        completion.duration_secs,
        completion.sentiment.as_deref(),
        completion.summary.as_deref(),
        completion.transcript.as_deref(),
        completion.recording_url.as_deref(),
        completion.meeting_booked,
    )
    .await?;
    if !matched {
        warn!(provider_call_id = %completion.provider_call_id, "completion for unknown call");
    }
    Ok(matched)
}

/// LinkedIn account connectivity change. While not `connected`, the poller
/// skips the tenant's LinkedIn queue; items stay pending.
pub async fn linkedin_account_status(
    db: &Database,
    account_id: &str,
    status: LinkedinAccountStatus,
) -> Result<bool, CadenceError> {
    let changed = companies::set_linkedin_status(db, account_id, status).await?;
    info!(account_id, %status, "linkedin account status updated");
    Ok(changed > 0)
}

/// Inbound LinkedIn message: a reply in a chat we messaged flags the
/// matching outreach. Idempotent under duplicate delivery.
pub async fn linkedin_message_received(db: &Database, chat_id: &str) -> Result<bool, CadenceError> {
    let changed = logs::mark_linkedin_replied_by_chat(db, chat_id).await?;
    if changed {
        info!(chat_id, "linkedin reply recorded");
    }
    Ok(changed)
}
