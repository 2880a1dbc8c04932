// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot operational commands, designed for cron-style invocation.
//!
//! Each command logs start and end timestamps and returns an error (hence a
//! non-zero exit) only on unrecoverable failures; per-tenant problems are
//! logged and skipped.

use std::sync::Arc;

use cadence_core::{CadenceError, Channel};
use cadence_engine::{poller, reminders, runs, Engine};
use cadence_gateway::ingest;
use cadence_storage::models::ThrottleSettings;
use cadence_storage::queries::{companies, throttle};
use cadence_transport::{bounce, imap};
use tracing::{error, info, warn};

/// Per-run IMAP fetch bound, applied per company.
const IMAP_BATCH: usize = 100;

fn log_span(name: &str) -> impl Drop + '_ {
    struct Span<'a>(&'a str);
    impl Drop for Span<'_> {
        fn drop(&mut self) {
            info!(command = self.0, finished_at = %chrono::Utc::now(), "command finished");
        }
    }
    info!(command = name, started_at = %chrono::Utc::now(), "command started");
    Span(name)
}

/// One poll pass over the given channel, or all channels.
pub async fn process_queues(
    engine: &Arc<Engine>,
    channel: Option<Channel>,
) -> Result<(), CadenceError> {
    let _span = log_span("process-queues");
    let channels = match channel {
        Some(channel) => vec![channel],
        None => vec![Channel::Email, Channel::Call, Channel::Linkedin],
    };
    for channel in channels {
        let dispatched = poller::poll_once(engine, channel).await?;
        info!(%channel, dispatched, "poll pass done");
    }
    Ok(())
}

/// One reminder scheduler pass.
pub async fn send_reminders(engine: &Engine) -> Result<(), CadenceError> {
    let _span = log_span("send-reminders");
    let enqueued = reminders::run_pass(engine).await?;
    info!(enqueued, "reminder pass done");
    Ok(())
}

/// Return expired leases to pending.
pub async fn reclaim_stale_leases(engine: &Engine) -> Result<(), CadenceError> {
    let _span = log_span("reclaim-stale-leases");
    let released = poller::reclaim_stale_leases(engine).await?;
    info!(released, "lease reclamation done");
    Ok(())
}

/// Start a campaign run and report it.
pub async fn run_campaign(engine: &Engine, campaign_id: &str) -> Result<(), CadenceError> {
    let _span = log_span("run-campaign");
    let started = runs::start_run(engine, campaign_id).await?;
    println!(
        "{}",
        serde_json::json!({
            "run_id": started.run_id,
            "leads_total": started.leads_total,
            "items_enqueued": started.items_enqueued,
        })
    );
    Ok(())
}

/// Cancel a run.
pub async fn cancel_run(engine: &Engine, run_id: &str) -> Result<(), CadenceError> {
    let _span = log_span("cancel-run");
    let cancelled = runs::cancel(engine, run_id).await?;
    println!("{}", serde_json::json!({ "run_id": run_id, "items_cancelled": cancelled }));
    Ok(())
}

/// Print a run's progress report.
pub async fn get_run(engine: &Engine, run_id: &str) -> Result<(), CadenceError> {
    let _span = log_span("get-run");
    let report = runs::report(engine, run_id).await?;
    let counts: serde_json::Map<String, serde_json::Value> = report
        .counts_by_status
        .into_iter()
        .map(|(status, count)| (status, serde_json::json!(count)))
        .collect();
    println!(
        "{}",
        serde_json::json!({
            "run_id": report.run_id,
            "status": report.status,
            "leads_total": report.leads_total,
            "leads_processed": report.leads_processed,
            "counts_by_status": counts,
        })
    );
    Ok(())
}

/// Throttle settings upsert arguments.
pub struct ThrottleArgs {
    pub company_id: String,
    pub channel: Channel,
    pub enabled: bool,
    pub max_per_hour: i64,
    pub max_per_day: i64,
    pub work_window_start: Option<String>,
    pub work_window_end: Option<String>,
    pub enforce_work_window: bool,
}

/// Create or replace a tenant's throttle settings for a channel.
pub async fn set_throttle(engine: &Engine, args: ThrottleArgs) -> Result<(), CadenceError> {
    let _span = log_span("set-throttle");
    throttle::upsert_settings(
        &engine.db,
        &ThrottleSettings {
            company_id: args.company_id.clone(),
            channel: args.channel.to_string(),
            enabled: args.enabled,
            max_per_hour: args.max_per_hour,
            max_per_day: args.max_per_day,
            work_window_start: args.work_window_start,
            work_window_end: args.work_window_end,
            enforce_work_window: args.enforce_work_window,
        },
    )
    .await?;
    info!(company_id = %args.company_id, channel = %args.channel, "throttle settings updated");
    Ok(())
}

/// Scan tenant inboxes for bounce notifications and reconcile them.
pub async fn process_bounces(engine: &Engine) -> Result<(), CadenceError> {
    let _span = log_span("process-bounces");
    let tenants = companies::list_with_email_credentials(&engine.db).await?;
    info!(count = tenants.len(), "scanning tenant inboxes for bounces");

    for company in tenants {
        if let Err(err) = process_company_bounces(engine, &company).await {
            error!(company_id = %company.id, error = %err, "bounce scan failed");
        }
    }
    Ok(())
}

async fn process_company_bounces(
    engine: &Engine,
    company: &cadence_storage::models::Company,
) -> Result<(), CadenceError> {
    let (account_email, provider, password) = open_mailbox_credentials(engine, company)?;
    let cursor = companies::get_imap_cursor(&engine.db, &company.id, "bounce").await?;
    let messages =
        imap::fetch_since_uid(&provider, &account_email, &password, cursor, IMAP_BATCH).await?;

    let mut max_uid = cursor;
    for message in messages {
        max_uid = max_uid.max(message.uid);
        if !bounce::is_bounce(&message) {
            continue;
        }
        let Some(address) = bounce::extract_bounced_address(&message) else {
            warn!(subject = %message.subject, "could not extract bounced address");
            continue;
        };
        let hard = bounce::classify(&message) == bounce::BounceKind::Hard;
        let reason = format!(
            "{}: {}",
            if hard { "hard bounce" } else { "soft bounce" },
            message.subject
        );
        let outcome = ingest::email_bounced(&engine.db, &company.id, &address, hard, &reason).await?;
        info!(
            company_id = %company.id,
            address,
            hard,
            lead_matched = outcome.lead_matched,
            items_cancelled = outcome.items_cancelled,
            "bounce processed"
        );
    }
    if max_uid > cursor {
        companies::set_imap_cursor(&engine.db, &company.id, "bounce", max_uid).await?;
    }
    Ok(())
}

/// Scan tenant inboxes for replies to plus-addressed outreach and flag the
/// matching threads.
pub async fn process_inbound_email(engine: &Engine) -> Result<(), CadenceError> {
    let _span = log_span("process-inbound-email");
    let tenants = companies::list_with_email_credentials(&engine.db).await?;
    info!(count = tenants.len(), "scanning tenant inboxes for replies");

    for company in tenants {
        if let Err(err) = process_company_inbound(engine, &company).await {
            error!(company_id = %company.id, error = %err, "inbound scan failed");
        }
    }
    Ok(())
}

async fn process_company_inbound(
    engine: &Engine,
    company: &cadence_storage::models::Company,
) -> Result<(), CadenceError> {
    let (account_email, provider, password) = open_mailbox_credentials(engine, company)?;
    let cursor = companies::get_imap_cursor(&engine.db, &company.id, "inbound").await?;
    let messages =
        imap::fetch_since_uid(&provider, &account_email, &password, cursor, IMAP_BATCH).await?;

    let mut max_uid = cursor;
    for message in messages {
        max_uid = max_uid.max(message.uid);
        // A reply lands on the plus-addressed reply-to of the original send.
        let Some(log_id) = message
            .recipients
            .iter()
            .find_map(|addr| cadence_core::addressing::log_id_from_address(addr))
        else {
            continue;
        };
        let changed = ingest::reply_received(
            &engine.db,
            &log_id,
            Some(&message.from),
            Some(&message.body_text),
        )
        .await?;
        if changed {
            info!(company_id = %company.id, log_id, from = %message.from, "reply processed");
        }
    }
    if max_uid > cursor {
        companies::set_imap_cursor(&engine.db, &company.id, "inbound", max_uid).await?;
    }
    Ok(())
}

fn open_mailbox_credentials(
    engine: &Engine,
    company: &cadence_storage::models::Company,
) -> Result<(String, String, secrecy::SecretString), CadenceError> {
    let account_email = company
        .account_email
        .clone()
        .ok_or_else(|| CadenceError::Auth("company has no email account".to_string()))?;
    let provider = company
        .account_type
        .clone()
        .ok_or_else(|| CadenceError::Auth("company has no email provider type".to_string()))?;
    let password = match (&company.account_password_sealed, &company.account_nonce) {
        (Some(sealed), Some(nonce)) => engine.vault.open(sealed, nonce)?,
        _ => return Err(CadenceError::Auth("company email password not set".to_string())),
    };
    Ok((account_email, provider, password))
}
