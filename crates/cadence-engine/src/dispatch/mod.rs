// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel dispatchers.
//!
//! The three channels share one skeleton: resolve references, compose
//! content, check the run is still live, open the transport with in-memory
//! credentials, send, record the outcome. Failures funnel into
//! [`handle_failure`], which classifies the error and applies the retry
//! policy.

pub mod call;
pub mod email;
pub mod linkedin;

use std::str::FromStr;

use cadence_core::{CadenceError, Channel, ErrorClass, QueueStatus, Stage};
use cadence_storage::models::{Campaign, Company, Lead, Product, QueueItem};
use cadence_storage::queries::{campaigns, companies, leads, queue, runs};
use cadence_storage::{iso_after, now_iso};
use tracing::{error, info, warn};

use crate::context::Engine;
use crate::retry::{self, Disposition};

/// Fully resolved references for one queue item.
pub(crate) struct Resolved {
    pub campaign: Campaign,
    pub lead: Lead,
    pub company: Company,
    #[allow(dead_code)]
    pub product: Product,
}

/// Resolve campaign, lead, company, and product for an item. Any missing or
/// blocking-deleted reference is a non-retryable data-integrity failure.
pub(crate) async fn resolve(engine: &Engine, item: &QueueItem) -> Result<Resolved, CadenceError> {
    let campaign = campaigns::get_campaign(&engine.db, &item.campaign_id)
        .await?
        .filter(|c| !c.deleted)
        .ok_or_else(|| {
            CadenceError::DataIntegrity(format!("campaign {} not found", item.campaign_id))
        })?;
    let lead = leads::get_lead(&engine.db, &item.lead_id)
        .await?
        .ok_or_else(|| CadenceError::DataIntegrity(format!("lead {} not found", item.lead_id)))?;
    let company = companies::get_company(&engine.db, &item.company_id)
        .await?
        .filter(|c| !c.deleted)
        .ok_or_else(|| {
            CadenceError::DataIntegrity(format!("company {} not found", item.company_id))
        })?;
    let product = campaigns::get_product(&engine.db, &campaign.product_id)
        .await?
        .ok_or_else(|| {
            CadenceError::DataIntegrity(format!("product {} not found", campaign.product_id))
        })?;
    Ok(Resolved {
        campaign,
        lead,
        company,
        product,
    })
}

/// Tenant profile forwarded to the composer. Credentials never leave the
/// dispatch path, sealed or not.
pub(crate) fn company_profile(company: &Company) -> serde_json::Value {
    serde_json::json!({
        "id": company.id,
        "name": company.name,
        "account_email": company.account_email,
    })
}

/// Whether the item's run was cancelled. Checked immediately before the
/// transport call so a cancel lands mid-flight at most once per item.
pub(crate) async fn run_is_cancelled(engine: &Engine, item: &QueueItem) -> Result<bool, CadenceError> {
    let run = runs::get_run(&engine.db, &item.run_id).await?;
    Ok(run.map(|r| r.status == "cancelled").unwrap_or(false))
}

/// Terminate a leased item as cancelled.
pub(crate) async fn terminate_cancelled(
    engine: &Engine,
    item: &QueueItem,
    reason: &str,
) -> Result<(), CadenceError> {
    info!(item_id = item.id, reason, "queue item cancelled");
    queue::terminate(
        &engine.db,
        item.id,
        QueueStatus::Cancelled,
        &now_iso(),
        Some(reason),
    )
    .await
}

/// Terminate a leased item as sent and advance the run progress for initial
/// items.
pub(crate) async fn terminate_sent(engine: &Engine, item: &QueueItem) -> Result<(), CadenceError> {
    queue::terminate(&engine.db, item.id, QueueStatus::Sent, &now_iso(), None).await?;
    if item.parsed_stage() == Some(Stage::Initial) {
        runs::increment_processed(&engine.db, &item.run_id).await?;
    }
    Ok(())
}

/// Dispatch one leased item on its channel. Never propagates an error: every
/// failure is recorded on the item via the retry policy.
pub async fn dispatch_item(engine: &Engine, item: QueueItem) {
    let channel = match Channel::from_str(&item.channel) {
        Ok(channel) => channel,
        Err(_) => {
            error!(item_id = item.id, channel = %item.channel, "unknown channel on queue item");
            let _ = queue::terminate(
                &engine.db,
                item.id,
                QueueStatus::Failed,
                &now_iso(),
                Some("unknown channel"),
            )
            .await;
            return;
        }
    };

    let timeout = std::time::Duration::from_secs(engine.config.poller.lease_timeout_secs);
    let result = tokio::time::timeout(timeout, async {
        match channel {
            Channel::Email => email::dispatch(engine, &item).await,
            Channel::Call => call::dispatch(engine, &item).await,
            Channel::Linkedin => linkedin::dispatch(engine, &item).await,
        }
    })
    .await
    .unwrap_or_else(|_| {
        Err(CadenceError::Timeout {
            duration: timeout,
        })
    });

    if let Err(err) = result {
        handle_failure(engine, &item, channel, err).await;
    }
}

/// Apply the failure disposition to a leased item.
async fn handle_failure(engine: &Engine, item: &QueueItem, channel: Channel, err: CadenceError) {
    let class = err.classify();
    warn!(
        item_id = item.id,
        company_id = %item.company_id,
        run_id = %item.run_id,
        %channel,
        error = %err,
        ?class,
        "dispatch failed"
    );

    // An auth failure pauses the tenant's LinkedIn channel until reconnect.
    if class == ErrorClass::Auth && channel == Channel::Linkedin {
        if let Ok(Some(company)) = companies::get_company(&engine.db, &item.company_id).await {
            if let Some(account_id) = company.linkedin_account_id.as_deref() {
                let _ = companies::set_linkedin_status(
                    &engine.db,
                    account_id,
                    cadence_core::LinkedinAccountStatus::CredentialsRequired,
                )
                .await;
            }
        }
        error!(company_id = %item.company_id, "linkedin credentials failed; channel paused");
    }

    // A permanent delivery failure invalidates the lead's contact on this
    // channel and clears its other pending items.
    if class == ErrorClass::Permanent {
        if channel == Channel::Email {
            if let Ok(Some(lead)) = leads::get_lead(&engine.db, &item.lead_id).await {
                if let Some(email) = lead.email.as_deref() {
                    let _ = leads::mark_email_bounced(&engine.db, &item.company_id, email).await;
                }
            }
        }
        let _ =
            queue::cancel_pending_for_lead(&engine.db, &item.lead_id, channel, "contact invalid")
                .await;
    }

    let disposition = retry::disposition(
        class,
        channel,
        item.retry_count,
        item.max_retries,
        &engine.config.retry,
        chrono::Utc::now(),
    );

    let outcome = match disposition {
        Disposition::Retry { delay, retry_count } => {
            queue::requeue(
                &engine.db,
                item.id,
                &iso_after(delay),
                retry_count,
                Some(&err.to_string()),
            )
            .await
        }
        Disposition::Reschedule { delay } => {
            queue::requeue(
                &engine.db,
                item.id,
                &iso_after(delay),
                item.retry_count,
                Some(&err.to_string()),
            )
            .await
        }
        Disposition::Fail => {
            let result = queue::terminate(
                &engine.db,
                item.id,
                QueueStatus::Failed,
                &now_iso(),
                Some(&err.to_string()),
            )
            .await;
            if result.is_ok() && item.parsed_stage() == Some(Stage::Initial) {
                let _ = runs::increment_processed(&engine.db, &item.run_id).await;
            }
            result
        }
    };

    if let Err(store_err) = outcome {
        error!(item_id = item.id, error = %store_err, "failed to record dispatch failure");
    }
}
