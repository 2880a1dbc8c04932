// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign-run tracker: start, drain-check, cancel, and progress reporting.

use std::collections::BTreeSet;

use cadence_core::{CadenceError, CampaignType, Channel};
use cadence_storage::models::NewQueueItem;
use cadence_storage::now_iso;
use cadence_storage::queries::{campaigns, leads, queue, runs, throttle};
use tracing::info;

use crate::context::Engine;

/// Result of starting a run.
#[derive(Debug, Clone)]
pub struct StartedRun {
    pub run_id: String,
    pub leads_total: i64,
    pub items_enqueued: usize,
}

/// Progress snapshot of a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub status: String,
    pub leads_total: i64,
    pub leads_processed: i64,
    pub counts_by_status: Vec<(String, i64)>,
}

/// Start a campaign run: enumerate eligible leads per enabled channel and
/// enqueue one initial item per lead per channel with `priority = 1`.
pub async fn start_run(engine: &Engine, campaign_id: &str) -> Result<StartedRun, CadenceError> {
    let campaign = campaigns::get_campaign(&engine.db, campaign_id)
        .await?
        .filter(|c| !c.deleted)
        .ok_or_else(|| CadenceError::DataIntegrity(format!("campaign {campaign_id} not found")))?;
    let campaign_type: CampaignType = campaign
        .campaign_type
        .parse()
        .map_err(|_| {
            CadenceError::DataIntegrity(format!("bad campaign type: {}", campaign.campaign_type))
        })?;

    // Enumerate per channel; the run total counts distinct leads.
    let mut per_channel: Vec<(Channel, Vec<cadence_storage::models::Lead>)> = Vec::new();
    let mut distinct: BTreeSet<String> = BTreeSet::new();
    for &channel in campaign_type.channels() {
        let eligible = leads::eligible_for_channel(&engine.db, &campaign.company_id, channel).await?;
        for lead in &eligible {
            distinct.insert(lead.id.clone());
        }
        per_channel.push((channel, eligible));
    }

    let run_id = runs::create_run(
        &engine.db,
        campaign_id,
        &campaign.company_id,
        distinct.len() as i64,
    )
    .await?;

    let now = now_iso();
    let mut items_enqueued = 0usize;
    for (channel, channel_leads) in per_channel {
        // Calls always carry the tenant work window; email only when the
        // tenant opted in.
        let settings = throttle::get_settings(&engine.db, &campaign.company_id, channel).await?;
        let window = settings.as_ref().and_then(|s| {
            let applies = match channel {
                Channel::Call => true,
                Channel::Email => s.enforce_work_window,
                Channel::Linkedin => false,
            };
            if applies {
                s.work_window()
            } else {
                None
            }
        });

        for lead in channel_leads {
            let inserted = queue::enqueue(
                &engine.db,
                &NewQueueItem {
                    company_id: campaign.company_id.clone(),
                    campaign_id: campaign.id.clone(),
                    run_id: run_id.clone(),
                    lead_id: lead.id,
                    channel: channel.to_string(),
                    stage: "initial".to_string(),
                    priority: 1,
                    scheduled_for: now.clone(),
                    max_retries: engine.config.retry.max_retries,
                    parent_log_id: None,
                    work_window_start: window.as_ref().map(|w| w.start.clone()),
                    work_window_end: window.as_ref().map(|w| w.end.clone()),
                },
            )
            .await?;
            if inserted.is_some() {
                items_enqueued += 1;
            }
        }
    }

    info!(
        run_id = %run_id,
        campaign_id,
        leads_total = distinct.len(),
        items_enqueued,
        "campaign run started"
    );
    Ok(StartedRun {
        run_id,
        leads_total: distinct.len() as i64,
        items_enqueued,
    })
}

/// Complete a run when no non-terminal items remain. Idempotent; safe to
/// call after every batch.
pub async fn drain_check(engine: &Engine, run_id: &str) -> Result<bool, CadenceError> {
    let remaining = queue::count_pending_or_processing(&engine.db, run_id).await?;
    if remaining > 0 {
        return Ok(false);
    }
    let completed = runs::complete_run(&engine.db, run_id).await?;
    if completed {
        info!(run_id, "campaign run completed");
    }
    Ok(completed)
}

/// Cancel a run: pending items transition immediately; processing items are
/// left to finish (the dispatcher checks the run status before sending).
pub async fn cancel(engine: &Engine, run_id: &str) -> Result<usize, CadenceError> {
    let cancelled_items = queue::cancel_pending_for_run(&engine.db, run_id).await?;
    runs::cancel_run(&engine.db, run_id).await?;
    info!(run_id, cancelled_items, "campaign run cancelled");
    Ok(cancelled_items)
}

/// Progress snapshot for the command surface.
pub async fn report(engine: &Engine, run_id: &str) -> Result<RunReport, CadenceError> {
    let run = runs::get_run(&engine.db, run_id)
        .await?
        .ok_or_else(|| CadenceError::DataIntegrity(format!("run {run_id} not found")))?;
    let counts_by_status = queue::counts_by_status(&engine.db, run_id).await?;
    Ok(RunReport {
        run_id: run.id,
        status: run.status,
        leads_total: run.leads_total,
        leads_processed: run.leads_processed,
        counts_by_status,
    })
}
