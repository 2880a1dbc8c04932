// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reminder scheduler.
//!
//! Hourly pass over reminder-bearing email campaigns: for each stage
//! `r1..=n_reminders`, email logs whose gating timestamp is old enough and
//! whose thread is still unanswered get a reminder queue item carrying the
//! parent log id. Content is composed later by the email dispatcher, which
//! also advances the log's cadence fields after the send. The
//! `(run, lead, channel, stage)` unique key makes re-enqueueing a no-op, so
//! repeated passes are safe.

use std::sync::Arc;

use cadence_core::CadenceError;
use cadence_storage::models::NewQueueItem;
use cadence_storage::queries::{campaigns, logs, queue};
use cadence_storage::{iso_after, now_iso};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::context::Engine;

/// Campaign types whose logs the reminder scheduler follows up on.
const REMINDER_CAMPAIGN_TYPES: &[&str] = &["email", "email_and_call"];

/// Per-pass candidate page size per campaign and stage.
const CANDIDATE_BATCH: u32 = 100;

/// Reminder stages are bounded regardless of campaign configuration.
const MAX_REMINDER_STAGES: u8 = 7;

/// One scheduler pass. Returns the number of reminder items enqueued.
pub async fn run_pass(engine: &Engine) -> Result<usize, CadenceError> {
    let campaigns_list =
        campaigns::list_with_reminders(&engine.db, REMINDER_CAMPAIGN_TYPES).await?;
    let mut enqueued = 0usize;

    for campaign in campaigns_list {
        let stages = campaign.n_reminders.min(MAX_REMINDER_STAGES);
        for k in 1..=stages {
            let prior_stage = if k == 1 {
                None
            } else {
                Some(format!("r{}", k - 1))
            };
            let days = engine
                .config
                .reminders
                .days_for(k, campaign.days_between_reminders);
            let cutoff = iso_after(chrono::Duration::days(-i64::from(days)));

            let candidates = logs::reminder_candidates(
                &engine.db,
                &campaign.id,
                prior_stage.as_deref(),
                &cutoff,
                CANDIDATE_BATCH,
            )
            .await?;

            for log in candidates {
                let inserted = queue::enqueue(
                    &engine.db,
                    &NewQueueItem {
                        company_id: log.company_id.clone(),
                        campaign_id: campaign.id.clone(),
                        run_id: log.run_id.clone(),
                        lead_id: log.lead_id.clone(),
                        channel: "email".to_string(),
                        stage: format!("r{k}"),
                        priority: 1,
                        scheduled_for: now_iso(),
                        max_retries: engine.config.retry.max_retries,
                        parent_log_id: Some(log.id.clone()),
                        work_window_start: None,
                        work_window_end: None,
                    },
                )
                .await?;
                if inserted.is_some() {
                    enqueued += 1;
                }
            }
        }
    }

    if enqueued > 0 {
        info!(enqueued, "reminder items enqueued");
    }
    Ok(enqueued)
}

/// Run the reminder scheduler loop until the token cancels.
pub async fn run_loop(engine: Arc<Engine>, token: CancellationToken) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(
        engine.config.reminders.interval_secs.max(1),
    ));
    info!(
        interval_secs = engine.config.reminders.interval_secs,
        "reminder scheduler started"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(err) = run_pass(&engine).await {
                    error!(error = %err, "reminder pass failed");
                }
            }
            _ = token.cancelled() => {
                info!("reminder scheduler stopping");
                return;
            }
        }
    }
}
