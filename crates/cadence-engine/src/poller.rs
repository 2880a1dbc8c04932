// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue poller: the periodic per-tenant tick that turns budget into sends.
//!
//! Each channel runs its own loop. One tenant's failure never aborts the
//! tick; tenants are independent and contend only on the database.

use std::sync::Arc;

use cadence_core::{CadenceError, Channel};
use cadence_storage::queries::{companies, queue};
use cadence_storage::{iso_after, now_iso};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::context::Engine;
use crate::dispatch;
use crate::runs;
use crate::throttle;

/// One poll pass over every active tenant for a channel. Returns the number
/// of items dispatched.
pub async fn poll_once(engine: &Arc<Engine>, channel: Channel) -> Result<usize, CadenceError> {
    let companies = companies::list_active(&engine.db).await?;
    let mut dispatched = 0usize;

    for company in companies {
        // A disconnected LinkedIn account pauses the channel; items stay
        // pending until the provider reports reconnection.
        if channel == Channel::Linkedin && company.linkedin_status != "connected" {
            debug!(company_id = %company.id, "linkedin channel paused, skipping");
            continue;
        }

        match poll_company(engine, &company.id, company.utc_offset_minutes, channel).await {
            Ok(count) => dispatched += count,
            Err(err) => {
                // Log and move on: a failing tenant must not starve others.
                error!(company_id = %company.id, %channel, error = %err, "tenant poll failed");
            }
        }
    }
    Ok(dispatched)
}

/// Poll a single tenant: budget, lease, bounded-parallel dispatch, drain
/// check for every run the batch touched.
async fn poll_company(
    engine: &Arc<Engine>,
    company_id: &str,
    utc_offset_minutes: i32,
    channel: Channel,
) -> Result<usize, CadenceError> {
    let budget =
        throttle::budget(&engine.db, company_id, channel, engine.config.poller.batch_cap).await?;
    if budget == 0 {
        debug!(company_id, %channel, "no send budget, skipping");
        return Ok(0);
    }

    let lease_expiry = iso_after(chrono::Duration::seconds(
        engine.config.poller.lease_timeout_secs as i64,
    ));
    let local_time = throttle::local_time(utc_offset_minutes);
    let items = queue::lease(
        &engine.db,
        company_id,
        channel,
        &now_iso(),
        &local_time,
        &lease_expiry,
        budget,
    )
    .await?;
    if items.is_empty() {
        return Ok(0);
    }

    info!(company_id, %channel, count = items.len(), "processing leased batch");
    let affected_runs = queue::affected_runs(&items);
    let count = items.len();

    let semaphore = Arc::new(Semaphore::new(engine.config.poller.fan_out.max(1)));
    let mut handles = Vec::with_capacity(count);
    for item in items {
        let engine = Arc::clone(engine);
        let semaphore = Arc::clone(&semaphore);
        handles.push(tokio::spawn(async move {
            // Semaphore bounds per-tenant fan-out.
            let _permit = semaphore.acquire_owned().await;
            dispatch::dispatch_item(&engine, item).await;
        }));
    }
    for handle in handles {
        if let Err(err) = handle.await {
            error!(error = %err, "dispatch task panicked");
        }
    }

    for run_id in affected_runs {
        if let Err(err) = runs::drain_check(engine, &run_id).await {
            error!(run_id = %run_id, error = %err, "drain check failed");
        }
    }
    Ok(count)
}

/// Run the channel's poll loop until the token cancels.
pub async fn run_loop(engine: Arc<Engine>, channel: Channel, token: CancellationToken) {
    let interval_secs = match channel {
        Channel::Email => engine.config.poller.email_interval_secs,
        Channel::Call => engine.config.poller.call_interval_secs,
        Channel::Linkedin => engine.config.poller.linkedin_interval_secs,
    };
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
    info!(%channel, interval_secs, "queue poller started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(err) = poll_once(&engine, channel).await {
                    error!(%channel, error = %err, "poll pass failed");
                }
            }
            _ = token.cancelled() => {
                info!(%channel, "queue poller stopping");
                return;
            }
        }
    }
}

/// Reclaim leases stuck past their expiry. Run periodically alongside the
/// pollers and exposed as an ops command.
pub async fn reclaim_stale_leases(engine: &Engine) -> Result<usize, CadenceError> {
    let released = queue::release_stale_leases(&engine.db, &now_iso()).await?;
    if released > 0 {
        info!(released, "reclaimed stale leases");
    }
    Ok(released)
}
