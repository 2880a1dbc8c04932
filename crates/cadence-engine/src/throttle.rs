// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rate-limit oracle: per-tenant, per-channel send budgets.
//!
//! `budget = min(max_per_hour - sent_last_hour, max_per_day - sent_last_day)`
//! clamped at zero and by the per-batch safety cap. Counters track items in
//! `sent` state within the window, not attempts. A disabled or unconfigured
//! throttle yields the safety cap alone.

use cadence_core::{CadenceError, Channel};
use cadence_storage::queries::{queue, throttle};
use cadence_storage::{iso_after, Database};
use chrono::Duration;
use tracing::debug;

/// Compute the number of items a tenant may dispatch on a channel right now.
pub async fn budget(
    db: &Database,
    company_id: &str,
    channel: Channel,
    batch_cap: u32,
) -> Result<u32, CadenceError> {
    let settings = throttle::get_settings(db, company_id, channel).await?;
    let settings = match settings {
        Some(s) if s.enabled => s,
        // Unlimited, clamped only by the batch safety cap.
        _ => return Ok(batch_cap),
    };

    let hour_ago = iso_after(Duration::hours(-1));
    let day_ago = iso_after(Duration::days(-1));
    let sent_hour = queue::count_sent(db, company_id, channel, &hour_ago).await?;
    let sent_day = queue::count_sent(db, company_id, channel, &day_ago).await?;

    let hourly_remaining = settings.max_per_hour - sent_hour;
    let daily_remaining = settings.max_per_day - sent_day;
    let budget = hourly_remaining
        .min(daily_remaining)
        .clamp(0, i64::from(batch_cap)) as u32;

    debug!(
        company_id,
        %channel,
        sent_hour,
        sent_day,
        budget,
        "throttle budget computed"
    );
    Ok(budget)
}

/// The tenant's local wall clock as "HH:MM", from its fixed UTC offset.
pub fn local_time(utc_offset_minutes: i32) -> String {
    (chrono::Utc::now() + Duration::minutes(i64::from(utc_offset_minutes)))
        .format("%H:%M")
        .to_string()
}
