// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-company, per-channel throttle settings.

use cadence_core::{CadenceError, Channel};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::ThrottleSettings;

/// Get throttle settings for a tenant and channel, if configured.
pub async fn get_settings(
    db: &Database,
    company_id: &str,
    channel: Channel,
) -> Result<Option<ThrottleSettings>, CadenceError> {
    let company_id = company_id.to_string();
    let channel = channel.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT company_id, channel, enabled, max_per_hour, max_per_day,
                        work_window_start, work_window_end, enforce_work_window
                 FROM throttle_settings WHERE company_id = ?1 AND channel = ?2",
            )?;
            let result = stmt.query_row(params![company_id, channel], |row| {
                Ok(ThrottleSettings {
                    company_id: row.get(0)?,
                    channel: row.get(1)?,
                    enabled: row.get::<_, i64>(2)? != 0,
                    max_per_hour: row.get(3)?,
                    max_per_day: row.get(4)?,
                    work_window_start: row.get(5)?,
                    work_window_end: row.get(6)?,
                    enforce_work_window: row.get::<_, i64>(7)? != 0,
                })
            });
            match result {
                Ok(settings) => Ok(Some(settings)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Create or replace throttle settings for a tenant and channel.
pub async fn upsert_settings(db: &Database, settings: &ThrottleSettings) -> Result<(), CadenceError> {
    let settings = settings.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO throttle_settings
                 (company_id, channel, enabled, max_per_hour, max_per_day,
                  work_window_start, work_window_end, enforce_work_window)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (company_id, channel) DO UPDATE SET
                     enabled = excluded.enabled,
                     max_per_hour = excluded.max_per_hour,
                     max_per_day = excluded.max_per_day,
                     work_window_start = excluded.work_window_start,
                     work_window_end = excluded.work_window_end,
                     enforce_work_window = excluded.enforce_work_window",
                params![
                    settings.company_id,
                    settings.channel,
                    settings.enabled as i64,
                    settings.max_per_hour,
                    settings.max_per_day,
                    settings.work_window_start,
                    settings.work_window_end,
                    settings.enforce_work_window as i64,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
