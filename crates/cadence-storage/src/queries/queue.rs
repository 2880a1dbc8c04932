// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue operations: the leasing work-queue at the heart of the engine.
//!
//! Every multi-row update runs in a single transaction on the single-writer
//! connection, so competing pollers observe serializable lease semantics.

use cadence_core::{CadenceError, Channel, QueueStatus};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::{NewQueueItem, QueueItem};

const SELECT_COLUMNS: &str = "id, company_id, campaign_id, run_id, lead_id, channel, stage, \
     status, priority, created_at, scheduled_for, processed_at, lease_expires_at, \
     retry_count, max_retries, error, parent_log_id, work_window_start, work_window_end";

fn row_to_item(row: &rusqlite::Row<'_>) -> Result<QueueItem, rusqlite::Error> {
    Ok(QueueItem {
        id: row.get(0)?,
        company_id: row.get(1)?,
        campaign_id: row.get(2)?,
        run_id: row.get(3)?,
        lead_id: row.get(4)?,
        channel: row.get(5)?,
        stage: row.get(6)?,
        status: row.get(7)?,
        priority: row.get(8)?,
        created_at: row.get(9)?,
        scheduled_for: row.get(10)?,
        processed_at: row.get(11)?,
        lease_expires_at: row.get(12)?,
        retry_count: row.get(13)?,
        max_retries: row.get(14)?,
        error: row.get(15)?,
        parent_log_id: row.get(16)?,
        work_window_start: row.get(17)?,
        work_window_end: row.get(18)?,
    })
}

/// Insert a new queue item.
///
/// Duplicates on `(run_id, lead_id, channel, stage)` are coalesced: the
/// insert is ignored and `None` is returned, so at most one item per stage
/// ever exists for a lead within a run.
pub async fn enqueue(db: &Database, item: &NewQueueItem) -> Result<Option<i64>, CadenceError> {
    let item = item.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO queue_items
                 (company_id, campaign_id, run_id, lead_id, channel, stage, status, priority,
                  created_at, scheduled_for, retry_count, max_retries, parent_log_id,
                  work_window_start, work_window_end)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7,
                         strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), ?8, 0, ?9, ?10, ?11, ?12)",
                params![
                    item.company_id,
                    item.campaign_id,
                    item.run_id,
                    item.lead_id,
                    item.channel,
                    item.stage,
                    item.priority,
                    item.scheduled_for,
                    item.max_retries,
                    item.parent_log_id,
                    item.work_window_start,
                    item.work_window_end,
                ],
            )?;
            if changed == 0 {
                Ok(None)
            } else {
                Ok(Some(conn.last_insert_rowid()))
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically select up to `limit` ready items for a tenant and channel and
/// transition them to `processing`.
///
/// Ready means `pending`, due (`scheduled_for <= now`), and inside the item's
/// work window when it carries one (`local_time` is the tenant's "HH:MM"
/// wall clock). Higher priority first, ties by creation order.
pub async fn lease(
    db: &Database,
    company_id: &str,
    channel: Channel,
    now: &str,
    local_time: &str,
    lease_expires_at: &str,
    limit: u32,
) -> Result<Vec<QueueItem>, CadenceError> {
    let company_id = company_id.to_string();
    let channel = channel.to_string();
    let now = now.to_string();
    let local_time = local_time.to_string();
    let lease_expires_at = lease_expires_at.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let items = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM queue_items
                     WHERE company_id = ?1 AND channel = ?2 AND status = 'pending'
                       AND scheduled_for <= ?3
                       AND (work_window_start IS NULL OR work_window_end IS NULL
                            OR (CASE WHEN work_window_start <= work_window_end
                                THEN ?4 BETWEEN work_window_start AND work_window_end
                                ELSE ?4 >= work_window_start OR ?4 <= work_window_end END))
                     ORDER BY priority DESC, created_at ASC
                     LIMIT ?5"
                ))?;
                let rows = stmt.query_map(
                    params![company_id, channel, now, local_time, limit],
                    row_to_item,
                )?;
                let mut items = Vec::new();
                for row in rows {
                    items.push(row?);
                }
                items
            };

            let mut leased = Vec::with_capacity(items.len());
            for mut item in items {
                let changed = tx.execute(
                    "UPDATE queue_items SET status = 'processing', lease_expires_at = ?1
                     WHERE id = ?2 AND status = 'pending'",
                    params![lease_expires_at, item.id],
                )?;
                // A row raced away by another poller is skipped, not leased twice.
                if changed == 1 {
                    item.status = "processing".to_string();
                    item.lease_expires_at = Some(lease_expires_at.clone());
                    leased.push(item);
                }
            }
            tx.commit()?;
            Ok(leased)
        })
        .await
        .map_err(map_tr_err)
}

/// Transition a leased item to a terminal state.
///
/// Rejects rows that are not currently `processing`.
pub async fn terminate(
    db: &Database,
    id: i64,
    status: QueueStatus,
    processed_at: &str,
    error: Option<&str>,
) -> Result<(), CadenceError> {
    debug_assert!(status.is_terminal());
    let status = status.to_string();
    let processed_at = processed_at.to_string();
    let error = error.map(|e| e.to_string());
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE queue_items
                 SET status = ?1, processed_at = ?2, error = ?3, lease_expires_at = NULL
                 WHERE id = ?4 AND status = 'processing'",
                params![status, processed_at, error, id],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(CadenceError::DataIntegrity(format!(
            "terminate on queue item {id} that is not leased"
        )));
    }
    Ok(())
}

/// Return a leased item to `pending` with an advanced schedule.
pub async fn requeue(
    db: &Database,
    id: i64,
    scheduled_for: &str,
    retry_count: u32,
    error: Option<&str>,
) -> Result<(), CadenceError> {
    let scheduled_for = scheduled_for.to_string();
    let error = error.map(|e| e.to_string());
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE queue_items
                 SET status = 'pending', scheduled_for = ?1, retry_count = ?2, error = ?3,
                     lease_expires_at = NULL
                 WHERE id = ?4 AND status = 'processing'",
                params![scheduled_for, retry_count, error, id],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(CadenceError::DataIntegrity(format!(
            "requeue on queue item {id} that is not leased"
        )));
    }
    Ok(())
}

/// Count items sent for a tenant and channel since `since`.
///
/// Throttle counters track successful sends, not attempts.
pub async fn count_sent(
    db: &Database,
    company_id: &str,
    channel: Channel,
    since: &str,
) -> Result<i64, CadenceError> {
    let company_id = company_id.to_string();
    let channel = channel.to_string();
    let since = since.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM queue_items
                 WHERE company_id = ?1 AND channel = ?2 AND status = 'sent'
                   AND processed_at >= ?3",
                params![company_id, channel, since],
                |row| row.get(0),
            )
            .map_err(Into::into)
        })
        .await
        .map_err(map_tr_err)
}

/// Count non-terminal items for a run: the drain-check predicate input.
pub async fn count_pending_or_processing(
    db: &Database,
    run_id: &str,
) -> Result<i64, CadenceError> {
    let run_id = run_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM queue_items
                 WHERE run_id = ?1 AND status IN ('pending', 'processing')",
                params![run_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
        })
        .await
        .map_err(map_tr_err)
}

/// Item counts by status for a run, for progress reporting.
pub async fn counts_by_status(
    db: &Database,
    run_id: &str,
) -> Result<Vec<(String, i64)>, CadenceError> {
    let run_id = run_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM queue_items WHERE run_id = ?1 GROUP BY status",
            )?;
            let rows = stmt.query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut counts = Vec::new();
            for row in rows {
                counts.push(row?);
            }
            Ok(counts)
        })
        .await
        .map_err(map_tr_err)
}

/// Return items stuck in `processing` past their lease expiry to `pending`,
/// incrementing their retry count. Recovery path for crashed workers.
pub async fn release_stale_leases(db: &Database, cutoff: &str) -> Result<usize, CadenceError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE queue_items
                 SET status = 'pending', retry_count = retry_count + 1,
                     lease_expires_at = NULL
                 WHERE status = 'processing' AND lease_expires_at IS NOT NULL
                   AND lease_expires_at <= ?1",
                params![cutoff],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)
}

/// Cancel every pending item of a run. Processing items are left to finish;
/// the dispatcher consults the run status before sending.
pub async fn cancel_pending_for_run(db: &Database, run_id: &str) -> Result<usize, CadenceError> {
    let run_id = run_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE queue_items
                 SET status = 'cancelled',
                     processed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     lease_expires_at = NULL
                 WHERE run_id = ?1 AND status = 'pending'",
                params![run_id],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)
}

/// Cancel every pending item for a lead on one channel, recording why.
/// Used when a hard bounce invalidates the lead's contact.
pub async fn cancel_pending_for_lead(
    db: &Database,
    lead_id: &str,
    channel: Channel,
    error: &str,
) -> Result<usize, CadenceError> {
    let lead_id = lead_id.to_string();
    let channel = channel.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE queue_items
                 SET status = 'cancelled', error = ?1,
                     processed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     lease_expires_at = NULL
                 WHERE lead_id = ?2 AND channel = ?3 AND status = 'pending'",
                params![error, lead_id, channel],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a single queue item by id.
pub async fn get_item(db: &Database, id: i64) -> Result<Option<QueueItem>, CadenceError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM queue_items WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], row_to_item);
            match result {
                Ok(item) => Ok(Some(item)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Distinct run ids among the given items, for post-batch drain checks.
pub fn affected_runs(items: &[QueueItem]) -> Vec<String> {
    let mut runs: Vec<String> = items.iter().map(|i| i.run_id.clone()).collect();
    runs.sort();
    runs.dedup();
    runs
}
