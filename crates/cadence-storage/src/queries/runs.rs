// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign-run queries. Run status transitions are monotone:
//! `idle -> running -> completed | cancelled`, enforced in the UPDATE guards.

use cadence_core::CadenceError;
use rusqlite::params;
use uuid::Uuid;

use crate::database::{map_tr_err, Database};
use crate::models::CampaignRun;

const SELECT_COLUMNS: &str =
    "id, campaign_id, company_id, status, leads_total, leads_processed, started_at, completed_at";

fn row_to_run(row: &rusqlite::Row<'_>) -> Result<CampaignRun, rusqlite::Error> {
    Ok(CampaignRun {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        company_id: row.get(2)?,
        status: row.get(3)?,
        leads_total: row.get(4)?,
        leads_processed: row.get(5)?,
        started_at: row.get(6)?,
        completed_at: row.get(7)?,
    })
}

/// Create a run in `running` state with the enumerated lead total.
pub async fn create_run(
    db: &Database,
    campaign_id: &str,
    company_id: &str,
    leads_total: i64,
) -> Result<String, CadenceError> {
    let id = Uuid::new_v4().to_string();
    let run_id = id.clone();
    let campaign_id = campaign_id.to_string();
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO campaign_runs (id, campaign_id, company_id, status, leads_total,
                     leads_processed, started_at)
                 VALUES (?1, ?2, ?3, 'running', ?4, 0, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![run_id, campaign_id, company_id, leads_total],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(id)
}

/// Get a run by id.
pub async fn get_run(db: &Database, id: &str) -> Result<Option<CampaignRun>, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM campaign_runs WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_run) {
                Ok(run) => Ok(Some(run)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List running runs for a tenant.
pub async fn list_running(db: &Database, company_id: &str) -> Result<Vec<CampaignRun>, CadenceError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM campaign_runs
                 WHERE company_id = ?1 AND status = 'running'"
            ))?;
            let rows = stmt.query_map(params![company_id], row_to_run)?;
            let mut runs = Vec::new();
            for row in rows {
                runs.push(row?);
            }
            Ok(runs)
        })
        .await
        .map_err(map_tr_err)
}

/// Transition a running run to `completed`. Idempotent: a run already
/// completed or cancelled is untouched. Returns whether the transition fired.
pub async fn complete_run(db: &Database, id: &str) -> Result<bool, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE campaign_runs
                 SET status = 'completed', completed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'running'",
                params![id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Transition a run to `cancelled` from any non-terminal state.
pub async fn cancel_run(db: &Database, id: &str) -> Result<bool, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE campaign_runs
                 SET status = 'cancelled', completed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status IN ('idle', 'running')",
                params![id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Increment `leads_processed` by one, clamped at `leads_total`.
pub async fn increment_processed(db: &Database, id: &str) -> Result<(), CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaign_runs
                 SET leads_processed = leads_processed + 1
                 WHERE id = ?1 AND leads_processed < leads_total",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
