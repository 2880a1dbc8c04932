// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for query-module tests.

use rusqlite::params;
use tempfile::tempdir;

use crate::database::{now_iso, Database};

pub(crate) struct Seed {
    pub company_id: String,
    pub product_id: String,
    pub lead_id: String,
    pub campaign_id: String,
    pub run_id: String,
}

pub(crate) async fn setup_db() -> (Database, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
    (db, dir)
}

/// Insert one company, product, lead, campaign, and running run.
pub(crate) async fn seed_minimal(db: &Database) -> Seed {
    let seed = Seed {
        company_id: "co-1".to_string(),
        product_id: "prod-1".to_string(),
        lead_id: "lead-1".to_string(),
        campaign_id: "camp-1".to_string(),
        run_id: "run-1".to_string(),
    };
    let now = now_iso();
    let s = Seed {
        company_id: seed.company_id.clone(),
        product_id: seed.product_id.clone(),
        lead_id: seed.lead_id.clone(),
        campaign_id: seed.campaign_id.clone(),
        run_id: seed.run_id.clone(),
    };
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO companies (id, name, account_email, account_type, utc_offset_minutes, created_at)
                 VALUES (?1, 'Acme', 'sales@acme.test', 'gmail', 0, ?2)",
                params![s.company_id, now],
            )?;
            conn.execute(
                "INSERT INTO products (id, company_id, product_name) VALUES (?1, ?2, 'Widget')",
                params![s.product_id, s.company_id],
            )?;
            conn.execute(
                "INSERT INTO leads (id, company_id, name, email, phone_number, created_at)
                 VALUES (?1, ?2, 'Jane Doe', 'jane@example.test', '+15550100', ?3)",
                params![s.lead_id, s.company_id, now],
            )?;
            conn.execute(
                "INSERT INTO campaigns (id, company_id, product_id, name, campaign_type, template,
                                        n_reminders, days_between_reminders, created_at)
                 VALUES (?1, ?2, ?3, 'Spring outreach', 'email', 'Hi {email_body}', 2, 2, ?4)",
                params![s.campaign_id, s.company_id, s.product_id, now],
            )?;
            conn.execute(
                "INSERT INTO campaign_runs (id, campaign_id, company_id, status, leads_total, started_at)
                 VALUES (?1, ?2, ?3, 'running', 1, ?4)",
                params![s.run_id, s.campaign_id, s.company_id, now],
            )?;
            Ok(())
        })
        .await
        .unwrap();
    seed
}
