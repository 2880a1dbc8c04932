// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead queries, including the eligibility enumeration used by run start
//! and the bounce/do-not-contact paths.

use cadence_core::{CadenceError, Channel};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::Lead;

const SELECT_COLUMNS: &str = "id, company_id, name, email, phone_number, linkedin_id, \
     linkedin_network_distance, company_name, job_title, enrichment, email_bounced, \
     do_not_contact, created_at";

fn row_to_lead(row: &rusqlite::Row<'_>) -> Result<Lead, rusqlite::Error> {
    Ok(Lead {
        id: row.get(0)?,
        company_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone_number: row.get(4)?,
        linkedin_id: row.get(5)?,
        linkedin_network_distance: row.get(6)?,
        company_name: row.get(7)?,
        job_title: row.get(8)?,
        enrichment: row.get(9)?,
        email_bounced: row.get::<_, i64>(10)? != 0,
        do_not_contact: row.get::<_, i64>(11)? != 0,
        created_at: row.get(12)?,
    })
}

/// Get a lead by id.
pub async fn get_lead(db: &Database, id: &str) -> Result<Option<Lead>, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM leads WHERE id = ?1"))?;
            match stmt.query_row(params![id], row_to_lead) {
                Ok(lead) => Ok(Some(lead)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Find a lead by email within a tenant.
pub async fn get_lead_by_email(
    db: &Database,
    company_id: &str,
    email: &str,
) -> Result<Option<Lead>, CadenceError> {
    let company_id = company_id.to_string();
    let email = email.to_lowercase();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM leads
                 WHERE company_id = ?1 AND LOWER(email) = ?2"
            ))?;
            match stmt.query_row(params![company_id, email], row_to_lead) {
                Ok(lead) => Ok(Some(lead)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Enumerate leads of a tenant eligible for a channel: the channel's contact
/// key is present and the lead is not excluded (bounced, do-not-contact).
pub async fn eligible_for_channel(
    db: &Database,
    company_id: &str,
    channel: Channel,
) -> Result<Vec<Lead>, CadenceError> {
    let company_id = company_id.to_string();
    let contact_predicate = match channel {
        Channel::Email => "email IS NOT NULL AND email_bounced = 0 AND do_not_contact = 0",
        Channel::Call => "phone_number IS NOT NULL AND do_not_contact = 0",
        Channel::Linkedin => "linkedin_id IS NOT NULL AND do_not_contact = 0",
    };
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM leads
                 WHERE company_id = ?1 AND {contact_predicate}
                 ORDER BY created_at"
            ))?;
            let rows = stmt.query_map(params![company_id], row_to_lead)?;
            let mut leads = Vec::new();
            for row in rows {
                leads.push(row?);
            }
            Ok(leads)
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a lead's email contact as bounced. Idempotent.
pub async fn mark_email_bounced(
    db: &Database,
    company_id: &str,
    email: &str,
) -> Result<usize, CadenceError> {
    let company_id = company_id.to_string();
    let email = email.to_lowercase();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE leads SET email_bounced = 1, do_not_contact = 1
                 WHERE company_id = ?1 AND LOWER(email) = ?2",
                params![company_id, email],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)
}

/// Add an address to the tenant's do-not-contact list. Idempotent.
pub async fn add_do_not_contact(
    db: &Database,
    company_id: &str,
    email: &str,
    reason: &str,
) -> Result<bool, CadenceError> {
    let company_id = company_id.to_string();
    let email = email.to_lowercase();
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO do_not_contact (company_id, email, reason, created_at)
                 VALUES (?1, ?2, ?3, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![company_id, email, reason],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Whether an address is on the tenant's do-not-contact list.
pub async fn is_do_not_contact(
    db: &Database,
    company_id: &str,
    email: &str,
) -> Result<bool, CadenceError> {
    let company_id = company_id.to_string();
    let email = email.to_lowercase();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM do_not_contact WHERE company_id = ?1 AND email = ?2",
                params![company_id, email],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::now_iso;
    use crate::queries::testutil::{seed_minimal, setup_db};

    #[tokio::test]
    async fn eligibility_requires_contact_key() {
        let (db, _dir) = setup_db().await;
        let seed = seed_minimal(&db).await;

        // A lead without a phone number is ineligible for calls.
        let now = now_iso();
        db.connection()
            .call({
                let company_id = seed.company_id.clone();
                move |conn| {
                    conn.execute(
                        "INSERT INTO leads (id, company_id, name, email, created_at)
                         VALUES ('lead-2', ?1, 'No Phone', 'np@example.test', ?2)",
                        params![company_id, now],
                    )?;
                    Ok(())
                }
            })
            .await
            .unwrap();

        let email = eligible_for_channel(&db, &seed.company_id, Channel::Email).await.unwrap();
        assert_eq!(email.len(), 2);
        let call = eligible_for_channel(&db, &seed.company_id, Channel::Call).await.unwrap();
        assert_eq!(call.len(), 1);
        let linkedin = eligible_for_channel(&db, &seed.company_id, Channel::Linkedin)
            .await
            .unwrap();
        assert!(linkedin.is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn bounced_leads_drop_out_of_email_enumeration() {
        let (db, _dir) = setup_db().await;
        let seed = seed_minimal(&db).await;

        let changed = mark_email_bounced(&db, &seed.company_id, "JANE@example.test")
            .await
            .unwrap();
        assert_eq!(changed, 1, "email match is case-insensitive");

        let eligible = eligible_for_channel(&db, &seed.company_id, Channel::Email)
            .await
            .unwrap();
        assert!(eligible.is_empty());

        let lead = get_lead(&db, &seed.lead_id).await.unwrap().unwrap();
        assert!(lead.email_bounced);
        assert!(lead.do_not_contact);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn do_not_contact_list_is_idempotent() {
        let (db, _dir) = setup_db().await;
        let seed = seed_minimal(&db).await;

        let first = add_do_not_contact(&db, &seed.company_id, "x@y.test", "hard bounce")
            .await
            .unwrap();
        assert!(first);
        let second = add_do_not_contact(&db, &seed.company_id, "x@y.test", "hard bounce")
            .await
            .unwrap();
        assert!(!second, "duplicate insert must be ignored");

        assert!(is_do_not_contact(&db, &seed.company_id, "X@Y.TEST").await.unwrap());
        assert!(!is_do_not_contact(&db, &seed.company_id, "other@y.test").await.unwrap());
        db.close().await.unwrap();
    }
}
