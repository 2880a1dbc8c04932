// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Company (tenant) queries.

use cadence_core::{CadenceError, LinkedinAccountStatus};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::Company;

const SELECT_COLUMNS: &str = "id, name, account_email, account_password_sealed, account_nonce, \
     account_type, reply_domain, utc_offset_minutes, linkedin_account_id, linkedin_status, \
     deleted, created_at";

fn row_to_company(row: &rusqlite::Row<'_>) -> Result<Company, rusqlite::Error> {
    Ok(Company {
        id: row.get(0)?,
        name: row.get(1)?,
        account_email: row.get(2)?,
        account_password_sealed: row.get(3)?,
        account_nonce: row.get(4)?,
        account_type: row.get(5)?,
        reply_domain: row.get(6)?,
        utc_offset_minutes: row.get(7)?,
        linkedin_account_id: row.get(8)?,
        linkedin_status: row.get(9)?,
        deleted: row.get::<_, i64>(10)? != 0,
        created_at: row.get(11)?,
    })
}

/// Get a company by id.
pub async fn get_company(db: &Database, id: &str) -> Result<Option<Company>, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM companies WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_company) {
                Ok(company) => Ok(Some(company)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List non-deleted companies, oldest first.
pub async fn list_active(db: &Database) -> Result<Vec<Company>, CadenceError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM companies WHERE deleted = 0 ORDER BY created_at"
            ))?;
            let rows = stmt.query_map([], row_to_company)?;
            let mut companies = Vec::new();
            for row in rows {
                companies.push(row?);
            }
            Ok(companies)
        })
        .await
        .map_err(map_tr_err)
}

/// List non-deleted companies that have SMTP credentials configured.
/// Input set for the email poller and IMAP-driven ops.
pub async fn list_with_email_credentials(db: &Database) -> Result<Vec<Company>, CadenceError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM companies
                 WHERE deleted = 0 AND account_email IS NOT NULL
                   AND account_password_sealed IS NOT NULL
                 ORDER BY created_at"
            ))?;
            let rows = stmt.query_map([], row_to_company)?;
            let mut companies = Vec::new();
            for row in rows {
                companies.push(row?);
            }
            Ok(companies)
        })
        .await
        .map_err(map_tr_err)
}

/// Update the LinkedIn connectivity flag driven by provider webhooks.
pub async fn set_linkedin_status(
    db: &Database,
    account_id: &str,
    status: LinkedinAccountStatus,
) -> Result<usize, CadenceError> {
    let account_id = account_id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE companies SET linkedin_status = ?1 WHERE linkedin_account_id = ?2",
                params![status, account_id],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)
}

/// IMAP cursor for a company mailbox scan ("bounce" or "inbound").
pub async fn get_imap_cursor(
    db: &Database,
    company_id: &str,
    mailbox_kind: &str,
) -> Result<u32, CadenceError> {
    let company_id = company_id.to_string();
    let mailbox_kind = mailbox_kind.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT last_uid FROM imap_cursors WHERE company_id = ?1 AND mailbox_kind = ?2",
                params![company_id, mailbox_kind],
                |row| row.get(0),
            );
            match result {
                Ok(uid) => Ok(uid),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Advance the IMAP cursor; never moves backwards.
pub async fn set_imap_cursor(
    db: &Database,
    company_id: &str,
    mailbox_kind: &str,
    last_uid: u32,
) -> Result<(), CadenceError> {
    let company_id = company_id.to_string();
    let mailbox_kind = mailbox_kind.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO imap_cursors (company_id, mailbox_kind, last_uid)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (company_id, mailbox_kind)
                 DO UPDATE SET last_uid = MAX(last_uid, excluded.last_uid)",
                params![company_id, mailbox_kind, last_uid],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testutil::{seed_minimal, setup_db};

    #[tokio::test]
    async fn get_and_list_companies() {
        let (db, _dir) = setup_db().await;
        let seed = seed_minimal(&db).await;

        let company = get_company(&db, &seed.company_id).await.unwrap().unwrap();
        assert_eq!(company.name, "Acme");
        assert_eq!(company.linkedin_status, "disconnected");
        assert!(!company.deleted);

        let active = list_active(&db).await.unwrap();
        assert_eq!(active.len(), 1);

        assert!(get_company(&db, "nope").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn linkedin_status_updates_by_account_id() {
        let (db, _dir) = setup_db().await;
        let seed = seed_minimal(&db).await;
        db.connection()
            .call({
                let id = seed.company_id.clone();
                move |conn| {
                    conn.execute(
                        "UPDATE companies SET linkedin_account_id = 'uni-1' WHERE id = ?1",
                        params![id],
                    )?;
                    Ok(())
                }
            })
            .await
            .unwrap();

        let changed = set_linkedin_status(&db, "uni-1", LinkedinAccountStatus::Connected)
            .await
            .unwrap();
        assert_eq!(changed, 1);
        let company = get_company(&db, &seed.company_id).await.unwrap().unwrap();
        assert_eq!(company.linkedin_status, "connected");

        // Unknown account id touches nothing.
        let changed = set_linkedin_status(&db, "ghost", LinkedinAccountStatus::Disconnected)
            .await
            .unwrap();
        assert_eq!(changed, 0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn imap_cursor_monotone() {
        let (db, _dir) = setup_db().await;
        let seed = seed_minimal(&db).await;

        assert_eq!(get_imap_cursor(&db, &seed.company_id, "bounce").await.unwrap(), 0);
        set_imap_cursor(&db, &seed.company_id, "bounce", 42).await.unwrap();
        assert_eq!(get_imap_cursor(&db, &seed.company_id, "bounce").await.unwrap(), 42);
        // Never moves backwards.
        set_imap_cursor(&db, &seed.company_id, "bounce", 7).await.unwrap();
        assert_eq!(get_imap_cursor(&db, &seed.company_id, "bounce").await.unwrap(), 42);
        db.close().await.unwrap();
    }
}
