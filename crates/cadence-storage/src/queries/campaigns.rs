// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign and product queries.

use cadence_core::CadenceError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::{Campaign, Product};

const CAMPAIGN_COLUMNS: &str = "id, company_id, product_id, name, campaign_type, template, \
     call_script_template, linkedin_message_template, linkedin_invitation_template, \
     inmail_enabled, n_reminders, days_between_reminders, deleted, created_at";

fn row_to_campaign(row: &rusqlite::Row<'_>) -> Result<Campaign, rusqlite::Error> {
    Ok(Campaign {
        id: row.get(0)?,
        company_id: row.get(1)?,
        product_id: row.get(2)?,
        name: row.get(3)?,
        campaign_type: row.get(4)?,
        template: row.get(5)?,
        call_script_template: row.get(6)?,
        linkedin_message_template: row.get(7)?,
        linkedin_invitation_template: row.get(8)?,
        inmail_enabled: row.get::<_, i64>(9)? != 0,
        n_reminders: row.get::<_, i64>(10)? as u8,
        days_between_reminders: row.get::<_, i64>(11)? as u32,
        deleted: row.get::<_, i64>(12)? != 0,
        created_at: row.get(13)?,
    })
}

/// Get a campaign by id.
pub async fn get_campaign(db: &Database, id: &str) -> Result<Option<Campaign>, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_campaign) {
                Ok(campaign) => Ok(Some(campaign)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List non-deleted campaigns of the given types that have reminders
/// configured. Input set for the reminder scheduler.
pub async fn list_with_reminders(
    db: &Database,
    campaign_types: &[&str],
) -> Result<Vec<Campaign>, CadenceError> {
    let types: Vec<String> = campaign_types.iter().map(|t| t.to_string()).collect();
    db.connection()
        .call(move |conn| {
            let placeholders = (1..=types.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns
                 WHERE deleted = 0 AND n_reminders > 0 AND campaign_type IN ({placeholders})
                 ORDER BY created_at"
            ))?;
            let rows = stmt.query_map(
                rusqlite::params_from_iter(types.iter()),
                row_to_campaign,
            )?;
            let mut campaigns = Vec::new();
            for row in rows {
                campaigns.push(row?);
            }
            Ok(campaigns)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a product by id. Soft-deleted products still resolve so historical
/// logs remain interpretable; callers check `deleted` where it matters.
pub async fn get_product(db: &Database, id: &str) -> Result<Option<Product>, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, company_id, product_name, description, deleted
                 FROM products WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], |row| {
                Ok(Product {
                    id: row.get(0)?,
                    company_id: row.get(1)?,
                    product_name: row.get(2)?,
                    description: row.get(3)?,
                    deleted: row.get::<_, i64>(4)? != 0,
                })
            });
            match result {
                Ok(product) => Ok(Some(product)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testutil::{seed_minimal, setup_db};

    #[tokio::test]
    async fn get_campaign_and_product() {
        let (db, _dir) = setup_db().await;
        let seed = seed_minimal(&db).await;

        let campaign = get_campaign(&db, &seed.campaign_id).await.unwrap().unwrap();
        assert_eq!(campaign.campaign_type, "email");
        assert_eq!(campaign.n_reminders, 2);
        assert_eq!(campaign.days_between_reminders, 2);

        let product = get_product(&db, &seed.product_id).await.unwrap().unwrap();
        assert_eq!(product.product_name, "Widget");
        assert!(!product.deleted);

        assert!(get_campaign(&db, "nope").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reminder_listing_filters_type_and_count() {
        let (db, _dir) = setup_db().await;
        let seed = seed_minimal(&db).await;

        // A call campaign and a zero-reminder campaign must not appear.
        db.connection()
            .call({
                let (company_id, product_id) = (seed.company_id.clone(), seed.product_id.clone());
                move |conn| {
                    conn.execute(
                        "INSERT INTO campaigns (id, company_id, product_id, name, campaign_type,
                             n_reminders, created_at)
                         VALUES ('camp-call', ?1, ?2, 'Calls', 'call', 3,
                             strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                        params![company_id, product_id],
                    )?;
                    conn.execute(
                        "INSERT INTO campaigns (id, company_id, product_id, name, campaign_type,
                             n_reminders, created_at)
                         VALUES ('camp-zero', ?1, ?2, 'NoRem', 'email', 0,
                             strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                        params![company_id, product_id],
                    )?;
                    Ok(())
                }
            })
            .await
            .unwrap();

        let campaigns = list_with_reminders(&db, &["email", "email_and_call"]).await.unwrap();
        assert_eq!(campaigns.len(), 1);
        assert_eq!(campaigns[0].id, seed.campaign_id);
        db.close().await.unwrap();
    }
}
