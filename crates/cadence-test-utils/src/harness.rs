// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end test harness.
//!
//! `TestHarness` assembles a full engine against a temp SQLite database with
//! mock transports and composer, plus seed helpers for tenants, leads, and
//! campaigns. Scenario tests drive the real poller, dispatchers, run
//! tracker, and reminder scheduler through it.

use std::sync::Arc;

use cadence_config::CadenceConfig;
use cadence_core::CadenceError;
use cadence_engine::Engine;
use cadence_storage::Database;
use cadence_vault::{crypto, CredentialVault};
use rusqlite::params;

use crate::mock_composer::MockComposer;
use crate::mock_transport::{MockCallTransport, MockEmailTransport, MockLinkedinTransport};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    campaign_type: String,
    n_reminders: u8,
    days_between: u32,
    lead_count: usize,
    config: CadenceConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = CadenceConfig::default();
        // Tests never want real pacing.
        config.linkedin.intra_send_delay_secs = 0;
        config.telephony.api_key = Some("test-telephony-key".to_string());
        Self {
            campaign_type: "email".to_string(),
            n_reminders: 0,
            days_between: 2,
            lead_count: 1,
            config,
        }
    }

    pub fn with_campaign_type(mut self, campaign_type: &str) -> Self {
        self.campaign_type = campaign_type.to_string();
        self
    }

    pub fn with_reminders(mut self, n_reminders: u8, days_between: u32) -> Self {
        self.n_reminders = n_reminders;
        self.days_between = days_between;
        self
    }

    pub fn with_leads(mut self, lead_count: usize) -> Self {
        self.lead_count = lead_count;
        self
    }

    pub fn with_config(mut self, mutate: impl FnOnce(&mut CadenceConfig)) -> Self {
        mutate(&mut self.config);
        self
    }

    /// Build the harness: temp DB, vault, mocks, engine, and seed rows.
    pub async fn build(self) -> Result<TestHarness, CadenceError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| CadenceError::Storage {
            source: Box::new(e),
        })?;
        let db_path = temp_dir.path().join("harness.db");
        let db = Database::open(db_path.to_str().unwrap()).await?;

        let key = crypto::generate_random_key()?;
        let hex_key: String = key.iter().map(|b| format!("{b:02x}")).collect();
        let vault = CredentialVault::from_hex_key(&hex_key)?;
        let (sealed, nonce) = vault.seal("smtp-app-password")?;

        let composer = Arc::new(MockComposer::new());
        let email = Arc::new(MockEmailTransport::new());
        let call = Arc::new(MockCallTransport::new());
        let linkedin = Arc::new(MockLinkedinTransport::new());

        // Seed one tenant with working credentials on every channel.
        let company_id = "co-test".to_string();
        let product_id = "prod-test".to_string();
        let campaign_id = "camp-test".to_string();
        let campaign_type = self.campaign_type.clone();
        let n_reminders = i64::from(self.n_reminders);
        let days_between = i64::from(self.days_between);
        let lead_count = self.lead_count;
        {
            let company_id = company_id.clone();
            let product_id = product_id.clone();
            let campaign_id = campaign_id.clone();
            db.connection()
                .call(move |conn| {
                    conn.execute(
                        "INSERT INTO companies
                         (id, name, account_email, account_password_sealed, account_nonce,
                          account_type, utc_offset_minutes, linkedin_account_id,
                          linkedin_status, created_at)
                         VALUES (?1, 'Harness Inc', 'outreach@harness.test', ?2, ?3, 'gmail',
                                 0, 'uni-test', 'connected',
                                 strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                        params![company_id, sealed, nonce.to_vec()],
                    )?;
                    conn.execute(
                        "INSERT INTO products (id, company_id, product_name, description)
                         VALUES (?1, ?2, 'Widget', 'A fine widget')",
                        params![product_id, company_id],
                    )?;
                    conn.execute(
                        "INSERT INTO campaigns
                         (id, company_id, product_id, name, campaign_type, template,
                          call_script_template, linkedin_message_template,
                          linkedin_invitation_template, inmail_enabled, n_reminders,
                          days_between_reminders, created_at)
                         VALUES (?1, ?2, ?3, 'Harness campaign', ?4, '<p>{email_body}</p>',
                                 'Call script: {email_body}', 'LI message', 'LI invite', 0,
                                 ?5, ?6, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                        params![campaign_id, company_id, product_id, campaign_type, n_reminders, days_between],
                    )?;
                    for i in 0..lead_count {
                        conn.execute(
                            "INSERT INTO leads
                             (id, company_id, name, email, phone_number, linkedin_id,
                              linkedin_network_distance, company_name, created_at)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'first', 'Lead Corp',
                                     strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                            params![
                                format!("lead-{i}"),
                                company_id,
                                format!("Lead {i}"),
                                format!("lead{i}@example.test"),
                                format!("+1555010{i}"),
                                format!("urn-lead-{i}"),
                            ],
                        )?;
                    }
                    Ok(())
                })
                .await
                .map_err(|e| CadenceError::Storage {
                    source: Box::new(e),
                })?;
        }

        let engine = Arc::new(Engine::new(
            db.clone(),
            composer.clone(),
            email.clone(),
            call.clone(),
            linkedin.clone(),
            vault,
            self.config,
        ));

        Ok(TestHarness {
            engine,
            db,
            composer,
            email,
            call,
            linkedin,
            company_id,
            campaign_id,
            _temp_dir: temp_dir,
        })
    }
}

/// A fully wired engine over mocks and a temp database.
pub struct TestHarness {
    pub engine: Arc<Engine>,
    pub db: Database,
    pub composer: Arc<MockComposer>,
    pub email: Arc<MockEmailTransport>,
    pub call: Arc<MockCallTransport>,
    pub linkedin: Arc<MockLinkedinTransport>,
    pub company_id: String,
    pub campaign_id: String,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Rewind `scheduled_for` on all pending items so a subsequent poll sees
    /// them as due (the backoff clock, fast-forwarded).
    pub async fn make_pending_due(&self) -> Result<(), CadenceError> {
        self.db
            .connection()
            .call(|conn| {
                conn.execute(
                    "UPDATE queue_items
                     SET scheduled_for = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '-1 minute')
                     WHERE status = 'pending'",
                    [],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| CadenceError::Storage {
                source: Box::new(e),
            })
    }

    /// Backdate an email log's send time by `days`, to trigger reminders.
    pub async fn backdate_log_sent(&self, log_id: &str, days: i64) -> Result<(), CadenceError> {
        let log_id = log_id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE email_logs
                     SET sent_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1 || ' days')
                     WHERE id = ?2",
                    params![format!("-{days}"), log_id],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| CadenceError::Storage {
                source: Box::new(e),
            })
    }

    /// Backdate a log's `last_reminder_sent_at` by `days`.
    pub async fn backdate_log_reminder(&self, log_id: &str, days: i64) -> Result<(), CadenceError> {
        let log_id = log_id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE email_logs
                     SET last_reminder_sent_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1 || ' days')
                     WHERE id = ?2",
                    params![format!("-{days}"), log_id],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| CadenceError::Storage {
                source: Box::new(e),
            })
    }
}
