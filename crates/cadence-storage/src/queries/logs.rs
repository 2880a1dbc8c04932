// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch log queries: email logs and thread details, call records, and
//! LinkedIn outreach logs.
//!
//! The email log row is created before the send so its id can be embedded in
//! the tracking pixel and reply-to address; `set_email_sent` fills in the
//! provider message id afterwards.

use cadence_core::CadenceError;
use rusqlite::params;
use uuid::Uuid;

use crate::database::{map_tr_err, Database};
use crate::models::{CallRecord, EmailLog, EmailLogDetail};

const EMAIL_LOG_COLUMNS: &str = "id, company_id, campaign_id, run_id, lead_id, sent_at, \
     provider_message_id, has_replied, has_opened, has_meeting_booked, last_reminder_sent, \
     last_reminder_sent_at";

fn row_to_email_log(row: &rusqlite::Row<'_>) -> Result<EmailLog, rusqlite::Error> {
    Ok(EmailLog {
        id: row.get(0)?,
        company_id: row.get(1)?,
        campaign_id: row.get(2)?,
        run_id: row.get(3)?,
        lead_id: row.get(4)?,
        sent_at: row.get(5)?,
        provider_message_id: row.get(6)?,
        has_replied: row.get::<_, i64>(7)? != 0,
        has_opened: row.get::<_, i64>(8)? != 0,
        has_meeting_booked: row.get::<_, i64>(9)? != 0,
        last_reminder_sent: row.get(10)?,
        last_reminder_sent_at: row.get(11)?,
    })
}

/// Create an email log row ahead of the send, returning its id.
///
/// Coalesces on `(run_id, lead_id)` when a prior attempt already created the
/// row, so a retried item reuses its log.
pub async fn create_email_log(
    db: &Database,
    company_id: &str,
    campaign_id: &str,
    run_id: &str,
    lead_id: &str,
) -> Result<String, CadenceError> {
    let company_id = company_id.to_string();
    let campaign_id = campaign_id.to_string();
    let run_id = run_id.to_string();
    let lead_id = lead_id.to_string();
    let new_id = Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM email_logs WHERE run_id = ?1 AND lead_id = ?2",
                    params![run_id, lead_id],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            if let Some(id) = existing {
                return Ok(id);
            }
            conn.execute(
                "INSERT INTO email_logs (id, company_id, campaign_id, run_id, lead_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![new_id, company_id, campaign_id, run_id, lead_id],
            )?;
            Ok(new_id)
        })
        .await
        .map_err(map_tr_err)
}

/// Get an email log by id.
pub async fn get_email_log(db: &Database, id: &str) -> Result<Option<EmailLog>, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EMAIL_LOG_COLUMNS} FROM email_logs WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_email_log) {
                Ok(log) => Ok(Some(log)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Record the successful send on the log: timestamp and provider message id.
/// Duplicate provider ids (replayed sends) leave the first row untouched.
pub async fn set_email_sent(
    db: &Database,
    id: &str,
    provider_message_id: &str,
    sent_at: &str,
) -> Result<(), CadenceError> {
    let id = id.to_string();
    let provider_message_id = provider_message_id.to_string();
    let sent_at = sent_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE email_logs SET sent_at = ?1,
                     provider_message_id = COALESCE(provider_message_id, ?2)
                 WHERE id = ?3",
                params![sent_at, provider_message_id, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Find an email log by provider message id, for bounce attribution.
pub async fn find_by_provider_message_id(
    db: &Database,
    provider_message_id: &str,
) -> Result<Option<EmailLog>, CadenceError> {
    let provider_message_id = provider_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EMAIL_LOG_COLUMNS} FROM email_logs WHERE provider_message_id = ?1"
            ))?;
            match stmt.query_row(params![provider_message_id], row_to_email_log) {
                Ok(log) => Ok(Some(log)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Append a message to an email thread.
#[allow(clippy::too_many_arguments)]
pub async fn create_email_detail(
    db: &Database,
    email_log_id: &str,
    message_id: Option<&str>,
    subject: Option<&str>,
    body: Option<&str>,
    sender_type: &str,
    from_name: Option<&str>,
    from_email: Option<&str>,
    to_email: Option<&str>,
    reminder_type: Option<&str>,
    sent_at: &str,
) -> Result<i64, CadenceError> {
    let email_log_id = email_log_id.to_string();
    let message_id = message_id.map(str::to_string);
    let subject = subject.map(str::to_string);
    let body = body.map(str::to_string);
    let sender_type = sender_type.to_string();
    let from_name = from_name.map(str::to_string);
    let from_email = from_email.map(str::to_string);
    let to_email = to_email.map(str::to_string);
    let reminder_type = reminder_type.map(str::to_string);
    let sent_at = sent_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO email_log_details
                 (email_log_id, message_id, subject, body, sender_type, from_name, from_email,
                  to_email, reminder_type, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    email_log_id,
                    message_id,
                    subject,
                    body,
                    sender_type,
                    from_name,
                    from_email,
                    to_email,
                    reminder_type,
                    sent_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// The first assistant message of a thread, used when composing reminders.
pub async fn first_assistant_detail(
    db: &Database,
    email_log_id: &str,
) -> Result<Option<EmailLogDetail>, CadenceError> {
    let email_log_id = email_log_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email_log_id, message_id, subject, body, sender_type, from_name,
                        from_email, to_email, reminder_type, sent_at
                 FROM email_log_details
                 WHERE email_log_id = ?1 AND sender_type = 'assistant'
                 ORDER BY id ASC LIMIT 1",
            )?;
            let result = stmt.query_row(params![email_log_id], |row| {
                Ok(EmailLogDetail {
                    id: row.get(0)?,
                    email_log_id: row.get(1)?,
                    message_id: row.get(2)?,
                    subject: row.get(3)?,
                    body: row.get(4)?,
                    sender_type: row.get(5)?,
                    from_name: row.get(6)?,
                    from_email: row.get(7)?,
                    to_email: row.get(8)?,
                    reminder_type: row.get(9)?,
                    sent_at: row.get(10)?,
                })
            });
            match result {
                Ok(detail) => Ok(Some(detail)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Count assistant-sent detail rows for a log.
pub async fn assistant_detail_count(db: &Database, email_log_id: &str) -> Result<i64, CadenceError> {
    let email_log_id = email_log_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM email_log_details
                 WHERE email_log_id = ?1 AND sender_type = 'assistant'",
                params![email_log_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
        })
        .await
        .map_err(map_tr_err)
}

/// Set `has_replied` on a log. Returns whether this delivery changed state,
/// so duplicate webhooks are no-ops.
pub async fn mark_replied(db: &Database, email_log_id: &str) -> Result<bool, CadenceError> {
    let email_log_id = email_log_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE email_logs SET has_replied = 1 WHERE id = ?1 AND has_replied = 0",
                params![email_log_id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Set `has_opened` on a log. Idempotent like `mark_replied`.
pub async fn mark_opened(db: &Database, email_log_id: &str) -> Result<bool, CadenceError> {
    let email_log_id = email_log_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE email_logs SET has_opened = 1 WHERE id = ?1 AND has_opened = 0",
                params![email_log_id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Advance the reminder cadence fields after a reminder send.
pub async fn set_reminder_stage(
    db: &Database,
    email_log_id: &str,
    stage: &str,
    at: &str,
) -> Result<(), CadenceError> {
    let email_log_id = email_log_id.to_string();
    let stage = stage.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE email_logs SET last_reminder_sent = ?1, last_reminder_sent_at = ?2
                 WHERE id = ?3",
                params![stage, at, email_log_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Email logs of a campaign eligible for the next reminder stage.
///
/// Eligibility per stage `r(k)`: the prior stage matches (`None` for r1,
/// in which case the initial send time gates), the gating timestamp is older
/// than the cutoff, no reply or booked meeting, and the lead and company are
/// still live.
pub async fn reminder_candidates(
    db: &Database,
    campaign_id: &str,
    prior_stage: Option<&str>,
    cutoff: &str,
    limit: u32,
) -> Result<Vec<EmailLog>, CadenceError> {
    let campaign_id = campaign_id.to_string();
    let prior_stage = prior_stage.map(str::to_string);
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let stage_predicate = if prior_stage.is_some() {
                "el.last_reminder_sent = ?2 AND el.last_reminder_sent_at <= ?3"
            } else {
                "el.last_reminder_sent IS NULL AND ?2 IS NULL
                 AND el.sent_at IS NOT NULL AND el.sent_at <= ?3"
            };
            let mut stmt = conn.prepare(&format!(
                "SELECT el.id, el.company_id, el.campaign_id, el.run_id, el.lead_id, el.sent_at,
                        el.provider_message_id, el.has_replied, el.has_opened,
                        el.has_meeting_booked, el.last_reminder_sent, el.last_reminder_sent_at
                 FROM email_logs el
                 JOIN leads l ON l.id = el.lead_id
                 JOIN companies c ON c.id = el.company_id
                 WHERE el.campaign_id = ?1
                   AND el.has_replied = 0 AND el.has_meeting_booked = 0
                   AND l.email_bounced = 0 AND l.do_not_contact = 0
                   AND c.deleted = 0
                   AND {stage_predicate}
                 ORDER BY el.sent_at ASC
                 LIMIT ?4"
            ))?;
            let rows = stmt.query_map(
                params![campaign_id, prior_stage, cutoff, limit],
                row_to_email_log,
            )?;
            let mut logs = Vec::new();
            for row in rows {
                logs.push(row?);
            }
            Ok(logs)
        })
        .await
        .map_err(map_tr_err)
}

// --- Call records ---

/// Create a call record when the telephony provider accepts the call.
pub async fn create_call_record(
    db: &Database,
    company_id: &str,
    campaign_id: &str,
    run_id: &str,
    lead_id: &str,
    provider_call_id: &str,
) -> Result<String, CadenceError> {
    let id = Uuid::new_v4().to_string();
    let record_id = id.clone();
    let company_id = company_id.to_string();
    let campaign_id = campaign_id.to_string();
    let run_id = run_id.to_string();
    let lead_id = lead_id.to_string();
    let provider_call_id = provider_call_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO call_records
                 (id, company_id, campaign_id, run_id, lead_id, provider_call_id, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'initiated', strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![record_id, company_id, campaign_id, run_id, lead_id, provider_call_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(id)
}

/// Complete a call record from the provider webhook. Idempotent upsert keyed
/// by provider call id; returns whether a record matched.
#[allow(clippy::too_many_arguments)]
pub async fn complete_call_record(
    db: &Database,
    provider_call_id: &str,
    duration: Option<i64>,
    sentiment: Option<&str>,
    summary: Option<&str>,
    transcript: Option<&str>,
    recording_url: Option<&str>,
    has_meeting_booked: bool,
) -> Result<bool, CadenceError> {
    let provider_call_id = provider_call_id.to_string();
    let sentiment = sentiment.map(str::to_string);
    let summary = summary.map(str::to_string);
    let transcript = transcript.map(str::to_string);
    let recording_url = recording_url.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE call_records
                 SET status = 'completed', duration = ?1, sentiment = ?2, summary = ?3,
                     transcript = ?4, recording_url = ?5, has_meeting_booked = ?6
                 WHERE provider_call_id = ?7",
                params![
                    duration,
                    sentiment,
                    summary,
                    transcript,
                    recording_url,
                    has_meeting_booked as i64,
                    provider_call_id,
                ],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a call record by provider call id.
pub async fn get_call_by_provider_id(
    db: &Database,
    provider_call_id: &str,
) -> Result<Option<CallRecord>, CadenceError> {
    let provider_call_id = provider_call_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, company_id, campaign_id, run_id, lead_id, provider_call_id, status,
                        duration, sentiment, summary, transcript, recording_url,
                        has_meeting_booked, created_at
                 FROM call_records WHERE provider_call_id = ?1",
            )?;
            let result = stmt.query_row(params![provider_call_id], |row| {
                Ok(CallRecord {
                    id: row.get(0)?,
                    company_id: row.get(1)?,
                    campaign_id: row.get(2)?,
                    run_id: row.get(3)?,
                    lead_id: row.get(4)?,
                    provider_call_id: row.get(5)?,
                    status: row.get(6)?,
                    duration: row.get(7)?,
                    sentiment: row.get(8)?,
                    summary: row.get(9)?,
                    transcript: row.get(10)?,
                    recording_url: row.get(11)?,
                    has_meeting_booked: row.get::<_, i64>(12)? != 0,
                    created_at: row.get(13)?,
                })
            });
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

// --- LinkedIn logs ---

/// Record a LinkedIn outreach (message, invitation, or InMail).
#[allow(clippy::too_many_arguments)]
pub async fn create_linkedin_log(
    db: &Database,
    company_id: &str,
    campaign_id: &str,
    run_id: &str,
    lead_id: &str,
    chat_id: Option<&str>,
    provider_message_id: Option<&str>,
    action: &str,
    sent_at: &str,
) -> Result<String, CadenceError> {
    let id = Uuid::new_v4().to_string();
    let log_id = id.clone();
    let company_id = company_id.to_string();
    let campaign_id = campaign_id.to_string();
    let run_id = run_id.to_string();
    let lead_id = lead_id.to_string();
    let chat_id = chat_id.map(str::to_string);
    let provider_message_id = provider_message_id.map(str::to_string);
    let action = action.to_string();
    let sent_at = sent_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO linkedin_logs
                 (id, company_id, campaign_id, run_id, lead_id, chat_id, provider_message_id,
                  action, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    log_id,
                    company_id,
                    campaign_id,
                    run_id,
                    lead_id,
                    chat_id,
                    provider_message_id,
                    action,
                    sent_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(id)
}

/// Flag the outreach in a chat as replied. Idempotent.
pub async fn mark_linkedin_replied_by_chat(
    db: &Database,
    chat_id: &str,
) -> Result<bool, CadenceError> {
    let chat_id = chat_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE linkedin_logs SET has_replied = 1
                 WHERE chat_id = ?1 AND has_replied = 0",
                params![chat_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Invitations sent by a tenant since `since`, for the provider's daily cap.
pub async fn count_invitations_since(
    db: &Database,
    company_id: &str,
    since: &str,
) -> Result<i64, CadenceError> {
    let company_id = company_id.to_string();
    let since = since.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM linkedin_logs
                 WHERE company_id = ?1 AND action = 'invitation' AND sent_at >= ?2",
                params![company_id, since],
                |row| row.get(0),
            )
            .map_err(Into::into)
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent chat id used with a lead, so follow-up messages continue the
/// same thread.
pub async fn latest_chat_for_lead(
    db: &Database,
    lead_id: &str,
) -> Result<Option<String>, CadenceError> {
    let lead_id = lead_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT chat_id FROM linkedin_logs
                 WHERE lead_id = ?1 AND chat_id IS NOT NULL
                 ORDER BY sent_at DESC LIMIT 1",
                params![lead_id],
                |row| row.get(0),
            );
            match result {
                Ok(chat) => Ok(Some(chat)),
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
    use crate::database::{iso_after, now_iso};
    use crate::queries::testutil::{seed_minimal, setup_db};

    #[tokio::test]
    async fn email_log_created_once_per_run_and_lead() {
        let (db, _dir) = setup_db().await;
        let seed = seed_minimal(&db).await;

        let first = create_email_log(&db, &seed.company_id, &seed.campaign_id, &seed.run_id, &seed.lead_id)
            .await
            .unwrap();
        let second = create_email_log(&db, &seed.company_id, &seed.campaign_id, &seed.run_id, &seed.lead_id)
            .await
            .unwrap();
        assert_eq!(first, second, "retried item must reuse its log row");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reply_and_open_flags_are_idempotent() {
        let (db, _dir) = setup_db().await;
        let seed = seed_minimal(&db).await;
        let log_id = create_email_log(&db, &seed.company_id, &seed.campaign_id, &seed.run_id, &seed.lead_id)
            .await
            .unwrap();

        assert!(mark_replied(&db, &log_id).await.unwrap());
        assert!(!mark_replied(&db, &log_id).await.unwrap(), "second delivery is a no-op");
        assert!(mark_opened(&db, &log_id).await.unwrap());
        assert!(!mark_opened(&db, &log_id).await.unwrap());

        let log = get_email_log(&db, &log_id).await.unwrap().unwrap();
        assert!(log.has_replied);
        assert!(log.has_opened);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn provider_message_id_is_write_once() {
        let (db, _dir) = setup_db().await;
        let seed = seed_minimal(&db).await;
        let log_id = create_email_log(&db, &seed.company_id, &seed.campaign_id, &seed.run_id, &seed.lead_id)
            .await
            .unwrap();

        set_email_sent(&db, &log_id, "<msg-1@test>", &now_iso()).await.unwrap();
        // A duplicate send on the replay path keeps the original id.
        set_email_sent(&db, &log_id, "<msg-2@test>", &now_iso()).await.unwrap();

        let log = get_email_log(&db, &log_id).await.unwrap().unwrap();
        assert_eq!(log.provider_message_id.as_deref(), Some("<msg-1@test>"));

        let found = find_by_provider_message_id(&db, "<msg-1@test>").await.unwrap();
        assert!(found.is_some());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reminder_candidates_follow_the_stage_chain() {
        let (db, _dir) = setup_db().await;
        let seed = seed_minimal(&db).await;
        let log_id = create_email_log(&db, &seed.company_id, &seed.campaign_id, &seed.run_id, &seed.lead_id)
            .await
            .unwrap();
        // Sent three days ago.
        let sent = iso_after(chrono::Duration::days(-3));
        set_email_sent(&db, &log_id, "<m@test>", &sent).await.unwrap();

        let cutoff = iso_after(chrono::Duration::days(-2));
        // r1: prior stage None, gated on sent_at.
        let r1 = reminder_candidates(&db, &seed.campaign_id, None, &cutoff, 10).await.unwrap();
        assert_eq!(r1.len(), 1);

        // Not yet eligible for r2 (r1 not sent).
        let r2 = reminder_candidates(&db, &seed.campaign_id, Some("r1"), &cutoff, 10)
            .await
            .unwrap();
        assert!(r2.is_empty());

        // After r1 goes out (sufficiently long ago), r2 becomes eligible.
        set_reminder_stage(&db, &log_id, "r1", &iso_after(chrono::Duration::days(-2))).await.unwrap();
        let r1_again = reminder_candidates(&db, &seed.campaign_id, None, &cutoff, 10).await.unwrap();
        assert!(r1_again.is_empty(), "log already past r1 must not re-match");
        let r2 = reminder_candidates(&db, &seed.campaign_id, Some("r1"), &cutoff, 10)
            .await
            .unwrap();
        assert_eq!(r2.len(), 1);

        // A reply stops the chain.
        mark_replied(&db, &log_id).await.unwrap();
        let after_reply = reminder_candidates(&db, &seed.campaign_id, Some("r1"), &cutoff, 10)
            .await
            .unwrap();
        assert!(after_reply.is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn call_record_lifecycle() {
        let (db, _dir) = setup_db().await;
        let seed = seed_minimal(&db).await;

        create_call_record(&db, &seed.company_id, &seed.campaign_id, &seed.run_id, &seed.lead_id, "bl-1")
            .await
            .unwrap();

        let matched = complete_call_record(
            &db,
            "bl-1",
            Some(95),
            Some("positive"),
            Some("Interested, follow up next week"),
            None,
            Some("https://rec.test/1"),
            true,
        )
        .await
        .unwrap();
        assert!(matched);

        let record = get_call_by_provider_id(&db, "bl-1").await.unwrap().unwrap();
        assert_eq!(record.status, "completed");
        assert_eq!(record.duration, Some(95));
        assert!(record.has_meeting_booked);

        // Unknown call id matches nothing.
        assert!(!complete_call_record(&db, "ghost", None, None, None, None, None, false)
            .await
            .unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn linkedin_invitation_counting_and_reply() {
        let (db, _dir) = setup_db().await;
        let seed = seed_minimal(&db).await;

        create_linkedin_log(
            &db, &seed.company_id, &seed.campaign_id, &seed.run_id, &seed.lead_id,
            Some("chat-1"), Some("lm-1"), "message", &now_iso(),
        )
        .await
        .unwrap();
        create_linkedin_log(
            &db, &seed.company_id, &seed.campaign_id, &seed.run_id, &seed.lead_id,
            None, Some("lm-2"), "invitation", &now_iso(),
        )
        .await
        .unwrap();

        let day_ago = iso_after(chrono::Duration::days(-1));
        let invitations = count_invitations_since(&db, &seed.company_id, &day_ago).await.unwrap();
        assert_eq!(invitations, 1);

        assert_eq!(
            latest_chat_for_lead(&db, &seed.lead_id).await.unwrap().as_deref(),
            Some("chat-1")
        );

        assert!(mark_linkedin_replied_by_chat(&db, "chat-1").await.unwrap());
        assert!(!mark_linkedin_replied_by_chat(&db, "chat-1").await.unwrap());
        db.close().await.unwrap();
    }
}
