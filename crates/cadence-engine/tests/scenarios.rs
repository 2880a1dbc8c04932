// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end scenarios driving the real poller, dispatchers, run tracker,
//! and reminder scheduler over mock transports.

use cadence_core::Channel;
use cadence_engine::{poller, reminders, runs};
use cadence_storage::models::ThrottleSettings;
use cadence_storage::queries::{logs, queue, throttle};
use cadence_test_utils::{MockFailure, TestHarness};
use rusqlite::params;

/// Happy email path: three leads, one poll, run completes with all logs and
/// details in place.
#[tokio::test]
async fn happy_email_path_completes_run() {
    let harness = TestHarness::builder().with_leads(3).build().await.unwrap();
    throttle::upsert_settings(
        &harness.db,
        &ThrottleSettings {
            company_id: harness.company_id.clone(),
            channel: "email".into(),
            enabled: true,
            max_per_hour: 50,
            max_per_day: 500,
            work_window_start: None,
            work_window_end: None,
            enforce_work_window: false,
        },
    )
    .await
    .unwrap();

    let started = runs::start_run(&harness.engine, &harness.campaign_id).await.unwrap();
    assert_eq!(started.leads_total, 3);
    assert_eq!(started.items_enqueued, 3);

    let dispatched = poller::poll_once(&harness.engine, Channel::Email).await.unwrap();
    assert_eq!(dispatched, 3);
    assert_eq!(harness.email.sent_count(), 3);

    let report = runs::report(&harness.engine, &started.run_id).await.unwrap();
    assert_eq!(report.status, "completed");
    assert_eq!(report.leads_processed, 3);
    assert_eq!(report.counts_by_status, vec![("sent".to_string(), 3)]);

    // Exactly one assistant detail per send.
    let (log_count, detail_count): (i64, i64) = harness
        .db
        .connection()
        .call(|conn| {
            let logs: i64 = conn.query_row("SELECT COUNT(*) FROM email_logs", [], |r| r.get(0))?;
            let details: i64 = conn.query_row(
                "SELECT COUNT(*) FROM email_log_details WHERE sender_type = 'assistant'",
                [],
                |r| r.get(0),
            )?;
            Ok((logs, details))
        })
        .await
        .unwrap();
    assert_eq!(log_count, 3);
    assert_eq!(detail_count, 3);

    // Every sent message carries a tracking pixel and a plus-addressed
    // reply-to keyed to its log.
    let sent = harness.email.sent.lock().unwrap();
    for message in sent.iter() {
        assert!(message.html_body.contains("/track/open/"));
        assert!(message.reply_to.contains('+'));
    }
}

/// Throttle back-pressure: an hourly cap of 2 drains 5 items over 3 windows.
#[tokio::test]
async fn throttle_backpressure_drains_over_windows() {
    let harness = TestHarness::builder().with_leads(5).build().await.unwrap();
    throttle::upsert_settings(
        &harness.db,
        &ThrottleSettings {
            company_id: harness.company_id.clone(),
            channel: "email".into(),
            enabled: true,
            max_per_hour: 2,
            max_per_day: 500,
            work_window_start: None,
            work_window_end: None,
            enforce_work_window: false,
        },
    )
    .await
    .unwrap();

    let started = runs::start_run(&harness.engine, &harness.campaign_id).await.unwrap();

    // Age all sent items out of the hourly window, standing in for the
    // passage of one hour.
    let age_sent_out_of_window = |harness: &TestHarness| {
        let db = harness.db.clone();
        async move {
            db.connection()
                .call(|conn| {
                    conn.execute(
                        "UPDATE queue_items
                         SET processed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '-2 hours')
                         WHERE status = 'sent'",
                        [],
                    )?;
                    Ok(())
                })
                .await
                .unwrap();
        }
    };

    assert_eq!(poller::poll_once(&harness.engine, Channel::Email).await.unwrap(), 2);
    // Within the same window a second poll sends nothing.
    assert_eq!(poller::poll_once(&harness.engine, Channel::Email).await.unwrap(), 0);

    age_sent_out_of_window(&harness).await;
    assert_eq!(poller::poll_once(&harness.engine, Channel::Email).await.unwrap(), 2);

    age_sent_out_of_window(&harness).await;
    assert_eq!(poller::poll_once(&harness.engine, Channel::Email).await.unwrap(), 1);

    let report = runs::report(&harness.engine, &started.run_id).await.unwrap();
    assert_eq!(report.status, "completed");
    assert_eq!(report.leads_processed, 5);
}

/// Transient failure requeues with backoff, then the retry succeeds with a
/// single log and detail row.
#[tokio::test]
async fn transient_failure_retries_then_succeeds() {
    let harness = TestHarness::builder().with_leads(1).build().await.unwrap();
    harness.email.fail_next(MockFailure::Transient, 1);

    let started = runs::start_run(&harness.engine, &harness.campaign_id).await.unwrap();
    assert_eq!(poller::poll_once(&harness.engine, Channel::Email).await.unwrap(), 1);
    assert_eq!(harness.email.sent_count(), 0);

    // The item went back to pending with one retry recorded and a future
    // schedule.
    let item = queue::get_item(&harness.db, 1).await.unwrap().unwrap();
    assert_eq!(item.status, "pending");
    assert_eq!(item.retry_count, 1);
    assert!(item.scheduled_for > cadence_storage::now_iso());

    // Run is still open.
    let report = runs::report(&harness.engine, &started.run_id).await.unwrap();
    assert_eq!(report.status, "running");

    // Fast-forward the backoff and poll again.
    harness.make_pending_due().await.unwrap();
    assert_eq!(poller::poll_once(&harness.engine, Channel::Email).await.unwrap(), 1);
    assert_eq!(harness.email.sent_count(), 1);

    let item = queue::get_item(&harness.db, 1).await.unwrap().unwrap();
    assert_eq!(item.status, "sent");
    assert_eq!(item.retry_count, 1, "retry count retained on the terminal row");

    let (log_count, detail_count): (i64, i64) = harness
        .db
        .connection()
        .call(|conn| {
            let logs: i64 = conn.query_row("SELECT COUNT(*) FROM email_logs", [], |r| r.get(0))?;
            let details: i64 =
                conn.query_row("SELECT COUNT(*) FROM email_log_details", [], |r| r.get(0))?;
            Ok((logs, details))
        })
        .await
        .unwrap();
    assert_eq!(log_count, 1, "the retried item reuses its log row");
    assert_eq!(detail_count, 1);

    let report = runs::report(&harness.engine, &started.run_id).await.unwrap();
    assert_eq!(report.status, "completed");
    assert_eq!(report.leads_processed, 1);
}

/// A hard bounce mid-dispatch marks the lead and cancels its other pending
/// email items.
#[tokio::test]
async fn permanent_failure_cancels_other_items_for_lead() {
    let harness = TestHarness::builder()
        .with_leads(1)
        .with_config(|c| c.poller.batch_cap = 1)
        .build()
        .await
        .unwrap();

    let started = runs::start_run(&harness.engine, &harness.campaign_id).await.unwrap();
    // Queue a second email item for the same lead (a reminder stage), still
    // pending when the bounce hits.
    harness
        .db
        .connection()
        .call(|conn| {
            conn.execute(
                "INSERT INTO queue_items
                 (company_id, campaign_id, run_id, lead_id, channel, stage, status, priority,
                  created_at, scheduled_for, max_retries)
                 SELECT company_id, campaign_id, run_id, lead_id, channel, 'r1', 'pending', 0,
                        created_at, scheduled_for, max_retries
                 FROM queue_items WHERE id = 1",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

    harness.email.fail_next(MockFailure::Permanent, 1);
    poller::poll_once(&harness.engine, Channel::Email).await.unwrap();

    let initial = queue::get_item(&harness.db, 1).await.unwrap().unwrap();
    assert_eq!(initial.status, "failed");
    let reminder = queue::get_item(&harness.db, 2).await.unwrap().unwrap();
    assert_eq!(reminder.status, "cancelled");

    // The lead's email contact is now bad; no reminders will ever match it.
    let bounced: i64 = harness
        .db
        .connection()
        .call(|conn| {
            conn.query_row(
                "SELECT email_bounced FROM leads WHERE id = 'lead-0'",
                [],
                |r| r.get(0),
            )
            .map_err(Into::into)
        })
        .await
        .unwrap();
    assert_eq!(bounced, 1);

    let report = runs::report(&harness.engine, &started.run_id).await.unwrap();
    assert_eq!(report.status, "completed");
}

/// Reminder cadence: r1 then r2 fire two days apart; a reply stops r3.
#[tokio::test]
async fn reminder_cadence_stops_on_reply() {
    let harness = TestHarness::builder()
        .with_leads(1)
        .with_reminders(3, 2)
        .build()
        .await
        .unwrap();

    let _started = runs::start_run(&harness.engine, &harness.campaign_id).await.unwrap();
    poller::poll_once(&harness.engine, Channel::Email).await.unwrap();
    assert_eq!(harness.email.sent_count(), 1);

    let log_id: String = harness
        .db
        .connection()
        .call(|conn| {
            conn.query_row("SELECT id FROM email_logs", [], |r| r.get(0))
                .map_err(Into::into)
        })
        .await
        .unwrap();

    // Nothing fires before the threshold.
    assert_eq!(reminders::run_pass(&harness.engine).await.unwrap(), 0);

    // Two days later: r1.
    harness.backdate_log_sent(&log_id, 3).await.unwrap();
    assert_eq!(reminders::run_pass(&harness.engine).await.unwrap(), 1);
    // The pass is idempotent: re-running enqueues nothing new.
    assert_eq!(reminders::run_pass(&harness.engine).await.unwrap(), 0);

    poller::poll_once(&harness.engine, Channel::Email).await.unwrap();
    assert_eq!(harness.email.sent_count(), 2);
    let log = logs::get_email_log(&harness.db, &log_id).await.unwrap().unwrap();
    assert_eq!(log.last_reminder_sent.as_deref(), Some("r1"));
    assert!(log.last_reminder_sent_at.is_some());

    // Two more days: r2.
    harness.backdate_log_reminder(&log_id, 3).await.unwrap();
    assert_eq!(reminders::run_pass(&harness.engine).await.unwrap(), 1);
    poller::poll_once(&harness.engine, Channel::Email).await.unwrap();
    assert_eq!(harness.email.sent_count(), 3);
    let log = logs::get_email_log(&harness.db, &log_id).await.unwrap().unwrap();
    assert_eq!(log.last_reminder_sent.as_deref(), Some("r2"));

    // The lead replies; r3 never fires.
    logs::mark_replied(&harness.db, &log_id).await.unwrap();
    harness.backdate_log_reminder(&log_id, 3).await.unwrap();
    assert_eq!(reminders::run_pass(&harness.engine).await.unwrap(), 0);
    assert_eq!(harness.email.sent_count(), 3);

    // Reminder stages were composed in order with their strategy tags.
    let stages = harness.composer.stages_seen();
    assert_eq!(stages, vec!["initial", "r1", "r2"]);
}

/// Cancelled runs stop producing sends: pending items flip to cancelled and
/// the run never completes.
#[tokio::test]
async fn cancelled_run_produces_no_new_sends() {
    let harness = TestHarness::builder()
        .with_leads(10)
        .with_config(|c| c.poller.batch_cap = 3)
        .build()
        .await
        .unwrap();

    let started = runs::start_run(&harness.engine, &harness.campaign_id).await.unwrap();
    assert_eq!(poller::poll_once(&harness.engine, Channel::Email).await.unwrap(), 3);
    assert_eq!(harness.email.sent_count(), 3);

    let cancelled = runs::cancel(&harness.engine, &started.run_id).await.unwrap();
    assert_eq!(cancelled, 7);

    // Subsequent polls lease nothing for the run.
    assert_eq!(poller::poll_once(&harness.engine, Channel::Email).await.unwrap(), 0);
    assert_eq!(harness.email.sent_count(), 3);

    let report = runs::report(&harness.engine, &started.run_id).await.unwrap();
    assert_eq!(report.status, "cancelled");
    assert_eq!(report.leads_processed, 3);

    // The drain check never flips a cancelled run to completed.
    assert!(!runs::drain_check(&harness.engine, &started.run_id).await.unwrap());
    let report = runs::report(&harness.engine, &started.run_id).await.unwrap();
    assert_eq!(report.status, "cancelled");
}

/// An email-and-call campaign enqueues both channels and the call dispatch
/// records a provider call id for webhook completion.
#[tokio::test]
async fn email_and_call_campaign_drives_both_channels() {
    let harness = TestHarness::builder()
        .with_campaign_type("email_and_call")
        .with_leads(2)
        .build()
        .await
        .unwrap();

    let started = runs::start_run(&harness.engine, &harness.campaign_id).await.unwrap();
    assert_eq!(started.leads_total, 2);
    assert_eq!(started.items_enqueued, 4, "one item per lead per channel");

    poller::poll_once(&harness.engine, Channel::Email).await.unwrap();
    poller::poll_once(&harness.engine, Channel::Call).await.unwrap();
    assert_eq!(harness.email.sent_count(), 2);
    assert_eq!(harness.call.call_count(), 2);

    let call_records: i64 = harness
        .db
        .connection()
        .call(|conn| {
            conn.query_row("SELECT COUNT(*) FROM call_records", [], |r| r.get(0))
                .map_err(Into::into)
        })
        .await
        .unwrap();
    assert_eq!(call_records, 2);

    let report = runs::report(&harness.engine, &started.run_id).await.unwrap();
    assert_eq!(report.status, "completed");
}

/// LinkedIn dispatch picks the sub-action by network distance and pauses the
/// channel on auth failure.
#[tokio::test]
async fn linkedin_distance_routing_and_auth_pause() {
    let harness = TestHarness::builder()
        .with_campaign_type("linkedin")
        .with_leads(2)
        .build()
        .await
        .unwrap();

    // Second lead is a second-degree contact: invitation instead of message.
    harness
        .db
        .connection()
        .call(|conn| {
            conn.execute(
                "UPDATE leads SET linkedin_network_distance = 'second' WHERE id = 'lead-1'",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

    let started = runs::start_run(&harness.engine, &harness.campaign_id).await.unwrap();
    poller::poll_once(&harness.engine, Channel::Linkedin).await.unwrap();

    let sent = harness.linkedin.sent.lock().unwrap().clone();
    let mut actions: Vec<&str> = sent.iter().map(|(a, _, _)| a.as_str()).collect();
    actions.sort_unstable();
    assert_eq!(actions, vec!["invitation", "message"]);
    drop(sent);

    let report = runs::report(&harness.engine, &started.run_id).await.unwrap();
    assert_eq!(report.status, "completed");

    // A fresh run hitting an auth failure pauses the channel.
    let started2 = runs::start_run(&harness.engine, &harness.campaign_id).await.unwrap();
    harness.linkedin.fail_next(MockFailure::Auth, 1);
    harness
        .db
        .connection()
        .call(|conn| {
            // Keep only one lead eligible so the single auth failure is the
            // whole batch.
            conn.execute("UPDATE leads SET linkedin_id = NULL WHERE id = 'lead-1'", [])?;
            Ok(())
        })
        .await
        .unwrap();
    poller::poll_once(&harness.engine, Channel::Linkedin).await.unwrap();

    let status: String = harness
        .db
        .connection()
        .call(|conn| {
            conn.query_row("SELECT linkedin_status FROM companies", [], |r| r.get(0))
                .map_err(Into::into)
        })
        .await
        .unwrap();
    assert_eq!(status, "credentials_required");

    // The paused channel leases nothing on the next poll.
    assert_eq!(poller::poll_once(&harness.engine, Channel::Linkedin).await.unwrap(), 0);
    let _ = started2;
}

/// Stale leases are reclaimed and the item is retried.
#[tokio::test]
async fn stale_lease_reclamation_recovers_items() {
    let harness = TestHarness::builder().with_leads(1).build().await.unwrap();
    let _ = runs::start_run(&harness.engine, &harness.campaign_id).await.unwrap();

    // Simulate a crashed worker: lease the item with an expired lease.
    harness
        .db
        .connection()
        .call(|conn| {
            conn.execute(
                "UPDATE queue_items
                 SET status = 'processing',
                     lease_expires_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '-1 minute')
                 WHERE id = 1",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(poller::reclaim_stale_leases(&harness.engine).await.unwrap(), 1);
    let item = queue::get_item(&harness.db, 1).await.unwrap().unwrap();
    assert_eq!(item.status, "pending");
    assert_eq!(item.retry_count, 1);

    // The recovered item dispatches on the next poll (at-least-once).
    poller::poll_once(&harness.engine, Channel::Email).await.unwrap();
    assert_eq!(harness.email.sent_count(), 1);
}

/// Call items carry the tenant work window copied at enqueue time and the
/// store refuses to lease them outside it.
#[tokio::test]
async fn call_items_respect_work_window() {
    let harness = TestHarness::builder()
        .with_campaign_type("call")
        .with_leads(1)
        .build()
        .await
        .unwrap();

    // Work window of zero width at a time that is never "now": the item can
    // never lease.
    throttle::upsert_settings(
        &harness.db,
        &ThrottleSettings {
            company_id: harness.company_id.clone(),
            channel: "call".into(),
            enabled: true,
            max_per_hour: 100,
            max_per_day: 100,
            work_window_start: Some("00:00".into()),
            work_window_end: Some("00:00".into()),
            enforce_work_window: true,
        },
    )
    .await
    .unwrap();

    let _ = runs::start_run(&harness.engine, &harness.campaign_id).await.unwrap();
    let item = queue::get_item(&harness.db, 1).await.unwrap().unwrap();
    assert_eq!(item.work_window_start.as_deref(), Some("00:00"));

    // Unless the poll lands exactly at local midnight, nothing dispatches.
    let local = cadence_engine::throttle::local_time(0);
    let dispatched = poller::poll_once(&harness.engine, Channel::Call).await.unwrap();
    if local != "00:00" {
        assert_eq!(dispatched, 0);
        assert_eq!(harness.call.call_count(), 0);
    }
}

/// Queue items are unique per (run, lead, channel, stage): re-running the
/// enumeration cannot double-enqueue.
#[tokio::test]
async fn duplicate_enumeration_coalesces() {
    let harness = TestHarness::builder().with_leads(2).build().await.unwrap();
    let started = runs::start_run(&harness.engine, &harness.campaign_id).await.unwrap();

    // Re-enqueueing the same stage for the same run and leads is a no-op.
    let re_enqueued: i64 = harness
        .db
        .connection()
        .call({
            let run_id = started.run_id.clone();
            move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO queue_items
                     (company_id, campaign_id, run_id, lead_id, channel, stage, status, priority,
                      created_at, scheduled_for, max_retries)
                     SELECT company_id, campaign_id, run_id, lead_id, channel, stage, 'pending', 1,
                            created_at, scheduled_for, max_retries
                     FROM queue_items WHERE run_id = ?1",
                    params![run_id],
                )?;
                conn.query_row("SELECT COUNT(*) FROM queue_items", [], |r| r.get(0))
                    .map_err(Into::into)
            }
        })
        .await
        .unwrap();
    assert_eq!(re_enqueued, 2);
}
