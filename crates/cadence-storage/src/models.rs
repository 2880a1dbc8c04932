// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! These types represent rows stored in the SQLite database. Status and
//! channel columns are kept as strings at the row level; the typed enums in
//! `cadence-core` are used at API boundaries and parsed where the engine
//! needs them.

use std::str::FromStr;

use cadence_core::{QueueStatus, Stage, WorkWindow};
use serde::{Deserialize, Serialize};

/// A tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    /// SMTP account address; `None` disables the email channel.
    pub account_email: Option<String>,
    /// AES-256-GCM sealed SMTP password.
    pub account_password_sealed: Option<Vec<u8>>,
    pub account_nonce: Option<Vec<u8>>,
    /// Email provider key: "gmail", "outlook", "yahoo".
    pub account_type: Option<String>,
    pub reply_domain: Option<String>,
    /// Fixed offset of the tenant's local wall clock from UTC.
    pub utc_offset_minutes: i32,
    pub linkedin_account_id: Option<String>,
    /// "connected", "disconnected", "credentials_required".
    pub linkedin_status: String,
    pub deleted: bool,
    pub created_at: String,
}

/// A tenant-scoped product referenced by campaigns. Soft-deleted only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub company_id: String,
    pub product_name: String,
    pub description: Option<String>,
    pub deleted: bool,
}

/// A tenant-scoped contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub linkedin_id: Option<String>,
    /// "first", "second", "third".
    pub linkedin_network_distance: Option<String>,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    /// JSON blob of enrichment metadata; updatable, unlike contact keys.
    pub enrichment: Option<String>,
    pub email_bounced: bool,
    pub do_not_contact: bool,
    pub created_at: String,
}

/// A tenant-scoped campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub company_id: String,
    pub product_id: String,
    pub name: String,
    /// "email", "call", "linkedin", "email_and_call".
    pub campaign_type: String,
    pub template: Option<String>,
    pub call_script_template: Option<String>,
    pub linkedin_message_template: Option<String>,
    pub linkedin_invitation_template: Option<String>,
    pub inmail_enabled: bool,
    pub n_reminders: u8,
    pub days_between_reminders: u32,
    pub deleted: bool,
    pub created_at: String,
}

/// One execution of a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignRun {
    pub id: String,
    pub campaign_id: String,
    pub company_id: String,
    /// "idle", "running", "completed", "cancelled".
    pub status: String,
    pub leads_total: i64,
    pub leads_processed: i64,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

/// A unit of outbound work: one action for one lead on one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: i64,
    pub company_id: String,
    pub campaign_id: String,
    pub run_id: String,
    pub lead_id: String,
    /// "email", "call", "linkedin".
    pub channel: String,
    /// "initial", "r1", "r2", ...
    pub stage: String,
    /// "pending", "processing", "sent", "failed", "cancelled".
    pub status: String,
    pub priority: i64,
    pub created_at: String,
    pub scheduled_for: String,
    pub processed_at: Option<String>,
    pub lease_expires_at: Option<String>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub error: Option<String>,
    /// Email log this reminder item follows up on; `None` for initial items.
    pub parent_log_id: Option<String>,
    pub work_window_start: Option<String>,
    pub work_window_end: Option<String>,
}

impl QueueItem {
    pub fn queue_status(&self) -> Option<QueueStatus> {
        QueueStatus::from_str(&self.status).ok()
    }

    pub fn parsed_stage(&self) -> Option<Stage> {
        self.stage.parse().ok()
    }

    pub fn work_window(&self) -> Option<WorkWindow> {
        match (&self.work_window_start, &self.work_window_end) {
            (Some(start), Some(end)) => Some(WorkWindow {
                start: start.clone(),
                end: end.clone(),
            }),
            _ => None,
        }
    }
}

/// Parameters for inserting a queue item.
#[derive(Debug, Clone)]
pub struct NewQueueItem {
    pub company_id: String,
    pub campaign_id: String,
    pub run_id: String,
    pub lead_id: String,
    pub channel: String,
    pub stage: String,
    pub priority: i64,
    pub scheduled_for: String,
    pub max_retries: u32,
    pub parent_log_id: Option<String>,
    pub work_window_start: Option<String>,
    pub work_window_end: Option<String>,
}

/// One attempted-or-successful email dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLog {
    pub id: String,
    pub company_id: String,
    pub campaign_id: String,
    pub run_id: String,
    pub lead_id: String,
    pub sent_at: Option<String>,
    pub provider_message_id: Option<String>,
    pub has_replied: bool,
    pub has_opened: bool,
    pub has_meeting_booked: bool,
    /// Last reminder stage queued for this thread ("r1", "r2", ...).
    pub last_reminder_sent: Option<String>,
    pub last_reminder_sent_at: Option<String>,
}

/// One message within an email thread (assistant send or lead reply).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLogDetail {
    pub id: i64,
    pub email_log_id: String,
    pub message_id: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    /// "assistant" or "lead".
    pub sender_type: String,
    pub from_name: Option<String>,
    pub from_email: Option<String>,
    pub to_email: Option<String>,
    /// Reminder stage for follow-up sends; `None` for initial.
    pub reminder_type: Option<String>,
    pub sent_at: String,
}

/// An outbound call; completed asynchronously by the webhook ingestor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: String,
    pub company_id: String,
    pub campaign_id: String,
    pub run_id: String,
    pub lead_id: String,
    pub provider_call_id: Option<String>,
    /// "initiated", "completed", "failed".
    pub status: String,
    pub duration: Option<i64>,
    pub sentiment: Option<String>,
    pub summary: Option<String>,
    pub transcript: Option<String>,
    pub recording_url: Option<String>,
    pub has_meeting_booked: bool,
    pub created_at: String,
}

/// One LinkedIn outreach (message, invitation, or InMail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedinLog {
    pub id: String,
    pub company_id: String,
    pub campaign_id: String,
    pub run_id: String,
    pub lead_id: String,
    pub chat_id: Option<String>,
    pub provider_message_id: Option<String>,
    /// "message", "invitation", "inmail".
    pub action: String,
    pub sent_at: Option<String>,
    pub has_replied: bool,
}

/// Per-company, per-channel throttle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleSettings {
    pub company_id: String,
    pub channel: String,
    pub enabled: bool,
    pub max_per_hour: i64,
    pub max_per_day: i64,
    pub work_window_start: Option<String>,
    pub work_window_end: Option<String>,
    /// Calls always honor the window; email only when this is set.
    pub enforce_work_window: bool,
}

impl ThrottleSettings {
    pub fn work_window(&self) -> Option<WorkWindow> {
        match (&self.work_window_start, &self.work_window_end) {
            (Some(start), Some(end)) => Some(WorkWindow {
                start: start.clone(),
                end: end.clone(),
            }),
            _ => None,
        }
    }
}
