// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Cadence workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Outreach channel a queue item belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Call,
    Linkedin,
}

/// Lifecycle state of a queue item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Processing,
    Sent,
    Failed,
    Cancelled,
}

impl QueueStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueStatus::Sent | QueueStatus::Failed | QueueStatus::Cancelled
        )
    }
}

/// Lifecycle state of a campaign run. Transitions are monotone:
/// `idle -> running -> completed | cancelled`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Campaign type: which channels a campaign drives.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    Email,
    Call,
    Linkedin,
    EmailAndCall,
}

impl CampaignType {
    /// Channels this campaign enqueues initial items for.
    pub fn channels(&self) -> &'static [Channel] {
        match self {
            CampaignType::Email => &[Channel::Email],
            CampaignType::Call => &[Channel::Call],
            CampaignType::Linkedin => &[Channel::Linkedin],
            CampaignType::EmailAndCall => &[Channel::Email, Channel::Call],
        }
    }
}

/// Ordinal position of a queue item within a lead's sequence.
///
/// `initial` is the first outreach; `r1`, `r2`, ... are reminder stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Initial,
    Reminder(u8),
}

impl Stage {
    /// The stage a log must carry for this reminder stage to be eligible.
    /// `r1` requires no prior reminder; `r(k)` requires `r(k-1)`.
    pub fn prior(&self) -> Option<Stage> {
        match self {
            Stage::Initial => None,
            Stage::Reminder(1) => None,
            Stage::Reminder(k) => Some(Stage::Reminder(k - 1)),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Initial => write!(f, "initial"),
            Stage::Reminder(k) => write!(f, "r{k}"),
        }
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "initial" {
            return Ok(Stage::Initial);
        }
        s.strip_prefix('r')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| *n >= 1)
            .map(Stage::Reminder)
            .ok_or_else(|| format!("invalid stage: {s}"))
    }
}

/// LinkedIn connectivity of a tenant account, driven by provider webhooks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LinkedinAccountStatus {
    Connected,
    Disconnected,
    CredentialsRequired,
}

/// Network distance between a tenant's LinkedIn account and a lead.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NetworkDistance {
    First,
    Second,
    Third,
}

/// Local wall-clock work window, possibly wrapping midnight.
///
/// Times are "HH:MM" strings in the tenant's local time. A window of
/// 22:00-06:00 admits dispatch late evening through early morning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkWindow {
    pub start: String,
    pub end: String,
}

impl WorkWindow {
    /// Whether `local_time` ("HH:MM") falls inside this window.
    pub fn contains(&self, local_time: &str) -> bool {
        if self.start <= self.end {
            self.start.as_str() <= local_time && local_time <= self.end.as_str()
        } else {
            // Wraps midnight.
            local_time >= self.start.as_str() || local_time <= self.end.as_str()
        }
    }
}
