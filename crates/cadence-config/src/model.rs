// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Cadence engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Cadence configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CadenceConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Queue poller cadence and fan-out.
    #[serde(default)]
    pub poller: PollerConfig,

    /// Retry and backoff settings.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Reminder scheduler settings.
    #[serde(default)]
    pub reminders: ReminderConfig,

    /// Webhook gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Content-generation collaborator settings.
    #[serde(default)]
    pub compose: ComposeConfig,

    /// Telephony provider settings.
    #[serde(default)]
    pub telephony: TelephonyConfig,

    /// LinkedIn integrator settings.
    #[serde(default)]
    pub linkedin: LinkedinConfig,

    /// Credential vault settings.
    #[serde(default)]
    pub vault: VaultConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the service instance.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "cadence".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "cadence.db".to_string()
}

/// Queue poller configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollerConfig {
    /// Seconds between email queue ticks.
    #[serde(default = "default_email_interval")]
    pub email_interval_secs: u64,

    /// Seconds between call queue ticks.
    #[serde(default = "default_call_interval")]
    pub call_interval_secs: u64,

    /// Seconds between LinkedIn queue ticks.
    #[serde(default = "default_call_interval")]
    pub linkedin_interval_secs: u64,

    /// Per-batch safety cap applied on top of the throttle budget.
    #[serde(default = "default_batch_cap")]
    pub batch_cap: u32,

    /// Bounded per-tenant dispatch parallelism.
    #[serde(default = "default_fan_out")]
    pub fan_out: usize,

    /// Seconds a worker may hold a lease before reclamation.
    #[serde(default = "default_lease_timeout")]
    pub lease_timeout_secs: u64,

    /// Per external call timeout in seconds.
    #[serde(default = "default_call_timeout")]
    pub external_timeout_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            email_interval_secs: default_email_interval(),
            call_interval_secs: default_call_interval(),
            linkedin_interval_secs: default_call_interval(),
            batch_cap: default_batch_cap(),
            fan_out: default_fan_out(),
            lease_timeout_secs: default_lease_timeout(),
            external_timeout_secs: default_call_timeout(),
        }
    }
}

fn default_email_interval() -> u64 {
    60
}

fn default_call_interval() -> u64 {
    30
}

fn default_batch_cap() -> u32 {
    10
}

fn default_fan_out() -> usize {
    5
}

fn default_lease_timeout() -> u64 {
    300
}

fn default_call_timeout() -> u64 {
    30
}

/// Retry and backoff configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Maximum retry attempts before an item fails terminally.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff base in seconds for call and LinkedIn items.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: u64,

    /// Backoff base in seconds for email items.
    #[serde(default = "default_email_backoff_base")]
    pub email_backoff_base_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_secs: default_backoff_base(),
            email_backoff_base_secs: default_email_backoff_base(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    60
}

fn default_email_backoff_base() -> u64 {
    120
}

/// Reminder scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReminderConfig {
    /// Seconds between reminder scheduler ticks.
    #[serde(default = "default_reminder_interval")]
    pub interval_secs: u64,

    /// Strategy tags by reminder stage, forwarded to the composer untouched.
    /// Index 0 is the tag for r1.
    #[serde(default = "default_strategies")]
    pub strategies: Vec<String>,

    /// Optional per-stage day thresholds overriding each campaign's uniform
    /// `days_between_reminders`. Index 0 applies to r1.
    #[serde(default)]
    pub days_between_override: Vec<u32>,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reminder_interval(),
            strategies: default_strategies(),
            days_between_override: Vec::new(),
        }
    }
}

impl ReminderConfig {
    /// Strategy tag for a 1-based reminder stage. Later stages reuse the last
    /// configured tag.
    pub fn strategy_for(&self, stage: u8) -> Option<&str> {
        if self.strategies.is_empty() || stage == 0 {
            return None;
        }
        let idx = usize::from(stage - 1).min(self.strategies.len() - 1);
        Some(self.strategies[idx].as_str())
    }

    /// Day threshold for a 1-based stage: the per-stage override when
    /// configured, otherwise the campaign's uniform value.
    pub fn days_for(&self, stage: u8, campaign_days: u32) -> u32 {
        if stage == 0 {
            return campaign_days;
        }
        self.days_between_override
            .get(usize::from(stage - 1))
            .copied()
            .unwrap_or(campaign_days)
    }
}

fn default_reminder_interval() -> u64 {
    3600
}

fn default_strategies() -> Vec<String> {
    [
        "gentle",
        "value-add",
        "social-proof",
        "problem-solution",
        "urgency",
        "alt-approach",
        "break-up",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Webhook gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_bind_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_bind_port")]
    pub port: u16,

    /// Public base URL embedded in tracking pixels.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// HMAC secret for LinkedIn integrator webhooks. `None` skips verification.
    #[serde(default)]
    pub linkedin_webhook_secret: Option<String>,

    /// HMAC secret for telephony webhooks. `None` skips verification.
    #[serde(default)]
    pub telephony_webhook_secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_bind_host(),
            port: default_bind_port(),
            public_base_url: default_public_base_url(),
            linkedin_webhook_secret: None,
            telephony_webhook_secret: None,
        }
    }
}

fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    8780
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:8780".to_string()
}

/// Content-generation collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ComposeConfig {
    /// Base URL of the content-generation service.
    #[serde(default = "default_compose_url")]
    pub base_url: String,

    /// API key. `None` requires the environment variable override.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_compose_timeout")]
    pub timeout_secs: u64,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            base_url: default_compose_url(),
            api_key: None,
            timeout_secs: default_compose_timeout(),
        }
    }
}

fn default_compose_url() -> String {
    "http://127.0.0.1:8999".to_string()
}

fn default_compose_timeout() -> u64 {
    30
}

/// Telephony provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelephonyConfig {
    /// Base URL of the telephony provider API.
    #[serde(default = "default_telephony_url")]
    pub base_url: String,

    /// API key for the provider.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Webhook URL the provider calls on completion.
    #[serde(default)]
    pub callback_url: Option<String>,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            base_url: default_telephony_url(),
            api_key: None,
            callback_url: None,
        }
    }
}

fn default_telephony_url() -> String {
    "https://api.bland.ai".to_string()
}

/// LinkedIn integrator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LinkedinConfig {
    /// Base URL of the LinkedIn HTTP integrator.
    #[serde(default = "default_linkedin_url")]
    pub base_url: String,

    /// API key for the integrator.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Seconds to wait between sends on the same account.
    #[serde(default = "default_intra_send_delay")]
    pub intra_send_delay_secs: u64,

    /// Daily invitation cap per account, mirroring provider limits.
    #[serde(default = "default_invitation_cap")]
    pub daily_invitation_cap: u32,
}

impl Default for LinkedinConfig {
    fn default() -> Self {
        Self {
            base_url: default_linkedin_url(),
            api_key: None,
            intra_send_delay_secs: default_intra_send_delay(),
            daily_invitation_cap: default_invitation_cap(),
        }
    }
}

fn default_linkedin_url() -> String {
    "https://api.unipile.com".to_string()
}

fn default_intra_send_delay() -> u64 {
    20
}

fn default_invitation_cap() -> u32 {
    80
}

/// Credential vault configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Hex-encoded 32-byte master key. `None` requires the environment
    /// variable override (`CADENCE_VAULT_MASTER_KEY`).
    #[serde(default)]
    pub master_key: Option<String>,
}
