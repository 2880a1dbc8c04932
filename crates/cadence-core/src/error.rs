// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Cadence engagement engine.

use thiserror::Error;

/// The primary error type used across all Cadence crates.
#[derive(Debug, Error)]
pub enum CadenceError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transient transport failures (connection reset, 5xx, timeout mid-send).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Provider rate limit or quota hit; retried at the next window, not
    /// counted against the item's retry budget.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Credential failures (bad SMTP password, disconnected LinkedIn account).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Permanent delivery failures (hard bounce, invalid number, missing profile).
    #[error("permanent delivery failure: {0}")]
    PermanentDelivery(String),

    /// Referential problems (missing campaign/lead/product for a queue item).
    #[error("data integrity: {0}")]
    DataIntegrity(String),

    /// Content generation failures after the composer's inline retries.
    #[error("compose error: {message}")]
    Compose {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Credential vault errors (seal/open failure, corrupted ciphertext).
    #[error("vault error: {0}")]
    Vault(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Disposition of a dispatch failure, used by the retry manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retry with exponential backoff until `max_retries`.
    Transient,
    /// Requeue at the next throttle window start; retry budget untouched.
    RateLimited,
    /// Terminal; pause the channel for the tenant.
    Auth,
    /// Terminal; mark the lead's contact as bad.
    Permanent,
    /// Terminal; diagnostic only.
    DataIntegrity,
}

impl CadenceError {
    /// Classify this error for retry disposition.
    ///
    /// Compose errors are treated as transient: the composer already applied
    /// its own inline retries, so the remaining budget is the queue item's.
    pub fn classify(&self) -> ErrorClass {
        match self {
            CadenceError::Transport { .. }
            | CadenceError::Compose { .. }
            | CadenceError::Timeout { .. }
            | CadenceError::Storage { .. }
            | CadenceError::Internal(_) => ErrorClass::Transient,
            CadenceError::RateLimited(_) => ErrorClass::RateLimited,
            CadenceError::Auth(_) | CadenceError::Vault(_) => ErrorClass::Auth,
            CadenceError::PermanentDelivery(_) => ErrorClass::Permanent,
            CadenceError::DataIntegrity(_) | CadenceError::Config(_) => ErrorClass::DataIntegrity,
        }
    }
}
