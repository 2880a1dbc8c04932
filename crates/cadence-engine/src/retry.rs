// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry and backoff policy.
//!
//! Transient failures reschedule at `now + base * 2^retry_count` (the count
//! before increment), bounded by `max_retries`. Rate-limit hits reschedule at
//! the next window start without touching the retry budget.

use cadence_config::model::RetryConfig;
use cadence_core::{Channel, ErrorClass};
use chrono::{DateTime, Duration, Timelike, Utc};

/// What the dispatcher should do with a failed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Requeue with backoff; `retry_count` is the new count to store.
    Retry { delay: Duration, retry_count: u32 },
    /// Requeue at the next throttle window; retry budget untouched.
    Reschedule { delay: Duration },
    /// Terminal failure.
    Fail,
}

/// Backoff base for a channel.
pub fn backoff_base(channel: Channel, cfg: &RetryConfig) -> Duration {
    match channel {
        Channel::Email => Duration::seconds(cfg.email_backoff_base_secs as i64),
        Channel::Call | Channel::Linkedin => Duration::seconds(cfg.backoff_base_secs as i64),
    }
}

/// Exponential backoff delay: `base * 2^retry_count`, where `retry_count` is
/// the number of failures so far (before this one).
pub fn backoff_delay(base: Duration, retry_count: u32) -> Duration {
    // Cap the shift so pathological retry counts cannot overflow.
    let factor = 2i64.saturating_pow(retry_count.min(16));
    base * factor as i32
}

/// Decide the disposition of a dispatch failure.
pub fn disposition(
    class: ErrorClass,
    channel: Channel,
    retry_count: u32,
    max_retries: u32,
    cfg: &RetryConfig,
    now: DateTime<Utc>,
) -> Disposition {
    match class {
        ErrorClass::Transient => {
            let next_count = retry_count + 1;
            if next_count >= max_retries {
                Disposition::Fail
            } else {
                Disposition::Retry {
                    delay: backoff_delay(backoff_base(channel, cfg), retry_count),
                    retry_count: next_count,
                }
            }
        }
        ErrorClass::RateLimited => Disposition::Reschedule {
            delay: until_next_hour(now),
        },
        ErrorClass::Auth | ErrorClass::Permanent | ErrorClass::DataIntegrity => Disposition::Fail,
    }
}

/// Time until the next top of the hour.
pub fn until_next_hour(now: DateTime<Utc>) -> Duration {
    let seconds_into_hour = i64::from(now.minute()) * 60 + i64::from(now.second());
    Duration::seconds(3600 - seconds_into_hour)
}

/// Time until the next local midnight for a tenant's fixed UTC offset.
/// Used when a provider's daily cap is hit.
pub fn until_next_day_start(now: DateTime<Utc>, utc_offset_minutes: i32) -> Duration {
    let local = now + Duration::minutes(i64::from(utc_offset_minutes));
    let seconds_into_day = i64::from(local.num_seconds_from_midnight());
    Duration::seconds(24 * 3600 - seconds_into_day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cfg() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            backoff_base_secs: 60,
            email_backoff_base_secs: 120,
        }
    }

    #[test]
    fn email_backoff_doubles_from_two_minutes() {
        let base = backoff_base(Channel::Email, &cfg());
        assert_eq!(backoff_delay(base, 0), Duration::minutes(2));
        assert_eq!(backoff_delay(base, 1), Duration::minutes(4));
        assert_eq!(backoff_delay(base, 2), Duration::minutes(8));
    }

    #[test]
    fn call_backoff_doubles_from_one_minute() {
        let base = backoff_base(Channel::Call, &cfg());
        assert_eq!(backoff_delay(base, 0), Duration::minutes(1));
        assert_eq!(backoff_delay(base, 2), Duration::minutes(4));
    }

    #[test]
    fn transient_retries_until_budget_exhausted() {
        let now = Utc::now();
        let first = disposition(ErrorClass::Transient, Channel::Email, 0, 3, &cfg(), now);
        assert_eq!(
            first,
            Disposition::Retry {
                delay: Duration::minutes(2),
                retry_count: 1
            }
        );
        let last = disposition(ErrorClass::Transient, Channel::Email, 2, 3, &cfg(), now);
        assert_eq!(last, Disposition::Fail);
    }

    #[test]
    fn rate_limit_reschedules_without_consuming_budget() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 45, 0).unwrap();
        let d = disposition(ErrorClass::RateLimited, Channel::Email, 2, 3, &cfg(), now);
        assert_eq!(
            d,
            Disposition::Reschedule {
                delay: Duration::minutes(15)
            }
        );
    }

    #[test]
    fn terminal_classes_fail_immediately() {
        let now = Utc::now();
        for class in [ErrorClass::Auth, ErrorClass::Permanent, ErrorClass::DataIntegrity] {
            assert_eq!(
                disposition(class, Channel::Call, 0, 3, &cfg(), now),
                Disposition::Fail
            );
        }
    }

    #[test]
    fn next_day_start_respects_tenant_offset() {
        // 23:00 UTC at +120 offset is 01:00 local: 23h to next local midnight.
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 23, 0, 0).unwrap();
        assert_eq!(until_next_day_start(now, 120), Duration::hours(23));
        // Same instant at UTC: 1h to midnight.
        assert_eq!(until_next_day_start(now, 0), Duration::hours(1));
    }

    #[test]
    fn pathological_retry_count_does_not_overflow() {
        let base = Duration::seconds(60);
        let delay = backoff_delay(base, u32::MAX);
        assert!(delay > Duration::zero());
    }
}
