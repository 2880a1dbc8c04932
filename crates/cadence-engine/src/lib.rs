// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign execution engine: rate-limit oracle, queue poller, channel
//! dispatchers, retry policy, campaign-run tracker, and reminder scheduler.
//!
//! All workers operate against one [`Engine`] context; the database is the
//! sole shared state and every worker is cancellation-aware.

pub mod context;
pub mod dispatch;
pub mod poller;
pub mod reminders;
pub mod retry;
pub mod runs;
pub mod shutdown;
pub mod throttle;

pub use context::Engine;
