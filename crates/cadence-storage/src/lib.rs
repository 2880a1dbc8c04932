// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Cadence engagement engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed query modules for
//! tenants, leads, campaigns, runs, logs, throttle settings, and the leasing
//! work-queue.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod writer;

pub use database::{iso_after, now_iso, Database};
pub use models::*;
