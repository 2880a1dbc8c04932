// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook ingestor: reconciles asynchronous provider events (replies,
//! bounces, opens, call completions, LinkedIn account state and messages)
//! against stored state, idempotently and with signature verification.

pub mod auth;
pub mod handlers;
pub mod ingest;
pub mod open_detector;
pub mod server;

pub use server::{start_server, GatewayState, ServerConfig};
