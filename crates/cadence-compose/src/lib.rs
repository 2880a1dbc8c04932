// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the content-generation collaborator.
//!
//! The engine depends on `cadence_core::ContentComposer`; this crate provides
//! the production implementation with authentication and bounded inline retry.

pub mod client;
pub mod types;

pub use client::ComposeClient;
