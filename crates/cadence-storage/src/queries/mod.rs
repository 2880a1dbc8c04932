// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per entity family.
//!
//! All functions accept `&Database` and run on the single-writer connection.

pub mod campaigns;
pub mod companies;
pub mod leads;
pub mod logs;
pub mod queue;
pub mod runs;
pub mod throttle;

#[cfg(test)]
pub(crate) mod testutil;
