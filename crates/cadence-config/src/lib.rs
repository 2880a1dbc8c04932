// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration for the Cadence engine.
//!
//! TOML files merged in XDG order with `CADENCE_*` environment overrides,
//! strict key checking via `deny_unknown_fields`.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::CadenceConfig;
