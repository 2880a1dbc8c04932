// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./cadence.toml` > `~/.config/cadence/cadence.toml`
//! > `/etc/cadence/cadence.toml` with environment variable overrides via
//! `CADENCE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CadenceConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/cadence/cadence.toml` (system-wide)
/// 3. `~/.config/cadence/cadence.toml` (user XDG config)
/// 4. `./cadence.toml` (local directory)
/// 5. `CADENCE_*` environment variables
pub fn load_config() -> Result<CadenceConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CadenceConfig::default()))
        .merge(Toml::file("/etc/cadence/cadence.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("cadence/cadence.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("cadence.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from TOML content only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<CadenceConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CadenceConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CadenceConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CadenceConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `CADENCE_GATEWAY_PUBLIC_BASE_URL` must
/// map to `gateway.public_base_url`, not `gateway.public.base.url`.
fn env_provider() -> Env {
    Env::prefixed("CADENCE_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("poller_", "poller.", 1)
            .replacen("retry_", "retry.", 1)
            .replacen("reminders_", "reminders.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("compose_", "compose.", 1)
            .replacen("telephony_", "telephony.", 1)
            .replacen("linkedin_", "linkedin.", 1)
            .replacen("vault_", "vault.", 1);
        mapped.into()
    })
}
