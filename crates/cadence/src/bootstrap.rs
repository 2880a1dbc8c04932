// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring: configuration, logging, and the engine with its production
//! adapters. No process singletons; everything hangs off the returned
//! [`Engine`].

use std::sync::Arc;

use cadence_compose::ComposeClient;
use cadence_config::CadenceConfig;
use cadence_core::CadenceError;
use cadence_engine::Engine;
use cadence_storage::Database;
use cadence_transport::{LinkedinClient, SmtpSender, TelephonyClient};
use cadence_vault::CredentialVault;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber from config and `RUST_LOG`.
pub fn init_logging(config: &CadenceConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.agent.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Build the engine with production adapters.
pub async fn build_engine(config: CadenceConfig) -> Result<Arc<Engine>, CadenceError> {
    let db = Database::open(&config.storage.database_path).await?;

    let master_key = config
        .vault
        .master_key
        .clone()
        .ok_or_else(|| CadenceError::Config("vault.master_key is not configured".to_string()))?;
    let vault = CredentialVault::from_hex_key(&master_key)?;

    let composer = Arc::new(ComposeClient::new(
        config.compose.base_url.clone(),
        config.compose.api_key.as_deref(),
        config.compose.timeout_secs,
    )?);
    let email = Arc::new(SmtpSender::new());
    let call = Arc::new(TelephonyClient::new(
        config.telephony.base_url.clone(),
        config.telephony.callback_url.clone(),
        config.poller.external_timeout_secs,
    )?);
    let linkedin = Arc::new(LinkedinClient::new(
        config.linkedin.base_url.clone(),
        config.linkedin.api_key.as_deref(),
        config.poller.external_timeout_secs,
    )?);

    Ok(Arc::new(Engine::new(
        db, composer, email, call, linkedin, vault, config,
    )))
}
