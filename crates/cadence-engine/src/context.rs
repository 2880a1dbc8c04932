// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine context: the wired-together set of adapters and configuration the
//! workers run against. No process singletons; everything is threaded
//! through this struct.

use std::sync::Arc;

use cadence_config::CadenceConfig;
use cadence_core::traits::{CallTransport, ContentComposer, EmailTransport, LinkedinTransport};
use cadence_core::CadenceError;
use cadence_storage::Database;
use cadence_vault::CredentialVault;
use dashmap::DashMap;
use secrecy::SecretString;
use tokio::sync::Mutex;

/// Shared context for the poller, dispatchers, run tracker, and reminder
/// scheduler.
pub struct Engine {
    pub db: Database,
    pub composer: Arc<dyn ContentComposer>,
    pub email_transport: Arc<dyn EmailTransport>,
    pub call_transport: Arc<dyn CallTransport>,
    pub linkedin_transport: Arc<dyn LinkedinTransport>,
    pub vault: CredentialVault,
    pub config: CadenceConfig,
    /// Per-account serialization for the LinkedIn intra-send delay.
    linkedin_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Database,
        composer: Arc<dyn ContentComposer>,
        email_transport: Arc<dyn EmailTransport>,
        call_transport: Arc<dyn CallTransport>,
        linkedin_transport: Arc<dyn LinkedinTransport>,
        vault: CredentialVault,
        config: CadenceConfig,
    ) -> Self {
        Self {
            db,
            composer,
            email_transport,
            call_transport,
            linkedin_transport,
            vault,
            config,
            linkedin_locks: DashMap::new(),
        }
    }

    /// The send lock for a LinkedIn account.
    pub fn linkedin_lock(&self, account_id: &str) -> Arc<Mutex<()>> {
        self.linkedin_locks
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Telephony API key from configuration.
    pub fn telephony_api_key(&self) -> Result<SecretString, CadenceError> {
        self.config
            .telephony
            .api_key
            .clone()
            .map(SecretString::new)
            .ok_or_else(|| CadenceError::Config("telephony.api_key is not configured".to_string()))
    }
}
