// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The long-running service: per-channel queue pollers, the reminder
//! scheduler, periodic stale-lease reclamation, and the webhook gateway, all
//! under one shutdown token.

use std::sync::Arc;

use cadence_core::{CadenceError, Channel};
use cadence_engine::{poller, reminders, shutdown, Engine};
use cadence_gateway::{GatewayState, ServerConfig};
use tracing::{error, info};

/// Seconds between stale-lease reclamation sweeps.
const RECLAIM_INTERVAL_SECS: u64 = 60;

pub async fn serve(engine: Arc<Engine>) -> Result<(), CadenceError> {
    let token = shutdown::install_signal_handler();

    let mut tasks = Vec::new();
    for channel in [Channel::Email, Channel::Call, Channel::Linkedin] {
        tasks.push(tokio::spawn(poller::run_loop(
            Arc::clone(&engine),
            channel,
            token.clone(),
        )));
    }
    tasks.push(tokio::spawn(reminders::run_loop(
        Arc::clone(&engine),
        token.clone(),
    )));

    // Lease reclamation sweeps recover items from crashed dispatch tasks.
    {
        let engine = Arc::clone(&engine);
        let token = token.clone();
        tasks.push(tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(RECLAIM_INTERVAL_SECS));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(err) = poller::reclaim_stale_leases(&engine).await {
                            error!(error = %err, "stale lease sweep failed");
                        }
                    }
                    _ = token.cancelled() => return,
                }
            }
        }));
    }

    let gateway_state = GatewayState {
        db: engine.db.clone(),
        linkedin_secret: engine.config.gateway.linkedin_webhook_secret.clone(),
        telephony_secret: engine.config.gateway.telephony_webhook_secret.clone(),
    };
    let server_config = ServerConfig {
        host: engine.config.gateway.host.clone(),
        port: engine.config.gateway.port,
    };

    info!("cadence serving");
    let gateway_result = cadence_gateway::start_server(&server_config, gateway_state, token.clone()).await;

    // The gateway returning (shutdown or bind failure) stops the workers too.
    token.cancel();
    for task in tasks {
        let _ = task.await;
    }
    info!("cadence stopped");
    gateway_result
}
