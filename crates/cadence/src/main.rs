// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cadence - a multi-tenant outbound sales engagement engine.
//!
//! This is the binary entry point: `serve` runs the pollers, reminder
//! scheduler, and webhook gateway; the remaining subcommands are one-shot
//! operational tools.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod bootstrap;
mod ops;
mod serve;

use std::process::ExitCode;

use cadence_core::Channel;
use clap::{Parser, Subcommand};
use tracing::error;

/// Cadence - multi-tenant outbound sales engagement engine.
#[derive(Parser, Debug)]
#[command(name = "cadence", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pollers, reminder scheduler, and webhook gateway.
    Serve,
    /// Start a campaign run: enumerate eligible leads and enqueue work.
    RunCampaign {
        /// Campaign id to run.
        campaign_id: String,
    },
    /// Cancel a campaign run.
    CancelRun {
        /// Run id to cancel.
        run_id: String,
    },
    /// Print a run's progress report as JSON.
    GetRun {
        /// Run id to report on.
        run_id: String,
    },
    /// Create or replace a tenant's throttle settings for a channel.
    SetThrottle {
        company_id: String,
        channel: Channel,
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        enabled: bool,
        #[arg(long, default_value_t = 300)]
        max_per_hour: i64,
        #[arg(long, default_value_t = 300)]
        max_per_day: i64,
        /// Local "HH:MM" start of the work window.
        #[arg(long)]
        work_window_start: Option<String>,
        /// Local "HH:MM" end of the work window (may wrap midnight).
        #[arg(long)]
        work_window_end: Option<String>,
        /// Apply the work window to email as well as calls.
        #[arg(long, default_value_t = false)]
        enforce_work_window: bool,
    },
    /// One poll pass over the queues.
    ProcessQueues {
        /// Restrict to one channel.
        #[arg(long)]
        channel: Option<Channel>,
    },
    /// One reminder scheduler pass.
    SendReminders,
    /// Scan tenant inboxes for bounce notifications.
    ProcessBounces,
    /// Scan tenant inboxes for replies to outreach.
    ProcessInboundEmail,
    /// Return expired processing leases to pending.
    ReclaimStaleLeases,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cadence_config::load_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };
    bootstrap::init_logging(&config);

    let engine = match bootstrap::build_engine(config).await {
        Ok(engine) => engine,
        Err(err) => {
            error!(error = %err, "failed to start");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Serve => serve::serve(engine).await,
        Commands::RunCampaign { campaign_id } => ops::run_campaign(&engine, &campaign_id).await,
        Commands::CancelRun { run_id } => ops::cancel_run(&engine, &run_id).await,
        Commands::GetRun { run_id } => ops::get_run(&engine, &run_id).await,
        Commands::SetThrottle {
            company_id,
            channel,
            enabled,
            max_per_hour,
            max_per_day,
            work_window_start,
            work_window_end,
            enforce_work_window,
        } => {
            ops::set_throttle(
                &engine,
                ops::ThrottleArgs {
                    company_id,
                    channel,
                    enabled,
                    max_per_hour,
                    max_per_day,
                    work_window_start,
                    work_window_end,
                    enforce_work_window,
                },
            )
            .await
        }
        Commands::ProcessQueues { channel } => ops::process_queues(&engine, channel).await,
        Commands::SendReminders => ops::send_reminders(&engine).await,
        Commands::ProcessBounces => ops::process_bounces(&engine).await,
        Commands::ProcessInboundEmail => ops::process_inbound_email(&engine).await,
        Commands::ReclaimStaleLeases => ops::reclaim_stale_leases(&engine).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}
