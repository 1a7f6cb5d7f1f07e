//! Offline command - toggle offline mode

use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use spendline_core::services::LoggingService;
use spendline_core::SyncStatus;

use super::{get_context, report, sync};
use crate::output;

#[derive(Subcommand)]
pub enum OfflineCommands {
    /// Work offline; changes are queued until you go back online
    #[command(name = "on")]
    On,
    /// Go back online and replay queued changes
    #[command(name = "off")]
    Off,
    /// Show offline mode and pending changes
    Status,
}

pub fn run(logger: Option<Arc<LoggingService>>, command: Option<OfflineCommands>, json: bool) -> Result<()> {
    let mut ctx = get_context(logger)?;
    // Loads the user's queue when someone is logged in
    let logged_in = ctx.restore_session().map_err(report)?.is_some();

    match command {
        Some(OfflineCommands::On) => {
            ctx.set_offline(true).map_err(report)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&ctx.sync_service.snapshot()?)?);
            } else {
                println!("{}", "Offline mode enabled".yellow());
                println!("Changes will be saved locally and synced when you go online.");
            }
            Ok(())
        }
        Some(OfflineCommands::Off) => {
            let status = ctx.set_offline(false).map_err(report)?;
            if !json {
                println!("{}", "Back online".green());
            }
            if logged_in && status == SyncStatus::Syncing {
                sync::drive(&ctx, json)
            } else {
                if json {
                    println!("{}", serde_json::to_string_pretty(&ctx.sync_service.snapshot()?)?);
                }
                Ok(())
            }
        }
        Some(OfflineCommands::Status) | None => {
            let snapshot = ctx.sync_service.snapshot()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
                return Ok(());
            }
            println!(
                "Status: {}",
                output::sync_status_label(snapshot.status, snapshot.is_offline)
            );
            if logged_in {
                println!("Pending changes: {}", snapshot.pending);
            }
            Ok(())
        }
    }
}
