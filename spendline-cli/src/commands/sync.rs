//! Sync command - replay changes recorded while offline

use std::sync::Arc;

use anyhow::{bail, Result};
use colored::Colorize;
use spendline_core::services::LoggingService;
use spendline_core::SpendlineContext;

use super::{cancel_on_interrupt, finish, get_context, report, runtime};
use crate::output;

/// Run one sync cycle with a spinner while the replay is pending
pub fn drive(ctx: &SpendlineContext, json: bool) -> Result<()> {
    let pending = ctx.sync_service.pending()?.len();

    let rt = runtime()?;
    let cancel = cancel_on_interrupt(&rt);
    let pb = (!json && pending > 0)
        .then(|| output::spinner(&format!("Syncing {} change(s)...", pending)));
    let result = rt.block_on(ctx.sync(&cancel));
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    finish(result, json, |report| match report {
        Some(report) => {
            output::success("All changes synced");
            println!("  Applied: {}", report.applied);
            if report.skipped > 0 {
                println!(
                    "  Skipped: {} {}",
                    report.skipped,
                    "(expense no longer exists)".dimmed()
                );
            }
        }
        None => println!("Nothing to sync."),
    })
}

pub fn run(logger: Option<Arc<LoggingService>>, json: bool) -> Result<()> {
    let ctx = get_context(logger)?;
    ctx.require_session().map_err(report)?;

    if ctx.sync_service.is_offline()? {
        bail!("You are offline. Run `sl offline off` to sync.");
    }

    ctx.retry_sync().map_err(report)?;
    drive(&ctx, json)
}
