//! Watch command - keep an eye on the session until it expires

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use spendline_core::services::LoggingService;

use super::{cancel_on_interrupt, get_context, report, runtime};
use crate::output;

pub fn run(logger: Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger)?;
    let session = ctx.require_session().map_err(report)?;
    let remaining = ctx.auth_service.remaining()?.unwrap_or_default();

    println!(
        "Watching session for {} (expires in {}, checked every {}s). Press Ctrl+C to stop.",
        session.user.name.bold(),
        output::format_remaining(remaining.as_secs()),
        ctx.watchdog().interval().as_secs()
    );

    let rt = runtime()?;
    let cancel = cancel_on_interrupt(&rt);
    match rt.block_on(ctx.watch_session(&cancel)).map_err(report)? {
        Some(route) => {
            output::warning("Your session has expired. Please log in again.");
            println!("Redirected to {}", route);
        }
        None => println!("Stopped watching."),
    }
    Ok(())
}
