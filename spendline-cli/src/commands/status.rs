//! Status command - session, expenses and sync at a glance

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use spendline_core::services::LoggingService;

use super::{get_context, report};
use crate::output;

pub fn run(logger: Option<Arc<LoggingService>>, json: bool) -> Result<()> {
    let ctx = get_context(logger)?;
    ctx.restore_session().map_err(report)?;
    let status = ctx.status_service.get_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Spendline Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    match &status.user {
        Some(user) => {
            table.add_row(vec!["User".to_string(), format!("{} <{}>", user.name, user.email)]);
            if let Some(secs) = status.session_remaining_secs {
                table.add_row(vec!["Session expires in".to_string(), output::format_remaining(secs)]);
            }
            table.add_row(vec!["Expenses".to_string(), status.expense_count.to_string()]);
            table.add_row(vec!["Total".to_string(), output::format_amount(status.total_amount)]);
            table.add_row(vec!["Pending changes".to_string(), status.pending_changes.to_string()]);
        }
        None => {
            table.add_row(vec!["User".to_string(), "Not logged in".dimmed().to_string()]);
        }
    }
    table.add_row(vec![
        "Connection".to_string(),
        output::sync_status_label(status.sync_status, status.offline),
    ]);

    println!("{}", table);
    Ok(())
}
