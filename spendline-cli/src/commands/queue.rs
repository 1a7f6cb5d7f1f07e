//! Queue command - show changes waiting to sync

use std::sync::Arc;

use anyhow::Result;
use spendline_core::services::LoggingService;

use super::{finish, get_context};
use crate::output;

pub fn run(logger: Option<Arc<LoggingService>>, json: bool) -> Result<()> {
    let ctx = get_context(logger)?;
    let result = ctx
        .require_session()
        .and_then(|_| ctx.sync_service.pending());

    finish(result, json, |queue| {
        if queue.is_empty() {
            println!("No changes waiting to sync.");
            return;
        }

        let mut table = output::create_table();
        table.set_header(vec!["#", "Action", "Id", "Title", "Amount"]);
        for (position, action) in queue.iter().enumerate() {
            let (title, amount) = match action.data() {
                Some(expense) => (expense.title.clone(), output::format_amount(expense.amount)),
                None => (String::new(), String::new()),
            };
            table.add_row(vec![
                (position + 1).to_string(),
                action.kind().to_string(),
                output::short_id(&action.id()),
                title,
                amount,
            ]);
        }
        println!("{}", table);
        println!("{} change(s) will replay in this order.", queue.len());
    })
}
