//! Expense commands - add, edit, delete, list, categories

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, NaiveDate, Utc};
use colored::Colorize;
use dialoguer::{Confirm, Select};
use spendline_core::services::{LoggingService, Mutation};
use spendline_core::{Category, ExpenseDraft, ExpenseFilter, SpendlineContext};
use uuid::Uuid;

use super::{cancel_on_interrupt, finish, get_context, report, runtime};
use crate::output;

/// Fields shared by `add` and `edit`
pub struct ExpenseArgs {
    pub title: Option<String>,
    pub amount: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
}

/// Accept `YYYY-MM-DD` or a full RFC 3339 timestamp
fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(day) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| anyhow!("Invalid date '{}'. Use YYYY-MM-DD.", input))
}

fn prompt_category() -> Result<Option<String>> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
    let picked = Select::new()
        .with_prompt("Category")
        .items(&labels)
        .default(0)
        .interact_opt()?;
    Ok(picked.map(|i| labels[i].to_string()))
}

/// Full UUID, or a prefix that matches exactly one visible or queued expense
fn resolve_id(ctx: &SpendlineContext, input: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(input) {
        return Ok(id);
    }

    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        bail!("Expense id is required");
    }

    let (stored, _) = ctx.list_expenses(&ExpenseFilter::default()).map_err(report)?;
    let mut candidates: BTreeSet<Uuid> = stored.iter().map(|e| e.id).collect();
    candidates.extend(ctx.sync_service.pending()?.iter().map(|a| a.id()));

    let matches: Vec<Uuid> = candidates
        .into_iter()
        .filter(|id| id.to_string().starts_with(&needle))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("No expense matches '{}'", input),
        _ => bail!("'{}' matches {} expenses; use more characters", input, matches.len()),
    }
}

fn print_mutation(mutation: &Mutation) {
    if mutation.is_queued() {
        output::warning(mutation.headline());
    } else {
        output::success(mutation.headline());
    }
    println!(
        "  {} {} ({}, {})",
        output::short_id(&mutation.expense.id).dimmed(),
        mutation.expense.title,
        output::format_amount(mutation.expense.amount),
        mutation.expense.category
    );
    println!("  {}", mutation.detail().dimmed());
}

fn submit(ctx: &SpendlineContext, id: Option<Uuid>, draft: ExpenseDraft, json: bool) -> Result<()> {
    let rt = runtime()?;
    let cancel = cancel_on_interrupt(&rt);
    let pb = (!json).then(|| output::spinner("Saving..."));
    let result = rt.block_on(ctx.submit_expense(id, draft, &cancel));
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    finish(result, json, |mutation| print_mutation(&mutation))
}

pub fn run_add(logger: Option<Arc<LoggingService>>, args: ExpenseArgs, json: bool) -> Result<()> {
    let ctx = get_context(logger)?;
    ctx.require_session().map_err(report)?;

    let category = match args.category {
        Some(c) => Some(c),
        None if !json => prompt_category()?,
        None => None,
    };
    let date = args.date.as_deref().map(parse_date).transpose()?;

    let draft = ExpenseDraft {
        title: args.title.unwrap_or_default(),
        amount: args.amount.unwrap_or_default(),
        category,
        date,
    };
    submit(&ctx, None, draft, json)
}

pub fn run_edit(
    logger: Option<Arc<LoggingService>>,
    id: &str,
    args: ExpenseArgs,
    json: bool,
) -> Result<()> {
    let ctx = get_context(logger)?;
    ctx.require_session().map_err(report)?;
    let id = resolve_id(&ctx, id)?;

    let existing = ctx
        .find_expense(id)
        .map_err(report)?
        .ok_or_else(|| anyhow!("Expense {} not found", output::short_id(&id)))?;

    // Unspecified fields keep their current values
    let mut draft = ExpenseDraft::from_expense(&existing);
    if let Some(title) = args.title {
        draft.title = title;
    }
    if let Some(amount) = args.amount {
        draft.amount = amount;
    }
    if let Some(category) = args.category {
        draft.category = Some(category);
    }
    if let Some(date) = args.date.as_deref() {
        draft.date = Some(parse_date(date)?);
    }

    submit(&ctx, Some(id), draft, json)
}

pub fn run_delete(
    logger: Option<Arc<LoggingService>>,
    id: &str,
    force: bool,
    json: bool,
) -> Result<()> {
    let ctx = get_context(logger)?;
    ctx.require_session().map_err(report)?;
    let id = resolve_id(&ctx, id)?;

    if !force && !json {
        let title = ctx
            .find_expense(id)
            .map_err(report)?
            .map(|e| e.title)
            .unwrap_or_else(|| output::short_id(&id));
        if !Confirm::new()
            .with_prompt(format!("Delete '{}'?", title))
            .default(false)
            .interact()?
        {
            println!("Cancelled.");
            return Ok(());
        }
    }

    finish(ctx.delete_expense(id), json, |mutation| print_mutation(&mutation))
}

pub fn run_list(
    logger: Option<Arc<LoggingService>>,
    search: Option<String>,
    category: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context(logger)?;
    let category = category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()
        .map_err(report)?;
    let filter = ExpenseFilter { search, category };

    let result = ctx.list_expenses(&filter);
    if json {
        return finish(
            result.map(|(expenses, summary)| {
                serde_json::json!({
                    "expenses": expenses,
                    "count": summary.count,
                    "total": summary.total,
                })
            }),
            true,
            |_| {},
        );
    }

    let (expenses, summary) = result.map_err(report)?;
    let pending = ctx.sync_service.pending()?.len();
    if expenses.is_empty() {
        println!("No expenses found.");
    } else {
        let mut table = output::create_table();
        table.set_header(vec!["Id", "Date", "Title", "Category", "Amount"]);
        for expense in &expenses {
            table.add_row(vec![
                output::short_id(&expense.id),
                output::format_date(&expense.date),
                expense.title.clone(),
                expense.category.to_string(),
                output::format_amount(expense.amount),
            ]);
        }
        println!("{}", table);
        println!(
            "{} expense(s), total {}",
            summary.count,
            output::format_amount(summary.total).bold()
        );
        if summary.by_category.len() > 1 {
            for (category, total) in &summary.by_category {
                println!("  {:<16} {}", category.label(), output::format_amount(*total));
            }
        }
    }

    if pending > 0 {
        output::warning(&format!(
            "{} change(s) waiting to sync are not shown. See `sl queue`.",
            pending
        ));
    }
    Ok(())
}

pub fn run_categories(json: bool) -> Result<()> {
    if json {
        let categories: Vec<_> = Category::ALL
            .iter()
            .map(|c| serde_json::json!({"label": c.label(), "slug": c.slug()}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&categories)?);
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Category", "Short name"]);
    for category in Category::ALL.iter() {
        table.add_row(vec![category.label(), category.slug()]);
    }
    println!("{}", table);
    Ok(())
}
