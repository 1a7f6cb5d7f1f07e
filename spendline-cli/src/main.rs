//! Spendline CLI - expense tracking in your terminal

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::expense::ExpenseArgs;
use commands::{auth, expense, get_logger, log_event, logs, offline, queue, status, sync, watch};
use spendline_core::services::{EntryPoint, LogEvent, LoggingService};

/// Spendline - expense tracking in your terminal
#[derive(Parser)]
#[command(name = "sl", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Email address
        #[arg(long)]
        email: Option<String>,
        /// Password (prompted, or SPENDLINE_PASSWORD, when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Log in and start a session
    Login {
        /// Email address
        email: Option<String>,
        /// Password (prompted, or SPENDLINE_PASSWORD, when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// End the current session
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show session, expense and sync status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a new expense
    Add {
        /// What the money was spent on
        title: String,
        /// Positive amount, e.g. 4.50
        amount: String,
        /// Category label or short name (see `sl categories`)
        #[arg(short, long)]
        category: Option<String>,
        /// Date (YYYY-MM-DD), defaults to now
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change an existing expense
    Edit {
        /// Expense id or unique id prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete an expense
    Delete {
        /// Expense id or unique id prefix
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List expenses
    List {
        /// Case-insensitive title search
        #[arg(short, long)]
        search: Option<String>,
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List expense categories
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage offline mode
    Offline {
        #[command(subcommand)]
        command: Option<offline::OfflineCommands>,
        /// Output as JSON
        #[arg(long, global = true)]
        json: bool,
    },

    /// Replay changes recorded while offline
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show changes waiting to sync
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Watch the session and log out when it expires
    Watch,

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Signup { .. } => "signup",
            Commands::Login { .. } => "login",
            Commands::Logout { .. } => "logout",
            Commands::Status { .. } => "status",
            Commands::Add { .. } => "add",
            Commands::Edit { .. } => "edit",
            Commands::Delete { .. } => "delete",
            Commands::List { .. } => "list",
            Commands::Categories { .. } => "categories",
            Commands::Offline { .. } => "offline",
            Commands::Sync { .. } => "sync",
            Commands::Queue { .. } => "queue",
            Commands::Watch => "watch",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let name = cli.command.name();
    let entry_point = match cli.command {
        Commands::Watch => EntryPoint::Watch,
        _ => EntryPoint::Cli,
    };

    // Commands that never touch user data stay out of the log
    let logger = match cli.command {
        Commands::Logs { .. } | Commands::Categories { .. } => None,
        _ => get_logger(entry_point),
    };
    log_event(&logger, LogEvent::new("command_executed").with_command(name));

    let result = dispatch(cli.command, logger.clone());
    if let Err(e) = &result {
        let mut event = LogEvent::new("command_failed")
            .with_command(name)
            .with_error(e.to_string());
        if e.chain().count() > 1 {
            event = event.with_error_details(format!("{:#}", e));
        }
        log_event(&logger, event);
    }
    result
}

fn dispatch(command: Commands, logger: Option<Arc<LoggingService>>) -> Result<()> {
    match command {
        Commands::Signup { name, email, password, json } => {
            auth::run_signup(logger, name, email, password, json)
        }
        Commands::Login { email, password, json } => auth::run_login(logger, email, password, json),
        Commands::Logout { json } => auth::run_logout(logger, json),
        Commands::Status { json } => status::run(logger, json),
        Commands::Add { title, amount, category, date, json } => expense::run_add(
            logger,
            ExpenseArgs {
                title: Some(title),
                amount: Some(amount),
                category,
                date,
            },
            json,
        ),
        Commands::Edit { id, title, amount, category, date, json } => expense::run_edit(
            logger,
            &id,
            ExpenseArgs {
                title,
                amount,
                category,
                date,
            },
            json,
        ),
        Commands::Delete { id, force, json } => expense::run_delete(logger, &id, force, json),
        Commands::List { search, category, json } => expense::run_list(logger, search, category, json),
        Commands::Categories { json } => expense::run_categories(json),
        Commands::Offline { command, json } => offline::run(logger, command, json),
        Commands::Sync { json } => sync::run(logger, json),
        Commands::Queue { json } => queue::run(logger, json),
        Commands::Watch => watch::run(logger),
        Commands::Logs { command } => logs::run(command),
    }
}
