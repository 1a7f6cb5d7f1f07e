//! CLI command implementations

pub mod auth;
pub mod expense;
pub mod logs;
pub mod offline;
pub mod queue;
pub mod status;
pub mod sync;
pub mod watch;

use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::output;
use spendline_core::services::{EntryPoint, LogEvent, LoggingService};
use spendline_core::{Error, OperationResult, SpendlineContext};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger(entry_point: EntryPoint) -> Option<Arc<LoggingService>> {
    let data_dir = get_spendline_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, entry_point, env!("CARGO_PKG_VERSION"))
        .ok()
        .map(Arc::new)
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<Arc<LoggingService>>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Data directory from SPENDLINE_DIR, else ~/.spendline
pub fn get_spendline_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SPENDLINE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".spendline"))
        .ok_or_else(|| anyhow!("Could not find home directory; set SPENDLINE_DIR"))
}

/// Open the context, attaching the event log when it is available
pub fn get_context(logger: Option<Arc<LoggingService>>) -> Result<SpendlineContext> {
    let data_dir = get_spendline_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create spendline directory: {:?}", data_dir))?;

    let ctx = SpendlineContext::new(&data_dir).context("Failed to initialize spendline context")?;
    Ok(match logger {
        Some(logger) => ctx.with_logger(logger),
        None => ctx,
    })
}

pub fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

/// Token that fires on Ctrl+C while `rt` is driving a future
pub fn cancel_on_interrupt(rt: &Runtime) -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    rt.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    cancel
}

/// Turn a core error into what the user sees
pub fn report(err: Error) -> anyhow::Error {
    match err {
        Error::InvalidFields(fields) => {
            output::field_errors(&fields);
            anyhow!("Please correct the highlighted fields")
        }
        Error::SessionExpired => anyhow!("Your session has expired. Run `sl login` to continue."),
        Error::Unauthenticated => anyhow!("Not logged in. Run `sl login` first."),
        other => other.into(),
    }
}

/// Print `result` as JSON or hand it to `render`; a failed JSON result
/// exits non-zero after printing
pub fn finish<T: Serialize>(
    result: spendline_core::Result<T>,
    json: bool,
    render: impl FnOnce(T),
) -> Result<()> {
    if json {
        let out = OperationResult::from(result);
        println!("{}", serde_json::to_string_pretty(&out)?);
        if !out.success {
            exit(1);
        }
        return Ok(());
    }
    match result {
        Ok(value) => {
            render(value);
            Ok(())
        }
        Err(e) => Err(report(e)),
    }
}
