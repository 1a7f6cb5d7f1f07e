//! Cancellable waits standing in for network round trips

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::domain::result::{Error, Result};

/// Sleep for `duration` unless `cancel` fires first
pub async fn simulate_latency(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
