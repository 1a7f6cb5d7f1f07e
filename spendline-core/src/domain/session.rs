//! Session domain model

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::user::UserProfile;

/// Sessions expire this long after login
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// How often the watchdog compares the session age against the timeout
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Authenticated-user context as stored under the `session` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: UserProfile,
    /// Unix timestamp in milliseconds
    pub session_start_time: i64,
}

impl Session {
    pub fn new(user: UserProfile, now_ms: i64) -> Self {
        Self {
            user,
            session_start_time: now_ms,
        }
    }

    /// Milliseconds since login (never negative)
    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.session_start_time).max(0)
    }

    pub fn is_expired(&self, now_ms: i64, timeout: Duration) -> bool {
        self.elapsed_ms(now_ms) >= timeout_ms(timeout)
    }

    /// Time left before expiry, zero once expired
    pub fn remaining(&self, now_ms: i64, timeout: Duration) -> Duration {
        let left = timeout_ms(timeout).saturating_sub(self.elapsed_ms(now_ms));
        Duration::from_millis(left.max(0) as u64)
    }
}

fn timeout_ms(timeout: Duration) -> i64 {
    i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX)
}

/// Outcome of restoring the persisted session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCheck {
    Active(Session),
    Expired,
    Missing,
}
