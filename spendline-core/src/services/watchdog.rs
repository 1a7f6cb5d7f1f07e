//! Session watchdog - periodic expiry check that forces logout

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::auth::AuthService;
use crate::domain::result::Result;
use crate::domain::{Route, SessionCheck};

/// Result of a single check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum WatchdogVerdict {
    Active { remaining_secs: u64 },
    /// The session ran out on this check and was removed
    Expired,
    /// There was no session to watch
    LoggedOut,
}

pub struct SessionWatchdog {
    auth: Arc<AuthService>,
    interval: Duration,
}

impl SessionWatchdog {
    pub fn new(auth: Arc<AuthService>, interval: Duration) -> Self {
        Self { auth, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn check(&self) -> Result<WatchdogVerdict> {
        Ok(match self.auth.check_session()? {
            SessionCheck::Active(_) => {
                let remaining = self.auth.remaining()?.unwrap_or_default();
                WatchdogVerdict::Active {
                    remaining_secs: remaining.as_secs(),
                }
            }
            SessionCheck::Expired => WatchdogVerdict::Expired,
            SessionCheck::Missing => WatchdogVerdict::LoggedOut,
        })
    }

    /// Check immediately, then once per interval, until the session is gone.
    ///
    /// Returns the route to redirect to, or `None` when cancelled while the
    /// session was still active.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<Option<Route>> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = ticker.tick() => {
                    match self.check()? {
                        WatchdogVerdict::Active { .. } => continue,
                        WatchdogVerdict::Expired | WatchdogVerdict::LoggedOut => {
                            return Ok(Some(Route::Login));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::{LoginForm, SignupForm, DEFAULT_CHECK_INTERVAL, DEFAULT_SESSION_TIMEOUT};
    use crate::ports::{Clock, KeyValueStore, ManualClock};
    use tokio::time::Instant;

    /// Wall time that follows tokio's paused clock
    struct TokioClock {
        base_ms: i64,
        start: Instant,
    }

    impl Clock for TokioClock {
        fn now_ms(&self) -> i64 {
            self.base_ms + self.start.elapsed().as_millis() as i64
        }
    }

    fn logged_in(clock: Arc<dyn Clock>) -> (Arc<AuthService>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let auth = Arc::new(AuthService::new(store.clone(), clock, DEFAULT_SESSION_TIMEOUT));
        auth.signup(&SignupForm {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "secret".to_string(),
            confirm_password: "secret".to_string(),
        })
        .unwrap();
        auth.login(&LoginForm::new("ada@example.com", "secret")).unwrap();
        (auth, store)
    }

    #[test]
    fn test_check_reports_remaining_then_expires() {
        let clock = Arc::new(ManualClock::new(0));
        let (auth, store) = logged_in(clock.clone());
        let watchdog = SessionWatchdog::new(auth.clone(), DEFAULT_CHECK_INTERVAL);

        clock.advance(Duration::from_secs(60));
        assert_eq!(
            watchdog.check().unwrap(),
            WatchdogVerdict::Active { remaining_secs: 540 }
        );

        clock.advance(Duration::from_secs(540));
        assert_eq!(watchdog.check().unwrap(), WatchdogVerdict::Expired);
        assert!(!auth.is_authenticated());
        assert!(store.get_item("session").unwrap().is_none());

        assert_eq!(watchdog.check().unwrap(), WatchdogVerdict::LoggedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_forces_logout_at_timeout() {
        let clock = Arc::new(TokioClock {
            base_ms: 1_700_000_000_000,
            start: Instant::now(),
        });
        let (auth, _) = logged_in(clock);
        let watchdog = SessionWatchdog::new(auth.clone(), DEFAULT_CHECK_INTERVAL);

        let start = Instant::now();
        let route = watchdog.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(route, Some(Route::Login));
        assert!(start.elapsed() >= DEFAULT_SESSION_TIMEOUT);
        assert!(start.elapsed() < DEFAULT_SESSION_TIMEOUT + DEFAULT_CHECK_INTERVAL);
        assert!(!auth.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_cancel() {
        let clock = Arc::new(TokioClock {
            base_ms: 0,
            start: Instant::now(),
        });
        let (auth, _) = logged_in(clock);
        let watchdog = SessionWatchdog::new(auth.clone(), DEFAULT_CHECK_INTERVAL);

        let cancel = CancellationToken::new();
        let child = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(90)).await;
            child.cancel();
        });

        assert_eq!(watchdog.run(&cancel).await.unwrap(), None);
        assert!(auth.is_authenticated());
    }
}
