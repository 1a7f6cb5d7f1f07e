//! Spendline Core - business logic for a personal expense tracker
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (User, Session, Expense, SyncAction, ...)
//! - **ports**: Trait definitions for external dependencies (KeyValueStore, Clock)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB, in-memory)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use adapters::duckdb::DuckDbStore;
use config::Config;
use ports::{Clock, KeyValueStore, SystemClock};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, FieldErrors, OperationResult, Result};
pub use domain::{
    Category, Expense, ExpenseDraft, ExpenseFilter, ExpenseSummary, LoginForm, Route, Session,
    SessionCheck, SignupForm, SyncAction, SyncStatus, User, UserProfile,
};

/// Main context for Spendline operations
///
/// Owns the store, configuration and every service; front ends hold one of
/// these instead of reaching for global state.
pub struct SpendlineContext {
    pub config: Config,
    data_dir: Option<PathBuf>,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
    pub auth_service: Arc<AuthService>,
    pub expense_service: Arc<ExpenseService>,
    pub sync_service: Arc<SyncService>,
    pub tracker_service: TrackerService,
    pub status_service: StatusService,
    logger: Option<Arc<LoggingService>>,
}

impl SpendlineContext {
    /// Open the DuckDB-backed context in `data_dir`
    pub fn new(data_dir: &Path) -> anyhow::Result<Self> {
        let config = Config::load(data_dir)?;

        let store = DuckDbStore::new(&data_dir.join("spendline.duckdb"))?;
        store.ensure_schema()?;

        let mut ctx = Self::with_store(config, Arc::new(store), Arc::new(SystemClock));
        ctx.data_dir = Some(data_dir.to_path_buf());
        Ok(ctx)
    }

    /// Build a context over any store and clock; nothing is written to disk
    /// besides what the store itself persists
    pub fn with_store(config: Config, store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let auth_service = Arc::new(AuthService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            config.session_timeout,
        ));
        let expense_service = Arc::new(ExpenseService::new(Arc::clone(&store)));
        let sync_service = Arc::new(
            SyncService::new(Arc::clone(&store), config.offline_mode)
                .with_delays(config.replay_delay, config.synced_display),
        );
        let tracker_service = TrackerService::new(
            Arc::clone(&expense_service),
            Arc::clone(&sync_service),
            Arc::clone(&clock),
        );
        let status_service = StatusService::new(
            Arc::clone(&auth_service),
            Arc::clone(&expense_service),
            Arc::clone(&sync_service),
        );

        Self {
            config,
            data_dir: None,
            store,
            clock,
            auth_service,
            expense_service,
            sync_service,
            tracker_service,
            status_service,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    fn log(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(event);
        }
    }

    fn unload_user(&self) -> Result<()> {
        self.expense_service.unload()?;
        self.sync_service.unload()
    }

    /// Load the user's expenses and queue unless they already are
    fn load_user(&self, session: &Session) -> Result<()> {
        let email = &session.user.email;
        if self.expense_service.owner()?.as_deref() != Some(email.as_str()) {
            self.expense_service.load(email)?;
            self.sync_service.load_queue(email)?;
        }
        Ok(())
    }

    /// The active session, or `SessionExpired` / `Unauthenticated`.
    ///
    /// An active session gets its user's data loaded; an expired one is
    /// removed and everything it loaded is dropped.
    pub fn require_session(&self) -> Result<Session> {
        match self.auth_service.check_session()? {
            SessionCheck::Active(session) => {
                self.load_user(&session)?;
                Ok(session)
            }
            SessionCheck::Expired => {
                self.log(LogEvent::new("session_expired").with_route(Route::Login.path()));
                self.unload_user()?;
                Err(Error::SessionExpired)
            }
            SessionCheck::Missing => {
                self.unload_user()?;
                Err(Error::Unauthenticated)
            }
        }
    }

    /// Like [`Self::require_session`], with "no session" as `None`
    pub fn restore_session(&self) -> Result<Option<Session>> {
        match self.require_session() {
            Ok(session) => Ok(Some(session)),
            Err(Error::SessionExpired | Error::Unauthenticated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Resolve where a request for `requested` actually lands
    pub fn route(&self, requested: Route) -> Result<Route> {
        let authenticated = self.restore_session()?.is_some();
        let resolved = requested.resolve(authenticated);
        self.log(LogEvent::new("route_opened").with_route(resolved.path()));
        Ok(resolved)
    }

    /// Enter the dashboard, loading the user's data
    pub fn open_dashboard(&self) -> Result<Route> {
        self.route(Route::Dashboard)
    }

    /// Register a user after the simulated signup delay
    pub async fn signup(&self, form: &SignupForm, cancel: &CancellationToken) -> Result<UserProfile> {
        self.auth_service.validate_signup(form)?;
        simulate_latency(self.config.latency.signup, cancel).await?;
        self.auth_service.signup(form)
    }

    /// Log in after the simulated delay and load the user's data
    pub async fn login(&self, form: &LoginForm, cancel: &CancellationToken) -> Result<Session> {
        simulate_latency(self.config.latency.login, cancel).await?;
        let session = self.auth_service.login(form)?;
        self.expense_service.load(&session.user.email)?;
        self.sync_service.load_queue(&session.user.email)?;
        self.log(LogEvent::new("login_succeeded").with_route(Route::Dashboard.path()));
        Ok(session)
    }

    pub fn logout(&self) -> Result<()> {
        self.auth_service.logout()?;
        self.unload_user()
    }

    /// Create (`id` absent) or update an expense from form input.
    ///
    /// The draft is validated before the save delay so field errors come
    /// back immediately.
    pub async fn submit_expense(
        &self,
        id: Option<Uuid>,
        draft: ExpenseDraft,
        cancel: &CancellationToken,
    ) -> Result<Mutation> {
        self.require_session()?;
        draft.validate().map_err(Error::InvalidFields)?;
        if let Some(id) = id {
            if self.tracker_service.find(id)?.is_none() {
                return Err(Error::not_found(format!("expense {}", id)));
            }
        }

        simulate_latency(self.config.latency.save, cancel).await?;

        match id {
            Some(id) => self.tracker_service.update_expense(id, draft),
            None => self.tracker_service.add_expense(draft),
        }
    }

    pub fn delete_expense(&self, id: Uuid) -> Result<Mutation> {
        self.require_session()?;
        self.tracker_service.delete_expense(id)
    }

    pub fn find_expense(&self, id: Uuid) -> Result<Option<Expense>> {
        self.require_session()?;
        self.tracker_service.find(id)
    }

    /// Filtered expense list with its summary
    pub fn list_expenses(&self, filter: &ExpenseFilter) -> Result<(Vec<Expense>, ExpenseSummary)> {
        self.require_session()?;
        let expenses = self.expense_service.filter(filter)?;
        let summary = ExpenseSummary::from_expenses(&expenses);
        Ok((expenses, summary))
    }

    /// Switch offline mode and remember the choice in settings.json
    pub fn set_offline(&mut self, offline: bool) -> Result<SyncStatus> {
        let status = self.sync_service.set_offline(offline)?;
        self.config.offline_mode = offline;
        if let Some(dir) = &self.data_dir {
            self.config
                .save(dir)
                .map_err(|e| Error::Config(e.to_string()))?;
        }
        self.log(LogEvent::new(if offline { "offline_enabled" } else { "offline_disabled" }));
        Ok(status)
    }

    /// Run one sync cycle if the queue is waiting to replay
    pub async fn sync(&self, cancel: &CancellationToken) -> Result<Option<ReplayReport>> {
        self.require_session()?;
        match self.sync_service.run(&self.expense_service, cancel).await {
            Ok(Some(report)) => {
                self.log(LogEvent::new("sync_completed"));
                Ok(Some(report))
            }
            Ok(None) => Ok(None),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                self.log(LogEvent::new("sync_failed").with_error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Put a failed or idle queue back into `syncing`
    pub fn retry_sync(&self) -> Result<SyncStatus> {
        self.require_session()?;
        self.sync_service.retry()
    }

    pub fn watchdog(&self) -> SessionWatchdog {
        SessionWatchdog::new(Arc::clone(&self.auth_service), self.config.check_interval)
    }

    /// Watch the session until it expires or `cancel` fires.
    ///
    /// On expiry the user is logged out and the login route is returned.
    pub async fn watch_session(&self, cancel: &CancellationToken) -> Result<Option<Route>> {
        let redirect = self.watchdog().run(cancel).await?;
        if redirect.is_some() {
            self.log(LogEvent::new("session_expired").with_route(Route::Login.path()));
            self.logout()?;
        }
        Ok(redirect)
    }
}
