//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod auth;
mod delay;
mod expense;
pub mod logging;
pub mod migration;
mod status;
mod sync;
mod tracker;
mod watchdog;

pub use auth::AuthService;
pub use delay::simulate_latency;
pub use expense::{ApplyOutcome, ExpenseService};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use status::{StatusService, StatusSummary};
pub use sync::{
    PendingRecord, ReplayReport, SyncService, SyncSnapshot, DEFAULT_REPLAY_DELAY,
    DEFAULT_SYNCED_DISPLAY,
};
pub use tracker::{Mutation, MutationKind, MutationOutcome, TrackerService};
pub use watchdog::{SessionWatchdog, WatchdogVerdict};
