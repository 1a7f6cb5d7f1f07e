//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod expense;
mod route;
mod session;
mod sync;
mod user;
pub mod result;

pub use expense::{Category, Expense, ExpenseDraft, ExpenseFilter, ExpenseSummary, MAX_AMOUNT};
pub use route::Route;
pub use session::{Session, SessionCheck, DEFAULT_CHECK_INTERVAL, DEFAULT_SESSION_TIMEOUT};
pub use sync::{SyncAction, SyncStatus};
pub use user::{normalize_email, LoginForm, SignupForm, User, UserProfile};
