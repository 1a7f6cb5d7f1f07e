//! Status service - who is signed in and where their data stands

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use super::auth::AuthService;
use super::expense::ExpenseService;
use super::sync::SyncService;
use crate::domain::result::Result;
use crate::domain::{ExpenseFilter, SyncStatus, UserProfile};

pub struct StatusService {
    auth: Arc<AuthService>,
    expenses: Arc<ExpenseService>,
    sync: Arc<SyncService>,
}

impl StatusService {
    pub fn new(auth: Arc<AuthService>, expenses: Arc<ExpenseService>, sync: Arc<SyncService>) -> Self {
        Self {
            auth,
            expenses,
            sync,
        }
    }

    /// Summary of the in-memory state; does not restore a session
    pub fn get_status(&self) -> Result<StatusSummary> {
        let user = self.auth.current_session()?.map(|s| s.user);
        let remaining_secs = self.auth.remaining()?.map(|d| d.as_secs());
        let totals = self.expenses.summary(&ExpenseFilter::default())?;
        let sync = self.sync.snapshot()?;

        Ok(StatusSummary {
            user,
            session_remaining_secs: remaining_secs,
            expense_count: totals.count,
            total_amount: totals.total,
            pending_changes: sync.pending,
            offline: sync.is_offline,
            sync_status: sync.status,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub user: Option<UserProfile>,
    pub session_remaining_secs: Option<u64>,
    pub expense_count: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub pending_changes: usize,
    pub offline: bool,
    pub sync_status: SyncStatus,
}
