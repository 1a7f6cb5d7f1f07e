//! Tracker service - dashboard mutations routed to the store or the queue

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::expense::ExpenseService;
use super::sync::{PendingRecord, SyncService};
use crate::domain::result::{Error, Result};
use crate::domain::{Expense, ExpenseDraft, SyncAction};
use crate::ports::Clock;

/// Where a mutation ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum MutationOutcome {
    /// Written to the expense store
    Applied,
    /// Appended to the sync queue, now `pending` long
    Queued { pending: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Add,
    Edit,
    Delete,
}

#[derive(Debug, Clone, Serialize)]
pub struct Mutation {
    pub kind: MutationKind,
    pub expense: Expense,
    #[serde(flatten)]
    pub outcome: MutationOutcome,
}

impl Mutation {
    pub fn is_queued(&self) -> bool {
        matches!(self.outcome, MutationOutcome::Queued { .. })
    }

    /// Short notice shown after the mutation
    pub fn headline(&self) -> &'static str {
        match (self.kind, self.is_queued()) {
            (MutationKind::Add, false) => "Expense Added",
            (MutationKind::Add, true) => "Expense Saved Offline",
            (MutationKind::Edit, false) => "Expense Updated",
            (MutationKind::Edit, true) => "Update Saved Offline",
            (MutationKind::Delete, false) => "Expense Deleted",
            (MutationKind::Delete, true) => "Delete Saved Offline",
        }
    }

    pub fn detail(&self) -> &'static str {
        match (self.kind, self.is_queued()) {
            (MutationKind::Add, false) => "Your expense has been saved",
            (MutationKind::Edit, false) => "Your changes have been saved",
            (MutationKind::Delete, false) => "The expense has been removed",
            (MutationKind::Edit, true) => "Changes will sync when you go online",
            (_, true) => "This will sync when you go online",
        }
    }
}

pub struct TrackerService {
    expenses: Arc<ExpenseService>,
    sync: Arc<SyncService>,
    clock: Arc<dyn Clock>,
}

impl TrackerService {
    pub fn new(expenses: Arc<ExpenseService>, sync: Arc<SyncService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            expenses,
            sync,
            clock,
        }
    }

    /// Look an expense up as the user currently sees it, queued changes
    /// included
    pub fn find(&self, id: Uuid) -> Result<Option<Expense>> {
        match self.sync.pending_record(id)? {
            PendingRecord::Present(expense) => Ok(Some(expense)),
            PendingRecord::Deleted => Ok(None),
            PendingRecord::Absent => self.expenses.get(id),
        }
    }

    fn require(&self, id: Uuid) -> Result<Expense> {
        self.find(id)?
            .ok_or_else(|| Error::not_found(format!("expense {}", id)))
    }

    pub fn add_expense(&self, draft: ExpenseDraft) -> Result<Mutation> {
        let expense = draft.into_expense(None, self.clock.now())?;
        let outcome = if self.sync.should_queue()? {
            self.queue(SyncAction::add(expense.clone()))?
        } else {
            self.expenses.add(expense.clone())?;
            MutationOutcome::Applied
        };
        Ok(Mutation {
            kind: MutationKind::Add,
            expense,
            outcome,
        })
    }

    pub fn update_expense(&self, id: Uuid, draft: ExpenseDraft) -> Result<Mutation> {
        let existing = self.require(id)?;
        let expense = draft.into_expense(Some(&existing), self.clock.now())?;
        let outcome = if self.sync.should_queue()? {
            self.queue(SyncAction::edit(expense.clone()))?
        } else {
            self.expenses.edit(expense.clone())?;
            MutationOutcome::Applied
        };
        Ok(Mutation {
            kind: MutationKind::Edit,
            expense,
            outcome,
        })
    }

    pub fn delete_expense(&self, id: Uuid) -> Result<Mutation> {
        let expense = self.require(id)?;
        let outcome = if self.sync.should_queue()? {
            self.queue(SyncAction::delete(id))?
        } else {
            self.expenses.delete(id)?;
            MutationOutcome::Applied
        };
        Ok(Mutation {
            kind: MutationKind::Delete,
            expense,
            outcome,
        })
    }

    fn queue(&self, action: SyncAction) -> Result<MutationOutcome> {
        let pending = self.sync.enqueue(action)?;
        Ok(MutationOutcome::Queued { pending })
    }
}
