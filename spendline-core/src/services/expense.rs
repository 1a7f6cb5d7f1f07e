//! Expense service - the signed-in user's expense book

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    normalize_email, Expense, ExpenseFilter, ExpenseSummary, SyncAction, MAX_AMOUNT,
};
use crate::ports::{read_json, write_json, KeyValueStore, StorageKey};

#[derive(Debug, Default)]
struct ExpenseBook {
    owner: Option<String>,
    expenses: Vec<Expense>,
}

/// Outcome of applying a batch of queued actions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    pub applied: usize,
    /// Edits and deletes whose record no longer exists
    pub skipped: usize,
}

/// Expense store for one user at a time, persisted under `expenses_<email>`.
///
/// Every mutation writes the full list first and only then updates the
/// in-memory copy, so a failed write leaves both untouched.
pub struct ExpenseService {
    store: Arc<dyn KeyValueStore>,
    book: Mutex<ExpenseBook>,
}

impl ExpenseService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            book: Mutex::new(ExpenseBook::default()),
        }
    }

    fn book(&self) -> Result<MutexGuard<'_, ExpenseBook>> {
        self.book.lock().map_err(|_| Error::poisoned("expense book"))
    }

    /// Load a user's expenses, replacing whatever was loaded before.
    /// Returns the number of records.
    pub fn load(&self, email: &str) -> Result<usize> {
        let owner = normalize_email(email);
        let expenses: Vec<Expense> =
            read_json(self.store.as_ref(), StorageKey::Expenses(&owner))?.unwrap_or_default();

        let mut book = self.book()?;
        book.owner = Some(owner);
        book.expenses = expenses;
        Ok(book.expenses.len())
    }

    /// Forget the loaded user (logout)
    pub fn unload(&self) -> Result<()> {
        *self.book()? = ExpenseBook::default();
        Ok(())
    }

    pub fn owner(&self) -> Result<Option<String>> {
        Ok(self.book()?.owner.clone())
    }

    pub fn list(&self) -> Result<Vec<Expense>> {
        Ok(self.book()?.expenses.clone())
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Expense>> {
        Ok(self.book()?.expenses.iter().find(|e| e.id == id).cloned())
    }

    pub fn filter(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
        Ok(self
            .book()?
            .expenses
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    pub fn summary(&self, filter: &ExpenseFilter) -> Result<ExpenseSummary> {
        let book = self.book()?;
        Ok(ExpenseSummary::from_expenses(
            book.expenses.iter().filter(|e| filter.matches(e)),
        ))
    }

    pub fn add(&self, expense: Expense) -> Result<()> {
        let mut book = self.book()?;
        if book.expenses.iter().any(|e| e.id == expense.id) {
            return Err(Error::validation(format!("Expense {} already exists", expense.id)));
        }
        let mut next = book.expenses.clone();
        next.push(expense);
        self.commit(&mut book, next)
    }

    pub fn edit(&self, expense: Expense) -> Result<()> {
        let mut book = self.book()?;
        let mut next = book.expenses.clone();
        let slot = next
            .iter_mut()
            .find(|e| e.id == expense.id)
            .ok_or_else(|| Error::not_found(format!("expense {}", expense.id)))?;
        *slot = expense;
        self.commit(&mut book, next)
    }

    pub fn delete(&self, id: Uuid) -> Result<Expense> {
        let mut book = self.book()?;
        let position = book
            .expenses
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::not_found(format!("expense {}", id)))?;
        let mut next = book.expenses.clone();
        let removed = next.remove(position);
        self.commit(&mut book, next)?;
        Ok(removed)
    }

    /// Apply queued actions in order as a single write.
    ///
    /// An `add` for an id already present replaces that record, and an
    /// `edit` or `delete` for a missing id is skipped, so replaying the same
    /// queue twice ends in the same state.
    pub fn apply_actions(&self, owner: &str, actions: &[SyncAction]) -> Result<ApplyOutcome> {
        let mut book = self.book()?;
        if book.owner.as_deref() != Some(normalize_email(owner).as_str()) {
            return Err(Error::sync(
                "expense book is not loaded for the queued user",
            ));
        }

        let mut next = book.expenses.clone();
        let mut outcome = ApplyOutcome::default();

        for action in actions {
            match action {
                SyncAction::Add { data, .. } => {
                    match next.iter_mut().find(|e| e.id == data.id) {
                        Some(slot) => *slot = data.clone(),
                        None => next.push(data.clone()),
                    }
                    outcome.applied += 1;
                }
                SyncAction::Edit { data, .. } => match next.iter_mut().find(|e| e.id == data.id) {
                    Some(slot) => {
                        *slot = data.clone();
                        outcome.applied += 1;
                    }
                    None => outcome.skipped += 1,
                },
                SyncAction::Delete { id } => {
                    let before = next.len();
                    next.retain(|e| e.id != *id);
                    if next.len() < before {
                        outcome.applied += 1;
                    } else {
                        outcome.skipped += 1;
                    }
                }
            }
        }

        self.commit(&mut book, next)?;
        Ok(outcome)
    }

    fn commit(&self, book: &mut ExpenseBook, next: Vec<Expense>) -> Result<()> {
        let owner = book.owner.as_deref().ok_or(Error::Unauthenticated)?;
        // An oversized amount would make the stored list unreadable
        if let Some(bad) = next.iter().find(|e| e.amount > MAX_AMOUNT) {
            return Err(Error::validation(format!(
                "Amount of expense {} exceeds {}",
                bad.id, MAX_AMOUNT
            )));
        }
        write_json(self.store.as_ref(), StorageKey::Expenses(owner), &next)?;
        book.expenses = next;
        Ok(())
    }
}
