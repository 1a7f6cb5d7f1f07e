//! Sync service - offline queue and its replay state machine
//!
//! While offline every mutation is appended to `syncQueue_<email>` instead of
//! touching the expense store. Going back online moves the status to
//! `syncing`; a replay drains the queue in recording order and the status
//! passes through `synced` back to `idle`. A failed replay leaves the queue
//! as it was and parks the status in `error` until [`SyncService::retry`].

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::delay::simulate_latency;
use super::expense::ExpenseService;
use crate::domain::result::{Error, Result};
use crate::domain::{normalize_email, Expense, SyncAction, SyncStatus};
use crate::ports::{read_json, write_json, KeyValueStore, StorageKey};

/// Default wait before a replay starts
pub const DEFAULT_REPLAY_DELAY: Duration = Duration::from_millis(1500);

/// Default time the `synced` status stays visible
pub const DEFAULT_SYNCED_DISPLAY: Duration = Duration::from_millis(3000);

#[derive(Debug, Default)]
struct SyncState {
    owner: Option<String>,
    is_offline: bool,
    status: SyncStatus,
    queue: Vec<SyncAction>,
}

/// What the queue says about one expense id
#[derive(Debug, Clone, PartialEq)]
pub enum PendingRecord {
    /// No queued action mentions the id
    Absent,
    /// Latest queued action adds or edits it
    Present(Expense),
    /// Latest queued action deletes it
    Deleted,
}

/// Result of one successful replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub applied: usize,
    pub skipped: usize,
    pub total: usize,
}

/// Point-in-time view for status output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    pub status: SyncStatus,
    pub is_offline: bool,
    pub pending: usize,
}

pub struct SyncService {
    store: Arc<dyn KeyValueStore>,
    state: Mutex<SyncState>,
    replay_delay: Duration,
    synced_display: Duration,
}

impl SyncService {
    pub fn new(store: Arc<dyn KeyValueStore>, is_offline: bool) -> Self {
        Self {
            store,
            state: Mutex::new(SyncState {
                is_offline,
                ..SyncState::default()
            }),
            replay_delay: DEFAULT_REPLAY_DELAY,
            synced_display: DEFAULT_SYNCED_DISPLAY,
        }
    }

    pub fn with_delays(mut self, replay_delay: Duration, synced_display: Duration) -> Self {
        self.replay_delay = replay_delay;
        self.synced_display = synced_display;
        self
    }

    fn state(&self) -> Result<MutexGuard<'_, SyncState>> {
        self.state.lock().map_err(|_| Error::poisoned("sync state"))
    }

    /// Load the persisted queue for a user.
    ///
    /// Online with leftover actions means a replay was interrupted, so the
    /// status resumes at `syncing`.
    pub fn load_queue(&self, email: &str) -> Result<usize> {
        let owner = normalize_email(email);
        let queue: Vec<SyncAction> =
            read_json(self.store.as_ref(), StorageKey::SyncQueue(&owner))?.unwrap_or_default();

        let mut state = self.state()?;
        state.status = if !state.is_offline && !queue.is_empty() {
            SyncStatus::Syncing
        } else {
            SyncStatus::Idle
        };
        state.owner = Some(owner);
        state.queue = queue;
        Ok(state.queue.len())
    }

    /// Drop the loaded queue; the offline flag survives logout
    pub fn unload(&self) -> Result<()> {
        let mut state = self.state()?;
        state.owner = None;
        state.queue.clear();
        state.status = SyncStatus::Idle;
        Ok(())
    }

    pub fn is_offline(&self) -> Result<bool> {
        Ok(self.state()?.is_offline)
    }

    pub fn status(&self) -> Result<SyncStatus> {
        Ok(self.state()?.status)
    }

    pub fn pending(&self) -> Result<Vec<SyncAction>> {
        Ok(self.state()?.queue.clone())
    }

    pub fn snapshot(&self) -> Result<SyncSnapshot> {
        let state = self.state()?;
        Ok(SyncSnapshot {
            status: state.status,
            is_offline: state.is_offline,
            pending: state.queue.len(),
        })
    }

    /// Whether a mutation has to go through the queue right now.
    /// A non-empty queue keeps online writes behind it.
    pub fn should_queue(&self) -> Result<bool> {
        let state = self.state()?;
        Ok(state.is_offline || !state.queue.is_empty())
    }

    /// Flip the offline flag and return the resulting status
    pub fn set_offline(&self, offline: bool) -> Result<SyncStatus> {
        let mut state = self.state()?;
        state.is_offline = offline;
        state.status = if !offline && !state.queue.is_empty() {
            SyncStatus::Syncing
        } else {
            SyncStatus::Idle
        };
        Ok(state.status)
    }

    /// Re-enter `syncing` after a failure, or for a queue left idle
    pub fn retry(&self) -> Result<SyncStatus> {
        let mut state = self.state()?;
        if state.is_offline {
            return Err(Error::sync("cannot sync while offline"));
        }
        if !state.queue.is_empty() {
            state.status = SyncStatus::Syncing;
        }
        Ok(state.status)
    }

    /// Append an action; the queue is persisted before memory changes.
    /// Returns the new queue length.
    pub fn enqueue(&self, action: SyncAction) -> Result<usize> {
        let mut state = self.state()?;
        let owner = state.owner.clone().ok_or(Error::Unauthenticated)?;

        let mut next = state.queue.clone();
        next.push(action);
        write_json(self.store.as_ref(), StorageKey::SyncQueue(&owner), &next)?;
        state.queue = next;
        Ok(state.queue.len())
    }

    /// Net effect of the queue on one id
    pub fn pending_record(&self, id: Uuid) -> Result<PendingRecord> {
        let state = self.state()?;
        let latest = state.queue.iter().rev().find(|a| a.id() == id);
        Ok(match latest {
            None => PendingRecord::Absent,
            Some(SyncAction::Delete { .. }) => PendingRecord::Deleted,
            Some(SyncAction::Add { data, .. }) | Some(SyncAction::Edit { data, .. }) => {
                PendingRecord::Present(data.clone())
            }
        })
    }

    /// Drain the queue into the expense store.
    ///
    /// Only valid in `syncing`. On any failure the status becomes `error`
    /// and the queue stays where it was.
    pub fn replay(&self, expenses: &ExpenseService) -> Result<ReplayReport> {
        let (owner, batch) = {
            let state = self.state()?;
            if state.status != SyncStatus::Syncing {
                return Err(Error::sync(format!(
                    "replay requested while {}",
                    state.status.as_str()
                )));
            }
            let owner = state.owner.clone().ok_or(Error::Unauthenticated)?;
            (owner, state.queue.clone())
        };

        let outcome = match expenses.apply_actions(&owner, &batch) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.state()?.status = SyncStatus::Error;
                return Err(e);
            }
        };

        let mut state = self.state()?;
        // Actions queued while the batch was applying stay behind it
        let remaining: Vec<SyncAction> = state.queue.iter().skip(batch.len()).cloned().collect();
        let key = StorageKey::SyncQueue(&owner).key();
        let persisted = if remaining.is_empty() {
            self.store.remove_item(&key)
        } else {
            write_json(self.store.as_ref(), StorageKey::SyncQueue(&owner), &remaining)
        };
        if let Err(e) = persisted {
            state.status = SyncStatus::Error;
            return Err(e);
        }

        state.status = if remaining.is_empty() {
            SyncStatus::Synced
        } else {
            SyncStatus::Syncing
        };
        state.queue = remaining;

        Ok(ReplayReport {
            applied: outcome.applied,
            skipped: outcome.skipped,
            total: batch.len(),
        })
    }

    /// `synced` falls back to `idle`; any other status is left alone
    pub fn settle(&self) -> Result<SyncStatus> {
        let mut state = self.state()?;
        if state.status == SyncStatus::Synced {
            state.status = SyncStatus::Idle;
        }
        Ok(state.status)
    }

    /// Drive one full sync cycle: wait, replay, show `synced`, settle.
    ///
    /// Returns `None` when there was nothing to do, or when the status left
    /// `syncing` during the wait (the user went offline again).
    pub async fn run(
        &self,
        expenses: &ExpenseService,
        cancel: &CancellationToken,
    ) -> Result<Option<ReplayReport>> {
        if self.status()? != SyncStatus::Syncing {
            return Ok(None);
        }

        simulate_latency(self.replay_delay, cancel).await?;

        if self.status()? != SyncStatus::Syncing {
            return Ok(None);
        }
        let report = self.replay(expenses)?;

        // Cancelling here only cuts the display short
        let _ = simulate_latency(self.synced_display, cancel).await;
        self.settle()?;

        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::Category;
    use chrono::Utc;
    use rust_decimal::Decimal;

    const EMAIL: &str = "ada@example.com";

    fn expense(title: &str) -> Expense {
        let now = Utc::now();
        Expense::new(title, Decimal::new(450, 2), Category::FoodAndDining, now, now)
    }

    fn services(offline: bool) -> (SyncService, ExpenseService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let sync = SyncService::new(store.clone(), offline);
        let expenses = ExpenseService::new(store.clone());
        sync.load_queue(EMAIL).unwrap();
        expenses.load(EMAIL).unwrap();
        (sync, expenses, store)
    }

    #[test]
    fn test_status_transitions() {
        let (sync, expenses, _) = services(true);
        assert_eq!(sync.status().unwrap(), SyncStatus::Idle);

        sync.enqueue(SyncAction::add(expense("Coffee"))).unwrap();
        assert_eq!(sync.status().unwrap(), SyncStatus::Idle);

        assert_eq!(sync.set_offline(false).unwrap(), SyncStatus::Syncing);
        sync.replay(&expenses).unwrap();
        assert_eq!(sync.status().unwrap(), SyncStatus::Synced);
        assert_eq!(sync.settle().unwrap(), SyncStatus::Idle);
    }

    #[test]
    fn test_going_online_with_empty_queue_stays_idle() {
        let (sync, _, _) = services(true);
        assert_eq!(sync.set_offline(false).unwrap(), SyncStatus::Idle);
        assert!(!sync.should_queue().unwrap());
    }

    #[test]
    fn test_enqueue_persists() {
        let (sync, _, store) = services(true);
        let coffee = expense("Coffee");
        sync.enqueue(SyncAction::add(coffee.clone())).unwrap();
        sync.enqueue(SyncAction::delete(coffee.id)).unwrap();

        let raw = store.get_item("syncQueue_ada@example.com").unwrap().unwrap();
        let queue: Vec<SyncAction> = serde_json::from_str(&raw).unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[1].kind(), "delete");
        assert_eq!(sync.pending_record(coffee.id).unwrap(), PendingRecord::Deleted);
    }

    #[test]
    fn test_pending_record_tracks_latest_action() {
        let (sync, _, _) = services(true);
        let mut coffee = expense("Coffee");
        assert_eq!(sync.pending_record(coffee.id).unwrap(), PendingRecord::Absent);

        sync.enqueue(SyncAction::add(coffee.clone())).unwrap();
        coffee.title = "Latte".to_string();
        sync.enqueue(SyncAction::edit(coffee.clone())).unwrap();

        match sync.pending_record(coffee.id).unwrap() {
            PendingRecord::Present(e) => assert_eq!(e.title, "Latte"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_replay_outside_syncing_is_rejected() {
        let (sync, expenses, _) = services(false);
        assert!(matches!(sync.replay(&expenses), Err(Error::Sync(_))));
    }

    #[test]
    fn test_interrupted_queue_resumes_syncing() {
        let (sync, _, store) = services(true);
        sync.enqueue(SyncAction::add(expense("Coffee"))).unwrap();

        let restarted = SyncService::new(store, false);
        assert_eq!(restarted.load_queue(EMAIL).unwrap(), 1);
        assert_eq!(restarted.status().unwrap(), SyncStatus::Syncing);
    }

    #[test]
    fn test_retry_requires_online() {
        let (sync, _, _) = services(true);
        sync.enqueue(SyncAction::add(expense("Coffee"))).unwrap();
        assert!(sync.retry().is_err());

        sync.set_offline(false).unwrap();
        assert_eq!(sync.retry().unwrap(), SyncStatus::Syncing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_full_cycle() {
        let (sync, expenses, store) = services(true);
        sync.enqueue(SyncAction::add(expense("Coffee"))).unwrap();
        sync.set_offline(false).unwrap();

        let start = tokio::time::Instant::now();
        let report = sync
            .run(&expenses, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.total, 1);
        assert!(start.elapsed() >= DEFAULT_REPLAY_DELAY + DEFAULT_SYNCED_DISPLAY);
        assert_eq!(sync.status().unwrap(), SyncStatus::Idle);
        assert_eq!(expenses.list().unwrap().len(), 1);
        assert!(store.get_item("syncQueue_ada@example.com").unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_cancelled_before_replay() {
        let (sync, expenses, _) = services(true);
        sync.enqueue(SyncAction::add(expense("Coffee"))).unwrap();
        sync.set_offline(false).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = sync.run(&expenses, &cancel).await.unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(sync.status().unwrap(), SyncStatus::Syncing);
        assert_eq!(sync.pending().unwrap().len(), 1);
        assert!(expenses.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_is_noop_when_idle() {
        let (sync, expenses, _) = services(false);
        let report = sync.run(&expenses, &CancellationToken::new()).await.unwrap();
        assert!(report.is_none());
    }
}
