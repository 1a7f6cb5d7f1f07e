//! Offline sync queue entries and status

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::expense::Expense;

/// One deferred mutation recorded while offline.
///
/// Stored as `{"type": "add" | "edit" | "delete", "id": ..., "data"?: ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SyncAction {
    Add { id: Uuid, data: Expense },
    Edit { id: Uuid, data: Expense },
    Delete { id: Uuid },
}

impl SyncAction {
    pub fn add(expense: Expense) -> Self {
        Self::Add {
            id: expense.id,
            data: expense,
        }
    }

    pub fn edit(expense: Expense) -> Self {
        Self::Edit {
            id: expense.id,
            data: expense,
        }
    }

    pub fn delete(id: Uuid) -> Self {
        Self::Delete { id }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Add { id, .. } | Self::Edit { id, .. } | Self::Delete { id } => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Edit { .. } => "edit",
            Self::Delete { .. } => "delete",
        }
    }

    /// Replay payload, absent for deletes
    pub fn data(&self) -> Option<&Expense> {
        match self {
            Self::Add { data, .. } | Self::Edit { data, .. } => Some(data),
            Self::Delete { .. } => None,
        }
    }
}

/// Sync state machine: `idle -> syncing -> synced -> idle`, `syncing -> error`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Synced,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
            SyncStatus::Error => "error",
        }
    }
}
