//! Key/value storage port
//!
//! Every piece of persisted state is a JSON document under a string key,
//! the same shape a browser's local storage would hold.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::normalize_email;
use crate::domain::result::Result;

/// Key/value store abstraction
///
/// Adapters provide the actual persistence (DuckDB file, in-memory map).
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key is absent
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key; removing an absent key is not an error
    fn remove_item(&self, key: &str) -> Result<()>;

    /// All stored keys, sorted
    fn keys(&self) -> Result<Vec<String>>;
}

/// The fixed set of persisted entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKey<'a> {
    /// Array of every registered user
    Users,
    /// The current session, if any
    Session,
    /// One user's expenses
    Expenses(&'a str),
    /// One user's pending offline mutations
    SyncQueue(&'a str),
}

impl StorageKey<'_> {
    pub fn key(&self) -> String {
        match self {
            StorageKey::Users => "users".to_string(),
            StorageKey::Session => "session".to_string(),
            StorageKey::Expenses(email) => format!("expenses_{}", normalize_email(email)),
            StorageKey::SyncQueue(email) => format!("syncQueue_{}", normalize_email(email)),
        }
    }
}

/// Read and decode a JSON entry.
///
/// Undecodable entries are reported on stderr and treated as absent, so a
/// corrupted value degrades to "no prior state" rather than an error.
/// Failures of the store itself still propagate.
pub fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: StorageKey<'_>,
) -> Result<Option<T>> {
    let key = key.key();
    let Some(raw) = store.get_item(&key)? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            eprintln!("[spendline] Ignoring unreadable '{}' entry: {}", key, e);
            Ok(None)
        }
    }
}

/// Encode and write a JSON entry
pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: StorageKey<'_>,
    value: &T,
) -> Result<()> {
    let encoded = serde_json::to_string(value)?;
    store.set_item(&key.key(), &encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;

    #[test]
    fn test_key_names() {
        assert_eq!(StorageKey::Users.key(), "users");
        assert_eq!(StorageKey::Session.key(), "session");
        assert_eq!(StorageKey::Expenses("Ada@Example.com").key(), "expenses_ada@example.com");
        assert_eq!(StorageKey::SyncQueue("ada@example.com").key(), "syncQueue_ada@example.com");
    }

    #[test]
    fn test_unreadable_entry_reads_as_absent() {
        let store = MemoryStore::new();
        store.set_item("users", "{not json").unwrap();

        let users: Option<Vec<crate::domain::User>> =
            read_json(&store, StorageKey::Users).unwrap();
        assert!(users.is_none());
    }

    #[test]
    fn test_json_round_trip_through_store() {
        let store = MemoryStore::new();
        write_json(&store, StorageKey::Users, &vec![crate::domain::User::new("Ada", "a@b.co", "pw")])
            .unwrap();
        let users: Vec<crate::domain::User> = read_json(&store, StorageKey::Users).unwrap().unwrap();
        assert_eq!(users[0].name, "Ada");
    }
}
