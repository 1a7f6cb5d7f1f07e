//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod clock;
mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use storage::{read_json, write_json, KeyValueStore, StorageKey};
