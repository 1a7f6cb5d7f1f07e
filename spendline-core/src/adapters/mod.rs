//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the KeyValueStore port (persistent data directory)
//! - An in-memory map for the KeyValueStore port (tests, ephemeral use)

pub mod duckdb;
pub mod memory;
