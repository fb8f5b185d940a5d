//! Storage Module
//!
//! SQLite-based storage layer with:
//! - Named JSON collections in a single key-value table
//! - Versioned schema migrations
//! - Copy-then-swap mutations so a failed write changes nothing

mod kv;
mod local;
mod migrations;
mod sqlite;

pub use kv::{KeyValueStore, MemoryKvStore};
pub use local::{Collection, GradeOutcome, LocalState, Storage, LAST_SYNC_KEY, MODIFIED_AT_KEY};
pub use migrations::MIGRATIONS;
pub use sqlite::{Result, SqliteKvStore, StorageError};
