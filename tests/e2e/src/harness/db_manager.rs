//! Test Storage Manager
//!
//! Provides isolated database instances for testing:
//! - Temporary databases that are automatically cleaned up
//! - Pre-seeded databases with test data
//! - Snapshots through the backup codec
//! - Reopening to check what actually reached disk

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use murajaah_core::{BackupDocument, EngineConfig, NodeKey, Storage};
use tempfile::TempDir;

/// Manager for test databases
///
/// Creates isolated database instances for each test to prevent interference.
/// Automatically cleans up temporary databases when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let mut db = TestStorageManager::new_temp();
///
/// // Use the storage
/// db.storage.get_or_create_node(&NodeKey::verse(1, 1, 7), today)?;
///
/// // Database is automatically deleted when `db` goes out of scope
/// ```
pub struct TestStorageManager {
    /// The storage instance
    pub storage: Storage,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: Option<TempDir>,
    /// Path to the database file
    db_path: PathBuf,
    /// Snapshot data for restore operations
    snapshot: Option<BackupDocument>,
}

impl TestStorageManager {
    /// Create a new test database in a temporary directory
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_murajaah.db");

        let storage =
            Storage::open(&db_path, EngineConfig::default()).expect("Failed to create test storage");

        Self {
            storage,
            _temp_dir: Some(temp_dir),
            db_path,
            snapshot: None,
        }
    }

    /// Create a test database at a specific path
    ///
    /// The database is NOT automatically deleted.
    pub fn new_at_path(path: PathBuf) -> Self {
        let storage =
            Storage::open(&path, EngineConfig::default()).expect("Failed to create test storage");

        Self {
            storage,
            _temp_dir: None,
            db_path: path,
            snapshot: None,
        }
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Check if the database is empty
    pub fn is_empty(&self) -> bool {
        self.storage.state().nodes.is_empty()
    }

    /// Get the number of nodes in the database
    pub fn node_count(&self) -> usize {
        self.storage.state().nodes.len()
    }

    // ========================================================================
    // SEEDING METHODS
    // ========================================================================

    /// Materialize one verse node per range of `surah_id`
    pub fn seed_verses(&mut self, surah_id: u32, ranges: &[(u32, u32)], now: DateTime<Utc>) -> Vec<String> {
        ranges
            .iter()
            .map(|&(start, end)| {
                self.storage
                    .get_or_create_node(&NodeKey::verse(surah_id, start, end), now.date_naive())
                    .expect("Failed to seed node")
                    .id
            })
            .collect()
    }

    // ========================================================================
    // SNAPSHOT/RESTORE
    // ========================================================================

    /// Take a snapshot of current state
    pub fn take_snapshot(&mut self, now: DateTime<Utc>) {
        self.snapshot = Some(self.storage.export(now));
    }

    /// Restore from the last snapshot
    pub fn restore_snapshot(&mut self) -> bool {
        match self.snapshot.take() {
            Some(doc) => {
                self.storage.import(doc).expect("Failed to restore snapshot");
                true
            }
            None => false,
        }
    }

    /// Check if a snapshot exists
    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Drop the storage and open the same file again
    pub fn reopen(&mut self) {
        self.storage = Storage::open(&self.db_path, EngineConfig::default())
            .expect("Failed to reopen storage");
    }

    /// Recreate the database from scratch
    pub fn recreate(&mut self) {
        self.storage = Storage::in_memory();
        let _ = std::fs::remove_file(&self.db_path);
        self.storage = Storage::open(&self.db_path, EngineConfig::default())
            .expect("Failed to recreate storage");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 4, 0, 0).unwrap()
    }

    #[test]
    fn test_temp_database_creation() {
        let db = TestStorageManager::new_temp();
        assert!(db.is_empty());
        assert!(db.path().exists());
    }

    #[test]
    fn test_seed_and_reopen() {
        let mut db = TestStorageManager::new_temp();
        let ids = db.seed_verses(2, &[(1, 5), (6, 10)], now());
        assert_eq!(ids, vec!["verse:2:1-5", "verse:2:6-10"]);

        db.reopen();
        assert_eq!(db.node_count(), 2);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut db = TestStorageManager::new_temp();
        db.seed_verses(2, &[(1, 5)], now());
        db.take_snapshot(now());
        assert!(db.has_snapshot());

        db.seed_verses(3, &[(1, 9)], now());
        assert_eq!(db.node_count(), 2);

        assert!(db.restore_snapshot());
        assert_eq!(db.node_count(), 1);
        assert!(!db.has_snapshot());
    }

    #[test]
    fn test_recreate_empties_database() {
        let mut db = TestStorageManager::new_temp();
        db.seed_verses(2, &[(1, 5)], now());
        db.recreate();
        assert!(db.is_empty());
    }
}
