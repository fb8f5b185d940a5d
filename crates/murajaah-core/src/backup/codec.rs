//! Backup Codec
//!
//! Converts between the live [`LocalState`] and a [`BackupDocument`], and
//! between documents and their JSON text. Decoding validates the whole
//! document before anything is handed to the caller, so a rejected import
//! never leaves partial state behind.

use chrono::{DateTime, Utc};

use crate::memory::MemoryNodeStore;
use crate::review::ReviewLog;
use crate::storage::{LocalState, Result, StorageError};

use super::document::{BackupDocument, BACKUP_FORMAT_VERSION};

/// Snapshot every persisted collection, stamped at `now`
pub fn export(state: &LocalState, now: DateTime<Utc>) -> BackupDocument {
    BackupDocument {
        version: BACKUP_FORMAT_VERSION,
        settings: state.settings.clone(),
        memory_nodes: state.nodes.to_vec(),
        mutashabihat_decisions: state.decisions.clone(),
        custom_mutashabihat: state.custom_mutashabihat.clone(),
        mindmaps: state.mindmaps.clone(),
        part_mindmaps: state.part_mindmaps.clone(),
        listening_stats: state.listening_stats.clone(),
        listening_progress: state.listening_progress.clone(),
        review_errors: state.review_log.entries().to_vec(),
        cycle_start: state.cycle_start.clone(),
        listening_complete: state.listening_complete,
        exported_at: now,
    }
}

/// Structural checks serde cannot express
pub fn validate(doc: &BackupDocument) -> Result<()> {
    if doc.version > BACKUP_FORMAT_VERSION {
        return Err(StorageError::InvalidBackup(format!(
            "unsupported backup version {} (newest supported is {})",
            doc.version, BACKUP_FORMAT_VERSION
        )));
    }
    if let Some(node) = doc.memory_nodes.iter().find(|n| n.id != n.key.id()) {
        return Err(StorageError::InvalidBackup(format!(
            "node id '{}' does not match its key '{}'",
            node.id, node.key
        )));
    }
    Ok(())
}

/// Parse and validate backup JSON
pub fn decode(json: &str) -> Result<BackupDocument> {
    let doc: BackupDocument =
        serde_json::from_str(json).map_err(|e| StorageError::InvalidBackup(e.to_string()))?;
    validate(&doc)?;
    Ok(doc)
}

/// Human-readable backup JSON
pub fn encode(doc: &BackupDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(doc)?)
}

impl LocalState {
    /// Live state equivalent to `doc`
    pub fn from_document(doc: BackupDocument) -> Self {
        Self {
            settings: doc.settings,
            nodes: MemoryNodeStore::from_nodes(doc.memory_nodes),
            decisions: doc.mutashabihat_decisions,
            custom_mutashabihat: doc.custom_mutashabihat,
            mindmaps: doc.mindmaps,
            part_mindmaps: doc.part_mindmaps,
            listening_stats: doc.listening_stats,
            listening_progress: doc.listening_progress,
            review_log: ReviewLog::from_entries(doc.review_errors),
            cycle_start: doc.cycle_start,
            listening_complete: doc.listening_complete,
        }
    }
}
