//! Local state and the storage facade
//!
//! [`Storage`] owns the live [`LocalState`] and the backend it is persisted to.
//! Every mutator works on a copy of the state, writes the touched collections
//! in one `save_many` call, and only then swaps the copy in. A failed write
//! therefore leaves both the backend and the in-memory state as they were.
//!
//! Mutations made on the user's behalf also stamp `modifiedAt`. That stamp,
//! not the wall clock, dates the document handed to a sync, so an untouched
//! device does not look newer than its peer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use tracing::{debug, info};

use crate::backup::{self, BackupDocument, CustomMutashabihat, MutashabihatDecision, Settings};
use crate::catalog::{ContentCatalog, SimilarityLookup};
use crate::config::{resolve_data_dir, EngineConfig, DATABASE_FILE};
use crate::memory::{DueFilter, MemoryNode, MemoryNodeStore, MemoryStats, NodeKey, ReviewScope};
use crate::review::{mindmap_for, Mindmap, Mindmaps, ReviewError, ReviewLog, SuspendedAnchor};
use crate::scheduler::{advance, reset_to, Grade, Maturity, SchedulingState};

use super::kv::{KeyValueStore, MemoryKvStore};
use super::sqlite::{Result, SqliteKvStore, StorageError};

/// Key holding the timestamp of the last completed sync
pub const LAST_SYNC_KEY: &str = "lastSync";

/// Key holding the time of the last user-visible change to local state
pub const MODIFIED_AT_KEY: &str = "modifiedAt";

// ============================================================================
// LOCAL STATE
// ============================================================================

/// Every persisted collection, held in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalState {
    pub settings: Settings,
    pub nodes: MemoryNodeStore,
    pub decisions: BTreeMap<String, MutashabihatDecision>,
    pub custom_mutashabihat: Vec<CustomMutashabihat>,
    pub mindmaps: Mindmaps,
    pub part_mindmaps: BTreeMap<String, Value>,
    pub listening_stats: Value,
    pub listening_progress: Value,
    pub review_log: ReviewLog,
    pub cycle_start: Option<String>,
    pub listening_complete: bool,
}

/// A persisted collection and the key it lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    MemoryNodes,
    Settings,
    Decisions,
    CustomMutashabihat,
    Mindmaps,
    PartMindmaps,
    ListeningStats,
    ListeningProgress,
    ReviewErrors,
    CycleStart,
    ListeningComplete,
}

impl Collection {
    pub const ALL: [Collection; 11] = [
        Collection::MemoryNodes,
        Collection::Settings,
        Collection::Decisions,
        Collection::CustomMutashabihat,
        Collection::Mindmaps,
        Collection::PartMindmaps,
        Collection::ListeningStats,
        Collection::ListeningProgress,
        Collection::ReviewErrors,
        Collection::CycleStart,
        Collection::ListeningComplete,
    ];

    /// Storage key, matching the backup document field name
    pub fn key(self) -> &'static str {
        match self {
            Collection::MemoryNodes => "memoryNodes",
            Collection::Settings => "settings",
            Collection::Decisions => "mutashabihatDecisions",
            Collection::CustomMutashabihat => "customMutashabihat",
            Collection::Mindmaps => "mindmaps",
            Collection::PartMindmaps => "partMindmaps",
            Collection::ListeningStats => "listeningStats",
            Collection::ListeningProgress => "listeningProgress",
            Collection::ReviewErrors => "reviewErrors",
            Collection::CycleStart => "cycleStart",
            Collection::ListeningComplete => "listeningComplete",
        }
    }

    fn to_value(self, state: &LocalState) -> Result<Value> {
        let value = match self {
            Collection::MemoryNodes => serde_json::to_value(state.nodes.to_vec())?,
            Collection::Settings => serde_json::to_value(&state.settings)?,
            Collection::Decisions => serde_json::to_value(&state.decisions)?,
            Collection::CustomMutashabihat => serde_json::to_value(&state.custom_mutashabihat)?,
            Collection::Mindmaps => serde_json::to_value(&state.mindmaps)?,
            Collection::PartMindmaps => serde_json::to_value(&state.part_mindmaps)?,
            Collection::ListeningStats => state.listening_stats.clone(),
            Collection::ListeningProgress => state.listening_progress.clone(),
            Collection::ReviewErrors => serde_json::to_value(state.review_log.entries())?,
            Collection::CycleStart => serde_json::to_value(&state.cycle_start)?,
            Collection::ListeningComplete => Value::Bool(state.listening_complete),
        };
        Ok(value)
    }

    fn apply(self, state: &mut LocalState, value: Value) -> Result<()> {
        match self {
            Collection::MemoryNodes => {
                let nodes: Vec<MemoryNode> = serde_json::from_value(value)?;
                state.nodes = MemoryNodeStore::from_nodes(nodes);
            }
            Collection::Settings => state.settings = serde_json::from_value(value)?,
            Collection::Decisions => state.decisions = serde_json::from_value(value)?,
            Collection::CustomMutashabihat => {
                state.custom_mutashabihat = serde_json::from_value(value)?
            }
            Collection::Mindmaps => state.mindmaps = serde_json::from_value(value)?,
            Collection::PartMindmaps => state.part_mindmaps = serde_json::from_value(value)?,
            Collection::ListeningStats => state.listening_stats = value,
            Collection::ListeningProgress => state.listening_progress = value,
            Collection::ReviewErrors => {
                state.review_log = ReviewLog::from_entries(serde_json::from_value(value)?)
            }
            Collection::CycleStart => state.cycle_start = serde_json::from_value(value)?,
            Collection::ListeningComplete => {
                state.listening_complete = serde_json::from_value(value)?
            }
        }
        Ok(())
    }
}

impl LocalState {
    /// Read every collection from `backend`; missing keys keep their defaults
    pub fn load(backend: &dyn KeyValueStore) -> Result<Self> {
        let mut state = Self::default();
        for collection in Collection::ALL {
            if let Some(value) = backend.load(collection.key())? {
                collection.apply(&mut state, value)?;
            }
        }
        Ok(state)
    }
}

// ============================================================================
// STORAGE
// ============================================================================

/// Result of grading one node
#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    /// Node as it was before grading
    pub before: MemoryNode,
    /// Node after the scheduler ran
    pub after: MemoryNode,
    /// Error entry appended for a failed grading
    pub review_error: Option<ReviewError>,
}

/// Owner of the live state and its backend
pub struct Storage {
    backend: Box<dyn KeyValueStore>,
    config: EngineConfig,
    state: LocalState,
    modified_at: Option<DateTime<Utc>>,
}

impl Storage {
    /// Load state from an arbitrary backend
    pub fn new(backend: Box<dyn KeyValueStore>, config: EngineConfig) -> Result<Self> {
        let state = LocalState::load(backend.as_ref())?;
        let modified_at = match backend.load(MODIFIED_AT_KEY)? {
            Some(value) => Some(serde_json::from_value(value)?),
            None => None,
        };
        info!(nodes = state.nodes.len(), "Loaded local state");
        Ok(Self {
            backend,
            config,
            state,
            modified_at,
        })
    }

    /// Open the SQLite database at `path`
    pub fn open(path: &Path, config: EngineConfig) -> Result<Self> {
        Self::new(Box::new(SqliteKvStore::new(path)?), config)
    }

    /// Open `murajaah.db` in the resolved data directory
    pub fn open_default(data_dir: Option<PathBuf>, config: EngineConfig) -> Result<Self> {
        let dir = resolve_data_dir(data_dir)?;
        Self::open(&dir.join(DATABASE_FILE), config)
    }

    /// Empty storage that persists nothing beyond the value's lifetime
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryKvStore::new()),
            config: EngineConfig::default(),
            state: LocalState::default(),
            modified_at: None,
        }
    }

    /// Apply `f` to a copy of the state, persist the touched collections,
    /// then make the copy current. `stamp` also advances `modifiedAt`.
    fn commit<R>(
        &mut self,
        touched: &[Collection],
        stamp: Option<DateTime<Utc>>,
        f: impl FnOnce(&mut LocalState) -> Result<R>,
    ) -> Result<R> {
        let mut next = self.state.clone();
        let out = f(&mut next)?;
        let mut entries = touched
            .iter()
            .map(|c| Ok((c.key(), c.to_value(&next)?)))
            .collect::<Result<Vec<_>>>()?;
        if let Some(at) = stamp {
            entries.push((MODIFIED_AT_KEY, serde_json::to_value(at)?));
        }
        self.backend.save_many(&entries)?;
        self.state = next;
        if stamp.is_some() {
            self.modified_at = stamp;
        }
        Ok(out)
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn state(&self) -> &LocalState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    pub fn review_log(&self) -> &ReviewLog {
        &self.state.review_log
    }

    pub fn mindmaps(&self) -> &Mindmaps {
        &self.state.mindmaps
    }

    /// Time of the last stamped mutation or import
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    /// Node by id
    pub fn node(&self, id: &str) -> Option<&MemoryNode> {
        self.state.nodes.get(id)
    }

    /// Counts by maturity bucket and due status
    pub fn stats(&self, today: NaiveDate) -> MemoryStats {
        self.state.nodes.stats(today)
    }

    // ========================================================================
    // NODES
    // ========================================================================

    /// Node for `key`, materialized with default state on first access
    pub fn get_or_create_node(&mut self, key: &NodeKey, today: NaiveDate) -> Result<MemoryNode> {
        if let Some(node) = self.state.nodes.get(&key.id()) {
            return Ok(node.clone());
        }
        self.commit(&[Collection::MemoryNodes], None, |state| {
            Ok(state.nodes.get_or_create(key, today).clone())
        })
    }

    /// Replace a node wholesale
    pub fn update_node(&mut self, node: MemoryNode, now: DateTime<Utc>) -> Result<()> {
        self.commit(&[Collection::MemoryNodes], Some(now), |state| {
            state.nodes.update(node);
            Ok(())
        })
    }

    /// Put a node back as it was and drop the error entry a grading created
    pub fn restore_node(
        &mut self,
        previous: MemoryNode,
        review_error_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut touched = vec![Collection::MemoryNodes];
        if review_error_id.is_some() {
            touched.push(Collection::ReviewErrors);
        }
        debug!(node_id = %previous.id, "Restoring node");
        self.commit(&touched, Some(now), |state| {
            state.nodes.update(previous);
            if let Some(id) = review_error_id {
                state.review_log.remove(id);
            }
            Ok(())
        })
    }

    /// Run the scheduler on a node; a failure also appends a review error.
    ///
    /// The error is attributed to the narrowest anchor of the chapter diagram
    /// that contains the node's verse range.
    pub fn grade_node(
        &mut self,
        id: &str,
        grade: Grade,
        similarity: &dyn SimilarityLookup,
        now: DateTime<Utc>,
    ) -> Result<GradeOutcome> {
        let before = self
            .state
            .nodes
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        let mut after = before.clone();
        after.scheduler = advance(grade, &before.scheduler, now);

        let review_error = if grade.is_success() {
            None
        } else {
            let anchor_id = match (before.key.surah_id(), before.key.verse_range()) {
                (Some(surah), Some((start, end))) => mindmap_for(&self.state.mindmaps, surah)
                    .and_then(|m| m.anchor_for_range(start, end))
                    .map(|a| a.id.clone()),
                _ => None,
            };
            let groups = similarity.similarity_groups(id);
            Some(ReviewError::for_node(&before, grade, anchor_id, &groups, now))
        };

        let mut touched = vec![Collection::MemoryNodes];
        if review_error.is_some() {
            touched.push(Collection::ReviewErrors);
        }

        let outcome = GradeOutcome {
            before,
            after,
            review_error,
        };
        self.commit(&touched, Some(now), |state| {
            state.nodes.update(outcome.after.clone());
            if let Some(error) = &outcome.review_error {
                state.review_log.push(error.clone());
            }
            Ok(())
        })?;

        debug!(
            node_id = %id,
            grade = grade.value(),
            interval = outcome.after.scheduler.interval,
            due = %outcome.after.scheduler.due_date,
            "Graded node"
        );
        Ok(outcome)
    }

    /// Defer a node to tomorrow
    pub fn postpone_node(&mut self, id: &str, now: DateTime<Utc>) -> Result<MemoryNode> {
        self.commit(&[Collection::MemoryNodes], Some(now), |state| {
            state
                .nodes
                .postpone(id, now)
                .ok_or_else(|| StorageError::NotFound(id.to_string()))
        })
    }

    /// Overwrite a node's schedule with the canonical state of `bucket`.
    ///
    /// The node's last success is kept, so failures it already resolved stay
    /// resolved.
    pub fn override_maturity(
        &mut self,
        id: &str,
        bucket: Maturity,
        now: DateTime<Utc>,
    ) -> Result<MemoryNode> {
        self.commit(&[Collection::MemoryNodes], Some(now), |state| {
            let mut node = state
                .nodes
                .get(id)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
            let last_success = node.scheduler.last_success;
            node.scheduler = SchedulingState {
                last_success,
                ..reset_to(bucket, now)
            };
            state.nodes.update(node.clone());
            Ok(node)
        })
    }

    /// Due nodes in `scope`, excluding skipped units and suspended anchors.
    ///
    /// Nodes a section walk materializes are persisted.
    pub fn due_set(
        &mut self,
        scope: &ReviewScope,
        catalog: &dyn ContentCatalog,
        today: NaiveDate,
    ) -> Result<Vec<MemoryNode>> {
        let suspended = self.suspended_anchors();
        let mut nodes = self.state.nodes.clone();
        let due = {
            let filter = DueFilter {
                catalog,
                skipped_units: &self.state.settings.skipped_units,
                suspended: &suspended,
            };
            nodes.due_set(scope, &filter, today)
        };

        if nodes.len() != self.state.nodes.len() {
            let created = nodes.len() - self.state.nodes.len();
            self.commit(&[Collection::MemoryNodes], None, |state| {
                state.nodes = nodes;
                Ok(())
            })?;
            debug!(%scope, created, "Materialized nodes for due set");
        }
        Ok(due)
    }

    // ========================================================================
    // SUSPENSION
    // ========================================================================

    /// Anchors currently excluded from review
    pub fn suspended_anchors(&self) -> Vec<SuspendedAnchor> {
        self.state.review_log.suspended_anchors(
            &self.state.nodes,
            &self.state.mindmaps,
            self.config.suspension_threshold,
        )
    }

    /// Unresolved failures counted against one anchor
    pub fn anchor_failure_count(&self, surah_id: u32, anchor_id: &str) -> usize {
        self.state.review_log.anchor_failure_count(
            surah_id,
            anchor_id,
            &self.state.nodes,
            &self.state.mindmaps,
        )
    }

    /// Mark an anchor's content as fixed, resolving every earlier failure
    pub fn clear_suspension(&mut self, surah_id: u32, anchor_id: &str, now: DateTime<Utc>) -> Result<()> {
        self.commit(&[Collection::Mindmaps], Some(now), |state| {
            let anchor = state
                .mindmaps
                .get_mut(&surah_id.to_string())
                .and_then(|m| m.anchor_mut(anchor_id))
                .ok_or_else(|| StorageError::NotFound(format!("anchor {surah_id}/{anchor_id}")))?;
            anchor.cleared_at = Some(now);
            Ok(())
        })?;
        info!(surah_id, anchor_id, "Cleared anchor suspension");
        Ok(())
    }

    // ========================================================================
    // OTHER COLLECTIONS
    // ========================================================================

    /// Replace the settings, stamping `updatedAt`
    pub fn set_settings(&mut self, mut settings: Settings, now: DateTime<Utc>) -> Result<()> {
        settings.updated_at = Some(now);
        self.commit(&[Collection::Settings], Some(now), |state| {
            state.settings = settings;
            Ok(())
        })
    }

    /// Store the user's verdict for a similar-phrase pair
    pub fn record_decision(
        &mut self,
        key: &str,
        decision: MutashabihatDecision,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.commit(&[Collection::Decisions], Some(now), |state| {
            state.decisions.insert(key.to_string(), decision);
            Ok(())
        })
    }

    /// Add a user-defined similar-phrase entry, replacing one with the same id
    pub fn add_custom_mutashabihat(
        &mut self,
        entry: CustomMutashabihat,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.commit(&[Collection::CustomMutashabihat], Some(now), |state| {
            match state.custom_mutashabihat.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry,
                None => state.custom_mutashabihat.push(entry),
            }
            Ok(())
        })
    }

    /// Store the diagram of a chapter
    pub fn set_mindmap(&mut self, surah_id: u32, mindmap: Mindmap, now: DateTime<Utc>) -> Result<()> {
        self.commit(&[Collection::Mindmaps], Some(now), |state| {
            state.mindmaps.insert(surah_id.to_string(), mindmap);
            Ok(())
        })
    }

    pub fn set_listening_progress(&mut self, progress: Value, now: DateTime<Utc>) -> Result<()> {
        self.commit(&[Collection::ListeningProgress], Some(now), |state| {
            state.listening_progress = progress;
            Ok(())
        })
    }

    // ========================================================================
    // BACKUP
    // ========================================================================

    /// Snapshot every collection
    pub fn export(&self, now: DateTime<Utc>) -> BackupDocument {
        backup::export(&self.state, now)
    }

    /// Snapshot dated by the last local change, for handing to a merge
    pub fn snapshot(&self) -> BackupDocument {
        backup::export(
            &self.state,
            self.modified_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        )
    }

    /// Snapshot as pretty JSON
    pub fn export_json(&self, now: DateTime<Utc>) -> Result<String> {
        backup::encode(&self.export(now))
    }

    /// Replace every collection with the document's contents, atomically.
    ///
    /// The document's `exportedAt` becomes the local `modifiedAt`.
    pub fn import(&mut self, doc: BackupDocument) -> Result<()> {
        backup::validate(&doc)?;
        let exported_at = doc.exported_at;
        let next = LocalState::from_document(doc);
        let mut entries = Collection::ALL
            .iter()
            .map(|c| Ok((c.key(), c.to_value(&next)?)))
            .collect::<Result<Vec<_>>>()?;
        entries.push((MODIFIED_AT_KEY, serde_json::to_value(exported_at)?));
        self.backend.save_many(&entries)?;
        self.state = next;
        self.modified_at = Some(exported_at);
        info!(
            nodes = self.state.nodes.len(),
            review_errors = self.state.review_log.len(),
            %exported_at,
            "Imported backup"
        );
        Ok(())
    }

    /// Decode and import backup JSON; nothing changes if it is rejected
    pub fn import_json(&mut self, json: &str) -> Result<()> {
        let doc = backup::decode(json)?;
        self.import(doc)
    }

    // ========================================================================
    // SYNC BOOKKEEPING
    // ========================================================================

    /// When the last sync completed, if ever
    pub fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        match self.backend.load(LAST_SYNC_KEY)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Record a completed sync
    pub fn mark_synced(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.backend.save(LAST_SYNC_KEY, &serde_json::to_value(at)?)
    }
}
