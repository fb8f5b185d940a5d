//! Backup Document - the complete exportable state
//!
//! One JSON document holding every persisted collection. It is a value-type
//! snapshot with no reference back to the live store.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::memory::MemoryNode;
use crate::review::{Mindmaps, ReviewError};

/// Current backup format version
pub const BACKUP_FORMAT_VERSION: u32 = 1;

fn current_version() -> u32 {
    BACKUP_FORMAT_VERSION
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

// ============================================================================
// SETTINGS
// ============================================================================

/// User settings, compared as a whole by `updated_at` during merge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Last local edit of any setting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Section the user is currently reviewing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_part_id: Option<u32>,
    /// Unit ids the user chose to skip
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub skipped_units: BTreeSet<String>,
    /// Presentation preferences the engine carries but does not read
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// SIMILAR-PHRASE STATE
// ============================================================================

/// The user's verdict on a similar-phrase pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutashabihatDecision {
    #[serde(default)]
    pub decision: String,
    /// ISO timestamp of confirmation; empty when never confirmed
    #[serde(default)]
    pub confirmed_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A user-defined similar-phrase entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMutashabihat {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// DOCUMENT
// ============================================================================

/// Full exportable state.
///
/// `settings` and `memoryNodes` are required; every other collection defaults
/// when absent and unknown top-level keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    #[serde(default = "current_version")]
    pub version: u32,
    pub settings: Settings,
    pub memory_nodes: Vec<MemoryNode>,
    #[serde(default)]
    pub mutashabihat_decisions: BTreeMap<String, MutashabihatDecision>,
    #[serde(default)]
    pub custom_mutashabihat: Vec<CustomMutashabihat>,
    #[serde(default)]
    pub mindmaps: Mindmaps,
    #[serde(default)]
    pub part_mindmaps: BTreeMap<String, Value>,
    #[serde(default)]
    pub listening_stats: Value,
    #[serde(default)]
    pub listening_progress: Value,
    #[serde(default)]
    pub review_errors: Vec<ReviewError>,
    #[serde(default)]
    pub cycle_start: Option<String>,
    #[serde(default)]
    pub listening_complete: bool,
    /// Defaults to the Unix epoch so undated documents lose every comparison
    #[serde(default = "epoch")]
    pub exported_at: DateTime<Utc>,
}

impl BackupDocument {
    /// Document with no tracked state, stamped at `exported_at`
    pub fn empty(exported_at: DateTime<Utc>) -> Self {
        Self {
            version: BACKUP_FORMAT_VERSION,
            settings: Settings::default(),
            memory_nodes: Vec::new(),
            mutashabihat_decisions: BTreeMap::new(),
            custom_mutashabihat: Vec::new(),
            mindmaps: Mindmaps::new(),
            part_mindmaps: BTreeMap::new(),
            listening_stats: Value::Null,
            listening_progress: Value::Null,
            review_errors: Vec::new(),
            cycle_start: None,
            listening_complete: false,
            exported_at,
        }
    }

    /// Node by id
    pub fn node(&self, id: &str) -> Option<&MemoryNode> {
        self.memory_nodes.iter().find(|n| n.id == id)
    }
}
