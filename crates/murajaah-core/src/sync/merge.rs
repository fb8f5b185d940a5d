//! Merge Engine
//!
//! Reconciles two backup documents field by field. The merge is a pure
//! function of its inputs and `now`, which only stamps `exportedAt` on a
//! changed result. Merging a document with itself reports no change.
//!
//! Rules per collection:
//! - settings: whole-object last-write-wins on `updatedAt`
//! - memory nodes: per-node last-write-wins on `lastReview`
//! - similar-phrase decisions: per-key, later `confirmedAt` wins
//! - custom similar-phrase entries: union by id
//! - everything else: document-level last-write-wins on `exportedAt`

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::backup::{
    BackupDocument, CustomMutashabihat, MutashabihatDecision, Settings, BACKUP_FORMAT_VERSION,
};
use crate::memory::MemoryNode;

/// What each rule contributed to a merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Settings differ between the sides (taken from remote only if newer)
    pub settings_changed: bool,
    /// Nodes taken from remote, new or newer
    pub nodes_from_remote: usize,
    /// Decisions taken from remote, new or newer
    pub decisions_from_remote: usize,
    /// Custom entries only the remote had
    pub custom_entries_added: usize,
    /// Collections replaced wholesale by the newer remote document
    pub collections_replaced: Vec<&'static str>,
    /// Local document is newer than remote
    pub local_ahead: bool,
}

impl MergeReport {
    /// Whether any rule fired
    pub fn changed(&self) -> bool {
        self.settings_changed
            || self.nodes_from_remote > 0
            || self.decisions_from_remote > 0
            || self.custom_entries_added > 0
            || !self.collections_replaced.is_empty()
            || self.local_ahead
    }
}

/// Merged document plus whether it differs from what either side should keep
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub merged: BackupDocument,
    pub changed: bool,
    pub report: MergeReport,
}

/// Reconcile `local` with `remote`
pub fn merge(local: &BackupDocument, remote: &BackupDocument, now: DateTime<Utc>) -> MergeOutcome {
    let mut report = MergeReport::default();

    let (settings, settings_changed) = merge_settings(&local.settings, &remote.settings);
    report.settings_changed = settings_changed;

    let (memory_nodes, nodes_from_remote) = merge_nodes(&local.memory_nodes, &remote.memory_nodes);
    report.nodes_from_remote = nodes_from_remote;

    let (mutashabihat_decisions, decisions_from_remote) =
        merge_decisions(&local.mutashabihat_decisions, &remote.mutashabihat_decisions);
    report.decisions_from_remote = decisions_from_remote;

    let (custom_mutashabihat, custom_entries_added) =
        merge_custom(&local.custom_mutashabihat, &remote.custom_mutashabihat);
    report.custom_entries_added = custom_entries_added;

    let mut merged = BackupDocument {
        version: BACKUP_FORMAT_VERSION,
        settings,
        memory_nodes,
        mutashabihat_decisions,
        custom_mutashabihat,
        ..local.clone()
    };

    if remote.exported_at > local.exported_at {
        report.collections_replaced = replace_collections(&mut merged, remote);
    }
    report.local_ahead = local.exported_at > remote.exported_at;

    let changed = report.changed();
    merged.exported_at = if changed { now } else { local.exported_at };

    debug!(
        changed,
        nodes_from_remote = report.nodes_from_remote,
        decisions_from_remote = report.decisions_from_remote,
        custom_entries_added = report.custom_entries_added,
        replaced = report.collections_replaced.len(),
        "Merged backup documents"
    );

    MergeOutcome {
        merged,
        changed,
        report,
    }
}

/// Newer `updatedAt` wins wholesale; any difference counts as a change
fn merge_settings(local: &Settings, remote: &Settings) -> (Settings, bool) {
    if remote.updated_at > local.updated_at {
        (remote.clone(), true)
    } else {
        (local.clone(), local != remote)
    }
}

/// Later `lastReview` wins per node; a tie keeps local.
///
/// Output keeps local order, followed by remote-only nodes in remote order.
fn merge_nodes(local: &[MemoryNode], remote: &[MemoryNode]) -> (Vec<MemoryNode>, usize) {
    let remote_by_id: BTreeMap<&str, &MemoryNode> =
        remote.iter().map(|n| (n.id.as_str(), n)).collect();
    let local_ids: BTreeSet<&str> = local.iter().map(|n| n.id.as_str()).collect();
    let mut taken = 0;

    let mut merged: Vec<MemoryNode> = local
        .iter()
        .map(|node| match remote_by_id.get(node.id.as_str()) {
            Some(theirs) if theirs.scheduler.last_review > node.scheduler.last_review => {
                taken += 1;
                (*theirs).clone()
            }
            _ => node.clone(),
        })
        .collect();

    let mut appended = BTreeSet::new();
    for node in remote {
        if !local_ids.contains(node.id.as_str()) && appended.insert(node.id.as_str()) {
            taken += 1;
            merged.push(node.clone());
        }
    }

    (merged, taken)
}

/// Later `confirmedAt` wins per key (plain string order); a tie keeps local
fn merge_decisions(
    local: &BTreeMap<String, MutashabihatDecision>,
    remote: &BTreeMap<String, MutashabihatDecision>,
) -> (BTreeMap<String, MutashabihatDecision>, usize) {
    let mut merged = local.clone();
    let mut taken = 0;
    for (key, theirs) in remote {
        let take = match local.get(key) {
            None => true,
            Some(ours) => theirs.confirmed_at > ours.confirmed_at,
        };
        if take {
            merged.insert(key.clone(), theirs.clone());
            taken += 1;
        }
    }
    (merged, taken)
}

/// Union by id, appending remote-only entries
fn merge_custom(
    local: &[CustomMutashabihat],
    remote: &[CustomMutashabihat],
) -> (Vec<CustomMutashabihat>, usize) {
    let mut ids: BTreeSet<&str> = local.iter().map(|e| e.id.as_str()).collect();
    let mut merged = local.to_vec();
    let mut added = 0;
    for entry in remote {
        if ids.insert(entry.id.as_str()) {
            merged.push(entry.clone());
            added += 1;
        }
    }
    (merged, added)
}

/// Replace each remaining collection that differs from the newer remote
fn replace_collections(merged: &mut BackupDocument, remote: &BackupDocument) -> Vec<&'static str> {
    let mut replaced = Vec::new();

    fn take<T: Clone + PartialEq>(
        name: &'static str,
        ours: &mut T,
        theirs: &T,
        replaced: &mut Vec<&'static str>,
    ) {
        if ours != theirs {
            *ours = theirs.clone();
            replaced.push(name);
        }
    }

    take("mindmaps", &mut merged.mindmaps, &remote.mindmaps, &mut replaced);
    take(
        "partMindmaps",
        &mut merged.part_mindmaps,
        &remote.part_mindmaps,
        &mut replaced,
    );
    take(
        "listeningStats",
        &mut merged.listening_stats,
        &remote.listening_stats,
        &mut replaced,
    );
    take(
        "listeningProgress",
        &mut merged.listening_progress,
        &remote.listening_progress,
        &mut replaced,
    );
    take(
        "reviewErrors",
        &mut merged.review_errors,
        &remote.review_errors,
        &mut replaced,
    );
    take(
        "cycleStart",
        &mut merged.cycle_start,
        &remote.cycle_start,
        &mut replaced,
    );
    take(
        "listeningComplete",
        &mut merged.listening_complete,
        &remote.listening_complete,
        &mut replaced,
    );

    replaced
}
