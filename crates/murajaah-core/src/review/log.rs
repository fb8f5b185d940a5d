//! Review Error log
//!
//! Every failed grading appends an immutable [`ReviewError`]. Failure counts
//! and anchor suspension are derived from the log on read; nothing else keeps a
//! counter that sync would have to reconcile.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::SimilarityGroup;
use crate::memory::{MemoryNode, MemoryNodeStore, NodeType};
use crate::scheduler::Grade;

use super::anchor::{mindmap_for, Mindmaps, SuspendedAnchor};

/// Immutable record of a failed grading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewError {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub node_id: String,
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surah_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_verse: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_verse: Option<u32>,
    pub grade: Grade,
    /// Anchor the failed range belonged to when the error was recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_id: Option<String>,
    /// Similar-phrase groups the unit participates in
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub similarity_group_ids: Vec<String>,
}

impl ReviewError {
    /// Build an error entry for a failed grading of `node`
    pub fn for_node(
        node: &MemoryNode,
        grade: Grade,
        anchor_id: Option<String>,
        similarity: &[SimilarityGroup],
        now: DateTime<Utc>,
    ) -> Self {
        let range = node.key.verse_range();
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: now,
            node_id: node.id.clone(),
            node_type: node.node_type(),
            surah_id: node.key.surah_id(),
            part_id: node.key.part_id(),
            start_verse: range.map(|(start, _)| start),
            end_verse: range.map(|(_, end)| end),
            grade,
            anchor_id,
            similarity_group_ids: similarity.iter().map(|g| g.id.clone()).collect(),
        }
    }
}

/// Append-only log of review errors (entries are only removed by undo)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewLog {
    entries: Vec<ReviewError>,
}

impl ReviewLog {
    /// Wrap existing entries
    pub fn from_entries(entries: Vec<ReviewError>) -> Self {
        Self { entries }
    }

    /// All entries, oldest first
    pub fn entries(&self) -> &[ReviewError] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry
    pub fn push(&mut self, error: ReviewError) {
        self.entries.push(error);
    }

    /// Remove an entry by id
    pub fn remove(&mut self, id: &str) -> Option<ReviewError> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Entries recorded against one node
    pub fn for_node<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a ReviewError> + 'a {
        self.entries.iter().filter(move |e| e.node_id == node_id)
    }

    /// Latest time each anchor had its failures resolved.
    ///
    /// A success on any node the anchor covers resolves every failure logged
    /// before it, as does clearing the anchor. An anchor covers the nodes that
    /// failed against it and every verse range inside its bounds.
    fn resolved_at<'a>(
        &'a self,
        nodes: &MemoryNodeStore,
        mindmaps: &Mindmaps,
    ) -> BTreeMap<(u32, &'a str), DateTime<Utc>> {
        let mut failed: BTreeMap<(u32, &str), BTreeSet<&str>> = BTreeMap::new();
        for error in &self.entries {
            if let (Some(surah_id), Some(anchor_id)) = (error.surah_id, error.anchor_id.as_deref()) {
                failed
                    .entry((surah_id, anchor_id))
                    .or_default()
                    .insert(error.node_id.as_str());
            }
        }

        failed
            .into_iter()
            .filter_map(|((surah_id, anchor_id), failed_ids)| {
                let anchor = mindmap_for(mindmaps, surah_id).and_then(|m| m.anchor(anchor_id));
                let inside = |node: &MemoryNode| {
                    anchor.is_some_and(|a| {
                        node.key.surah_id() == Some(surah_id)
                            && node
                                .key
                                .verse_range()
                                .is_some_and(|(start, end)| a.contains(start, end))
                    })
                };
                let last_success = nodes
                    .iter()
                    .filter(|n| failed_ids.contains(n.id.as_str()) || inside(n))
                    .filter_map(|n| n.scheduler.last_success)
                    .max();
                // None sorts below any time
                let resolved = last_success.max(anchor.and_then(|a| a.cleared_at))?;
                Some(((surah_id, anchor_id), resolved))
            })
            .collect()
    }

    fn is_unresolved(
        error: &ReviewError,
        resolved: &BTreeMap<(u32, &str), DateTime<Utc>>,
    ) -> bool {
        let (Some(surah_id), Some(anchor_id)) = (error.surah_id, error.anchor_id.as_deref()) else {
            return false;
        };
        resolved
            .get(&(surah_id, anchor_id))
            .is_none_or(|t| error.timestamp > *t)
    }

    /// Unresolved failures counted against an anchor
    pub fn anchor_failure_count(
        &self,
        surah_id: u32,
        anchor_id: &str,
        nodes: &MemoryNodeStore,
        mindmaps: &Mindmaps,
    ) -> usize {
        let resolved = self.resolved_at(nodes, mindmaps);
        self.entries
            .iter()
            .filter(|e| e.surah_id == Some(surah_id) && e.anchor_id.as_deref() == Some(anchor_id))
            .filter(|e| Self::is_unresolved(e, &resolved))
            .count()
    }

    /// Anchors whose unresolved failure count reached `threshold`
    pub fn suspended_anchors(
        &self,
        nodes: &MemoryNodeStore,
        mindmaps: &Mindmaps,
        threshold: usize,
    ) -> Vec<SuspendedAnchor> {
        let resolved = self.resolved_at(nodes, mindmaps);
        let mut tallies: BTreeMap<(u32, &str), SuspendedAnchor> = BTreeMap::new();

        for error in &self.entries {
            let (Some(surah_id), Some(anchor_id)) = (error.surah_id, error.anchor_id.as_deref())
            else {
                continue;
            };
            if !Self::is_unresolved(error, &resolved) {
                continue;
            }
            let entry = tallies
                .entry((surah_id, anchor_id))
                .or_insert_with(|| SuspendedAnchor {
                    surah_id,
                    anchor_id: anchor_id.to_string(),
                    failures: 0,
                    range: mindmap_for(mindmaps, surah_id)
                        .and_then(|m| m.anchor(anchor_id))
                        .map(|a| (a.start_verse, a.end_verse)),
                    node_ids: Default::default(),
                });
            entry.failures += 1;
            entry.node_ids.insert(error.node_id.clone());
        }

        tallies
            .into_values()
            .filter(|s| s.failures >= threshold)
            .collect()
    }
}
