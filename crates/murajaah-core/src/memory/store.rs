//! Memory Node Store
//!
//! In-memory collection of nodes keyed by deterministic id. Owns lazy
//! creation, whole-node replacement and due-set selection.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::catalog::{ContentCatalog, UnitRef};
use crate::review::SuspendedAnchor;
use crate::scheduler::{add_days, Maturity};

use super::node::{MemoryNode, NodeKey};
use super::{MemoryStats, ReviewScope};

/// Everything that can keep a due node out of the review queue
pub struct DueFilter<'a> {
    /// Catalog providing section units and global exclusions
    pub catalog: &'a dyn ContentCatalog,
    /// Units the user chose to skip
    pub skipped_units: &'a BTreeSet<String>,
    /// Anchors with too many unresolved failures
    pub suspended: &'a [SuspendedAnchor],
}

impl DueFilter<'_> {
    fn excludes(&self, unit_id: &str, node: &MemoryNode) -> bool {
        if self.catalog.is_unit_excluded(unit_id) || self.skipped_units.contains(unit_id) {
            return true;
        }
        let surah = node.key.surah_id();
        let range = node.key.verse_range();
        self.suspended
            .iter()
            .any(|s| s.covers(&node.id, surah, range))
    }
}

/// Canonical node collection for the running process
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryNodeStore {
    nodes: BTreeMap<String, MemoryNode>,
}

impl MemoryNodeStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a node list; later duplicates of an id replace earlier ones
    pub fn from_nodes(nodes: impl IntoIterator<Item = MemoryNode>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
        }
    }

    /// Number of materialized nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node has been materialized yet
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by id
    pub fn get(&self, id: &str) -> Option<&MemoryNode> {
        self.nodes.get(id)
    }

    /// Nodes in id order
    pub fn iter(&self) -> impl Iterator<Item = &MemoryNode> {
        self.nodes.values()
    }

    /// Snapshot of all nodes in id order
    pub fn to_vec(&self) -> Vec<MemoryNode> {
        self.nodes.values().cloned().collect()
    }

    /// Look up the node for `key`, creating it with default state if absent.
    pub fn get_or_create(&mut self, key: &NodeKey, today: NaiveDate) -> &MemoryNode {
        self.nodes.entry(key.id()).or_insert_with(|| {
            debug!(node_id = %key, "Materializing memory node");
            MemoryNode::new(key.clone(), today)
        })
    }

    /// Replace a node wholesale by id
    pub fn update(&mut self, node: MemoryNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Defer a node to tomorrow without touching interval, repetition or ease
    pub fn postpone(&mut self, id: &str, now: DateTime<Utc>) -> Option<MemoryNode> {
        let node = self.nodes.get_mut(id)?;
        node.scheduler.due_date = add_days(now.date_naive(), 1);
        node.scheduler.last_review = Some(now);
        Some(node.clone())
    }

    /// Nodes due on `today` within `scope`, in a stable order.
    ///
    /// Section scopes follow catalog order and materialize missing nodes;
    /// the whole-collection scope follows id order.
    pub fn due_set(
        &mut self,
        scope: &ReviewScope,
        filter: &DueFilter<'_>,
        today: NaiveDate,
    ) -> Vec<MemoryNode> {
        let units: Vec<UnitRef> = match scope {
            ReviewScope::Section(part_id) => filter.catalog.section_units(*part_id),
            ReviewScope::All => self
                .nodes
                .values()
                .map(|n| UnitRef::new(n.key.clone()))
                .collect(),
        };

        let mut due = Vec::new();
        let mut seen = BTreeSet::new();
        for unit in units {
            let node = self.get_or_create(&unit.key, today);
            if !seen.insert(node.id.clone()) {
                continue;
            }
            if node.is_due(today) && !filter.excludes(&unit.id, node) {
                due.push(node.clone());
            }
        }
        due
    }

    /// Counts by maturity bucket and due status
    pub fn stats(&self, today: NaiveDate) -> MemoryStats {
        let mut stats = MemoryStats {
            total_nodes: self.nodes.len(),
            ..Default::default()
        };
        for node in self.nodes.values() {
            if node.is_due(today) {
                stats.due_today += 1;
            }
            match node.scheduler.maturity() {
                Maturity::Reset => stats.reset += 1,
                Maturity::Medium => stats.medium += 1,
                Maturity::Strong => stats.strong += 1,
                Maturity::Mastered => stats.mastered += 1,
            }
            if let Some(reviewed) = node.scheduler.last_review {
                stats.newest_review = stats.newest_review.max(Some(reviewed));
            }
        }
        stats
    }
}
