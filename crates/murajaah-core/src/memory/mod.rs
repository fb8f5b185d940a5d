//! Memory module - Core types and data structures
//!
//! Implements the review model with:
//! - Memory nodes keyed by deterministic ids
//! - SM-2 scheduling state per node
//! - Scoped due-set selection

mod node;
mod store;

pub use node::{MemoryNode, NodeKey, NodeType};
pub use store::{DueFilter, MemoryNodeStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// REVIEW SCOPE
// ============================================================================

/// Which part of the collection a review session covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "partId")]
pub enum ReviewScope {
    /// One section, walked in catalog order
    Section(u32),
    /// Every materialized node, in id order
    All,
}

impl std::fmt::Display for ReviewScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewScope::Section(part_id) => write!(f, "section {}", part_id),
            ReviewScope::All => write!(f, "all"),
        }
    }
}

// ============================================================================
// MEMORY STATISTICS
// ============================================================================

/// Statistics about the node collection
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    /// Total number of materialized nodes
    pub total_nodes: usize,
    /// Nodes due today (before exclusions)
    pub due_today: usize,
    /// Nodes per maturity bucket
    pub reset: usize,
    pub medium: usize,
    pub strong: usize,
    pub mastered: usize,
    /// Most recent grading across all nodes
    pub newest_review: Option<DateTime<Utc>>,
}
