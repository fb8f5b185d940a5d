//! Chapter diagrams and their anchors
//!
//! An anchor is a user-labelled verse range inside a chapter diagram. Review
//! failures are tallied per anchor; an anchor with too many unresolved
//! failures is suspended until the content is fixed or a success is recorded.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Labelled verse range inside a chapter diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub start_verse: u32,
    pub end_verse: u32,
    /// Set when the content-fix workflow clears a suspension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleared_at: Option<DateTime<Utc>>,
    /// Diagram-specific fields the engine does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Anchor {
    /// Anchor covering `start_verse..=end_verse`
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        start_verse: u32,
        end_verse: u32,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            start_verse,
            end_verse,
            cleared_at: None,
            extra: Map::new(),
        }
    }

    /// Whether the verse range lies entirely inside this anchor
    pub fn contains(&self, start_verse: u32, end_verse: u32) -> bool {
        start_verse >= self.start_verse && end_verse <= self.end_verse
    }
}

/// Chapter diagram
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mindmap {
    #[serde(default)]
    pub anchors: Vec<Anchor>,
    /// Layout and content fields owned by the diagram editor
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Mindmap {
    /// Anchor by id
    pub fn anchor(&self, anchor_id: &str) -> Option<&Anchor> {
        self.anchors.iter().find(|a| a.id == anchor_id)
    }

    /// Mutable anchor by id
    pub fn anchor_mut(&mut self, anchor_id: &str) -> Option<&mut Anchor> {
        self.anchors.iter_mut().find(|a| a.id == anchor_id)
    }

    /// Narrowest anchor containing the verse range
    pub fn anchor_for_range(&self, start_verse: u32, end_verse: u32) -> Option<&Anchor> {
        self.anchors
            .iter()
            .filter(|a| a.contains(start_verse, end_verse))
            .min_by_key(|a| a.end_verse.saturating_sub(a.start_verse))
    }
}

/// Chapter diagrams keyed by chapter id (as a string, matching the JSON object keys)
pub type Mindmaps = BTreeMap<String, Mindmap>;

/// Mindmap of `surah_id`, if one exists
pub fn mindmap_for(mindmaps: &Mindmaps, surah_id: u32) -> Option<&Mindmap> {
    mindmaps.get(&surah_id.to_string())
}

/// An anchor currently excluded from review
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspendedAnchor {
    pub surah_id: u32,
    pub anchor_id: String,
    /// Unresolved failures counted against the anchor
    pub failures: usize,
    /// Verse range, when the anchor still exists in its diagram
    pub range: Option<(u32, u32)>,
    /// Nodes whose failures were counted
    pub node_ids: BTreeSet<String>,
}

impl SuspendedAnchor {
    /// Whether a node falls under this suspension
    pub fn covers(&self, node_id: &str, surah_id: Option<u32>, range: Option<(u32, u32)>) -> bool {
        if self.node_ids.contains(node_id) {
            return true;
        }
        match (surah_id, range, self.range) {
            (Some(surah), Some((start, end)), Some((a_start, a_end))) => {
                surah == self.surah_id && start >= a_start && end <= a_end
            }
            _ => false,
        }
    }
}
