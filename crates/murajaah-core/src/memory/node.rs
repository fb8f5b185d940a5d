//! Memory Node - The fundamental unit of review
//!
//! Each node represents one memorization target with:
//! - A key identifying what is memorized (verse range or diagram)
//! - A deterministic id derived from that key
//! - SM-2 scheduling state

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::scheduler::SchedulingState;

// ============================================================================
// NODE TYPES
// ============================================================================

/// Kind of reviewable unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// A contiguous range of verses within one chapter
    Verse,
    /// Whole-chapter diagram
    Mindmap,
    /// Whole-section diagram
    PartMindmap,
}

impl NodeType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Verse => "verse",
            NodeType::Mindmap => "mindmap",
            NodeType::PartMindmap => "part_mindmap",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "verse" => Some(NodeType::Verse),
            "mindmap" => Some(NodeType::Mindmap),
            "part_mindmap" => Some(NodeType::PartMindmap),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// NODE KEY
// ============================================================================

/// What a node memorizes. Serialized flat into the node as a `type` tag plus
/// the variant's discriminator fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum NodeKey {
    /// Verse range `start_verse..=end_verse` of chapter `surah_id`
    Verse {
        surah_id: u32,
        start_verse: u32,
        end_verse: u32,
    },
    /// Diagram of chapter `surah_id`
    Mindmap { surah_id: u32 },
    /// Diagram of section `part_id`
    PartMindmap { part_id: u32 },
}

impl NodeKey {
    /// Verse range key
    pub fn verse(surah_id: u32, start_verse: u32, end_verse: u32) -> Self {
        NodeKey::Verse {
            surah_id,
            start_verse,
            end_verse,
        }
    }

    /// Deterministic node id. The same key always yields the same id.
    pub fn id(&self) -> String {
        match self {
            NodeKey::Verse {
                surah_id,
                start_verse,
                end_verse,
            } => format!("verse:{}:{}-{}", surah_id, start_verse, end_verse),
            NodeKey::Mindmap { surah_id } => format!("mindmap:{}", surah_id),
            NodeKey::PartMindmap { part_id } => format!("part_mindmap:{}", part_id),
        }
    }

    /// Inverse of [`NodeKey::id`]
    pub fn parse_id(id: &str) -> Option<Self> {
        let (kind, rest) = id.split_once(':')?;
        match kind {
            "verse" => {
                let (surah, range) = rest.split_once(':')?;
                let (start, end) = range.split_once('-')?;
                Some(NodeKey::verse(
                    surah.parse().ok()?,
                    start.parse().ok()?,
                    end.parse().ok()?,
                ))
            }
            "mindmap" => Some(NodeKey::Mindmap {
                surah_id: rest.parse().ok()?,
            }),
            "part_mindmap" => Some(NodeKey::PartMindmap {
                part_id: rest.parse().ok()?,
            }),
            _ => None,
        }
    }

    /// Node type tag
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKey::Verse { .. } => NodeType::Verse,
            NodeKey::Mindmap { .. } => NodeType::Mindmap,
            NodeKey::PartMindmap { .. } => NodeType::PartMindmap,
        }
    }

    /// Chapter this node belongs to, if any
    pub fn surah_id(&self) -> Option<u32> {
        match self {
            NodeKey::Verse { surah_id, .. } | NodeKey::Mindmap { surah_id } => Some(*surah_id),
            NodeKey::PartMindmap { .. } => None,
        }
    }

    /// Section this node belongs to, if any
    pub fn part_id(&self) -> Option<u32> {
        match self {
            NodeKey::PartMindmap { part_id } => Some(*part_id),
            _ => None,
        }
    }

    /// Verse range, for verse nodes
    pub fn verse_range(&self) -> Option<(u32, u32)> {
        match self {
            NodeKey::Verse {
                start_verse,
                end_verse,
                ..
            } => Some((*start_verse, *end_verse)),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

// ============================================================================
// MEMORY NODE
// ============================================================================

/// A scheduled reviewable unit.
///
/// Nodes are always replaced whole; there is no partial-field update, so every
/// stored value is internally consistent and the merge engine only ever has to
/// pick one complete node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryNode {
    /// Deterministic id (see [`NodeKey::id`])
    pub id: String,
    /// What is memorized
    #[serde(flatten)]
    pub key: NodeKey,
    /// SM-2 state
    pub scheduler: SchedulingState,
}

impl MemoryNode {
    /// Create a node with default scheduling state, due on `today`
    pub fn new(key: NodeKey, today: NaiveDate) -> Self {
        Self {
            id: key.id(),
            key,
            scheduler: SchedulingState::new(today),
        }
    }

    /// Node type tag
    pub fn node_type(&self) -> NodeType {
        self.key.node_type()
    }

    /// Check if this node is due for review on `today`
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.scheduler.is_due(today)
    }
}

// ============================================================================
// TESTS
// ============================================================================
