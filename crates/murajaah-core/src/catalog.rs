//! Content catalog and similarity lookups
//!
//! The engine never owns chapter/section metadata or phrase-similarity data;
//! it consumes them through these traits. [`StaticCatalog`] is a plain
//! in-memory implementation that can be loaded from JSON.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::memory::NodeKey;

/// Catalog error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Catalog JSON could not be parsed
    #[error("Invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============================================================================
// UNITS
// ============================================================================

/// One reviewable unit listed by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRef {
    /// Stable unit id, used for exclusion and skip lists
    pub id: String,
    /// Node key the unit materializes as
    pub key: NodeKey,
}

impl UnitRef {
    /// Unit whose id is the node id of `key`
    pub fn new(key: NodeKey) -> Self {
        Self { id: key.id(), key }
    }
}

/// Read-only content catalog
pub trait ContentCatalog {
    /// Units belonging to section `part_id`, in review order
    fn section_units(&self, part_id: u32) -> Vec<UnitRef>;

    /// Whether a unit is excluded from review altogether
    fn is_unit_excluded(&self, _unit_id: &str) -> bool {
        false
    }
}

/// Catalog with no sections and no exclusions
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCatalog;

impl ContentCatalog for EmptyCatalog {
    fn section_units(&self, _part_id: u32) -> Vec<UnitRef> {
        Vec::new()
    }
}

// ============================================================================
// STATIC CATALOG
// ============================================================================

/// In-memory catalog.
///
/// JSON shape:
/// ```json
/// {
///   "sections": { "30": [ {"type": "verse", "surahId": 78, "startVerse": 1, "endVerse": 16} ] },
///   "excluded": ["verse:78:17-30"]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticCatalog {
    #[serde(default)]
    sections: BTreeMap<u32, Vec<NodeKey>>,
    #[serde(default)]
    excluded: BTreeSet<String>,
}

impl StaticCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from JSON
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a catalog file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Add a section with its units in review order
    pub fn with_section(mut self, part_id: u32, keys: impl IntoIterator<Item = NodeKey>) -> Self {
        self.sections
            .entry(part_id)
            .or_default()
            .extend(keys);
        self
    }

    /// Exclude a unit by id
    pub fn exclude(mut self, unit_id: impl Into<String>) -> Self {
        self.excluded.insert(unit_id.into());
        self
    }

    /// Section ids known to this catalog
    pub fn section_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.sections.keys().copied()
    }
}

impl ContentCatalog for StaticCatalog {
    fn section_units(&self, part_id: u32) -> Vec<UnitRef> {
        self.sections
            .get(&part_id)
            .map(|keys| keys.iter().cloned().map(UnitRef::new).collect())
            .unwrap_or_default()
    }

    fn is_unit_excluded(&self, unit_id: &str) -> bool {
        self.excluded.contains(unit_id)
    }
}

// ============================================================================
// SIMILARITY
// ============================================================================

/// Word span inside a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordRange {
    pub unit_id: String,
    pub start_word: u32,
    pub end_word: u32,
}

/// A group of units sharing a similar phrase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityGroup {
    pub id: String,
    pub unit_ids: Vec<String>,
    #[serde(default)]
    pub word_ranges: Vec<WordRange>,
}

/// Similar-phrase lookup
pub trait SimilarityLookup {
    /// Groups the unit participates in (possibly none)
    fn similarity_groups(&self, unit_id: &str) -> Vec<SimilarityGroup>;
}

/// Lookup that never finds a similar phrase
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSimilarity;

impl SimilarityLookup for NoSimilarity {
    fn similarity_groups(&self, _unit_id: &str) -> Vec<SimilarityGroup> {
        Vec::new()
    }
}

impl SimilarityLookup for BTreeMap<String, Vec<SimilarityGroup>> {
    fn similarity_groups(&self, unit_id: &str) -> Vec<SimilarityGroup> {
        self.get(unit_id).cloned().unwrap_or_default()
    }
}
