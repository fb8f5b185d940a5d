//! Test Data Factory
//!
//! Provides utilities for generating realistic test data:
//! - A fixed clock so schedules are reproducible
//! - A small catalog and chapter diagram
//! - Pre-built scenarios for common test cases

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, TimeZone, Utc};
use murajaah_core::{
    Anchor, CustomMutashabihat, Grade, Maturity, Mindmap, MutashabihatDecision, NoSimilarity,
    NodeKey, SimilarityGroup, StaticCatalog, Storage,
};
use uuid::Uuid;

/// Factory for creating test data
///
/// # Example
///
/// ```rust,ignore
/// let mut db = TestStorageManager::new_temp();
/// let scenario = TestDataFactory::create_scheduling_scenario(&mut db.storage);
/// let strong = &scenario.metadata["strong"];
/// ```
pub struct TestDataFactory;

/// Scenario containing related test data
#[derive(Debug)]
pub struct TestScenario {
    /// IDs of created nodes
    pub node_ids: Vec<String>,
    /// Description of the scenario
    pub description: String,
    /// Metadata for test assertions
    pub metadata: HashMap<String, String>,
}

/// Section used throughout the journeys
pub const SECTION: u32 = 15;

/// Chapter the section's diagram belongs to
pub const CAVE: u32 = 18;

impl TestDataFactory {
    // ========================================================================
    // CLOCK
    // ========================================================================

    /// Start of every journey
    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 5, 0, 0).unwrap()
    }

    /// `days` after [`Self::t0`]
    pub fn day(days: i64) -> DateTime<Utc> {
        Self::t0() + Duration::days(days)
    }

    // ========================================================================
    // CONTENT
    // ========================================================================

    /// Section of chapter 18 split into three verse ranges plus its diagram
    pub fn cave_catalog() -> StaticCatalog {
        StaticCatalog::new().with_section(
            SECTION,
            [
                NodeKey::verse(CAVE, 1, 8),
                NodeKey::verse(CAVE, 9, 12),
                NodeKey::verse(CAVE, 13, 16),
                NodeKey::Mindmap { surah_id: CAVE },
            ],
        )
    }

    /// Diagram with one anchor covering verses 9-16
    pub fn cave_mindmap() -> Mindmap {
        Mindmap {
            anchors: vec![
                Anchor::new("intro", "Opening praise", 1, 8),
                Anchor::new("sleepers", "The sleepers of the cave", 9, 16),
            ],
            ..Default::default()
        }
    }

    /// One similarity group linking the first range with chapter 17
    pub fn similarity() -> BTreeMap<String, Vec<SimilarityGroup>> {
        let group = SimilarityGroup {
            id: "praise-openings".into(),
            unit_ids: vec!["verse:18:1-8".into(), "verse:17:1-1".into()],
            word_ranges: vec![],
        };
        BTreeMap::from([("verse:18:1-8".to_string(), vec![group])])
    }

    pub fn decision(verdict: &str, confirmed_at: DateTime<Utc>) -> MutashabihatDecision {
        MutashabihatDecision {
            decision: verdict.into(),
            confirmed_at: confirmed_at.to_rfc3339(),
            extra: Default::default(),
        }
    }

    /// Custom entry with a fresh id
    pub fn custom_entry(phrase: &str) -> CustomMutashabihat {
        let mut extra = serde_json::Map::new();
        extra.insert("phrase".into(), serde_json::Value::from(phrase));
        CustomMutashabihat {
            id: Uuid::new_v4().to_string(),
            extra,
        }
    }

    // ========================================================================
    // SCENARIOS
    // ========================================================================

    /// Nodes at different points of the SM-2 ladder
    pub fn create_scheduling_scenario(storage: &mut Storage) -> TestScenario {
        let mut ids = Vec::new();
        let mut metadata = HashMap::new();
        let t0 = Self::t0();

        // Never reviewed
        let fresh = NodeKey::verse(2, 1, 5);
        storage.get_or_create_node(&fresh, t0.date_naive()).unwrap();
        metadata.insert("new".to_string(), fresh.id());
        ids.push(fresh.id());

        // Two successes: interval 6
        let learning = NodeKey::verse(2, 6, 10);
        storage.get_or_create_node(&learning, t0.date_naive()).unwrap();
        for d in [0, 1] {
            storage
                .grade_node(&learning.id(), Grade::REMEMBERED, &NoSimilarity, Self::day(d))
                .unwrap();
        }
        metadata.insert("learning".to_string(), learning.id());
        ids.push(learning.id());

        // Manually promoted
        let strong = NodeKey::Mindmap { surah_id: 2 };
        storage.get_or_create_node(&strong, t0.date_naive()).unwrap();
        storage
            .override_maturity(&strong.id(), Maturity::Strong, t0)
            .unwrap();
        metadata.insert("strong".to_string(), strong.id());
        ids.push(strong.id());

        // Lapsed after a success
        let lapsed = NodeKey::PartMindmap { part_id: 1 };
        storage.get_or_create_node(&lapsed, t0.date_naive()).unwrap();
        storage
            .grade_node(&lapsed.id(), Grade::REMEMBERED, &NoSimilarity, t0)
            .unwrap();
        storage
            .grade_node(&lapsed.id(), Grade::FORGOT, &NoSimilarity, Self::day(1))
            .unwrap();
        metadata.insert("lapsed".to_string(), lapsed.id());
        ids.push(lapsed.id());

        TestScenario {
            node_ids: ids,
            description: "Scheduling scenario with nodes in different review states".to_string(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murajaah_core::classify;

    #[test]
    fn test_scheduling_scenario() {
        let mut storage = Storage::in_memory();
        let scenario = TestDataFactory::create_scheduling_scenario(&mut storage);
        assert_eq!(scenario.node_ids.len(), 4);

        let learning = storage.node(&scenario.metadata["learning"]).unwrap();
        assert_eq!(learning.scheduler.interval, 6);
        assert_eq!(learning.scheduler.repetition, 2);

        let strong = storage.node(&scenario.metadata["strong"]).unwrap();
        assert_eq!(classify(strong.scheduler.interval), Maturity::Strong);

        let lapsed = storage.node(&scenario.metadata["lapsed"]).unwrap();
        assert_eq!(lapsed.scheduler.interval, 1);
        assert_eq!(storage.review_log().len(), 1);
    }

    #[test]
    fn test_custom_entries_get_distinct_ids() {
        let a = TestDataFactory::custom_entry("qala");
        let b = TestDataFactory::custom_entry("qala");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_mindmap_attributes_to_narrowest_anchor() {
        let mindmap = TestDataFactory::cave_mindmap();
        assert_eq!(mindmap.anchor_for_range(9, 12).unwrap().id, "sleepers");
        assert!(mindmap.anchor_for_range(8, 9).is_none());
    }
}
