//! Review sessions
//!
//! A session captures the due node ids when it starts and works through that
//! list only. Anything that changes the store afterwards (an import, another
//! grading) cannot shift the positions the caller is grading against.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{ContentCatalog, SimilarityLookup};
use crate::memory::{MemoryNode, ReviewScope};
use crate::scheduler::{preview_interval, Grade};
use crate::storage::{Result, Storage};

/// What the last action changed, so it can be undone
#[derive(Debug, Clone, PartialEq)]
pub struct GradingRecord {
    /// Position in the session snapshot
    pub index: usize,
    /// Node before the action
    pub previous: MemoryNode,
    /// Error entry the action created, if it was a failed grading
    pub review_error_id: Option<String>,
}

/// Interval each outcome would produce, for display before grading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradePreview {
    pub forgot: u32,
    pub remembered: u32,
    /// Interval for flawless recall
    pub perfect: u32,
}

/// A pass over a frozen list of due nodes
#[derive(Debug, Clone)]
pub struct ReviewSession {
    scope: ReviewScope,
    node_ids: Vec<String>,
    position: usize,
    last_grading: Option<GradingRecord>,
}

impl ReviewSession {
    /// Start a session over the nodes currently due in `scope`
    pub fn start(
        storage: &mut Storage,
        scope: ReviewScope,
        catalog: &dyn ContentCatalog,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let due = storage.due_set(&scope, catalog, now.date_naive())?;
        let node_ids: Vec<String> = due.into_iter().map(|n| n.id).collect();
        info!(%scope, due = node_ids.len(), "Started review session");
        Ok(Self {
            scope,
            node_ids,
            position: 0,
            last_grading: None,
        })
    }

    pub fn scope(&self) -> ReviewScope {
        self.scope
    }

    /// Snapshot ids in review order
    pub fn node_ids(&self) -> &[String] {
        &self.node_ids
    }

    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// Index of the next ungraded item
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether every item has been acted on
    pub fn is_finished(&self) -> bool {
        self.position >= self.node_ids.len()
    }

    /// Id of the next item, if any remain
    pub fn current(&self) -> Option<&str> {
        self.node_ids.get(self.position).map(String::as_str)
    }

    /// Whether there is an action to undo
    pub fn can_undo(&self) -> bool {
        self.last_grading.is_some()
    }

    /// Intervals the item at `index` would get for each outcome
    pub fn preview(&self, storage: &Storage, index: usize) -> Option<GradePreview> {
        let node = storage.node(self.node_ids.get(index)?)?;
        Some(GradePreview {
            forgot: preview_interval(Grade::FORGOT, &node.scheduler),
            remembered: preview_interval(Grade::REMEMBERED, &node.scheduler),
            perfect: preview_interval(Grade::PERFECT, &node.scheduler),
        })
    }

    /// Grade the item at `index`.
    ///
    /// An index outside the snapshot, or one whose node no longer exists, is
    /// ignored and returns `None`.
    pub fn grade(
        &mut self,
        storage: &mut Storage,
        index: usize,
        grade: Grade,
        similarity: &dyn SimilarityLookup,
        now: DateTime<Utc>,
    ) -> Result<Option<MemoryNode>> {
        let Some(id) = self.node_ids.get(index) else {
            debug!(index, len = self.node_ids.len(), "Ignoring grade outside session");
            return Ok(None);
        };
        if storage.node(id).is_none() {
            return Ok(None);
        }

        let outcome = storage.grade_node(id, grade, similarity, now)?;
        self.last_grading = Some(GradingRecord {
            index,
            previous: outcome.before,
            review_error_id: outcome.review_error.map(|e| e.id),
        });
        self.position = self.position.max(index + 1);
        Ok(Some(outcome.after))
    }

    /// Defer the item at `index` to tomorrow. Undoable like a grading.
    pub fn postpone(
        &mut self,
        storage: &mut Storage,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<Option<MemoryNode>> {
        let Some(id) = self.node_ids.get(index) else {
            return Ok(None);
        };
        let Some(previous) = storage.node(id).cloned() else {
            return Ok(None);
        };

        let postponed = storage.postpone_node(id, now)?;
        self.last_grading = Some(GradingRecord {
            index,
            previous,
            review_error_id: None,
        });
        self.position = self.position.max(index + 1);
        Ok(Some(postponed))
    }

    /// Revert the most recent grading or postponement.
    ///
    /// Only one level is kept; a second call returns `None`.
    pub fn undo(
        &mut self,
        storage: &mut Storage,
        now: DateTime<Utc>,
    ) -> Result<Option<GradingRecord>> {
        let Some(record) = self.last_grading.take() else {
            return Ok(None);
        };
        let restored =
            storage.restore_node(record.previous.clone(), record.review_error_id.as_deref(), now);
        if let Err(e) = restored {
            self.last_grading = Some(record);
            return Err(e);
        }
        self.position = record.index;
        debug!(node_id = %record.previous.id, "Undid last grading");
        Ok(Some(record))
    }
}
