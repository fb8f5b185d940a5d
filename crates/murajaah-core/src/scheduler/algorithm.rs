//! SM-2 update rule
//!
//! Pure functions over [`SchedulingState`]. The only inputs are the grade, the
//! prior state and the current instant; nothing here touches storage.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Ease factor assigned to a fresh node
pub const DEFAULT_EASE: f64 = 2.5;

/// Algorithm floor for the ease factor
pub const MIN_EASE: f64 = 1.3;

/// Lowest grade that counts as a successful recall
pub const PASSING_GRADE: i32 = 3;

// ============================================================================
// GRADE
// ============================================================================

/// Recall quality on the SM-2 0-5 scale.
///
/// Callers normally use [`Grade::REMEMBERED`] and [`Grade::FORGOT`];
/// [`Grade::PERFECT`] is only used to preview intervals. Values outside 0-5
/// are accepted and land on whichever side of [`PASSING_GRADE`] they fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grade(pub i32);

impl Grade {
    /// "I forgot" button
    pub const FORGOT: Grade = Grade(1);
    /// "I remembered" button
    pub const REMEMBERED: Grade = Grade(4);
    /// Perfect recall, used for read-only previews
    pub const PERFECT: Grade = Grade(5);

    /// Whether this grade counts as a successful recall
    pub fn is_success(self) -> bool {
        self.0 >= PASSING_GRADE
    }

    /// Raw grade value
    pub fn value(self) -> i32 {
        self.0
    }
}

impl From<i32> for Grade {
    fn from(value: i32) -> Self {
        Grade(value)
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// SCHEDULING STATE
// ============================================================================

/// SM-2 state attached to every memory node.
///
/// `due_date` is always recomputed together with `last_review` and
/// `interval`; no operation updates one without the others, except postpone
/// which defers `due_date` on purpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingState {
    /// Ease multiplier (>= 1.3)
    pub ease_factor: f64,
    /// Days until the next review
    pub interval: u32,
    /// Consecutive successful reviews
    pub repetition: u32,
    /// Calendar date on or after which the node is due
    pub due_date: NaiveDate,
    /// Most recent mutation of this state; merge tie-breaker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime<Utc>>,
    /// Most recent successful grading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success: Option<DateTime<Utc>>,
}

impl SchedulingState {
    /// Fresh state for a node first seen on `today` (due immediately)
    pub fn new(today: NaiveDate) -> Self {
        Self {
            ease_factor: DEFAULT_EASE,
            interval: 0,
            repetition: 0,
            due_date: today,
            last_review: None,
            last_success: None,
        }
    }

    /// Whether the node is due on `today`
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.due_date <= today
    }

    /// Maturity bucket for the current interval
    pub fn maturity(&self) -> super::Maturity {
        super::classify(self.interval)
    }
}

// ============================================================================
// UPDATE RULE
// ============================================================================

/// Add whole days to a date, saturating at the calendar maximum
pub fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

/// Ease factor after a successful review with `grade`
pub fn next_ease(ease: f64, grade: Grade) -> f64 {
    let q = f64::from(5 - grade.0);
    (ease + (0.1 - q * (0.08 + q * 0.02))).max(MIN_EASE)
}

/// Interval, repetition and ease produced by `grade`, without timestamps
fn next_schedule(grade: Grade, prior: &SchedulingState) -> (u32, u32, f64) {
    if !grade.is_success() {
        return (1, 0, prior.ease_factor);
    }

    let repetition = prior.repetition.saturating_add(1);
    let ease = next_ease(prior.ease_factor, grade);
    let interval = match repetition {
        1 => 1,
        2 => 6,
        // `as` saturates on overflow; intervals are deliberately unbounded otherwise
        _ => (f64::from(prior.interval) * ease).round() as u32,
    };

    (interval, repetition, ease)
}

/// Apply one grading event to `prior`.
pub fn advance(grade: Grade, prior: &SchedulingState, now: DateTime<Utc>) -> SchedulingState {
    let (interval, repetition, ease_factor) = next_schedule(grade, prior);

    SchedulingState {
        ease_factor,
        interval,
        repetition,
        due_date: add_days(now.date_naive(), interval),
        last_review: Some(now),
        last_success: if grade.is_success() {
            Some(now)
        } else {
            prior.last_success
        },
    }
}

/// Interval `grade` would produce. Read-only.
pub fn preview_interval(grade: Grade, prior: &SchedulingState) -> u32 {
    next_schedule(grade, prior).0
}

// ============================================================================
// TESTS
// ============================================================================
