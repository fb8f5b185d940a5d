//! Maturity buckets
//!
//! Coarse classification of a node's interval, plus canonical seed states so a
//! user can promote or demote a node outside the grading flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::algorithm::{add_days, SchedulingState, DEFAULT_EASE};

const MEDIUM_FROM: u32 = 14;
const STRONG_FROM: u32 = 30;
const MASTERED_FROM: u32 = 90;

/// Maturity bucket derived from the review interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Maturity {
    /// Interval below 14 days
    Reset,
    /// 14-29 days
    Medium,
    /// 30-89 days
    Strong,
    /// 90 days and beyond
    Mastered,
}

impl Maturity {
    /// All buckets, weakest first
    pub const ALL: [Maturity; 4] = [
        Maturity::Reset,
        Maturity::Medium,
        Maturity::Strong,
        Maturity::Mastered,
    ];

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Maturity::Reset => "reset",
            Maturity::Medium => "medium",
            Maturity::Strong => "strong",
            Maturity::Mastered => "mastered",
        }
    }

    /// Canonical `(interval, repetition)` seed for this bucket
    fn seed(&self) -> (u32, u32) {
        match self {
            Maturity::Reset => (0, 0),
            Maturity::Medium => (MEDIUM_FROM, 3),
            Maturity::Strong => (STRONG_FROM, 4),
            Maturity::Mastered => (MASTERED_FROM, 5),
        }
    }
}

impl std::fmt::Display for Maturity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Maturity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reset" => Ok(Maturity::Reset),
            "medium" => Ok(Maturity::Medium),
            "strong" => Ok(Maturity::Strong),
            "mastered" => Ok(Maturity::Mastered),
            _ => Err(format!("Unknown maturity bucket: {}", s)),
        }
    }
}

/// Classify an interval (days) into its maturity bucket
pub fn classify(interval: u32) -> Maturity {
    match interval {
        i if i >= MASTERED_FROM => Maturity::Mastered,
        i if i >= STRONG_FROM => Maturity::Strong,
        i if i >= MEDIUM_FROM => Maturity::Medium,
        _ => Maturity::Reset,
    }
}

/// Canonical scheduling state for a manual override to `bucket`.
///
/// The result is stamped at `now` so it wins a later merge, and its due date is
/// derived from `now + interval` like any graded state.
pub fn reset_to(bucket: Maturity, now: DateTime<Utc>) -> SchedulingState {
    let (interval, repetition) = bucket.seed();
    SchedulingState {
        ease_factor: DEFAULT_EASE,
        interval,
        repetition,
        due_date: add_days(now.date_naive(), interval),
        last_review: Some(now),
        last_success: None,
    }
}
