//! SM-2 Scheduler Module
//!
//! A SuperMemo-2 variant tuned for memorization review:
//! - Failures reset the repetition count and schedule a next-day review,
//!   leaving the ease factor untouched
//! - Successes walk the 1 → 6 → interval × ease ladder
//! - Ease factor is floored at 1.3
//!
//! ## Core Formulas:
//! - Ease: EF' = max(1.3, EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)))
//! - Interval: I(1) = 1, I(2) = 6, I(n) = round(I(n-1) * EF')
//!
//! Maturity buckets (reset / medium / strong / mastered) classify a node's
//! interval and provide canonical seed states for manual overrides.

mod algorithm;
mod maturity;

pub use algorithm::{
    advance, next_ease, preview_interval, add_days, Grade, SchedulingState, DEFAULT_EASE, MIN_EASE,
    PASSING_GRADE,
};

pub use maturity::{classify, reset_to, Maturity};
