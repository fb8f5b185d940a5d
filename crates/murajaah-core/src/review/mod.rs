//! Review Module
//!
//! Review-time workflow on top of the node store:
//! - Chapter diagrams and anchors
//! - The review error log and derived anchor suspension
//! - Sessions over a frozen due list with single-level undo

mod anchor;
mod log;
mod session;

pub use anchor::{mindmap_for, Anchor, Mindmap, Mindmaps, SuspendedAnchor};
pub use log::{ReviewError, ReviewLog};
pub use session::{GradePreview, GradingRecord, ReviewSession};
