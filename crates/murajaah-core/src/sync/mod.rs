//! Sync Module
//!
//! Two-device reconciliation through a shared backup document:
//! - Pure field-wise merge of two documents
//! - Pluggable async transports
//! - The pull, merge, import, push orchestration

mod merge;
mod orchestrator;
mod transport;

pub use merge::{merge, MergeOutcome, MergeReport};
pub use orchestrator::{SyncOrchestrator, SyncOutcome};
pub use transport::{FileTransport, SyncTransport, TransportError};
