//! # Murajaah Core
//!
//! Review scheduling and multi-device merge engine for Quran memorization.
//!
//! - **SM-2 Scheduling**: ease/interval/repetition per memory node
//! - **Maturity Buckets**: reset, medium, strong, mastered, with manual overrides
//! - **Memory Nodes**: verse ranges, chapter diagrams and section diagrams,
//!   keyed by deterministic ids and created lazily on first access
//! - **Review Workflow**: error log, anchor suspension derived from it, and
//!   review sessions with single-level undo
//! - **Backup & Sync**: whole-state JSON documents merged field by field
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use murajaah_core::prelude::*;
//!
//! // Open the default database
//! let mut storage = Storage::open_default(None, EngineConfig::from_env())?;
//!
//! // Review today's section
//! let now = chrono::Utc::now();
//! let mut session = ReviewSession::start(&mut storage, ReviewScope::Section(30), &catalog, now)?;
//! session.grade(&mut storage, 0, Grade::REMEMBERED, &NoSimilarity, now)?;
//!
//! // Reconcile with another device through a shared file
//! let orchestrator = SyncOrchestrator::new(FileTransport::new("/sync/murajaah.json"));
//! let outcome = orchestrator.sync(&mut storage, now).await;
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): Compile SQLite into the binary
//! - `encryption`: SQLCipher; the key comes from `MURAJAAH_ENCRYPTION_KEY`

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod backup;
pub mod catalog;
pub mod config;
pub mod memory;
pub mod review;
pub mod scheduler;
pub mod storage;
pub mod sync;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Memory types
pub use memory::{MemoryNode, MemoryNodeStore, MemoryStats, NodeKey, NodeType, ReviewScope};

// SM-2 algorithm
pub use scheduler::{advance, classify, reset_to, Grade, Maturity, SchedulingState};

// Review workflow
pub use review::{
    Anchor, GradePreview, GradingRecord, Mindmap, Mindmaps, ReviewError, ReviewLog,
    ReviewSession, SuspendedAnchor,
};

// Content interfaces
pub use catalog::{
    CatalogError, ContentCatalog, EmptyCatalog, NoSimilarity, SimilarityGroup, SimilarityLookup,
    StaticCatalog, UnitRef,
};

// Backup documents
pub use backup::{
    BackupDocument, CustomMutashabihat, MutashabihatDecision, Settings, BACKUP_FORMAT_VERSION,
};

// Storage layer
pub use storage::{
    GradeOutcome, KeyValueStore, LocalState, MemoryKvStore, Result, SqliteKvStore, Storage,
    StorageError,
};

// Sync
pub use sync::{
    merge, FileTransport, MergeOutcome, MergeReport, SyncOrchestrator, SyncOutcome,
    SyncTransport, TransportError,
};

pub use config::EngineConfig;

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        BackupDocument, ContentCatalog, EngineConfig, FileTransport, Grade, Maturity, MemoryNode,
        MemoryStats, NoSimilarity, NodeKey, Result, ReviewScope, ReviewSession, StaticCatalog,
        Storage, StorageError, SyncOrchestrator, SyncOutcome,
    };
}
