//! Sync Orchestrator
//!
//! One sync is pull, merge, then import and push only when the merge changed
//! something. There is no retry; a failed step is reported and the next sync
//! starts from whatever state was reached.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::storage::Storage;

use super::merge::{merge, MergeReport};
use super::transport::SyncTransport;

/// Result of one sync attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Something moved. `imported` is false when only the remote was written.
    Success {
        pushed: bool,
        imported: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        report: Option<MergeReport>,
    },
    /// Both sides already agreed
    NoChange,
    /// A step failed; local state reflects every step before it
    Error { message: String },
}

impl SyncOutcome {
    fn error(message: impl Into<String>) -> Self {
        SyncOutcome::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success { .. })
    }
}

/// Runs syncs against one transport
pub struct SyncOrchestrator<T: SyncTransport> {
    transport: T,
}

impl<T: SyncTransport> SyncOrchestrator<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Reconcile `storage` with the remote document
    pub async fn sync(&self, storage: &mut Storage, now: DateTime<Utc>) -> SyncOutcome {
        let remote = match self.transport.pull().await {
            Ok(remote) => remote,
            Err(e) => {
                warn!("Sync pull failed: {}", e);
                return SyncOutcome::error(format!("pull failed: {e}"));
            }
        };

        let local = storage.snapshot();

        let Some(remote) = remote else {
            // First sync: seed the remote with local state
            if let Err(e) = self.transport.push(&local).await {
                warn!("Initial push failed: {}", e);
                return SyncOutcome::error(format!("push failed: {e}"));
            }
            info!(nodes = local.memory_nodes.len(), "Seeded empty remote");
            return Self::finish(
                storage,
                now,
                SyncOutcome::Success {
                    pushed: true,
                    imported: false,
                    report: None,
                },
            );
        };

        let outcome = merge(&local, &remote, now);
        if !outcome.changed {
            info!("Sync found nothing to do");
            return Self::finish(storage, now, SyncOutcome::NoChange);
        }

        if let Err(e) = storage.import(outcome.merged.clone()) {
            warn!("Importing merged state failed: {}", e);
            return SyncOutcome::error(format!("import failed: {e}"));
        }
        if let Err(e) = self.transport.push(&outcome.merged).await {
            warn!("Push after merge failed: {}", e);
            return SyncOutcome::error(format!("push failed: {e}"));
        }

        info!(
            nodes_from_remote = outcome.report.nodes_from_remote,
            replaced = ?outcome.report.collections_replaced,
            "Sync completed"
        );
        Self::finish(
            storage,
            now,
            SyncOutcome::Success {
                pushed: true,
                imported: true,
                report: Some(outcome.report),
            },
        )
    }

    /// Record the sync time; a failure to do so is logged, not surfaced
    fn finish(storage: &mut Storage, now: DateTime<Utc>, outcome: SyncOutcome) -> SyncOutcome {
        if let Err(e) = storage.mark_synced(now) {
            warn!("Failed to record sync time: {}", e);
        }
        outcome
    }
}
