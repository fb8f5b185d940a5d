//! Sync transports
//!
//! A transport moves whole backup documents to and from a remote location.
//! It knows nothing about merging; the orchestrator owns that.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::backup::{self, BackupDocument};

/// Transport failure
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// IO error talking to the remote
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Remote content is not a usable backup document
    #[error("Remote document rejected: {0}")]
    Decode(String),
    /// Local document could not be serialized for upload
    #[error("Failed to encode local document: {0}")]
    Encode(String),
    /// Remote could not be reached or refused the request
    #[error("Remote unavailable: {0}")]
    Unavailable(String),
}

/// Remote storage for one backup document
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Fetch the remote document; `None` when nothing has been pushed yet
    async fn pull(&self) -> Result<Option<BackupDocument>, TransportError>;

    /// Replace the remote document
    async fn push(&self, doc: &BackupDocument) -> Result<(), TransportError>;
}

/// Transport backed by a JSON file, e.g. inside a synced folder
#[derive(Debug, Clone)]
pub struct FileTransport {
    path: PathBuf,
}

impl FileTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SyncTransport for FileTransport {
    async fn pull(&self) -> Result<Option<BackupDocument>, TransportError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No remote document yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        backup::decode(&text)
            .map(Some)
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// Writes a sibling temp file and renames it over the target, so readers
    /// never see a half-written document.
    async fn push(&self, doc: &BackupDocument) -> Result<(), TransportError> {
        let text = backup::encode(doc).map_err(|e| TransportError::Encode(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), nodes = doc.memory_nodes.len(), "Pushed document");
        Ok(())
    }
}
