//! In-memory sync transport
//!
//! Several devices in one test can hold clones of the same
//! [`SharedTransport`]; they all see one remote document.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use murajaah_core::{BackupDocument, SyncTransport, TransportError};

/// Remote document shared between clones, with switchable failures
#[derive(Clone, Default)]
pub struct SharedTransport {
    remote: Arc<Mutex<Option<BackupDocument>>>,
    offline: Arc<Mutex<bool>>,
    pushes: Arc<Mutex<usize>>,
}

impl SharedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current remote document
    pub fn remote(&self) -> Option<BackupDocument> {
        self.remote.lock().unwrap().clone()
    }

    /// Make every call fail until switched back
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    /// Successful pushes so far
    pub fn push_count(&self) -> usize {
        *self.pushes.lock().unwrap()
    }

    fn check_online(&self) -> Result<(), TransportError> {
        if *self.offline.lock().unwrap() {
            return Err(TransportError::Unavailable("network unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SyncTransport for SharedTransport {
    async fn pull(&self) -> Result<Option<BackupDocument>, TransportError> {
        self.check_online()?;
        Ok(self.remote())
    }

    async fn push(&self, doc: &BackupDocument) -> Result<(), TransportError> {
        self.check_online()?;
        *self.remote.lock().unwrap() = Some(doc.clone());
        *self.pushes.lock().unwrap() += 1;
        Ok(())
    }
}
