//! Backup Module
//!
//! Whole-state export and import as a single JSON document.

mod codec;
mod document;

pub use codec::{decode, encode, export, validate};
pub use document::{
    BackupDocument, CustomMutashabihat, MutashabihatDecision, Settings, BACKUP_FORMAT_VERSION,
};
