//! Key-value persistence seam
//!
//! The engine persists every collection as one JSON value under a fixed key.
//! Backends only have to store and return those values; all interpretation
//! happens above this trait.

use std::collections::BTreeMap;

use serde_json::Value;

use super::sqlite::Result;

/// Durable key-value storage for JSON collections
pub trait KeyValueStore: Send {
    /// Value stored under `key`, if any
    fn load(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value
    fn save(&mut self, key: &str, value: &Value) -> Result<()>;

    /// Store several values. Backends that can should make this atomic.
    fn save_many(&mut self, entries: &[(&str, Value)]) -> Result<()> {
        for (key, value) in entries {
            self.save(key, value)?;
        }
        Ok(())
    }
}

/// Volatile backend for tests and throwaway sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    values: BTreeMap<String, Value>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &Value) -> Result<()> {
        self.values.insert(key.to_string(), value.clone());
        Ok(())
    }
}
