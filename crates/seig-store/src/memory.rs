// crates/seig-store/src/memory.rs
//
// In-memory KvStore backed by an ordered map. Used by tests and by the
// daemon when it runs without a data directory.

use std::collections::BTreeMap;
use std::sync::RwLock;

use seig_core::error::SeigError;
use seig_core::traits::{BatchOp, KvStore};

/// Ordered in-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> SeigError {
    SeigError::Storage(format!("RwLock poisoned: {}", e))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, SeigError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), SeigError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), SeigError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> Result<bool, SeigError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        if entries.get(key).map(Vec::as_slice) != expected {
            return Ok(false);
        }
        entries.insert(key.to_vec(), new.to_vec());
        Ok(true)
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), SeigError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        for (key, value) in ops {
            match value {
                Some(value) => {
                    entries.insert(key, value);
                }
                None => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, SeigError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
