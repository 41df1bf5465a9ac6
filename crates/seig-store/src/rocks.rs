// crates/seig-store/src/rocks.rs
//
// RocksDB-backed KvStore.
//
// Single writes go straight to the database. Compare-and-swap and batches
// take a process-local write lock so a CAS observes no interleaved write
// between its read and its put; RocksDB's WriteBatch makes each batch atomic
// on disk.

use std::sync::Mutex;

use rocksdb::{DBWithThreadMode, MultiThreaded, Options, WriteBatch};

use seig_core::error::SeigError;
use seig_core::traits::{BatchOp, KvStore};

/// RocksDB wrapper implementing the `KvStore` trait.
#[derive(Debug)]
pub struct RocksStore {
    db: DBWithThreadMode<MultiThreaded>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, SeigError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path)
            .map_err(|e| SeigError::Storage(format!("Failed to open RocksDB at {}: {}", path, e)))?;

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    /// Put raw bytes into RocksDB, mapping errors to SeigError::Storage.
    fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), SeigError> {
        self.db
            .put(key, value)
            .map_err(|e| SeigError::Storage(format!("RocksDB put failed: {}", e)))
    }

    /// Get raw bytes from RocksDB, mapping errors to SeigError::Storage.
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, SeigError> {
        self.db
            .get(key)
            .map_err(|e| SeigError::Storage(format!("RocksDB get failed: {}", e)))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, SeigError> {
        self.write_lock
            .lock()
            .map_err(|e| SeigError::Storage(format!("write lock poisoned: {}", e)))
    }
}

impl KvStore for RocksStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, SeigError> {
        self.get_raw(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), SeigError> {
        let _guard = self.lock()?;
        self.put_raw(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<(), SeigError> {
        let _guard = self.lock()?;
        self.db
            .delete(key)
            .map_err(|e| SeigError::Storage(format!("RocksDB delete failed: {}", e)))
    }

    fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> Result<bool, SeigError> {
        let _guard = self.lock()?;
        let current = self.get_raw(key)?;
        if current.as_deref() != expected {
            return Ok(false);
        }
        self.put_raw(key, new)?;
        Ok(true)
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), SeigError> {
        let _guard = self.lock()?;
        let mut batch = WriteBatch::default();
        for (key, value) in ops {
            match value {
                Some(value) => batch.put(key, value),
                None => batch.delete(key),
            }
        }
        self.db
            .write(batch)
            .map_err(|e| SeigError::Storage(format!("RocksDB batch write failed: {}", e)))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, SeigError> {
        let mut entries = Vec::new();
        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item
                .map_err(|e| SeigError::Storage(format!("RocksDB iteration error: {}", e)))?;

            // No prefix extractor is configured, so stop once keys leave the prefix.
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }
}
