//! # RocksDB Storage Adapter
//!
//! Persistent [`KeyValueStore`] for forum documents.
//!
//! - Atomic batch writes (`WriteBatch`)
//! - Snappy compression
//! - Bloom filters for point lookups by document key

use rocksdb::{
    BlockBasedOptions, Cache, DBCompressionType, Direction, IteratorMode, Options, WriteBatch,
    WriteOptions, DB,
};
use std::path::PathBuf;

use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore};

#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Database directory.
    pub path: PathBuf,
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// fsync after each write
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/stackit"),
            block_cache_size: 64 * 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Small buffers, no fsync.
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 4 * 1024 * 1024,
            write_buffer_size: 1024 * 1024,
            sync_writes: false,
        }
    }
}

pub struct RocksDbStore {
    db: DB,
    config: RocksDbConfig,
}

impl RocksDbStore {
    /// Open or create the database at `config.path`.
    pub fn open(config: RocksDbConfig) -> Result<Self, KVStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(DBCompressionType::Snappy);

        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, &config.path).map_err(|e| KVStoreError::IOError {
            message: format!("Failed to open RocksDB at {}: {}", config.path.display(), e),
        })?;
        tracing::info!(path = %config.path.display(), "opened RocksDB store");

        Ok(Self { db, config })
    }

    fn write_options(&self) -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        write_opts
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.db.get(key).map_err(|e| KVStoreError::IOError {
            message: format!("RocksDB get failed: {}", e),
        })
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.db
            .put_opt(key, value, &self.write_options())
            .map_err(|e| KVStoreError::IOError {
                message: format!("RocksDB put failed: {}", e),
            })
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.db
            .delete_opt(key, &self.write_options())
            .map_err(|e| KVStoreError::IOError {
                message: format!("RocksDB delete failed: {}", e),
            })
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let mut batch = WriteBatch::default();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => batch.put(&key, &value),
                BatchOperation::Delete { key } => batch.delete(&key),
            }
        }

        self.db
            .write_opt(batch, &self.write_options())
            .map_err(|e| KVStoreError::IOError {
                message: format!("RocksDB batch write failed: {}", e),
            })
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        self.db
            .get_pinned(key)
            .map(|v| v.is_some())
            .map_err(|e| KVStoreError::IOError {
                message: format!("RocksDB exists check failed: {}", e),
            })
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        let mut results = Vec::new();
        for item in self.db.iterator(IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item.map_err(|e| KVStoreError::IOError {
                message: format!("RocksDB scan failed: {}", e),
            })?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_batch_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut store =
                RocksDbStore::open(RocksDbConfig::for_testing(temp_dir.path())).unwrap();
            store
                .atomic_batch_write(vec![
                    BatchOperation::put("questions/1", "{}"),
                    BatchOperation::put("questions/2", "{}"),
                    BatchOperation::put("answers/1", "{}"),
                ])
                .unwrap();
        }

        let store = RocksDbStore::open(RocksDbConfig::for_testing(temp_dir.path())).unwrap();
        assert_eq!(store.prefix_scan(b"questions/").unwrap().len(), 2);
        assert!(store.exists(b"answers/1").unwrap());
    }

    #[test]
    fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = RocksDbStore::open(RocksDbConfig::for_testing(temp_dir.path())).unwrap();
        store.put(b"k", b"v").unwrap();
        store.delete(b"k").unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);
    }
}
