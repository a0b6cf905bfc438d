//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the forum service needs from its host: a key-value store,
//! a clock and a real-time notification channel.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::entities::Notification;
use crate::domain::errors::KVStoreError;

/// Abstract interface for key-value database operations.
///
/// Production: [`crate::RocksDbStore`] (feature `rocksdb`)
/// Testing and ephemeral deployments: [`InMemoryKVStore`]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError>;

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either all operations in the batch are applied, or none are.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError>;

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError>;

    /// All entries whose key starts with `prefix`, in key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            BatchOperation::Put { key, .. } | BatchOperation::Delete { key } => key,
        }
    }
}

/// Abstract interface for time operations (for testability).
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time source.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Real-time delivery of freshly written notifications.
///
/// Called after the notification is durably committed. Delivery is best
/// effort: a recipient with no open connection simply misses the push and
/// sees the notification on the next fetch.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: &Notification);
}

/// Publisher that drops everything. Used when no real-time channel is wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl NotificationPublisher for NoopPublisher {
    fn publish(&self, _notification: &Notification) {}
}

/// In-memory key-value store.
///
/// Backed by a `BTreeMap` so prefix scans come back in key order.
#[derive(Debug, Default)]
pub struct InMemoryKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.data.remove(key);
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        // Map inserts and removes are infallible, so applying in order is atomic.
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.data.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
