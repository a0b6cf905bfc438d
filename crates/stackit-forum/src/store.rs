//! # Document Store
//!
//! Typed JSON documents over the [`KeyValueStore`] port.
//!
//! ## Key Layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `{collection}/{key}` | JSON-encoded document |
//! | `idx/{collection}/{field}/{value}` | id of the document owning a unique value |
//!
//! Reads go straight to the store. Writes are staged in a [`WriteSet`] and
//! applied with one `atomic_batch_write`, so an operation touching several
//! documents either lands completely or not at all.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::domain::errors::{ForumResult, KVStoreError};
use crate::ports::outbound::{BatchOperation, KeyValueStore};

/// Document families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Tags,
    Questions,
    Answers,
    Comments,
    Notifications,
    Votes,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Tags => "tags",
            Collection::Questions => "questions",
            Collection::Answers => "answers",
            Collection::Comments => "comments",
            Collection::Notifications => "notifications",
            Collection::Votes => "votes",
        }
    }

    /// Key prefix shared by every document in the collection.
    pub fn prefix(&self) -> String {
        format!("{}/", self.name())
    }

    pub fn document_key(&self, key: &str) -> String {
        format!("{}/{}", self.name(), key)
    }

    pub fn index_key(&self, field: &str, value: &str) -> String {
        format!("idx/{}/{}/{}", self.name(), field, value)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value persisted as one JSON document.
pub trait Document: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    /// Key within the collection.
    fn key(&self) -> String;
}

/// Staged writes for one forum operation.
#[derive(Debug, Default)]
pub struct WriteSet {
    operations: Vec<BatchOperation>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<D: Document>(&mut self, doc: &D) -> ForumResult<()> {
        let value = serde_json::to_vec(doc)?;
        self.operations.push(BatchOperation::put(
            D::COLLECTION.document_key(&doc.key()),
            value,
        ));
        Ok(())
    }

    pub fn delete<D: Document>(&mut self, doc: &D) {
        self.operations
            .push(BatchOperation::delete(D::COLLECTION.document_key(&doc.key())));
    }

    pub fn put_index(&mut self, collection: Collection, field: &str, value: &str, id: Uuid) {
        self.operations.push(BatchOperation::put(
            collection.index_key(field, value),
            id.to_string(),
        ));
    }

    pub fn delete_index(&mut self, collection: Collection, field: &str, value: &str) {
        self.operations
            .push(BatchOperation::delete(collection.index_key(field, value)));
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn into_operations(self) -> Vec<BatchOperation> {
        self.operations
    }
}

/// JSON document collections backed by a key-value store.
pub struct DocumentStore {
    kv: Box<dyn KeyValueStore>,
}

impl DocumentStore {
    pub fn new(kv: Box<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn get<D: Document>(&self, id: Uuid) -> ForumResult<Option<D>> {
        self.get_by_key(&id.to_string())
    }

    pub fn get_by_key<D: Document>(&self, key: &str) -> ForumResult<Option<D>> {
        match self.kv.get(D::COLLECTION.document_key(key).as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Every document in the collection, in key order.
    pub fn scan<D: Document>(&self) -> ForumResult<Vec<D>> {
        self.scan_prefix("")
    }

    /// Documents whose in-collection key starts with `prefix`.
    pub fn scan_prefix<D: Document>(&self, prefix: &str) -> ForumResult<Vec<D>> {
        let full = D::COLLECTION.document_key(prefix);
        self.kv
            .prefix_scan(full.as_bytes())?
            .iter()
            .map(|(_, value)| decode(value))
            .collect()
    }

    /// Id registered under a unique index value.
    pub fn lookup(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> ForumResult<Option<Uuid>> {
        let Some(bytes) = self.kv.get(collection.index_key(field, value).as_bytes())? else {
            return Ok(None);
        };
        let text = std::str::from_utf8(&bytes).map_err(|e| KVStoreError::CorruptionError {
            message: format!("index {}/{}: {}", collection, field, e),
        })?;
        let id = Uuid::parse_str(text).map_err(|e| KVStoreError::CorruptionError {
            message: format!("index {}/{}: {}", collection, field, e),
        })?;
        Ok(Some(id))
    }

    /// Apply staged writes in one atomic batch. Empty sets are skipped.
    pub fn commit(&mut self, writes: WriteSet) -> ForumResult<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let ops = writes.into_operations();
        tracing::trace!(operations = ops.len(), "committing write set");
        self.kv.atomic_batch_write(ops)?;
        Ok(())
    }
}

fn decode<D: Document>(bytes: &[u8]) -> ForumResult<D> {
    serde_json::from_slice(bytes).map_err(|e| {
        KVStoreError::CorruptionError {
            message: format!("{} document: {}", D::COLLECTION, e),
        }
        .into()
    })
}
