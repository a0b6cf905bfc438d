//! # StackIt Forum
//!
//! Domain model and application service for the StackIt Q&A forum.
//!
//! ## Architecture
//!
//! ```text
//!   stackit-api (HTTP/WebSocket)
//!          │  actor id + request DTOs
//!          ▼
//!   ┌──────────────────────────────┐        ┌─────────────────────────┐
//!   │         ForumService         │──────→ │  NotificationPublisher  │
//!   │  users / questions / answers │        │  (real-time push port)  │
//!   │  comments / notifications    │        └─────────────────────────┘
//!   └──────────────┬───────────────┘
//!                  │ WriteSet (one atomic batch per operation)
//!                  ▼
//!   ┌──────────────────────────────┐
//!   │        DocumentStore         │  JSON documents + unique indexes
//!   └──────────────┬───────────────┘
//!                  ▼
//!          KeyValueStore port
//!     (InMemoryKVStore | RocksDbStore)
//! ```
//!
//! ## Consistency Rules
//!
//! | Rule | Description |
//! |------|-------------|
//! | Atomic writes | Every document touched by one operation is committed in a single batch |
//! | Serialized mutations | Read-modify-write operations hold the store write lock |
//! | Accepted answer | At most one accepted answer per question, each worth exactly +15 reputation |
//! | One vote per voter | A voter holds at most one vote per answer; switching reverses the old one |
//! | Answer count | `answersCount` tracks live answers and never goes below zero |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Entities, views, errors, validation and text helpers
//! - `ports/` - Inbound request types, outbound storage/time/publisher traits
//! - `adapters/` - Storage backends
//! - `store.rs` - Typed document access over the key-value port
//! - `service/` - The forum application service

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;
pub mod store;

#[cfg(test)]
pub(crate) mod test_utils;

pub use domain::entities::{
    Answer, Comment, CommentTarget, Notification, NotificationKind, Question, Role, Tag, User,
    Vote, VoteDirection,
};
pub use domain::errors::{Entity, FieldError, ForumError, ForumResult, KVStoreError};
pub use domain::views::{
    AnswerView, AuthorRef, CommentView, Populated, QuestionRef, QuestionView, TagRef, UserProfile,
};
pub use ports::inbound::{NewContent, NewQuestion, NewUser, QuestionQuery, SortField, SortOrder};
pub use ports::outbound::{
    BatchOperation, InMemoryKVStore, KeyValueStore, NoopPublisher, NotificationPublisher,
    SystemTimeSource, TimeSource,
};
pub use service::ForumService;
pub use store::{Collection, Document, DocumentStore, WriteSet};

#[cfg(feature = "rocksdb")]
pub use adapters::rocksdb::{RocksDbConfig, RocksDbStore};
