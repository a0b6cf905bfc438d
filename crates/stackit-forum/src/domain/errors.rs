//! # Domain Errors
//!
//! Error types for forum operations and the storage port.
//!
//! Each `ForumError` variant maps to one client-visible outcome: a missing
//! document, an ownership violation, rejected input, or an internal failure.

use serde::Serialize;
use std::fmt;

/// Kind of document an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Tag,
    Question,
    Answer,
    Comment,
    Notification,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::User => "User",
            Entity::Tag => "Tag",
            Entity::Question => "Question",
            Entity::Answer => "Answer",
            Entity::Comment => "Comment",
            Entity::Notification => "Notification",
        };
        f.write_str(name)
    }
}

/// A rejected input field, shaped like an express-validator error entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub msg: String,
    pub param: String,
    pub location: &'static str,
}

impl FieldError {
    pub fn new(param: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            param: param.into(),
            location: "body",
        }
    }
}

/// Errors returned by forum operations.
#[derive(Debug, thiserror::Error)]
pub enum ForumError {
    /// The referenced document does not exist.
    #[error("{0} not found")]
    NotFound(Entity),

    /// The actor does not own the document it tried to change.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// One or more input fields failed validation.
    #[error("validation failed: {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// The request is well-formed but not allowed in the current state.
    #[error("{0}")]
    BadRequest(String),

    /// Password hashing or verification failed.
    #[error("credential error: {0}")]
    Credential(String),

    /// Document could not be encoded or decoded.
    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Underlying key-value store failure.
    #[error(transparent)]
    Storage(#[from] KVStoreError),
}

impl ForumError {
    /// Whether the error is caused by the server rather than the request.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ForumError::Credential(_) | ForumError::Encoding(_) | ForumError::Storage(_)
        )
    }
}

/// Result type for forum operations.
pub type ForumResult<T> = Result<T, ForumError>;

/// Key-value store errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },
    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = ForumError::NotFound(Entity::Question);
        assert_eq!(err.to_string(), "Question not found");
        assert!(!err.is_internal());
    }

    #[test]
    fn test_kv_error_conversion() {
        let kv_err = KVStoreError::IOError {
            message: "disk failure".to_string(),
        };
        let err: ForumError = kv_err.into();

        match &err {
            ForumError::Storage(inner) => assert!(inner.to_string().contains("disk failure")),
            _ => panic!("Expected Storage"),
        }
        assert!(err.is_internal());
    }

    #[test]
    fn test_field_error_shape() {
        let value = serde_json::to_value(FieldError::new("title", "Title is required")).unwrap();
        assert_eq!(value["param"], "title");
        assert_eq!(value["msg"], "Title is required");
        assert_eq!(value["location"], "body");
    }
}
