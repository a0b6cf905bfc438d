//! # Domain Layer
//!
//! Forum documents, the read-side views handed to clients, error types and
//! the pure helpers used by the service (validation, excerpts, mentions).

pub mod credentials;
pub mod entities;
pub mod errors;
pub mod text;
pub mod validation;
pub mod views;

/// Reputation granted to the author of an accepted answer.
pub const ACCEPT_REWARD: i64 = 15;

/// Reputation granted to an answer author per upvote.
pub const UPVOTE_REWARD: i64 = 10;

/// Reputation taken from an answer author per downvote.
pub const DOWNVOTE_PENALTY: i64 = -2;

/// Characters of a title or body quoted in notification messages.
pub const EXCERPT_CHARS: usize = 50;
