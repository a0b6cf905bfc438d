//! # Ports Layer
//!
//! - `inbound.rs` - Request types accepted by [`crate::ForumService`]
//! - `outbound.rs` - Storage, clock and notification push dependencies

pub mod inbound;
pub mod outbound;
