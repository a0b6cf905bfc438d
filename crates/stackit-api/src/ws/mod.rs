//! Real-time notification delivery.

pub mod handler;
pub mod hub;

pub use handler::notification_socket;
pub use hub::{NotificationHub, ServerEvent};
