//! Per-user notification rooms.
//!
//! Each connected user owns a broadcast room keyed by their id. The forum
//! service publishes through [`NotificationPublisher`] once a write commits;
//! every socket the recipient has open receives a copy.

use crate::middleware::GatewayMetrics;
use dashmap::DashMap;
use serde::Serialize;
use stackit_forum::{Notification, NotificationPublisher};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Frame pushed to a socket: `{"event":"newNotification","data":{...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct ServerEvent<'a> {
    pub event: &'static str,
    pub data: &'a Notification,
}

impl<'a> ServerEvent<'a> {
    pub fn new_notification(data: &'a Notification) -> Self {
        Self {
            event: "newNotification",
            data,
        }
    }
}

/// Notification rooms, one per listening user.
pub struct NotificationHub {
    rooms: DashMap<Uuid, broadcast::Sender<Notification>>,
    buffer: usize,
    metrics: Arc<GatewayMetrics>,
}

impl NotificationHub {
    pub fn new(buffer: usize, metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            rooms: DashMap::new(),
            buffer: buffer.max(1),
            metrics,
        }
    }

    /// Join `user`'s room, creating it on first use.
    pub fn join(&self, user: Uuid) -> broadcast::Receiver<Notification> {
        self.rooms
            .entry(user)
            .or_insert_with(|| {
                debug!(user = %user, "opening notification room");
                broadcast::channel(self.buffer).0
            })
            .subscribe()
    }

    /// Close `user`'s room if nobody is listening any more. Call after the
    /// receiver from [`join`](Self::join) has been dropped.
    pub fn leave(&self, user: Uuid) {
        if self
            .rooms
            .remove_if(&user, |_, tx| tx.receiver_count() == 0)
            .is_some()
        {
            debug!(user = %user, "closed notification room");
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Open sockets in `user`'s room.
    pub fn listener_count(&self, user: Uuid) -> usize {
        self.rooms
            .get(&user)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

impl NotificationPublisher for NotificationHub {
    fn publish(&self, notification: &Notification) {
        self.metrics.record_notification();
        let Some(room) = self.rooms.get(&notification.recipient) else {
            return;
        };
        match room.send(notification.clone()) {
            Ok(listeners) => debug!(
                recipient = %notification.recipient,
                listeners,
                "notification pushed"
            ),
            Err(_) => debug!(recipient = %notification.recipient, "room has no listeners"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stackit_forum::NotificationKind;

    fn hub() -> NotificationHub {
        NotificationHub::new(8, Arc::new(GatewayMetrics::new()))
    }

    fn notification(recipient: Uuid) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            recipient,
            kind: NotificationKind::Answer,
            message: "Someone answered your question: \"Q...\"".into(),
            is_read: false,
            related_entity: Some(Uuid::new_v4()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_publish_reaches_every_socket_of_recipient() {
        let hub = hub();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut first = hub.join(user);
        let mut second = hub.join(user);
        let mut bystander = hub.join(other);
        assert_eq!(hub.listener_count(user), 2);

        let sent = notification(user);
        hub.publish(&sent);

        assert_eq!(first.try_recv().unwrap().id, sent.id);
        assert_eq!(second.try_recv().unwrap().id, sent.id);
        assert!(bystander.try_recv().is_err());
    }

    #[test]
    fn test_publish_without_room_is_noop() {
        let hub = hub();
        hub.publish(&notification(Uuid::new_v4()));
        assert_eq!(hub.room_count(), 0);
    }

    #[test]
    fn test_leave_keeps_room_while_listeners_remain() {
        let hub = hub();
        let user = Uuid::new_v4();
        let first = hub.join(user);
        let second = hub.join(user);

        drop(first);
        hub.leave(user);
        assert_eq!(hub.room_count(), 1);

        drop(second);
        hub.leave(user);
        assert_eq!(hub.room_count(), 0);
    }

    #[test]
    fn test_event_frame_shape() {
        let n = notification(Uuid::new_v4());
        let frame = serde_json::to_value(ServerEvent::new_notification(&n)).unwrap();
        assert_eq!(frame["event"], "newNotification");
        assert_eq!(frame["data"]["type"], "answer");
        assert_eq!(frame["data"]["isRead"], false);
        assert_eq!(frame["data"]["_id"], n.id.to_string());
    }
}
