use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{Notification, Role, User};
use crate::ports::outbound::{InMemoryKVStore, NotificationPublisher, TimeSource};
use crate::service::ForumService;
use crate::store::{Collection, DocumentStore, WriteSet};

/// Clock that advances one second on every read, so creation order is
/// strictly increasing and sorts are deterministic.
#[derive(Debug, Default)]
pub struct ManualClock {
    ticks: AtomicI64,
}

impl TimeSource for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(tick)
    }
}

/// Publisher that remembers everything it was handed.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<Notification>>,
}

impl RecordingPublisher {
    pub fn published(&self) -> Vec<Notification> {
        self.published.lock().clone()
    }
}

impl NotificationPublisher for RecordingPublisher {
    fn publish(&self, notification: &Notification) {
        self.published.lock().push(notification.clone());
    }
}

pub fn test_store() -> DocumentStore {
    DocumentStore::new(Box::new(InMemoryKVStore::new()))
}

pub fn test_service() -> (ForumService, Arc<RecordingPublisher>) {
    let publisher = Arc::new(RecordingPublisher::default());
    let service = ForumService::new(
        Box::new(InMemoryKVStore::new()),
        Arc::new(ManualClock::default()),
        publisher.clone(),
    );
    (service, publisher)
}

/// Insert a user directly, skipping password hashing.
pub fn seed_user(store: &mut DocumentStore, username: &str, reputation: i64) -> User {
    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password_hash: String::new(),
        role: Role::User,
        reputation,
        created_at: Utc::now(),
    };
    let mut writes = WriteSet::new();
    writes.put(&user).unwrap();
    writes.put_index(Collection::Users, "username", &user.username, user.id);
    writes.put_index(Collection::Users, "email", &user.email, user.id);
    store.commit(writes).unwrap();
    user
}

/// Seed a user into a running service.
pub fn add_user(service: &ForumService, username: &str) -> User {
    seed_user(&mut service.store.write(), username, 0)
}

pub fn reputation_of(service: &ForumService, user: Uuid) -> i64 {
    service.get_user(user).unwrap().reputation
}
