//! Notification reads, read-state updates and the drafting helpers the
//! answer and comment write paths use.

use uuid::Uuid;

use super::{load, ForumService, NOT_AUTHORIZED};
use crate::domain::entities::{Notification, NotificationKind, User};
use crate::domain::errors::{Entity, ForumError, ForumResult};
use crate::domain::text::{excerpt, mentioned_usernames};
use crate::domain::EXCERPT_CHARS;
use crate::store::{Collection, DocumentStore, WriteSet};

impl ForumService {
    /// Notifications addressed to `actor`, newest first.
    pub fn notifications_for(&self, actor: Uuid) -> ForumResult<Vec<Notification>> {
        let store = self.store.read();
        let mut notifications: Vec<Notification> = store
            .scan::<Notification>()?
            .into_iter()
            .filter(|n| n.recipient == actor)
            .collect();
        super::newest_first(&mut notifications, |n| n.created_at);
        Ok(notifications)
    }

    pub fn mark_read(&self, actor: Uuid, id: Uuid) -> ForumResult<Notification> {
        let mut store = self.store.write();
        let mut notification: Notification = load(&store, id, Entity::Notification)?;
        if notification.recipient != actor {
            return Err(ForumError::Unauthorized(NOT_AUTHORIZED));
        }
        if !notification.is_read {
            notification.is_read = true;
            let mut writes = WriteSet::new();
            writes.put(&notification)?;
            store.commit(writes)?;
        }
        Ok(notification)
    }

    /// Mark every unread notification of `actor` as read. Returns how many changed.
    pub fn mark_all_read(&self, actor: Uuid) -> ForumResult<usize> {
        let mut store = self.store.write();
        let mut writes = WriteSet::new();
        for mut notification in store.scan::<Notification>()? {
            if notification.recipient == actor && !notification.is_read {
                notification.is_read = true;
                writes.put(&notification)?;
            }
        }
        let changed = writes.len();
        store.commit(writes)?;
        tracing::debug!(user = %actor, changed, "marked notifications read");
        Ok(changed)
    }

    pub(crate) fn draft_notification(
        &self,
        recipient: Uuid,
        kind: NotificationKind,
        message: String,
        related_entity: Uuid,
    ) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            recipient,
            kind,
            message,
            is_read: false,
            related_entity: Some(related_entity),
            created_at: self.now(),
        }
    }

    /// Mention notifications for `@username` tokens in `content`.
    ///
    /// Unknown names, the actor and anyone in `already_notified` are skipped.
    pub(crate) fn draft_mentions(
        &self,
        store: &DocumentStore,
        actor: &User,
        content: &str,
        already_notified: &[Uuid],
        related_entity: Uuid,
    ) -> ForumResult<Vec<Notification>> {
        let mut drafts = Vec::new();
        for username in mentioned_usernames(content) {
            let Some(user_id) = store.lookup(Collection::Users, "username", &username)? else {
                continue;
            };
            if user_id == actor.id || already_notified.contains(&user_id) {
                continue;
            }
            let message = format!(
                "{} mentioned you: \"{}...\"",
                actor.username,
                excerpt(content, EXCERPT_CHARS)
            );
            drafts.push(self.draft_notification(
                user_id,
                NotificationKind::Mention,
                message,
                related_entity,
            ));
        }
        Ok(drafts)
    }
}

/// Stage drafted notifications for commit.
pub(crate) fn stage_all(notifications: &[Notification], writes: &mut WriteSet) -> ForumResult<()> {
    for notification in notifications {
        writes.put(notification)?;
    }
    Ok(())
}
