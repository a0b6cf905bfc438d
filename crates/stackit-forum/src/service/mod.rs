//! # Forum Service
//!
//! The application service behind every forum route.
//!
//! ## Write Path
//!
//! 1. Validate input (no lock held)
//! 2. Take the store write lock and load the documents involved
//! 3. Check existence and ownership
//! 4. Stage every changed document, counter and notification in one [`WriteSet`]
//! 5. Commit atomically and release the lock
//! 6. Publish the new notifications to their recipients
//!
//! Reputation changes go through [`ReputationLedger`] so several credits
//! to the same user inside one operation land as a single user write.

mod answers;
mod comments;
mod notifications;
mod questions;
mod users;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{Answer, Comment, Notification, Question, Tag, User};
use crate::domain::errors::{Entity, ForumError, ForumResult};
use crate::domain::views::{
    AnswerView, AuthorRef, CommentView, Populated, QuestionRef, QuestionView, TagRef,
};
use crate::ports::outbound::{
    InMemoryKVStore, KeyValueStore, NoopPublisher, NotificationPublisher, SystemTimeSource,
    TimeSource,
};
use crate::store::{Document, DocumentStore, WriteSet};

const NOT_AUTHORIZED: &str = "User not authorized";

/// The forum application service.
pub struct ForumService {
    pub(crate) store: RwLock<DocumentStore>,
    clock: Arc<dyn TimeSource>,
    publisher: Arc<dyn NotificationPublisher>,
}

impl ForumService {
    pub fn new(
        kv: Box<dyn KeyValueStore>,
        clock: Arc<dyn TimeSource>,
        publisher: Arc<dyn NotificationPublisher>,
    ) -> Self {
        Self {
            store: RwLock::new(DocumentStore::new(kv)),
            clock,
            publisher,
        }
    }

    /// Ephemeral service: in-memory store, wall clock, no real-time push.
    pub fn in_memory() -> Self {
        Self::new(
            Box::new(InMemoryKVStore::new()),
            Arc::new(SystemTimeSource),
            Arc::new(NoopPublisher),
        )
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn publish(&self, notifications: &[Notification]) {
        for notification in notifications {
            tracing::debug!(
                recipient = %notification.recipient,
                kind = ?notification.kind,
                "publishing notification"
            );
            self.publisher.publish(notification);
        }
    }
}

/// Load a document or fail with `NotFound(entity)`.
fn load<D: Document>(store: &DocumentStore, id: Uuid, entity: Entity) -> ForumResult<D> {
    store.get(id)?.ok_or(ForumError::NotFound(entity))
}

/// The acting user. A token whose subject no longer exists cannot write.
fn require_actor(store: &DocumentStore, actor: Uuid) -> ForumResult<User> {
    store
        .get::<User>(actor)?
        .ok_or(ForumError::Unauthorized(NOT_AUTHORIZED))
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

fn oldest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| created_at(item));
}

/// Pending reputation changes for one operation.
#[derive(Debug, Default)]
pub(crate) struct ReputationLedger {
    deltas: HashMap<Uuid, i64>,
}

impl ReputationLedger {
    pub(crate) fn credit(&mut self, user: Uuid, delta: i64) {
        *self.deltas.entry(user).or_insert(0) += delta;
    }

    /// Stage the updated user documents. Users that no longer exist are skipped.
    pub(crate) fn stage(self, store: &DocumentStore, writes: &mut WriteSet) -> ForumResult<()> {
        for (user_id, delta) in self.deltas {
            if delta == 0 {
                continue;
            }
            match store.get::<User>(user_id)? {
                Some(mut user) => {
                    user.reputation += delta;
                    tracing::debug!(
                        user = %user_id,
                        delta,
                        reputation = user.reputation,
                        "reputation change"
                    );
                    writes.put(&user)?;
                }
                None => {
                    tracing::warn!(user = %user_id, delta, "reputation change for missing user")
                }
            }
        }
        Ok(())
    }
}

/// Resolves author and tag references for read views, caching lookups.
pub(crate) struct Populator<'a> {
    store: &'a DocumentStore,
    authors: HashMap<Uuid, Option<AuthorRef>>,
    tags: HashMap<Uuid, Option<TagRef>>,
    questions: HashMap<Uuid, Option<QuestionRef>>,
}

impl<'a> Populator<'a> {
    pub(crate) fn new(store: &'a DocumentStore) -> Self {
        Self {
            store,
            authors: HashMap::new(),
            tags: HashMap::new(),
            questions: HashMap::new(),
        }
    }

    fn author(&mut self, id: Uuid) -> ForumResult<Option<AuthorRef>> {
        if let Some(cached) = self.authors.get(&id) {
            return Ok(cached.clone());
        }
        let author = self.store.get::<User>(id)?.as_ref().map(AuthorRef::from);
        self.authors.insert(id, author.clone());
        Ok(author)
    }

    fn tags(&mut self, ids: &[Uuid]) -> ForumResult<Vec<TagRef>> {
        let mut refs = Vec::with_capacity(ids.len());
        for id in ids {
            let tag = match self.tags.get(id) {
                Some(cached) => cached.clone(),
                None => {
                    let tag = self.store.get::<Tag>(*id)?.as_ref().map(TagRef::from);
                    self.tags.insert(*id, tag.clone());
                    tag
                }
            };
            refs.extend(tag);
        }
        Ok(refs)
    }

    fn question_ref(&mut self, id: Uuid) -> ForumResult<Populated<QuestionRef>> {
        let question = match self.questions.get(&id) {
            Some(cached) => cached.clone(),
            None => {
                let question = self.store.get::<Question>(id)?.as_ref().map(QuestionRef::from);
                self.questions.insert(id, question.clone());
                question
            }
        };
        Ok(question.map_or(Populated::Id(id), Populated::Doc))
    }

    pub(crate) fn question(&mut self, question: Question) -> ForumResult<QuestionView> {
        let author = self.author(question.author)?;
        let tags = self.tags(&question.tags)?;
        Ok(QuestionView::new(question, author, tags))
    }

    /// With `with_question`, the question is populated as `{ _id, title }`.
    pub(crate) fn answer(
        &mut self,
        answer: Answer,
        with_question: bool,
    ) -> ForumResult<AnswerView> {
        let author = self.author(answer.author)?;
        let question = if with_question {
            self.question_ref(answer.question)?
        } else {
            Populated::Id(answer.question)
        };
        Ok(AnswerView::new(answer, author, question))
    }

    pub(crate) fn comment(&mut self, comment: Comment) -> ForumResult<CommentView> {
        let author = self.author(comment.author)?;
        Ok(CommentView::new(comment, author))
    }
}
