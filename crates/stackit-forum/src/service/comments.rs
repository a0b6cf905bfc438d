//! Comments on questions and answers.

use uuid::Uuid;

use super::notifications::stage_all;
use super::{load, require_actor, ForumService, Populator, NOT_AUTHORIZED};
use crate::domain::entities::{
    Answer, Comment, CommentTarget, Notification, NotificationKind, Question, User,
};
use crate::domain::errors::{Entity, ForumError, ForumResult};
use crate::domain::text::excerpt;
use crate::domain::validation::Validator;
use crate::domain::views::CommentView;
use crate::domain::EXCERPT_CHARS;
use crate::store::{DocumentStore, WriteSet};

fn validate(content: &str) -> ForumResult<()> {
    Validator::new()
        .required("content", content, "Comment content is required")
        .finish()
}

impl ForumService {
    pub fn comment_on_question(
        &self,
        actor: Uuid,
        question_id: Uuid,
        content: &str,
    ) -> ForumResult<Comment> {
        validate(content)?;
        self.write_comment(actor, content, |store| {
            let question: Question = load(store, question_id, Entity::Question)?;
            let message = format!(
                "Someone commented on your question: \"{}...\"",
                excerpt(&question.title, EXCERPT_CHARS)
            );
            Ok((CommentTarget::Question(question.id), question.author, message))
        })
    }

    pub fn comment_on_answer(
        &self,
        actor: Uuid,
        answer_id: Uuid,
        content: &str,
    ) -> ForumResult<Comment> {
        validate(content)?;
        self.write_comment(actor, content, |store| {
            let answer: Answer = load(store, answer_id, Entity::Answer)?;
            Ok((
                CommentTarget::Answer(answer.id),
                answer.author,
                "Someone commented on your answer.".to_string(),
            ))
        })
    }

    /// Shared comment write path. `resolve` loads the target and returns it
    /// with the owner to notify and the notification message.
    fn write_comment<F>(&self, actor: Uuid, content: &str, resolve: F) -> ForumResult<Comment>
    where
        F: FnOnce(&DocumentStore) -> ForumResult<(CommentTarget, Uuid, String)>,
    {
        let (comment, notifications) = {
            let mut store = self.store.write();
            let author: User = require_actor(&store, actor)?;
            let (target, owner, message) = resolve(&*store)?;
            let related = match target {
                CommentTarget::Question(id) | CommentTarget::Answer(id) => id,
            };

            let comment = Comment {
                id: Uuid::new_v4(),
                content: content.to_string(),
                author: actor,
                target,
                created_at: self.now(),
            };

            let mut notifications: Vec<Notification> = Vec::new();
            if owner != actor {
                notifications.push(self.draft_notification(
                    owner,
                    NotificationKind::Comment,
                    message,
                    related,
                ));
            }
            let notified: Vec<Uuid> = notifications.iter().map(|n| n.recipient).collect();
            let mentions = self.draft_mentions(&store, &author, content, &notified, related)?;
            notifications.extend(mentions);

            let mut writes = WriteSet::new();
            writes.put(&comment)?;
            stage_all(&notifications, &mut writes)?;
            store.commit(writes)?;
            (comment, notifications)
        };

        tracing::info!(comment = %comment.id, target = ?comment.target, "comment posted");
        self.publish(&notifications);
        Ok(comment)
    }

    pub fn comments_for_question(&self, question_id: Uuid) -> ForumResult<Vec<CommentView>> {
        self.comments_on(CommentTarget::Question(question_id))
    }

    pub fn comments_for_answer(&self, answer_id: Uuid) -> ForumResult<Vec<CommentView>> {
        self.comments_on(CommentTarget::Answer(answer_id))
    }

    fn comments_on(&self, target: CommentTarget) -> ForumResult<Vec<CommentView>> {
        let store = self.store.read();
        let mut comments: Vec<Comment> = store
            .scan::<Comment>()?
            .into_iter()
            .filter(|c| c.target == target)
            .collect();
        super::oldest_first(&mut comments, |c| c.created_at);

        let mut populator = Populator::new(&store);
        comments.into_iter().map(|c| populator.comment(c)).collect()
    }

    pub fn delete_comment(&self, actor: Uuid, id: Uuid) -> ForumResult<()> {
        let mut store = self.store.write();
        require_actor(&store, actor)?;
        let comment: Comment = load(&store, id, Entity::Comment)?;
        if comment.author != actor {
            return Err(ForumError::Unauthorized(NOT_AUTHORIZED));
        }
        let mut writes = WriteSet::new();
        writes.delete(&comment);
        store.commit(writes)?;

        tracing::info!(comment = %id, "comment deleted");
        Ok(())
    }
}
