//! Answers, acceptance and voting.
//!
//! These paths carry the reputation rules: an accepted answer is worth
//! exactly [`ACCEPT_REWARD`] to its author while it stays accepted, and each
//! standing vote is worth [`UPVOTE_REWARD`] or [`DOWNVOTE_PENALTY`].

use uuid::Uuid;

use super::notifications::stage_all;
use super::{load, require_actor, ForumService, Populator, ReputationLedger, NOT_AUTHORIZED};
use crate::domain::entities::{
    Answer, Comment, CommentTarget, NotificationKind, Question, Vote, VoteDirection,
};
use crate::domain::errors::{Entity, ForumError, ForumResult};
use crate::domain::text::excerpt;
use crate::domain::validation::Validator;
use crate::domain::views::AnswerView;
use crate::domain::{ACCEPT_REWARD, DOWNVOTE_PENALTY, EXCERPT_CHARS, UPVOTE_REWARD};
use crate::store::WriteSet;

fn vote_effect(direction: VoteDirection) -> i64 {
    match direction {
        VoteDirection::Up => UPVOTE_REWARD,
        VoteDirection::Down => DOWNVOTE_PENALTY,
    }
}

impl ForumService {
    /// Answer a question. Notifies the question author and anyone mentioned.
    pub fn post_answer(
        &self,
        actor: Uuid,
        question_id: Uuid,
        content: &str,
    ) -> ForumResult<Answer> {
        Validator::new()
            .required("content", content, "Answer content is required")
            .finish()?;

        let (answer, notifications) = {
            let mut store = self.store.write();
            let author = require_actor(&store, actor)?;
            let mut question: Question = load(&store, question_id, Entity::Question)?;

            let answer = Answer {
                id: Uuid::new_v4(),
                content: content.to_string(),
                author: actor,
                question: question.id,
                upvotes: 0,
                downvotes: 0,
                is_accepted: false,
                created_at: self.now(),
            };
            question.answers_count += 1;

            let mut notifications = Vec::new();
            if question.author != actor {
                notifications.push(self.draft_notification(
                    question.author,
                    NotificationKind::Answer,
                    format!(
                        "Someone answered your question: \"{}...\"",
                        excerpt(&question.title, EXCERPT_CHARS)
                    ),
                    question.id,
                ));
            }
            let notified: Vec<Uuid> = notifications.iter().map(|n| n.recipient).collect();
            notifications.extend(self.draft_mentions(
                &store,
                &author,
                content,
                &notified,
                question.id,
            )?);

            let mut writes = WriteSet::new();
            writes.put(&answer)?;
            writes.put(&question)?;
            stage_all(&notifications, &mut writes)?;
            store.commit(writes)?;
            (answer, notifications)
        };

        tracing::info!(
            answer = %answer.id,
            question = %question_id,
            notifications = notifications.len(),
            "answer posted"
        );
        self.publish(&notifications);
        Ok(answer)
    }

    /// Answers to a question, oldest first. Unknown questions have none.
    pub fn answers_for_question(&self, question_id: Uuid) -> ForumResult<Vec<AnswerView>> {
        let store = self.store.read();
        let mut answers: Vec<Answer> = store
            .scan::<Answer>()?
            .into_iter()
            .filter(|a| a.question == question_id)
            .collect();
        super::oldest_first(&mut answers, |a| a.created_at);

        let mut populator = Populator::new(&store);
        answers.into_iter().map(|a| populator.answer(a, false)).collect()
    }

    /// Delete an answer with its comments and votes. Author only.
    pub fn delete_answer(&self, actor: Uuid, id: Uuid) -> ForumResult<()> {
        let mut store = self.store.write();
        require_actor(&store, actor)?;
        let answer: Answer = load(&store, id, Entity::Answer)?;
        if answer.author != actor {
            return Err(ForumError::Unauthorized(NOT_AUTHORIZED));
        }

        let mut writes = WriteSet::new();
        writes.delete(&answer);
        if let Some(mut question) = store.get::<Question>(answer.question)? {
            question.answers_count = question.answers_count.saturating_sub(1);
            writes.put(&question)?;
        }
        for vote in store.scan_prefix::<Vote>(&Vote::answer_prefix(id))? {
            writes.delete(&vote);
        }
        for comment in store.scan::<Comment>()? {
            if comment.target == CommentTarget::Answer(id) {
                writes.delete(&comment);
            }
        }
        store.commit(writes)?;

        tracing::info!(answer = %id, question = %answer.question, "answer deleted");
        Ok(())
    }

    /// Toggle acceptance. Only the question author may call this.
    ///
    /// Accepting clears any other accepted answer on the question and takes
    /// back the reward its author received.
    pub fn accept_answer(&self, actor: Uuid, id: Uuid) -> ForumResult<Answer> {
        let mut store = self.store.write();
        require_actor(&store, actor)?;
        let mut answer: Answer = load(&store, id, Entity::Answer)?;
        let question: Question = load(&store, answer.question, Entity::Question)?;
        if question.author != actor {
            return Err(ForumError::Unauthorized(
                "User not authorized to accept this answer",
            ));
        }

        let mut writes = WriteSet::new();
        let mut ledger = ReputationLedger::default();

        if answer.is_accepted {
            answer.is_accepted = false;
            ledger.credit(answer.author, -ACCEPT_REWARD);
        } else {
            for mut sibling in store.scan::<Answer>()? {
                if sibling.question == question.id && sibling.id != answer.id && sibling.is_accepted
                {
                    sibling.is_accepted = false;
                    ledger.credit(sibling.author, -ACCEPT_REWARD);
                    writes.put(&sibling)?;
                    tracing::debug!(answer = %sibling.id, "previously accepted answer cleared");
                }
            }
            answer.is_accepted = true;
            ledger.credit(answer.author, ACCEPT_REWARD);
        }

        writes.put(&answer)?;
        ledger.stage(&store, &mut writes)?;
        store.commit(writes)?;

        tracing::info!(
            answer = %answer.id,
            accepted = answer.is_accepted,
            "answer acceptance toggled"
        );
        Ok(answer)
    }

    /// Cast, or switch, the actor's vote on an answer.
    ///
    /// `vote_type` is `up` or `down`. Repeating a standing vote is rejected;
    /// switching reverses the old vote before applying the new one.
    pub fn vote_answer(&self, actor: Uuid, id: Uuid, vote_type: &str) -> ForumResult<Answer> {
        let mut store = self.store.write();
        require_actor(&store, actor)?;
        let mut answer: Answer = load(&store, id, Entity::Answer)?;
        if answer.author == actor {
            return Err(ForumError::BadRequest("Cannot vote on your own answer".into()));
        }
        let direction: VoteDirection = vote_type
            .parse()
            .map_err(|_| ForumError::BadRequest("Invalid vote type".into()))?;

        let mut ledger = ReputationLedger::default();
        if let Some(previous) = store.get_by_key::<Vote>(&Vote::key_for(id, actor))? {
            if previous.direction == direction {
                return Err(ForumError::BadRequest(
                    "You have already voted on this answer".into(),
                ));
            }
            match previous.direction {
                VoteDirection::Up => answer.upvotes = answer.upvotes.saturating_sub(1),
                VoteDirection::Down => answer.downvotes = answer.downvotes.saturating_sub(1),
            }
            ledger.credit(answer.author, -vote_effect(previous.direction));
        }

        match direction {
            VoteDirection::Up => answer.upvotes += 1,
            VoteDirection::Down => answer.downvotes += 1,
        }
        ledger.credit(answer.author, vote_effect(direction));

        let vote = Vote {
            answer: id,
            voter: actor,
            direction,
            created_at: self.now(),
        };
        let mut writes = WriteSet::new();
        writes.put(&answer)?;
        writes.put(&vote)?;
        ledger.stage(&store, &mut writes)?;
        store.commit(writes)?;

        tracing::info!(answer = %id, voter = %actor, %direction, "vote recorded");
        Ok(answer)
    }
}
