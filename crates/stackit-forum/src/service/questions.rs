//! Questions and their tags.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use super::{load, require_actor, ForumService, Populator, NOT_AUTHORIZED};
use crate::domain::entities::{Answer, Comment, CommentTarget, Question, Tag, Vote};
use crate::domain::errors::{Entity, ForumError, ForumResult};
use crate::domain::validation::{normalize_tag_names, Validator};
use crate::domain::views::QuestionView;
use crate::ports::inbound::{NewQuestion, QuestionQuery, SortField, SortOrder};
use crate::store::{Collection, DocumentStore, WriteSet};

fn validate(input: &NewQuestion) -> ForumResult<Vec<String>> {
    let tags = normalize_tag_names(&input.tags);
    Validator::new()
        .required("title", &input.title, "Title is required")
        .required("description", &input.description, "Description is required")
        .non_empty("tags", &tags, "Tags are required")
        .finish()?;
    Ok(tags)
}

/// Ids for `names`, staging a new tag for every name not seen before.
fn resolve_tags(
    store: &DocumentStore,
    names: &[String],
    now: DateTime<Utc>,
    writes: &mut WriteSet,
) -> ForumResult<Vec<Uuid>> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let id = match store.lookup(Collection::Tags, "name", name)? {
            Some(id) => id,
            None => {
                let tag = Tag {
                    id: Uuid::new_v4(),
                    name: name.clone(),
                    created_at: now,
                };
                writes.put(&tag)?;
                writes.put_index(Collection::Tags, "name", &tag.name, tag.id);
                tracing::debug!(tag = %tag.name, "created tag");
                tag.id
            }
        };
        ids.push(id);
    }
    Ok(ids)
}

impl ForumService {
    pub fn create_question(&self, actor: Uuid, input: NewQuestion) -> ForumResult<QuestionView> {
        let tag_names = validate(&input)?;

        let mut store = self.store.write();
        require_actor(&store, actor)?;

        let now = self.now();
        let mut writes = WriteSet::new();
        let tags = resolve_tags(&store, &tag_names, now, &mut writes)?;
        let question = Question {
            id: Uuid::new_v4(),
            title: input.title.trim().to_string(),
            description: input.description,
            tags,
            author: actor,
            created_at: now,
            answers_count: 0,
        };
        writes.put(&question)?;
        store.commit(writes)?;

        tracing::info!(question = %question.id, author = %actor, "question created");
        Populator::new(&store).question(question)
    }

    /// All questions matching `query`, author and tags populated.
    pub fn list_questions(&self, query: &QuestionQuery) -> ForumResult<Vec<QuestionView>> {
        let store = self.store.read();
        let mut questions = store.scan::<Question>()?;

        if let Some(names) = query.tag_names() {
            let mut wanted = HashSet::new();
            for name in &names {
                wanted.extend(store.lookup(Collection::Tags, "name", name)?);
            }
            questions.retain(|q| q.tags.iter().any(|t| wanted.contains(t)));
        }

        let (field, order) = query.sort();
        questions.sort_by(|a, b| {
            let ordering = match field {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::AnswersCount => a
                    .answers_count
                    .cmp(&b.answers_count)
                    .then(a.created_at.cmp(&b.created_at)),
            };
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let mut populator = Populator::new(&store);
        questions.into_iter().map(|q| populator.question(q)).collect()
    }

    pub fn get_question(&self, id: Uuid) -> ForumResult<QuestionView> {
        let store = self.store.read();
        let question: Question = load(&store, id, Entity::Question)?;
        Populator::new(&store).question(question)
    }

    /// Replace title, description and tags. Author only.
    pub fn update_question(
        &self,
        actor: Uuid,
        id: Uuid,
        input: NewQuestion,
    ) -> ForumResult<QuestionView> {
        let tag_names = validate(&input)?;

        let mut store = self.store.write();
        require_actor(&store, actor)?;
        let mut question: Question = load(&store, id, Entity::Question)?;
        if question.author != actor {
            return Err(ForumError::Unauthorized(NOT_AUTHORIZED));
        }

        let mut writes = WriteSet::new();
        question.title = input.title.trim().to_string();
        question.description = input.description;
        question.tags = resolve_tags(&store, &tag_names, self.now(), &mut writes)?;
        writes.put(&question)?;
        store.commit(writes)?;

        tracing::info!(question = %question.id, "question updated");
        Populator::new(&store).question(question)
    }

    /// Delete a question together with its answers, their votes and every
    /// comment on the question or its answers. Earned reputation stays.
    pub fn delete_question(&self, actor: Uuid, id: Uuid) -> ForumResult<()> {
        let mut store = self.store.write();
        require_actor(&store, actor)?;
        let question: Question = load(&store, id, Entity::Question)?;
        if question.author != actor {
            return Err(ForumError::Unauthorized(NOT_AUTHORIZED));
        }

        let mut writes = WriteSet::new();
        let answers: Vec<Answer> = store
            .scan::<Answer>()?
            .into_iter()
            .filter(|a| a.question == id)
            .collect();
        let answer_ids: HashSet<Uuid> = answers.iter().map(|a| a.id).collect();

        for answer in &answers {
            for vote in store.scan_prefix::<Vote>(&Vote::answer_prefix(answer.id))? {
                writes.delete(&vote);
            }
            writes.delete(answer);
        }

        let mut removed_comments = 0usize;
        for comment in store.scan::<Comment>()? {
            let attached = match comment.target {
                CommentTarget::Question(q) => q == id,
                CommentTarget::Answer(a) => answer_ids.contains(&a),
            };
            if attached {
                writes.delete(&comment);
                removed_comments += 1;
            }
        }

        writes.delete(&question);
        store.commit(writes)?;

        tracing::info!(
            question = %id,
            answers = answers.len(),
            comments = removed_comments,
            "question deleted"
        );
        Ok(())
    }
}
