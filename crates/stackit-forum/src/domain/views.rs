//! Read-side shapes returned to clients, with referenced documents
//! populated in place of bare ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{Answer, Comment, CommentTarget, Question, Role, Tag, User};

/// Public user profile. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub reputation: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            reputation: user.reputation,
            created_at: user.created_at,
        }
    }
}

/// Author reference embedded in questions, answers and comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub reputation: i64,
}

impl From<&User> for AuthorRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            reputation: user.reputation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
}

impl From<&Tag> for TagRef {
    fn from(tag: &Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRef {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
}

impl From<&Question> for QuestionRef {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            title: question.title.clone(),
        }
    }
}

/// A reference that is either a bare id or the populated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Populated<T> {
    Id(Uuid),
    Doc(T),
}

impl<T> Populated<T> {
    pub fn as_doc(&self) -> Option<&T> {
        match self {
            Populated::Doc(doc) => Some(doc),
            Populated::Id(_) => None,
        }
    }
}

/// `author` is `None` when the referenced user no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub tags: Vec<TagRef>,
    pub author: Option<AuthorRef>,
    pub created_at: DateTime<Utc>,
    pub answers_count: u32,
}

impl QuestionView {
    pub fn new(question: Question, author: Option<AuthorRef>, tags: Vec<TagRef>) -> Self {
        Self {
            id: question.id,
            title: question.title,
            description: question.description,
            tags,
            author,
            created_at: question.created_at,
            answers_count: question.answers_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub content: String,
    pub author: Option<AuthorRef>,
    pub question: Populated<QuestionRef>,
    pub upvotes: u32,
    pub downvotes: u32,
    pub is_accepted: bool,
    pub created_at: DateTime<Utc>,
}

impl AnswerView {
    pub fn new(
        answer: Answer,
        author: Option<AuthorRef>,
        question: Populated<QuestionRef>,
    ) -> Self {
        Self {
            id: answer.id,
            content: answer.content,
            author,
            question,
            upvotes: answer.upvotes,
            downvotes: answer.downvotes,
            is_accepted: answer.is_accepted,
            created_at: answer.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub content: String,
    pub author: Option<AuthorRef>,
    #[serde(flatten)]
    pub target: CommentTarget,
    pub created_at: DateTime<Utc>,
}

impl CommentView {
    pub fn new(comment: Comment, author: Option<AuthorRef>) -> Self {
        Self {
            id: comment.id,
            content: comment.content,
            author,
            target: comment.target,
            created_at: comment.created_at,
        }
    }
}
