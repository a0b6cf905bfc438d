//! # Forum Documents
//!
//! The documents persisted in the store. Field names follow the JSON shape
//! the web client consumes (`_id`, camelCase).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::store::{Collection, Document};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    #[default]
    User,
    Admin,
}

/// A registered account.
///
/// Never serialized to clients; see [`crate::UserProfile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub reputation: i64,
    pub created_at: DateTime<Utc>,
}

/// A question tag. Names are unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub tags: Vec<Uuid>,
    pub author: Uuid,
    pub created_at: DateTime<Utc>,
    pub answers_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub content: String,
    pub author: Uuid,
    pub question: Uuid,
    pub upvotes: u32,
    pub downvotes: u32,
    pub is_accepted: bool,
    pub created_at: DateTime<Utc>,
}

/// What a comment is attached to. Serialized as a `question` or `answer` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommentTarget {
    Question(Uuid),
    Answer(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub content: String,
    pub author: Uuid,
    #[serde(flatten)]
    pub target: CommentTarget,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Answer,
    Comment,
    Mention,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub recipient: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub is_read: bool,
    /// Question, answer or comment the notification points at.
    pub related_entity: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl FromStr for VoteDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(VoteDirection::Up),
            "down" => Ok(VoteDirection::Down),
            _ => Err(()),
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteDirection::Up => write!(f, "up"),
            VoteDirection::Down => write!(f, "down"),
        }
    }
}

/// A voter's standing vote on an answer. Keyed by (answer, voter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub answer: Uuid,
    pub voter: Uuid,
    pub direction: VoteDirection,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn key_for(answer: Uuid, voter: Uuid) -> String {
        format!("{}/{}", answer, voter)
    }

    /// Key prefix shared by every vote on one answer.
    pub fn answer_prefix(answer: Uuid) -> String {
        format!("{}/", answer)
    }
}

impl Document for User {
    const COLLECTION: Collection = Collection::Users;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Document for Tag {
    const COLLECTION: Collection = Collection::Tags;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Document for Question {
    const COLLECTION: Collection = Collection::Questions;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Document for Answer {
    const COLLECTION: Collection = Collection::Answers;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Document for Comment {
    const COLLECTION: Collection = Collection::Comments;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Document for Notification {
    const COLLECTION: Collection = Collection::Notifications;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

impl Document for Vote {
    const COLLECTION: Collection = Collection::Votes;

    fn key(&self) -> String {
        Vote::key_for(self.answer, self.voter)
    }
}
