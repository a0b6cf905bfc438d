//! # Inbound Request Types
//!
//! Bodies and query strings accepted by the forum operations. Every field
//! defaults when absent so missing input surfaces as a validation error
//! rather than a decode failure.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Body of question create and update requests.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewQuestion {
    pub title: String,
    pub description: String,
    /// Tag names. Unknown names are created.
    pub tags: Vec<String>,
}

/// Body of answer and comment create requests.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewContent {
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    AnswersCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Query string of the question listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuestionQuery {
    /// Comma-separated tag names; a question matches if it carries any.
    pub tags: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

impl QuestionQuery {
    /// Requested tag names, trimmed, blanks dropped. `None` means no filter.
    pub fn tag_names(&self) -> Option<Vec<String>> {
        let names: Vec<String> = self
            .tags
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        (!names.is_empty()).then_some(names)
    }

    /// Resolved sort. An unknown field falls back to newest first
    /// regardless of `order`.
    pub fn sort(&self) -> (SortField, SortOrder) {
        let field = match self.sort_by.as_deref() {
            None | Some("createdAt") => SortField::CreatedAt,
            Some("answersCount") => SortField::AnswersCount,
            Some(_) => return (SortField::CreatedAt, SortOrder::Desc),
        };
        let order = match self.order.as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };
        (field, order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(tags: Option<&str>, sort_by: Option<&str>, order: Option<&str>) -> QuestionQuery {
        QuestionQuery {
            tags: tags.map(String::from),
            sort_by: sort_by.map(String::from),
            order: order.map(String::from),
        }
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        assert_eq!(
            QuestionQuery::default().sort(),
            (SortField::CreatedAt, SortOrder::Desc)
        );
    }

    #[test]
    fn test_answers_count_ascending() {
        assert_eq!(
            query(None, Some("answersCount"), Some("asc")).sort(),
            (SortField::AnswersCount, SortOrder::Asc)
        );
    }

    #[test]
    fn test_unknown_sort_field_ignores_order() {
        assert_eq!(
            query(None, Some("title"), Some("asc")).sort(),
            (SortField::CreatedAt, SortOrder::Desc)
        );
    }

    #[test]
    fn test_tag_names_split_and_trim() {
        assert_eq!(
            query(Some(" rust, ,axum "), None, None).tag_names(),
            Some(vec!["rust".to_string(), "axum".to_string()])
        );
        assert_eq!(QuestionQuery::default().tag_names(), None);
        assert_eq!(query(Some(" , "), None, None).tag_names(), None);
    }

    #[test]
    fn test_missing_body_fields_default() {
        let body: NewQuestion = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
        assert_eq!(body.title, "t");
        assert!(body.description.is_empty());
        assert!(body.tags.is_empty());
    }
}
