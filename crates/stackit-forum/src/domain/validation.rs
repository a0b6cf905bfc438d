//! Input validation for forum write operations.
//!
//! Collects every failing field instead of stopping at the first one, so
//! clients can highlight all problems at once.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::errors::{FieldError, ForumError, ForumResult};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w-]+(?:\.[\w-]+)*@(?:[\w-]+\.)+[a-zA-Z]{2,7}$").expect("email pattern is valid")
});

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Accumulates field errors for one request.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a non-blank string.
    pub fn required(&mut self, param: &str, value: &str, msg: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(FieldError::new(param, msg));
        }
        self
    }

    /// Require a non-empty list.
    pub fn non_empty<T>(&mut self, param: &str, values: &[T], msg: &str) -> &mut Self {
        if values.is_empty() {
            self.errors.push(FieldError::new(param, msg));
        }
        self
    }

    pub fn email(&mut self, param: &str, value: &str) -> &mut Self {
        if !is_valid_email(value) {
            self.errors
                .push(FieldError::new(param, "Please include a valid email"));
        }
        self
    }

    pub fn min_len(&mut self, param: &str, value: &str, min: usize, msg: &str) -> &mut Self {
        if value.chars().count() < min {
            self.errors.push(FieldError::new(param, msg));
        }
        self
    }

    pub fn finish(&mut self) -> ForumResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ForumError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

/// Trimmed, de-duplicated, non-empty tag names in input order.
pub fn normalize_tag_names(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if !name.is_empty() && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}
