//! Account registration and profile reads.

use uuid::Uuid;

use super::{load, ForumService, Populator};
use crate::domain::credentials::{hash_password, verify_password};
use crate::domain::entities::{Answer, Question, Role, User};
use crate::domain::errors::{Entity, ForumError, ForumResult};
use crate::domain::validation::{Validator, MIN_PASSWORD_LEN};
use crate::domain::views::{AnswerView, QuestionView, UserProfile};
use crate::ports::inbound::NewUser;
use crate::store::{Collection, WriteSet};

impl ForumService {
    /// Create an account. Usernames and emails are unique; emails are
    /// compared lowercased.
    pub fn register_user(&self, input: NewUser) -> ForumResult<UserProfile> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_lowercase();

        Validator::new()
            .required("username", &username, "Username is required")
            .email("email", &email)
            .min_len(
                "password",
                &input.password,
                MIN_PASSWORD_LEN,
                "Please enter a password with 6 or more characters",
            )
            .finish()?;

        let password_hash = hash_password(&input.password)?;

        let mut store = self.store.write();
        if store.lookup(Collection::Users, "username", &username)?.is_some()
            || store.lookup(Collection::Users, "email", &email)?.is_some()
        {
            return Err(ForumError::BadRequest("User already exists".into()));
        }

        let user = User {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            role: Role::default(),
            reputation: 0,
            created_at: self.now(),
        };

        let mut writes = WriteSet::new();
        writes.put(&user)?;
        writes.put_index(Collection::Users, "username", &user.username, user.id);
        writes.put_index(Collection::Users, "email", &user.email, user.id);
        store.commit(writes)?;

        tracing::info!(user = %user.id, username = %user.username, "registered user");
        Ok(UserProfile::from(&user))
    }

    /// Check an email/password pair, for identity providers that mint tokens
    /// against this store.
    pub fn verify_credentials(&self, email: &str, password: &str) -> ForumResult<UserProfile> {
        let invalid = || ForumError::BadRequest("Invalid Credentials".into());

        let store = self.store.read();
        let id = store
            .lookup(Collection::Users, "email", &email.trim().to_lowercase())?
            .ok_or_else(invalid)?;
        let user: User = load(&store, id, Entity::User)?;
        if !verify_password(password, &user.password_hash)? {
            return Err(invalid());
        }
        Ok(UserProfile::from(&user))
    }

    pub fn get_user(&self, id: Uuid) -> ForumResult<UserProfile> {
        let store = self.store.read();
        let user: User = load(&store, id, Entity::User)?;
        Ok(UserProfile::from(&user))
    }

    /// Profile of the token subject.
    pub fn current_user(&self, actor: Uuid) -> ForumResult<UserProfile> {
        self.get_user(actor)
    }

    /// Questions asked by `id`, newest first.
    pub fn user_questions(&self, id: Uuid) -> ForumResult<Vec<QuestionView>> {
        let store = self.store.read();
        let mut questions: Vec<Question> = store
            .scan::<Question>()?
            .into_iter()
            .filter(|q| q.author == id)
            .collect();
        super::newest_first(&mut questions, |q| q.created_at);

        let mut populator = Populator::new(&store);
        questions.into_iter().map(|q| populator.question(q)).collect()
    }

    /// Answers written by `id`, newest first, each with its question's title.
    pub fn user_answers(&self, id: Uuid) -> ForumResult<Vec<AnswerView>> {
        let store = self.store.read();
        let mut answers: Vec<Answer> = store
            .scan::<Answer>()?
            .into_iter()
            .filter(|a| a.author == id)
            .collect();
        super::newest_first(&mut answers, |a| a.created_at);

        let mut populator = Populator::new(&store);
        answers.into_iter().map(|a| populator.answer(a, true)).collect()
    }
}
