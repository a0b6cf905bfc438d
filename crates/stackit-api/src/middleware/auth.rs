//! Bearer token authentication.
//!
//! Private routes take an [`AuthUser`] argument. The extractor reads the token
//! from `x-auth-token` or `Authorization: Bearer`, verifies it with the shared
//! HS256 secret and yields the user id carried in its claims.

use crate::domain::error::ApiError;
use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub const NO_TOKEN: &str = "No token, authorization denied";
pub const INVALID_TOKEN: &str = "Token is not valid";

/// Subject of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUser {
    pub id: Uuid,
}

/// Token claims: `{ "user": { "id" }, "iat", "exp" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user: TokenUser,
    pub iat: i64,
    pub exp: i64,
}

/// Verifies HS256 tokens against the configured secret.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// User id of a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Result<Uuid, ApiError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims.user.id)
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                ApiError::unauthorized(INVALID_TOKEN)
            })
    }

    /// Find and verify the token in `headers`.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Uuid, ApiError> {
        let token = extract_token(headers).ok_or_else(|| ApiError::unauthorized(NO_TOKEN))?;
        self.verify(token)
    }
}

/// Token from `x-auth-token`, falling back to `Authorization: Bearer`.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = headers
        .get("x-auth-token")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token);
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The authenticated caller of a private route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<TokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<TokenVerifier>::from_ref(state);
        verifier.authenticate(&parts.headers).map(AuthUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "unit-secret";

    fn token_for(id: Uuid, exp_offset: i64, secret: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            user: TokenUser { id },
            iat: now,
            exp: now + exp_offset,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn headers(name: &'static str, value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(name, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn test_extract_token_sources() {
        assert_eq!(extract_token(&headers("x-auth-token", "abc")), Some("abc"));
        assert_eq!(
            extract_token(&headers("authorization", "Bearer xyz")),
            Some("xyz")
        );
        assert_eq!(extract_token(&headers("authorization", "Basic xyz")), None);
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_valid_token() {
        let id = Uuid::new_v4();
        let verifier = TokenVerifier::new(SECRET);
        let token = token_for(id, 3600, SECRET);
        assert_eq!(verifier.verify(&token).unwrap(), id);
        assert_eq!(
            verifier
                .authenticate(&headers("authorization", &format!("Bearer {}", token)))
                .unwrap(),
            id
        );
    }

    #[test]
    fn test_rejections() {
        let verifier = TokenVerifier::new(SECRET);
        let id = Uuid::new_v4();

        let missing = verifier.authenticate(&HeaderMap::new()).unwrap_err();
        assert_eq!(missing.message(), Some(NO_TOKEN));

        for token in [
            token_for(id, 3600, "other-secret"),
            token_for(id, -3600, SECRET),
            "not.a.jwt".to_string(),
        ] {
            let err = verifier.verify(&token).unwrap_err();
            assert_eq!(err.message(), Some(INVALID_TOKEN));
        }
    }
}
