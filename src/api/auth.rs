//! Token authentication.
//!
//! Keys are issued elsewhere; this side only resolves
//! `Authorization: Token <uuid>` to a user. A header that is present but
//! malformed or unknown is rejected even on public routes.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use super::{error::ApiError, AppState};
use crate::models::User;

/// Caller that must be authenticated.
pub struct AuthUser(pub User);

/// Caller that may be anonymous.
pub struct MaybeUser(pub Option<User>);

pub fn parse_token(header: &str) -> Option<Uuid> {
    let key = header.strip_prefix("Token ")?;
    Uuid::parse_str(key.trim()).ok()
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<User>, ApiError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let key = value
        .to_str()
        .ok()
        .and_then(parse_token)
        .ok_or(ApiError::InvalidToken)?;

    state
        .tokens()
        .resolve(key)
        .await?
        .ok_or(ApiError::InvalidToken)
        .map(Some)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await?.map(Self).ok_or(ApiError::Unauthorized)
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_scheme() {
        let key = Uuid::new_v4();
        assert_eq!(parse_token(&format!("Token {key}")), Some(key));
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        let key = Uuid::new_v4();
        assert_eq!(parse_token(&format!("Bearer {key}")), None);
        assert_eq!(parse_token("Token not-a-uuid"), None);
        assert_eq!(parse_token(""), None);
    }
}
