//! Axum extractor for the authenticated user.

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};

use crate::{AppState, auth::session, errors::Error, types::UserId};

/// The authenticated caller, as vouched for by the identity verifier.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Option<String>,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(Error::Unauthenticated { message: None })?;

        let token = header.strip_prefix("Bearer ").ok_or(Error::Unauthenticated {
            message: Some("Expected a bearer token".to_string()),
        })?;

        session::verify_token(token, &state.config)
    }
}
