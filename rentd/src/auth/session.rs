//! JWT bearer token verification.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{auth::CurrentUser, config::Config, errors::Error, types::UserId};

/// Claims carried by the identity verifier's tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: UserId,           // Subject (user ID)
    pub email: Option<String>, // User email, when the verifier includes it
    pub exp: i64,              // Expiration time
    pub iat: i64,              // Issued at
}

impl From<TokenClaims> for CurrentUser {
    fn from(claims: TokenClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
        }
    }
}

/// Verify and decode a bearer token issued by the identity verifier
pub fn verify_token(token: &str, config: &Config) -> Result<CurrentUser, Error> {
    let secret_key = config.secret_key.as_ref().ok_or_else(|| Error::Internal {
        operation: "verify bearer token: secret_key is required".to_string(),
    })?;

    let key = DecodingKey::from_secret(secret_key.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<TokenClaims>(token, &key, &validation).map_err(|e| Error::Unauthenticated {
        message: Some(format!("Invalid token: {e}")),
    })?;

    Ok(token_data.claims.into())
}
