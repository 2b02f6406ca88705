//! # Identity
//!
//! Stateless bearer-token auth: HS256 access/refresh pair signed with the
//! configured secret, argon2 password hashes at rest. Handlers that need an
//! identity take [`Identity`] as an extractor; the rest of the system only
//! ever sees the validated `id`/`username`/`is_staff` triple.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub is_staff: bool,
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

/// A validated caller.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: i32,
    pub username: String,
    pub is_staff: bool,
}

pub fn issue_token(
    secret: &str,
    user_id: i32,
    username: &str,
    is_staff: bool,
    kind: TokenKind,
) -> Result<String, AppError> {
    let now = Utc::now();
    let ttl = match kind {
        TokenKind::Access => Duration::hours(1),
        TokenKind::Refresh => Duration::days(7),
    };

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        is_staff,
        token_type: kind.as_str().to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::Unauthorized)
}

pub fn verify_token(secret: &str, token: &str, kind: TokenKind) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    if data.claims.token_type != kind.as_str() {
        return Err(AppError::Unauthorized);
    }

    Ok(data.claims)
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AppError::Validation("No se pudo procesar la contraseña.".into()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

pub fn require_staff(identity: &Identity) -> Result<(), AppError> {
    if identity.is_staff {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = header.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;

        let claims = verify_token(&state.config.jwt_secret, token, TokenKind::Access)?;

        Ok(Identity {
            id: claims.sub.parse().map_err(|_| AppError::Unauthorized)?,
            username: claims.username,
            is_staff: claims.is_staff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{TokenKind, hash_password, issue_token, verify_password, verify_token};

    #[test]
    fn test_token_round_trip() {
        let token = issue_token("secret", 7, "ana", true, TokenKind::Access).unwrap();
        let claims = verify_token("secret", &token, TokenKind::Access).unwrap();

        assert_eq!(claims.sub, "7");
        assert_eq!(claims.username, "ana");
        assert!(claims.is_staff);
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let token = issue_token("secret", 7, "ana", false, TokenKind::Refresh).unwrap();

        assert!(verify_token("secret", &token, TokenKind::Access).is_err());
        assert!(verify_token("secret", &token, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token("secret", 7, "ana", false, TokenKind::Access).unwrap();

        assert!(verify_token("other", &token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_password_hash_verifies() {
        let hash = hash_password("contraseña-larga").unwrap();

        assert!(verify_password("contraseña-larga", &hash));
        assert!(!verify_password("otra", &hash));
    }
}
