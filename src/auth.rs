use std::time::{Duration, SystemTime, UNIX_EPOCH};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{config::AppConfig, error::ApiError, repository::RepositoryState};

/// TokenKind
///
/// Distinguishes the short-lived credential presented on every request from the long-lived one
/// that may only be exchanged for a new access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims
///
/// Payload of every bearer token this service signs.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the id of the user the token was issued to.
    pub sub: Uuid,
    /// Expiration Time (exp): seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
    /// Unique token id, so two tokens minted in the same second still differ.
    pub jti: Uuid,
    pub token_type: TokenKind,
}

#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
    #[error("expected a {0:?} token")]
    WrongKind(TokenKind),
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// TokenIssuer
///
/// Mints and verifies HS256 bearer tokens. Built once from `AppConfig` and shared through the
/// application state.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        )
    }

    pub fn mint(&self, user_id: Uuid, kind: TokenKind) -> Result<String, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: user_id,
            iat: now.as_secs() as usize,
            exp: (now + ttl).as_secs() as usize,
            jti: Uuid::new_v4(),
            token_type: kind,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Decodes `token`, checks signature and expiry, and requires it to be of `expected` kind.
    /// Returns the embedded user id.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Uuid, TokenError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        // Tokens are rejected the second they expire.
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        if data.claims.token_type != expected {
            return Err(TokenError::WrongKind(expected));
        }
        Ok(data.claims.sub)
    }
}

/// Hashes a raw password with Argon2id and a fresh random salt. Returns a PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Checks `password` against a stored PHC hash in constant time.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| ApiError::Internal(format!("stored password hash is malformed: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ApiError::Internal(format!(
            "password verification failed: {e}"
        ))),
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers pass `id` explicitly into every
/// service call as the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
}

/// AuthUser Extractor Implementation
///
/// 1. Token Extraction: `Authorization: Bearer <token>`.
/// 2. Token Validation: signature, expiry and access kind.
/// 3. DB Lookup: the subject must still exist.
///
/// Rejection: an enveloped 401 on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    TokenIssuer: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let tokens = TokenIssuer::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized(
                "Authentication credentials were not provided.",
            ))?;

        let user_id = tokens.verify(token, TokenKind::Access).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            ApiError::Unauthorized("Given token not valid for any token type")
        })?;

        // The user may have been removed after the token was issued.
        let user = repo
            .get_user(user_id)
            .await?
            .ok_or(ApiError::Unauthorized("User not found"))?;

        Ok(AuthUser { id: user.id })
    }
}
