use validator::Validate;

use crate::{
    auth::{TokenIssuer, TokenKind, hash_password, verify_password},
    error::ApiError,
    models::{AccessToken, NewUser, RegisterRequest, TokenPair, User},
    repository::{RepositoryError, RepositoryState},
};

/// AuthService
///
/// Registration, credential checks and token issuance. Passwords are hashed here and never
/// leave this module in any form other than the stored hash.
#[derive(Clone)]
pub struct AuthService {
    repo: RepositoryState,
    tokens: TokenIssuer,
}

/// Trims the address and lower-cases the domain part. The local part is kept as typed.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

impl AuthService {
    pub fn new(repo: RepositoryState, tokens: TokenIssuer) -> Self {
        Self { repo, tokens }
    }

    /// register
    ///
    /// Validates the payload, hashes the password and stores the user. A taken email is a
    /// validation failure, not a server fault.
    pub async fn register(&self, request: RegisterRequest) -> Result<User, ApiError> {
        let request = RegisterRequest {
            email: normalize_email(&request.email),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            ..request
        };
        request.validate()?;

        let new_user = NewUser {
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            password_hash: hash_password(&request.password)?,
        };

        match self.repo.create_user(new_user).await {
            Ok(record) => {
                tracing::info!(user_id = %record.id, "user registered");
                Ok(User::from(record))
            }
            Err(RepositoryError::Duplicate(_)) => Err(ApiError::Validation(
                "A user with this email already exists.".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// authenticate
    ///
    /// `NotFound` for an unknown email, `InvalidCredentials` for a wrong password. On success the
    /// pair's subject is the user's id.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<TokenPair, ApiError> {
        let user = self
            .repo
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or(ApiError::NotFound("User"))?;

        if !verify_password(password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "login rejected: password mismatch");
            return Err(ApiError::InvalidCredentials);
        }

        let pair = TokenPair {
            access: self.mint(user.id, TokenKind::Access)?,
            refresh: self.mint(user.id, TokenKind::Refresh)?,
        };
        tracing::info!(user_id = %user.id, "login succeeded");
        Ok(pair)
    }

    /// refresh
    ///
    /// Exchanges a refresh token for a new access token. The subject must still exist.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessToken, ApiError> {
        let user_id = self
            .tokens
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|_| ApiError::Unauthorized("Token is invalid or expired"))?;

        if self.repo.get_user(user_id).await?.is_none() {
            return Err(ApiError::Unauthorized("User not found"));
        }

        Ok(AccessToken {
            access: self.mint(user_id, TokenKind::Access)?,
        })
    }

    fn mint(&self, user_id: uuid::Uuid, kind: TokenKind) -> Result<String, ApiError> {
        self.tokens
            .mint(user_id, kind)
            .map_err(|e| ApiError::Internal(e.to_string()))
    }
}
