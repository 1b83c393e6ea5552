use axum::{
    extract::FromRequestParts,
    http::{Method, Request, header, request::Parts},
};
use blog_api::{
    AppConfig, AppState, ApiError, AuthService, MemoryRepository, MockStorageService,
    auth::{AuthUser, Claims, TokenError, TokenIssuer, TokenKind, hash_password, verify_password},
    models::RegisterRequest,
    services::auth::normalize_email,
};
use jsonwebtoken::{EncodingKey, Header};
use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use uuid::Uuid;

const TEST_JWT_SECRET: &str = "super-secure-test-secret-value-local";

// --- Helpers ---

fn app_state() -> AppState {
    AppState::new(
        Arc::new(MemoryRepository::new()),
        Arc::new(MockStorageService::new()),
        AppConfig::default(),
    )
}

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(state.repo.clone(), state.tokens.clone())
}

fn register_request(email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        password: password.to_string(),
    }
}

/// Signs arbitrary claims with the test secret, bypassing `TokenIssuer`.
fn sign(claims: &Claims) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

fn now_secs() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

fn request_parts(bearer: Option<&str>) -> Parts {
    let mut builder = Request::builder()
        .method(Method::GET)
        .uri("/posts/all");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let (parts, _) = builder.body(axum::body::Body::empty()).unwrap().into_parts();
    parts
}

// --- Password Hashing ---

#[test]
fn test_password_hash_round_trip() {
    let hash = hash_password("correct horse").unwrap();

    assert_ne!(hash, "correct horse");
    assert!(hash.starts_with("$argon2id$"));
    assert!(verify_password("correct horse", &hash).unwrap());
    assert!(!verify_password("wrong horse", &hash).unwrap());
}

#[test]
fn test_password_verify_rejects_malformed_hash() {
    let result = verify_password("pw", "not-a-phc-string");
    assert!(matches!(result, Err(ApiError::Internal(_))));
}

// --- Token Issuer ---

#[test]
fn test_token_issuer_round_trip() {
    let issuer = TokenIssuer::new(
        TEST_JWT_SECRET,
        Duration::from_secs(60),
        Duration::from_secs(600),
    );
    let user_id = Uuid::new_v4();

    let access = issuer.mint(user_id, TokenKind::Access).unwrap();
    let refresh = issuer.mint(user_id, TokenKind::Refresh).unwrap();

    assert_ne!(access, refresh);
    assert_eq!(issuer.verify(&access, TokenKind::Access), Ok(user_id));
    assert_eq!(issuer.verify(&refresh, TokenKind::Refresh), Ok(user_id));
    assert_eq!(
        issuer.verify(&refresh, TokenKind::Access),
        Err(TokenError::WrongKind(TokenKind::Access))
    );
}

#[test]
fn test_token_issuer_rejects_expired_and_foreign_tokens() {
    let issuer = TokenIssuer::new(
        TEST_JWT_SECRET,
        Duration::from_secs(60),
        Duration::from_secs(600),
    );
    let now = now_secs();
    let expired = sign(&Claims {
        sub: Uuid::new_v4(),
        exp: now - 120,
        iat: now - 180,
        jti: Uuid::new_v4(),
        token_type: TokenKind::Access,
    });
    assert_eq!(
        issuer.verify(&expired, TokenKind::Access),
        Err(TokenError::Expired)
    );

    let other = TokenIssuer::new(
        "a-different-secret",
        Duration::from_secs(60),
        Duration::from_secs(600),
    );
    let foreign = other.mint(Uuid::new_v4(), TokenKind::Access).unwrap();
    assert_eq!(
        issuer.verify(&foreign, TokenKind::Access),
        Err(TokenError::Invalid)
    );
    assert_eq!(
        issuer.verify("garbage", TokenKind::Access),
        Err(TokenError::Invalid)
    );
}

// --- AuthService ---

#[tokio::test]
async fn test_register_returns_user_without_password() {
    let state = app_state();
    let auth = auth_service(&state);

    let user = auth
        .register(register_request("  Ada@Example.COM ", "pw"))
        .await
        .unwrap();

    assert_eq!(user.email, "Ada@example.com");
    assert_eq!(user.first_name, "Ada");
    let value = serde_json::to_value(&user).unwrap();
    assert!(value.get("password").is_none());

    let stored = state.repo.get_user(user.id).await.unwrap().unwrap();
    assert_ne!(stored.password_hash, "pw");
    assert!(verify_password("pw", &stored.password_hash).unwrap());
}

#[tokio::test]
async fn test_register_duplicate_email_is_validation_error() {
    let state = app_state();
    let auth = auth_service(&state);

    auth.register(register_request("a@x.com", "pw"))
        .await
        .unwrap();
    let second = auth.register(register_request("a@X.com", "other")).await;

    assert!(matches!(second, Err(ApiError::Validation(_))));
}

#[tokio::test]
async fn test_register_invalid_email_is_validation_error() {
    let state = app_state();
    let auth = auth_service(&state);

    let result = auth.register(register_request("not-an-email", "pw")).await;

    assert!(matches!(result, Err(ApiError::Validation(_))));
    assert!(state.repo.find_user_by_email("not-an-email").await.unwrap().is_none());
}

#[tokio::test]
async fn test_register_blank_names_are_validation_errors() {
    let state = app_state();
    let auth = auth_service(&state);

    let mut request = register_request("a@x.com", "pw");
    request.first_name = "   ".to_string();
    request.last_name = " ".to_string();
    let result = auth.register(request).await;

    assert!(matches!(result, Err(ApiError::Validation(_))));
    assert!(state.repo.find_user_by_email("a@x.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_register_trims_names() {
    let state = app_state();
    let auth = auth_service(&state);

    let mut request = register_request("a@x.com", "pw");
    request.first_name = "  Ada ".to_string();
    request.last_name = format!(" {} ", "L".repeat(150));
    let user = auth.register(request).await.unwrap();

    assert_eq!(user.first_name, "Ada");
    assert_eq!(user.last_name.chars().count(), 150);
}

#[tokio::test]
async fn test_login_issues_tokens_for_the_user() {
    let state = app_state();
    let auth = auth_service(&state);
    let user = auth
        .register(register_request("a@x.com", "pw"))
        .await
        .unwrap();

    let pair = auth.authenticate("a@x.com", "pw").await.unwrap();

    assert_eq!(
        state.tokens.verify(&pair.access, TokenKind::Access),
        Ok(user.id)
    );
    assert_eq!(
        state.tokens.verify(&pair.refresh, TokenKind::Refresh),
        Ok(user.id)
    );
}

#[tokio::test]
async fn test_login_failures() {
    let state = app_state();
    let auth = auth_service(&state);
    auth.register(register_request("a@x.com", "pw"))
        .await
        .unwrap();

    let wrong_password = auth.authenticate("a@x.com", "nope").await;
    assert!(matches!(wrong_password, Err(ApiError::InvalidCredentials)));

    let unknown = auth.authenticate("b@x.com", "pw").await;
    assert!(matches!(unknown, Err(ApiError::NotFound("User"))));
}

#[tokio::test]
async fn test_refresh_exchanges_only_refresh_tokens() {
    let state = app_state();
    let auth = auth_service(&state);
    let user = auth
        .register(register_request("a@x.com", "pw"))
        .await
        .unwrap();
    let pair = auth.authenticate("a@x.com", "pw").await.unwrap();

    let refreshed = auth.refresh(&pair.refresh).await.unwrap();
    assert_eq!(
        state.tokens.verify(&refreshed.access, TokenKind::Access),
        Ok(user.id)
    );

    let misuse = auth.refresh(&pair.access).await;
    assert!(matches!(misuse, Err(ApiError::Unauthorized(_))));
}

#[test]
fn test_normalize_email() {
    assert_eq!(normalize_email(" Bob@Example.Org "), "Bob@example.org");
    assert_eq!(normalize_email("no-at-sign"), "no-at-sign");
}

// --- AuthUser Extractor ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let state = app_state();
    let user = auth_service(&state)
        .register(register_request("a@x.com", "pw"))
        .await
        .unwrap();
    let token = state.tokens.mint(user.id, TokenKind::Access).unwrap();

    let mut parts = request_parts(Some(&token));
    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await;

    assert_eq!(auth_user.unwrap(), AuthUser { id: user.id });
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let state = app_state();

    let mut parts = request_parts(None);
    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await;

    assert!(matches!(auth_user, Err(ApiError::Unauthorized(_))));
}

#[tokio::test]
async fn test_auth_failure_with_refresh_token() {
    let state = app_state();
    let user = auth_service(&state)
        .register(register_request("a@x.com", "pw"))
        .await
        .unwrap();
    let refresh = state.tokens.mint(user.id, TokenKind::Refresh).unwrap();

    let mut parts = request_parts(Some(&refresh));
    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await;

    assert!(matches!(auth_user, Err(ApiError::Unauthorized(_))));
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let state = app_state();
    let user = auth_service(&state)
        .register(register_request("a@x.com", "pw"))
        .await
        .unwrap();
    let now = now_secs();
    let expired = sign(&Claims {
        sub: user.id,
        exp: now - 60,
        iat: now - 360,
        jti: Uuid::new_v4(),
        token_type: TokenKind::Access,
    });

    let mut parts = request_parts(Some(&expired));
    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await;

    assert!(matches!(auth_user, Err(ApiError::Unauthorized(_))));
}

#[tokio::test]
async fn test_auth_failure_for_unknown_subject() {
    let state = app_state();
    let token = state.tokens.mint(Uuid::new_v4(), TokenKind::Access).unwrap();

    let mut parts = request_parts(Some(&token));
    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await;

    assert!(matches!(
        auth_user,
        Err(ApiError::Unauthorized("User not found"))
    ));
}
