use crate::{AppState, envelope::Enveloped, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without credentials. None of them read or modify content.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers. Enveloped like every other body.
        .route("/health", get(|| async { Enveloped::ok("ok", "healthy") }))
        // POST /register
        // Creates an account. Responds 201 with the user (never the password hash).
        .route("/register", post(handlers::register_user))
        // POST /login
        // Issues an access/refresh token pair. 404 for an unknown email, 401 for a bad password.
        .route("/login", post(handlers::login))
        // POST /token/refresh
        // Exchanges a refresh token for a new access token.
        .route("/token/refresh", post(handlers::refresh_token))
}
