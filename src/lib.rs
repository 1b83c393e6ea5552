use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod services;
pub mod storage;

// Routing segregated by access level (Public, Authenticated).
pub mod routes;
use auth::{AuthUser, TokenIssuer};
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use services::{AuthService, ContentService};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document aggregated from the `#[utoipa::path]` handlers and `ToSchema` models.
/// Served at `/api-docs/openapi.json`, browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_user, handlers::login, handlers::refresh_token,
        handlers::create_post, handlers::update_post, handlers::delete_post,
        handlers::add_comment, handlers::delete_comment, handlers::list_posts
    ),
    components(
        schemas(
            models::User, models::Post, models::PostImage, models::Comment,
            models::PostWithComments, models::RegisterRequest, models::LoginRequest,
            models::RefreshRequest, models::TokenPair, models::AccessToken,
            models::UpdatePostRequest, models::CreateCommentRequest, models::CreatePostForm,
            envelope::ResponseStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "blog-api", description = "Blog posts, comments and accounts")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// AppState
///
/// The single container of shared services and configuration, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Credential and content store.
    pub repo: RepositoryState,
    /// Object storage for post images.
    pub storage: StorageState,
    pub config: AppConfig,
    /// Bearer token signer/verifier built from `config`.
    pub tokens: TokenIssuer,
}

impl AppState {
    pub fn new(repo: RepositoryState, storage: StorageState, config: AppConfig) -> Self {
        let tokens = TokenIssuer::from_config(&config);
        Self {
            repo,
            storage,
            config,
            tokens,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// Handlers and extractors pull only the component they need out of the shared state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for TokenIssuer {
    fn from_ref(app_state: &AppState) -> TokenIssuer {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(app_state: &AppState) -> AuthService {
        AuthService::new(app_state.repo.clone(), app_state.tokens.clone())
    }
}

impl FromRef<AppState> for ContentService {
    fn from_ref(app_state: &AppState) -> ContentService {
        ContentService::new(app_state.repo.clone(), app_state.storage.clone())
    }
}

/// auth_middleware
///
/// Enforces authentication for `authenticated_routes`. If `AuthUser` cannot be extracted the
/// extractor's enveloped 401 is returned and the handler never runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// Unmatched paths still answer with an envelope.
async fn not_found() -> ApiError {
    ApiError::NotFound("Resource")
}

/// create_router
///
/// Assembles routing, applies global and scoped middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                ))
                // Multipart post creation carries image bytes.
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
        )
        .fallback(not_found)
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. A UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. One tracing span per request, tagged with the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the request span with method, URI and the `x-request-id` header so every log line of a
/// request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
