use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

/// Authenticated Router Module
///
/// Every route here sits behind the `auth_middleware` layer applied in `create_router`, and each
/// handler additionally extracts `AuthUser` to pass the caller into the content service.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /posts
        // Multipart form: title, content, and zero or more `images` file parts.
        .route("/posts", post(handlers::create_post))
        // GET /posts/all
        // All posts with images and comments, fetched in a constant number of queries.
        .route("/posts/all", get(handlers::list_posts))
        // PATCH/DELETE /posts/{id}
        // Author-only. 404 when the post is missing, 403 when the caller is not the author.
        .route(
            "/posts/{id}",
            patch(handlers::update_post).delete(handlers::delete_post),
        )
        // POST /posts/{id}/comment
        // Any authenticated user may comment on an existing post.
        .route("/posts/{id}/comment", post(handlers::add_comment))
        // DELETE /comments/{id}
        // Comment owner only.
        .route("/comments/{id}", delete(handlers::delete_comment))
}
