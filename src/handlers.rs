use crate::{
    auth::AuthUser,
    envelope::Enveloped,
    error::ApiError,
    models::{
        AccessToken, Comment, CreateCommentRequest, CreatePostForm, ImageUpload, LoginRequest,
        NewPost, Post, PostWithComments, RefreshRequest, RegisterRequest, TokenPair,
        UpdatePostRequest, User,
    },
    services::{AuthService, ContentService},
};
use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};

// --- Public Handlers ---

/// register_user
///
/// [Public Route] Creates an account. The response carries the stored user without any trace of
/// the password.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered (enveloped)", body = User),
        (status = 400, description = "Validation failure")
    )
)]
pub async fn register_user(
    State(auth): State<AuthService>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Enveloped<User>, ApiError> {
    let Json(payload) = payload?;
    let user = auth.register(payload).await?;
    Ok(Enveloped::created(
        user,
        "Welcome! account created successfully",
    ))
}

/// login
///
/// [Public Route] Exchanges email and password for an access/refresh token pair.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair (enveloped)", body = TokenPair),
        (status = 401, description = "Invalid credentials"),
        (status = 404, description = "Unknown email")
    )
)]
pub async fn login(
    State(auth): State<AuthService>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Enveloped<TokenPair>, ApiError> {
    let Json(payload) = payload?;
    let pair = auth.authenticate(&payload.email, &payload.password).await?;
    Ok(Enveloped::ok(pair, "Login successful"))
}

/// refresh_token
///
/// [Public Route] Issues a new access token for a valid refresh token.
#[utoipa::path(
    post,
    path = "/token/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token (enveloped)", body = AccessToken),
        (status = 401, description = "Invalid or expired refresh token")
    )
)]
pub async fn refresh_token(
    State(auth): State<AuthService>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Enveloped<AccessToken>, ApiError> {
    let Json(payload) = payload?;
    let token = auth.refresh(&payload.refresh).await?;
    Ok(Enveloped::ok(token, "Token refreshed"))
}

// --- Authenticated Handlers ---

/// create_post
///
/// [Authenticated Route] Creates a post from a multipart form. The author is always the caller;
/// any `author` part in the form is ignored.
#[utoipa::path(
    post,
    path = "/posts",
    request_body(content = CreatePostForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Created (enveloped)", body = Post),
        (status = 400, description = "Validation failure"),
        (status = 500, description = "Image upload failed")
    ),
    security(("bearer" = []))
)]
pub async fn create_post(
    AuthUser { id }: AuthUser,
    State(content): State<ContentService>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Enveloped<Post>, ApiError> {
    let draft = read_post_form(multipart?).await?;
    let post = content.create_post(id, draft).await?;
    Ok(Enveloped::created(post, "Post created successfully"))
}

/// update_post
///
/// [Authenticated Route] Partially updates title and/or content. Author only.
#[utoipa::path(
    patch,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated (enveloped)", body = Post),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer" = []))
)]
pub async fn update_post(
    AuthUser { id: caller }: AuthUser,
    State(content): State<ContentService>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> Result<Enveloped<Post>, ApiError> {
    let Path(post_id) = path?;
    let Json(payload) = payload?;
    let post = content.update_post(caller, post_id, payload).await?;
    Ok(Enveloped::ok(post, "Post updated successfully"))
}

/// delete_post
///
/// [Authenticated Route] Deletes a post with its comments and images. Author only.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer" = []))
)]
pub async fn delete_post(
    AuthUser { id: caller }: AuthUser,
    State(content): State<ContentService>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(post_id) = path?;
    content.delete_post(caller, post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// add_comment
///
/// [Authenticated Route] Comments on an existing post. Any authenticated user may comment.
#[utoipa::path(
    post,
    path = "/posts/{id}/comment",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment added (enveloped)", body = Comment),
        (status = 404, description = "Post not found")
    ),
    security(("bearer" = []))
)]
pub async fn add_comment(
    AuthUser { id: caller }: AuthUser,
    State(content): State<ContentService>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<Enveloped<Comment>, ApiError> {
    let Path(post_id) = path?;
    let Json(payload) = payload?;
    let comment = content.add_comment(caller, post_id, payload).await?;
    Ok(Enveloped::created(comment, "Comment added successfully"))
}

/// delete_comment
///
/// [Authenticated Route] Deletes a comment. Comment owner only.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer" = []))
)]
pub async fn delete_comment(
    AuthUser { id: caller }: AuthUser,
    State(content): State<ContentService>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(comment_id) = path?;
    content.delete_comment(caller, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// list_posts
///
/// [Authenticated Route] Every post, newest first, each with its images and comments.
#[utoipa::path(
    get,
    path = "/posts/all",
    responses((status = 200, description = "Posts with comments (enveloped)", body = [PostWithComments])),
    security(("bearer" = []))
)]
pub async fn list_posts(
    _caller: AuthUser,
    State(content): State<ContentService>,
) -> Result<Enveloped<Vec<PostWithComments>>, ApiError> {
    let posts = content.list_posts_with_comments().await?;
    Ok(Enveloped::ok(posts, "Posts retrieved successfully"))
}

/// read_post_form
///
/// Collects `title`, `content` and any number of `images` file parts. Unknown parts are skipped.
async fn read_post_form(mut multipart: Multipart) -> Result<NewPost, ApiError> {
    let mut draft = NewPost::default();
    let mut title = None;
    let mut body = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => title = Some(field.text().await?),
            Some("content") => body = Some(field.text().await?),
            Some("images") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?.to_vec();
                draft.images.push(ImageUpload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    draft.title = title
        .ok_or_else(|| ApiError::Validation("title: This field is required.".to_string()))?;
    draft.content = body
        .ok_or_else(|| ApiError::Validation("content: This field is required.".to_string()))?;
    Ok(draft)
}
