use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Core Application Schemas (Mapped to Database) ---

/// UserRecord
///
/// The full `users` row, including the password hash. This type is deliberately neither
/// `Serialize` nor `Debug`: it never leaves the service layer. Convert it into [`User`] before
/// returning anything outward.
#[derive(Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// User
///
/// Public identity of a registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            first_name: record.first_name,
            last_name: record.last_name,
            created_at: record.created_at,
        }
    }
}

/// NewUser
///
/// Insert payload for the credential store. The password is already hashed at this point.
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

/// Post
///
/// A row of the `posts` table. `images` is not a column: repositories fill it with a batched
/// fetch from `post_images`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    /// The owning user. Fixed at creation.
    #[sqlx(rename = "author_id")]
    pub author: Uuid,
    #[sqlx(skip)]
    pub images: Vec<PostImage>,
}

/// PostImage
///
/// An externally hosted image attached to a post at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct PostImage {
    pub id: i64,
    #[serde(rename = "post")]
    pub post_id: i64,
    pub image_url: String,
    #[ts(type = "string")]
    pub uploaded_at: DateTime<Utc>,
}

/// Comment
///
/// A row of the `comments` table. Serialized with `post` and `user` keys for the owning ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "post")]
    pub post_id: i64,
    #[serde(rename = "user")]
    pub user_id: Uuid,
}

/// PostWithComments
///
/// One entry of the `GET /posts/all` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PostWithComments {
    pub post: Post,
    pub comments: Vec<Comment>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for `POST /register`. The password is hashed before it reaches the store and
/// is never logged.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address."))]
    #[schema(example = "a@x.com")]
    pub email: String,
    #[validate(length(min = 1, max = 150, message = "First name must be 1-150 characters."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150, message = "Last name must be 1-150 characters."))]
    pub last_name: String,
    #[validate(length(min = 1, message = "Password may not be blank."))]
    pub password: String,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// RefreshRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// TokenPair
///
/// Issued on a successful login. Both tokens embed the user id as their subject.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// AccessToken
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AccessToken {
    pub access: String,
}

/// UpdatePostRequest
///
/// Partial update payload for `PATCH /posts/{id}`. Absent fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters."))]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Content may not be blank."))]
    pub content: Option<String>,
}

/// CreateCommentRequest
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, message = "Content may not be blank."))]
    pub content: String,
}

/// CreatePostForm
///
/// Documentation-only shape of the `multipart/form-data` body of `POST /posts`. The handler reads
/// the parts directly; `images` may be repeated once per file.
#[derive(Debug, ToSchema)]
pub struct CreatePostForm {
    pub title: String,
    pub content: String,
    #[schema(value_type = Vec<String>)]
    pub images: Vec<Vec<u8>>,
}

// --- Service Inputs ---

/// NewPost
///
/// Post creation input assembled by the handler from the multipart body.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub images: Vec<ImageUpload>,
}

/// ImageUpload
///
/// One uploaded file part, held in memory until it is handed to the storage service.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}
