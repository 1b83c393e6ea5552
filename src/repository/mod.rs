use crate::models::{Comment, NewUser, Post, UpdatePostRequest, UserRecord};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique constraint rejected the write. Carries the constraint name.
    #[error("duplicate value violates {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// OwnerCheck
///
/// Result of a mutation that is only allowed for the owner of a row. The lookup, the ownership
/// comparison and the write happen as one unit inside the repository.
#[derive(Debug, Clone, PartialEq)]
pub enum OwnerCheck<T> {
    Applied(T),
    Missing,
    NotOwner,
}

/// Repository Trait
///
/// Abstract contract for all persistence operations: the credential store (users) and the
/// content store (posts, images, comments). Handlers and services only ever see
/// `Arc<dyn Repository>`.
///
/// Relations are never loaded lazily. `list_posts` fetches posts and all of their images in a
/// fixed number of queries, and comments for many posts come from one `comments_for_posts` call.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential Store ---
    /// Fails with `RepositoryError::Duplicate` when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, RepositoryError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepositoryError>;
    async fn find_user_by_email(&self, email: &str)
    -> Result<Option<UserRecord>, RepositoryError>;

    // --- Posts ---
    /// Inserts the post and one image row per URL atomically.
    async fn create_post(
        &self,
        author: Uuid,
        title: String,
        content: String,
        image_urls: Vec<String>,
    ) -> Result<Post, RepositoryError>;
    async fn get_post(&self, id: i64) -> Result<Option<Post>, RepositoryError>;
    /// Owner-Only. Applies `Some` fields, bumps `updated_at`.
    async fn update_post(
        &self,
        id: i64,
        caller: Uuid,
        changes: UpdatePostRequest,
    ) -> Result<OwnerCheck<Post>, RepositoryError>;
    /// Owner-Only. Cascades to the post's comments and images.
    async fn delete_post(&self, id: i64, caller: Uuid) -> Result<OwnerCheck<()>, RepositoryError>;
    /// All posts with their images, newest first.
    async fn list_posts(&self) -> Result<Vec<Post>, RepositoryError>;

    // --- Comments ---
    /// Returns `None` (and writes nothing) when the post does not exist.
    async fn add_comment(
        &self,
        post_id: i64,
        user_id: Uuid,
        content: String,
    ) -> Result<Option<Comment>, RepositoryError>;
    /// Owner-Only.
    async fn delete_comment(&self, id: i64, caller: Uuid)
    -> Result<OwnerCheck<()>, RepositoryError>;
    /// Comments of every listed post in one batch, oldest first.
    async fn comments_for_posts(&self, post_ids: &[i64]) -> Result<Vec<Comment>, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
