use super::{OwnerCheck, Repository, RepositoryError};
use crate::models::{Comment, NewUser, Post, PostImage, UpdatePostRequest, UserRecord};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, first_name, last_name, password_hash, created_at";
const POST_COLUMNS: &str = "id, author_id, title, content, created_at, updated_at";
const IMAGE_COLUMNS: &str = "id, post_id, image_url, uploaded_at";
const COMMENT_COLUMNS: &str = "id, post_id, user_id, content, created_at, updated_at";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Separates unique-constraint violations from every other database failure.
fn classify(error: sqlx::Error) -> RepositoryError {
    let duplicate = error
        .as_database_error()
        .filter(|db| db.is_unique_violation())
        .map(|db| db.constraint().unwrap_or("unique constraint").to_string());

    match duplicate {
        Some(constraint) => RepositoryError::Duplicate(constraint),
        None => RepositoryError::Database(error),
    }
}

/// Distributes a batch of image rows onto their posts, preserving each post's image order.
fn attach_images(posts: &mut [Post], images: Vec<PostImage>) {
    let mut by_post: HashMap<i64, Vec<PostImage>> = HashMap::new();
    for image in images {
        by_post.entry(image.post_id).or_default().push(image);
    }
    for post in posts.iter_mut() {
        post.images = by_post.remove(&post.id).unwrap_or_default();
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, RepositoryError> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, email, first_name, last_name, password_hash) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepositoryError> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserRecord>, RepositoryError> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// create_post
    ///
    /// Inserts the post and its image rows in one transaction, so a post never exists with only
    /// part of its images.
    async fn create_post(
        &self,
        author: Uuid,
        title: String,
        content: String,
        image_urls: Vec<String>,
    ) -> Result<Post, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut post = sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (author_id, title, content) VALUES ($1, $2, $3) RETURNING {POST_COLUMNS}"
        ))
        .bind(author)
        .bind(&title)
        .bind(&content)
        .fetch_one(&mut *tx)
        .await?;

        for url in image_urls {
            let image = sqlx::query_as::<_, PostImage>(&format!(
                "INSERT INTO post_images (post_id, image_url) VALUES ($1, $2) RETURNING {IMAGE_COLUMNS}"
            ))
            .bind(post.id)
            .bind(url)
            .fetch_one(&mut *tx)
            .await?;
            post.images.push(image);
        }

        tx.commit().await?;
        Ok(post)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, RepositoryError> {
        let Some(mut post) = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        post.images = sqlx::query_as::<_, PostImage>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM post_images WHERE post_id = $1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(post))
    }

    /// update_post
    ///
    /// Locks the row (`FOR UPDATE`) before comparing owners, so concurrent writers to the same
    /// post serialize. `COALESCE` keeps columns whose field is `None`.
    async fn update_post(
        &self,
        id: i64,
        caller: Uuid,
        changes: UpdatePostRequest,
    ) -> Result<OwnerCheck<Post>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT author_id FROM posts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        match owner {
            None => return Ok(OwnerCheck::Missing),
            Some(author) if author != caller => return Ok(OwnerCheck::NotOwner),
            Some(_) => {}
        }

        let mut post = sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.content)
        .fetch_one(&mut *tx)
        .await?;

        post.images = sqlx::query_as::<_, PostImage>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM post_images WHERE post_id = $1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(OwnerCheck::Applied(post))
    }

    /// delete_post
    ///
    /// Comments and images go with the post through `ON DELETE CASCADE`.
    async fn delete_post(&self, id: i64, caller: Uuid) -> Result<OwnerCheck<()>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT author_id FROM posts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        match owner {
            None => return Ok(OwnerCheck::Missing),
            Some(author) if author != caller => return Ok(OwnerCheck::NotOwner),
            Some(_) => {}
        }

        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(OwnerCheck::Applied(()))
    }

    /// list_posts
    ///
    /// Two queries regardless of the number of posts: the posts, then every image of those posts
    /// via `= ANY($1)`.
    async fn list_posts(&self) -> Result<Vec<Post>, RepositoryError> {
        let mut posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        if posts.is_empty() {
            return Ok(posts);
        }

        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        let images = sqlx::query_as::<_, PostImage>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM post_images WHERE post_id = ANY($1) ORDER BY id"
        ))
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await?;

        attach_images(&mut posts, images);
        Ok(posts)
    }

    /// add_comment
    ///
    /// The existence check and the insert are one statement. A post deleted concurrently surfaces
    /// as a foreign key violation and is reported the same way as a missing post.
    async fn add_comment(
        &self,
        post_id: i64,
        user_id: Uuid,
        content: String,
    ) -> Result<Option<Comment>, RepositoryError> {
        let result = sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments (post_id, user_id, content)
            SELECT $1, $2, $3
            WHERE EXISTS (SELECT 1 FROM posts WHERE id = $1)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(post_id)
        .bind(user_id)
        .bind(&content)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(comment) => Ok(comment),
            Err(e)
                if e
                    .as_database_error()
                    .is_some_and(|db| db.is_foreign_key_violation()) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_comment(
        &self,
        id: i64,
        caller: Uuid,
    ) -> Result<OwnerCheck<()>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM comments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        match owner {
            None => return Ok(OwnerCheck::Missing),
            Some(user) if user != caller => return Ok(OwnerCheck::NotOwner),
            Some(_) => {}
        }

        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(OwnerCheck::Applied(()))
    }

    async fn comments_for_posts(&self, post_ids: &[i64]) -> Result<Vec<Comment>, RepositoryError> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        let comments = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ANY($1) ORDER BY created_at ASC, id ASC"
        ))
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }
}
