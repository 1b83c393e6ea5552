use super::{OwnerCheck, Repository, RepositoryError};
use crate::models::{Comment, NewUser, Post, PostImage, UpdatePostRequest, UserRecord};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{
    Mutex, MutexGuard,
    atomic::{AtomicUsize, Ordering},
};
use uuid::Uuid;

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, UserRecord>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    next_post_id: i64,
    next_image_id: i64,
    next_comment_id: i64,
}

/// MemoryRepository
///
/// A `Repository` kept entirely in process memory, used by the test suite and for running the
/// API without Postgres. One mutex guards the whole store, so every operation is serialized the
/// way a row lock would serialize it.
///
/// Every read operation increments a fetch counter, which lets tests assert how many store
/// round-trips an operation costs.
#[derive(Default)]
pub struct MemoryRepository {
    store: Mutex<Store>,
    fetches: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read operations served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn comment_count(&self) -> usize {
        self.lock().map(|store| store.comments.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>, RepositoryError> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn fetched(&self) {
        self.fetches.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, RepositoryError> {
        let mut store = self.lock()?;
        if store.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Duplicate("users_email_key".to_string()));
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        store.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepositoryError> {
        self.fetched();
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserRecord>, RepositoryError> {
        self.fetched();
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create_post(
        &self,
        author: Uuid,
        title: String,
        content: String,
        image_urls: Vec<String>,
    ) -> Result<Post, RepositoryError> {
        let mut store = self.lock()?;
        let now = Utc::now();

        store.next_post_id += 1;
        let post_id = store.next_post_id;

        let mut images = Vec::with_capacity(image_urls.len());
        for image_url in image_urls {
            store.next_image_id += 1;
            images.push(PostImage {
                id: store.next_image_id,
                post_id,
                image_url,
                uploaded_at: now,
            });
        }

        let post = Post {
            id: post_id,
            title,
            content,
            created_at: now,
            updated_at: now,
            author,
            images,
        };
        store.posts.insert(post_id, post.clone());
        Ok(post)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, RepositoryError> {
        self.fetched();
        Ok(self.lock()?.posts.get(&id).cloned())
    }

    async fn update_post(
        &self,
        id: i64,
        caller: Uuid,
        changes: UpdatePostRequest,
    ) -> Result<OwnerCheck<Post>, RepositoryError> {
        let mut store = self.lock()?;
        let Some(post) = store.posts.get_mut(&id) else {
            return Ok(OwnerCheck::Missing);
        };
        if post.author != caller {
            return Ok(OwnerCheck::NotOwner);
        }

        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(content) = changes.content {
            post.content = content;
        }
        post.updated_at = Utc::now();
        Ok(OwnerCheck::Applied(post.clone()))
    }

    async fn delete_post(&self, id: i64, caller: Uuid) -> Result<OwnerCheck<()>, RepositoryError> {
        let mut store = self.lock()?;
        match store.posts.get(&id) {
            None => return Ok(OwnerCheck::Missing),
            Some(post) if post.author != caller => return Ok(OwnerCheck::NotOwner),
            Some(_) => {}
        }

        store.posts.remove(&id);
        store.comments.retain(|_, c| c.post_id != id);
        Ok(OwnerCheck::Applied(()))
    }

    async fn list_posts(&self) -> Result<Vec<Post>, RepositoryError> {
        self.fetched();
        let store = self.lock()?;
        let mut posts: Vec<Post> = store.posts.values().cloned().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts)
    }

    async fn add_comment(
        &self,
        post_id: i64,
        user_id: Uuid,
        content: String,
    ) -> Result<Option<Comment>, RepositoryError> {
        let mut store = self.lock()?;
        if !store.posts.contains_key(&post_id) {
            return Ok(None);
        }

        store.next_comment_id += 1;
        let now = Utc::now();
        let comment = Comment {
            id: store.next_comment_id,
            content,
            created_at: now,
            updated_at: now,
            post_id,
            user_id,
        };
        store.comments.insert(comment.id, comment.clone());
        Ok(Some(comment))
    }

    async fn delete_comment(
        &self,
        id: i64,
        caller: Uuid,
    ) -> Result<OwnerCheck<()>, RepositoryError> {
        let mut store = self.lock()?;
        match store.comments.get(&id) {
            None => return Ok(OwnerCheck::Missing),
            Some(comment) if comment.user_id != caller => return Ok(OwnerCheck::NotOwner),
            Some(_) => {}
        }

        store.comments.remove(&id);
        Ok(OwnerCheck::Applied(()))
    }

    async fn comments_for_posts(&self, post_ids: &[i64]) -> Result<Vec<Comment>, RepositoryError> {
        self.fetched();
        let store = self.lock()?;
        // BTreeMap iteration is id order, which is creation order here.
        Ok(store
            .comments
            .values()
            .filter(|c| post_ids.contains(&c.post_id))
            .cloned()
            .collect())
    }
}
