use std::collections::HashMap;

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::ApiError,
    models::{
        Comment, CreateCommentRequest, ImageUpload, NewPost, Post, PostWithComments,
        UpdatePostRequest,
    },
    repository::{OwnerCheck, RepositoryState},
    storage::StorageState,
};

const MAX_TITLE_CHARS: usize = 255;

/// ContentService
///
/// Posts and comments. Every mutating call takes the caller's id; ownership is checked by the
/// repository in the same unit of work as the write.
#[derive(Clone)]
pub struct ContentService {
    repo: RepositoryState,
    storage: StorageState,
}

impl ContentService {
    pub fn new(repo: RepositoryState, storage: StorageState) -> Self {
        Self { repo, storage }
    }

    /// create_post
    ///
    /// Uploads every image, then writes the post with the resulting URLs. If any upload fails the
    /// objects already stored are removed and no post is written.
    pub async fn create_post(&self, author: Uuid, draft: NewPost) -> Result<Post, ApiError> {
        let draft = NewPost {
            title: draft.title.trim().to_string(),
            content: draft.content.trim().to_string(),
            ..draft
        };
        validate_draft(&draft)?;

        let mut uploaded: Vec<(String, String)> = Vec::with_capacity(draft.images.len());
        for image in draft.images {
            let key = image_key(author, &image);
            match self
                .storage
                .upload_image(&key, &image.content_type, image.bytes)
                .await
            {
                Ok(url) => uploaded.push((key, url)),
                Err(e) => {
                    self.discard_uploads(&uploaded).await;
                    return Err(e.into());
                }
            }
        }

        let urls = uploaded.iter().map(|(_, url)| url.clone()).collect();
        match self
            .repo
            .create_post(author, draft.title, draft.content, urls)
            .await
        {
            Ok(post) => {
                tracing::info!(post_id = post.id, author = %author, images = post.images.len(), "post created");
                Ok(post)
            }
            Err(e) => {
                self.discard_uploads(&uploaded).await;
                Err(e.into())
            }
        }
    }

    /// update_post
    ///
    /// Only title and content are mutable. Present fields are trimmed and checked with the same
    /// rules as on creation. `NotFound` before `Forbidden`.
    pub async fn update_post(
        &self,
        caller: Uuid,
        post_id: i64,
        changes: UpdatePostRequest,
    ) -> Result<Post, ApiError> {
        let changes = UpdatePostRequest {
            title: changes.title.map(|title| title.trim().to_string()),
            content: changes.content.map(|content| content.trim().to_string()),
        };
        changes.validate()?;

        match self.repo.update_post(post_id, caller, changes).await? {
            OwnerCheck::Applied(post) => Ok(post),
            OwnerCheck::Missing => Err(ApiError::NotFound("Post")),
            OwnerCheck::NotOwner => {
                tracing::warn!(post_id, caller = %caller, "update rejected: not the author");
                Err(ApiError::Forbidden("post"))
            }
        }
    }

    pub async fn delete_post(&self, caller: Uuid, post_id: i64) -> Result<(), ApiError> {
        match self.repo.delete_post(post_id, caller).await? {
            OwnerCheck::Applied(()) => {
                tracing::info!(post_id, "post deleted");
                Ok(())
            }
            OwnerCheck::Missing => Err(ApiError::NotFound("Post")),
            OwnerCheck::NotOwner => {
                tracing::warn!(post_id, caller = %caller, "delete rejected: not the author");
                Err(ApiError::Forbidden("post"))
            }
        }
    }

    /// add_comment
    ///
    /// Any authenticated user may comment on any existing post.
    pub async fn add_comment(
        &self,
        caller: Uuid,
        post_id: i64,
        request: CreateCommentRequest,
    ) -> Result<Comment, ApiError> {
        let request = CreateCommentRequest {
            content: request.content.trim().to_string(),
        };
        request.validate()?;

        self.repo
            .add_comment(post_id, caller, request.content)
            .await?
            .ok_or(ApiError::NotFound("Post"))
    }

    pub async fn delete_comment(&self, caller: Uuid, comment_id: i64) -> Result<(), ApiError> {
        match self.repo.delete_comment(comment_id, caller).await? {
            OwnerCheck::Applied(()) => Ok(()),
            OwnerCheck::Missing => Err(ApiError::NotFound("Comment")),
            OwnerCheck::NotOwner => {
                tracing::warn!(comment_id, caller = %caller, "comment delete rejected: not the owner");
                Err(ApiError::Forbidden("comment"))
            }
        }
    }

    /// list_posts_with_comments
    ///
    /// One posts fetch plus one comments fetch for all of them, regardless of how many posts
    /// exist. Posts keep the repository's newest-first order.
    pub async fn list_posts_with_comments(&self) -> Result<Vec<PostWithComments>, ApiError> {
        let posts = self.repo.list_posts().await?;
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();

        let mut by_post: HashMap<i64, Vec<Comment>> = HashMap::new();
        for comment in self.repo.comments_for_posts(&ids).await? {
            by_post.entry(comment.post_id).or_default().push(comment);
        }

        Ok(posts
            .into_iter()
            .map(|post| {
                let comments = by_post.remove(&post.id).unwrap_or_default();
                PostWithComments { post, comments }
            })
            .collect())
    }

    async fn discard_uploads(&self, uploaded: &[(String, String)]) {
        for (key, _) in uploaded {
            if let Err(e) = self.storage.remove_image(key).await {
                tracing::warn!(error = %e, key = %key, "orphaned image could not be removed");
            }
        }
    }
}

/// Expects an already trimmed draft.
fn validate_draft(draft: &NewPost) -> Result<(), ApiError> {
    let title = draft.title.as_str();
    if title.is_empty() {
        return Err(ApiError::Validation("title: This field may not be blank.".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiError::Validation(format!(
            "title: Ensure this field has no more than {MAX_TITLE_CHARS} characters."
        )));
    }
    if draft.content.is_empty() {
        return Err(ApiError::Validation(
            "content: This field may not be blank.".to_string(),
        ));
    }
    for image in &draft.images {
        if !image.content_type.starts_with("image/") {
            return Err(ApiError::Validation(format!(
                "images: unsupported content type {:?}",
                image.content_type
            )));
        }
        if image.bytes.is_empty() {
            return Err(ApiError::Validation(
                "images: The submitted file is empty.".to_string(),
            ));
        }
    }
    Ok(())
}

/// Object key for an uploaded image: `posts/{author}/{uuid}.{ext}`. The extension comes from the
/// original file name when it has one, otherwise from the content type.
fn image_key(author: Uuid, image: &ImageUpload) -> String {
    let extension = image
        .file_name
        .as_deref()
        .and_then(|name| std::path::Path::new(name).extension())
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .or_else(|| {
            image
                .content_type
                .strip_prefix("image/")
                .map(str::to_string)
        })
        .unwrap_or_else(|| "bin".to_string());

    format!("posts/{}/{}.{}", author, Uuid::new_v4(), extension)
}
