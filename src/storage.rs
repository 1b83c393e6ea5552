use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;
use thiserror::Error;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage rejected object {key}: {reason}")]
    Rejected { key: String, reason: String },
    #[error("upload of {key} timed out after {timeout:?}")]
    Timeout { key: String, timeout: Duration },
}

// 1. StorageService Contract
/// StorageService
///
/// Abstract contract for the object storage that hosts post images. The real S3 client is used
/// in production, `MockStorageService` in tests.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Only called for `Env::Local` (MinIO).
    async fn ensure_bucket_exists(&self);

    /// Stores `bytes` under `key` and returns the URL the object is publicly reachable at.
    async fn upload_image(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError>;

    /// Removes a previously uploaded object.
    async fn remove_image(&self, key: &str) -> Result<(), StorageError>;
}

// 2. The Real Implementation (S3/MinIO)
/// S3StorageClient
///
/// AWS SDK client pointed at any S3-compatible endpoint. `force_path_style(true)` is required
/// for MinIO.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    public_url: String,
    upload_timeout: Duration,
}

impl S3StorageClient {
    pub fn new(config: &AppConfig) -> Self {
        let credentials =
            s3::config::Credentials::new(&config.s3_key, &config.s3_secret, None, None, "static");

        let s3_config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(&config.s3_endpoint)
            .region(s3::config::Region::new(config.s3_region.clone()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(s3_config),
            bucket_name: config.s3_bucket.clone(),
            public_url: config.s3_public_url.trim_end_matches('/').to_string(),
            upload_timeout: config.upload_timeout,
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket fails harmlessly when the bucket is already there.
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(error = %e, bucket = %self.bucket_name, "create_bucket returned an error");
        }
    }

    /// upload_image
    ///
    /// PutObject bounded by the configured upload timeout.
    async fn upload_image(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let key = sanitize_key(key);
        let put = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send();

        match tokio::time::timeout(self.upload_timeout, put).await {
            Ok(Ok(_)) => Ok(format!("{}/{}", self.public_url, key)),
            Ok(Err(e)) => Err(StorageError::Rejected {
                key,
                reason: e.to_string(),
            }),
            Err(_) => Err(StorageError::Timeout {
                key,
                timeout: self.upload_timeout,
            }),
        }
    }

    /// DeleteObject, bounded by the same timeout as uploads.
    async fn remove_image(&self, key: &str) -> Result<(), StorageError> {
        let key = sanitize_key(key);
        let delete = self
            .client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .send();

        match tokio::time::timeout(self.upload_timeout, delete).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(StorageError::Rejected {
                key,
                reason: e.to_string(),
            }),
            Err(_) => Err(StorageError::Timeout {
                key,
                timeout: self.upload_timeout,
            }),
        }
    }
}

/// sanitize_key
///
/// Removes directory navigation components (`..`, `.`) and empty segments from an object key.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// In-memory stand-in for `StorageService`. Records every stored and removed key so tests can
/// assert on upload cleanup. `fail_after` makes every upload after the first `n` fail.
#[derive(Clone, Default)]
pub struct MockStorageService {
    fail_after: Option<usize>,
    attempts: Arc<AtomicUsize>,
    stored: Arc<Mutex<Vec<String>>>,
    removed: Arc<Mutex<Vec<String>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upload fails.
    pub fn new_failing() -> Self {
        Self::failing_after(0)
    }

    /// The first `n` uploads succeed, the rest fail.
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    /// Keys currently held by the mock (uploaded and not removed).
    pub fn stored_keys(&self) -> Vec<String> {
        self.stored.lock().map(|keys| keys.clone()).unwrap_or_default()
    }

    pub fn removed_keys(&self) -> Vec<String> {
        self.removed.lock().map(|keys| keys.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn upload_image(
        &self,
        key: &str,
        _content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let key = sanitize_key(key);
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|n| attempt >= n) {
            return Err(StorageError::Rejected {
                key,
                reason: "Mock Storage Error: Simulation requested".to_string(),
            });
        }

        let url = format!("http://localhost:9000/mock-bucket/{}", key);
        self.stored
            .lock()
            .map_err(|_| StorageError::Rejected {
                key: key.clone(),
                reason: "mock storage lock poisoned".to_string(),
            })?
            .push(key);
        Ok(url)
    }

    async fn remove_image(&self, key: &str) -> Result<(), StorageError> {
        let key = sanitize_key(key);
        if let Ok(mut stored) = self.stored.lock() {
            stored.retain(|k| k != &key);
        }
        if let Ok(mut removed) = self.removed.lock() {
            removed.push(key);
        }
        Ok(())
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
