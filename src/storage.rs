use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::{error::DisplayErrorContext, primitives::ByteStream};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::Mutex;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload of '{key}' failed: {reason}")]
    Upload { key: String, reason: String },

    #[error("delete of '{key}' failed: {reason}")]
    Delete { key: String, reason: String },

    #[error("lookup of '{key}' failed: {reason}")]
    Lookup { key: String, reason: String },
}

// 1. StorageService Contract
/// StorageService
///
/// Defines the abstract contract for the object storage bucket that holds
/// resource files. Handlers only see this trait, so the real S3 client
/// (`S3StorageClient`) and the in-memory mock (`MockStorageService`) are
/// interchangeable.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Only called in the `Env::Local`
    /// setup to provision the MinIO bucket.
    async fn ensure_bucket_exists(&self);

    /// Stores `bytes` under `key`, overwriting any previous object.
    ///
    /// # Arguments
    /// * `key`: The object key, `{folder}/{filename}`.
    /// * `content_type`: The MIME type declared by the uploading client.
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str)
    -> Result<(), StorageError>;

    /// Removes the object stored under `key`.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Whether an object is already stored under `key`.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

// 2. The Real Implementation (S3/MinIO/Supabase)
/// S3StorageClient
///
/// The concrete implementation using the AWS SDK for S3. Due to S3 compatibility,
/// this client transparently handles connections to:
/// - **Local:** Dockerized MinIO instance.
/// - **Production:** Supabase Storage's S3 gateway.
///
/// `force_path_style(true)` is required by both MinIO and Supabase.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    /// new
    ///
    /// Constructs the S3 client using credentials and configuration from AppConfig.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        let client = s3::Client::from_conf(config);

        Self {
            client,
            bucket_name: bucket.to_string(),
        }
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// ensure_bucket_exists
    ///
    /// Calls the S3 CreateBucket API. An "already owned" error is the expected
    /// outcome on every start after the first, so the result is only logged.
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, "create_bucket: {}", DisplayErrorContext(&e));
        }
    }

    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::info!(bucket = %self.bucket_name, key, size, "object stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete {
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::info!(bucket = %self.bucket_name, key, "object deleted");
        Ok(())
    }

    /// exists
    ///
    /// HeadObject on the key. `NotFound` means absent; any other failure is
    /// an error.
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(StorageError::Lookup {
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            }),
        }
    }
}

/// secure_filename
///
/// Reduces a client-supplied filename to a flat, ASCII-only name safe to use
/// as the last segment of an object key:
/// - the name is NFKD-decomposed and only its ASCII part kept, so `é` becomes `e`;
/// - path separators become spaces, so directory components cannot survive;
/// - whitespace runs collapse to a single `_`;
/// - anything outside `[A-Za-z0-9_.-]` is dropped;
/// - leading and trailing `.` and `_` are trimmed.
///
/// Returns an empty string when nothing usable remains.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename.nfkd().filter(char::is_ascii).collect();
    let flattened = ascii.replace(['/', '\\'], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

// 3. The Mock Implementation (For Tests)
/// StoredObject
///
/// What the mock keeps for each key.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// MockStorageService
///
/// An in-memory `StorageService` used by the integration tests. Clones share
/// the same object map, so a test can hand one clone to the application state
/// and inspect the other.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, uploads return a simulated failure.
    pub should_fail: bool,
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
    upload_attempts: Arc<Mutex<usize>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().await.get(key).cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }

    /// Number of `upload` calls received, failed ones included.
    pub async fn upload_attempts(&self) -> usize {
        *self.upload_attempts.lock().await
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {
        // Nothing to provision.
    }

    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        *self.upload_attempts.lock().await += 1;

        if self.should_fail {
            return Err(StorageError::Upload {
                key: key.to_string(),
                reason: "simulated upload failure".to_string(),
            });
        }

        self.objects.lock().await.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.lock().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.lock().await.contains_key(key))
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
