//! Pluggable binary storage.
//!
//! A [`BlobStore`] is a named port over byte storage. All implementations must honor the
//! same overwrite/streaming/not-found semantics regardless of backend.

pub mod fs;
pub mod memory;
pub mod s3;

use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncRead;

use crate::error::CoreError;

pub type BlobReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

#[derive(Debug, Clone, Default)]
pub struct UploadParams {
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub size_bytes: u64,
    pub mime_type: Option<String>,
    pub etag: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub attributes: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegatedUrlKind {
    Upload,
    Download,
    Preview,
}

/// Hint passed to delegated-URL generation so backends can embed
/// `response-content-disposition`/`response-content-type`.
#[derive(Debug, Clone, Default)]
pub struct UrlMetadata {
    pub file_name: Option<String>,
    pub version: Option<i64>,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Backend name this store was registered under.
    fn name(&self) -> &str;

    /// Streams bytes under `key`; prior content at the same key is overwritten.
    async fn upload(&self, key: &str, reader: BlobReader) -> Result<(), CoreError>;

    /// Same as [`BlobStore::upload`] but records content-type where the backend supports it.
    async fn upload_with_params(&self, key: &str, reader: BlobReader, params: UploadParams) -> Result<(), CoreError>;

    /// Returns a streaming reader; missing key yields [`CoreError::ObjectNotFound`]-shaped
    /// download error via [`CoreError::DownloadFailed`] wrapping a not-found cause.
    async fn download(&self, key: &str) -> Result<BlobReader, CoreError>;

    /// Idempotent-equivalent: callers treat a not-found error as success where appropriate.
    async fn delete(&self, key: &str) -> Result<(), CoreError>;

    async fn get_object_meta(&self, key: &str) -> Result<ObjectMeta, CoreError>;

    /// Backend-native delegated URL, where supported. Memory always errors (direct I/O
    /// required); filesystem returns HMAC-signed URLs; S3 returns presigned URLs.
    async fn get_delegated_url(&self, kind: DelegatedUrlKind, key: &str, meta: &UrlMetadata) -> Result<String, CoreError>;
}

/// Sentinel error marking "object not found" inside a [`CoreError::DownloadFailed`]/
/// [`CoreError::UploadFailed`]/deletion failure - backends wrap this so callers can
/// `downcast_ref` to detect it irrespective of backend.
#[derive(Debug, thiserror::Error)]
#[error("object not found in blob store: {0}")]
pub struct ObjectNotFoundInStore(pub String);

pub fn not_found(key: &str) -> anyhow::Error {
    anyhow::Error::new(ObjectNotFoundInStore(key.to_owned()))
}

pub fn is_not_found(err: &CoreError) -> bool {
    let cause = match err {
        CoreError::DownloadFailed(e) | CoreError::UploadFailed(e) => Some(e),
        _ => None,
    };
    cause
        .map(|e| e.downcast_ref::<ObjectNotFoundInStore>().is_some())
        .unwrap_or(false)
}
