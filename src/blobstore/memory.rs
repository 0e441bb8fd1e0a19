//! In-process [`super::BlobStore`] backed by a map.
//!
//! Concurrent access is guarded by a readers/writer discipline: many concurrent readers,
//! one writer at a time per map, via [`tokio::sync::RwLock`].

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use md5::Digest as _;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;

use super::{BlobReader, BlobStore, DelegatedUrlKind, ObjectMeta, UploadParams, UrlMetadata};
use crate::error::CoreError;

#[derive(Debug, Clone)]
struct Entry {
    bytes: Vec<u8>,
    mime_type: Option<String>,
    updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug)]
pub struct MemoryBlobStore {
    name: String,
    objects: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryBlobStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload(&self, key: &str, mut reader: BlobReader) -> Result<(), CoreError> {
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .map_err(|e| CoreError::UploadFailed(e.into()))?;
        let mut objects = self.objects.write().await;
        objects.insert(
            key.to_owned(),
            Entry {
                bytes: buf,
                mime_type: None,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn upload_with_params(&self, key: &str, mut reader: BlobReader, params: UploadParams) -> Result<(), CoreError> {
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .map_err(|e| CoreError::UploadFailed(e.into()))?;
        let mut objects = self.objects.write().await;
        objects.insert(
            key.to_owned(),
            Entry {
                bytes: buf,
                mime_type: params.mime_type,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<BlobReader, CoreError> {
        let objects = self.objects.read().await;
        let entry = objects
            .get(key)
            .ok_or_else(|| CoreError::DownloadFailed(super::not_found(key)))?;
        let bytes = entry.bytes.clone();
        Ok(Box::pin(Cursor::new(bytes)))
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        let mut objects = self.objects.write().await;
        objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| CoreError::UploadFailed(super::not_found(key)))
    }

    async fn get_object_meta(&self, key: &str) -> Result<ObjectMeta, CoreError> {
        let objects = self.objects.read().await;
        let entry = objects
            .get(key)
            .ok_or_else(|| CoreError::DownloadFailed(super::not_found(key)))?;
        Ok(ObjectMeta {
            size_bytes: entry.bytes.len() as u64,
            mime_type: entry.mime_type.clone(),
            etag: Some(format!("{:x}", md5::Md5::digest(&entry.bytes))),
            updated_at: entry.updated_at,
            attributes: HashMap::new(),
        })
    }

    /// Memory cannot delegate I/O; callers must fall back to content-based URLs.
    async fn get_delegated_url(&self, _kind: DelegatedUrlKind, _key: &str, _meta: &UrlMetadata) -> Result<String, CoreError> {
        Err(CoreError::Validation(
            "memory backend cannot issue delegated URLs; use direct I/O".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor as StdCursor;

    #[tokio::test]
    async fn round_trips_bytes() {
        let store = MemoryBlobStore::new("mem");
        store
            .upload("k1", Box::pin(StdCursor::new(b"hello".to_vec())))
            .await
            .unwrap();
        let mut reader = store.download("k1").await.unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello");
    }

    #[tokio::test]
    async fn missing_key_errors() {
        let store = MemoryBlobStore::new("mem");
        assert!(store.download("nope").await.is_err());
    }

    #[tokio::test]
    async fn overwrite_replaces_previous_bytes() {
        let store = MemoryBlobStore::new("mem");
        store.upload("k1", Box::pin(StdCursor::new(b"first".to_vec()))).await.unwrap();
        store.upload("k1", Box::pin(StdCursor::new(b"second".to_vec()))).await.unwrap();
        let mut reader = store.download("k1").await.unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"second");
    }

    #[tokio::test]
    async fn delegated_url_unsupported() {
        let store = MemoryBlobStore::new("mem");
        let res = store
            .get_delegated_url(DelegatedUrlKind::Download, "k1", &UrlMetadata::default())
            .await;
        assert!(res.is_err());
    }
}
