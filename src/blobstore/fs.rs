//! Filesystem-backed [`super::BlobStore`].
//!
//! Bytes live under `base_dir/<key>`; URL generation mimics S3-style presigned access by
//! HMAC-signing `(method, key, expires)`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::{BlobReader, BlobStore, DelegatedUrlKind, ObjectMeta, UploadParams, UrlMetadata};
use crate::error::CoreError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct FsConfig {
    pub base_dir: PathBuf,
    pub url_prefix: String,
    pub secret: String,
    pub presign_expires_seconds: i64,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./data"),
            url_prefix: "/v1".into(),
            secret: String::new(),
            presign_expires_seconds: 1800,
        }
    }
}

#[derive(Debug)]
pub struct FsBlobStore {
    name: String,
    config: FsConfig,
}

impl FsBlobStore {
    pub fn new(name: impl Into<String>, config: FsConfig) -> Self {
        Self { name: name.into(), config }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.config.base_dir.join(key)
    }

    fn sidecar_for(&self, key: &str) -> PathBuf {
        let mut p = self.path_for(key).into_os_string();
        p.push(".mime");
        PathBuf::from(p)
    }
}

/// Signing payload is literally `"<METHOD>\n<key>\n<expires>"`.
pub fn sign(secret: &str, method: &str, key: &str, expires: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(method.as_bytes());
    mac.update(b"\n");
    mac.update(key.as_bytes());
    mac.update(b"\n");
    mac.update(expires.to_string().as_bytes());
    let tag = mac.finalize().into_bytes();
    hex_simd::encode_to_string(tag, hex_simd::AsciiCase::Lower)
}

fn method_for(kind: DelegatedUrlKind) -> &'static str {
    match kind {
        DelegatedUrlKind::Upload => "PUT",
        DelegatedUrlKind::Download | DelegatedUrlKind::Preview => "GET",
    }
}

fn segment_for(kind: DelegatedUrlKind) -> &'static str {
    match kind {
        DelegatedUrlKind::Upload => "upload",
        DelegatedUrlKind::Download => "download",
        DelegatedUrlKind::Preview => "preview",
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload(&self, key: &str, reader: BlobReader) -> Result<(), CoreError> {
        self.upload_with_params(key, reader, UploadParams::default()).await
    }

    async fn upload_with_params(&self, key: &str, mut reader: BlobReader, params: UploadParams) -> Result<(), CoreError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::UploadFailed(e.into()))?;
        }
        let mut file = tokio::fs::File::create(&path).await.map_err(|e| CoreError::UploadFailed(e.into()))?;
        tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(|e| CoreError::UploadFailed(e.into()))?;
        file.flush().await.map_err(|e| CoreError::UploadFailed(e.into()))?;

        if let Some(mime) = params.mime_type {
            tokio::fs::write(self.sidecar_for(key), mime)
                .await
                .map_err(|e| CoreError::UploadFailed(e.into()))?;
        }
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<BlobReader, CoreError> {
        let path = self.path_for(key);
        let file = tokio::fs::File::open(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CoreError::DownloadFailed(super::not_found(key)),
            _ => CoreError::DownloadFailed(e.into()),
        })?;
        Ok(Box::pin(file))
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        let path = self.path_for(key);
        tokio::fs::remove_file(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CoreError::UploadFailed(super::not_found(key)),
            _ => CoreError::UploadFailed(e.into()),
        })?;
        let _ = tokio::fs::remove_file(self.sidecar_for(key)).await;
        Ok(())
    }

    async fn get_object_meta(&self, key: &str) -> Result<ObjectMeta, CoreError> {
        let path = self.path_for(key);
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CoreError::DownloadFailed(super::not_found(key)),
            _ => CoreError::DownloadFailed(e.into()),
        })?;

        let mime_type = match tokio::fs::read_to_string(self.sidecar_for(key)).await {
            Ok(s) => Some(s),
            Err(_) => None,
        };

        let updated_at = metadata
            .modified()
            .map(chrono::DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(ObjectMeta {
            size_bytes: metadata.len(),
            mime_type,
            etag: None,
            updated_at,
            attributes: HashMap::new(),
        })
    }

    async fn get_delegated_url(&self, kind: DelegatedUrlKind, key: &str, _meta: &UrlMetadata) -> Result<String, CoreError> {
        let expires = Utc::now().timestamp() + self.config.presign_expires_seconds;
        let sig = sign(&self.config.secret, method_for(kind), key, expires);
        Ok(format!(
            "{}/{}/{}?expires={}&sig={}",
            self.config.url_prefix,
            segment_for(kind),
            key,
            expires,
            sig
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn store(dir: &Path) -> FsBlobStore {
        FsBlobStore::new(
            "fs",
            FsConfig {
                base_dir: dir.to_path_buf(),
                url_prefix: "/v1".into(),
                secret: "k".into(),
                presign_expires_seconds: 60,
            },
        )
    }

    #[tokio::test]
    async fn round_trips_bytes_via_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        s.upload("a/b", Box::pin(Cursor::new(b"payload".to_vec()))).await.unwrap();
        let mut reader = s.download("a/b").await.unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"payload");
    }

    #[tokio::test]
    async fn presigned_url_matches_expected_shape() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let url = s
            .get_delegated_url(DelegatedUrlKind::Download, "a/b", &UrlMetadata::default())
            .await
            .unwrap();
        assert!(url.starts_with("/v1/download/a/b?expires="));
        assert!(url.contains("&sig="));
    }

    #[test]
    fn signature_is_deterministic_for_same_inputs() {
        assert_eq!(sign("k", "GET", "a/b", 100), sign("k", "GET", "a/b", 100));
        assert_ne!(sign("k", "GET", "a/b", 100), sign("k", "PUT", "a/b", 100));
        assert_ne!(sign("k", "GET", "a/b", 100), sign("k2", "GET", "a/b", 100));
    }
}
