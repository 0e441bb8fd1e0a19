//! S3-compatible [`super::BlobStore`].
//!
//! Delegates to the AWS SDK: an `aws_sdk_s3::Client` built from explicit
//! credentials/endpoint/region, with `force_path_style` controlled by `UsePathStyle`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::presigning::PresigningConfig;
use chrono::Utc;
use tokio::io::AsyncReadExt;

use super::{BlobReader, BlobStore, DelegatedUrlKind, ObjectMeta, UploadParams, UrlMetadata};
use crate::error::CoreError;

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub use_path_style: bool,
    pub create_bucket_if_not_exist: bool,
    pub sse: Option<String>,
}

#[derive(Debug)]
pub struct S3BlobStore {
    name: String,
    bucket: String,
    client: aws_sdk_s3::Client,
}

impl S3BlobStore {
    pub async fn new(name: impl Into<String>, config: S3Config) -> Result<Self, CoreError> {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "content-core-static-credentials",
        );

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::v2023_11_09())
            .region(aws_sdk_s3::config::Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(config.use_path_style);

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        let client = aws_sdk_s3::Client::from_conf(builder.build());

        if config.create_bucket_if_not_exist {
            let exists = client.head_bucket().bucket(&config.bucket).send().await.is_ok();
            if !exists {
                tracing::info!(bucket = %config.bucket, "creating bucket in backing store");
                client
                    .create_bucket()
                    .bucket(&config.bucket)
                    .send()
                    .await
                    .map_err(|e| CoreError::UploadFailed(anyhow::Error::new(e)))?;
            }
        }

        Ok(Self {
            name: name.into(),
            bucket: config.bucket,
            client,
        })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload(&self, key: &str, reader: BlobReader) -> Result<(), CoreError> {
        self.upload_with_params(key, reader, UploadParams::default()).await
    }

    async fn upload_with_params(&self, key: &str, mut reader: BlobReader, params: UploadParams) -> Result<(), CoreError> {
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .map_err(|e| CoreError::UploadFailed(e.into()))?;

        let mut req = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(buf));
        if let Some(mime) = params.mime_type {
            req = req.content_type(mime);
        }
        req.send().await.map_err(|e| CoreError::UploadFailed(anyhow::Error::new(e)))?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<BlobReader, CoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if is_no_such_key(&e) {
                    CoreError::DownloadFailed(super::not_found(key))
                } else {
                    CoreError::DownloadFailed(anyhow::Error::new(e))
                }
            })?;
        Ok(Box::pin(output.body.into_async_read()))
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| CoreError::UploadFailed(anyhow::Error::new(e)))?;
        Ok(())
    }

    async fn get_object_meta(&self, key: &str) -> Result<ObjectMeta, CoreError> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if is_no_such_key(&e) {
                    CoreError::DownloadFailed(super::not_found(key))
                } else {
                    CoreError::DownloadFailed(anyhow::Error::new(e))
                }
            })?;

        Ok(ObjectMeta {
            size_bytes: output.content_length().unwrap_or(0).max(0) as u64,
            mime_type: output.content_type().map(|s| s.to_owned()),
            etag: output.e_tag().map(|s| s.trim_matches('"').to_owned()),
            updated_at: output
                .last_modified()
                .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), 0))
                .unwrap_or_else(Utc::now),
            attributes: HashMap::new(),
        })
    }

    async fn get_delegated_url(&self, kind: DelegatedUrlKind, key: &str, meta: &UrlMetadata) -> Result<String, CoreError> {
        let expiry = Duration::from_secs(meta.version.map(|_| 3600).unwrap_or(3600));
        let presign_config = PresigningConfig::expires_in(expiry).map_err(|e| CoreError::Internal(e.into()))?;

        let url = match kind {
            DelegatedUrlKind::Upload => {
                let mut req = self.client.put_object().bucket(&self.bucket).key(key);
                if let Some(ct) = &meta.content_type {
                    req = req.content_type(ct);
                }
                req.presigned(presign_config)
                    .await
                    .map_err(|e| CoreError::Internal(e.into()))?
                    .uri()
                    .to_owned()
            }
            DelegatedUrlKind::Download | DelegatedUrlKind::Preview => {
                let mut req = self.client.get_object().bucket(&self.bucket).key(key);
                if let Some(name) = &meta.file_name {
                    let disposition = if kind == DelegatedUrlKind::Download {
                        format!("attachment; filename=\"{name}\"")
                    } else {
                        format!("inline; filename=\"{name}\"")
                    };
                    req = req.response_content_disposition(disposition);
                }
                req.presigned(presign_config)
                    .await
                    .map_err(|e| CoreError::Internal(e.into()))?
                    .uri()
                    .to_owned()
            }
        };

        Ok(url)
    }
}

fn is_no_such_key<E>(err: &aws_sdk_s3::error::SdkError<E>) -> bool {
    matches!(err, aws_sdk_s3::error::SdkError::ServiceError(_)) && format!("{err}").contains("NoSuchKey")
}
