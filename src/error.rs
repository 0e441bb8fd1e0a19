//! Typed error taxonomy.
//!
//! `CoreError` enumerates each failure kind as a variant rather than a stringly-typed
//! code. `ContentError`/`ObjectError`/`StorageError` wrap a `CoreError` with the
//! operation name and identifier that were in flight when it occurred, so every core
//! operation returns a typed error carrying `{operation, id, wrapped_cause}`.

use std::panic::Location;

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("content not found: {0}")]
    ContentNotFound(Uuid),

    #[error("object not found: {0}")]
    ObjectNotFound(Uuid),

    #[error("storage backend not found: {0}")]
    StorageBackendNotFound(String),

    #[error("invalid content status: {0}")]
    InvalidContentStatus(String),

    #[error("invalid object status: {0}")]
    InvalidObjectStatus(String),

    #[error("content is not in an uploadable state")]
    InvalidUploadState,

    #[error("content is not ready for download")]
    ContentNotReady,

    #[error("object is not ready for download")]
    ObjectNotReady,

    #[error("parent content is not ready for derivation")]
    ParentNotReady,

    #[error("content is being processed")]
    ContentBeingProcessed,

    #[error("maximum derivation depth exceeded")]
    MaxDerivationDepth,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("upload failed: {0}")]
    UploadFailed(#[source] anyhow::Error),

    #[error("download failed: {0}")]
    DownloadFailed(#[source] anyhow::Error),

    #[error("presigned url has expired")]
    UrlExpired,

    #[error("presigned url signature mismatch")]
    BadSignature,

    #[error("object key exceeds maximum length")]
    KeyTooLong,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    /// Stable machine-readable code for the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ContentNotFound(_) => "content_not_found",
            Self::ObjectNotFound(_) => "object_not_found",
            Self::StorageBackendNotFound(_) => "storage_backend_not_found",
            Self::InvalidContentStatus(_) => "invalid_content_status",
            Self::InvalidObjectStatus(_) => "invalid_object_status",
            Self::InvalidUploadState => "invalid_upload_state",
            Self::ContentNotReady => "content_not_ready",
            Self::ObjectNotReady => "object_not_ready",
            Self::ParentNotReady => "parent_not_ready",
            Self::ContentBeingProcessed => "content_being_processed",
            Self::MaxDerivationDepth => "max_derivation_depth",
            Self::Validation(_) => "validation_failed",
            Self::UploadFailed(_) => "upload_failed",
            Self::DownloadFailed(_) => "download_failed",
            Self::UrlExpired => "url_expired",
            Self::BadSignature => "bad_signature",
            Self::KeyTooLong => "key_too_long",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Operation-scoped error wrapper for content-id-keyed operations.
#[derive(Debug, thiserror::Error)]
#[error("content operation '{operation}' failed for {id:?}: {source}")]
pub struct ContentError {
    pub operation: &'static str,
    pub id: Option<Uuid>,
    #[source]
    pub source: CoreError,
}

/// Operation-scoped error wrapper for object-id-keyed operations.
#[derive(Debug, thiserror::Error)]
#[error("object operation '{operation}' failed for {id:?}: {source}")]
pub struct ObjectError {
    pub operation: &'static str,
    pub id: Option<Uuid>,
    #[source]
    pub source: CoreError,
}

/// Operation-scoped error wrapper for storage-backend-keyed operations.
#[derive(Debug, thiserror::Error)]
#[error("storage operation '{operation}' failed for backend '{backend}': {source}")]
pub struct StorageError {
    pub operation: &'static str,
    pub backend: String,
    #[source]
    pub source: CoreError,
}

#[track_caller]
#[inline]
pub fn log(source: &dyn std::error::Error) {
    let location = Location::caller();
    let span_trace = tracing_error::SpanTrace::capture();

    tracing::error!(
        target: "content_core",
        %location,
        error = %source,
        "span trace:\n{span_trace}"
    );
}

/// Logs a failing `Result`'s error via [`log`] before propagating it.
#[macro_export]
macro_rules! log_err {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(err) => {
                $crate::error::log(&err);
                return Err(err.into());
            }
        }
    };
}
