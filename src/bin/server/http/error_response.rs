//! Maps [`CoreError`] to the wire error shape and HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use content_core::CoreError;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// Wraps a [`CoreError`] so handlers can `?`-return it and axum renders `{"error":{..}}`
/// with the status the taxonomy table assigns it.
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::ContentNotFound(_) | CoreError::ObjectNotFound(_) => StatusCode::NOT_FOUND,
        CoreError::StorageBackendNotFound(_) => StatusCode::BAD_REQUEST,
        CoreError::InvalidContentStatus(_) | CoreError::InvalidObjectStatus(_) | CoreError::InvalidUploadState => {
            StatusCode::BAD_REQUEST
        }
        CoreError::ContentNotReady | CoreError::ObjectNotReady | CoreError::ParentNotReady => StatusCode::CONFLICT,
        CoreError::ContentBeingProcessed => StatusCode::CONFLICT,
        CoreError::MaxDerivationDepth => StatusCode::BAD_REQUEST,
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::UploadFailed(_) | CoreError::DownloadFailed(_) => StatusCode::BAD_GATEWAY,
        CoreError::UrlExpired | CoreError::BadSignature => StatusCode::FORBIDDEN,
        CoreError::KeyTooLong => StatusCode::BAD_REQUEST,
        CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        content_core::error::log(&self.0);
        let status = status_for(&self.0);
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.0.code(),
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
