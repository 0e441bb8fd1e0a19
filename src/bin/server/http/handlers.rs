//! Request handlers for the JSON REST surface.
//!
//! Bodies are streamed directly into the core's `BlobStore` APIs rather than buffered,
//! adapting the request/response byte stream into an `AsyncRead`/`AsyncWrite` with
//! `tokio_util::io::{StreamReader, ReaderStream}`.

use std::collections::HashMap;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::io::{ReaderStream, StreamReader};
use uuid::Uuid;

use content_core::blobstore::DelegatedUrlKind;
use content_core::model::{Content, ContentStatus, Object};
use content_core::options::{
    ContentDetailsOptions, CreateContentRequest, CreateDerivedContentRequest, CreateObjectRequest, ListContentOptions,
    ListDerivedContentOptions, UploadObjectForContentRequest,
};

use super::error_response::ApiError;
use super::AppState;

fn body_to_reader(body: Body) -> content_core::blobstore::BlobReader {
    let stream = body
        .into_data_stream()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
    Box::pin(StreamReader::new(stream))
}

fn content_type_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_owned())
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub id: Uuid,
    pub tenant_id: String,
    pub owner_id: String,
    pub owner_type: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub document_type: String,
    pub derivation_type: String,
    pub status: ContentStatus,
    pub version: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Content> for ContentResponse {
    fn from(c: Content) -> Self {
        Self {
            id: c.id,
            tenant_id: c.tenant_id,
            owner_id: c.owner_id,
            owner_type: c.owner_type,
            name: c.name,
            description: c.description,
            document_type: c.document_type,
            derivation_type: c.derivation_type,
            status: c.status,
            version: c.version,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ObjectResponse {
    pub id: Uuid,
    pub content_id: Uuid,
    pub storage_backend_name: String,
    pub object_key: String,
    pub version: i64,
    pub status: content_core::model::ObjectStatus,
}

impl From<Object> for ObjectResponse {
    fn from(o: Object) -> Self {
        Self {
            id: o.id,
            content_id: o.content_id,
            storage_backend_name: o.storage_backend_name,
            object_key: o.object_key,
            version: o.version,
            status: o.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateContentBody {
    pub tenant_id: String,
    pub owner_id: String,
    pub owner_type: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub document_type: String,
}

pub async fn create_content(
    State(state): State<AppState>,
    Json(body): Json<CreateContentBody>,
) -> Result<(StatusCode, Json<ContentResponse>), ApiError> {
    let content = state
        .service
        .create_content(CreateContentRequest {
            tenant_id: body.tenant_id,
            owner_id: body.owner_id,
            owner_type: body.owner_type,
            name: body.name,
            description: body.description,
            document_type: body.document_type,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(content.into())))
}

pub async fn get_content(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<ContentResponse>, ApiError> {
    let content = state.service.get_content(id).await?;
    Ok(Json(content.into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateContentBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub document_type: Option<String>,
}

pub async fn update_content(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateContentBody>,
) -> Result<Json<ContentResponse>, ApiError> {
    let content = state
        .service
        .update_content_fields(id, body.name, body.description, body.document_type)
        .await?;
    Ok(Json(content.into()))
}

#[derive(Debug, Deserialize, Default)]
pub struct DeleteQuery {
    #[serde(default)]
    pub force: bool,
}

pub async fn delete_content(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_content(id, query.force).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Default)]
pub struct ListContentQuery {
    pub owner_id: Option<String>,
    pub tenant_id: Option<String>,
}

pub async fn list_content(
    State(state): State<AppState>,
    Query(query): Query<ListContentQuery>,
) -> Result<Json<Vec<ContentResponse>>, ApiError> {
    let options = ListContentOptions {
        owner_id: query.owner_id,
        tenant_id: query.tenant_id,
        include_deleted: false,
    };
    let rows = state.service.list_content(&options).await?;
    Ok(Json(rows.into_iter().map(ContentResponse::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateDerivedContentBody {
    pub tenant_id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub document_type: String,
    pub derivation_type: Option<String>,
    pub variant: String,
    #[serde(default)]
    pub derivation_params: HashMap<String, serde_json::Value>,
    pub initial_status: Option<ContentStatus>,
}

pub async fn create_derived_content(
    State(state): State<AppState>,
    Path(parent_id): Path<Uuid>,
    Json(body): Json<CreateDerivedContentBody>,
) -> Result<(StatusCode, Json<ContentResponse>), ApiError> {
    let content = state
        .service
        .create_derived_content(CreateDerivedContentRequest {
            parent_id,
            tenant_id: body.tenant_id,
            owner_id: body.owner_id,
            name: body.name,
            description: body.description,
            document_type: body.document_type,
            derivation_type: body.derivation_type,
            variant: body.variant,
            derivation_params: body.derivation_params,
            initial_status: body.initial_status,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(content.into())))
}

#[derive(Debug, Serialize)]
pub struct DerivedContentResponse {
    pub parent_id: Uuid,
    pub content_id: Uuid,
    pub derivation_type: String,
    pub variant: String,
    pub status: Option<ContentStatus>,
    pub download_url: Option<String>,
    pub preview_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

pub async fn list_derived_for_parent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<DerivedContentResponse>>, ApiError> {
    let options = ListDerivedContentOptions::default().with_parent_id(id).with_urls();
    let views = state.service.list_derived_content(&options).await?;
    Ok(Json(
        views
            .into_iter()
            .map(|v| DerivedContentResponse {
                parent_id: v.edge.parent_id,
                content_id: v.edge.content_id,
                derivation_type: v.edge.derivation_type,
                variant: v.edge.variant,
                status: v.status,
                download_url: v.download_url,
                preview_url: v.preview_url,
                thumbnail_url: v.thumbnail_url,
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize, Default)]
pub struct DetailsQuery {
    #[serde(default)]
    pub upload_access: bool,
    pub expiry_seconds: Option<i64>,
}

pub async fn get_content_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DetailsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut opts = ContentDetailsOptions::default();
    if query.upload_access {
        opts = opts.with_upload_access();
    }
    if let Some(seconds) = query.expiry_seconds {
        opts = opts.with_url_expiry_seconds(seconds);
    }
    let details = state.service.get_content_details(id, &opts).await?;
    Ok(Json(serde_json::json!({
        "id": details.id,
        "ready": details.ready,
        "status": details.status,
        "file_name": details.file_name,
        "file_size": details.file_size,
        "mime_type": details.mime_type,
        "tags": details.tags,
        "checksum": details.checksum,
        "download_url": details.download_url,
        "preview_url": details.preview_url,
        "upload_url": details.upload_url,
        "expires_at": details.expires_at,
        "thumbnail": details.thumbnail,
        "thumbnails": details.thumbnails,
        "previews": details.previews,
        "transcodes": details.transcodes,
    })))
}

pub async fn upload_to_content(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Body,
) -> Result<StatusCode, ApiError> {
    let mime_type = content_type_of(&headers);
    let file_name = headers
        .get("x-file-name")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_owned());

    state
        .service
        .upload_object_for_content(UploadObjectForContentRequest {
            content_id: id,
            storage_backend_name: None,
            version: 1,
            file_name,
            mime_type,
            reader: body_to_reader(body),
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn stream_download(
    reader: content_core::blobstore::BlobReader,
    mime_type: Option<String>,
    file_name: Option<String>,
    disposition: &str,
) -> Response {
    let body = Body::from_stream(ReaderStream::new(reader));
    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime_type.unwrap_or_else(|| "application/octet-stream".into()));
    if let Some(name) = file_name {
        response = response.header(header::CONTENT_DISPOSITION, format!("{disposition}; filename=\"{name}\""));
    } else {
        response = response.header(header::CONTENT_DISPOSITION, disposition.to_owned());
    }
    response.body(body).expect("response with streamed body is always valid")
}

pub async fn download_content(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, ApiError> {
    let details = state.service.get_content_details(id, &ContentDetailsOptions::default()).await?;
    let reader = state.service.download_content(id).await?;
    Ok(stream_download(reader, details.mime_type, details.file_name, "attachment").await)
}

pub async fn preview_content(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, ApiError> {
    let details = state.service.get_content_details(id, &ContentDetailsOptions::default()).await?;
    let reader = state.service.download_content(id).await?;
    Ok(stream_download(reader, details.mime_type, details.file_name, "inline").await)
}

#[derive(Debug, Deserialize)]
pub struct CreateObjectBody {
    pub storage_backend_name: Option<String>,
    #[serde(default = "default_version")]
    pub version: i64,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

fn default_version() -> i64 {
    1
}

pub async fn create_object(
    State(state): State<AppState>,
    Path(content_id): Path<Uuid>,
    Json(body): Json<CreateObjectBody>,
) -> Result<(StatusCode, Json<ObjectResponse>), ApiError> {
    let object = state
        .service
        .create_object(CreateObjectRequest {
            content_id,
            storage_backend_name: body.storage_backend_name,
            version: body.version,
            file_name: body.file_name,
            mime_type: body.mime_type,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(object.into())))
}

pub async fn upload_to_object(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Body,
) -> Result<StatusCode, ApiError> {
    let mime_type = content_type_of(&headers);
    state.service.upload_to_object(id, body_to_reader(body), mime_type).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_object(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, ApiError> {
    let reader = state.service.download_object(id).await?;
    Ok(stream_download(reader, None, None, "attachment").await)
}

#[derive(Debug, Serialize)]
pub struct UrlResponse {
    pub url: String,
}

async fn delegated_url(state: &AppState, id: Uuid, kind: DelegatedUrlKind) -> Result<Json<UrlResponse>, ApiError> {
    let url = state.service.get_object_delegated_url(id, kind).await?;
    Ok(Json(UrlResponse { url }))
}

pub async fn object_upload_url(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<UrlResponse>, ApiError> {
    delegated_url(&state, id, DelegatedUrlKind::Upload).await
}

pub async fn object_download_url(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<UrlResponse>, ApiError> {
    delegated_url(&state, id, DelegatedUrlKind::Download).await
}

pub async fn object_preview_url(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<UrlResponse>, ApiError> {
    delegated_url(&state, id, DelegatedUrlKind::Preview).await
}
