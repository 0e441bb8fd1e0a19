//! Functional-options request/query types.
//!
//! Rust has no variadic functional-options idiom, so these are plain `Default` structs
//! with fluent `with_*` builder methods, the same shape as `s3s::dto::builders::*Builder`
//! request construction.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::blobstore::BlobReader;
use crate::model::ContentStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    CreatedAtDesc,
    CreatedAtAsc,
}

impl Default for Sort {
    fn default() -> Self {
        Self::CreatedAtDesc
    }
}

/// `ListContent(owner, tenant)`.
#[derive(Debug, Clone, Default)]
pub struct ListContentOptions {
    pub owner_id: Option<String>,
    pub tenant_id: Option<String>,
    pub include_deleted: bool,
}

impl ListContentOptions {
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_include_deleted(mut self, include_deleted: bool) -> Self {
        self.include_deleted = include_deleted;
        self
    }
}

/// `ListDerivedContent(options…)` rich filter set.
#[derive(Debug, Clone, Default)]
pub struct ListDerivedContentOptions {
    pub parent_ids: Vec<Uuid>,
    pub derivation_types: Vec<String>,
    pub variants: Vec<String>,
    pub type_variant_pairs: Vec<(String, String)>,
    pub status: Option<ContentStatus>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub sort: Sort,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub include_urls: bool,
    pub include_objects: bool,
    pub include_metadata: bool,
}

impl ListDerivedContentOptions {
    pub fn with_parent_id(mut self, id: Uuid) -> Self {
        self.parent_ids.push(id);
        self
    }

    pub fn with_parent_ids(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.parent_ids.extend(ids);
        self
    }

    pub fn with_derivation_type(mut self, derivation_type: impl Into<String>) -> Self {
        self.derivation_types.push(derivation_type.into());
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variants.push(variant.into());
        self
    }

    pub fn with_type_variant(mut self, derivation_type: impl Into<String>, variant: impl Into<String>) -> Self {
        self.type_variant_pairs.push((derivation_type.into(), variant.into()));
        self
    }

    pub fn with_status(mut self, status: ContentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_created_window(mut self, after: Option<DateTime<Utc>>, before: Option<DateTime<Utc>>) -> Self {
        self.created_after = after;
        self.created_before = before;
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_urls(mut self) -> Self {
        self.include_urls = true;
        self
    }

    pub fn with_objects(mut self) -> Self {
        self.include_objects = true;
        self
    }

    pub fn with_metadata(mut self) -> Self {
        self.include_metadata = true;
        self
    }
}

/// `GetContentDetails(id, opts…)`.
#[derive(Debug, Clone, Default)]
pub struct ContentDetailsOptions {
    pub with_upload_access: bool,
    pub url_expiry_seconds: Option<i64>,
}

impl ContentDetailsOptions {
    pub fn with_upload_access(mut self) -> Self {
        self.with_upload_access = true;
        self
    }

    pub fn with_url_expiry_seconds(mut self, seconds: i64) -> Self {
        self.url_expiry_seconds = Some(seconds);
        self
    }
}

/// `CreateContent(req)`: no bytes; the two-phase counterpart to `UploadContent` used by
/// `POST /api/v1/contents` followed by a separate upload call.
#[derive(Debug, Clone)]
pub struct CreateContentRequest {
    pub tenant_id: String,
    pub owner_id: String,
    pub owner_type: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub document_type: String,
}

/// `UploadContent(req)`.
pub struct UploadContentRequest {
    pub tenant_id: String,
    pub owner_id: String,
    pub owner_type: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub document_type: String,
    pub storage_backend_name: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub reader: BlobReader,
}

/// `UploadDerivedContent(req)`.
pub struct UploadDerivedContentRequest {
    pub parent_id: Uuid,
    pub tenant_id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub document_type: String,
    pub derivation_type: Option<String>,
    pub variant: String,
    pub derivation_params: std::collections::HashMap<String, serde_json::Value>,
    pub storage_backend_name: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub reader: BlobReader,
}

/// `CreateDerivedContent(req)`: no bytes, supports queue-consumer patterns via
/// `initial_status`.
#[derive(Debug, Clone)]
pub struct CreateDerivedContentRequest {
    pub parent_id: Uuid,
    pub tenant_id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub document_type: String,
    pub derivation_type: Option<String>,
    pub variant: String,
    pub derivation_params: std::collections::HashMap<String, serde_json::Value>,
    pub initial_status: Option<ContentStatus>,
}

/// `UploadObjectForContent(req)`.
pub struct UploadObjectForContentRequest {
    pub content_id: Uuid,
    pub storage_backend_name: Option<String>,
    pub version: i64,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub reader: BlobReader,
}

/// `CreateObject`: object-focused advanced API, `POST /api/v1/contents/{id}/objects`,
/// allocates an Object row without transferring bytes.
#[derive(Debug, Clone)]
pub struct CreateObjectRequest {
    pub content_id: Uuid,
    pub storage_backend_name: Option<String>,
    pub version: i64,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}
