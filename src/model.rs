//! Domain entities for the content/object/derivation data model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One of the two terminal-bearing state machines a [`Content`] walks through.
///
/// Originals end in `Uploaded`; derived content ends in `Processed`. `ParseContentStatus`
/// (here, `ContentStatus::parse`) is the only accepted constructor from a wire string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Created,
    Uploading,
    Uploaded,
    Processing,
    Processed,
    Failed,
    Archived,
    Deleted,
}

impl ContentStatus {
    pub fn parse(s: &str) -> Result<Self, crate::error::CoreError> {
        Ok(match s {
            "created" => Self::Created,
            "uploading" => Self::Uploading,
            "uploaded" => Self::Uploaded,
            "processing" => Self::Processing,
            "processed" => Self::Processed,
            "failed" => Self::Failed,
            "archived" => Self::Archived,
            "deleted" => Self::Deleted,
            other => return Err(crate::error::CoreError::InvalidContentStatus(other.to_owned())),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    /// `IsValid`: every variant constructed via [`ContentStatus::parse`] is valid by
    /// construction; this exists so callers that hold a status can re-check it cheaply.
    pub fn is_valid(&self) -> bool {
        true
    }
}

impl std::fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStatus {
    Created,
    Uploading,
    Uploaded,
    Processing,
    Processed,
    Failed,
    Deleted,
}

impl ObjectStatus {
    pub fn parse(s: &str) -> Result<Self, crate::error::CoreError> {
        Ok(match s {
            "created" => Self::Created,
            "uploading" => Self::Uploading,
            "uploaded" => Self::Uploaded,
            "processing" => Self::Processing,
            "processed" => Self::Processed,
            "failed" => Self::Failed,
            "deleted" => Self::Deleted,
            other => return Err(crate::error::CoreError::InvalidObjectStatus(other.to_owned())),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
            Self::Deleted => "deleted",
        }
    }

    pub fn is_valid(&self) -> bool {
        true
    }
}

impl std::fmt::Display for ObjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical content record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: Uuid,
    pub tenant_id: String,
    pub owner_id: String,
    pub owner_type: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub document_type: String,
    /// Empty string means "original"; non-empty is the lowercased derivation category.
    pub derivation_type: String,
    pub status: ContentStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Content {
    pub fn is_derived(&self) -> bool {
        !self.derivation_type.is_empty()
    }

    /// Originals are ready at `uploaded`; derived content is ready at `processed`.
    pub fn is_ready(&self) -> bool {
        if self.is_derived() {
            self.status == ContentStatus::Processed
        } else {
            self.status == ContentStatus::Uploaded
        }
    }
}

/// Physical blob handle backing a [`Content`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    pub id: Uuid,
    pub content_id: Uuid,
    pub storage_backend_name: String,
    pub object_key: String,
    pub version: i64,
    pub status: ObjectStatus,
    pub file_name: Option<String>,
    pub object_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// 1:1 descriptive metadata for a [`Content`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub tags: Vec<String>,
    pub checksum: Option<String>,
    pub checksum_algorithm: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// 1:1 metadata for an [`Object`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub size_bytes: Option<i64>,
    pub mime_type: Option<String>,
    pub etag: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Edge in the derivation DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedContent {
    pub parent_id: Uuid,
    pub content_id: Uuid,
    pub derivation_type: String,
    pub variant: String,
    #[serde(default)]
    pub derivation_params: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub processing_metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    Memory,
    Fs,
    S3,
}

/// Registration record for a pluggable [`crate::blobstore::BlobStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageBackend {
    pub name: String,
    pub backend_type: BackendType,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

/// Derives the category (`derivation_type`) from a `variant` string: the substring
/// before the first underscore, or the whole string if there is none.
pub fn infer_derivation_type(variant: &str) -> String {
    let category = match variant.split_once('_') {
        Some((prefix, _)) => prefix,
        None => variant,
    };
    category.to_ascii_lowercase()
}

/// Well-known variant constants for developer ergonomics.
pub mod variants {
    pub const THUMBNAIL_256: &str = "thumbnail_256";
    pub const THUMBNAIL_512: &str = "thumbnail_512";
    pub const PREVIEW_DEFAULT: &str = "preview_default";
    pub const TRANSCODE_MP4: &str = "transcode_mp4";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_category_from_prefix() {
        assert_eq!(infer_derivation_type("thumbnail_256"), "thumbnail");
        assert_eq!(infer_derivation_type("preview"), "preview");
        assert_eq!(infer_derivation_type("Thumbnail_Big"), "thumbnail");
    }

    #[test]
    fn content_readiness_depends_on_derivation() {
        let mut c = Content {
            id: Uuid::new_v4(),
            tenant_id: "t".into(),
            owner_id: "o".into(),
            owner_type: None,
            name: "n".into(),
            description: None,
            document_type: "text/plain".into(),
            derivation_type: String::new(),
            status: ContentStatus::Uploaded,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };
        assert!(c.is_ready());
        c.status = ContentStatus::Processing;
        assert!(!c.is_ready());

        c.derivation_type = "thumbnail".into();
        c.status = ContentStatus::Processed;
        assert!(c.is_ready());
        c.status = ContentStatus::Uploaded;
        assert!(!c.is_ready());
    }
}
