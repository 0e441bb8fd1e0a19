//! Persistence abstraction.
//!
//! The Repository owns Content/Object/metadata/derivation persistence; the Service is
//! the only caller allowed to mutate through it. `ListContent`/`GetObjectsByContentID`
//! ordering and soft-delete semantics are part of the contract, not an implementation
//! detail.

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{Content, ContentMetadata, ContentStatus, DerivedContent, Object, ObjectMetadata, ObjectStatus};
use crate::options::{ListContentOptions, ListDerivedContentOptions};

#[async_trait]
pub trait Repository: Send + Sync + std::fmt::Debug + 'static {
    async fn create_content(&self, content: Content) -> Result<Content, CoreError>;
    async fn get_content(&self, id: Uuid) -> Result<Content, CoreError>;
    async fn update_content(&self, content: Content) -> Result<Content, CoreError>;
    /// Soft-deletes (sets `deleted_at`); memory and SQL repositories agree on this policy.
    async fn delete_content(&self, id: Uuid) -> Result<(), CoreError>;
    /// Newest-first (`created_at DESC`); excludes soft-deleted rows unless
    /// `include_deleted` is set.
    async fn list_content(&self, options: &ListContentOptions) -> Result<Vec<Content>, CoreError>;
    async fn get_content_by_status(&self, status: ContentStatus) -> Result<Vec<Content>, CoreError>;

    async fn set_content_metadata(&self, content_id: Uuid, metadata: ContentMetadata) -> Result<(), CoreError>;
    async fn get_content_metadata(&self, content_id: Uuid) -> Result<Option<ContentMetadata>, CoreError>;

    async fn create_derived_content_relationship(&self, edge: DerivedContent) -> Result<DerivedContent, CoreError>;
    async fn list_derived_content(&self, options: &ListDerivedContentOptions) -> Result<Vec<DerivedContent>, CoreError>;
    async fn get_derived_relationship_by_content_id(&self, child_id: Uuid) -> Result<Option<DerivedContent>, CoreError>;

    async fn create_object(&self, object: Object) -> Result<Object, CoreError>;
    async fn get_object(&self, id: Uuid) -> Result<Object, CoreError>;
    async fn update_object(&self, object: Object) -> Result<Object, CoreError>;
    async fn delete_object(&self, id: Uuid) -> Result<(), CoreError>;
    /// Highest `version` first, then newest-first.
    async fn get_objects_by_content_id(&self, content_id: Uuid) -> Result<Vec<Object>, CoreError>;
    async fn get_object_by_key_and_backend(&self, backend_name: &str, object_key: &str) -> Result<Option<Object>, CoreError>;
    async fn get_objects_by_status(&self, status: ObjectStatus) -> Result<Vec<Object>, CoreError>;

    async fn set_object_metadata(&self, object_id: Uuid, metadata: ObjectMetadata) -> Result<(), CoreError>;
    async fn get_object_metadata(&self, object_id: Uuid) -> Result<Option<ObjectMetadata>, CoreError>;

    /// Batch accessors backing `GetContentDetailsBatch`, avoiding N+1 queries.
    /// Missing ids are simply absent from the result maps.
    async fn get_contents_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Content>, CoreError>;
    async fn get_content_metadata_by_content_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ContentMetadata>, CoreError>;
    async fn get_objects_by_content_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Object>>, CoreError>;
    async fn get_object_metadata_by_object_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ObjectMetadata>, CoreError>;
}
