//! Reference in-memory [`super::Repository`].
//!
//! Guarded by a single [`tokio::sync::RwLock`] per table. Soft-delete only (sets
//! `deleted_at`), matching the SQL repository's policy.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::Repository;
use crate::error::CoreError;
use crate::model::{Content, ContentMetadata, ContentStatus, DerivedContent, Object, ObjectMetadata, ObjectStatus};
use crate::options::{ListContentOptions, ListDerivedContentOptions, Sort};

#[derive(Debug, Default)]
struct Tables {
    contents: HashMap<Uuid, Content>,
    content_metadata: HashMap<Uuid, ContentMetadata>,
    objects: HashMap<Uuid, Object>,
    object_metadata: HashMap<Uuid, ObjectMetadata>,
    derived: Vec<DerivedContent>,
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: Arc<tokio::sync::RwLock<Tables>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_content(&self, content: Content) -> Result<Content, CoreError> {
        let mut tables = self.tables.write().await;
        tables.contents.insert(content.id, content.clone());
        Ok(content)
    }

    async fn get_content(&self, id: Uuid) -> Result<Content, CoreError> {
        let tables = self.tables.read().await;
        tables
            .contents
            .get(&id)
            .filter(|c| c.deleted_at.is_none())
            .cloned()
            .ok_or(CoreError::ContentNotFound(id))
    }

    async fn update_content(&self, mut content: Content) -> Result<Content, CoreError> {
        content.updated_at = Utc::now();
        let mut tables = self.tables.write().await;
        tables.contents.insert(content.id, content.clone());
        Ok(content)
    }

    async fn delete_content(&self, id: Uuid) -> Result<(), CoreError> {
        let mut tables = self.tables.write().await;
        let content = tables.contents.get_mut(&id).ok_or(CoreError::ContentNotFound(id))?;
        content.deleted_at = Some(Utc::now());
        content.updated_at = Utc::now();
        Ok(())
    }

    async fn list_content(&self, options: &ListContentOptions) -> Result<Vec<Content>, CoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Content> = tables
            .contents
            .values()
            .filter(|c| options.include_deleted || c.deleted_at.is_none())
            .filter(|c| options.owner_id.as_deref().map_or(true, |o| o == c.owner_id))
            .filter(|c| options.tenant_id.as_deref().map_or(true, |t| t == c.tenant_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn get_content_by_status(&self, status: ContentStatus) -> Result<Vec<Content>, CoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .contents
            .values()
            .filter(|c| c.deleted_at.is_none() && c.status == status)
            .cloned()
            .collect())
    }

    async fn set_content_metadata(&self, content_id: Uuid, metadata: ContentMetadata) -> Result<(), CoreError> {
        let mut tables = self.tables.write().await;
        tables.content_metadata.insert(content_id, metadata);
        Ok(())
    }

    async fn get_content_metadata(&self, content_id: Uuid) -> Result<Option<ContentMetadata>, CoreError> {
        let tables = self.tables.read().await;
        Ok(tables.content_metadata.get(&content_id).cloned())
    }

    async fn create_derived_content_relationship(&self, edge: DerivedContent) -> Result<DerivedContent, CoreError> {
        let mut tables = self.tables.write().await;
        tables.derived.push(edge.clone());
        Ok(edge)
    }

    async fn list_derived_content(&self, options: &ListDerivedContentOptions) -> Result<Vec<DerivedContent>, CoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<DerivedContent> = tables
            .derived
            .iter()
            .filter(|e| options.parent_ids.is_empty() || options.parent_ids.contains(&e.parent_id))
            .filter(|e| options.derivation_types.is_empty() || options.derivation_types.contains(&e.derivation_type))
            .filter(|e| options.variants.is_empty() || options.variants.contains(&e.variant))
            .filter(|e| {
                options.type_variant_pairs.is_empty()
                    || options
                        .type_variant_pairs
                        .iter()
                        .any(|(t, v)| t == &e.derivation_type && v == &e.variant)
            })
            .filter(|e| {
                options
                    .status
                    .map_or(true, |s| tables.contents.get(&e.content_id).map(|c| c.status) == Some(s))
            })
            .filter(|e| options.created_after.map_or(true, |after| e.created_at >= after))
            .filter(|e| options.created_before.map_or(true, |before| e.created_at <= before))
            .cloned()
            .collect();

        match options.sort {
            Sort::CreatedAtDesc => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            Sort::CreatedAtAsc => rows.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }

        let offset = options.offset.unwrap_or(0).max(0) as usize;
        let rows = rows.into_iter().skip(offset);
        Ok(match options.limit {
            Some(limit) => rows.take(limit.max(0) as usize).collect(),
            None => rows.collect(),
        })
    }

    async fn get_derived_relationship_by_content_id(&self, child_id: Uuid) -> Result<Option<DerivedContent>, CoreError> {
        let tables = self.tables.read().await;
        Ok(tables.derived.iter().find(|e| e.content_id == child_id).cloned())
    }

    async fn create_object(&self, object: Object) -> Result<Object, CoreError> {
        let mut tables = self.tables.write().await;
        tables.objects.insert(object.id, object.clone());
        Ok(object)
    }

    async fn get_object(&self, id: Uuid) -> Result<Object, CoreError> {
        let tables = self.tables.read().await;
        tables
            .objects
            .get(&id)
            .filter(|o| o.deleted_at.is_none())
            .cloned()
            .ok_or(CoreError::ObjectNotFound(id))
    }

    async fn update_object(&self, mut object: Object) -> Result<Object, CoreError> {
        object.updated_at = Utc::now();
        let mut tables = self.tables.write().await;
        tables.objects.insert(object.id, object.clone());
        Ok(object)
    }

    async fn delete_object(&self, id: Uuid) -> Result<(), CoreError> {
        let mut tables = self.tables.write().await;
        let object = tables.objects.get_mut(&id).ok_or(CoreError::ObjectNotFound(id))?;
        object.deleted_at = Some(Utc::now());
        object.updated_at = Utc::now();
        Ok(())
    }

    async fn get_objects_by_content_id(&self, content_id: Uuid) -> Result<Vec<Object>, CoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Object> = tables
            .objects
            .values()
            .filter(|o| o.content_id == content_id && o.deleted_at.is_none())
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.version.cmp(&a.version).then_with(|| b.created_at.cmp(&a.created_at)));
        Ok(rows)
    }

    async fn get_object_by_key_and_backend(&self, backend_name: &str, object_key: &str) -> Result<Option<Object>, CoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .objects
            .values()
            .find(|o| o.deleted_at.is_none() && o.storage_backend_name == backend_name && o.object_key == object_key)
            .cloned())
    }

    async fn get_objects_by_status(&self, status: ObjectStatus) -> Result<Vec<Object>, CoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .objects
            .values()
            .filter(|o| o.deleted_at.is_none() && o.status == status)
            .cloned()
            .collect())
    }

    async fn set_object_metadata(&self, object_id: Uuid, metadata: ObjectMetadata) -> Result<(), CoreError> {
        let mut tables = self.tables.write().await;
        tables.object_metadata.insert(object_id, metadata);
        Ok(())
    }

    async fn get_object_metadata(&self, object_id: Uuid) -> Result<Option<ObjectMetadata>, CoreError> {
        let tables = self.tables.read().await;
        Ok(tables.object_metadata.get(&object_id).cloned())
    }

    async fn get_contents_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Content>, CoreError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.contents.get(id).filter(|c| c.deleted_at.is_none()).map(|c| (*id, c.clone())))
            .collect())
    }

    async fn get_content_metadata_by_content_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ContentMetadata>, CoreError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.content_metadata.get(id).map(|m| (*id, m.clone())))
            .collect())
    }

    async fn get_objects_by_content_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Object>>, CoreError> {
        let tables = self.tables.read().await;
        let mut out: HashMap<Uuid, Vec<Object>> = HashMap::new();
        for object in tables.objects.values().filter(|o| o.deleted_at.is_none()) {
            if ids.contains(&object.content_id) {
                out.entry(object.content_id).or_default().push(object.clone());
            }
        }
        for objects in out.values_mut() {
            objects.sort_by(|a, b| b.version.cmp(&a.version).then_with(|| b.created_at.cmp(&a.created_at)));
        }
        Ok(out)
    }

    async fn get_object_metadata_by_object_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ObjectMetadata>, CoreError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.object_metadata.get(id).map(|m| (*id, m.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectStatus;

    fn new_content(status: ContentStatus) -> Content {
        let now = Utc::now();
        Content {
            id: Uuid::new_v4(),
            tenant_id: "t".into(),
            owner_id: "o".into(),
            owner_type: None,
            name: "n".into(),
            description: None,
            document_type: "text/plain".into(),
            derivation_type: String::new(),
            status,
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let repo = MemoryRepository::new();
        let content = new_content(ContentStatus::Created);
        let id = content.id;
        repo.create_content(content).await.unwrap();
        let fetched = repo.get_content(id).await.unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.created_at, fetched.updated_at);
    }

    #[tokio::test]
    async fn delete_is_soft_and_excluded_from_get_and_list() {
        let repo = MemoryRepository::new();
        let content = new_content(ContentStatus::Uploaded);
        let id = content.id;
        repo.create_content(content).await.unwrap();
        repo.delete_content(id).await.unwrap();
        assert!(matches!(repo.get_content(id).await, Err(CoreError::ContentNotFound(_))));
        let listed = repo.list_content(&ListContentOptions::default()).await.unwrap();
        assert!(listed.iter().all(|c| c.id != id));
        let listed_incl = repo
            .list_content(&ListContentOptions::default().with_include_deleted(true))
            .await
            .unwrap();
        assert!(listed_incl.iter().any(|c| c.id == id));
    }

    #[tokio::test]
    async fn objects_ordered_version_desc_then_created_desc() {
        let repo = MemoryRepository::new();
        let content = new_content(ContentStatus::Uploaded);
        let content_id = content.id;
        repo.create_content(content).await.unwrap();

        for version in 1..=3 {
            let now = Utc::now();
            let object = Object {
                id: Uuid::new_v4(),
                content_id,
                storage_backend_name: "mem".into(),
                object_key: format!("k{version}"),
                version,
                status: ObjectStatus::Uploaded,
                file_name: None,
                object_type: None,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            repo.create_object(object).await.unwrap();
        }

        let objects = repo.get_objects_by_content_id(content_id).await.unwrap();
        assert_eq!(objects.len(), 3);
        assert_eq!(objects[0].version, 3);
        assert_eq!(objects[2].version, 1);
    }
}
