//! Postgres-backed [`super::Repository`].
//!
//! Mirrors the reference in-memory semantics: soft-delete via `deleted_at`, `ListContent`
//! newest-first, `GetObjectsByContentID` ordered by `version DESC, created_at DESC`.

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::{debug_span, Instrument};
use uuid::Uuid;

use super::Repository;
use crate::error::CoreError;
use crate::model::{Content, ContentMetadata, ContentStatus, DerivedContent, Object, ObjectMetadata, ObjectStatus};
use crate::options::{ListContentOptions, ListDerivedContentOptions, Sort};

pub struct PostgresRepository {
    pool: PgPool,
}

impl Debug for PostgresRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresRepository").finish()
    }
}

impl PostgresRepository {
    pub async fn connect(database_url: &str) -> Result<Self, CoreError> {
        let pool = crate::log_err!(PgPool::connect(database_url).await.map_err(|e| CoreError::Internal(e.into())));

        tracing::info!("starting repository migration");
        crate::log_err!(sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| CoreError::Internal(e.into())));
        tracing::info!("finished repository migration");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_content(row: &sqlx::postgres::PgRow) -> Result<Content, CoreError> {
    let status_str: String = row.try_get("status").map_err(|e| CoreError::Internal(e.into()))?;
    Ok(Content {
        id: row.try_get("id").map_err(|e| CoreError::Internal(e.into()))?,
        tenant_id: row.try_get("tenant_id").map_err(|e| CoreError::Internal(e.into()))?,
        owner_id: row.try_get("owner_id").map_err(|e| CoreError::Internal(e.into()))?,
        owner_type: row.try_get("owner_type").map_err(|e| CoreError::Internal(e.into()))?,
        name: row.try_get("name").map_err(|e| CoreError::Internal(e.into()))?,
        description: row.try_get("description").map_err(|e| CoreError::Internal(e.into()))?,
        document_type: row.try_get("document_type").map_err(|e| CoreError::Internal(e.into()))?,
        derivation_type: row.try_get("derivation_type").map_err(|e| CoreError::Internal(e.into()))?,
        status: ContentStatus::parse(&status_str)?,
        version: row.try_get("version").map_err(|e| CoreError::Internal(e.into()))?,
        created_at: row.try_get("created_at").map_err(|e| CoreError::Internal(e.into()))?,
        updated_at: row.try_get("updated_at").map_err(|e| CoreError::Internal(e.into()))?,
        deleted_at: row.try_get("deleted_at").map_err(|e| CoreError::Internal(e.into()))?,
    })
}

fn row_to_object(row: &sqlx::postgres::PgRow) -> Result<Object, CoreError> {
    let status_str: String = row.try_get("status").map_err(|e| CoreError::Internal(e.into()))?;
    Ok(Object {
        id: row.try_get("id").map_err(|e| CoreError::Internal(e.into()))?,
        content_id: row.try_get("content_id").map_err(|e| CoreError::Internal(e.into()))?,
        storage_backend_name: row.try_get("storage_backend_name").map_err(|e| CoreError::Internal(e.into()))?,
        object_key: row.try_get("object_key").map_err(|e| CoreError::Internal(e.into()))?,
        version: row.try_get("version").map_err(|e| CoreError::Internal(e.into()))?,
        status: ObjectStatus::parse(&status_str)?,
        file_name: row.try_get("file_name").map_err(|e| CoreError::Internal(e.into()))?,
        object_type: row.try_get("object_type").map_err(|e| CoreError::Internal(e.into()))?,
        created_at: row.try_get("created_at").map_err(|e| CoreError::Internal(e.into()))?,
        updated_at: row.try_get("updated_at").map_err(|e| CoreError::Internal(e.into()))?,
        deleted_at: row.try_get("deleted_at").map_err(|e| CoreError::Internal(e.into()))?,
    })
}

fn row_to_content_metadata(row: &sqlx::postgres::PgRow) -> Result<ContentMetadata, CoreError> {
    let metadata_json: serde_json::Value = row.try_get("metadata").map_err(|e| CoreError::Internal(e.into()))?;
    Ok(ContentMetadata {
        file_name: row.try_get("file_name").map_err(|e| CoreError::Internal(e.into()))?,
        file_size: row.try_get("file_size").map_err(|e| CoreError::Internal(e.into()))?,
        mime_type: row.try_get("mime_type").map_err(|e| CoreError::Internal(e.into()))?,
        tags: row.try_get("tags").map_err(|e| CoreError::Internal(e.into()))?,
        checksum: row.try_get("checksum").map_err(|e| CoreError::Internal(e.into()))?,
        checksum_algorithm: row.try_get("checksum_algorithm").map_err(|e| CoreError::Internal(e.into()))?,
        metadata: serde_json::from_value(metadata_json).unwrap_or_default(),
    })
}

fn row_to_object_metadata(row: &sqlx::postgres::PgRow) -> Result<ObjectMetadata, CoreError> {
    let metadata_json: serde_json::Value = row.try_get("metadata").map_err(|e| CoreError::Internal(e.into()))?;
    Ok(ObjectMetadata {
        size_bytes: row.try_get("size_bytes").map_err(|e| CoreError::Internal(e.into()))?,
        mime_type: row.try_get("mime_type").map_err(|e| CoreError::Internal(e.into()))?,
        etag: row.try_get("etag").map_err(|e| CoreError::Internal(e.into()))?,
        metadata: serde_json::from_value(metadata_json).unwrap_or_default(),
    })
}

fn row_to_derived(row: &sqlx::postgres::PgRow) -> Result<DerivedContent, CoreError> {
    let params: serde_json::Value = row.try_get("derivation_params").map_err(|e| CoreError::Internal(e.into()))?;
    let processing: serde_json::Value = row.try_get("processing_metadata").map_err(|e| CoreError::Internal(e.into()))?;
    Ok(DerivedContent {
        parent_id: row.try_get("parent_id").map_err(|e| CoreError::Internal(e.into()))?,
        content_id: row.try_get("content_id").map_err(|e| CoreError::Internal(e.into()))?,
        derivation_type: row.try_get("derivation_type").map_err(|e| CoreError::Internal(e.into()))?,
        variant: row.try_get("variant").map_err(|e| CoreError::Internal(e.into()))?,
        derivation_params: serde_json::from_value(params).unwrap_or_default(),
        processing_metadata: serde_json::from_value(processing).unwrap_or_default(),
        created_at: row.try_get("created_at").map_err(|e| CoreError::Internal(e.into()))?,
    })
}

#[async_trait]
impl Repository for PostgresRepository {
    #[tracing::instrument(level = "debug", skip(self, content))]
    async fn create_content(&self, content: Content) -> Result<Content, CoreError> {
        sqlx::query(
            "INSERT INTO content (id, tenant_id, owner_id, owner_type, name, description, document_type, \
             derivation_type, status, version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(content.id)
        .bind(&content.tenant_id)
        .bind(&content.owner_id)
        .bind(&content.owner_type)
        .bind(&content.name)
        .bind(&content.description)
        .bind(&content.document_type)
        .bind(&content.derivation_type)
        .bind(content.status.as_str())
        .bind(content.version)
        .bind(content.created_at)
        .bind(content.updated_at)
        .execute(&self.pool)
        .instrument(debug_span!("db_insert_content"))
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(content)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_content(&self, id: Uuid) -> Result<Content, CoreError> {
        let row = sqlx::query("SELECT * FROM content WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(debug_span!("db_select_content"))
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        match row {
            Some(row) => row_to_content(&row),
            None => Err(CoreError::ContentNotFound(id)),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, content))]
    async fn update_content(&self, mut content: Content) -> Result<Content, CoreError> {
        content.updated_at = chrono::Utc::now();
        sqlx::query(
            "UPDATE content SET name = $2, description = $3, document_type = $4, status = $5, \
             version = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(content.id)
        .bind(&content.name)
        .bind(&content.description)
        .bind(&content.document_type)
        .bind(content.status.as_str())
        .bind(content.version)
        .bind(content.updated_at)
        .execute(&self.pool)
        .instrument(debug_span!("db_update_content"))
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(content)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn delete_content(&self, id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("UPDATE content SET deleted_at = now(), updated_at = now() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .instrument(debug_span!("db_soft_delete_content"))
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ContentNotFound(id));
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, options))]
    async fn list_content(&self, options: &ListContentOptions) -> Result<Vec<Content>, CoreError> {
        let rows = sqlx::query(
            "SELECT * FROM content \
             WHERE ($1::text IS NULL OR owner_id = $1) \
             AND ($2::text IS NULL OR tenant_id = $2) \
             AND ($3 OR deleted_at IS NULL) \
             ORDER BY created_at DESC",
        )
        .bind(&options.owner_id)
        .bind(&options.tenant_id)
        .bind(options.include_deleted)
        .fetch_all(&self.pool)
        .instrument(debug_span!("db_list_content"))
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

        rows.iter().map(row_to_content).collect()
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_content_by_status(&self, status: ContentStatus) -> Result<Vec<Content>, CoreError> {
        let rows = sqlx::query("SELECT * FROM content WHERE status = $1 AND deleted_at IS NULL")
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .instrument(debug_span!("db_content_by_status"))
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        rows.iter().map(row_to_content).collect()
    }

    #[tracing::instrument(level = "debug", skip(self, metadata))]
    async fn set_content_metadata(&self, content_id: Uuid, metadata: ContentMetadata) -> Result<(), CoreError> {
        let metadata_json = serde_json::to_value(&metadata.metadata).map_err(|e| CoreError::Internal(e.into()))?;
        sqlx::query(
            "INSERT INTO content_metadata (content_id, file_name, file_size, mime_type, tags, checksum, \
             checksum_algorithm, metadata) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (content_id) DO UPDATE SET file_name = $2, file_size = $3, mime_type = $4, \
             tags = $5, checksum = $6, checksum_algorithm = $7, metadata = $8",
        )
        .bind(content_id)
        .bind(&metadata.file_name)
        .bind(metadata.file_size)
        .bind(&metadata.mime_type)
        .bind(&metadata.tags)
        .bind(&metadata.checksum)
        .bind(&metadata.checksum_algorithm)
        .bind(metadata_json)
        .execute(&self.pool)
        .instrument(debug_span!("db_upsert_content_metadata"))
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_content_metadata(&self, content_id: Uuid) -> Result<Option<ContentMetadata>, CoreError> {
        let row = sqlx::query("SELECT * FROM content_metadata WHERE content_id = $1")
            .bind(content_id)
            .fetch_optional(&self.pool)
            .instrument(debug_span!("db_select_content_metadata"))
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        row.as_ref().map(row_to_content_metadata).transpose()
    }

    #[tracing::instrument(level = "debug", skip(self, edge))]
    async fn create_derived_content_relationship(&self, edge: DerivedContent) -> Result<DerivedContent, CoreError> {
        let params = serde_json::to_value(&edge.derivation_params).map_err(|e| CoreError::Internal(e.into()))?;
        let processing = serde_json::to_value(&edge.processing_metadata).map_err(|e| CoreError::Internal(e.into()))?;
        sqlx::query(
            "INSERT INTO content_derived (parent_id, content_id, derivation_type, variant, \
             derivation_params, processing_metadata, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(edge.parent_id)
        .bind(edge.content_id)
        .bind(&edge.derivation_type)
        .bind(&edge.variant)
        .bind(params)
        .bind(processing)
        .bind(edge.created_at)
        .execute(&self.pool)
        .instrument(debug_span!("db_insert_derived_edge"))
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(edge)
    }

    #[tracing::instrument(level = "debug", skip(self, options))]
    async fn list_derived_content(&self, options: &ListDerivedContentOptions) -> Result<Vec<DerivedContent>, CoreError> {
        let order = match options.sort {
            Sort::CreatedAtDesc => "d.created_at DESC",
            Sort::CreatedAtAsc => "d.created_at ASC",
        };
        let sql = format!(
            "SELECT d.* FROM content_derived d \
             JOIN content c ON c.id = d.content_id \
             WHERE ($1::uuid[] IS NULL OR d.parent_id = ANY($1)) \
             AND ($2::text[] IS NULL OR d.derivation_type = ANY($2)) \
             AND ($3::text[] IS NULL OR d.variant = ANY($3)) \
             AND ($4::text IS NULL OR c.status = $4) \
             AND ($5::timestamptz IS NULL OR d.created_at >= $5) \
             AND ($6::timestamptz IS NULL OR d.created_at <= $6) \
             ORDER BY {order} \
             LIMIT $7 OFFSET $8"
        );

        let parent_ids = (!options.parent_ids.is_empty()).then(|| options.parent_ids.clone());
        let derivation_types = (!options.derivation_types.is_empty()).then(|| options.derivation_types.clone());
        let variants = (!options.variants.is_empty()).then(|| options.variants.clone());

        let rows = sqlx::query(&sql)
            .bind(parent_ids)
            .bind(derivation_types)
            .bind(variants)
            .bind(options.status.map(|s| s.as_str()))
            .bind(options.created_after)
            .bind(options.created_before)
            .bind(options.limit.unwrap_or(i64::MAX))
            .bind(options.offset.unwrap_or(0))
            .fetch_all(&self.pool)
            .instrument(debug_span!("db_list_derived_content"))
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        let mut edges: Vec<DerivedContent> = rows.iter().map(row_to_derived).collect::<Result<_, _>>()?;
        if !options.type_variant_pairs.is_empty() {
            edges.retain(|e| {
                options
                    .type_variant_pairs
                    .iter()
                    .any(|(t, v)| t == &e.derivation_type && v == &e.variant)
            });
        }
        Ok(edges)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_derived_relationship_by_content_id(&self, child_id: Uuid) -> Result<Option<DerivedContent>, CoreError> {
        let row = sqlx::query("SELECT * FROM content_derived WHERE content_id = $1")
            .bind(child_id)
            .fetch_optional(&self.pool)
            .instrument(debug_span!("db_select_derived_edge"))
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        row.as_ref().map(row_to_derived).transpose()
    }

    #[tracing::instrument(level = "debug", skip(self, object))]
    async fn create_object(&self, object: Object) -> Result<Object, CoreError> {
        sqlx::query(
            "INSERT INTO object (id, content_id, storage_backend_name, object_key, version, status, \
             file_name, object_type, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(object.id)
        .bind(object.content_id)
        .bind(&object.storage_backend_name)
        .bind(&object.object_key)
        .bind(object.version)
        .bind(object.status.as_str())
        .bind(&object.file_name)
        .bind(&object.object_type)
        .bind(object.created_at)
        .bind(object.updated_at)
        .execute(&self.pool)
        .instrument(debug_span!("db_insert_object"))
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(object)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_object(&self, id: Uuid) -> Result<Object, CoreError> {
        let row = sqlx::query("SELECT * FROM object WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(debug_span!("db_select_object"))
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        match row {
            Some(row) => row_to_object(&row),
            None => Err(CoreError::ObjectNotFound(id)),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, object))]
    async fn update_object(&self, mut object: Object) -> Result<Object, CoreError> {
        object.updated_at = chrono::Utc::now();
        sqlx::query("UPDATE object SET status = $2, file_name = $3, object_type = $4, updated_at = $5 WHERE id = $1")
            .bind(object.id)
            .bind(object.status.as_str())
            .bind(&object.file_name)
            .bind(&object.object_type)
            .bind(object.updated_at)
            .execute(&self.pool)
            .instrument(debug_span!("db_update_object"))
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(object)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn delete_object(&self, id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("UPDATE object SET deleted_at = now(), updated_at = now() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .instrument(debug_span!("db_soft_delete_object"))
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ObjectNotFound(id));
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_objects_by_content_id(&self, content_id: Uuid) -> Result<Vec<Object>, CoreError> {
        let rows = sqlx::query(
            "SELECT * FROM object WHERE content_id = $1 AND deleted_at IS NULL ORDER BY version DESC, created_at DESC",
        )
        .bind(content_id)
        .fetch_all(&self.pool)
        .instrument(debug_span!("db_objects_by_content"))
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

        rows.iter().map(row_to_object).collect()
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_object_by_key_and_backend(&self, backend_name: &str, object_key: &str) -> Result<Option<Object>, CoreError> {
        let row = sqlx::query(
            "SELECT * FROM object WHERE storage_backend_name = $1 AND object_key = $2 AND deleted_at IS NULL",
        )
        .bind(backend_name)
        .bind(object_key)
        .fetch_optional(&self.pool)
        .instrument(debug_span!("db_object_by_key"))
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

        row.as_ref().map(row_to_object).transpose()
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_objects_by_status(&self, status: ObjectStatus) -> Result<Vec<Object>, CoreError> {
        let rows = sqlx::query("SELECT * FROM object WHERE status = $1 AND deleted_at IS NULL")
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .instrument(debug_span!("db_objects_by_status"))
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        rows.iter().map(row_to_object).collect()
    }

    #[tracing::instrument(level = "debug", skip(self, metadata))]
    async fn set_object_metadata(&self, object_id: Uuid, metadata: ObjectMetadata) -> Result<(), CoreError> {
        let metadata_json = serde_json::to_value(&metadata.metadata).map_err(|e| CoreError::Internal(e.into()))?;
        sqlx::query(
            "INSERT INTO object_metadata (object_id, size_bytes, mime_type, etag, metadata) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (object_id) DO UPDATE SET size_bytes = $2, mime_type = $3, etag = $4, metadata = $5",
        )
        .bind(object_id)
        .bind(metadata.size_bytes)
        .bind(&metadata.mime_type)
        .bind(&metadata.etag)
        .bind(metadata_json)
        .execute(&self.pool)
        .instrument(debug_span!("db_upsert_object_metadata"))
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_object_metadata(&self, object_id: Uuid) -> Result<Option<ObjectMetadata>, CoreError> {
        let row = sqlx::query("SELECT * FROM object_metadata WHERE object_id = $1")
            .bind(object_id)
            .fetch_optional(&self.pool)
            .instrument(debug_span!("db_select_object_metadata"))
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        row.as_ref().map(row_to_object_metadata).transpose()
    }

    #[tracing::instrument(level = "debug", skip(self, ids))]
    async fn get_contents_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Content>, CoreError> {
        let rows = sqlx::query("SELECT * FROM content WHERE id = ANY($1) AND deleted_at IS NULL")
            .bind(ids)
            .fetch_all(&self.pool)
            .instrument(debug_span!("db_contents_by_ids"))
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        rows.iter().map(row_to_content).map(|r| r.map(|c| (c.id, c))).collect()
    }

    #[tracing::instrument(level = "debug", skip(self, ids))]
    async fn get_content_metadata_by_content_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ContentMetadata>, CoreError> {
        let rows = sqlx::query("SELECT * FROM content_metadata WHERE content_id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .instrument(debug_span!("db_content_metadata_by_ids"))
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        rows.iter()
            .map(|row| {
                let content_id: Uuid = row.try_get("content_id").map_err(|e| CoreError::Internal(e.into()))?;
                row_to_content_metadata(row).map(|m| (content_id, m))
            })
            .collect()
    }

    #[tracing::instrument(level = "debug", skip(self, ids))]
    async fn get_objects_by_content_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Object>>, CoreError> {
        let rows = sqlx::query(
            "SELECT * FROM object WHERE content_id = ANY($1) AND deleted_at IS NULL \
             ORDER BY version DESC, created_at DESC",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .instrument(debug_span!("db_objects_by_content_ids"))
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

        let mut out: HashMap<Uuid, Vec<Object>> = HashMap::new();
        for row in &rows {
            let object = row_to_object(row)?;
            out.entry(object.content_id).or_default().push(object);
        }
        Ok(out)
    }

    #[tracing::instrument(level = "debug", skip(self, ids))]
    async fn get_object_metadata_by_object_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ObjectMetadata>, CoreError> {
        let rows = sqlx::query("SELECT * FROM object_metadata WHERE object_id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .instrument(debug_span!("db_object_metadata_by_ids"))
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        rows.iter()
            .map(|row| {
                let object_id: Uuid = row.try_get("object_id").map_err(|e| CoreError::Internal(e.into()))?;
                row_to_object_metadata(row).map(|m| (object_id, m))
            })
            .collect()
    }
}
