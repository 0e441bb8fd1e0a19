//! Core orchestration: unified upload/download/derive, details assembly, batch.
//!
//! The Service is the only caller allowed to mutate through the Repository; it owns the
//! registered [`BlobStore`]s, the key generator, the URL strategy, and the event sink.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::blobstore::{BlobReader, BlobStore, DelegatedUrlKind, UploadParams, UrlMetadata};
use crate::error::CoreError;
use crate::event_sink::{emit_best_effort, Event, EventSink};
use crate::key_generator::{KeyGenerator, KeyMetadata};
use crate::model::{infer_derivation_type, Content, ContentMetadata, ContentStatus, DerivedContent, Object, ObjectMetadata, ObjectStatus};
use crate::options::{
    ContentDetailsOptions, CreateContentRequest, CreateDerivedContentRequest, CreateObjectRequest, ListDerivedContentOptions,
    ListContentOptions, UploadContentRequest, UploadDerivedContentRequest, UploadObjectForContentRequest,
};
use crate::repository::Repository;
use crate::status::{
    can_create_derived, can_delete_content, can_download_content, can_download_object, can_upload_content, can_upload_object,
    MAX_DERIVATION_DEPTH, DEPTH_WALK_SAFETY_CAP,
};
use crate::url_strategy::UrlStrategy;

/// Default lifetime for an upload URL minted alongside `GetContentDetails`.
const DEFAULT_URL_EXPIRY_SECONDS: i64 = 1800;

/// Assembled view returned by `GetContentDetails`/`GetContentDetailsBatch`.
#[derive(Debug, Clone, Default)]
pub struct ContentDetails {
    pub id: Uuid,
    pub ready: bool,
    pub status: Option<ContentStatus>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub tags: Vec<String>,
    pub checksum: Option<String>,
    pub download_url: Option<String>,
    pub preview_url: Option<String>,
    pub upload_url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub thumbnail: Option<String>,
    pub thumbnails: HashMap<String, String>,
    pub previews: HashMap<String, String>,
    pub transcodes: HashMap<String, String>,
}

/// Enriched edge returned by `ListDerivedContent`.
#[derive(Debug, Clone)]
pub struct DerivedContentView {
    pub edge: DerivedContent,
    pub status: Option<ContentStatus>,
    pub download_url: Option<String>,
    pub preview_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub objects: Option<Vec<Object>>,
    pub metadata: Option<ContentMetadata>,
}

#[derive(Debug)]
pub struct Service {
    repository: Arc<dyn Repository>,
    backends: RwLock<HashMap<String, Arc<dyn BlobStore>>>,
    key_generator: KeyGenerator,
    url_strategy: UrlStrategy,
    event_sink: Arc<dyn EventSink>,
}

impl Service {
    pub fn new(repository: Arc<dyn Repository>, key_generator: KeyGenerator, url_strategy: UrlStrategy, event_sink: Arc<dyn EventSink>) -> Self {
        Self {
            repository,
            backends: RwLock::new(HashMap::new()),
            key_generator,
            url_strategy,
            event_sink,
        }
    }

    /// Registers a named backend. Backend registration should happen at startup only;
    /// callers that register backends after traffic begins are responsible for any
    /// raciness in backend selection.
    pub async fn register_backend(&self, backend: Arc<dyn BlobStore>) {
        let mut backends = self.backends.write().await;
        backends.insert(backend.name().to_owned(), backend);
    }

    async fn backend(&self, name: &str) -> Result<Arc<dyn BlobStore>, CoreError> {
        self.backends
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::StorageBackendNotFound(name.to_owned()))
    }

    /// Resolves `req.storage_backend_name` or, if empty, the registered backend whose name
    /// sorts first.
    async fn resolve_backend(&self, requested: &Option<String>) -> Result<Arc<dyn BlobStore>, CoreError> {
        if let Some(name) = requested {
            return self.backend(name).await;
        }
        let backends = self.backends.read().await;
        let mut names: Vec<&String> = backends.keys().collect();
        names.sort();
        let name = names
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::StorageBackendNotFound(String::new()))?;
        Ok(backends.get(name).expect("name came from this map").clone())
    }

    /// Walks `parent_id` edges up to the root, returning the number of hops (0 for an
    /// original with no parent edge). Aborts with `max_derivation_depth` past the safety
    /// cap rather than looping on an accidental cycle.
    async fn compute_depth(&self, mut content_id: Uuid) -> Result<u32, CoreError> {
        let mut depth = 0u32;
        for _ in 0..DEPTH_WALK_SAFETY_CAP {
            match self.repository.get_derived_relationship_by_content_id(content_id).await? {
                Some(edge) => {
                    depth += 1;
                    content_id = edge.parent_id;
                }
                None => return Ok(depth),
            }
        }
        Err(CoreError::MaxDerivationDepth)
    }

    /// `CreateContent(req)`: creates the row without transferring bytes; a worker or a
    /// later `UploadObjectForContent`/`PUT /upload` call attaches the Object.
    pub async fn create_content(&self, req: CreateContentRequest) -> Result<Content, CoreError> {
        let now = Utc::now();
        let content = Content {
            id: Uuid::new_v4(),
            tenant_id: req.tenant_id,
            owner_id: req.owner_id,
            owner_type: req.owner_type,
            name: req.name,
            description: req.description,
            document_type: req.document_type,
            derivation_type: String::new(),
            status: ContentStatus::Created,
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let content = self.repository.create_content(content).await?;
        emit_best_effort(self.event_sink.as_ref(), Event::ContentCreated { content_id: content.id }).await;
        Ok(content)
    }

    pub async fn get_content(&self, id: Uuid) -> Result<Content, CoreError> {
        self.repository.get_content(id).await
    }

    /// Updates descriptive fields (`name`/`description`/`document_type`); status changes go
    /// through [`Service::update_content_status`] instead.
    pub async fn update_content_fields(
        &self,
        id: Uuid,
        name: Option<String>,
        description: Option<String>,
        document_type: Option<String>,
    ) -> Result<Content, CoreError> {
        let mut content = self.repository.get_content(id).await?;
        if let Some(name) = name {
            content.name = name;
        }
        if description.is_some() {
            content.description = description;
        }
        if let Some(document_type) = document_type {
            content.document_type = document_type;
        }
        self.repository.update_content(content).await
    }

    pub async fn list_content(&self, options: &ListContentOptions) -> Result<Vec<Content>, CoreError> {
        self.repository.list_content(options).await
    }

    /// `UploadContent(req)`: atomically produces an uploaded original.
    pub async fn upload_content(&self, req: UploadContentRequest) -> Result<Content, CoreError> {
        let now = Utc::now();
        let content = Content {
            id: Uuid::new_v4(),
            tenant_id: req.tenant_id,
            owner_id: req.owner_id,
            owner_type: req.owner_type,
            name: req.name,
            description: req.description,
            document_type: req.document_type,
            derivation_type: String::new(),
            status: ContentStatus::Created,
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let content = self.repository.create_content(content).await?;
        can_upload_content(content.status)?;

        let backend = self.resolve_backend(&req.storage_backend_name).await?;
        let object_id = Uuid::new_v4();
        let key = self.key_generator.generate(
            content.id,
            object_id,
            &KeyMetadata {
                tenant_id: content.tenant_id.clone(),
                file_name: req.file_name.clone(),
                is_original: true,
                derivation_type: None,
                variant: None,
                parent_content_id: None,
                timestamp: now,
            },
        )?;

        let object = Object {
            id: object_id,
            content_id: content.id,
            storage_backend_name: backend.name().to_owned(),
            object_key: key.clone(),
            version: 1,
            status: ObjectStatus::Created,
            file_name: req.file_name.clone(),
            object_type: req.mime_type.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let object = self.repository.create_object(object).await?;

        match req.mime_type.clone() {
            Some(mime_type) => {
                backend
                    .upload_with_params(&key, req.reader, UploadParams { mime_type: Some(mime_type) })
                    .await?
            }
            None => backend.upload(&key, req.reader).await?,
        }

        let blob_meta = backend.get_object_meta(&key).await?;
        self.repository
            .set_object_metadata(
                object.id,
                ObjectMetadata {
                    size_bytes: Some(blob_meta.size_bytes as i64),
                    mime_type: blob_meta.mime_type.clone(),
                    etag: blob_meta.etag.clone(),
                    metadata: HashMap::new(),
                },
            )
            .await?;
        self.repository
            .set_content_metadata(
                content.id,
                ContentMetadata {
                    file_name: req.file_name,
                    file_size: Some(blob_meta.size_bytes as i64),
                    mime_type: blob_meta.mime_type,
                    tags: Vec::new(),
                    checksum: blob_meta.etag,
                    checksum_algorithm: None,
                    metadata: HashMap::new(),
                },
            )
            .await?;

        let mut object = object;
        object.status = ObjectStatus::Uploaded;
        self.repository.update_object(object).await?;

        let mut content = content;
        content.status = ContentStatus::Uploaded;
        let content = self.repository.update_content(content).await?;

        emit_best_effort(self.event_sink.as_ref(), Event::ContentCreated { content_id: content.id }).await;
        Ok(content)
    }

    async fn verify_parent_for_derivation(&self, parent_id: Uuid) -> Result<Content, CoreError> {
        let parent = self.repository.get_content(parent_id).await?;
        can_create_derived(parent.status)?;
        let parent_depth = self.compute_depth(parent_id).await?;
        if parent_depth + 1 > MAX_DERIVATION_DEPTH {
            return Err(CoreError::MaxDerivationDepth);
        }
        Ok(parent)
    }

    fn resolve_derivation_type(explicit: Option<String>, variant: &str) -> String {
        explicit.unwrap_or_else(|| infer_derivation_type(variant)).to_ascii_lowercase()
    }

    /// `UploadDerivedContent(req)`.
    pub async fn upload_derived_content(&self, req: UploadDerivedContentRequest) -> Result<Content, CoreError> {
        self.verify_parent_for_derivation(req.parent_id).await?;
        let derivation_type = Self::resolve_derivation_type(req.derivation_type, &req.variant);

        let now = Utc::now();
        let child = Content {
            id: Uuid::new_v4(),
            tenant_id: req.tenant_id,
            owner_id: req.owner_id,
            owner_type: None,
            name: req.name,
            description: req.description,
            document_type: req.document_type,
            derivation_type: derivation_type.clone(),
            status: ContentStatus::Created,
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let child = self.repository.create_content(child).await?;

        self.repository
            .create_derived_content_relationship(DerivedContent {
                parent_id: req.parent_id,
                content_id: child.id,
                derivation_type: derivation_type.clone(),
                variant: req.variant.clone(),
                derivation_params: req.derivation_params,
                processing_metadata: HashMap::new(),
                created_at: now,
            })
            .await?;

        let backend = self.resolve_backend(&req.storage_backend_name).await?;
        let object_id = Uuid::new_v4();
        let key = self.key_generator.generate(
            child.id,
            object_id,
            &KeyMetadata {
                tenant_id: child.tenant_id.clone(),
                file_name: req.file_name.clone(),
                is_original: false,
                derivation_type: Some(derivation_type),
                variant: Some(req.variant),
                parent_content_id: Some(req.parent_id),
                timestamp: now,
            },
        )?;

        let object = Object {
            id: object_id,
            content_id: child.id,
            storage_backend_name: backend.name().to_owned(),
            object_key: key.clone(),
            version: 1,
            status: ObjectStatus::Created,
            file_name: req.file_name,
            object_type: req.mime_type.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let object = self.repository.create_object(object).await?;

        match req.mime_type {
            Some(mime_type) => {
                backend
                    .upload_with_params(&key, req.reader, UploadParams { mime_type: Some(mime_type) })
                    .await?
            }
            None => backend.upload(&key, req.reader).await?,
        }

        let blob_meta = backend.get_object_meta(&key).await?;
        self.repository
            .set_object_metadata(
                object.id,
                ObjectMetadata {
                    size_bytes: Some(blob_meta.size_bytes as i64),
                    mime_type: blob_meta.mime_type.clone(),
                    etag: blob_meta.etag,
                    metadata: HashMap::new(),
                },
            )
            .await?;

        let mut object = object;
        object.status = ObjectStatus::Uploaded;
        self.repository.update_object(object).await?;

        let mut child = child;
        child.status = ContentStatus::Processed;
        let child = self.repository.update_content(child).await?;

        emit_best_effort(self.event_sink.as_ref(), Event::ContentCreated { content_id: child.id }).await;
        Ok(child)
    }

    /// `CreateDerivedContent(req)`: same preamble, no bytes transferred.
    pub async fn create_derived_content(&self, req: CreateDerivedContentRequest) -> Result<Content, CoreError> {
        self.verify_parent_for_derivation(req.parent_id).await?;
        let derivation_type = Self::resolve_derivation_type(req.derivation_type, &req.variant);
        let initial_status = req.initial_status.unwrap_or(ContentStatus::Created);

        let now = Utc::now();
        let child = Content {
            id: Uuid::new_v4(),
            tenant_id: req.tenant_id,
            owner_id: req.owner_id,
            owner_type: None,
            name: req.name,
            description: req.description,
            document_type: req.document_type,
            derivation_type: derivation_type.clone(),
            status: initial_status,
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let child = self.repository.create_content(child).await?;

        self.repository
            .create_derived_content_relationship(DerivedContent {
                parent_id: req.parent_id,
                content_id: child.id,
                derivation_type,
                variant: req.variant,
                derivation_params: req.derivation_params,
                processing_metadata: HashMap::new(),
                created_at: now,
            })
            .await?;

        emit_best_effort(self.event_sink.as_ref(), Event::ContentCreated { content_id: child.id }).await;
        Ok(child)
    }

    /// `UploadObjectForContent(req)`: async-workflow attach point.
    pub async fn upload_object_for_content(&self, req: UploadObjectForContentRequest) -> Result<Object, CoreError> {
        let content = self.repository.get_content(req.content_id).await?;

        let backend = self.resolve_backend(&req.storage_backend_name).await?;
        let now = Utc::now();
        let object_id = Uuid::new_v4();
        let key = self.key_generator.generate(
            content.id,
            object_id,
            &KeyMetadata {
                tenant_id: content.tenant_id.clone(),
                file_name: req.file_name.clone(),
                is_original: !content.is_derived(),
                derivation_type: if content.is_derived() { Some(content.derivation_type.clone()) } else { None },
                variant: None,
                parent_content_id: None,
                timestamp: now,
            },
        )?;

        let object = Object {
            id: object_id,
            content_id: content.id,
            storage_backend_name: backend.name().to_owned(),
            object_key: key.clone(),
            version: req.version,
            status: ObjectStatus::Created,
            file_name: req.file_name,
            object_type: req.mime_type.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let object = self.repository.create_object(object).await?;

        match req.mime_type {
            Some(mime_type) => {
                backend
                    .upload_with_params(&key, req.reader, UploadParams { mime_type: Some(mime_type) })
                    .await?
            }
            None => backend.upload(&key, req.reader).await?,
        }

        let blob_meta = backend.get_object_meta(&key).await?;
        self.repository
            .set_object_metadata(
                object.id,
                ObjectMetadata {
                    size_bytes: Some(blob_meta.size_bytes as i64),
                    mime_type: blob_meta.mime_type,
                    etag: blob_meta.etag,
                    metadata: HashMap::new(),
                },
            )
            .await?;

        let mut object = object;
        object.status = ObjectStatus::Uploaded;
        let object = self.repository.update_object(object).await?;

        if !content.is_derived() {
            let mut content = content;
            content.status = ContentStatus::Uploaded;
            self.repository.update_content(content).await?;
        }

        Ok(object)
    }

    /// `CreateObject`: object-focused advanced API, allocates an Object row with no bytes transferred
    /// yet; a later `POST /api/v1/objects/{id}/upload` attaches the data.
    pub async fn create_object(&self, req: CreateObjectRequest) -> Result<Object, CoreError> {
        let content = self.repository.get_content(req.content_id).await?;
        let backend = self.resolve_backend(&req.storage_backend_name).await?;
        let now = Utc::now();
        let object_id = Uuid::new_v4();
        let key = self.key_generator.generate(
            content.id,
            object_id,
            &KeyMetadata {
                tenant_id: content.tenant_id.clone(),
                file_name: req.file_name.clone(),
                is_original: !content.is_derived(),
                derivation_type: if content.is_derived() { Some(content.derivation_type.clone()) } else { None },
                variant: None,
                parent_content_id: None,
                timestamp: now,
            },
        )?;

        let object = Object {
            id: object_id,
            content_id: content.id,
            storage_backend_name: backend.name().to_owned(),
            object_key: key,
            version: req.version,
            status: ObjectStatus::Created,
            file_name: req.file_name,
            object_type: req.mime_type,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.repository.create_object(object).await
    }

    /// `POST /api/v1/objects/{id}/upload`: attaches bytes to an already-created
    /// Object row. Mirrors the tail of [`Service::upload_content`] but keyed by object id
    /// rather than minting a fresh one; advances the parent Content to `uploaded` only when
    /// it is an original (derived content advances explicitly via `UpdateContentStatus`).
    pub async fn upload_to_object(&self, object_id: Uuid, reader: BlobReader, mime_type: Option<String>) -> Result<Object, CoreError> {
        let object = self.repository.get_object(object_id).await?;
        can_upload_object(object.status)?;
        let backend = self.backend(&object.storage_backend_name).await?;

        match mime_type {
            Some(mime_type) => {
                backend
                    .upload_with_params(&object.object_key, reader, UploadParams { mime_type: Some(mime_type) })
                    .await?
            }
            None => backend.upload(&object.object_key, reader).await?,
        }

        let blob_meta = backend.get_object_meta(&object.object_key).await?;
        self.repository
            .set_object_metadata(
                object.id,
                ObjectMetadata {
                    size_bytes: Some(blob_meta.size_bytes as i64),
                    mime_type: blob_meta.mime_type,
                    etag: blob_meta.etag,
                    metadata: HashMap::new(),
                },
            )
            .await?;

        let mut object = object;
        object.status = ObjectStatus::Uploaded;
        let object = self.repository.update_object(object).await?;

        let content = self.repository.get_content(object.content_id).await?;
        if !content.is_derived() {
            let mut content = content;
            content.status = ContentStatus::Uploaded;
            self.repository.update_content(content).await?;
        }

        Ok(object)
    }

    /// `DownloadContent(id)`.
    pub async fn download_content(&self, id: Uuid) -> Result<BlobReader, CoreError> {
        let content = self.repository.get_content(id).await?;
        can_download_content(content.status)?;

        let objects = self.repository.get_objects_by_content_id(id).await?;
        let object = objects
            .into_iter()
            .find(|o| o.status == ObjectStatus::Uploaded)
            .ok_or(CoreError::ObjectNotReady)?;

        let backend = self.backend(&object.storage_backend_name).await?;
        backend.download(&object.object_key).await
    }

    /// Object-focused counterpart to [`Service::download_content`].
    pub async fn download_object(&self, id: Uuid) -> Result<BlobReader, CoreError> {
        let object = self.repository.get_object(id).await?;
        can_download_object(object.status)?;
        let backend = self.backend(&object.storage_backend_name).await?;
        backend.download(&object.object_key).await
    }

    /// Object-focused delegated URL.
    pub async fn get_object_delegated_url(&self, id: Uuid, kind: DelegatedUrlKind) -> Result<String, CoreError> {
        let object = self.repository.get_object(id).await?;
        let backend = self.backend(&object.storage_backend_name).await?;
        let url_meta = UrlMetadata {
            file_name: object.file_name.clone(),
            version: Some(object.version),
            content_type: object.object_type.clone(),
        };
        self.url_strategy
            .url_for(kind, object.content_id, &backend, &object.object_key, &url_meta)
            .await
    }

    /// `UpdateContentStatus`.
    pub async fn update_content_status(&self, id: Uuid, new_status: ContentStatus) -> Result<Content, CoreError> {
        if !new_status.is_valid() {
            return Err(CoreError::InvalidContentStatus(new_status.as_str().to_owned()));
        }
        let mut content = self.repository.get_content(id).await?;
        let old = content.status;
        content.status = new_status;
        let content = self.repository.update_content(content).await?;
        emit_best_effort(
            self.event_sink.as_ref(),
            Event::ContentStatusChanged { content_id: id, old, new: new_status },
        )
        .await;
        Ok(content)
    }

    /// `UpdateObjectStatus`.
    pub async fn update_object_status(&self, id: Uuid, new_status: ObjectStatus) -> Result<Object, CoreError> {
        if !new_status.is_valid() {
            return Err(CoreError::InvalidObjectStatus(new_status.as_str().to_owned()));
        }
        let mut object = self.repository.get_object(id).await?;
        let old = object.status;
        object.status = new_status;
        let object = self.repository.update_object(object).await?;
        emit_best_effort(
            self.event_sink.as_ref(),
            Event::ObjectStatusChanged { object_id: id, old, new: new_status },
        )
        .await;
        Ok(object)
    }

    /// `DeleteContent` with `canDeleteContent` precondition.
    pub async fn delete_content(&self, id: Uuid, force: bool) -> Result<(), CoreError> {
        let content = self.repository.get_content(id).await?;
        can_delete_content(content.status, force)?;
        self.repository.delete_content(id).await
    }

    fn variant_suffix(variant: &str) -> String {
        match variant.rsplit_once('_') {
            Some((_, suffix)) => suffix.to_owned(),
            None => variant.to_owned(),
        }
    }

    /// `GetContentDetails(id, opts…)`.
    pub async fn get_content_details(&self, id: Uuid, opts: &ContentDetailsOptions) -> Result<ContentDetails, CoreError> {
        let content = self.repository.get_content(id).await?;
        let metadata = self.repository.get_content_metadata(id).await?;
        let objects = self.repository.get_objects_by_content_id(id).await?;
        let object_metadata = match objects.first() {
            Some(primary) => self.repository.get_object_metadata(primary.id).await?,
            None => None,
        };
        let children = self
            .repository
            .list_derived_content(&ListDerivedContentOptions::default().with_parent_id(id))
            .await?;

        self.assemble_details(content, metadata, objects, object_metadata, children, opts).await
    }

    async fn assemble_details(
        &self,
        content: Content,
        metadata: Option<ContentMetadata>,
        objects: Vec<Object>,
        object_metadata: Option<ObjectMetadata>,
        children: Vec<DerivedContent>,
        opts: &ContentDetailsOptions,
    ) -> Result<ContentDetails, CoreError> {
        let ready = content.is_ready();
        let mut details = ContentDetails {
            id: content.id,
            ready,
            status: Some(content.status),
            ..Default::default()
        };
        if let Some(metadata) = metadata {
            details.file_name = metadata.file_name;
            details.file_size = metadata.file_size;
            details.mime_type = metadata.mime_type;
            details.tags = metadata.tags;
            details.checksum = metadata.checksum;
        }
        if let Some(object_metadata) = object_metadata {
            details.file_size = details.file_size.or(object_metadata.size_bytes);
            details.mime_type = details.mime_type.or(object_metadata.mime_type);
        }

        // Primary object is the repository's first (highest version, newest) entry.
        if let Some(primary) = objects.first() {
            if let Ok(backend) = self.backend(&primary.storage_backend_name).await {
                let url_meta = UrlMetadata {
                    file_name: primary.file_name.clone(),
                    version: Some(primary.version),
                    content_type: primary.object_type.clone(),
                };
                if content.status == ContentStatus::Uploaded {
                    if let Ok(url) = self
                        .url_strategy
                        .url_for(DelegatedUrlKind::Download, content.id, &backend, &primary.object_key, &url_meta)
                        .await
                    {
                        details.download_url = Some(url);
                    }
                }
                if let Ok(url) = self
                    .url_strategy
                    .url_for(DelegatedUrlKind::Preview, content.id, &backend, &primary.object_key, &url_meta)
                    .await
                {
                    details.preview_url = Some(url);
                }
            }
        }

        if opts.with_upload_access && details.file_size.is_none() {
            let url = match objects.first() {
                Some(primary) => match self.backend(&primary.storage_backend_name).await {
                    Ok(backend) => {
                        let url_meta = UrlMetadata {
                            file_name: primary.file_name.clone(),
                            version: Some(primary.version),
                            content_type: primary.object_type.clone(),
                        };
                        self.url_strategy
                            .url_for(DelegatedUrlKind::Upload, content.id, &backend, &primary.object_key, &url_meta)
                            .await
                            .ok()
                    }
                    Err(_) => None,
                },
                None => Some(self.url_strategy.content_url(DelegatedUrlKind::Upload, content.id)),
            };
            if let Some(url) = url {
                details.upload_url = Some(url);
                let ttl = opts.url_expiry_seconds.unwrap_or(DEFAULT_URL_EXPIRY_SECONDS);
                details.expires_at = Some(Utc::now() + Duration::seconds(ttl));
            }
        }

        for edge in &children {
            let child = match self.repository.get_content(edge.content_id).await {
                Ok(child) => child,
                Err(e) => {
                    crate::error::log(&e);
                    continue;
                }
            };
            if child.status != ContentStatus::Processed {
                continue;
            }

            let child_objects = self.repository.get_objects_by_content_id(child.id).await.unwrap_or_default();
            let Some(primary) = child_objects.first() else { continue };
            let Ok(backend) = self.backend(&primary.storage_backend_name).await else { continue };
            let url_meta = UrlMetadata {
                file_name: primary.file_name.clone(),
                version: Some(primary.version),
                content_type: primary.object_type.clone(),
            };
            let Ok(preview_url) = self
                .url_strategy
                .url_for(DelegatedUrlKind::Preview, child.id, &backend, &primary.object_key, &url_meta)
                .await
            else {
                continue;
            };

            let suffix = Self::variant_suffix(&edge.variant);
            match edge.derivation_type.as_str() {
                "thumbnail" => {
                    if details.thumbnail.is_none() {
                        details.thumbnail = Some(preview_url.clone());
                    }
                    details.thumbnails.insert(suffix, preview_url);
                }
                "preview" => {
                    details.previews.insert(suffix, preview_url);
                }
                "transcode" => {
                    details.transcodes.insert(suffix, preview_url);
                }
                _ => {}
            }
        }

        Ok(details)
    }

    /// `GetContentDetailsBatch(ids, opts...)`: uses the batch accessors to avoid N+1
    /// queries. Results are returned in input order; missing ids are omitted.
    pub async fn get_content_details_batch(&self, ids: &[Uuid], opts: &ContentDetailsOptions) -> Result<Vec<ContentDetails>, CoreError> {
        let contents = self.repository.get_contents_by_ids(ids).await?;
        let metadata = self.repository.get_content_metadata_by_content_ids(ids).await?;
        let mut objects = self.repository.get_objects_by_content_ids(ids).await?;
        let primary_object_ids: Vec<Uuid> = objects.values().filter_map(|os| os.first()).map(|o| o.id).collect();
        let object_metadata = self.repository.get_object_metadata_by_object_ids(&primary_object_ids).await?;
        let children = self
            .repository
            .list_derived_content(&ListDerivedContentOptions::default().with_parent_ids(ids.iter().copied()).with_urls())
            .await?;

        let mut children_by_parent: HashMap<Uuid, Vec<DerivedContent>> = HashMap::new();
        for edge in children {
            children_by_parent.entry(edge.parent_id).or_default().push(edge);
        }

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(content) = contents.get(id).cloned() else { continue };
            let content_objects = objects.remove(id).unwrap_or_default();
            let primary_metadata = content_objects.first().and_then(|o| object_metadata.get(&o.id).cloned());
            let content_children = children_by_parent.remove(id).unwrap_or_default();
            let details = self
                .assemble_details(content, metadata.get(id).cloned(), content_objects, primary_metadata, content_children, opts)
                .await?;
            results.push(details);
        }
        Ok(results)
    }

    /// `ListDerivedContent(options…)` with optional URL/object/metadata enrichment.
    /// Per-record enhancement failures are logged, not propagated.
    pub async fn list_derived_content(&self, options: &ListDerivedContentOptions) -> Result<Vec<DerivedContentView>, CoreError> {
        let edges = self.repository.list_derived_content(options).await?;
        let mut views = Vec::with_capacity(edges.len());

        for edge in edges {
            let mut view = DerivedContentView {
                edge: edge.clone(),
                status: None,
                download_url: None,
                preview_url: None,
                thumbnail_url: None,
                objects: None,
                metadata: None,
            };

            let child = match self.repository.get_content(edge.content_id).await {
                Ok(child) => child,
                Err(e) => {
                    crate::error::log(&e);
                    views.push(view);
                    continue;
                }
            };
            view.status = Some(child.status);

            if options.include_objects || options.include_urls {
                match self.repository.get_objects_by_content_id(child.id).await {
                    Ok(child_objects) => {
                        if options.include_urls {
                            if let Some(primary) = child_objects.first() {
                                if let Ok(backend) = self.backend(&primary.storage_backend_name).await {
                                    let url_meta = UrlMetadata {
                                        file_name: primary.file_name.clone(),
                                        version: Some(primary.version),
                                        content_type: primary.object_type.clone(),
                                    };
                                    if let Ok(url) = self
                                        .url_strategy
                                        .url_for(DelegatedUrlKind::Download, child.id, &backend, &primary.object_key, &url_meta)
                                        .await
                                    {
                                        view.download_url = Some(url);
                                    }
                                    if let Ok(url) = self
                                        .url_strategy
                                        .url_for(DelegatedUrlKind::Preview, child.id, &backend, &primary.object_key, &url_meta)
                                        .await
                                    {
                                        if edge.derivation_type == "thumbnail" {
                                            view.thumbnail_url = Some(url.clone());
                                        }
                                        view.preview_url = Some(url);
                                    }
                                }
                            }
                        }
                        if options.include_objects {
                            view.objects = Some(child_objects);
                        }
                    }
                    Err(e) => crate::error::log(&e),
                }
            }

            if options.include_metadata {
                match self.repository.get_content_metadata(child.id).await {
                    Ok(metadata) => view.metadata = metadata,
                    Err(e) => crate::error::log(&e),
                }
            }

            views.push(view);
        }

        Ok(views)
    }
}
