//! URL strategy: turns `(content, object, backend)` into a client-visible URL.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::blobstore::{BlobStore, DelegatedUrlKind, UrlMetadata};
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlStrategyKind {
    #[default]
    Content,
    StorageDelegated,
}

/// Routes a client-visible URL either through the service's own HTTP surface
/// (content-based, the default) or to the backend's native delegated URL
/// (storage-delegated; falls back to content-based for backends that cannot delegate,
/// e.g. the memory backend).
#[derive(Debug, Clone)]
pub struct UrlStrategy {
    pub kind: UrlStrategyKind,
    pub api_prefix: String,
}

impl UrlStrategy {
    pub fn new(kind: UrlStrategyKind, api_prefix: impl Into<String>) -> Self {
        Self {
            kind,
            api_prefix: api_prefix.into(),
        }
    }

    pub async fn url_for(
        &self,
        kind: DelegatedUrlKind,
        content_id: Uuid,
        backend: &Arc<dyn BlobStore>,
        object_key: &str,
        meta: &UrlMetadata,
    ) -> Result<String, CoreError> {
        match self.kind {
            UrlStrategyKind::Content => Ok(self.content_based_url(kind, content_id)),
            UrlStrategyKind::StorageDelegated => match backend.get_delegated_url(kind, object_key, meta).await {
                Ok(url) => Ok(url),
                Err(_) => Ok(self.content_based_url(kind, content_id)),
            },
        }
    }

    /// Builds the content-based URL directly, bypassing backend delegation - used when
    /// no object exists yet to delegate to (e.g. an upload URL for content with no data).
    pub fn content_url(&self, kind: DelegatedUrlKind, content_id: Uuid) -> String {
        self.content_based_url(kind, content_id)
    }

    fn content_based_url(&self, kind: DelegatedUrlKind, content_id: Uuid) -> String {
        let segment = match kind {
            DelegatedUrlKind::Upload => "upload",
            DelegatedUrlKind::Download => "download",
            DelegatedUrlKind::Preview => "preview",
        };
        format!("{}/contents/{}/{}", self.api_prefix, content_id, segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blobstore::memory::MemoryBlobStore;

    #[tokio::test]
    async fn content_strategy_routes_through_own_surface() {
        let strategy = UrlStrategy::new(UrlStrategyKind::Content, "/api/v1");
        let backend: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new("mem"));
        let id = Uuid::new_v4();
        let url = strategy
            .url_for(DelegatedUrlKind::Download, id, &backend, "k", &UrlMetadata::default())
            .await
            .unwrap();
        assert_eq!(url, format!("/api/v1/contents/{id}/download"));
    }

    #[tokio::test]
    async fn storage_delegated_falls_back_for_memory_backend() {
        let strategy = UrlStrategy::new(UrlStrategyKind::StorageDelegated, "/api/v1");
        let backend: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new("mem"));
        let id = Uuid::new_v4();
        let url = strategy
            .url_for(DelegatedUrlKind::Download, id, &backend, "k", &UrlMetadata::default())
            .await
            .unwrap();
        assert_eq!(url, format!("/api/v1/contents/{id}/download"));
    }
}
