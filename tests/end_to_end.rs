//! End-to-end scenario tests, driven against the in-memory repository and the
//! in-memory/filesystem blob stores so they run without any external service.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use content_core::blobstore::fs::{FsBlobStore, FsConfig};
use content_core::blobstore::memory::MemoryBlobStore;
use content_core::blobstore::BlobStore;
use content_core::error::CoreError;
use content_core::event_sink::NoopEventSink;
use content_core::key_generator::{KeyGenerator, KeyPolicy};
use content_core::options::{
    ContentDetailsOptions, CreateDerivedContentRequest, ListDerivedContentOptions, UploadContentRequest, UploadDerivedContentRequest,
};
use content_core::repository::memory::MemoryRepository;
use content_core::url_strategy::{UrlStrategy, UrlStrategyKind};
use content_core::{ContentStatus, Service};

fn memory_service() -> Service {
    Service::new(
        Arc::new(MemoryRepository::new()),
        KeyGenerator::new(KeyPolicy::Legacy),
        UrlStrategy::new(UrlStrategyKind::Content, "/api/v1"),
        Arc::new(NoopEventSink),
    )
}

fn reader(bytes: &'static [u8]) -> content_core::blobstore::BlobReader {
    Box::pin(Cursor::new(bytes.to_vec()))
}

async fn read_all(mut r: content_core::blobstore::BlobReader) -> Vec<u8> {
    use tokio::io::AsyncReadExt;
    let mut out = Vec::new();
    r.read_to_end(&mut out).await.unwrap();
    out
}

/// S1 — original upload + download round trip.
#[tokio::test]
async fn original_upload_download_round_trip() {
    let service = memory_service();
    service.register_backend(Arc::new(MemoryBlobStore::new("mem"))).await;

    let content = service
        .upload_content(UploadContentRequest {
            tenant_id: "T".into(),
            owner_id: "O".into(),
            owner_type: None,
            name: "doc".into(),
            description: None,
            document_type: "text/plain".into(),
            storage_backend_name: None,
            file_name: Some("doc.txt".into()),
            mime_type: Some("text/plain".into()),
            reader: reader(b"hello"),
        })
        .await
        .expect("upload_content should succeed");

    assert_eq!(content.status, ContentStatus::Uploaded);

    let downloaded = read_all(service.download_content(content.id).await.expect("download should succeed")).await;
    assert_eq!(downloaded, b"hello");

    let details = service
        .get_content_details(content.id, &ContentDetailsOptions::default())
        .await
        .expect("details should resolve");
    assert!(details.ready);
    assert_eq!(details.file_size, Some(5));
    assert_eq!(details.mime_type.as_deref(), Some("text/plain"));
}

/// S2 — variant inference.
#[tokio::test]
async fn variant_inference_on_create_derived_content() {
    let service = memory_service();
    service.register_backend(Arc::new(MemoryBlobStore::new("mem"))).await;

    let parent = service
        .upload_content(UploadContentRequest {
            tenant_id: "T".into(),
            owner_id: "O".into(),
            owner_type: None,
            name: "doc".into(),
            description: None,
            document_type: "image/png".into(),
            storage_backend_name: None,
            file_name: None,
            mime_type: None,
            reader: reader(b"image-bytes"),
        })
        .await
        .unwrap();

    let child = service
        .create_derived_content(CreateDerivedContentRequest {
            parent_id: parent.id,
            tenant_id: "T".into(),
            owner_id: "O".into(),
            name: "doc-thumb".into(),
            description: None,
            document_type: "image/png".into(),
            derivation_type: None,
            variant: "thumbnail_256".into(),
            derivation_params: HashMap::new(),
            initial_status: None,
        })
        .await
        .expect("create_derived_content should succeed");

    assert_eq!(child.derivation_type, "thumbnail");

    let views = service
        .list_derived_content(&ListDerivedContentOptions::default().with_parent_id(parent.id).with_urls())
        .await
        .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].edge.derivation_type, "thumbnail");
    assert_eq!(views[0].edge.variant, "thumbnail_256");
}

/// S3 — parent-not-ready.
#[tokio::test]
async fn create_derived_content_rejects_not_ready_parent() {
    let service = memory_service();

    let parent = service
        .create_content(content_core::options::CreateContentRequest {
            tenant_id: "T".into(),
            owner_id: "O".into(),
            owner_type: None,
            name: "doc".into(),
            description: None,
            document_type: "text/plain".into(),
        })
        .await
        .unwrap();
    assert_eq!(parent.status, ContentStatus::Created);

    let err = service
        .create_derived_content(CreateDerivedContentRequest {
            parent_id: parent.id,
            tenant_id: "T".into(),
            owner_id: "O".into(),
            name: "doc-thumb".into(),
            description: None,
            document_type: "text/plain".into(),
            derivation_type: None,
            variant: "thumbnail_256".into(),
            derivation_params: HashMap::new(),
            initial_status: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::ParentNotReady));
    assert_eq!(err.code(), "parent_not_ready");
}

/// S4 — depth cap: five derived levels succeed, a sixth fails with `max_derivation_depth`.
#[tokio::test]
async fn derivation_depth_is_capped_at_five() {
    let service = memory_service();
    service.register_backend(Arc::new(MemoryBlobStore::new("mem"))).await;

    let root = service
        .upload_content(UploadContentRequest {
            tenant_id: "T".into(),
            owner_id: "O".into(),
            owner_type: None,
            name: "root".into(),
            description: None,
            document_type: "text/plain".into(),
            storage_backend_name: None,
            file_name: None,
            mime_type: None,
            reader: reader(b"root-bytes"),
        })
        .await
        .unwrap();

    let mut parent_id = root.id;
    for level in 1..=5 {
        let child = service
            .upload_derived_content(UploadDerivedContentRequest {
                parent_id,
                tenant_id: "T".into(),
                owner_id: "O".into(),
                name: format!("level-{level}"),
                description: None,
                document_type: "text/plain".into(),
                derivation_type: Some("transcode".into()),
                variant: "transcode_mp4".into(),
                derivation_params: HashMap::new(),
                storage_backend_name: None,
                file_name: None,
                mime_type: None,
                reader: reader(b"derived-bytes"),
            })
            .await
            .unwrap_or_else(|e| panic!("level {level} should succeed, got {e:?}"));
        assert_eq!(child.status, ContentStatus::Processed);
        parent_id = child.id;
    }

    let err = service
        .upload_derived_content(UploadDerivedContentRequest {
            parent_id,
            tenant_id: "T".into(),
            owner_id: "O".into(),
            name: "level-6".into(),
            description: None,
            document_type: "text/plain".into(),
            derivation_type: Some("transcode".into()),
            variant: "transcode_mp4".into(),
            derivation_params: HashMap::new(),
            storage_backend_name: None,
            file_name: None,
            mime_type: None,
            reader: reader(b"derived-bytes"),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::MaxDerivationDepth));
}

/// S5 — delete-while-processing.
#[tokio::test]
async fn delete_while_processing_requires_force() {
    let service = memory_service();

    let content = service
        .create_content(content_core::options::CreateContentRequest {
            tenant_id: "T".into(),
            owner_id: "O".into(),
            owner_type: None,
            name: "doc".into(),
            description: None,
            document_type: "text/plain".into(),
        })
        .await
        .unwrap();

    service.update_content_status(content.id, ContentStatus::Processing).await.unwrap();

    let err = service.delete_content(content.id, false).await.unwrap_err();
    assert!(matches!(err, CoreError::ContentBeingProcessed));

    service.delete_content(content.id, true).await.expect("forced delete should succeed");
}

/// S6 — filesystem presign.
#[tokio::test]
async fn filesystem_presign_matches_expected_shape_and_rejects_tampering() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(
        "fs",
        FsConfig {
            base_dir: dir.path().to_path_buf(),
            url_prefix: "/v1".into(),
            secret: "k".into(),
            presign_expires_seconds: 60,
        },
    );

    let url = store
        .get_delegated_url(
            content_core::blobstore::DelegatedUrlKind::Download,
            "a/b",
            &content_core::blobstore::UrlMetadata::default(),
        )
        .await
        .unwrap();

    let re = matches_presign_shape(&url);
    assert!(re, "url {url} did not match /v1/download/a/b?expires=<digits>&sig=<64 hex>");

    let (expires, sig) = parse_query(&url);

    let ok = content_core::presign::validate(
        "k",
        expires - 1,
        &content_core::presign::PresignedRequest {
            method: content_core::presign::PresignMethod::Get,
            key: "a/b",
            expires,
            sig: &sig,
        },
    );
    assert!(ok.is_ok());

    let mut bad_sig = sig.clone();
    bad_sig.replace_range(0..1, if &bad_sig[0..1] == "a" { "b" } else { "a" });
    let bad = content_core::presign::validate(
        "k",
        expires - 1,
        &content_core::presign::PresignedRequest {
            method: content_core::presign::PresignMethod::Get,
            key: "a/b",
            expires,
            sig: &bad_sig,
        },
    );
    assert!(matches!(bad.unwrap_err(), CoreError::BadSignature));

    let expired = content_core::presign::validate(
        "k",
        expires + 10,
        &content_core::presign::PresignedRequest {
            method: content_core::presign::PresignMethod::Get,
            key: "a/b",
            expires,
            sig: &sig,
        },
    );
    assert!(matches!(expired.unwrap_err(), CoreError::UrlExpired));
}

fn matches_presign_shape(url: &str) -> bool {
    let Some(rest) = url.strip_prefix("/v1/download/a/b?expires=") else { return false };
    let Some((expires_part, sig_part)) = rest.split_once("&sig=") else { return false };
    !expires_part.is_empty()
        && expires_part.chars().all(|c| c.is_ascii_digit())
        && sig_part.len() == 64
        && sig_part.chars().all(|c| c.is_ascii_hexdigit())
}

fn parse_query(url: &str) -> (i64, String) {
    let rest = url.split_once('?').unwrap().1;
    let mut expires = 0i64;
    let mut sig = String::new();
    for pair in rest.split('&') {
        let (k, v) = pair.split_once('=').unwrap();
        match k {
            "expires" => expires = v.parse().unwrap(),
            "sig" => sig = v.to_owned(),
            _ => {}
        }
    }
    (expires, sig)
}
