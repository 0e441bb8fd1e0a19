//! Deterministic object-key generation.
//!
//! `GenerateKey` is a pure function of its inputs: same `(content_id, object_id,
//! KeyMetadata)` always yields the same key, and the result never exceeds 1024 bytes.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    #[default]
    Legacy,
    TenantDate,
    GitLike,
}

/// Extra context the generator needs to place derived keys under a discoverable prefix
/// and to partition tenant-date keys.
#[derive(Debug, Clone, Default)]
pub struct KeyMetadata {
    pub tenant_id: String,
    pub file_name: Option<String>,
    pub is_original: bool,
    pub derivation_type: Option<String>,
    pub variant: Option<String>,
    pub parent_content_id: Option<Uuid>,
    /// Injectable for deterministic tests; defaults to "now" at call sites.
    pub timestamp: DateTime<Utc>,
}

const MAX_KEY_LEN: usize = 1024;

#[derive(Debug, Clone, Copy)]
pub struct KeyGenerator {
    pub policy: KeyPolicy,
}

impl KeyGenerator {
    pub fn new(policy: KeyPolicy) -> Self {
        Self { policy }
    }

    pub fn generate(&self, content_id: Uuid, object_id: Uuid, meta: &KeyMetadata) -> Result<String, CoreError> {
        let base = match self.policy {
            KeyPolicy::Legacy => legacy_key(content_id, object_id, meta),
            KeyPolicy::TenantDate => tenant_date_key(content_id, object_id, meta),
            KeyPolicy::GitLike => git_like_key(content_id, object_id, meta),
        };

        let key = if !meta.is_original {
            derived_prefix(meta, &base)
        } else {
            base
        };

        if key.len() > MAX_KEY_LEN {
            return Err(CoreError::KeyTooLong);
        }
        Ok(key)
    }
}

fn with_file_name(mut key: String, file_name: &Option<String>) -> String {
    if let Some(name) = file_name {
        key.push('/');
        key.push_str(name);
    }
    key
}

fn legacy_key(content_id: Uuid, object_id: Uuid, meta: &KeyMetadata) -> String {
    let key = format!("C/{content_id}/{object_id}");
    with_file_name(key, &meta.file_name)
}

fn tenant_date_key(content_id: Uuid, object_id: Uuid, meta: &KeyMetadata) -> String {
    let ts = meta.timestamp;
    let key = format!(
        "{}/{:04}/{:02}/{:02}/{content_id}/{object_id}",
        meta.tenant_id,
        ts.format("%Y"),
        ts.format("%m"),
        ts.format("%d")
    );
    with_file_name(key, &meta.file_name)
}

fn git_like_key(content_id: Uuid, object_id: Uuid, meta: &KeyMetadata) -> String {
    let hex = hex_simd::encode_to_string(content_id.as_bytes(), hex_simd::AsciiCase::Lower);
    let (a, rest) = hex.split_at(2);
    let (b, _) = rest.split_at(2);
    let key = format!("{a}/{b}/{content_id}/{object_id}");
    with_file_name(key, &meta.file_name)
}

/// Routes derived keys under `d/<parentID>/<variant>/…` so derivation is discoverable
/// from the key alone.
fn derived_prefix(meta: &KeyMetadata, base: &str) -> String {
    match (meta.parent_content_id, &meta.variant) {
        (Some(parent), Some(variant)) => format!("d/{parent}/{variant}/{base}"),
        (Some(parent), None) => format!("d/{parent}/{base}"),
        _ => base.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> KeyMetadata {
        KeyMetadata {
            tenant_id: "acme".into(),
            file_name: Some("photo.jpg".into()),
            is_original: true,
            derivation_type: None,
            variant: None,
            parent_content_id: None,
            timestamp: DateTime::parse_from_rfc3339("2024-03-05T00:00:00Z").unwrap().with_timezone(&Utc),
        }
    }

    #[test]
    fn legacy_is_idempotent() {
        let gen = KeyGenerator::new(KeyPolicy::Legacy);
        let cid = Uuid::new_v4();
        let oid = Uuid::new_v4();
        let m = meta();
        assert_eq!(gen.generate(cid, oid, &m).unwrap(), gen.generate(cid, oid, &m).unwrap());
        assert!(gen.generate(cid, oid, &m).unwrap().starts_with("C/"));
    }

    #[test]
    fn tenant_date_partitions_by_day() {
        let gen = KeyGenerator::new(KeyPolicy::TenantDate);
        let cid = Uuid::new_v4();
        let oid = Uuid::new_v4();
        let key = gen.generate(cid, oid, &meta()).unwrap();
        assert!(key.starts_with("acme/2024/03/05/"));
    }

    #[test]
    fn git_like_flattens_using_content_id_hex() {
        let gen = KeyGenerator::new(KeyPolicy::GitLike);
        let cid = Uuid::new_v4();
        let oid = Uuid::new_v4();
        let key = gen.generate(cid, oid, &meta()).unwrap();
        let hex = hex_simd::encode_to_string(cid.as_bytes(), hex_simd::AsciiCase::Lower);
        assert!(key.starts_with(&format!("{}/{}/", &hex[0..2], &hex[2..4])));
    }

    #[test]
    fn derived_keys_carry_parent_and_variant_prefix() {
        let gen = KeyGenerator::new(KeyPolicy::Legacy);
        let cid = Uuid::new_v4();
        let oid = Uuid::new_v4();
        let parent = Uuid::new_v4();
        let mut m = meta();
        m.is_original = false;
        m.parent_content_id = Some(parent);
        m.variant = Some("thumbnail_256".into());
        let key = gen.generate(cid, oid, &m).unwrap();
        assert!(key.starts_with(&format!("d/{parent}/thumbnail_256/C/")));
    }
}
