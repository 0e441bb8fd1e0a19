//! Signed-URL validator for filesystem presign.
//!
//! Verifies the HMAC signature and expiry bound on an incoming request before routing it
//! to the filesystem backend's Upload/Download/Preview operation.

use subtle::ConstantTimeEq;

use crate::blobstore::fs::sign;
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresignMethod {
    Put,
    Get,
}

impl PresignMethod {
    fn as_str(self) -> &'static str {
        match self {
            Self::Put => "PUT",
            Self::Get => "GET",
        }
    }
}

/// Extracted from the request path/query: `method`, `key`, `expires`, `sig`.
#[derive(Debug, Clone)]
pub struct PresignedRequest<'a> {
    pub method: PresignMethod,
    pub key: &'a str,
    pub expires: i64,
    pub sig: &'a str,
}

/// Validates `expires >= now` and recomputes the HMAC in constant time. On success, the caller proceeds to Upload/Download/Preview on the backend.
pub fn validate(secret: &str, now: i64, req: &PresignedRequest<'_>) -> Result<(), CoreError> {
    if req.expires < now {
        return Err(CoreError::UrlExpired);
    }

    let expected = sign(secret, req.method.as_str(), req.key, req.expires);
    if expected.as_bytes().ct_eq(req.sig.as_bytes()).unwrap_u8() != 1 {
        return Err(CoreError::BadSignature);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_correctly_signed_unexpired_url() {
        let sig = sign("k", "GET", "a/b", 1_000_000);
        let req = PresignedRequest {
            method: PresignMethod::Get,
            key: "a/b",
            expires: 1_000_000,
            sig: &sig,
        };
        assert!(validate("k", 500_000, &req).is_ok());
    }

    #[test]
    fn rejects_expired_url() {
        let sig = sign("k", "GET", "a/b", 1_000_000);
        let req = PresignedRequest {
            method: PresignMethod::Get,
            key: "a/b",
            expires: 1_000_000,
            sig: &sig,
        };
        let err = validate("k", 2_000_000, &req).unwrap_err();
        assert!(matches!(err, CoreError::UrlExpired));
    }

    #[test]
    fn rejects_tampered_signature_key_or_expiry() {
        let sig = sign("k", "GET", "a/b", 1_000_000);
        let mut bad_sig = sig.clone();
        bad_sig.replace_range(0..1, if &bad_sig[0..1] == "a" { "b" } else { "a" });

        let bad = PresignedRequest {
            method: PresignMethod::Get,
            key: "a/b",
            expires: 1_000_000,
            sig: &bad_sig,
        };
        assert!(matches!(validate("k", 500_000, &bad).unwrap_err(), CoreError::BadSignature));

        let wrong_key = PresignedRequest {
            method: PresignMethod::Get,
            key: "a/c",
            expires: 1_000_000,
            sig: &sig,
        };
        assert!(matches!(validate("k", 500_000, &wrong_key).unwrap_err(), CoreError::BadSignature));

        let wrong_expiry = PresignedRequest {
            method: PresignMethod::Get,
            key: "a/b",
            expires: 1_000_001,
            sig: &sig,
        };
        assert!(validate("k", 500_000, &wrong_expiry).is_err());
    }
}
