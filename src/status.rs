//! Pure precondition predicates for the content/object state machines.
//!
//! These never touch a repository; the service consults them before any mutation.

use crate::error::CoreError;
use crate::model::{ContentStatus, ObjectStatus};

pub fn can_download_content(status: ContentStatus) -> Result<(), CoreError> {
    match status {
        ContentStatus::Uploaded | ContentStatus::Processed | ContentStatus::Archived => Ok(()),
        _ => Err(CoreError::ContentNotReady),
    }
}

pub fn can_download_object(status: ObjectStatus) -> Result<(), CoreError> {
    match status {
        ObjectStatus::Uploaded | ObjectStatus::Processed => Ok(()),
        _ => Err(CoreError::ObjectNotReady),
    }
}

pub fn can_upload_content(status: ContentStatus) -> Result<(), CoreError> {
    match status {
        ContentStatus::Created | ContentStatus::Failed => Ok(()),
        _ => Err(CoreError::InvalidUploadState),
    }
}

pub fn can_upload_object(status: ObjectStatus) -> Result<(), CoreError> {
    match status {
        ObjectStatus::Created | ObjectStatus::Failed => Ok(()),
        _ => Err(CoreError::InvalidUploadState),
    }
}

/// `force=true` allows deletion even while `processing`.
pub fn can_delete_content(status: ContentStatus, force: bool) -> Result<(), CoreError> {
    if status == ContentStatus::Processing && !force {
        return Err(CoreError::ContentBeingProcessed);
    }
    Ok(())
}

/// Checked against the *parent's* status (supports derived-of-derived chains).
pub fn can_create_derived(parent_status: ContentStatus) -> Result<(), CoreError> {
    match parent_status {
        ContentStatus::Uploaded | ContentStatus::Processed => Ok(()),
        _ => Err(CoreError::ParentNotReady),
    }
}

/// Maximum derivation depth: a content below a depth-5 chain
/// must not derive further.
pub const MAX_DERIVATION_DEPTH: u32 = 5;

/// Safety cap while walking `parent_id` edges, to abort on an accidental cycle rather
/// than loop forever.
pub const DEPTH_WALK_SAFETY_CAP: u32 = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_download_allowed_states() {
        assert!(can_download_content(ContentStatus::Uploaded).is_ok());
        assert!(can_download_content(ContentStatus::Processed).is_ok());
        assert!(can_download_content(ContentStatus::Archived).is_ok());
        assert!(can_download_content(ContentStatus::Created).is_err());
        assert!(can_download_content(ContentStatus::Processing).is_err());
    }

    #[test]
    fn delete_blocked_while_processing_unless_forced() {
        assert!(can_delete_content(ContentStatus::Processing, false).is_err());
        assert!(can_delete_content(ContentStatus::Processing, true).is_ok());
        assert!(can_delete_content(ContentStatus::Uploaded, false).is_ok());
    }

    #[test]
    fn derive_requires_ready_parent() {
        assert!(can_create_derived(ContentStatus::Uploaded).is_ok());
        assert!(can_create_derived(ContentStatus::Processed).is_ok());
        assert!(can_create_derived(ContentStatus::Created).is_err());
        assert!(can_create_derived(ContentStatus::Failed).is_err());
    }

    #[test]
    fn upload_allowed_from_created_or_failed_only() {
        assert!(can_upload_content(ContentStatus::Created).is_ok());
        assert!(can_upload_content(ContentStatus::Failed).is_ok());
        assert!(can_upload_content(ContentStatus::Uploaded).is_err());
    }
}
