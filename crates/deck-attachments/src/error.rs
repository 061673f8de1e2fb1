//! Attachment errors

use deck_auth::PermissionError;
use deck_core::traits::Id;
use deck_core::DeckError;
use thiserror::Error;

use crate::storage::StorageError;

/// Service errors
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Attachment not found: {0}")]
    NotFound(Id),
    #[error("Attachment content not found: {0}")]
    ContentNotFound(String),
    #[error(transparent)]
    PermissionDenied(#[from] PermissionError),
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("Invalid file: {0}")]
    InvalidFile(String),
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl AttachmentError {
    pub(crate) fn restore_not_allowed() -> Self {
        AttachmentError::PermissionDenied(PermissionError::NotAllowed(
            "Restore is not allowed.".to_string(),
        ))
    }
}

pub type AttachmentResult<T> = Result<T, AttachmentError>;

impl From<AttachmentError> for DeckError {
    fn from(err: AttachmentError) -> Self {
        match err {
            AttachmentError::NotFound(id) => DeckError::not_found("Attachment", id),
            AttachmentError::ContentNotFound(name) => DeckError::not_found("File", name),
            AttachmentError::PermissionDenied(e) => e.into(),
            AttachmentError::StorageError(e) => DeckError::Storage(e.to_string()),
            AttachmentError::InvalidFile(msg) => DeckError::bad_request(msg),
            AttachmentError::FileTooLarge { size, max } => DeckError::PayloadTooLarge { size, max },
            AttachmentError::Conflict(msg) => DeckError::conflict(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_not_allowed_is_forbidden() {
        let err = AttachmentError::restore_not_allowed();
        assert_eq!(err.to_string(), "Permission denied: Restore is not allowed.");
        assert_eq!(DeckError::from(err).status_code(), 403);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(DeckError::from(AttachmentError::NotFound(1)).status_code(), 404);
        assert_eq!(
            DeckError::from(AttachmentError::Conflict("File already exists.".into())).status_code(),
            409
        );
        assert_eq!(
            DeckError::from(AttachmentError::FileTooLarge { size: 2, max: 1 }).status_code(),
            413
        );
        assert_eq!(
            DeckError::from(AttachmentError::InvalidFile("No file uploaded".into())).status_code(),
            400
        );
    }
}
