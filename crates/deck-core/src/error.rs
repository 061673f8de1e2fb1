//! Core error types for Deck RS
//!
//! Every crate keeps its own error enum; they all collapse into [`DeckError`]
//! at the boundary where a response has to be produced.

use thiserror::Error;

/// Core error type for all Deck operations
#[derive(Error, Debug)]
pub enum DeckError {
    #[error("Not found: {entity} with id={id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Permission denied: {message}")]
    Forbidden { message: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge { size: u64, max: u64 },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DeckError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DeckError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        DeckError::Forbidden {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        DeckError::BadRequest {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        DeckError::Conflict {
            message: message.into(),
        }
    }
}

/// HTTP status code mapping for errors
impl DeckError {
    pub fn status_code(&self) -> u16 {
        match self {
            DeckError::NotFound { .. } => 404,
            DeckError::Unauthorized { .. } => 401,
            DeckError::Forbidden { .. } => 403,
            DeckError::BadRequest { .. } => 400,
            DeckError::PayloadTooLarge { .. } => 413,
            DeckError::Conflict { .. } => 409,
            DeckError::Storage(_) | DeckError::Internal(_) | DeckError::Config(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DeckError::NotFound { .. } => "not_found",
            DeckError::Unauthorized { .. } => "unauthorized",
            DeckError::Forbidden { .. } => "forbidden",
            DeckError::BadRequest { .. } => "bad_request",
            DeckError::PayloadTooLarge { .. } => "payload_too_large",
            DeckError::Conflict { .. } => "conflict",
            DeckError::Storage(_) => "storage_error",
            DeckError::Internal(_) => "internal_error",
            DeckError::Config(_) => "configuration_error",
        }
    }
}

pub type DeckResult<T> = Result<T, DeckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(DeckError::not_found("Attachment", 4).status_code(), 404);
        assert_eq!(DeckError::forbidden("nope").status_code(), 403);
        assert_eq!(DeckError::conflict("exists").status_code(), 409);
        assert_eq!(
            DeckError::PayloadTooLarge { size: 10, max: 5 }.status_code(),
            413
        );
        assert_eq!(DeckError::Storage("disk".into()).status_code(), 500);
    }

    #[test]
    fn test_not_found_message() {
        let err = DeckError::not_found("Attachment", 42);
        assert_eq!(err.to_string(), "Not found: Attachment with id=42");
        assert_eq!(err.error_code(), "not_found");
    }
}
