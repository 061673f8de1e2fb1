//! Per-type attachment handlers
//!
//! A handler owns everything type specific about an attachment: where its
//! content lives, how it is displayed, and whether deleting it can be undone.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::AttachmentResult;
use crate::model::{Attachment, AttachmentContent, Upload};

/// Type-specific attachment behavior
#[async_trait]
pub trait AttachmentHandler: Send + Sync {
    /// Called before a new record is inserted; may rewrite the payload
    async fn create(&self, attachment: &mut Attachment, upload: Option<&Upload>)
        -> AttachmentResult<()>;

    /// Called after the payload of an existing record was replaced
    async fn update(&self, attachment: &mut Attachment, upload: Option<&Upload>)
        -> AttachmentResult<()>;

    /// Fill in presentation-only fields. Must be idempotent.
    async fn extend_data(&self, attachment: &mut Attachment) -> AttachmentResult<()>;

    /// Produce the attachment's content
    async fn display(&self, attachment: &Attachment) -> AttachmentResult<AttachmentContent>;

    /// Whether deletion is a soft delete that can be restored
    fn allow_undo(&self) -> bool;

    /// Mark the record deleted without touching its content
    fn mark_as_deleted(&self, attachment: &mut Attachment) {
        attachment.deleted_at = Some(Utc::now());
    }

    /// Irreversibly remove the attachment's content
    async fn delete(&self, attachment: &Attachment) -> AttachmentResult<()>;
}

/// Type tag to handler table
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn AttachmentHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the handler for a type tag
    pub fn register(&mut self, attachment_type: impl Into<String>, handler: Arc<dyn AttachmentHandler>) {
        self.handlers.insert(attachment_type.into(), handler);
    }

    /// Handler for an exact type tag; `None` for unsupported types
    pub fn resolve(&self, attachment_type: &str) -> Option<Arc<dyn AttachmentHandler>> {
        self.handlers.get(attachment_type).cloned()
    }

    /// Registered type tags, sorted
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("types", &self.types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttachmentError;

    struct Noop;

    #[async_trait]
    impl AttachmentHandler for Noop {
        async fn create(&self, _: &mut Attachment, _: Option<&Upload>) -> AttachmentResult<()> {
            Ok(())
        }
        async fn update(&self, _: &mut Attachment, _: Option<&Upload>) -> AttachmentResult<()> {
            Ok(())
        }
        async fn extend_data(&self, _: &mut Attachment) -> AttachmentResult<()> {
            Ok(())
        }
        async fn display(&self, a: &Attachment) -> AttachmentResult<AttachmentContent> {
            Err(AttachmentError::ContentNotFound(a.data.clone()))
        }
        fn allow_undo(&self) -> bool {
            true
        }
        async fn delete(&self, _: &Attachment) -> AttachmentResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_resolve_exact_match() {
        let mut registry = HandlerRegistry::new();
        registry.register("deck_file", Arc::new(Noop));

        assert!(registry.resolve("deck_file").is_some());
        assert!(registry.resolve("Deck_File").is_none());
        assert!(registry.resolve("link").is_none());
        assert_eq!(registry.types(), vec!["deck_file"]);
    }

    #[test]
    fn test_default_mark_as_deleted() {
        let mut attachment = Attachment::new(1, "deck_file", "a.txt", "alice");
        Noop.mark_as_deleted(&mut attachment);
        assert!(attachment.deleted_at.is_some());
    }
}
