//! Attachment Service
//!
//! Resolves attachment types to their handlers, checks card permissions and
//! keeps the per-card attachment count cache in step with mutations.

use std::sync::Arc;
use std::time::Duration;

use deck_auth::{CurrentUser, PermissionChecker, PermissionLevel, Resource};
use deck_core::traits::Id;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::cache::Cache;
use crate::error::{AttachmentError, AttachmentResult};
use crate::file::FileAttachmentHandler;
use crate::handler::{AttachmentHandler, HandlerRegistry};
use crate::mapper::AttachmentMapper;
use crate::model::{Attachment, AttachmentContent, Upload, FILE_ATTACHMENT_TYPE};
use crate::storage::Storage;

/// Attachment service configuration
#[derive(Debug, Clone)]
pub struct AttachmentConfig {
    /// Largest accepted upload in bytes
    pub max_upload_size: u64,
    /// Lifetime of cached counts; `None` keeps them until invalidated
    pub count_ttl: Option<Duration>,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            max_upload_size: 50 * 1024 * 1024, // 50 MB
            count_ttl: None,
        }
    }
}

/// Attachment service
pub struct AttachmentService {
    mapper: Arc<dyn AttachmentMapper>,
    permissions: Arc<dyn PermissionChecker>,
    cache: Arc<dyn Cache>,
    handlers: HandlerRegistry,
    config: AttachmentConfig,
}

fn count_key(card_id: Id) -> String {
    format!("card-{}", card_id)
}

impl AttachmentService {
    /// Create the service with the built-in `deck_file` handler registered
    pub fn new(
        mapper: Arc<dyn AttachmentMapper>,
        permissions: Arc<dyn PermissionChecker>,
        cache: Arc<dyn Cache>,
        storage: Arc<dyn Storage>,
        config: AttachmentConfig,
    ) -> Self {
        let mut handlers = HandlerRegistry::new();
        handlers.register(
            FILE_ATTACHMENT_TYPE,
            Arc::new(FileAttachmentHandler::new(storage, config.max_upload_size)),
        );

        Self {
            mapper,
            permissions,
            cache,
            handlers,
            config,
        }
    }

    /// Register or replace the handler for a type tag
    pub fn register_handler(
        &mut self,
        attachment_type: impl Into<String>,
        handler: Arc<dyn AttachmentHandler>,
    ) {
        let attachment_type = attachment_type.into();
        debug!(attachment_type = %attachment_type, "Attachment handler registered");
        self.handlers.register(attachment_type, handler);
    }

    /// Handler for a type tag, `None` for unsupported types
    pub fn resolve_handler(&self, attachment_type: &str) -> Option<Arc<dyn AttachmentHandler>> {
        self.handlers.resolve(attachment_type)
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    async fn check(
        &self,
        user: &CurrentUser,
        card_id: Id,
        level: PermissionLevel,
    ) -> AttachmentResult<()> {
        self.permissions
            .check_permission(user, Resource::Card(card_id), level)
            .await?;
        Ok(())
    }

    async fn invalidate_count(&self, card_id: Id) {
        self.cache.remove(&count_key(card_id)).await;
    }

    /// Load an attachment and make sure it belongs to `card_id`
    async fn find_on_card(&self, card_id: Id, attachment_id: Id) -> AttachmentResult<Attachment> {
        let attachment = self.mapper.find(attachment_id).await?;
        if attachment.card_id != card_id {
            return Err(AttachmentError::NotFound(attachment_id));
        }
        Ok(attachment)
    }

    /// Best-effort enrichment; failures never abort the operation
    async fn extend(&self, attachment: &mut Attachment) {
        let Some(handler) = self.resolve_handler(&attachment.attachment_type) else {
            return;
        };
        if let Err(e) = handler.extend_data(attachment).await {
            warn!(
                id = ?attachment.id,
                attachment_type = %attachment.attachment_type,
                error = %e,
                "Failed to extend attachment data"
            );
        }
    }

    /// Attachments of a card, optionally including soft-deleted ones
    #[instrument(skip(self, user), fields(user = %user.uid()))]
    pub async fn find_all(
        &self,
        user: &CurrentUser,
        card_id: Id,
        include_deleted: bool,
    ) -> AttachmentResult<Vec<Attachment>> {
        self.check(user, card_id, PermissionLevel::Read).await?;

        let mut attachments = self.mapper.find_all(card_id).await?;
        if include_deleted {
            attachments.extend(self.mapper.find_to_delete(Some(card_id), false).await?);
        }

        for attachment in attachments.iter_mut() {
            self.extend(attachment).await;
        }
        Ok(attachments)
    }

    /// Number of non-deleted attachments on a card
    #[instrument(skip(self, user), fields(user = %user.uid()))]
    pub async fn count(&self, user: &CurrentUser, card_id: Id) -> AttachmentResult<u64> {
        self.check(user, card_id, PermissionLevel::Read).await?;

        let key = count_key(card_id);
        if let Some(count) = self.cache.get(&key).await.as_ref().and_then(Value::as_u64) {
            debug!(card_id, count, "Attachment count cache hit");
            return Ok(count);
        }

        let count = self.mapper.find_all(card_id).await?.len() as u64;
        self.cache
            .set(&key, Value::from(count), self.config.count_ttl)
            .await;
        debug!(card_id, count, "Attachment count cached");
        Ok(count)
    }

    /// Create an attachment without uploaded content
    pub async fn create(
        &self,
        user: &CurrentUser,
        card_id: Id,
        attachment_type: &str,
        data: &str,
    ) -> AttachmentResult<Attachment> {
        self.create_with_upload(user, card_id, attachment_type, data, None)
            .await
    }

    /// Create an attachment, handing the upload to the type's handler
    #[instrument(skip(self, user, data, upload), fields(user = %user.uid()))]
    pub async fn create_with_upload(
        &self,
        user: &CurrentUser,
        card_id: Id,
        attachment_type: &str,
        data: &str,
        upload: Option<Upload>,
    ) -> AttachmentResult<Attachment> {
        self.check(user, card_id, PermissionLevel::Edit).await?;
        self.invalidate_count(card_id).await;

        let mut attachment = Attachment::new(card_id, attachment_type, data, user.uid());
        if let Some(handler) = self.resolve_handler(attachment_type) {
            handler.create(&mut attachment, upload.as_ref()).await?;
        }

        let mut attachment = self.mapper.insert(&attachment).await?;
        info!(id = ?attachment.id, card_id, attachment_type, "Attachment created");

        self.extend(&mut attachment).await;
        Ok(attachment)
    }

    /// Replace the payload of an attachment
    pub async fn update(
        &self,
        user: &CurrentUser,
        card_id: Id,
        attachment_id: Id,
        data: &str,
    ) -> AttachmentResult<Attachment> {
        self.update_with_upload(user, card_id, attachment_id, data, None)
            .await
    }

    /// Replace the payload of an attachment, handing the upload to the handler
    #[instrument(skip(self, user, data, upload), fields(user = %user.uid()))]
    pub async fn update_with_upload(
        &self,
        user: &CurrentUser,
        card_id: Id,
        attachment_id: Id,
        data: &str,
        upload: Option<Upload>,
    ) -> AttachmentResult<Attachment> {
        self.check(user, card_id, PermissionLevel::Edit).await?;
        self.invalidate_count(card_id).await;

        let mut attachment = self.find_on_card(card_id, attachment_id).await?;
        attachment.data = data.to_string();
        if let Some(handler) = self.resolve_handler(&attachment.attachment_type) {
            handler.update(&mut attachment, upload.as_ref()).await?;
        }
        attachment.touch();

        let mut attachment = self.mapper.update(&attachment).await?;
        info!(id = attachment_id, card_id, "Attachment updated");

        self.extend(&mut attachment).await;
        Ok(attachment)
    }

    /// Render an attachment's content
    #[instrument(skip(self, user), fields(user = %user.uid()))]
    pub async fn display(
        &self,
        user: &CurrentUser,
        card_id: Id,
        attachment_id: Id,
    ) -> AttachmentResult<AttachmentContent> {
        self.check(user, card_id, PermissionLevel::Read).await?;

        let attachment = self.find_on_card(card_id, attachment_id).await?;
        match self.resolve_handler(&attachment.attachment_type) {
            Some(handler) => handler.display(&attachment).await,
            None => Err(AttachmentError::NotFound(attachment_id)),
        }
    }

    /// Soft delete when the type supports undo, otherwise remove for good
    #[instrument(skip(self, user), fields(user = %user.uid()))]
    pub async fn delete(
        &self,
        user: &CurrentUser,
        card_id: Id,
        attachment_id: Id,
    ) -> AttachmentResult<Attachment> {
        self.check(user, card_id, PermissionLevel::Edit).await?;
        self.invalidate_count(card_id).await;

        let mut attachment = self.find_on_card(card_id, attachment_id).await?;
        let handler = self.resolve_handler(&attachment.attachment_type);

        if let Some(handler) = &handler {
            if handler.allow_undo() {
                handler.mark_as_deleted(&mut attachment);
                let attachment = self.mapper.update(&attachment).await?;
                info!(id = attachment_id, card_id, "Attachment marked as deleted");
                return Ok(attachment);
            }
            handler.delete(&attachment).await?;
        }

        let attachment = self.mapper.delete(&attachment).await?;
        info!(id = attachment_id, card_id, "Attachment deleted");
        Ok(attachment)
    }

    /// Undo a soft delete
    #[instrument(skip(self, user), fields(user = %user.uid()))]
    pub async fn restore(
        &self,
        user: &CurrentUser,
        card_id: Id,
        attachment_id: Id,
    ) -> AttachmentResult<Attachment> {
        self.check(user, card_id, PermissionLevel::Edit).await?;
        self.invalidate_count(card_id).await;

        let mut attachment = match self.find_on_card(card_id, attachment_id).await {
            Ok(attachment) => attachment,
            Err(AttachmentError::NotFound(_)) => return Err(AttachmentError::restore_not_allowed()),
            Err(e) => return Err(e),
        };

        match self.resolve_handler(&attachment.attachment_type) {
            Some(handler) if handler.allow_undo() => {
                attachment.deleted_at = None;
                let attachment = self.mapper.update(&attachment).await?;
                info!(id = attachment_id, card_id, "Attachment restored");
                Ok(attachment)
            }
            _ => Err(AttachmentError::restore_not_allowed()),
        }
    }

    /// Permanently remove attachments whose undo window has passed.
    ///
    /// Runs as a system job, so no permission checks apply. Returns the number
    /// of purged records.
    #[instrument(skip(self))]
    pub async fn purge_deleted(&self) -> AttachmentResult<usize> {
        let expired = self.mapper.find_to_delete(None, true).await?;
        let mut purged = 0;

        for attachment in expired {
            let card_id = attachment.card_id;
            if let Some(handler) = self.resolve_handler(&attachment.attachment_type) {
                if let Err(e) = handler.delete(&attachment).await {
                    warn!(id = ?attachment.id, error = %e, "Failed to delete attachment content");
                    continue;
                }
            }
            match self.mapper.delete(&attachment).await {
                Ok(_) => purged += 1,
                Err(e) => warn!(id = ?attachment.id, error = %e, "Failed to purge attachment"),
            }
            self.invalidate_count(card_id).await;
        }

        info!(count = purged, "Deleted attachments purged");
        Ok(purged)
    }
}
