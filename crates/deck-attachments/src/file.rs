//! File-backed attachments (`deck_file`)
//!
//! The payload is the file name; content lives in storage under
//! `file-card-{cardId}/{filename}`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::{AttachmentError, AttachmentResult};
use crate::handler::AttachmentHandler;
use crate::model::{Attachment, AttachmentContent, Upload};
use crate::storage::{file_key, guess_content_type, Storage, StorageError};

/// `pathinfo()`-style breakdown of the file name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathInfo {
    pub dirname: String,
    pub basename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub filename: String,
}

impl PathInfo {
    pub fn of(name: &str) -> Self {
        let path = Path::new(name);
        let dirname = path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| ".".to_string());
        let component = |s: Option<&std::ffi::OsStr>| s.map(|s| s.to_string_lossy().into_owned());

        Self {
            dirname,
            basename: component(path.file_name()).unwrap_or_default(),
            extension: component(path.extension()),
            filename: component(path.file_stem()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FileDetails {
    filesize: u64,
    mimetype: String,
    info: PathInfo,
}

/// Handler for attachments stored as files
pub struct FileAttachmentHandler {
    storage: Arc<dyn Storage>,
    max_upload_size: u64,
}

impl FileAttachmentHandler {
    pub fn new(storage: Arc<dyn Storage>, max_upload_size: u64) -> Self {
        Self {
            storage,
            max_upload_size,
        }
    }

    fn validate<'a>(&self, upload: Option<&'a Upload>) -> AttachmentResult<&'a Upload> {
        let upload = upload.ok_or_else(|| AttachmentError::InvalidFile("No file uploaded".into()))?;

        let name = upload.filename.trim();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(AttachmentError::InvalidFile(format!(
                "Invalid file name: {}",
                upload.filename
            )));
        }

        if upload.size() > self.max_upload_size {
            return Err(AttachmentError::FileTooLarge {
                size: upload.size(),
                max: self.max_upload_size,
            });
        }

        Ok(upload)
    }
}

#[async_trait]
impl AttachmentHandler for FileAttachmentHandler {
    #[instrument(skip(self, attachment, upload), fields(card_id = attachment.card_id))]
    async fn create(
        &self,
        attachment: &mut Attachment,
        upload: Option<&Upload>,
    ) -> AttachmentResult<()> {
        let upload = self.validate(upload)?;
        let key = file_key(attachment.card_id, &upload.filename);

        if self.storage.exists(&key).await? {
            return Err(AttachmentError::Conflict("File already exists.".into()));
        }

        self.storage.put(&key, upload.content.clone()).await?;
        attachment.data = upload.filename.clone();

        info!(key = %key, size = upload.size(), storage = self.storage.name(), "Attachment file stored");
        Ok(())
    }

    #[instrument(skip(self, attachment, upload), fields(card_id = attachment.card_id))]
    async fn update(
        &self,
        attachment: &mut Attachment,
        upload: Option<&Upload>,
    ) -> AttachmentResult<()> {
        let upload = self.validate(upload)?;
        let key = file_key(attachment.card_id, &upload.filename);

        self.storage.put(&key, upload.content.clone()).await?;
        attachment.data = upload.filename.clone();

        info!(key = %key, size = upload.size(), "Attachment file replaced");
        Ok(())
    }

    async fn extend_data(&self, attachment: &mut Attachment) -> AttachmentResult<()> {
        let key = file_key(attachment.card_id, &attachment.data);
        let metadata = self.storage.metadata(&key).await.map_err(|e| match e {
            StorageError::NotFound(_) => AttachmentError::ContentNotFound(attachment.data.clone()),
            other => other.into(),
        })?;

        let details = FileDetails {
            filesize: metadata.size,
            mimetype: metadata.content_type,
            info: PathInfo::of(&attachment.data),
        };
        attachment.extended_data = serde_json::to_value(details).ok();
        Ok(())
    }

    async fn display(&self, attachment: &Attachment) -> AttachmentResult<AttachmentContent> {
        let key = file_key(attachment.card_id, &attachment.data);
        let content = self.storage.get(&key).await.map_err(|e| match e {
            StorageError::NotFound(_) => AttachmentError::ContentNotFound(attachment.data.clone()),
            other => other.into(),
        })?;

        Ok(AttachmentContent {
            filename: attachment.data.clone(),
            content_type: guess_content_type(&attachment.data),
            content,
        })
    }

    fn allow_undo(&self) -> bool {
        true
    }

    async fn delete(&self, attachment: &Attachment) -> AttachmentResult<()> {
        let key = file_key(attachment.card_id, &attachment.data);
        self.storage.delete(&key).await?;
        debug!(key = %key, "Attachment file removed");
        Ok(())
    }
}
