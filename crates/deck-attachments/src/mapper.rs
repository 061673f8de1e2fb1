//! Attachment persistence
//!
//! The mapper owns storage of attachment records only; derived fields are
//! stripped before anything is stored.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use deck_core::traits::{Id, SoftDeletable};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AttachmentError, AttachmentResult};
use crate::model::Attachment;
use crate::storage::StorageError;

/// Attachment store trait
#[async_trait]
pub trait AttachmentMapper: Send + Sync {
    /// Get an attachment by ID, soft deleted or not
    async fn find(&self, id: Id) -> AttachmentResult<Attachment>;

    /// Non-deleted attachments of a card
    async fn find_all(&self, card_id: Id) -> AttachmentResult<Vec<Attachment>>;

    /// Soft-deleted attachments, optionally restricted to one card.
    /// With `purge_eligible_only`, only those whose undo window has passed.
    async fn find_to_delete(
        &self,
        card_id: Option<Id>,
        purge_eligible_only: bool,
    ) -> AttachmentResult<Vec<Attachment>>;

    /// Insert a new record and return it with its assigned ID
    async fn insert(&self, attachment: &Attachment) -> AttachmentResult<Attachment>;

    /// Update an existing record
    async fn update(&self, attachment: &Attachment) -> AttachmentResult<Attachment>;

    /// Remove a record permanently
    async fn delete(&self, attachment: &Attachment) -> AttachmentResult<Attachment>;
}

/// On-disk form of the records
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    next_id: Id,
    attachments: Vec<Attachment>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRef<'a> {
    next_id: Id,
    attachments: &'a [Attachment],
}

/// In-memory attachment mapper, optionally written through to a JSON file
pub struct MemoryAttachmentMapper {
    attachments: RwLock<Vec<Attachment>>,
    next_id: AtomicI64,
    undo_window: Duration,
    snapshot: Option<PathBuf>,
}

impl Default for MemoryAttachmentMapper {
    fn default() -> Self {
        Self::new(Duration::minutes(5))
    }
}

impl MemoryAttachmentMapper {
    pub fn new(undo_window: Duration) -> Self {
        Self {
            attachments: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
            undo_window,
            snapshot: None,
        }
    }

    /// Mapper persisted to `path`, loading the records already there.
    ///
    /// Every mutation rewrites the whole file.
    pub async fn open(path: impl Into<PathBuf>, undo_window: Duration) -> AttachmentResult<Self> {
        let path = path.into();
        let snapshot = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Snapshot>(&bytes).map_err(invalid_data)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(StorageError::Io(e).into()),
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await.map_err(StorageError::from)?;
        }

        let next_id = snapshot
            .attachments
            .iter()
            .filter_map(|a| a.id)
            .map(|id| id + 1)
            .chain([snapshot.next_id, 1])
            .max()
            .unwrap_or(1);
        info!(
            path = %path.display(),
            records = snapshot.attachments.len(),
            "Attachment records loaded"
        );

        Ok(Self {
            attachments: RwLock::new(snapshot.attachments),
            next_id: AtomicI64::new(next_id),
            undo_window,
            snapshot: Some(path),
        })
    }

    /// Write the records through to the snapshot file, if there is one
    async fn save(&self, attachments: &[Attachment]) -> AttachmentResult<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };

        let json = serde_json::to_vec(&SnapshotRef {
            next_id: self.next_id.load(Ordering::SeqCst),
            attachments,
        })
        .map_err(invalid_data)?;
        write_replacing(path, &json)
            .await
            .map_err(StorageError::from)?;

        debug!(path = %path.display(), records = attachments.len(), "Attachment records saved");
        Ok(())
    }
}

fn invalid_data(e: serde_json::Error) -> StorageError {
    StorageError::Io(io::Error::new(io::ErrorKind::InvalidData, e))
}

async fn write_replacing(path: &Path, content: &[u8]) -> io::Result<()> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let partial = path.with_file_name(format!(".{}.{}.part", name, Uuid::new_v4()));

    let written = async {
        fs::write(&partial, content).await?;
        fs::rename(&partial, path).await
    }
    .await;
    if written.is_err() {
        fs::remove_file(&partial).await.ok();
    }
    written
}

#[async_trait]
impl AttachmentMapper for MemoryAttachmentMapper {
    async fn find(&self, id: Id) -> AttachmentResult<Attachment> {
        let attachments = self.attachments.read().await;
        attachments
            .iter()
            .find(|a| a.id == Some(id))
            .cloned()
            .ok_or(AttachmentError::NotFound(id))
    }

    async fn find_all(&self, card_id: Id) -> AttachmentResult<Vec<Attachment>> {
        let attachments = self.attachments.read().await;
        Ok(attachments
            .iter()
            .filter(|a| a.card_id == card_id && !a.is_deleted())
            .cloned()
            .collect())
    }

    async fn find_to_delete(
        &self,
        card_id: Option<Id>,
        purge_eligible_only: bool,
    ) -> AttachmentResult<Vec<Attachment>> {
        let cutoff = Utc::now() - self.undo_window;
        let attachments = self.attachments.read().await;
        Ok(attachments
            .iter()
            .filter(|a| card_id.map_or(true, |id| a.card_id == id))
            .filter(|a| {
                if purge_eligible_only {
                    a.deleted_before(cutoff)
                } else {
                    a.is_deleted()
                }
            })
            .cloned()
            .collect())
    }

    async fn insert(&self, attachment: &Attachment) -> AttachmentResult<Attachment> {
        let mut stored = attachment.persisted();
        stored.id = Some(self.next_id.fetch_add(1, Ordering::SeqCst));

        let mut attachments = self.attachments.write().await;
        attachments.push(stored.clone());
        if let Err(e) = self.save(&attachments).await {
            attachments.pop();
            return Err(e);
        }

        Ok(stored)
    }

    async fn update(&self, attachment: &Attachment) -> AttachmentResult<Attachment> {
        let id = attachment.id.ok_or(AttachmentError::NotFound(0))?;
        let mut attachments = self.attachments.write().await;
        let slot = attachments
            .iter_mut()
            .find(|a| a.id == Some(id))
            .ok_or(AttachmentError::NotFound(id))?;
        let previous = std::mem::replace(slot, attachment.persisted());
        let stored = slot.clone();

        if let Err(e) = self.save(&attachments).await {
            if let Some(slot) = attachments.iter_mut().find(|a| a.id == Some(id)) {
                *slot = previous;
            }
            return Err(e);
        }
        Ok(stored)
    }

    async fn delete(&self, attachment: &Attachment) -> AttachmentResult<Attachment> {
        let id = attachment.id.ok_or(AttachmentError::NotFound(0))?;
        let mut attachments = self.attachments.write().await;
        let pos = attachments
            .iter()
            .position(|a| a.id == Some(id))
            .ok_or(AttachmentError::NotFound(id))?;
        let removed = attachments.remove(pos);

        if let Err(e) = self.save(&attachments).await {
            attachments.insert(pos, removed);
            return Err(e);
        }
        Ok(removed)
    }
}
