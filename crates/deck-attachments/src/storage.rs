//! Storage Abstraction
//!
//! Blob storage behind file-backed attachment handlers. Keys look like
//! `file-card-{cardId}/{filename}`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use deck_core::traits::Id;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Invalid storage key: {0}")]
    InvalidPath(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// What storage knows about a stored blob
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    /// MIME type guessed from the key
    pub content_type: String,
    pub last_modified: Option<DateTime<Utc>>,
}

impl FileMetadata {
    fn of(key: &str, size: u64, last_modified: Option<DateTime<Utc>>) -> Self {
        Self {
            size,
            content_type: guess_content_type(key),
            last_modified,
        }
    }
}

/// Blob store used by file attachments
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `content` under `key`, replacing what was there
    async fn put(&self, key: &str, content: Bytes) -> StorageResult<FileMetadata>;

    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Remove `key`; a missing key is not an error
    async fn delete(&self, key: &str) -> StorageResult<()>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    async fn metadata(&self, key: &str) -> StorageResult<FileMetadata>;

    /// Backend name for logs and health reports
    fn name(&self) -> &str;
}

/// Storage key of a card's file
pub fn file_key(card_id: Id, filename: &str) -> String {
    format!("file-card-{}/{}", card_id, filename)
}

/// MIME type for a file name, `application/octet-stream` when unknown
pub fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Files under a root directory
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key below the root; only plain relative components are accepted
    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        let plain = !key.is_empty()
            && !key.contains('\\')
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !plain {
            return Err(StorageError::InvalidPath(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

async fn write_file(partial: &Path, content: &[u8], target: &Path) -> std::io::Result<()> {
    let mut file = fs::File::create(partial).await?;
    file.write_all(content).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(partial, target).await
}

fn not_found(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |e| match e.kind() {
        std::io::ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
        _ => StorageError::Io(e),
    }
}

#[async_trait]
impl Storage for LocalStorage {
    /// Writes to a uniquely named hidden sibling and renames it into place
    #[instrument(skip(self, content), fields(storage = "local", size = content.len()))]
    async fn put(&self, key: &str, content: Bytes) -> StorageResult<FileMetadata> {
        let path = self.path_for(key)?;
        let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
            return Err(StorageError::InvalidPath(key.to_string()));
        };
        fs::create_dir_all(dir).await?;

        let partial = dir.join(format!(
            ".{}.{}.part",
            name.to_string_lossy(),
            Uuid::new_v4()
        ));
        if let Err(e) = write_file(&partial, &content, &path).await {
            fs::remove_file(&partial).await.ok();
            return Err(e.into());
        }

        debug!(path = %path.display(), "File written");
        Ok(FileMetadata::of(key, content.len() as u64, Some(Utc::now())))
    }

    #[instrument(skip(self), fields(storage = "local"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.path_for(key)?;
        let content = fs::read(&path).await.map_err(not_found(key))?;
        Ok(Bytes::from(content))
    }

    #[instrument(skip(self), fields(storage = "local"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await.map_err(not_found(key)) {
            Ok(()) => {
                debug!(path = %path.display(), "File removed");
                Ok(())
            }
            Err(StorageError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(fs::try_exists(self.path_for(key)?).await?)
    }

    async fn metadata(&self, key: &str) -> StorageResult<FileMetadata> {
        let path = self.path_for(key)?;
        let stat = fs::metadata(&path).await.map_err(not_found(key))?;
        if !stat.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        let modified = stat.modified().ok().map(DateTime::<Utc>::from);

        Ok(FileMetadata::of(key, stat.len(), modified))
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Process-local storage for tests and ephemeral setups
#[derive(Default)]
pub struct MemoryStorage {
    blobs: DashMap<String, (Bytes, FileMetadata)>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, key: &str, content: Bytes) -> StorageResult<FileMetadata> {
        let metadata = FileMetadata::of(key, content.len() as u64, Some(Utc::now()));
        self.blobs
            .insert(key.to_string(), (content, metadata.clone()));
        Ok(metadata)
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.blobs
            .get(key)
            .map(|entry| entry.0.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.blobs.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.blobs.contains_key(key))
    }

    async fn metadata(&self, key: &str) -> StorageResult<FileMetadata> {
        self.blobs
            .get(key)
            .map(|entry| entry.1.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
