//! # deck-attachments
//!
//! Card attachments for Deck RS.
//!
//! ## Features
//!
//! - Pluggable per-type handlers (`deck_file` built in)
//! - Soft delete with restore for types that allow undo
//! - Cached per-card attachment counts
//! - Storage abstraction (local filesystem, in-memory)
//!
//! ## Example
//!
//! ```rust,ignore
//! use deck_attachments::{AttachmentService, MemoryAttachmentMapper, MemoryCache, MemoryStorage, Upload};
//! use std::sync::Arc;
//!
//! let service = AttachmentService::new(
//!     Arc::new(MemoryAttachmentMapper::default()),
//!     acl,
//!     Arc::new(MemoryCache::new("deck-card-attachments-")),
//!     Arc::new(MemoryStorage::new()),
//!     Default::default(),
//! );
//!
//! let attachment = service
//!     .create_with_upload(&user, 7, "deck_file", "", Some(Upload::new("report.pdf", bytes)))
//!     .await?;
//! ```

pub mod cache;
pub mod error;
pub mod file;
pub mod handler;
pub mod mapper;
pub mod model;
pub mod service;
pub mod storage;

pub use cache::{Cache, MemoryCache};
pub use error::{AttachmentError, AttachmentResult};
pub use file::{FileAttachmentHandler, PathInfo};
pub use handler::{AttachmentHandler, HandlerRegistry};
pub use mapper::{AttachmentMapper, MemoryAttachmentMapper};
pub use model::{Attachment, AttachmentContent, Upload, FILE_ATTACHMENT_TYPE};
pub use service::{AttachmentConfig, AttachmentService};
pub use storage::{
    file_key, guess_content_type, FileMetadata, LocalStorage, MemoryStorage, Storage, StorageError,
    StorageResult,
};
