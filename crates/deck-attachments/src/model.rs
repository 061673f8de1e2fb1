//! Attachment Model
//!
//! One attachment on a card. `data` is interpreted by the handler registered
//! for `attachment_type`; `extended_data` is derived for presentation and is
//! never persisted.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use deck_core::traits::{Id, Identifiable, SoftDeletable, Timestamped};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Type tag of file-backed attachments
pub const FILE_ATTACHMENT_TYPE: &str = "deck_file";

/// An attachment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Attachment ID, `None` until inserted
    pub id: Option<Id>,
    /// Owning card
    pub card_id: Id,
    /// Type tag selecting the handler
    #[serde(rename = "type")]
    pub attachment_type: String,
    /// Handler-interpreted payload
    pub data: String,
    /// UID of the creating user
    pub created_by: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub last_modified: DateTime<Utc>,
    /// Soft-delete marker; serialized as `0` when unset
    #[serde(with = "unix_or_zero", default)]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Presentation-only fields filled in by the handler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_data: Option<serde_json::Value>,
}

impl Attachment {
    /// Create a new, not yet persisted attachment
    pub fn new(
        card_id: Id,
        attachment_type: impl Into<String>,
        data: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            card_id,
            attachment_type: attachment_type.into(),
            data: data.into(),
            created_by: created_by.into(),
            created_at: now,
            last_modified: now,
            deleted_at: None,
            extended_data: None,
        }
    }

    /// Bump the modification timestamp
    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    /// Copy without derived fields, as it is stored
    pub fn persisted(&self) -> Self {
        Self {
            extended_data: None,
            ..self.clone()
        }
    }
}

impl Identifiable for Attachment {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Timestamped for Attachment {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }
}

impl SoftDeletable for Attachment {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// A file uploaded together with a create or update request
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content: Bytes,
}

impl Upload {
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Renderable content of an attachment
#[derive(Debug, Clone)]
pub struct AttachmentContent {
    pub filename: String,
    pub content_type: String,
    pub content: Bytes,
}

impl AttachmentContent {
    /// Value for the `Content-Disposition` header
    pub fn content_disposition(&self) -> String {
        let disposition = if self.is_inline() { "inline" } else { "attachment" };
        format!(
            "{}; filename=\"{}\"",
            disposition,
            self.filename.replace('"', "")
        )
    }

    /// Hex SHA-256 of the content
    pub fn etag(&self) -> String {
        hex::encode(Sha256::digest(&self.content))
    }

    /// Images, PDFs and plain text are shown in the browser
    pub fn is_inline(&self) -> bool {
        self.content_type.starts_with("image/")
            || self.content_type.starts_with("text/plain")
            || self.content_type == "application/pdf"
    }
}

/// Unix seconds with `0` standing for "unset"
mod unix_or_zero {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.map_or(0, |at| at.timestamp()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<i64>::deserialize(deserializer)?.unwrap_or(0) {
            0 => Ok(None),
            secs => DateTime::from_timestamp(secs, 0)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {}", secs))),
        }
    }
}
