//! Core entity traits shared by Deck models

use chrono::{DateTime, Utc};

/// Primary key type
pub type Id = i64;

/// Trait for entities that have a primary key
pub trait Identifiable {
    fn id(&self) -> Option<Id>;
    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }
    fn is_new_record(&self) -> bool {
        !self.is_persisted()
    }
}

/// Trait for entities with creation and modification timestamps
pub trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
    fn last_modified(&self) -> DateTime<Utc>;
}

/// Trait for soft-deletable entities
pub trait SoftDeletable {
    fn deleted_at(&self) -> Option<DateTime<Utc>>;
    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
    /// Whether the entity was soft deleted before `cutoff`
    fn deleted_before(&self, cutoff: DateTime<Utc>) -> bool {
        self.deleted_at().map_or(false, |at| at < cutoff)
    }
}
