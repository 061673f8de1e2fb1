//! Permission system for Deck RS
//!
//! Access is granted per board; cards and everything attached to them inherit
//! the permissions of their board.

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use deck_core::traits::Id;
use deck_core::DeckError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Permission Definition
// ============================================================================

/// Permission level required for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Read,
    Edit,
    Share,
    Manage,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Edit => "edit",
            Self::Share => "share",
            Self::Manage => "manage",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource permissions are checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Board(Id),
    Card(Id),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Board(id) => write!(f, "board {}", id),
            Self::Card(id) => write!(f, "card {}", id),
        }
    }
}

/// Effective permissions of a user on one board
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub read: bool,
    pub edit: bool,
    pub share: bool,
    pub manage: bool,
}

impl Permissions {
    pub fn all() -> Self {
        Self {
            read: true,
            edit: true,
            share: true,
            manage: true,
        }
    }

    pub fn allows(&self, level: PermissionLevel) -> bool {
        match level {
            PermissionLevel::Read => self.read,
            PermissionLevel::Edit => self.edit,
            PermissionLevel::Share => self.share,
            PermissionLevel::Manage => self.manage,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("Permission denied: {level} on {resource}")]
    Denied {
        resource: Resource,
        level: PermissionLevel,
    },
    #[error("Permission denied: {0}")]
    NotAllowed(String),
}

pub type PermissionResult<T> = Result<T, PermissionError>;

impl From<PermissionError> for DeckError {
    fn from(err: PermissionError) -> Self {
        DeckError::forbidden(err.to_string())
    }
}

// ============================================================================
// User Context
// ============================================================================

/// The user performing a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub uid: String,
    groups: HashSet<String>,
}

impl CurrentUser {
    /// Create a new current user
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            groups: HashSet::new(),
        }
    }

    /// Add a group membership
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}

// ============================================================================
// Checker
// ============================================================================

/// Authorization seam used by the services
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    /// Succeed if `user` holds `level` on `resource`
    async fn check_permission(
        &self,
        user: &CurrentUser,
        resource: Resource,
        level: PermissionLevel,
    ) -> PermissionResult<()>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user() {
        let user = CurrentUser::new("alice").with_group("staff");
        assert_eq!(user.uid(), "alice");
        assert!(user.in_group("staff"));
        assert!(!user.in_group("admin"));
    }

    #[test]
    fn test_permissions_allows() {
        let perms = Permissions {
            read: true,
            edit: true,
            ..Default::default()
        };
        assert!(perms.allows(PermissionLevel::Read));
        assert!(perms.allows(PermissionLevel::Edit));
        assert!(!perms.allows(PermissionLevel::Share));
        assert!(Permissions::all().allows(PermissionLevel::Manage));
    }

    #[test]
    fn test_denied_maps_to_forbidden() {
        let err = PermissionError::Denied {
            resource: Resource::Card(7),
            level: PermissionLevel::Edit,
        };
        assert_eq!(err.to_string(), "Permission denied: edit on card 7");
        assert_eq!(DeckError::from(err).status_code(), 403);
    }
}
