//! # deck-auth
//!
//! Authorization for Deck RS.
//!
//! ## Features
//!
//! - Permission levels matching Deck's board ACL (read, edit, share, manage)
//! - The acting user passed to every service call
//! - `PermissionChecker` seam consumed by the services
//! - In-memory board ACL implementation

pub mod acl;
pub mod permissions;

pub use acl::{AclEntry, MemoryAcl, Participant};
pub use permissions::{
    CurrentUser, PermissionChecker, PermissionError, PermissionLevel, PermissionResult,
    Permissions, Resource,
};
