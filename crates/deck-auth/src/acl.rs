//! In-memory board ACL
//!
//! Board owners hold every permission. Any ACL entry matching the user grants
//! read access; the entry flags grant the rest.

use std::collections::HashMap;

use async_trait::async_trait;
use deck_core::config::{AclConfig, ShareConfig};
use deck_core::traits::Id;
use parking_lot::RwLock;
use tracing::debug;

use crate::permissions::{
    CurrentUser, PermissionChecker, PermissionError, PermissionLevel, PermissionResult,
    Permissions, Resource,
};

/// Who an ACL entry applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Participant {
    User(String),
    Group(String),
}

impl Participant {
    fn matches(&self, user: &CurrentUser) -> bool {
        match self {
            Self::User(uid) => uid == user.uid(),
            Self::Group(gid) => user.in_group(gid),
        }
    }
}

/// A board share
#[derive(Debug, Clone)]
pub struct AclEntry {
    pub participant: Participant,
    pub permission_edit: bool,
    pub permission_share: bool,
    pub permission_manage: bool,
}

impl AclEntry {
    /// Read-only share
    pub fn read_only(participant: Participant) -> Self {
        Self {
            participant,
            permission_edit: false,
            permission_share: false,
            permission_manage: false,
        }
    }

    pub fn with_edit(mut self) -> Self {
        self.permission_edit = true;
        self
    }

    pub fn with_share(mut self) -> Self {
        self.permission_share = true;
        self
    }

    pub fn with_manage(mut self) -> Self {
        self.permission_manage = true;
        self
    }

    fn from_config(share: &ShareConfig) -> Option<Self> {
        let participant = match (&share.user, &share.group) {
            (Some(uid), None) => Participant::User(uid.clone()),
            (None, Some(gid)) => Participant::Group(gid.clone()),
            _ => return None,
        };
        Some(Self {
            participant,
            permission_edit: share.edit,
            permission_share: share.share,
            permission_manage: share.manage,
        })
    }
}

#[derive(Debug)]
struct Board {
    owner: String,
    acl: Vec<AclEntry>,
}

#[derive(Default)]
struct AclState {
    boards: HashMap<Id, Board>,
    card_boards: HashMap<Id, Id>,
}

/// In-memory ACL store implementing [`PermissionChecker`]
#[derive(Default)]
pub struct MemoryAcl {
    state: RwLock<AclState>,
}

impl MemoryAcl {
    pub fn new() -> Self {
        Self::default()
    }

    /// ACL seeded with the configured boards, cards and shares
    pub fn from_config(config: &AclConfig) -> Self {
        let acl = Self::new();
        for board in &config.boards {
            acl.add_board(board.id, board.owner.clone());
            for &card in &board.cards {
                acl.add_card(card, board.id);
            }
            for share in &board.shares {
                if let Some(entry) = AclEntry::from_config(share) {
                    acl.share_board(board.id, entry);
                }
            }
        }
        acl
    }

    /// Register a board and its owner
    pub fn add_board(&self, board_id: Id, owner: impl Into<String>) {
        self.state.write().boards.insert(
            board_id,
            Board {
                owner: owner.into(),
                acl: Vec::new(),
            },
        );
    }

    /// Share a board; returns false if the board is unknown
    pub fn share_board(&self, board_id: Id, entry: AclEntry) -> bool {
        match self.state.write().boards.get_mut(&board_id) {
            Some(board) => {
                board.acl.push(entry);
                true
            }
            None => false,
        }
    }

    /// Place a card on a board
    pub fn add_card(&self, card_id: Id, board_id: Id) {
        self.state.write().card_boards.insert(card_id, board_id);
    }

    fn board_id(&self, resource: Resource) -> Option<Id> {
        match resource {
            Resource::Board(id) => Some(id),
            Resource::Card(id) => self.state.read().card_boards.get(&id).copied(),
        }
    }

    /// Effective permissions of `user` on a board
    pub fn permissions(&self, user: &CurrentUser, board_id: Id) -> Permissions {
        let state = self.state.read();
        let Some(board) = state.boards.get(&board_id) else {
            return Permissions::default();
        };

        if board.owner == user.uid() {
            return Permissions::all();
        }

        board
            .acl
            .iter()
            .filter(|entry| entry.participant.matches(user))
            .fold(Permissions::default(), |acc, entry| Permissions {
                read: true,
                edit: acc.edit || entry.permission_edit,
                share: acc.share || entry.permission_share,
                manage: acc.manage || entry.permission_manage,
            })
    }
}

#[async_trait]
impl PermissionChecker for MemoryAcl {
    async fn check_permission(
        &self,
        user: &CurrentUser,
        resource: Resource,
        level: PermissionLevel,
    ) -> PermissionResult<()> {
        let allowed = self
            .board_id(resource)
            .map(|board_id| self.permissions(user, board_id).allows(level))
            .unwrap_or(false);

        if allowed {
            Ok(())
        } else {
            debug!(user = %user.uid(), %resource, %level, "Permission denied");
            Err(PermissionError::Denied { resource, level })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acl() -> MemoryAcl {
        let acl = MemoryAcl::new();
        acl.add_board(1, "owner");
        acl.add_card(10, 1);
        acl
    }

    #[tokio::test]
    async fn test_owner_has_everything() {
        let acl = acl();
        let owner = CurrentUser::new("owner");
        for level in [
            PermissionLevel::Read,
            PermissionLevel::Edit,
            PermissionLevel::Share,
            PermissionLevel::Manage,
        ] {
            assert!(acl
                .check_permission(&owner, Resource::Card(10), level)
                .await
                .is_ok());
        }
    }

    #[tokio::test]
    async fn test_read_only_share() {
        let acl = acl();
        acl.share_board(1, AclEntry::read_only(Participant::User("bob".into())));
        let bob = CurrentUser::new("bob");

        assert!(acl
            .check_permission(&bob, Resource::Card(10), PermissionLevel::Read)
            .await
            .is_ok());
        assert!(matches!(
            acl.check_permission(&bob, Resource::Card(10), PermissionLevel::Edit)
                .await,
            Err(PermissionError::Denied { .. })
        ));
    }

    #[tokio::test]
    async fn test_group_share_grants_edit() {
        let acl = acl();
        acl.share_board(
            1,
            AclEntry::read_only(Participant::Group("team".into())).with_edit(),
        );
        let carol = CurrentUser::new("carol").with_group("team");
        let dave = CurrentUser::new("dave");

        assert!(acl
            .check_permission(&carol, Resource::Board(1), PermissionLevel::Edit)
            .await
            .is_ok());
        assert!(acl
            .check_permission(&dave, Resource::Board(1), PermissionLevel::Read)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_unknown_card_is_denied() {
        let acl = acl();
        let owner = CurrentUser::new("owner");
        assert!(acl
            .check_permission(&owner, Resource::Card(99), PermissionLevel::Read)
            .await
            .is_err());
    }

    #[test]
    fn test_share_unknown_board() {
        let acl = acl();
        assert!(!acl.share_board(5, AclEntry::read_only(Participant::User("x".into()))));
    }

    #[test]
    fn test_entries_are_merged() {
        let acl = acl();
        acl.share_board(1, AclEntry::read_only(Participant::User("erin".into())).with_share());
        acl.share_board(
            1,
            AclEntry::read_only(Participant::Group("leads".into())).with_manage(),
        );
        let erin = CurrentUser::new("erin").with_group("leads");

        let perms = acl.permissions(&erin, 1);
        assert_eq!(
            perms,
            Permissions {
                read: true,
                edit: false,
                share: true,
                manage: true,
            }
        );
    }

    #[tokio::test]
    async fn test_from_config() {
        use deck_core::config::BoardConfig;

        let config = AclConfig {
            boards: vec![BoardConfig {
                id: 1,
                owner: "alice".to_string(),
                cards: vec![7],
                shares: vec![
                    ShareConfig {
                        user: Some("bob".to_string()),
                        ..Default::default()
                    },
                    ShareConfig {
                        group: Some("staff".to_string()),
                        edit: true,
                        ..Default::default()
                    },
                ],
            }],
        };
        let acl = MemoryAcl::from_config(&config);
        let card = Resource::Card(7);

        let alice = CurrentUser::new("alice");
        assert!(acl
            .check_permission(&alice, card, PermissionLevel::Manage)
            .await
            .is_ok());

        let bob = CurrentUser::new("bob");
        assert!(acl.check_permission(&bob, card, PermissionLevel::Read).await.is_ok());
        assert!(acl.check_permission(&bob, card, PermissionLevel::Edit).await.is_err());

        let staff = CurrentUser::new("dave").with_group("staff");
        assert!(acl.check_permission(&staff, card, PermissionLevel::Edit).await.is_ok());

        assert!(acl
            .check_permission(&alice, Resource::Card(8), PermissionLevel::Read)
            .await
            .is_err());
    }
}
