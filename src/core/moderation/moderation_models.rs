// Moderation domain models - users, list items and proposed changes.
//
// These are pure domain types with no storage dependencies.
// The snapshot module decides how they are laid out in the persisted blob.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a registered user. Ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Owner,
}

impl Role {
    /// Moderators and the owner may approve or reject changes.
    pub fn can_moderate(self) -> bool {
        matches!(self, Role::Moderator | Role::Owner)
    }

    /// Only the owner may assign or remove moderators.
    pub fn can_manage_roles(self) -> bool {
        self == Role::Owner
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Moderator => write!(f, "moderator"),
            Role::Owner => write!(f, "owner"),
        }
    }
}

/// A registered account. The username is the key of the users map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Argon2id PHC string, never the plaintext password.
    pub password_hash: String,
    pub role: Role,
    pub registration_date: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Durable identity of an approved item. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item-{}", self.0)
    }
}

/// Identity of a proposed change, unique across pending and history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(pub u64);

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An entry of the approved list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: ItemId,
    pub text: String,
}

/// What a change does to the approved list once approved.
///
/// Edit and delete keep the index the proposer saw plus the id of the item
/// that sat there, so approval can find the item even if the list shifted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChangeKind {
    Add {
        item: String,
    },
    #[serde(rename_all = "camelCase")]
    Edit {
        item_id: ItemId,
        index: usize,
        old_value: String,
        new_value: String,
    },
    #[serde(rename_all = "camelCase")]
    Delete {
        item_id: ItemId,
        index: usize,
        old_value: String,
    },
}

impl ChangeKind {
    /// The item an edit or delete targets. Adds have no target yet.
    pub fn target(&self) -> Option<ItemId> {
        match self {
            ChangeKind::Add { .. } => None,
            ChangeKind::Edit { item_id, .. } | ChangeKind::Delete { item_id, .. } => Some(*item_id),
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Add { item } => write!(f, "Add: \"{}\"", item),
            ChangeKind::Edit {
                old_value,
                new_value,
                ..
            } => write!(f, "Edit: \"{}\" -> \"{}\"", old_value, new_value),
            ChangeKind::Delete { old_value, .. } => write!(f, "Delete: \"{}\"", old_value),
        }
    }
}

/// Lifecycle of a change. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Pending,
    Approved,
    Rejected,
}

impl ChangeStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ChangeStatus::Pending)
    }
}

/// Who decided a change, when, and (for rejections) why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub moderator: String,
    pub action_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A proposed mutation of the approved list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub id: ChangeId,
    pub kind: ChangeKind,
    /// The proposer.
    pub username: String,
    pub timestamp: DateTime<Utc>,
    pub status: ChangeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
}

impl Change {
    /// Create a new pending change.
    pub fn pending(id: ChangeId, kind: ChangeKind, proposer: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            kind,
            username: proposer.to_string(),
            timestamp,
            status: ChangeStatus::Pending,
            decision: None,
        }
    }

    /// Consume a pending change and produce its approved history entry.
    pub fn into_approved(self, moderator: &str, at: DateTime<Utc>) -> Self {
        self.decide(ChangeStatus::Approved, moderator, at, None)
    }

    /// Consume a pending change and produce its rejected history entry.
    pub fn into_rejected(self, moderator: &str, at: DateTime<Utc>, reason: String) -> Self {
        self.decide(ChangeStatus::Rejected, moderator, at, Some(reason))
    }

    fn decide(
        mut self,
        status: ChangeStatus,
        moderator: &str,
        at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Self {
        debug_assert_eq!(self.status, ChangeStatus::Pending);
        self.status = status;
        self.decision = Some(Decision {
            moderator: moderator.to_string(),
            action_date: at,
            reason,
        });
        self
    }
}

/// The identity of whoever is logged in. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    /// Role as of login time.
    pub role: Role,
}

impl Session {
    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}

/// Result of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterOutcome {
    pub role: Role,
}

impl RegisterOutcome {
    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}

/// A moderator as shown in the owner's moderator list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeratorSummary {
    pub username: String,
    pub registration_date: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_privileges() {
        assert!(!Role::User.can_moderate());
        assert!(Role::Moderator.can_moderate());
        assert!(Role::Owner.can_moderate());

        assert!(!Role::User.can_manage_roles());
        assert!(!Role::Moderator.can_manage_roles());
        assert!(Role::Owner.can_manage_roles());
    }

    #[test]
    fn test_change_decisions_are_terminal() {
        let now = Utc::now();
        let change = Change::pending(
            ChangeId(1),
            ChangeKind::Add {
                item: "Widget".to_string(),
            },
            "alice",
            now,
        );
        assert!(!change.status.is_terminal());
        assert!(change.decision.is_none());

        let rejected = change.into_rejected("bob", now, "Duplicate".to_string());
        assert_eq!(rejected.status, ChangeStatus::Rejected);
        assert!(rejected.status.is_terminal());
        let decision = rejected.decision.unwrap();
        assert_eq!(decision.moderator, "bob");
        assert_eq!(decision.reason.as_deref(), Some("Duplicate"));
    }

    #[test]
    fn test_change_kind_serializes_with_type_tag() {
        let kind = ChangeKind::Edit {
            item_id: ItemId(3),
            index: 0,
            old_value: "a".to_string(),
            new_value: "b".to_string(),
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "edit");
        assert_eq!(json["itemId"], 3);
        assert_eq!(json["oldValue"], "a");
        assert_eq!(json["newValue"], "b");
        assert_eq!(kind.target(), Some(ItemId(3)));
    }

    #[test]
    fn test_change_kind_display() {
        let kind = ChangeKind::Delete {
            item_id: ItemId(1),
            index: 2,
            old_value: "Gadget".to_string(),
        };
        assert_eq!(kind.to_string(), "Delete: \"Gadget\"");
    }
}
