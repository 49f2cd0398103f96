// Moderation store - core business logic for the moderated list.
//
// This service handles:
// - Registration and login (owner assignment by admin name)
// - Proposals (add / edit / delete) from any registered user
// - Approve / reject decisions by moderators and the owner
// - Moderator assignment by the owner
//
// Every mutating call is applied to a working copy of the state, saved as one
// blob through the KvStore, and only then swapped in. A failed call leaves
// both memory and storage untouched.

use super::moderation_models::{
    Change, ChangeId, ChangeKind, ListItem, ModeratorSummary, RegisterOutcome, Role, Session, User,
};
use super::snapshot::StoreData;
use crate::core::credentials::{CredentialError, CredentialHasher, HashingConfig};
use crate::core::storage::{KvStore, StoreError};
use chrono::Utc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Username '{0}' is already taken")]
    DuplicateUser(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User '{0}' not found")]
    UnknownUser(String),

    #[error("Item index {index} is out of range (list has {len} items)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("'{username}' needs {required} rights for this action")]
    InsufficientPrivilege { username: String, required: Role },

    #[error("Change {0} not found")]
    ChangeNotFound(ChangeId),

    #[error("User '{0}' is already a moderator")]
    AlreadyModerator(String),

    #[error("User '{0}' is not a moderator")]
    NotAModerator(String),

    #[error("The owner's role cannot be changed")]
    OwnerRoleLocked(String),

    #[error("Change {change_id} targets an item that no longer exists")]
    TargetItemMissing { change_id: ChangeId },

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Default name of the account that becomes owner on registration.
pub const DEFAULT_ADMIN_USERNAME: &str = "Gaidrs";
/// Default key the whole state blob is stored under.
pub const DEFAULT_STORAGE_KEY: &str = "globalListData";
/// Reason recorded when a rejection comes without one.
pub const DEFAULT_REJECT_REASON: &str = "No reason given";

#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Registering under this name makes the account the owner.
    /// Only used when the store is initialized; afterwards the persisted value wins.
    pub admin_username: String,

    /// Key of the state blob in the KvStore.
    pub storage_key: String,

    /// Argon2 cost for new password hashes.
    pub hashing: HashingConfig,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            admin_username: DEFAULT_ADMIN_USERNAME.to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            hashing: HashingConfig::default(),
        }
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// The moderated list and everything needed to change it.
///
/// Generic over S: KvStore so the backing storage can be swapped.
pub struct ModerationStore<S: KvStore> {
    kv: S,
    storage_key: String,
    hasher: CredentialHasher,
    data: StoreData,
    session: Option<Session>,
}

impl<S: KvStore> ModerationStore<S> {
    /// Load the store from `kv`, initializing and saving a fresh one if the
    /// key holds nothing yet.
    pub fn open(kv: S, config: ModerationConfig) -> Result<Self, ModerationError> {
        let hasher = CredentialHasher::new(config.hashing)?;

        let data = match kv.load(&config.storage_key)? {
            Some(blob) => {
                let data = StoreData::from_json(&blob)?;
                tracing::debug!(
                    "Loaded moderation state: {} users, {} items, {} pending, {} decided",
                    data.users.len(),
                    data.approved_items.len(),
                    data.pending_changes.len(),
                    data.change_history.len()
                );
                if data.settings.admin_username != config.admin_username {
                    tracing::debug!(
                        "Keeping persisted admin username '{}' over configured '{}'",
                        data.settings.admin_username,
                        config.admin_username
                    );
                }
                data
            }
            None => {
                tracing::info!(
                    "No saved state under '{}', initializing a new list",
                    config.storage_key
                );
                let data = StoreData::new(&config.admin_username);
                kv.save(&config.storage_key, &data.to_json()?)?;
                data
            }
        };

        Ok(Self {
            kv,
            storage_key: config.storage_key,
            hasher,
            data,
            session: None,
        })
    }

    /// Apply `f` to a copy of the state, persist the copy, then keep it.
    fn commit<T>(
        &mut self,
        f: impl FnOnce(&mut StoreData) -> Result<T, ModerationError>,
    ) -> Result<T, ModerationError> {
        let mut next = self.data.clone();
        let out = f(&mut next)?;

        let blob = next.to_json()?;
        if let Err(e) = self.kv.save(&self.storage_key, &blob) {
            tracing::error!("Failed to persist moderation state: {}", e);
            return Err(e.into());
        }

        self.data = next;
        Ok(out)
    }

    fn require_user(data: &StoreData, username: &str) -> Result<(), ModerationError> {
        if data.users.contains_key(username) {
            Ok(())
        } else {
            Err(ModerationError::UnknownUser(username.to_string()))
        }
    }

    fn require_moderator(&self, username: &str) -> Result<(), ModerationError> {
        match self.data.users.get(username) {
            Some(user) if user.role.can_moderate() => Ok(()),
            _ => {
                tracing::warn!("Denied moderation action to '{}'", username);
                Err(ModerationError::InsufficientPrivilege {
                    username: username.to_string(),
                    required: Role::Moderator,
                })
            }
        }
    }

    fn require_owner(&self, username: &str) -> Result<(), ModerationError> {
        match self.data.users.get(username) {
            Some(user) if user.role.can_manage_roles() => Ok(()),
            _ => {
                tracing::warn!("Denied role management to '{}'", username);
                Err(ModerationError::InsufficientPrivilege {
                    username: username.to_string(),
                    required: Role::Owner,
                })
            }
        }
    }

    fn pending_position(&self, change_id: ChangeId) -> Result<usize, ModerationError> {
        self.data
            .pending_changes
            .iter()
            .position(|c| c.id == change_id)
            .ok_or(ModerationError::ChangeNotFound(change_id))
    }

    // ------------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------------

    /// Create an account. The configured admin name becomes the owner.
    pub fn register(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<RegisterOutcome, ModerationError> {
        if self.data.users.contains_key(username) {
            return Err(ModerationError::DuplicateUser(username.to_string()));
        }

        let password_hash = self.hasher.hash(password)?;
        let role = if username == self.data.settings.admin_username {
            Role::Owner
        } else {
            Role::User
        };

        self.commit(|data| {
            data.users.insert(
                username.to_string(),
                User {
                    password_hash,
                    role,
                    registration_date: Utc::now(),
                    last_login: None,
                },
            );
            Ok(())
        })?;

        tracing::info!("Registered '{}' as {}", username, role);
        Ok(RegisterOutcome { role })
    }

    /// Check credentials, record the login time and start a session.
    pub fn login(&mut self, username: &str, password: &str) -> Result<Session, ModerationError> {
        let role = match self.data.users.get(username) {
            Some(user) if self.hasher.verify(password, &user.password_hash) => user.role,
            _ => return Err(ModerationError::InvalidCredentials),
        };

        self.commit(|data| {
            if let Some(user) = data.users.get_mut(username) {
                user.last_login = Some(Utc::now());
            }
            Ok(())
        })?;

        let session = Session {
            username: username.to_string(),
            role,
        };
        self.session = Some(session.clone());
        tracing::info!("'{}' logged in as {}", username, role);
        Ok(session)
    }

    /// End the current session. Returns the session that was active, if any.
    pub fn logout(&mut self) -> Option<Session> {
        let ended = self.session.take();
        if let Some(session) = &ended {
            tracing::info!("'{}' logged out", session.username);
        }
        ended
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    // ------------------------------------------------------------------------
    // Proposals
    // ------------------------------------------------------------------------

    fn enqueue(&mut self, kind: ChangeKind, proposer: &str) -> Result<ChangeId, ModerationError> {
        let id = self.commit(|data| {
            Self::require_user(data, proposer)?;
            let id = data.allocate_change_id();
            data.pending_changes
                .push(Change::pending(id, kind, proposer, Utc::now()));
            Ok(id)
        })?;

        tracing::debug!("'{}' proposed change {}", proposer, id);
        Ok(id)
    }

    fn item_at(&self, index: usize) -> Result<&ListItem, ModerationError> {
        self.data
            .approved_items
            .get(index)
            .ok_or(ModerationError::IndexOutOfRange {
                index,
                len: self.data.approved_items.len(),
            })
    }

    /// Propose appending `item` to the list.
    pub fn propose_add(
        &mut self,
        item: impl Into<String>,
        proposer: &str,
    ) -> Result<ChangeId, ModerationError> {
        self.enqueue(ChangeKind::Add { item: item.into() }, proposer)
    }

    /// Propose replacing the text of the item at `index`.
    pub fn propose_edit(
        &mut self,
        index: usize,
        new_value: impl Into<String>,
        proposer: &str,
    ) -> Result<ChangeId, ModerationError> {
        Self::require_user(&self.data, proposer)?;
        let target = self.item_at(index)?;
        let kind = ChangeKind::Edit {
            item_id: target.id,
            index,
            old_value: target.text.clone(),
            new_value: new_value.into(),
        };
        self.enqueue(kind, proposer)
    }

    /// Propose removing the item at `index`.
    pub fn propose_delete(
        &mut self,
        index: usize,
        proposer: &str,
    ) -> Result<ChangeId, ModerationError> {
        Self::require_user(&self.data, proposer)?;
        let target = self.item_at(index)?;
        let kind = ChangeKind::Delete {
            item_id: target.id,
            index,
            old_value: target.text.clone(),
        };
        self.enqueue(kind, proposer)
    }

    // ------------------------------------------------------------------------
    // Moderation decisions
    // ------------------------------------------------------------------------

    /// Apply a pending change to the list and move it to history.
    ///
    /// Edits and deletes are applied to the item they were proposed against,
    /// wherever it sits now. If that item was removed in the meantime the
    /// call fails with [`ModerationError::TargetItemMissing`] and the change
    /// stays pending.
    pub fn approve(
        &mut self,
        change_id: ChangeId,
        moderator: &str,
    ) -> Result<Change, ModerationError> {
        self.require_moderator(moderator)?;
        let position = self.pending_position(change_id)?;

        let decided = self.commit(|data| {
            let change = data.pending_changes.remove(position);

            match &change.kind {
                ChangeKind::Add { item } => {
                    let id = data.allocate_item_id();
                    data.approved_items.push(ListItem {
                        id,
                        text: item.clone(),
                    });
                }
                ChangeKind::Edit {
                    item_id,
                    index,
                    new_value,
                    ..
                } => {
                    let current = data
                        .position_of(*item_id)
                        .ok_or(ModerationError::TargetItemMissing { change_id })?;
                    if current != *index {
                        tracing::warn!(
                            "Change {} targets {} which moved from index {} to {}",
                            change_id,
                            item_id,
                            index,
                            current
                        );
                    }
                    data.approved_items[current].text = new_value.clone();
                }
                ChangeKind::Delete { item_id, index, .. } => {
                    let current = data
                        .position_of(*item_id)
                        .ok_or(ModerationError::TargetItemMissing { change_id })?;
                    if current != *index {
                        tracing::warn!(
                            "Change {} targets {} which moved from index {} to {}",
                            change_id,
                            item_id,
                            index,
                            current
                        );
                    }
                    data.approved_items.remove(current);
                }
            }

            let decided = change.into_approved(moderator, Utc::now());
            data.change_history.push(decided.clone());
            Ok(decided)
        })?;

        tracing::info!("'{}' approved change {}", moderator, change_id);
        Ok(decided)
    }

    /// Move a pending change to history without touching the list.
    /// A blank reason is recorded as [`DEFAULT_REJECT_REASON`].
    pub fn reject(
        &mut self,
        change_id: ChangeId,
        moderator: &str,
        reason: &str,
    ) -> Result<Change, ModerationError> {
        self.require_moderator(moderator)?;
        let position = self.pending_position(change_id)?;

        let reason = match reason.trim() {
            "" => DEFAULT_REJECT_REASON.to_string(),
            given => given.to_string(),
        };

        let decided = self.commit(|data| {
            let change = data.pending_changes.remove(position);
            let decided = change.into_rejected(moderator, Utc::now(), reason);
            data.change_history.push(decided.clone());
            Ok(decided)
        })?;

        tracing::info!("'{}' rejected change {}", moderator, change_id);
        Ok(decided)
    }

    // ------------------------------------------------------------------------
    // Role management
    // ------------------------------------------------------------------------

    fn target_role(&self, username: &str) -> Result<Role, ModerationError> {
        match self.data.users.get(username) {
            None => Err(ModerationError::UnknownUser(username.to_string())),
            Some(user) if user.role == Role::Owner => {
                Err(ModerationError::OwnerRoleLocked(username.to_string()))
            }
            Some(user) => Ok(user.role),
        }
    }

    fn set_role(&mut self, username: &str, role: Role) -> Result<(), ModerationError> {
        self.commit(|data| {
            let user = data
                .users
                .get_mut(username)
                .ok_or_else(|| ModerationError::UnknownUser(username.to_string()))?;
            user.role = role;
            Ok(())
        })
    }

    /// Make `username` a moderator. Only the owner may do this.
    pub fn promote(&mut self, username: &str, owner: &str) -> Result<(), ModerationError> {
        self.require_owner(owner)?;
        if self.target_role(username)? == Role::Moderator {
            return Err(ModerationError::AlreadyModerator(username.to_string()));
        }

        self.set_role(username, Role::Moderator)?;
        tracing::info!("'{}' promoted '{}' to moderator", owner, username);
        Ok(())
    }

    /// Take moderator rights away from `username`. Only the owner may do this.
    pub fn demote(&mut self, username: &str, owner: &str) -> Result<(), ModerationError> {
        self.require_owner(owner)?;
        if self.target_role(username)? != Role::Moderator {
            return Err(ModerationError::NotAModerator(username.to_string()));
        }

        self.set_role(username, Role::User)?;
        tracing::info!("'{}' demoted '{}' to user", owner, username);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn list_approved_items(&self) -> Vec<String> {
        self.data
            .approved_items
            .iter()
            .map(|item| item.text.clone())
            .collect()
    }

    /// Approved items together with their durable ids.
    pub fn list_items(&self) -> Vec<ListItem> {
        self.data.approved_items.clone()
    }

    /// Pending changes in moderation queue order.
    pub fn list_pending_changes(&self) -> Vec<Change> {
        self.data.pending_changes.clone()
    }

    pub fn pending_change(&self, change_id: ChangeId) -> Option<Change> {
        self.data
            .pending_changes
            .iter()
            .find(|c| c.id == change_id)
            .cloned()
    }

    /// Decided changes, oldest decision first.
    pub fn list_history(&self) -> Vec<Change> {
        self.data.change_history.clone()
    }

    pub fn list_moderators(&self) -> Vec<ModeratorSummary> {
        self.data
            .users
            .iter()
            .filter(|(_, user)| user.role == Role::Moderator)
            .map(|(username, user)| ModeratorSummary {
                username: username.clone(),
                registration_date: user.registration_date,
                last_login: user.last_login,
            })
            .collect()
    }

    pub fn user_role(&self, username: &str) -> Option<Role> {
        self.data.users.get(username).map(|user| user.role)
    }

    pub fn admin_username(&self) -> &str {
        &self.data.settings.admin_username
    }

    /// The state serialized exactly as it is persisted.
    pub fn snapshot(&self) -> Result<String, ModerationError> {
        Ok(self.data.to_json()?)
    }
}

// ============================================================================
// TESTS
// ============================================================================
