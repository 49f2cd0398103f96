// Persisted shape of the moderation store.
//
// The whole aggregate is written as one JSON blob:
// { approvedItems, pendingChanges, changeHistory, users, settings, nextChangeId, nextItemId }

use super::moderation_models::{Change, ChangeId, ItemId, ListItem, User};
use crate::core::storage::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub admin_username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreData {
    #[serde(default)]
    pub approved_items: Vec<ListItem>,
    #[serde(default)]
    pub pending_changes: Vec<Change>,
    #[serde(default)]
    pub change_history: Vec<Change>,
    #[serde(default)]
    pub users: BTreeMap<String, User>,
    pub settings: Settings,
    #[serde(default = "first_id")]
    pub next_change_id: u64,
    #[serde(default = "first_id")]
    pub next_item_id: u64,
}

fn first_id() -> u64 {
    1
}

impl StoreData {
    /// Empty store for a fresh installation.
    pub fn new(admin_username: &str) -> Self {
        Self {
            approved_items: Vec::new(),
            pending_changes: Vec::new(),
            change_history: Vec::new(),
            users: BTreeMap::new(),
            settings: Settings {
                admin_username: admin_username.to_string(),
            },
            next_change_id: first_id(),
            next_item_id: first_id(),
        }
    }

    pub fn from_json(blob: &str) -> Result<Self, StoreError> {
        let mut data: StoreData = serde_json::from_str(blob)?;
        data.repair_counters();
        Ok(data)
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn allocate_change_id(&mut self) -> ChangeId {
        let id = ChangeId(self.next_change_id);
        self.next_change_id += 1;
        id
    }

    pub fn allocate_item_id(&mut self) -> ItemId {
        let id = ItemId(self.next_item_id);
        self.next_item_id += 1;
        id
    }

    /// Current position of an item in the approved list.
    pub fn position_of(&self, item_id: ItemId) -> Option<usize> {
        self.approved_items.iter().position(|item| item.id == item_id)
    }

    // A hand-edited or truncated blob may carry counters behind the ids it
    // already uses. Bump them past the highest id seen so ids stay unique.
    fn repair_counters(&mut self) {
        let max_change = self
            .pending_changes
            .iter()
            .chain(self.change_history.iter())
            .map(|c| c.id.0)
            .max()
            .unwrap_or(0);
        self.next_change_id = self.next_change_id.max(max_change + 1);

        let max_item = self
            .approved_items
            .iter()
            .map(|item| item.id.0)
            .chain(
                self.pending_changes
                    .iter()
                    .chain(self.change_history.iter())
                    .filter_map(|c| c.kind.target())
                    .map(|id| id.0),
            )
            .max()
            .unwrap_or(0);
        self.next_item_id = self.next_item_id.max(max_item + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{ChangeKind, Role};
    use chrono::Utc;

    #[test]
    fn test_fresh_store_layout() {
        let data = StoreData::new("Gaidrs");
        let json: serde_json::Value = serde_json::from_str(&data.to_json().unwrap()).unwrap();

        assert_eq!(json["settings"]["adminUsername"], "Gaidrs");
        assert_eq!(json["approvedItems"], serde_json::json!([]));
        assert_eq!(json["pendingChanges"], serde_json::json!([]));
        assert_eq!(json["changeHistory"], serde_json::json!([]));
        assert_eq!(json["users"], serde_json::json!({}));
        assert_eq!(json["nextChangeId"], 1);
    }

    #[test]
    fn test_missing_collections_default_to_empty() {
        let data = StoreData::from_json(r#"{"settings":{"adminUsername":"root"}}"#).unwrap();
        assert_eq!(data, StoreData::new("root"));
    }

    #[test]
    fn test_garbage_blob_is_an_error() {
        assert!(matches!(
            StoreData::from_json("not json"),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_counters_repaired_past_existing_ids() {
        let mut data = StoreData::new("root");
        data.approved_items.push(ListItem {
            id: ItemId(7),
            text: "Widget".to_string(),
        });
        data.pending_changes.push(Change::pending(
            ChangeId(41),
            ChangeKind::Add {
                item: "Gadget".to_string(),
            },
            "alice",
            Utc::now(),
        ));
        data.users.insert(
            "alice".to_string(),
            User {
                password_hash: String::new(),
                role: Role::User,
                registration_date: Utc::now(),
                last_login: None,
            },
        );

        let mut reloaded = StoreData::from_json(&data.to_json().unwrap()).unwrap();
        assert_eq!(reloaded.allocate_change_id(), ChangeId(42));
        assert_eq!(reloaded.allocate_item_id(), ItemId(8));
        assert_eq!(reloaded.users["alice"].role, Role::User);
    }

    #[test]
    fn test_position_of() {
        let mut data = StoreData::new("root");
        for text in ["a", "b", "c"] {
            let id = data.allocate_item_id();
            data.approved_items.push(ListItem {
                id,
                text: text.to_string(),
            });
        }
        assert_eq!(data.position_of(ItemId(3)), Some(2));
        data.approved_items.remove(0);
        assert_eq!(data.position_of(ItemId(3)), Some(1));
        assert_eq!(data.position_of(ItemId(1)), None);
    }
}
