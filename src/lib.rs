// Moderated list store.
//
// **Architecture Overview:**
// - `core/` = Business logic (users, proposals, moderation decisions)
// - `infra/` = Implementations of core traits (key-value storage backends)
//
// A presentation layer builds a `ModerationStore` over one of the infra
// stores and calls its operations; nothing here renders anything.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;

pub use crate::core::moderation::{
    Change, ChangeId, ChangeKind, ChangeStatus, ItemId, ListItem, ModerationConfig,
    ModerationError, ModerationStore, ModeratorSummary, RegisterOutcome, Role, Session,
};
pub use crate::core::storage::{KvStore, StoreError};
