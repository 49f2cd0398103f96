// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "credentials/mod.rs"]
pub mod credentials;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "storage/mod.rs"]
pub mod storage;
