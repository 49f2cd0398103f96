// Entry point: opens the moderated list stored on disk and reports its state.
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize logging
// 3. Open the storage backend and the moderation store

use anyhow::Context;
use moderated_list::infra::storage::JsonFileKvStore;
use moderated_list::{ModerationConfig, ModerationStore};

const DEFAULT_DATA_FILE: &str = "modlist_data.json";

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let data_file =
        std::env::var("MODLIST_DATA_FILE").unwrap_or_else(|_| DEFAULT_DATA_FILE.to_string());

    let mut config = ModerationConfig::default();
    if let Ok(admin) = std::env::var("MODLIST_ADMIN_USERNAME") {
        config.admin_username = admin;
    }
    if let Ok(key) = std::env::var("MODLIST_STORAGE_KEY") {
        config.storage_key = key;
    }

    let kv = JsonFileKvStore::open(&data_file)
        .with_context(|| format!("Failed to open data file {}", data_file))?;
    let store = ModerationStore::open(kv, config).context("Failed to load moderated list")?;

    tracing::info!(
        "Moderated list ready: {} approved items, {} pending changes, {} decided, {} moderators (owner name: {})",
        store.list_approved_items().len(),
        store.list_pending_changes().len(),
        store.list_history().len(),
        store.list_moderators().len(),
        store.admin_username()
    );

    for change in store.list_pending_changes() {
        tracing::info!(
            "Pending {} from {}: {}",
            change.id,
            change.username,
            change.kind
        );
    }

    Ok(())
}
