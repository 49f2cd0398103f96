// Core moderation module - the moderated list and its change workflow.

pub mod moderation_models;
pub mod moderation_service;
pub mod snapshot;

pub use moderation_models::*;
pub use moderation_service::*;
