// Per-chat settings: the model, the storage port and the TTL cache in front of it.

pub mod settings_cache;
pub mod settings_models;
pub mod settings_store;

pub use settings_cache::{SettingsRepository, SETTINGS_CACHE_TTL};
pub use settings_models::*;
pub use settings_store::SettingsStore;
