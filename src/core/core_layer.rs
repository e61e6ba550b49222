// The core module contains all moderation business logic.
// Each feature gets its own submodule; none of them know about SQLite, HTTP or
// the chat platform's wire format.

pub mod duration;
pub mod errors;
pub mod metrics;
pub mod platform;

#[path = "settings/mod.rs"]
pub mod settings;

#[path = "pipeline/mod.rs"]
pub mod pipeline;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "reconciliation/mod.rs"]
pub mod reconciliation;

#[cfg(test)]
pub mod test_support;
