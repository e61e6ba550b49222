// The infra module contains implementations of core traits.
// Each adapter family goes in its own submodule.

#[path = "sqlite/mod.rs"]
pub mod sqlite;

#[path = "metrics/mod.rs"]
pub mod metrics;

#[path = "platform/mod.rs"]
pub mod platform;
