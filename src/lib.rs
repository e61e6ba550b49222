// Chat moderation bot library.
//
// **Architecture Overview:**
// - `core/` = Moderation pipeline, escalation and background reconciliation (platform-agnostic)
// - `infra/` = Implementations of core traits (SQLite, HTTP platform client, Prometheus)
// - `chat/` = Chat-platform adapter (inbound group messages, enforcement, commands)
//
// The binary in `main.rs` is only the composition root.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "chat/chat_layer.rs"]
pub mod chat;
#[path = "infra/infra_layer.rs"]
pub mod infra;

pub mod config;
