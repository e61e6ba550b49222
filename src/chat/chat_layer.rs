// Chat layer - turns inbound group messages into moderation calls and carries
// out enforcement on the platform. Transport (webhooks, long polling) lives
// outside the crate and hands us `IncomingMessage`s.

pub mod commands;
pub mod message_handler;
pub mod responses;

pub use message_handler::{IncomingMessage, MessageAuthor, MessageHandler, WARNING_TTL};
