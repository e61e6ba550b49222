// User-facing texts the bot posts in group chats.

use crate::core::duration::format_duration;
use std::time::Duration;

fn display_name(name: &str) -> &str {
    if name.trim().is_empty() {
        "User"
    } else {
        name
    }
}

pub fn warning(user_name: &str, reason: &str) -> String {
    format!("⚠️ {}, {}.", display_name(user_name), reason)
}

pub fn user_muted(user_name: &str, duration: Duration) -> String {
    format!(
        "🔇 {} has been muted for {}.",
        display_name(user_name),
        format_duration(duration)
    )
}

pub const MUTE_USAGE: &str = "Reply to a message with /mute [duration], e.g. /mute 30m.";
pub const MUTE_BAD_DURATION: &str = "Invalid duration. Use values like 90s, 30m, 1h30m or 2h.";
pub const MUTE_NOT_ADMIN: &str = "Only bot admins of this chat can mute users.";
pub const MUTE_FAILED: &str = "Could not mute the user, please try again later.";
pub const LINK_USAGE: &str = "Usage: /link <token>. Get a token from the bot in a private chat.";
pub const LINK_SUCCESS: &str = "✅ This group is now linked. You can manage it from the bot's private chat.";

pub fn link_failed(cause: &str) -> String {
    format!("Could not link this group: {}.", cause)
}
