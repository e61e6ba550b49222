// Pipeline domain models.
//
// These are pure domain types with no platform dependencies. The chat layer
// builds a `Payload` from each inbound message and turns a denying
// `FilterResult` into platform actions.

use std::time::Duration;

/// One inbound chat message, as seen by the filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub chat_id: i64,
    pub sender_id: i64,
    pub text: String,
    /// Raw attachment type names reported by the platform (`image`, `video`, ...).
    pub attachment_types: Vec<String>,
}

impl Payload {
    pub fn new(chat_id: i64, sender_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            sender_id,
            text: text.into(),
            attachment_types: Vec::new(),
        }
    }

    pub fn with_attachments<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attachment_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Key the rate limiter buckets messages by.
    pub fn sender_key(&self) -> (i64, i64) {
        (self.chat_id, self.sender_id)
    }
}

/// Outcome of one filter, or of the whole pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterResult {
    pub is_allowed: bool,
    pub reason: String,
    pub filter_name: String,
    pub should_delete: bool,
    pub should_mute: bool,
    pub mute_duration: Option<Duration>,
}

impl FilterResult {
    /// Allow the message. No other field is set.
    pub fn allow() -> Self {
        Self {
            is_allowed: true,
            reason: String::new(),
            filter_name: String::new(),
            should_delete: false,
            should_mute: false,
            mute_duration: None,
        }
    }

    /// Deny the message on behalf of `filter_name`.
    pub fn deny(filter_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            is_allowed: false,
            reason: reason.into(),
            filter_name: filter_name.into(),
            should_delete: false,
            should_mute: false,
            mute_duration: None,
        }
    }

    /// Ask the caller to remove the message regardless of auto-delete.
    pub fn with_delete(mut self) -> Self {
        self.should_delete = true;
        self
    }

    /// Ask the caller to mute the sender for `duration`.
    pub fn with_mute(mut self, duration: Duration) -> Self {
        self.should_mute = true;
        self.mute_duration = Some(duration);
        self
    }
}

/// Attachment categories the settings can restrict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Video,
    Audio,
    File,
}

impl AttachmentKind {
    pub fn from_type(raw: &str) -> Option<Self> {
        match raw {
            "image" => Some(AttachmentKind::Image),
            "video" => Some(AttachmentKind::Video),
            "audio" => Some(AttachmentKind::Audio),
            "file" | "document" => Some(AttachmentKind::File),
            _ => None,
        }
    }

    pub fn filter_name(self) -> &'static str {
        match self {
            AttachmentKind::Image => "image_filter",
            AttachmentKind::Video => "video_filter",
            AttachmentKind::Audio => "audio_filter",
            AttachmentKind::File => "file_filter",
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            AttachmentKind::Image => reasons::IMAGE_RESTRICTED,
            AttachmentKind::Video => reasons::VIDEO_RESTRICTED,
            AttachmentKind::Audio => reasons::AUDIO_RESTRICTED,
            AttachmentKind::File => reasons::FILE_RESTRICTED,
        }
    }
}

/// Human-readable denial reasons.
pub mod reasons {
    pub const RATE_LIMIT: &str = "you are sending messages too fast";
    pub const PROHIBITED_WORD: &str = "your message contains a prohibited word";
    pub const PROHIBITED_DOMAIN: &str = "your message contains a link to a prohibited domain";
    pub const IMAGE_RESTRICTED: &str = "images are not allowed in this chat";
    pub const VIDEO_RESTRICTED: &str = "videos are not allowed in this chat";
    pub const AUDIO_RESTRICTED: &str = "audio messages are not allowed in this chat";
    pub const FILE_RESTRICTED: &str = "files are not allowed in this chat";
    pub const PERSISTENT_VIOLATION: &str =
        "you have been muted for 24 hours for repeated rule violations";

    /// Reason for a muted sender's message, including when the mute ends.
    pub fn user_muted(until: chrono::DateTime<chrono::Utc>) -> String {
        format!(
            "you are muted until {}",
            until.format("%d %b %y %H:%M UTC")
        )
    }
}
