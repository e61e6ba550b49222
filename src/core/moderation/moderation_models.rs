// Moderation domain models - mutes, violations, scheduled messages and stats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A time-bounded suppression of a user's messages in one chat.
///
/// Expiry is lazy: a row past `expires_at` simply stops counting as muted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mute {
    pub chat_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub expires_at: DateTime<Utc>,
}

impl Mute {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// One recorded content denial. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserViolation {
    pub chat_id: i64,
    pub user_id: i64,
    pub violation_type: String,
    pub created_at: DateTime<Utc>,
}

/// A message the bot posted that should disappear at `delete_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporaryMessage {
    pub id: i64,
    pub chat_id: i64,
    pub message_id: String,
    pub delete_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A one-time token a user posts in a group to become its bot admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkToken {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

/// Per-chat counter that filters and mutes bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatField {
    WordViolations,
    LinkViolations,
    ImageViolations,
    VideoViolations,
    AudioViolations,
    FileViolations,
    MuteCount,
}

impl StatField {
    pub const ALL: [StatField; 7] = [
        StatField::WordViolations,
        StatField::LinkViolations,
        StatField::ImageViolations,
        StatField::VideoViolations,
        StatField::AudioViolations,
        StatField::FileViolations,
        StatField::MuteCount,
    ];

    /// Column/field name used by storage.
    pub fn column(self) -> &'static str {
        match self {
            StatField::WordViolations => "word_violations",
            StatField::LinkViolations => "link_violations",
            StatField::ImageViolations => "image_violations",
            StatField::VideoViolations => "video_violations",
            StatField::AudioViolations => "audio_violations",
            StatField::FileViolations => "file_violations",
            StatField::MuteCount => "mute_count",
        }
    }
}

impl std::fmt::Display for StatField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Violation counters for a chat, summed across all days.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatStats {
    pub chat_id: i64,
    pub word_violations: u64,
    pub link_violations: u64,
    pub image_violations: u64,
    pub video_violations: u64,
    pub audio_violations: u64,
    pub file_violations: u64,
    pub mute_count: u64,
}

impl ChatStats {
    pub fn empty(chat_id: i64) -> Self {
        Self {
            chat_id,
            ..Default::default()
        }
    }

    pub fn get(&self, field: StatField) -> u64 {
        match field {
            StatField::WordViolations => self.word_violations,
            StatField::LinkViolations => self.link_violations,
            StatField::ImageViolations => self.image_violations,
            StatField::VideoViolations => self.video_violations,
            StatField::AudioViolations => self.audio_violations,
            StatField::FileViolations => self.file_violations,
            StatField::MuteCount => self.mute_count,
        }
    }

    pub fn add(&mut self, field: StatField, amount: u64) {
        let slot = match field {
            StatField::WordViolations => &mut self.word_violations,
            StatField::LinkViolations => &mut self.link_violations,
            StatField::ImageViolations => &mut self.image_violations,
            StatField::VideoViolations => &mut self.video_violations,
            StatField::AudioViolations => &mut self.audio_violations,
            StatField::FileViolations => &mut self.file_violations,
            StatField::MuteCount => &mut self.mute_count,
        };
        *slot = slot.saturating_add(amount);
    }

    pub fn total_violations(&self) -> u64 {
        StatField::ALL
            .iter()
            .filter(|f| **f != StatField::MuteCount)
            .map(|f| self.get(*f))
            .sum()
    }
}

/// What the violation tracker decided after recording a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Below the threshold - warn only.
    None,
    /// Threshold reached - mute for the given duration.
    Mute(Duration),
}

impl Escalation {
    pub fn should_mute(&self) -> bool {
        matches!(self, Escalation::Mute(_))
    }

    pub fn mute_duration(&self) -> Option<Duration> {
        match self {
            Escalation::Mute(duration) => Some(*duration),
            Escalation::None => None,
        }
    }
}
