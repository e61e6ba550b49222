// Chat settings domain model.
//
// One record per chat. Blocked words and domains are always stored normalized
// and de-duplicated, so the filters can match without re-cleaning them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moderation configuration for a single chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    pub chat_id: i64,
    /// Lower-cased, trimmed, de-duplicated.
    pub blocked_words: Vec<String>,
    /// Lower-cased, scheme and trailing slash stripped, de-duplicated.
    pub blocked_domains: Vec<String>,
    pub restrict_image: bool,
    pub restrict_video: bool,
    pub restrict_audio: bool,
    pub restrict_file: bool,
    pub enable_word_filter: bool,
    pub enable_link_filter: bool,
    pub enable_mute: bool,
    pub enable_auto_delete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSettings {
    /// Settings a chat gets the first time we see it: every filter on,
    /// no attachment restrictions.
    pub fn with_defaults(chat_id: i64) -> Self {
        let now = Utc::now();
        Self {
            chat_id,
            blocked_words: Vec::new(),
            blocked_domains: Vec::new(),
            restrict_image: false,
            restrict_video: false,
            restrict_audio: false,
            restrict_file: false,
            enable_word_filter: true,
            enable_link_filter: true,
            enable_mute: true,
            enable_auto_delete: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A boolean setting that admins can flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingToggle {
    WordFilter,
    LinkFilter,
    Mute,
    AutoDelete,
    RestrictImage,
    RestrictVideo,
    RestrictAudio,
    RestrictFile,
}

impl SettingToggle {
    /// Resolve the names used by the admin menus and commands.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "words" | "word_filter" => Some(SettingToggle::WordFilter),
            "links" | "link_filter" => Some(SettingToggle::LinkFilter),
            "mute" => Some(SettingToggle::Mute),
            "autodelete" | "auto_delete" => Some(SettingToggle::AutoDelete),
            "image" => Some(SettingToggle::RestrictImage),
            "video" => Some(SettingToggle::RestrictVideo),
            "audio" => Some(SettingToggle::RestrictAudio),
            "file" | "document" => Some(SettingToggle::RestrictFile),
            _ => None,
        }
    }

    fn flag_mut(self, settings: &mut ChatSettings) -> &mut bool {
        match self {
            SettingToggle::WordFilter => &mut settings.enable_word_filter,
            SettingToggle::LinkFilter => &mut settings.enable_link_filter,
            SettingToggle::Mute => &mut settings.enable_mute,
            SettingToggle::AutoDelete => &mut settings.enable_auto_delete,
            SettingToggle::RestrictImage => &mut settings.restrict_image,
            SettingToggle::RestrictVideo => &mut settings.restrict_video,
            SettingToggle::RestrictAudio => &mut settings.restrict_audio,
            SettingToggle::RestrictFile => &mut settings.restrict_file,
        }
    }

    /// Flip the flag and return its new value.
    pub fn apply(self, settings: &mut ChatSettings) -> bool {
        let flag = self.flag_mut(settings);
        *flag = !*flag;
        *flag
    }
}

/// Normalize a blocked word: trimmed and lower-cased.
pub fn normalize_word(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalize a blocked domain: trimmed, lower-cased, `http://`/`https://`
/// prefix and trailing slashes removed.
pub fn normalize_domain(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let without_http = lowered.strip_prefix("http://").unwrap_or(&lowered);
    let without_scheme = without_http
        .strip_prefix("https://")
        .unwrap_or(without_http);
    without_scheme.trim_end_matches('/').to_string()
}

/// Append normalized entries from `raw` to `existing`, skipping blanks and
/// anything already present. Order of first appearance is kept.
pub fn merge_normalized(
    existing: &[String],
    raw: &[String],
    normalize: fn(&str) -> String,
) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(existing.len() + raw.len());
    for entry in existing.iter().cloned().chain(raw.iter().map(|r| normalize(r))) {
        if !entry.is_empty() && !merged.contains(&entry) {
            merged.push(entry);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_filters() {
        let settings = ChatSettings::with_defaults(42);
        assert!(settings.enable_word_filter);
        assert!(settings.enable_link_filter);
        assert!(settings.enable_mute);
        assert!(settings.enable_auto_delete);
        assert!(!settings.restrict_image);
        assert!(!settings.restrict_file);
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("  HTTPS://Bad.com/ "), "bad.com");
        assert_eq!(normalize_domain("http://spam.org//"), "spam.org");
        assert_eq!(normalize_domain("example.net"), "example.net");
        assert_eq!(normalize_domain("   "), "");
    }

    #[test]
    fn test_merge_normalized_dedupes() {
        let raw = vec!["Bad ".to_string(), "BAD".to_string(), " ".to_string()];
        assert_eq!(merge_normalized(&[], &raw, normalize_word), vec!["bad"]);

        let existing = vec!["bad".to_string()];
        let raw = vec!["worse".to_string(), "Bad".to_string()];
        assert_eq!(
            merge_normalized(&existing, &raw, normalize_word),
            vec!["bad", "worse"]
        );
    }

    #[test]
    fn test_toggle_names_and_apply() {
        let mut settings = ChatSettings::with_defaults(1);

        let toggle = SettingToggle::from_name("links").unwrap();
        assert!(!toggle.apply(&mut settings));
        assert!(!settings.enable_link_filter);
        assert!(toggle.apply(&mut settings));

        assert_eq!(
            SettingToggle::from_name("document"),
            Some(SettingToggle::RestrictFile)
        );
        assert_eq!(SettingToggle::from_name("nonsense"), None);
    }
}
