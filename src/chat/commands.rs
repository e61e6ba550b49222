// Group chat commands: `/mute [duration]` (as a reply) and `/link <token>`.

use crate::core::duration::parse_duration;
use crate::core::moderation::ModerationError;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupCommand<'a> {
    Mute { duration: Option<&'a str> },
    Link { token: Option<&'a str> },
}

/// Recognize a command at the start of a message. Plain text yields `None`.
pub fn parse_group_command(text: &str) -> Option<GroupCommand<'_>> {
    let mut parts = text.split_whitespace();
    let head = parts.next()?;
    let arg = parts.next();
    match head {
        "/mute" => Some(GroupCommand::Mute { duration: arg }),
        "/link" => Some(GroupCommand::Link { token: arg }),
        _ => None,
    }
}

/// Duration for `/mute`: the argument if given, otherwise `default`.
pub fn parse_mute_duration(arg: Option<&str>, default: Duration) -> Result<Duration, ModerationError> {
    match arg {
        None => Ok(default),
        Some(raw) => parse_duration(raw).map_err(|e| ModerationError::Validation(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_group_command() {
        assert_eq!(
            parse_group_command("/mute 1h30m"),
            Some(GroupCommand::Mute {
                duration: Some("1h30m")
            })
        );
        assert_eq!(
            parse_group_command("/mute"),
            Some(GroupCommand::Mute { duration: None })
        );
        assert_eq!(
            parse_group_command("/link abc123 extra"),
            Some(GroupCommand::Link {
                token: Some("abc123")
            })
        );
        assert_eq!(parse_group_command("hello /mute"), None);
        assert_eq!(parse_group_command("/muted"), None);
        assert_eq!(parse_group_command(""), None);
    }

    #[test]
    fn test_parse_mute_duration() {
        let default = Duration::from_secs(30 * 60);
        assert_eq!(parse_mute_duration(None, default).unwrap(), default);
        assert_eq!(
            parse_mute_duration(Some("90s"), default).unwrap(),
            Duration::from_secs(90)
        );
        assert_eq!(
            parse_mute_duration(Some("1h30m"), default).unwrap(),
            Duration::from_secs(5400)
        );
        assert!(matches!(
            parse_mute_duration(Some("soon"), default),
            Err(ModerationError::Validation(_))
        ));
        assert!(matches!(
            parse_mute_duration(Some("10"), default),
            Err(ModerationError::Validation(_))
        ));
    }
}
