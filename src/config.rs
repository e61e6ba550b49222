// Bot configuration loaded from the environment (after `.env`).

use crate::core::duration::parse_duration;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PLATFORM_API_URL: &str = "https://platform-api.example.com";
const DEFAULT_DATABASE_URL: &str = "sqlite://data/moderation.db";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_MUTE_DURATION: Duration = Duration::from_secs(30 * 60);
const DEFAULT_RATE_LIMIT_MESSAGES: usize = 5;
const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(1);
const DEFAULT_METRICS_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 9090));

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub bot_token: String,
    pub platform_api_url: String,
    pub database_url: String,
    pub enable_cache: bool,
    pub default_mute_duration: Duration,
    pub log_level: String,
    pub rate_limit_messages: usize,
    pub rate_limit_window: Duration,
    /// Where `GET /metrics` is served.
    pub metrics_addr: SocketAddr,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("BOT_TOKEN").ok_or(ConfigError::Missing("BOT_TOKEN"))?;

        Ok(Self {
            bot_token,
            platform_api_url: get("PLATFORM_API_URL")
                .unwrap_or_else(|| DEFAULT_PLATFORM_API_URL.to_string()),
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            enable_cache: parse_or("ENABLE_CACHE", get("ENABLE_CACHE"), false, parse_bool)?,
            default_mute_duration: parse_or(
                "DEFAULT_MUTE_DURATION",
                get("DEFAULT_MUTE_DURATION"),
                DEFAULT_MUTE_DURATION,
                |raw| parse_duration(raw).ok().filter(|d| !d.is_zero()),
            )?,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            rate_limit_messages: parse_or(
                "RATE_LIMIT_MESSAGES",
                get("RATE_LIMIT_MESSAGES"),
                DEFAULT_RATE_LIMIT_MESSAGES,
                |raw| raw.parse::<usize>().ok().filter(|n| *n > 0),
            )?,
            rate_limit_window: parse_or(
                "RATE_LIMIT_WINDOW",
                get("RATE_LIMIT_WINDOW"),
                DEFAULT_RATE_LIMIT_WINDOW,
                |raw| parse_duration(raw).ok().filter(|d| !d.is_zero()),
            )?,
            metrics_addr: parse_or(
                "METRICS_ADDR",
                get("METRICS_ADDR"),
                DEFAULT_METRICS_ADDR,
                parse_socket_addr,
            )?,
        })
    }
}

fn parse_or<T>(
    key: &'static str,
    raw: Option<String>,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => parse(value.trim()).ok_or(ConfigError::Invalid { key, value }),
    }
}

/// `host:port`, or `:port` for every interface.
fn parse_socket_addr(raw: &str) -> Option<SocketAddr> {
    match raw.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port).parse().ok(),
        None => raw.parse().ok(),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("BOT_TOKEN", "secret")]).unwrap();

        assert_eq!(config.bot_token, "secret");
        assert_eq!(config.platform_api_url, DEFAULT_PLATFORM_API_URL);
        assert_eq!(config.database_url, "sqlite://data/moderation.db");
        assert!(!config.enable_cache);
        assert_eq!(config.default_mute_duration, Duration::from_secs(1800));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.rate_limit_messages, 5);
        assert_eq!(config.rate_limit_window, Duration::from_secs(1));
        assert_eq!(config.metrics_addr, "0.0.0.0:9090".parse().unwrap());
    }

    #[test]
    fn test_metrics_addr() {
        let config = load(&[("BOT_TOKEN", "t"), ("METRICS_ADDR", ":9100")]).unwrap();
        assert_eq!(config.metrics_addr, "0.0.0.0:9100".parse().unwrap());

        let config = load(&[("BOT_TOKEN", "t"), ("METRICS_ADDR", "127.0.0.1:8080")]).unwrap();
        assert_eq!(config.metrics_addr, "127.0.0.1:8080".parse().unwrap());

        assert!(matches!(
            load(&[("BOT_TOKEN", "t"), ("METRICS_ADDR", "nowhere")]),
            Err(ConfigError::Invalid {
                key: "METRICS_ADDR",
                ..
            })
        ));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("BOT_TOKEN", "secret"),
            ("ENABLE_CACHE", "true"),
            ("DEFAULT_MUTE_DURATION", "1h30m"),
            ("RATE_LIMIT_MESSAGES", "10"),
            ("RATE_LIMIT_WINDOW", "500ms"),
            ("LOG_LEVEL", "debug"),
        ])
        .unwrap();

        assert!(config.enable_cache);
        assert_eq!(config.default_mute_duration, Duration::from_secs(5400));
        assert_eq!(config.rate_limit_messages, 10);
        assert_eq!(config.rate_limit_window, Duration::from_millis(500));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_missing_token() {
        assert_eq!(load(&[]), Err(ConfigError::Missing("BOT_TOKEN")));
        assert_eq!(
            load(&[("BOT_TOKEN", "  ")]),
            Err(ConfigError::Missing("BOT_TOKEN"))
        );
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            load(&[("BOT_TOKEN", "t"), ("ENABLE_CACHE", "maybe")]),
            Err(ConfigError::Invalid {
                key: "ENABLE_CACHE",
                value: "maybe".to_string()
            })
        );
        assert!(matches!(
            load(&[("BOT_TOKEN", "t"), ("DEFAULT_MUTE_DURATION", "soon")]),
            Err(ConfigError::Invalid {
                key: "DEFAULT_MUTE_DURATION",
                ..
            })
        ));
        assert!(matches!(
            load(&[("BOT_TOKEN", "t"), ("RATE_LIMIT_MESSAGES", "0")]),
            Err(ConfigError::Invalid {
                key: "RATE_LIMIT_MESSAGES",
                ..
            })
        ));
    }
}
