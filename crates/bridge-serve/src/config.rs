use bridge_core::bridge::DEFAULT_ROOM_TTL_SECS;
use bridge_video::daily::DEFAULT_API_URL;
use std::str::FromStr;
use thiserror::Error;

use crate::classifier::DEFAULT_MODEL;

pub const DEFAULT_DB_PATH: &str = ".bridge/bridge.db";
pub const DEFAULT_PORT: u16 = 4830;
/// Rooms outliving a day are never what a help call needs.
pub const MAX_ROOM_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Process configuration, read once at startup and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: String,
    pub port: u16,
    pub room_ttl_secs: u64,
    pub daily_api_key: Option<String>,
    pub daily_api_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            port: DEFAULT_PORT,
            room_ttl_secs: DEFAULT_ROOM_TTL_SECS,
            daily_api_key: None,
            daily_api_url: DEFAULT_API_URL.to_string(),
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();
        let room_ttl_secs = parse_or(get("BRIDGE_ROOM_TTL_SECS"), "BRIDGE_ROOM_TTL_SECS", defaults.room_ttl_secs)?;
        if room_ttl_secs == 0 || room_ttl_secs > MAX_ROOM_TTL_SECS {
            return Err(ConfigError::Invalid {
                name: "BRIDGE_ROOM_TTL_SECS",
                value: room_ttl_secs.to_string(),
            });
        }
        Ok(Self {
            db_path: get("BRIDGE_DB_PATH").unwrap_or(defaults.db_path),
            port: parse_or(get("BRIDGE_PORT"), "BRIDGE_PORT", defaults.port)?,
            room_ttl_secs,
            daily_api_key: get("DAILY_API_KEY"),
            daily_api_url: get("DAILY_API_URL").unwrap_or(defaults.daily_api_url),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
