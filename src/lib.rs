//! Pro football reference scrapers
//!
//! Turns season, team, game, player and All-Pro pages into normalized
//! record tables ready for an upserting loader.

pub mod data;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use data::page::Page;
pub use data::table::{Dropped, Filtered, Record, Table};

/// Internal team identifier, e.g. `kan` or `sfo`
pub type TeamId = String;

/// Player identifier as used in profile URLs, e.g. `MahoPa00`
pub type PlayerId = String;

/// A single scalar cell in an emitted record
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Value {
    /// Text cell, with empty strings mapped to null
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Value::Null
        } else {
            Value::Text(s)
        }
    }

    pub fn opt_text(s: Option<impl Into<String>>) -> Self {
        s.map(Value::text).unwrap_or(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Page types the scrapers understand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Season,
    Team,
    Game,
    Player,
    AllPro,
    Week,
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageKind::Season => write!(f, "season"),
            PageKind::Team => write!(f, "team"),
            PageKind::Game => write!(f, "game"),
            PageKind::Player => write!(f, "player"),
            PageKind::AllPro => write!(f, "allpro"),
            PageKind::Week => write!(f, "week"),
        }
    }
}

impl std::str::FromStr for PageKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "season" => Ok(PageKind::Season),
            "team" => Ok(PageKind::Team),
            "game" => Ok(PageKind::Game),
            "player" => Ok(PageKind::Player),
            "allpro" | "all-pro" => Ok(PageKind::AllPro),
            "week" => Ok(PageKind::Week),
            _ => Err(format!(
                "Unknown page kind: {}. Use season, team, game, player, allpro or week.",
                s
            )),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum GridironError {
    #[error("{element} not found on {url}")]
    MissingElement { element: String, url: String },

    #[error("Malformed {element}: {reason}")]
    Malformed { element: String, reason: String },

    #[error("Could not resolve {what} from '{input}'")]
    Unresolved { what: &'static str, input: String },

    #[error(
        "Mismatched value for player_id={player_id}, stat='{stat}': existing='{existing}' vs new='{new}'"
    )]
    StatConflict {
        player_id: String,
        stat: String,
        existing: Value,
        new: Value,
    },

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Invalid selector '{0}'")]
    Selector(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No cached data for {0} (offline mode)")]
    Offline(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GridironError {
    pub fn missing(element: impl Into<String>, url: &str) -> Self {
        GridironError::MissingElement {
            element: element.into(),
            url: url.to_string(),
        }
    }

    pub fn malformed(element: impl Into<String>, reason: impl Into<String>) -> Self {
        GridironError::Malformed {
            element: element.into(),
            reason: reason.into(),
        }
    }

    /// Structural page problems do not resolve by fetching again
    pub fn is_retryable(&self) -> bool {
        match self {
            GridironError::Http(e) => e
                .status()
                .map_or(true, |s| s.is_server_error() || s.as_u16() == 429),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GridironError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub fetch: FetchConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Delay between network requests (the site allows 20 requests per minute)
    pub request_delay_ms: u64,
    pub max_attempts: u32,
    pub cache_dir: Option<String>,
    pub offline_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fetch: FetchConfig {
                base_url: data::scrapers::BASE_URL.to_string(),
                user_agent: "gridiron/0.1".to_string(),
                timeout_secs: 30,
                request_delay_ms: 3100,
                max_attempts: 3,
                cache_dir: None,
                offline_only: false,
            },
            data: DataConfig {
                database_path: "data/gridiron.db".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GridironError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| GridironError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GridironError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_null() {
        assert_eq!(Value::text(""), Value::Null);
        assert_eq!(Value::text("12"), Value::Text("12".to_string()));
        assert_eq!(Value::text("12").as_int(), Some(12));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.fetch.base_url, config.fetch.base_url);
        assert_eq!(parsed.data.database_path, "data/gridiron.db");
    }

    #[test]
    fn test_page_kind_from_str() {
        assert_eq!("Game".parse::<PageKind>(), Ok(PageKind::Game));
        assert_eq!("all-pro".parse::<PageKind>(), Ok(PageKind::AllPro));
        assert!("box".parse::<PageKind>().is_err());
    }
}
