use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Internet Archive
    pub ia_base_url: String,
    pub ia_uploader: String,

    // TMDB
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: String,
    pub tmdb_match_strategy: MatchStrategy,

    // Database
    pub database_path: PathBuf,

    // Sync scheduler (zero disables interval runs)
    pub sync_interval: Duration,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
}

/// How archive titles are matched against the TMDB search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Accept the first search result for the raw title.
    FirstResult,
    /// Strip a trailing `(YYYY)` from the title and constrain the search
    /// to that release year.
    TitleYear,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Internet Archive
            ia_base_url: env_or_default("IA_BASE_URL", "https://archive.org"),
            ia_uploader: required_env("IA_UPLOADER")?,

            // TMDB
            tmdb_api_key: optional_env("TMDB_API_KEY"),
            tmdb_base_url: env_or_default("TMDB_BASE_URL", "https://api.themoviedb.org/3"),
            tmdb_match_strategy: parse_match_strategy(&env_or_default(
                "TMDB_MATCH_STRATEGY",
                "first-result",
            ))?,

            // Database
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/registry.sqlite")),

            // Sync scheduler
            sync_interval: Duration::from_secs(parse_env_u64("SYNC_INTERVAL_SECS", 0)?),

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ia_uploader.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "IA_UPLOADER".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.ia_base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "IA_BASE_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.tmdb_base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "TMDB_BASE_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Baseline configuration for tests. Override individual fields with
    /// struct update syntax.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            ia_base_url: "https://archive.org".to_string(),
            ia_uploader: "test-uploader".to_string(),
            tmdb_api_key: None,
            tmdb_base_url: "https://api.themoviedb.org/3".to_string(),
            tmdb_match_strategy: MatchStrategy::FirstResult,
            database_path: PathBuf::from("./data/test-registry.sqlite"),
            sync_interval: Duration::ZERO,
            web_host: "127.0.0.1".to_string(),
            web_port: 0,
        }
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_match_strategy(value: &str) -> Result<MatchStrategy, ConfigError> {
    match value.to_lowercase().as_str() {
        "first-result" => Ok(MatchStrategy::FirstResult),
        "title-year" => Ok(MatchStrategy::TitleYear),
        _ => Err(ConfigError::InvalidValue {
            name: "TMDB_MATCH_STRATEGY".to_string(),
            message: format!("must be 'first-result' or 'title-year', got '{value}'"),
        }),
    }
}
