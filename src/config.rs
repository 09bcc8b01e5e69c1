//! Configuration for the Vecho server.
//!
//! Every value has a default; [`AppConfig::from_env`] layers environment
//! overrides on top and [`AppConfig::validate`] checks the result.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::conversations::DEFAULT_LIMIT;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range or malformed.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// The upstream base URL does not parse.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenience result alias for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Models tried in order when choosing the upstream model, most stable first.
pub const PREFERRED_MODELS: [&str; 4] = [
    "gemini-1.5-flash",
    "gemini-1.5-pro",
    "gemini-pro",
    "gemini-2.0-flash-exp",
];

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub storage: StorageConfig,
    /// Upstream generation API settings.
    pub upstream: UpstreamConfig,
}

impl AppConfig {
    /// Build a configuration from defaults plus environment overrides.
    ///
    /// # Errors
    /// Returns an error if an override cannot be parsed.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(port) = env_parse::<u16>("VECHO_PORT")?.or(env_parse::<u16>("PORT")?) {
            config.server.port = port;
        }
        if let Some(bind) = env_string("VECHO_BIND") {
            config.server.bind = bind;
        }
        if let Some(dir) = env_string("VECHO_STATIC_DIR") {
            config.server.static_dir = PathBuf::from(dir);
        }
        if let Some(path) = env_string("VECHO_DB_PATH") {
            config.storage.sqlite_path = PathBuf::from(path);
        }
        if let Some(key) = env_string("GEMINI_API_KEY") {
            config.upstream.api_key = Some(key);
        }
        if let Some(base_url) = env_string("VECHO_GEMINI_URL") {
            config.upstream.base_url = base_url;
        }
        if let Some(models) = env_string("VECHO_MODELS") {
            config.upstream.preferred_models = models
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(secs) = env_parse::<u64>("VECHO_REQUEST_TIMEOUT_SECS")? {
            config.upstream.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be > 0".to_string()));
        }

        if self.server.history_limit == 0 {
            return Err(ConfigError::Invalid(
                "server.history_limit must be > 0".to_string(),
            ));
        }

        if self.upstream.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "upstream.request_timeout must be > 0".to_string(),
            ));
        }

        if self.upstream.connect_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "upstream.connect_timeout must be > 0".to_string(),
            ));
        }

        if self.upstream.preferred_models.is_empty() {
            return Err(ConfigError::Invalid(
                "upstream.preferred_models must not be empty".to_string(),
            ));
        }

        if self.upstream.assistant_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "upstream.assistant_name must not be empty".to_string(),
            ));
        }

        Url::parse(&self.upstream.base_url)?;

        Ok(())
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    pub bind: String,
    /// Listening port.
    pub port: u16,
    /// Directory served for non-API paths.
    pub static_dir: PathBuf,
    /// Number of exchanges returned by the history endpoint.
    pub history_limit: usize,
    /// Default number of conversations returned by the recents endpoint.
    pub recent_chats_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
            static_dir: PathBuf::from("frontend"),
            history_limit: 50,
            recent_chats_limit: DEFAULT_LIMIT,
        }
    }
}

/// Database settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("database/chat.db"),
        }
    }
}

/// Upstream generation API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// API base URL.
    pub base_url: String,
    /// API version path segment.
    pub api_version: String,
    /// API key; requests fail upstream without one.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Model preference order.
    pub preferred_models: Vec<String>,
    /// Name the assistant introduces itself with in prompts.
    pub assistant_name: String,
    /// Bound on a single upstream call.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Bound on establishing a connection.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_version: "v1beta".to_string(),
            api_key: None,
            preferred_models: PREFERRED_MODELS.iter().map(ToString::to_string).collect(),
            assistant_name: "Vecho Ai".to_string(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> ConfigResult<Option<T>> {
    match env_string(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{key} has an invalid value: {raw}"))),
        None => Ok(None),
    }
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.recent_chats_limit, 10);
        assert_eq!(config.upstream.preferred_models[0], "gemini-1.5-flash");
    }

    #[test]
    fn test_recent_chats_default_matches_segmenter() {
        assert_eq!(ServerConfig::default().recent_chats_limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.upstream.preferred_models.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.upstream.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Url(_))));

        let mut config = AppConfig::default();
        config.upstream.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let upstream = UpstreamConfig {
            api_key: Some("secret".to_string()),
            ..UpstreamConfig::default()
        };
        let json = serde_json::to_string(&upstream).unwrap_or_default();
        assert!(!json.contains("secret"));
    }
}
