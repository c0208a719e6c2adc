use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::application::PollConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub datastore: DatastoreConfig,
    pub commands: CommandConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3333,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatastoreProvider {
    #[default]
    Memory,
    Qdrant,
}

impl FromStr for DatastoreProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "qdrant" => Ok(Self::Qdrant),
            other => Err(ConfigError::Invalid {
                key: "DATASTORE".to_string(),
                message: format!(
                    "unsupported datastore: {other}. Try one of the following: memory, qdrant"
                ),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatastoreConfig {
    pub provider: DatastoreProvider,
    pub qdrant: QdrantConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    pub url: String,
    pub collection_prefix: String,
    pub dimension: usize,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            collection_prefix: "notes".to_string(),
            dimension: 1536,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    pub poll_interval_seconds: u64,
    pub timeout_seconds: u64,
}

impl Default for CommandConfig {
    fn default() -> Self {
        let defaults = PollConfig::default();
        Self {
            poll_interval_seconds: defaults.poll_interval.as_secs(),
            timeout_seconds: defaults.timeout.as_secs(),
        }
    }
}

impl CommandConfig {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            poll_interval: Duration::from_secs(self.poll_interval_seconds),
            timeout: Duration::from_secs(self.timeout_seconds),
        }
    }
}

impl AppConfig {
    /// Loads `APP_CONFIG` (or the default path) and applies environment
    /// overrides. A missing file falls back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("APP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            tracing::warn!(path = %path, "config file not found, using defaults");
            Self::default()
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Applies overrides from `lookup`, which maps an environment variable
    /// name to its value.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(provider) = lookup("DATASTORE") {
            self.datastore.provider = provider.parse()?;
        }
        if let Some(url) = lookup("QDRANT_URL") {
            self.datastore.qdrant.url = url;
        }
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.server.port = parse_number("SERVER_PORT", &port)?;
        }
        if let Some(secs) = lookup("COMMAND_POLL_INTERVAL_SECS") {
            self.commands.poll_interval_seconds = parse_number("COMMAND_POLL_INTERVAL_SECS", &secs)?;
        }
        if let Some(secs) = lookup("COMMAND_TIMEOUT_SECS") {
            self.commands.timeout_seconds = parse_number("COMMAND_TIMEOUT_SECS", &secs)?;
        }
        Ok(self)
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        message: e.to_string(),
    })
}
