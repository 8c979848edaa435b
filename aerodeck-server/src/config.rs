//! Server configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via AERODECK_CONFIG or --config)
//! 3. Environment variables

use aerodeck_cluster::{MemoryClusterConfig, DEFAULT_PORT};
use aerodeck_core::ConnectionSettings;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "AERODECK_CONFIG";

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP API configuration.
    pub http: HttpConfig,
    /// Cluster connection defaults.
    pub cluster: ClusterConfig,
    /// In-memory cluster definition.
    pub memory: MemoryClusterConfig,
    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

impl Config {
    /// Loads configuration from the file named by AERODECK_CONFIG, then
    /// applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
        Self::load_from(path.as_deref())
    }

    /// Loads configuration from an optional file, then applies environment
    /// variable overrides and validates the result.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from a variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.http.apply_overrides(&lookup);
        self.cluster.apply_overrides(&lookup);
        self.metrics.apply_overrides(&lookup);
    }

    /// Checks values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.http.validate()
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }
}

fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// HTTP API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Address to bind to.
    #[serde(with = "socket_addr_serde")]
    pub bind_addr: SocketAddr,
    /// Path prefix of every API route, e.g. `/api`. Empty mounts at the root.
    pub api_prefix: String,
    /// Maximum accepted request body size.
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            api_prefix: "/api".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl HttpConfig {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("AERODECK_BIND") {
            if let Ok(parsed) = addr.parse() {
                self.bind_addr = parsed;
            }
        }

        if let Some(prefix) = lookup("AERODECK_API_PREFIX") {
            self.api_prefix = prefix;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.api_prefix.is_empty()
            && (!self.api_prefix.starts_with('/') || self.api_prefix.ends_with('/'))
        {
            return Err(ConfigError::ValidationError(format!(
                "api_prefix must start with '/' and not end with '/': {:?}",
                self.api_prefix
            )));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_body_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Cluster connection defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Seed host used when a connect request omits it.
    pub default_host: String,
    /// Seed port used when a connect request omits it.
    pub default_port: u16,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Store user keys with written records.
    pub send_key: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            default_host: "localhost".to_string(),
            default_port: DEFAULT_PORT,
            connect_timeout_secs: 10,
            send_key: true,
        }
    }
}

impl ClusterConfig {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("AERODECK_DEFAULT_HOST") {
            self.default_host = host;
        }

        if let Some(port) = lookup("AERODECK_DEFAULT_PORT") {
            if let Ok(port) = port.parse() {
                self.default_port = port;
            }
        }

        if let Some(timeout) = lookup("AERODECK_CONNECT_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.connect_timeout_secs = secs;
            }
        }

        if let Some(send_key) = lookup("AERODECK_SEND_KEY") {
            self.send_key = parse_bool(&send_key);
        }
    }

    /// Returns the connect timeout as Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Returns the defaults applied to connect requests.
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            default_host: self.default_host.clone(),
            default_port: self.default_port,
            connect_timeout: self.connect_timeout(),
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable metrics HTTP server.
    #[serde(default)]
    pub enabled: bool,
    /// Address to bind the metrics server to.
    #[serde(with = "socket_addr_serde")]
    pub bind_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
        }
    }
}

impl MetricsConfig {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(enabled) = lookup("AERODECK_METRICS_ENABLED") {
            self.enabled = parse_bool(&enabled);
        }
        if let Some(addr) = lookup("AERODECK_METRICS_BIND") {
            if let Ok(parsed) = addr.parse() {
                self.bind_addr = parsed;
            }
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Custom serde module for SocketAddr (to handle as string in YAML).
mod socket_addr_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::net::SocketAddr;

    pub fn serialize<S>(addr: &SocketAddr, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&addr.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
