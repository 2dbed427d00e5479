//! Server configuration.
//!
//! Loads and validates configuration from YAML files or environment
//! variables.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
///
/// Example YAML:
/// ```yaml
/// listen_addr: "0.0.0.0:8080"
/// data_dir: "/var/lib/muse"
/// admin_token: "change-me"
/// matching:
///   default_threshold: 0.55
///   default_limit: 5
///   max_limit: 50
/// telemetry:
///   prometheus:
///     enabled: true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Data directory for the durable catalog; omit for a purely
    /// in-memory deployment (useful for demos and tests)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Shared secret presented by mutating (curator) calls
    pub admin_token: String,

    /// Matching defaults and caps
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum similarity applied when a query omits its own threshold
    #[serde(default = "default_threshold")]
    pub default_threshold: f32,

    /// Result count applied when a query omits its own limit
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Hard cap on the result count a query may request
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Prometheus configuration
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            prometheus: PrometheusConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Serve Prometheus metrics on /metrics
    #[serde(default = "default_prometheus_enabled")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: default_prometheus_enabled(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_threshold() -> f32 {
    0.55
}

fn default_limit() -> usize {
    5
}

fn default_max_limit() -> usize {
    50
}

fn default_prometheus_enabled() -> bool {
    true
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("Failed to read config file: {}", e)))?;

        let config: ServerConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("Failed to parse YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// Supported variables:
    /// - MUSE_LISTEN_ADDR
    /// - MUSE_DATA_DIR
    /// - MUSE_ADMIN_TOKEN
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let listen_addr =
            std::env::var("MUSE_LISTEN_ADDR").unwrap_or_else(|_| default_listen_addr());

        let data_dir = std::env::var("MUSE_DATA_DIR").ok().map(PathBuf::from);

        let admin_token = std::env::var("MUSE_ADMIN_TOKEN")
            .map_err(|_| ConfigError::MissingField("MUSE_ADMIN_TOKEN".to_string()))?;

        let config = ServerConfig {
            listen_addr,
            data_dir,
            admin_token,
            matching: MatchingConfig::default(),
            telemetry: TelemetryConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidField(format!("Invalid listen_addr: {}", e)))?;

        if self.admin_token.is_empty() {
            return Err(ConfigError::InvalidField(
                "admin_token cannot be empty".to_string(),
            ));
        }

        if !(-1.0..=1.0).contains(&self.matching.default_threshold) {
            return Err(ConfigError::InvalidField(
                "default_threshold must be in [-1, 1]".to_string(),
            ));
        }

        if self.matching.default_limit == 0 || self.matching.max_limit == 0 {
            return Err(ConfigError::InvalidField(
                "result limits must be >= 1".to_string(),
            ));
        }

        if self.matching.default_limit > self.matching.max_limit {
            return Err(ConfigError::InvalidField(
                "default_limit cannot exceed max_limit".to_string(),
            ));
        }

        if let Some(dir) = &self.data_dir {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    ConfigError::InvalidField(format!("Cannot create data_dir: {}", e))
                })?;
            }
            if !dir.is_dir() {
                return Err(ConfigError::InvalidField(
                    "data_dir exists but is not a directory".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),
}
