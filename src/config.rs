// Configuration File Support
//
// TOML configuration with environment variable overrides.
// The default file lives in the XDG config directory:
// ~/.config/character-designer/config.toml
//
// A `.env` file in the working directory is read before overrides are
// applied, so API_KEY / NUM_REQUESTS / PASSWORD can live there.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::generator::GeneratorConfig;
use crate::quota::QuotaConfig;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Text generator configuration
    pub generator: GeneratorConfig,

    /// Request quota configuration
    pub quota: QuotaConfig,

    /// Web server configuration
    pub server: ServerConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve `/metrics` on the web server
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Read an environment variable, preferring the prefixed name
fn env_var(prefixed: &str, bare: Option<&str>) -> Option<String> {
    std::env::var(prefixed)
        .ok()
        .or_else(|| bare.and_then(|name| std::env::var(name).ok()))
}

impl Config {
    /// Load configuration from the default XDG config directory
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the resulting configuration is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from_path(Self::config_path())
    }

    /// Load configuration from a specific path
    ///
    /// A missing file yields the defaults (with environment overrides).
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the resulting configuration is invalid.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?;
            tracing::debug!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/character-designer/config.toml` on Linux
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) =
            directories::ProjectDirs::from("com", "character-designer", "character-designer")
        {
            proj_dirs.config_dir().join("config.toml")
        } else {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home)
                .join(".config")
                .join("character-designer")
                .join("config.toml")
        }
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values.
    /// Each prefixed name wins over its bare counterpart:
    /// - CHARACTER_DESIGNER_API_KEY / API_KEY
    /// - CHARACTER_DESIGNER_NUM_REQUESTS / NUM_REQUESTS
    /// - CHARACTER_DESIGNER_PASSWORD / PASSWORD
    /// - CHARACTER_DESIGNER_MODEL
    /// - CHARACTER_DESIGNER_STATE_FILE
    /// - CHARACTER_DESIGNER_HOST
    /// - CHARACTER_DESIGNER_PORT
    /// - CHARACTER_DESIGNER_LOG_LEVEL
    /// - CHARACTER_DESIGNER_LOG_FORMAT
    pub fn apply_env_overrides(mut self) -> Self {
        // Generator overrides
        if let Some(key) = env_var("CHARACTER_DESIGNER_API_KEY", Some("API_KEY")) {
            if !key.is_empty() {
                self.generator.api_key = Some(key);
            }
        }
        if let Some(model) = env_var("CHARACTER_DESIGNER_MODEL", None) {
            if !model.is_empty() {
                self.generator.model = model;
            }
        }

        // Quota overrides
        if let Some(limit) = env_var("CHARACTER_DESIGNER_NUM_REQUESTS", Some("NUM_REQUESTS")) {
            if let Ok(limit) = limit.trim().parse::<u32>() {
                if limit > 0 {
                    self.quota.limit = limit;
                }
            }
        }
        if let Some(password) = env_var("CHARACTER_DESIGNER_PASSWORD", Some("PASSWORD")) {
            self.quota.override_password = password;
        }
        if let Some(path) = env_var("CHARACTER_DESIGNER_STATE_FILE", None) {
            if !path.is_empty() {
                self.quota.state_file = PathBuf::from(path);
            }
        }

        // Server overrides
        if let Some(host) = env_var("CHARACTER_DESIGNER_HOST", None) {
            self.server.host = host;
        }
        if let Some(port) = env_var("CHARACTER_DESIGNER_PORT", None) {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        // Logging overrides
        if let Some(level) = env_var("CHARACTER_DESIGNER_LOG_LEVEL", None) {
            self.logging.level = level;
        }
        if let Some(format) = env_var("CHARACTER_DESIGNER_LOG_FORMAT", None) {
            self.logging.format = format;
        }

        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        if self.quota.limit == 0 {
            anyhow::bail!("Quota limit must be >= 1");
        }
        if self.quota.window_hours == 0 {
            anyhow::bail!("Quota window must be at least 1 hour");
        }
        if self.quota.state_file.as_os_str().is_empty() {
            anyhow::bail!("Quota state file path must not be empty");
        }

        if self.generator.model.trim().is_empty() {
            anyhow::bail!("Generator model must not be empty");
        }
        if self.generator.timeout_secs == 0 {
            anyhow::bail!("Generator timeout must be > 0 seconds");
        }

        Ok(())
    }

    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging
            .level
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }
}
