//! Configuration module for SMD.

use serde::Deserialize;
use std::path::Path;

use crate::auth::MAX_SESSION_DURATION_SECS;
use crate::{Result, SmdError};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Blob storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory holding every stored blob.
    #[serde(default = "default_storage_root")]
    pub root: String,
    /// Maximum upload size in bytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
}

fn default_storage_root() -> String {
    "data/store".to_string()
}

fn default_max_upload_size() -> u64 {
    100_000_000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            max_upload_size: default_max_upload_size(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/smd.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Login session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of a freshly issued session in seconds.
    #[serde(default = "default_session_duration")]
    pub duration_secs: u64,
    /// Interval between expired-session sweeps in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_session_duration() -> u64 {
    crate::auth::DEFAULT_SESSION_DURATION_SECS
}

fn default_sweep_interval() -> u64 {
    300
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_session_duration(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/smd.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// First administrator created when the user table is empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootstrapConfig {
    /// Administrator username.
    #[serde(default)]
    pub admin_username: Option<String>,
    /// Administrator password (plain text, hashed before storage).
    #[serde(default)]
    pub admin_password: Option<String>,
    /// Administrator email.
    #[serde(default)]
    pub admin_email: String,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Session configuration.
    #[serde(default)]
    pub sessions: SessionConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Administrator bootstrap.
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl Config {
    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::parse(&content)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| SmdError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let duration = self.sessions.duration_secs;
        if duration == 0 || duration > MAX_SESSION_DURATION_SECS {
            return Err(SmdError::Config(format!(
                "sessions.duration_secs must be 1-{MAX_SESSION_DURATION_SECS}, got {duration}"
            )));
        }
        if self.sessions.sweep_interval_secs == 0 {
            return Err(SmdError::Config(
                "sessions.sweep_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply `PORT` and `MAX_FILE_SIZE` from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var("PORT").ok().as_deref(),
            std::env::var("MAX_FILE_SIZE").ok().as_deref(),
        )
    }

    fn apply_overrides(&mut self, port: Option<&str>, max_file_size: Option<&str>) -> Result<()> {
        if let Some(port) = port.filter(|p| !p.is_empty()) {
            self.server.port = port
                .parse()
                .map_err(|_| SmdError::Config(format!("invalid PORT: {port}")))?;
        }
        if let Some(size) = max_file_size.filter(|s| !s.is_empty()) {
            self.storage.max_upload_size = size
                .parse()
                .map_err(|_| SmdError::Config(format!("invalid MAX_FILE_SIZE: {size}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.root, "data/store");
        assert_eq!(config.storage.max_upload_size, 100_000_000);
        assert_eq!(config.database.path, "data/smd.db");
        assert_eq!(config.sessions.duration_secs, 86400);
        assert_eq!(config.logging.level, "info");
        assert!(config.bootstrap.admin_username.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[storage]
root = "/srv/blobs"

[sessions]
sweep_interval_secs = 60
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.storage.root, "/srv/blobs");
        assert_eq!(config.storage.max_upload_size, 100_000_000);
        assert_eq!(config.sessions.sweep_interval_secs, 60);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("[server]\nport = \"not a number\"");
        assert!(matches!(result, Err(SmdError::Config(_))));
    }

    #[test]
    fn test_session_duration_bounds() {
        for bad in ["0", "99999999999999"] {
            let toml = format!("[sessions]\nduration_secs = {bad}");
            assert!(matches!(Config::parse(&toml), Err(SmdError::Config(_))));
        }
        let config = Config::parse("[sessions]\nduration_secs = 3600").unwrap();
        assert_eq!(config.sessions.duration_secs, 3600);
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let result = Config::parse("[sessions]\nsweep_interval_secs = 0");
        assert!(matches!(result, Err(SmdError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(Some("5464"), Some("1024")).unwrap();
        assert_eq!(config.server.port, 5464);
        assert_eq!(config.storage.max_upload_size, 1024);
    }

    #[test]
    fn test_empty_env_overrides_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides(Some(""), None).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_invalid_env_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(None, Some("lots"));
        assert!(matches!(result, Err(SmdError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("definitely/not/here.toml");
        assert!(matches!(result, Err(SmdError::Io(_))));
    }
}
