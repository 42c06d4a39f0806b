/// Configuration management for the runtime API tool

use crate::core::Locator;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Runtime API socket configuration
    pub runtime: RuntimeConfig,
    /// Drain-to-maintenance configuration
    pub maintenance: MaintenanceConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Runtime API socket configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Socket locator, `unix://path` or `tcp://address:port`
    pub socket: String,
}

/// Drain-to-maintenance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Pause between session count polls in milliseconds
    pub poll_interval_ms: u64,
    /// Force maintenance after this many seconds; unset waits for the drain
    pub drain_timeout_sec: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, text)
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig {
                socket: "unix:///var/run/haproxy/admin.sock".to_string(),
            },
            maintenance: MaintenanceConfig {
                poll_interval_ms: 10,
                drain_timeout_sec: Some(30),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
            },
        }
    }
}

impl MaintenanceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn drain_timeout(&self) -> Option<Duration> {
        self.drain_timeout_sec.map(Duration::from_secs)
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        Locator::parse(&self.runtime.socket)?;

        if self.maintenance.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.maintenance.drain_timeout_sec == Some(0) {
            return Err(ConfigError::ValidationError(
                "drain_timeout_sec must be greater than 0 when set".to_string(),
            ));
        }

        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => return Err(ConfigError::ValidationError(
                format!("Invalid log level: {}", self.logging.level)
            )),
        }

        match self.logging.format.as_str() {
            "json" | "text" => {}
            _ => return Err(ConfigError::ValidationError(
                format!("Invalid log format: {}", self.logging.format)
            )),
        }

        Ok(())
    }

    /// Create example configuration file for a unix or tcp socket
    pub fn create_example_config<P: AsRef<Path>>(path: P, transport: &str) -> Result<(), ConfigError> {
        let config = match transport {
            "unix" => Config::default(),
            "tcp" => Config {
                runtime: RuntimeConfig {
                    socket: "tcp://127.0.0.1:9999".to_string(),
                },
                ..Default::default()
            },
            _ => return Err(ConfigError::ValidationError(
                "Transport must be 'unix' or 'tcp'".to_string(),
            )),
        };

        config.save_to_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.maintenance.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.maintenance.drain_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.runtime.socket = "http://localhost:9999".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLocator(_))));
        config.runtime.socket = "tcp://localhost:9999".to_string();
        assert!(config.validate().is_ok());

        config.maintenance.poll_interval_ms = 0;
        assert!(config.validate().is_err());
        config.maintenance.poll_interval_ms = 10;

        config.maintenance.drain_timeout_sec = Some(0);
        assert!(config.validate().is_err());
        config.maintenance.drain_timeout_sec = None;
        assert!(config.validate().is_ok());

        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_without_timeout_parses() {
        let toml_str = r#"
            [runtime]
            socket = "tcp://10.0.0.5:9999"

            [maintenance]
            poll_interval_ms = 50

            [logging]
            level = "debug"
            format = "json"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.maintenance.drain_timeout(), None);
    }

    #[test]
    fn test_config_file_operations() {
        let temp_file = NamedTempFile::new().unwrap();

        Config::create_example_config(temp_file.path(), "tcp").unwrap();
        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded_config.runtime.socket, "tcp://127.0.0.1:9999");

        assert!(Config::create_example_config(temp_file.path(), "udp").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load_from_file("/nonexistent/haproxy-runtime.toml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
