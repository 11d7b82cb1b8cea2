//! Configuration management for the pathwarden daemon.
//!
//! This module handles loading, validation, and conversion of daemon
//! configuration from TOML files and command-line arguments.

use path_repair::RepairConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Health monitor schedule
    pub monitor: MonitorSettings,
    /// Remote file access
    pub transport: TransportSettings,
    /// Server record storage
    pub storage: StorageSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Health sweep timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Seconds before the first sweep
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,
    /// Seconds between sweeps
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Seconds to wait for an in-flight sweep on shutdown
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
    /// Seconds after which a cached path is checked again
    #[serde(default = "default_interval")]
    pub revalidate_after_secs: u64,
    /// Serialize concurrent resolutions of the same server path
    #[serde(default = "default_true")]
    pub serialize_per_key: bool,
}

fn default_initial_delay() -> u64 {
    60
}

fn default_interval() -> u64 {
    30 * 60
}

fn default_shutdown_grace() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

/// Remote filesystem access.
///
/// Each server host is expected to be mounted at `<mount_root>/<host>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    pub mount_root: String,
    /// Per-listing timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// JSON document holding every server record
    pub servers_file: String,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorSettings {
                initial_delay_secs: default_initial_delay(),
                interval_secs: default_interval(),
                shutdown_grace_secs: default_shutdown_grace(),
                revalidate_after_secs: default_interval(),
                serialize_per_key: true,
            },
            transport: TransportSettings {
                mount_root: "/mnt/gameservers".to_string(),
                timeout_secs: default_timeout(),
            },
            storage: StorageSettings {
                servers_file: "servers.json".to_string(),
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to `path`
    /// and returns it.
    pub async fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn to_repair_config(&self) -> RepairConfig {
        RepairConfig {
            initial_delay: Duration::from_secs(self.monitor.initial_delay_secs),
            check_interval: Duration::from_secs(self.monitor.interval_secs),
            shutdown_grace: Duration::from_secs(self.monitor.shutdown_grace_secs),
            validation_timeout: Duration::from_secs(self.transport.timeout_secs),
            revalidate_after: Duration::from_secs(self.monitor.revalidate_after_secs),
            serialize_per_key: self.monitor.serialize_per_key,
        }
    }

    pub fn transport_timeout(&self) -> Duration {
        Duration::from_secs(self.transport.timeout_secs)
    }

    /// Checks the configuration for values the daemon cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.monitor.interval_secs == 0 {
            return Err("Monitor interval must be greater than zero".to_string());
        }

        if self.transport.timeout_secs == 0 {
            return Err("Transport timeout must be greater than zero".to_string());
        }

        if self.transport.mount_root.is_empty() {
            return Err("Transport mount root cannot be empty".to_string());
        }

        if self.storage.servers_file.is_empty() {
            return Err("Servers file cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
