// Configuration management for the pitchlink server
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/pitchlink/config.json
// - Linux: ~/.config/pitchlink/config.json
// - Windows: %APPDATA%\pitchlink\config.json

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP/WebSocket listener to
    pub bind_address: IpAddr,

    /// Listening port
    pub port: u16,

    /// Lock stripes in the session registry
    pub registry_shards: usize,

    /// Events queued per peer before sends start failing
    pub outbound_buffer: usize,

    /// Seconds between WebSocket pings
    pub ping_interval_secs: u64,

    /// Seconds of silence before a peer is dropped
    pub ping_timeout_secs: u64,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Directory for daily-rolling log files
    pub log_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::from([0, 0, 0, 0]),
            port: 4000,
            registry_shards: pitchlink_core::session::DEFAULT_SHARDS,
            outbound_buffer: pitchlink_core::transport::hub::DEFAULT_OUTBOUND_BUFFER,
            ping_interval_secs: 25,
            ping_timeout_secs: 60,
            log_json: false,
            log_dir: None,
        }
    }
}

impl ServerConfig {
    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("pitchlink");
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load from `path`, or the default location; a missing file means defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_file = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_file()?,
        };

        if !config_file.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_file)
            .with_context(|| format!("Failed to read config file {}", config_file.display()))?;
        let config: ServerConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", config_file.display()))?;
        Ok(config)
    }

    /// Save to `path`, or the default location
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_file = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_file()?,
        };

        if let Some(parent) = config_file.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_file, contents).context("Failed to write config file")?;
        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Set a config value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "bind_address" => {
                self.bind_address = value.parse().context("Invalid IP address")?;
            }
            "port" => {
                self.port = value.parse().context("Invalid port number")?;
            }
            "registry_shards" => {
                self.registry_shards = parse_positive(value)?;
            }
            "outbound_buffer" => {
                self.outbound_buffer = parse_positive(value)?;
            }
            "ping_interval_secs" => {
                self.ping_interval_secs = parse_positive(value)? as u64;
            }
            "ping_timeout_secs" => {
                self.ping_timeout_secs = parse_positive(value)? as u64;
            }
            "log_json" => {
                self.log_json = value.parse().context("Invalid boolean value")?;
            }
            "log_dir" => {
                self.log_dir = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Get a config value
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "bind_address" => Some(self.bind_address.to_string()),
            "port" => Some(self.port.to_string()),
            "registry_shards" => Some(self.registry_shards.to_string()),
            "outbound_buffer" => Some(self.outbound_buffer.to_string()),
            "ping_interval_secs" => Some(self.ping_interval_secs.to_string()),
            "ping_timeout_secs" => Some(self.ping_timeout_secs.to_string()),
            "log_json" => Some(self.log_json.to_string()),
            "log_dir" => self.log_dir.clone(),
            _ => None,
        }
    }

    /// List all config values
    pub fn list(&self) -> Vec<(String, String)> {
        vec![
            ("bind_address".to_string(), self.bind_address.to_string()),
            ("port".to_string(), self.port.to_string()),
            ("registry_shards".to_string(), self.registry_shards.to_string()),
            ("outbound_buffer".to_string(), self.outbound_buffer.to_string()),
            ("ping_interval_secs".to_string(), format!("{}s", self.ping_interval_secs)),
            ("ping_timeout_secs".to_string(), format!("{}s", self.ping_timeout_secs)),
            ("log_json".to_string(), self.log_json.to_string()),
            ("log_dir".to_string(), self.log_dir.clone().unwrap_or_else(|| "(stdout only)".to_string())),
        ]
    }
}

fn parse_positive(value: &str) -> Result<usize> {
    let n: usize = value.parse().context("Invalid number")?;
    anyhow::ensure!(n > 0, "Value must be greater than zero");
    Ok(n)
}
