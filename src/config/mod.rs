//! Configuration module
//!
//! Handles loading and saving shardlink configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::network::NetworkConfig as NetConfig;
use crate::protocol::{ClientVersion, DEFAULT_PORT, MAX_PACKET_SIZE};
use crate::world::WorldSettings;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Network settings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Client emulation settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Party settings
    #[serde(default)]
    pub party: PartyConfig,
}

/// General configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Game server host
    #[serde(default = "default_host")]
    pub host: String,
    /// Game server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connection timeout in ms
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Largest packet accepted from the server
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_max_packet_size() -> usize {
    MAX_PACKET_SIZE
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout(),
            max_packet_size: default_max_packet_size(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Client version to decode for, e.g. "7.0.95.0"
    #[serde(default)]
    pub version: ClientVersion,
    /// World update tick in ms
    #[serde(default = "default_tick")]
    pub tick_ms: u64,
}

fn default_tick() -> u64 {
    50
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: ClientVersion::default(),
            tick_ms: default_tick(),
        }
    }
}

/// Party configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyConfig {
    /// Prompt when invited to a party
    #[serde(default = "default_true")]
    pub invite_prompts: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PartyConfig {
    fn default() -> Self {
        Self {
            invite_prompts: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("shardlink/config.toml")),
            Some(PathBuf::from("./shardlink.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                return Self::load(path);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn world_settings(&self) -> WorldSettings {
        WorldSettings {
            invite_prompts: self.party.invite_prompts,
        }
    }

    pub fn net_config(&self) -> NetConfig {
        NetConfig::new(self.network.connect_timeout_ms)
            .with_max_packet_size(self.network.max_packet_size)
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> ConfigResult<String> {
    let config = Config {
        network: NetworkConfig {
            host: "play.example.net".to_string(),
            ..Default::default()
        },
        client: ClientConfig {
            version: ClientVersion::new(7, 0, 95, 0),
            ..Default::default()
        },
        ..Default::default()
    };

    Ok(toml::to_string_pretty(&config)?)
}
