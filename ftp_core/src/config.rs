use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use crate::port::PortRange;
use crate::protocol::constants::{ANONYMOUS, CONTROL_PORT};
use crate::transfer::ChunkFraming;

const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "ftp";
const APP_NAME: &str = "ftp_server";
const CONFIG_FILE: &str = "config.json";

/// Overrides the platform config directory
pub const CONFIG_DIR_ENV: &str = "FTP_CONFIG_DIR";

/// Default server work directory
pub const DEFAULT_ROOT_DIR: &str = "./ser";

/// Default credential store
pub const DEFAULT_ACCOUNTS_FILE: &str = ".accounts";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub control_port: u16,
    pub data_ports: PortRange,
    /// Directory every session starts in and cannot leave
    pub root_dir: PathBuf,
    pub accounts_file: PathBuf,
    /// Identity accepted without a secret. `None` disables the bypass.
    pub anonymous_identity: Option<String>,
    pub framing: ChunkFraming,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            control_port: CONTROL_PORT,
            data_ports: PortRange::default(),
            root_dir: PathBuf::from(DEFAULT_ROOT_DIR),
            accounts_file: PathBuf::from(DEFAULT_ACCOUNTS_FILE),
            anonymous_identity: Some(ANONYMOUS.to_string()),
            framing: ChunkFraming::default(),
        }
    }
}

impl ServerConfig {
    /// Get the config file path
    pub fn get_config_path() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Some(PathBuf::from(dir).join(CONFIG_FILE));
        }

        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load config from the default location or return defaults
    pub fn load() -> Self {
        let path = match Self::get_config_path() {
            Some(p) => p,
            None => return Self::default(),
        };

        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Load config from an explicit file. Unlike [`ServerConfig::load`],
    /// a missing or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::get_config_path().context("No config directory available")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.data_ports.validate()?;
        if self.root_dir.as_os_str().is_empty() {
            anyhow::bail!("root_dir must not be empty");
        }
        Ok(())
    }
}
