//! Configuration loading.

use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity and listen settings.
    pub server: ServerConfig,
    /// DCC file-transfer tuning.
    #[serde(default)]
    pub transfer: TransferConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Control-port settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the control listener binds to (e.g. "0.0.0.0:6667").
    pub listen: SocketAddr,
    /// Connection password clients must supply via PASS.
    pub password: String,
}

/// File-transfer settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    /// Bytes read from the source file per write to the data socket.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Seconds a transfer listener waits for the receiver to connect before
    /// the offer is abandoned.
    #[serde(default = "default_accept_timeout")]
    pub accept_timeout: u64,

    /// Seconds between sweeps that reap finished transfers.
    #[serde(default = "default_reap_interval")]
    pub reap_interval: u64,

    /// IPv4 address advertised in DCC SEND offers. Receivers connect here,
    /// so it must be reachable from them.
    #[serde(default = "default_advertise_ip")]
    pub advertise_ip: Ipv4Addr,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            accept_timeout: default_accept_timeout(),
            reap_interval: default_reap_interval(),
            advertise_ip: default_advertise_ip(),
        }
    }
}

fn default_chunk_size() -> usize {
    8192
}

fn default_accept_timeout() -> u64 {
    120
}

fn default_reap_interval() -> u64 {
    5
}

fn default_advertise_ip() -> Ipv4Addr {
    Ipv4Addr::LOCALHOST
}
