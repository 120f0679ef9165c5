use crate::config::{ConfigError, FileError};
use crate::network::datalink::DEFAULT_IGNORED_INTERFACES;
use ipnet::Ipv6Net;
use pnet_datalink::MacAddr;
use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;
use std::path::Path;
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawRootCfg {
    #[serde(alias = "log-level", default = "default_log_level")]
    pub log_level: String,
    #[serde(alias = "ignore-interfaces", default = "default_ignore_interfaces")]
    pub ignore_interfaces: Vec<String>,
    #[serde(alias = "pending-per-neighbor", default)]
    pub pending_per_neighbor: usize,
    #[serde(default)]
    pub interfaces: Vec<RawInterfaceCfg>,
    #[serde(default)]
    pub routes: Vec<RawRouteCfg>,
    #[serde(default)]
    pub neighbors: Vec<RawNeighborCfg>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawInterfaceCfg {
    pub name: String,
    pub address: Ipv6Net,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawRouteCfg {
    pub prefix: Ipv6Net,
    #[serde(alias = "next-hop")]
    pub next_hop: Ipv6Addr,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawNeighborCfg {
    pub interface: String,
    pub mac: String,
    pub address: Ipv6Addr,
}

impl RawNeighborCfg {
    pub fn mac_addr(&self) -> Result<MacAddr, ConfigError> {
        MacAddr::from_str(&self.mac).map_err(|_| ConfigError::InvalidMac(self.mac.clone()))
    }
}

impl Default for RawRootCfg {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            ignore_interfaces: default_ignore_interfaces(),
            pending_per_neighbor: 0,
            interfaces: vec![],
            routes: vec![],
            neighbors: vec![],
        }
    }
}

impl RawRootCfg {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let name = path.to_string_lossy().to_string();
        let content =
            std::fs::read_to_string(path).map_err(|e| FileError::Io(name.clone(), e))?;
        let config = serde_yaml::from_str(&content).map_err(|e| FileError::Serde(name, e))?;
        Ok(config)
    }

    /// Defaults apply when no file is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| ConfigError::LogLevel(self.log_level.clone()))
    }

    /// Catch what can be caught without touching the system.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.level_filter()?;
        for neighbor in &self.neighbors {
            neighbor.mac_addr()?;
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ignore_interfaces() -> Vec<String> {
    DEFAULT_IGNORED_INTERFACES
        .iter()
        .map(|s| s.to_string())
        .collect()
}
