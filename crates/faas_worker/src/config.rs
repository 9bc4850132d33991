//! TOML configuration for the Worker (spec.md §6), grounded on the
//! teacher's `casparian_scout::config::ScoutConfig` (`serde(default)` +
//! `toml::from_str`).

use crate::error::{Result, WorkerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
    #[serde(default)]
    pub statistics: StatisticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_director_ip")]
    pub director_ip_addr: String,
    #[serde(default = "default_director_port")]
    pub director_port: u16,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            director_ip_addr: default_director_ip(),
            director_port: default_director_port(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    #[serde(default)]
    pub caching: CachingConfig,
    #[serde(default)]
    pub shutdown_persistence: bool,
    #[serde(default = "default_dump_file")]
    pub dump_file: PathBuf,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            caching: CachingConfig::default(),
            shutdown_persistence: false,
            dump_file: default_dump_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachingConfig {
    #[serde(default = "default_cache_policy")]
    pub policy: String,
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,
}

impl Default for CachingConfig {
    fn default() -> Self {
        Self {
            policy: default_cache_policy(),
            max_size: default_cache_max_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_director_ip() -> String {
    "127.0.0.1".to_string()
}
fn default_director_port() -> u16 {
    5555
}
fn default_heartbeat_interval_ms() -> u64 {
    faas_protocol::defaults::DEFAULT_EXPECTED_HEARTBEAT_INTERVAL_MS / 2
}
fn default_cache_policy() -> String {
    "LRU".to_string()
}
fn default_cache_max_size() -> usize {
    faas_protocol::defaults::DEFAULT_CACHE_MAX_SIZE
}
fn default_dump_file() -> PathBuf {
    PathBuf::from("worker_state.json")
}
fn default_true() -> bool {
    true
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            behavior: BehaviorConfig::default(),
            statistics: StatisticsConfig::default(),
        }
    }
}

impl WorkerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WorkerError::ConfigError(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| WorkerError::ConfigError(e.to_string()))
    }

    pub fn director_addr(&self) -> String {
        format!(
            "tcp://{}:{}",
            self.network.director_ip_addr, self.network.director_port
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_without_a_file() {
        let cfg = WorkerConfig::default();
        assert_eq!(cfg.behavior.caching.max_size, 128);
        assert_eq!(cfg.director_addr(), "tcp://127.0.0.1:5555");
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let toml = r#"
            [network]
            director_port = 6000

            [behavior.caching]
            max_size = 4
        "#;
        let cfg: WorkerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.network.director_port, 6000);
        assert_eq!(cfg.behavior.caching.max_size, 4);
        assert_eq!(cfg.network.director_ip_addr, "127.0.0.1");
    }
}
