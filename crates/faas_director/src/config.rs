//! TOML configuration for the Director (spec.md §6), grounded on the
//! teacher's `casparian_scout::config::ScoutConfig` (`serde(default)` +
//! `toml::from_str`).

use crate::error::{DirectorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_bind_ip")]
    pub director_ip_addr: String,
    #[serde(default = "default_bind_port")]
    pub director_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            director_ip_addr: default_bind_ip(),
            director_port: default_bind_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionStrategyKind {
    #[serde(rename = "Round-Robin")]
    RoundRobin,
    #[serde(rename = "Random")]
    Random,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersConfig {
    #[serde(default = "default_heartbeat_check_interval_ms")]
    pub heartbeat_check_interval_ms: u64,
    #[serde(default = "default_expected_heartbeat_interval_ms")]
    pub expected_heartbeat_interval_ms: u64,
    #[serde(default = "default_synchronization_interval_ms")]
    pub synchronization_interval_ms: u64,
    #[serde(default = "default_selection_strategy")]
    pub worker_selection_strategy: SelectionStrategyKind,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            heartbeat_check_interval_ms: default_heartbeat_check_interval_ms(),
            expected_heartbeat_interval_ms: default_expected_heartbeat_interval_ms(),
            synchronization_interval_ms: default_synchronization_interval_ms(),
            worker_selection_strategy: default_selection_strategy(),
        }
    }
}

fn default_bind_ip() -> String {
    "127.0.0.1".to_string()
}
fn default_bind_port() -> u16 {
    5555
}
fn default_heartbeat_check_interval_ms() -> u64 {
    faas_protocol::defaults::DEFAULT_HEARTBEAT_CHECK_INTERVAL_MS
}
fn default_expected_heartbeat_interval_ms() -> u64 {
    faas_protocol::defaults::DEFAULT_EXPECTED_HEARTBEAT_INTERVAL_MS
}
fn default_synchronization_interval_ms() -> u64 {
    faas_protocol::defaults::DEFAULT_SYNCHRONIZATION_INTERVAL_MS
}
fn default_selection_strategy() -> SelectionStrategyKind {
    SelectionStrategyKind::RoundRobin
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            workers: WorkersConfig::default(),
        }
    }
}

impl DirectorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DirectorError::ConfigError(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| DirectorError::ConfigError(e.to_string()))
    }

    pub fn bind_addr(&self) -> String {
        format!("tcp://{}:{}", self.network.director_ip_addr, self.network.director_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_without_a_file() {
        let cfg = DirectorConfig::default();
        assert_eq!(cfg.bind_addr(), "tcp://127.0.0.1:5555");
        assert_eq!(cfg.workers.worker_selection_strategy, SelectionStrategyKind::RoundRobin);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let toml = r#"
            [network]
            director_port = 6000

            [workers]
            worker_selection_strategy = "Random"
        "#;
        let cfg: DirectorConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.network.director_port, 6000);
        assert_eq!(cfg.workers.worker_selection_strategy, SelectionStrategyKind::Random);
        assert_eq!(cfg.workers.heartbeat_check_interval_ms, 1000);
    }

    #[test]
    fn parses_the_spec_literal_round_robin() {
        let toml = r#"
            [workers]
            worker_selection_strategy = "Round-Robin"
        "#;
        let cfg: DirectorConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.workers.worker_selection_strategy, SelectionStrategyKind::RoundRobin);
    }
}
