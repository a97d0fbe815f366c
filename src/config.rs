//! Configuration management for MedChain

use crate::consensus::{ConsensusSettings, DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_PEER_TIMEOUT};
use crate::error::ChainError;
use crate::miner::{Difficulty, DEFAULT_DIFFICULTY};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub miner: MinerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
    #[serde(default = "default_peer_timeout_secs")]
    pub peer_timeout_secs: u64,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            api_port: default_api_port(),
            bootstrap_peers: Vec::new(),
            peer_timeout_secs: default_peer_timeout_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    /// Leading zero hex characters required of a proof digest.
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ChainError> {
        Difficulty::new(self.miner.difficulty).map_err(|_| {
            ChainError::ConfigError(format!(
                "miner.difficulty must be between 1 and 64, got {}",
                self.miner.difficulty
            ))
        })?;

        if self.network.peer_timeout_secs == 0 {
            return Err(ChainError::ConfigError(
                "network.peer_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.network.max_concurrent_fetches == 0 {
            return Err(ChainError::ConfigError(
                "network.max_concurrent_fetches must be greater than zero".to_string(),
            ));
        }

        if self.network.host.trim().is_empty() {
            return Err(ChainError::ConfigError("network.host must be set".to_string()));
        }

        Ok(())
    }

    pub fn difficulty(&self) -> Result<Difficulty, ChainError> {
        Difficulty::new(self.miner.difficulty)
            .map_err(|e| ChainError::ConfigError(e.to_string()))
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.network.peer_timeout_secs)
    }

    pub fn consensus_settings(&self) -> Result<ConsensusSettings, ChainError> {
        Ok(ConsensusSettings {
            difficulty: self.difficulty()?,
            peer_timeout: self.peer_timeout(),
            max_concurrent_fetches: self.network.max_concurrent_fetches,
        })
    }
}

/// Load `config.toml` from the working directory, falling back to defaults
/// when the file is absent. `PORT` overrides `network.api_port`.
pub fn load_config() -> Result<Config, ChainError> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let path = path.as_ref();
    let config_str = if path.exists() {
        fs::read_to_string(path)?
    } else {
        String::new()
    };

    let mut config: Config = if config_str.trim().is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str)
            .map_err(|e| ChainError::ConfigError(format!("{}: {}", path.display(), e)))?
    };

    if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
        config.network.api_port = port;
    }

    config.validate()?;
    Ok(config)
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    5000
}

fn default_peer_timeout_secs() -> u64 {
    DEFAULT_PEER_TIMEOUT.as_secs()
}

fn default_max_concurrent_fetches() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.miner.difficulty, 4);
        assert_eq!(config.network.peer_timeout_secs, 5);
        assert!(config.network.bootstrap_peers.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[network]\nbootstrap_peers = [\"http://127.0.0.1:5001\"]\n\n[miner]\ndifficulty = 2"
        )
        .unwrap();

        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.miner.difficulty, 2);
        assert_eq!(config.network.bootstrap_peers.len(), 1);
        assert_eq!(config.network.max_concurrent_fetches, DEFAULT_MAX_CONCURRENT_FETCHES);
        assert_eq!(config.difficulty().unwrap().leading_zeros(), 2);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[miner]\ndifficulty = 0").unwrap();
        assert!(matches!(load_config_from(file.path()), Err(ChainError::ConfigError(_))));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[network]\npeer_timeout_secs = 0").unwrap();
        assert!(matches!(load_config_from(file.path()), Err(ChainError::ConfigError(_))));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml = = =").unwrap();
        assert!(matches!(load_config_from(file.path()), Err(ChainError::ConfigError(_))));
    }
}
