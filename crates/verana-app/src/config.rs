//! Node configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::genesis::DEFAULT_CHAIN_ID;

/// Full configuration for the Verana node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VeranaConfig {
    /// Chain identity and genesis source.
    #[serde(default)]
    pub chain: ChainConfig,

    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain id stamped on every block header.
    #[serde(default = "default_chain_id")]
    pub chain_id: String,
    /// Genesis document (JSON) used by `init`.
    #[serde(default = "default_genesis_file")]
    pub genesis_file: PathBuf,
}

/// Which key-value backend holds the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Rocksdb,
    /// Volatile; genesis is replayed on every start.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the data directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_chain_id() -> String {
    DEFAULT_CHAIN_ID.into()
}
fn default_genesis_file() -> PathBuf {
    PathBuf::from("./genesis.json")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            genesis_file: default_genesis_file(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: StorageBackend::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl VeranaConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: VeranaConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Whether logs should be emitted as JSON lines.
    pub fn json_logs(&self) -> bool {
        self.logging.format.eq_ignore_ascii_case("json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VeranaConfig::default();
        assert_eq!(config.chain.chain_id, "vna-local-1");
        assert_eq!(config.storage.backend, StorageBackend::Rocksdb);
        assert_eq!(config.logging.level, "info");
        assert!(!config.json_logs());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = VeranaConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let decoded: VeranaConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(decoded.chain.chain_id, config.chain.chain_id);
        assert_eq!(decoded.storage.data_dir, config.storage.data_dir);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let config = VeranaConfig::load(Path::new("/nonexistent/verana.toml")).unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_config_from_toml_partial() {
        let toml_str = r#"
[chain]
chain_id = "vna-testnet-1"

[storage]
backend = "memory"

[logging]
format = "json"
"#;
        let config: VeranaConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.chain.chain_id, "vna-testnet-1");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.json_logs());
        // Defaults for unspecified
        assert_eq!(config.chain.genesis_file, PathBuf::from("./genesis.json"));
        assert_eq!(config.logging.level, "info");
    }
}
