//! The Verana node: configuration, storage backend, and application.

use anyhow::{bail, Result};
use serde_json::Value;
use verana_core::MemoryStore;

use crate::app::{Block, BlockInfo, BlockResult, VeranaApp};
use crate::config::{StorageBackend, VeranaConfig};
use crate::genesis::{self, AppGenesis};
use crate::query::Query;
use crate::storage::{Backend, RocksStore};

pub struct VeranaNode {
    config: VeranaConfig,
    app: VeranaApp,
    store: Backend,
}

impl VeranaNode {
    /// Open the configured backend. A memory backend starts from genesis
    /// every time.
    pub fn open(config: VeranaConfig) -> Result<Self> {
        let store = match config.storage.backend {
            StorageBackend::Rocksdb => {
                let path = config.storage.data_dir.join("state");
                Backend::Rocks(RocksStore::open(&path)?)
            }
            StorageBackend::Memory => Backend::Memory(MemoryStore::new()),
        };
        let mut node = Self {
            config,
            app: VeranaApp::new(),
            store,
        };
        if matches!(node.store, Backend::Memory(_)) {
            node.init()?;
        }
        tracing::info!(
            backend = ?node.config.storage.backend,
            data_dir = %node.config.storage.data_dir.display(),
            "Verana node opened"
        );
        Ok(node)
    }

    pub fn config(&self) -> &VeranaConfig {
        &self.config
    }

    pub fn app(&self) -> &VeranaApp {
        &self.app
    }

    /// Genesis document from the configured file, or the default genesis
    /// for the configured chain id when the file does not exist.
    pub fn load_genesis(&self) -> Result<AppGenesis> {
        let path = &self.config.chain.genesis_file;
        if path.exists() {
            let genesis = AppGenesis::load(path)?;
            if genesis.chain_id != self.config.chain.chain_id {
                tracing::warn!(
                    genesis = %genesis.chain_id,
                    configured = %self.config.chain.chain_id,
                    "genesis chain id differs from configuration"
                );
            }
            Ok(genesis)
        } else {
            tracing::info!(path = %path.display(), "no genesis file, using defaults");
            Ok(AppGenesis {
                chain_id: self.config.chain.chain_id.clone(),
                ..AppGenesis::default()
            })
        }
    }

    /// Write genesis into the store. Returns the genesis app hash.
    pub fn init(&mut self) -> Result<String> {
        let genesis = self.load_genesis()?;
        Ok(genesis::init_chain(&self.app, &mut self.store, &genesis)?)
    }

    pub fn last_block(&self) -> Result<Option<BlockInfo>> {
        Ok(self.app.last_block(&self.store)?)
    }

    pub fn apply_block(&mut self, block: &Block) -> Result<BlockResult> {
        if self.last_block()?.is_none() {
            bail!("chain is not initialized; run `verana-node init` first");
        }
        Ok(self.app.execute_block(&mut self.store, block)?)
    }

    pub fn export_genesis(&self) -> Result<AppGenesis> {
        Ok(genesis::export_genesis(&self.app, &self.store)?)
    }

    pub fn query(&self, query: &Query) -> Result<Value> {
        let ctx = self.app.query_context(&self.store)?;
        Ok(self.app.query(&ctx, query)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{create_tr, ALICE};
    use crate::app::Tx;
    use std::path::PathBuf;
    use verana_core::{Balance, Timestamp};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("verana-node-{}", rand::random::<u64>()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn config_in(dir: &std::path::Path, backend: StorageBackend) -> VeranaConfig {
        let mut config = VeranaConfig::default();
        config.storage.data_dir = dir.join("data");
        config.storage.backend = backend;
        config.chain.genesis_file = dir.join("genesis.json");
        config
    }

    fn write_genesis(dir: &std::path::Path) {
        let genesis = AppGenesis {
            genesis_time: Timestamp::from_unix(1_704_067_200),
            balances: vec![Balance {
                address: ALICE.into(),
                amount: 100_000_000,
            }],
            ..AppGenesis::default()
        };
        std::fs::write(dir.join("genesis.json"), genesis.to_json().unwrap()).unwrap();
    }

    fn block(height: u64) -> Block {
        Block {
            height,
            time: Timestamp::from_unix(1_704_067_200 + height as i64),
            txs: vec![Tx::new(vec![create_tr(ALICE, &format!("did:example:{}", height))])],
        }
    }

    #[test]
    fn test_memory_node_starts_from_genesis() {
        let dir = temp_dir();
        write_genesis(&dir);
        let mut node = VeranaNode::open(config_in(&dir, StorageBackend::Memory)).unwrap();
        assert_eq!(node.last_block().unwrap().unwrap().height, 0);

        let result = node.apply_block(&block(1)).unwrap();
        assert!(result.tx_results[0].is_ok());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_rocks_node_persists_blocks() {
        let dir = temp_dir();
        write_genesis(&dir);
        let config = config_in(&dir, StorageBackend::Rocksdb);
        let first_hash = {
            let mut node = VeranaNode::open(config.clone()).unwrap();
            assert!(node.apply_block(&block(1)).is_err());
            node.init().unwrap();
            assert!(node.init().is_err());
            node.apply_block(&block(1)).unwrap().app_hash
        };

        let mut node = VeranaNode::open(config).unwrap();
        assert_eq!(node.last_block().unwrap().unwrap().height, 1);
        let exported = node.export_genesis().unwrap();
        assert_eq!(exported.trustregistry.trust_registries.len(), 1);

        let second = node.apply_block(&block(2)).unwrap();
        assert_ne!(second.app_hash, first_hash);
        let registries = node
            .query(&Query::ListTrustRegistries(Default::default()))
            .unwrap();
        assert_eq!(registries.as_array().map(Vec::len), Some(2));
        std::fs::remove_dir_all(&dir).ok();
    }
}
