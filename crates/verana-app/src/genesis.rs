//! Application genesis: bank balances plus every module's state.

use std::path::Path;

use serde::{Deserialize, Serialize};
use verana_core::hashing::commit_hash;
use verana_core::{Balance, BlockHeader, Context, KvStore, KvStoreMut, Timestamp};

use crate::app::VeranaApp;
use crate::error::AppError;

pub const DEFAULT_CHAIN_ID: &str = "vna-local-1";

fn default_chain_id() -> String {
    DEFAULT_CHAIN_ID.into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppGenesis {
    #[serde(default = "default_chain_id")]
    pub chain_id: String,
    #[serde(default)]
    pub genesis_time: Timestamp,
    #[serde(default)]
    pub balances: Vec<Balance>,
    #[serde(default)]
    pub trustdeposit: verana_trustdeposit::GenesisState,
    #[serde(default)]
    pub trustregistry: verana_trustregistry::GenesisState,
    #[serde(default)]
    pub credentialschema: verana_credentialschema::GenesisState,
    #[serde(default)]
    pub permission: verana_permission::GenesisState,
    #[serde(default)]
    pub validation: verana_validation::GenesisState,
    #[serde(default)]
    pub diddirectory: verana_diddirectory::GenesisState,
}

impl Default for AppGenesis {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            genesis_time: Timestamp::default(),
            balances: Vec::new(),
            trustdeposit: Default::default(),
            trustregistry: Default::default(),
            credentialschema: Default::default(),
            permission: Default::default(),
            validation: Default::default(),
            diddirectory: Default::default(),
        }
    }
}

impl AppGenesis {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::InvalidGenesis(format!("cannot read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Write `genesis` into an empty store and return the resulting app hash.
pub fn init_chain<S: KvStoreMut>(
    app: &VeranaApp,
    store: &mut S,
    genesis: &AppGenesis,
) -> Result<String, AppError> {
    if app.last_block(&*store)?.is_some() {
        return Err(AppError::InvalidGenesis("chain is already initialized".into()));
    }
    if genesis.chain_id.trim().is_empty() {
        return Err(AppError::InvalidGenesis("chain id is required".into()));
    }

    let header = BlockHeader {
        chain_id: genesis.chain_id.clone(),
        height: 0,
        time: genesis.genesis_time,
    };
    let writes = {
        let mut ctx = Context::new(&*store, header);
        for balance in &genesis.balances {
            app.bank.mint(&mut ctx, &balance.address, balance.amount)?;
        }
        app.trust_deposit.init_genesis(&mut ctx, &genesis.trustdeposit)?;
        app.trust_registry.init_genesis(&mut ctx, &genesis.trustregistry)?;
        app.schemas.init_genesis(&mut ctx, &genesis.credentialschema)?;
        app.permissions.init_genesis(&mut ctx, &genesis.permission)?;
        app.validations.init_genesis(&mut ctx, &genesis.validation)?;
        app.did_directory.init_genesis(&mut ctx, &genesis.diddirectory)?;
        app.record_genesis_block(&mut ctx);
        ctx.into_parts().0
    };
    store.apply(writes)?;

    let app_hash = hex::encode(commit_hash(&*store)?);
    tracing::info!(
        chain_id = %genesis.chain_id,
        accounts = genesis.balances.len(),
        app_hash = %app_hash,
        "genesis initialized"
    );
    Ok(app_hash)
}

/// Snapshot the committed state as a genesis document.
pub fn export_genesis(app: &VeranaApp, store: &dyn KvStore) -> Result<AppGenesis, AppError> {
    let ctx = app.query_context(store)?;
    let header = ctx.header().clone();
    Ok(AppGenesis {
        chain_id: header.chain_id,
        genesis_time: header.time,
        balances: app.bank.balances(&ctx)?,
        trustdeposit: app.trust_deposit.export_genesis(&ctx)?,
        trustregistry: app.trust_registry.export_genesis(&ctx)?,
        credentialschema: app.schemas.export_genesis(&ctx)?,
        permission: app.permissions.export_genesis(&ctx)?,
        validation: app.validations.export_genesis(&ctx)?,
        diddirectory: app.did_directory.export_genesis(&ctx)?,
    })
}
