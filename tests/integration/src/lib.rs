//! Block-driving harness shared by the integration tests.
//!
//! A [`Chain`] owns an in-memory store initialized from genesis and
//! commits one block per call to [`Chain::submit`].

use verana_app::{init_chain, AppError, AppGenesis, Block, BlockResult, Msg, Tx, TxResult, VeranaApp};
use verana_core::{Balance, Context, MemoryStore, Timestamp};
use verana_credentialschema::{MsgCreateCredentialSchema, PermManagementMode};
use verana_trustregistry::MsgCreateTrustRegistry;

pub const ALICE: &str = "verana1alice";
pub const BOB: &str = "verana1bob";
pub const CAROL: &str = "verana1carol";
pub const DAVE: &str = "verana1dave";

/// 2024-01-01T00:00:00Z
pub const T0: i64 = 1_704_067_200;
pub const DAY: i64 = 86_400;

/// Coins minted at genesis for every test account.
pub const INITIAL_BALANCE: u64 = 1_000_000_000_000;

pub const SCHEMA_JSON: &str = r#"{"$id":"vpr:verana:mainnet/cs/v1/js/VPR_CREDENTIAL_SCHEMA_ID","$schema":"https://json-schema.org/draft/2020-12/schema","type":"object","title":"Example","description":"Example credential","properties":{"name":{"type":"string"}}}"#;

pub struct Chain {
    pub app: VeranaApp,
    pub store: MemoryStore,
    height: u64,
    time: Timestamp,
}

impl Chain {
    /// Genesis at `T0` with the four test accounts funded.
    pub fn new() -> Result<Self, AppError> {
        let balances = [ALICE, BOB, CAROL, DAVE]
            .iter()
            .map(|address| Balance {
                address: address.to_string(),
                amount: INITIAL_BALANCE,
            })
            .collect();
        Self::from_genesis(AppGenesis {
            genesis_time: Timestamp::from_unix(T0),
            balances,
            ..AppGenesis::default()
        })
    }

    pub fn from_genesis(genesis: AppGenesis) -> Result<Self, AppError> {
        let app = VeranaApp::new();
        let mut store = MemoryStore::new();
        init_chain(&app, &mut store, &genesis)?;
        Ok(Self {
            app,
            store,
            height: 0,
            time: genesis.genesis_time,
        })
    }

    pub fn time(&self) -> Timestamp {
        self.time
    }

    /// Move the clock of the next block forward.
    pub fn advance_days(&mut self, days: i64) {
        self.time = Timestamp::from_unix(self.time.seconds + days * DAY);
    }

    /// Commit one block carrying `txs`.
    pub fn submit_block(&mut self, txs: Vec<Tx>) -> Result<BlockResult, AppError> {
        let block = Block {
            height: self.height + 1,
            time: self.time,
            txs,
        };
        let result = self.app.execute_block(&mut self.store, &block)?;
        self.height = block.height;
        tracing::debug!(height = self.height, app_hash = %result.app_hash, "test block committed");
        Ok(result)
    }

    /// Commit one block holding a single transaction of `msgs`.
    pub fn submit(&mut self, msgs: Vec<Msg>) -> Result<TxResult, AppError> {
        let mut result = self.submit_block(vec![Tx::new(msgs)])?;
        result
            .tx_results
            .pop()
            .ok_or_else(|| AppError::InvalidBlock("block returned no transaction result".into()))
    }

    /// Read-only context at the last committed block.
    pub fn ctx(&self) -> Result<Context<'_>, AppError> {
        self.app.query_context(&self.store)
    }
}

pub fn create_trust_registry(creator: &str, did: &str) -> Msg {
    Msg::CreateTrustRegistry(MsgCreateTrustRegistry {
        creator: creator.into(),
        did: did.into(),
        aka: String::new(),
        language: "en".into(),
        doc_url: "url1".into(),
        doc_hash: "hash1".into(),
    })
}

/// Schema on `tr_id` with 365/365/180/180/180 day periods.
pub fn create_schema(
    creator: &str,
    tr_id: u64,
    issuer_mode: PermManagementMode,
    verifier_mode: PermManagementMode,
) -> Msg {
    Msg::CreateCredentialSchema(MsgCreateCredentialSchema {
        creator: creator.into(),
        tr_id,
        json_schema: SCHEMA_JSON.into(),
        issuer_grantor_validation_validity_period: 365,
        verifier_grantor_validation_validity_period: 365,
        issuer_validation_validity_period: 180,
        verifier_validation_validity_period: 180,
        holder_validation_validity_period: 180,
        issuer_perm_management_mode: issuer_mode as i32,
        verifier_perm_management_mode: verifier_mode as i32,
    })
}
