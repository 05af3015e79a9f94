//! Module composition and transaction routing.
//!
//! A [`Tx`] is a list of [`Msg`]s executed in order inside one
//! [`Context`]. The write set is applied only when every message
//! succeeds; a failed transaction leaves the store and the event log
//! untouched.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use verana_core::hashing::commit_hash;
use verana_core::{
    Bank, BlockHeader, Context, CoreError, Event, Item, KvStore, KvStoreMut, StoreBank, Timestamp,
};
use verana_credentialschema::{
    MsgArchiveCredentialSchema, MsgCreateCredentialSchema, MsgUpdateCredentialSchema,
    SchemaRegistry,
};
use verana_diddirectory::{DidDirectoryManager, MsgAddDid, MsgRemoveDid, MsgRenewDid, MsgTouchDid};
use verana_permission::{
    MsgCancelPermissionVpLastRequest, MsgConfirmPermissionVpTermination,
    MsgCreateOrUpdatePermissionSession, MsgCreatePermission, MsgCreateRootPermission,
    MsgExtendPermission, MsgRenewPermissionVp, MsgRepayPermissionSlashedTrustDeposit,
    MsgRequestPermissionVpTermination, MsgRevokePermission, MsgSetPermissionVpToValidated,
    MsgSlashPermissionTrustDeposit, MsgStartPermissionVp, PermissionManager, SessionFees,
};
use verana_trustdeposit::{
    MsgReclaimTrustDeposit, MsgReclaimTrustDepositYield, MsgRepaySlashedTrustDeposit,
    MsgSlashTrustDeposit, ReclaimOutcome, TrustDepositLedger,
};
use verana_trustregistry::{
    MsgAddGovernanceFrameworkDocument, MsgArchiveTrustRegistry, MsgCreateTrustRegistry,
    MsgIncreaseActiveGovernanceFrameworkVersion, MsgUpdateTrustRegistry, TrustRegistryManager,
};
use verana_validation::{
    MsgCancelValidation, MsgCreateValidation, MsgRenewValidation,
    MsgRequestValidationTermination, MsgSetValidated, ValidationManager,
};

use crate::error::AppError;

/// Namespace of the chain bookkeeping entry.
pub const CHAIN_NAMESPACE: &str = "chain";

const LAST_BLOCK: Item<BlockInfo> = Item::new(CHAIN_NAMESPACE, 0x00);

/// Height and time of the last committed block (height 0 is genesis).
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct BlockInfo {
    #[prost(string, tag = "1")]
    pub chain_id: String,
    #[prost(uint64, tag = "2")]
    pub height: u64,
    #[prost(message, required, tag = "3")]
    pub time: Timestamp,
}

/// Every state mutation the application accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Msg {
    // Trust deposit
    ReclaimTrustDepositYield(MsgReclaimTrustDepositYield),
    ReclaimTrustDeposit(MsgReclaimTrustDeposit),
    RepaySlashedTrustDeposit(MsgRepaySlashedTrustDeposit),
    SlashTrustDeposit(MsgSlashTrustDeposit),
    UpdateTrustDepositParams(verana_trustdeposit::MsgUpdateParams),

    // Trust registry
    CreateTrustRegistry(MsgCreateTrustRegistry),
    AddGovernanceFrameworkDocument(MsgAddGovernanceFrameworkDocument),
    IncreaseActiveGovernanceFrameworkVersion(MsgIncreaseActiveGovernanceFrameworkVersion),
    UpdateTrustRegistry(MsgUpdateTrustRegistry),
    ArchiveTrustRegistry(MsgArchiveTrustRegistry),
    UpdateTrustRegistryParams(verana_trustregistry::MsgUpdateParams),

    // Credential schema
    CreateCredentialSchema(MsgCreateCredentialSchema),
    UpdateCredentialSchema(MsgUpdateCredentialSchema),
    ArchiveCredentialSchema(MsgArchiveCredentialSchema),
    UpdateCredentialSchemaParams(verana_credentialschema::MsgUpdateParams),

    // Permission
    StartPermissionVp(MsgStartPermissionVp),
    RenewPermissionVp(MsgRenewPermissionVp),
    SetPermissionVpToValidated(MsgSetPermissionVpToValidated),
    RequestPermissionVpTermination(MsgRequestPermissionVpTermination),
    ConfirmPermissionVpTermination(MsgConfirmPermissionVpTermination),
    CancelPermissionVpLastRequest(MsgCancelPermissionVpLastRequest),
    CreateRootPermission(MsgCreateRootPermission),
    CreatePermission(MsgCreatePermission),
    ExtendPermission(MsgExtendPermission),
    RevokePermission(MsgRevokePermission),
    SlashPermissionTrustDeposit(MsgSlashPermissionTrustDeposit),
    RepayPermissionSlashedTrustDeposit(MsgRepayPermissionSlashedTrustDeposit),
    CreateOrUpdatePermissionSession(MsgCreateOrUpdatePermissionSession),
    UpdatePermissionParams(verana_permission::MsgUpdateParams),

    // Validation
    CreateValidation(MsgCreateValidation),
    RenewValidation(MsgRenewValidation),
    SetValidated(MsgSetValidated),
    CancelValidation(MsgCancelValidation),
    RequestValidationTermination(MsgRequestValidationTermination),

    // DID directory
    AddDid(MsgAddDid),
    RenewDid(MsgRenewDid),
    RemoveDid(MsgRemoveDid),
    TouchDid(MsgTouchDid),
    UpdateDidDirectoryParams(verana_diddirectory::MsgUpdateParams),
}

impl Msg {
    /// Address that signed the message.
    pub fn signer(&self) -> &str {
        match self {
            Self::ReclaimTrustDepositYield(m) => &m.creator,
            Self::ReclaimTrustDeposit(m) => &m.creator,
            Self::RepaySlashedTrustDeposit(m) => &m.creator,
            Self::SlashTrustDeposit(m) => &m.authority,
            Self::UpdateTrustDepositParams(m) => &m.authority,
            Self::CreateTrustRegistry(m) => &m.creator,
            Self::AddGovernanceFrameworkDocument(m) => &m.creator,
            Self::IncreaseActiveGovernanceFrameworkVersion(m) => &m.creator,
            Self::UpdateTrustRegistry(m) => &m.creator,
            Self::ArchiveTrustRegistry(m) => &m.creator,
            Self::UpdateTrustRegistryParams(m) => &m.authority,
            Self::CreateCredentialSchema(m) => &m.creator,
            Self::UpdateCredentialSchema(m) => &m.creator,
            Self::ArchiveCredentialSchema(m) => &m.creator,
            Self::UpdateCredentialSchemaParams(m) => &m.authority,
            Self::StartPermissionVp(m) => &m.creator,
            Self::RenewPermissionVp(m) => &m.creator,
            Self::SetPermissionVpToValidated(m) => &m.creator,
            Self::RequestPermissionVpTermination(m) => &m.creator,
            Self::ConfirmPermissionVpTermination(m) => &m.creator,
            Self::CancelPermissionVpLastRequest(m) => &m.creator,
            Self::CreateRootPermission(m) => &m.creator,
            Self::CreatePermission(m) => &m.creator,
            Self::ExtendPermission(m) => &m.creator,
            Self::RevokePermission(m) => &m.creator,
            Self::SlashPermissionTrustDeposit(m) => &m.creator,
            Self::RepayPermissionSlashedTrustDeposit(m) => &m.creator,
            Self::CreateOrUpdatePermissionSession(m) => &m.creator,
            Self::UpdatePermissionParams(m) => &m.authority,
            Self::CreateValidation(m) => &m.creator,
            Self::RenewValidation(m) => &m.creator,
            Self::SetValidated(m) => &m.creator,
            Self::CancelValidation(m) => &m.creator,
            Self::RequestValidationTermination(m) => &m.creator,
            Self::AddDid(m) => &m.creator,
            Self::RenewDid(m) => &m.creator,
            Self::RemoveDid(m) => &m.creator,
            Self::TouchDid(m) => &m.creator,
            Self::UpdateDidDirectoryParams(m) => &m.authority,
        }
    }
}

/// Handler output of one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MsgResponse {
    Empty,
    /// Id allocated by a create message.
    Created { id: u64 },
    /// Yield paid out by `ReclaimTrustDepositYield`.
    Yield { amount: u64 },
    Reclaimed(ReclaimOutcome),
    SessionFees(SessionFees),
}

/// An ordered batch of messages committed atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tx {
    pub msgs: Vec<Msg>,
}

impl Tx {
    pub fn new(msgs: Vec<Msg>) -> Self {
        Self { msgs }
    }
}

/// Outcome of one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxResult {
    /// Error category when the transaction was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub log: String,
    #[serde(default)]
    pub responses: Vec<MsgResponse>,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl TxResult {
    pub fn is_ok(&self) -> bool {
        self.error_kind.is_none()
    }

    fn committed(responses: Vec<MsgResponse>, events: Vec<Event>) -> Self {
        Self {
            error_kind: None,
            log: String::new(),
            responses,
            events,
        }
    }

    fn rejected(err: &AppError) -> Self {
        Self {
            error_kind: Some(err.kind().to_string()),
            log: err.to_string(),
            responses: Vec::new(),
            events: Vec::new(),
        }
    }
}

/// A block to execute: every transaction observes `time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub time: Timestamp,
    #[serde(default)]
    pub txs: Vec<Tx>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockResult {
    pub height: u64,
    pub tx_results: Vec<TxResult>,
    /// Hex commit hash of the store after the block.
    pub app_hash: String,
}

/// The composed Verana state machine.
#[derive(Clone)]
pub struct VeranaApp {
    pub bank: StoreBank,
    pub trust_deposit: TrustDepositLedger,
    pub trust_registry: TrustRegistryManager,
    pub schemas: SchemaRegistry,
    pub permissions: PermissionManager,
    pub validations: ValidationManager,
    pub did_directory: DidDirectoryManager,
}

impl Default for VeranaApp {
    fn default() -> Self {
        Self::new()
    }
}

impl VeranaApp {
    /// Wire every module over a store-backed bank.
    pub fn new() -> Self {
        let bank = StoreBank::new();
        let shared: Arc<dyn Bank> = Arc::new(bank);
        let trust_deposit = TrustDepositLedger::new(shared.clone());
        let trust_registry = TrustRegistryManager::new(trust_deposit.clone());
        let schemas = SchemaRegistry::new(trust_registry.clone(), trust_deposit.clone());
        let permissions = PermissionManager::new(
            shared.clone(),
            trust_deposit.clone(),
            trust_registry.clone(),
            schemas.clone(),
        );
        let validations = ValidationManager::new(
            shared,
            trust_deposit.clone(),
            schemas.clone(),
            permissions.clone(),
        );
        let did_directory = DidDirectoryManager::new(trust_deposit.clone(), trust_registry.clone());
        Self {
            bank,
            trust_deposit,
            trust_registry,
            schemas,
            permissions,
            validations,
            did_directory,
        }
    }

    /// Route one message to its module.
    pub fn deliver(&self, ctx: &mut Context<'_>, msg: &Msg) -> Result<MsgResponse, AppError> {
        tracing::debug!(signer = msg.signer(), "delivering message");
        let empty = MsgResponse::Empty;
        let response = match msg {
            Msg::ReclaimTrustDepositYield(m) => MsgResponse::Yield {
                amount: self.trust_deposit.reclaim_yield(ctx, &m.creator)?,
            },
            Msg::ReclaimTrustDeposit(m) => MsgResponse::Reclaimed(
                self.trust_deposit
                    .reclaim_trust_deposit(ctx, &m.creator, m.claimed)?,
            ),
            Msg::RepaySlashedTrustDeposit(m) => {
                self.trust_deposit
                    .repay_slashed_trust_deposit(ctx, &m.creator, &m.account, m.amount)?;
                empty
            }
            Msg::SlashTrustDeposit(m) => {
                self.trust_deposit
                    .slash_by_authority(ctx, &m.authority, &m.account, m.amount)?;
                empty
            }
            Msg::UpdateTrustDepositParams(m) => {
                self.trust_deposit
                    .update_params(ctx, &m.authority, required(&m.params)?)?;
                empty
            }

            Msg::CreateTrustRegistry(m) => MsgResponse::Created {
                id: self.trust_registry.create_trust_registry(ctx, m)?,
            },
            Msg::AddGovernanceFrameworkDocument(m) => {
                self.trust_registry.add_governance_framework_document(ctx, m)?;
                empty
            }
            Msg::IncreaseActiveGovernanceFrameworkVersion(m) => {
                self.trust_registry
                    .increase_active_gf_version(ctx, &m.creator, m.id)?;
                empty
            }
            Msg::UpdateTrustRegistry(m) => {
                self.trust_registry.update_trust_registry(ctx, m)?;
                empty
            }
            Msg::ArchiveTrustRegistry(m) => {
                self.trust_registry
                    .archive_trust_registry(ctx, &m.creator, m.id, m.archive)?;
                empty
            }
            Msg::UpdateTrustRegistryParams(m) => {
                self.trust_registry
                    .update_params(ctx, &m.authority, required(&m.params)?)?;
                empty
            }

            Msg::CreateCredentialSchema(m) => MsgResponse::Created {
                id: self.schemas.create_credential_schema(ctx, m)?,
            },
            Msg::UpdateCredentialSchema(m) => {
                self.schemas.update_credential_schema(ctx, m)?;
                empty
            }
            Msg::ArchiveCredentialSchema(m) => {
                self.schemas
                    .archive_credential_schema(ctx, &m.creator, m.id, m.archive)?;
                empty
            }
            Msg::UpdateCredentialSchemaParams(m) => {
                self.schemas
                    .update_params(ctx, &m.authority, required(&m.params)?)?;
                empty
            }

            Msg::StartPermissionVp(m) => MsgResponse::Created {
                id: self.permissions.start_permission_vp(ctx, m)?,
            },
            Msg::RenewPermissionVp(m) => {
                self.permissions.renew_permission_vp(ctx, &m.creator, m.id)?;
                empty
            }
            Msg::SetPermissionVpToValidated(m) => {
                self.permissions.set_permission_vp_to_validated(ctx, m)?;
                empty
            }
            Msg::RequestPermissionVpTermination(m) => {
                self.permissions
                    .request_permission_vp_termination(ctx, &m.creator, m.id)?;
                empty
            }
            Msg::ConfirmPermissionVpTermination(m) => {
                self.permissions
                    .confirm_permission_vp_termination(ctx, &m.creator, m.id)?;
                empty
            }
            Msg::CancelPermissionVpLastRequest(m) => {
                self.permissions
                    .cancel_permission_vp_last_request(ctx, &m.creator, m.id)?;
                empty
            }
            Msg::CreateRootPermission(m) => MsgResponse::Created {
                id: self.permissions.create_root_permission(ctx, m)?,
            },
            Msg::CreatePermission(m) => MsgResponse::Created {
                id: self.permissions.create_permission(ctx, m)?,
            },
            Msg::ExtendPermission(m) => {
                self.permissions
                    .extend_permission(ctx, &m.creator, m.id, m.effective_until)?;
                empty
            }
            Msg::RevokePermission(m) => {
                self.permissions.revoke_permission(ctx, &m.creator, m.id)?;
                empty
            }
            Msg::SlashPermissionTrustDeposit(m) => {
                self.permissions
                    .slash_permission_trust_deposit(ctx, &m.creator, m.id, m.amount)?;
                empty
            }
            Msg::RepayPermissionSlashedTrustDeposit(m) => {
                self.permissions
                    .repay_permission_slashed_trust_deposit(ctx, &m.creator, m.id)?;
                empty
            }
            Msg::CreateOrUpdatePermissionSession(m) => MsgResponse::SessionFees(
                self.permissions.create_or_update_permission_session(ctx, m)?,
            ),
            Msg::UpdatePermissionParams(m) => {
                self.permissions
                    .update_params(ctx, &m.authority, required(&m.params)?)?;
                empty
            }

            Msg::CreateValidation(m) => MsgResponse::Created {
                id: self.validations.create_validation(ctx, m)?,
            },
            Msg::RenewValidation(m) => {
                self.validations.renew_validation(ctx, m)?;
                empty
            }
            Msg::SetValidated(m) => {
                self.validations.set_validated(ctx, m)?;
                empty
            }
            Msg::CancelValidation(m) => {
                self.validations.cancel_validation(ctx, &m.creator, m.id)?;
                empty
            }
            Msg::RequestValidationTermination(m) => {
                self.validations
                    .request_validation_termination(ctx, &m.creator, m.id)?;
                empty
            }

            Msg::AddDid(m) => {
                self.did_directory.add_did(ctx, m)?;
                empty
            }
            Msg::RenewDid(m) => {
                self.did_directory.renew_did(ctx, m)?;
                empty
            }
            Msg::RemoveDid(m) => {
                self.did_directory.remove_did(ctx, &m.creator, &m.did)?;
                empty
            }
            Msg::TouchDid(m) => {
                self.did_directory.touch_did(ctx, &m.creator, &m.did)?;
                empty
            }
            Msg::UpdateDidDirectoryParams(m) => {
                self.did_directory
                    .update_params(ctx, &m.authority, required(&m.params)?)?;
                empty
            }
        };
        Ok(response)
    }

    /// Run every message of `tx` against `ctx`, stopping at the first error.
    pub fn run_tx(&self, ctx: &mut Context<'_>, tx: &Tx) -> Result<Vec<MsgResponse>, AppError> {
        if tx.msgs.is_empty() {
            return Err(CoreError::InvalidRequest("transaction has no messages".into()).into());
        }
        tx.msgs.iter().map(|msg| self.deliver(ctx, msg)).collect()
    }

    /// Execute `tx` at `header` and commit it into `store` if it succeeds.
    ///
    /// A rejected transaction is reported in the result, not as an error;
    /// `Err` means the store itself failed.
    pub fn execute_tx<S: KvStoreMut>(
        &self,
        store: &mut S,
        header: &BlockHeader,
        tx: &Tx,
    ) -> Result<TxResult, AppError> {
        let outcome = {
            let mut ctx = Context::new(&*store, header.clone());
            match self.run_tx(&mut ctx, tx) {
                Ok(responses) => Ok((ctx.into_parts(), responses)),
                Err(err) => Err(err),
            }
        };
        match outcome {
            Ok(((writes, events), responses)) => {
                store.apply(writes)?;
                Ok(TxResult::committed(responses, events))
            }
            Err(err) => {
                tracing::warn!(
                    height = header.height,
                    kind = %err.kind(),
                    error = %err,
                    "transaction rejected"
                );
                Ok(TxResult::rejected(&err))
            }
        }
    }

    /// Execute a block on top of the last committed one.
    pub fn execute_block<S: KvStoreMut>(
        &self,
        store: &mut S,
        block: &Block,
    ) -> Result<BlockResult, AppError> {
        let last = self
            .last_block(&*store)?
            .ok_or_else(|| AppError::InvalidBlock("chain has no genesis".into()))?;
        if block.height != last.height + 1 {
            return Err(AppError::InvalidBlock(format!(
                "expected height {}, got {}",
                last.height + 1,
                block.height
            )));
        }
        if block.time < last.time {
            return Err(AppError::InvalidBlock(format!(
                "block time {} precedes last block time {}",
                block.time, last.time
            )));
        }

        let header = BlockHeader {
            chain_id: last.chain_id.clone(),
            height: block.height,
            time: block.time,
        };
        let mut tx_results = Vec::with_capacity(block.txs.len());
        for tx in &block.txs {
            tx_results.push(self.execute_tx(store, &header, tx)?);
        }

        let writes = {
            let mut ctx = Context::new(&*store, header.clone());
            LAST_BLOCK.set(
                &mut ctx,
                &BlockInfo {
                    chain_id: header.chain_id.clone(),
                    height: header.height,
                    time: header.time,
                },
            );
            ctx.into_parts().0
        };
        store.apply(writes)?;

        let app_hash = hex::encode(commit_hash(&*store)?);
        let committed = tx_results.iter().filter(|r| r.is_ok()).count();
        tracing::info!(
            height = block.height,
            txs = block.txs.len(),
            committed,
            app_hash = %app_hash,
            "block committed"
        );
        Ok(BlockResult {
            height: block.height,
            tx_results,
            app_hash,
        })
    }

    /// Bookkeeping entry of the last committed block, if the chain exists.
    pub fn last_block(&self, store: &dyn KvStore) -> Result<Option<BlockInfo>, AppError> {
        let ctx = Context::new(store, BlockHeader::at(Timestamp::default()));
        Ok(LAST_BLOCK.get(&ctx)?)
    }

    pub(crate) fn record_genesis_block(&self, ctx: &mut Context<'_>) {
        let header = ctx.header().clone();
        LAST_BLOCK.set(
            ctx,
            &BlockInfo {
                chain_id: header.chain_id,
                height: header.height,
                time: header.time,
            },
        );
    }

    /// Read-only context positioned at the last committed block.
    pub fn query_context<'a>(&self, store: &'a dyn KvStore) -> Result<Context<'a>, AppError> {
        let header = match self.last_block(store)? {
            Some(last) => BlockHeader {
                chain_id: last.chain_id,
                height: last.height,
                time: last.time,
            },
            None => BlockHeader::at(Timestamp::default()),
        };
        Ok(Context::new(store, header))
    }
}

fn required<P: Clone>(params: &Option<P>) -> Result<P, AppError> {
    params
        .clone()
        .ok_or_else(|| CoreError::InvalidRequest("params are required".into()).into())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::genesis::{init_chain, AppGenesis};
    use verana_core::{Balance, MemoryStore};

    pub const ALICE: &str = "verana1alice";
    pub const BOB: &str = "verana1bob";
    pub const T0: i64 = 1_704_067_200;

    pub fn started() -> (VeranaApp, MemoryStore) {
        let app = VeranaApp::new();
        let mut store = MemoryStore::new();
        let genesis = AppGenesis {
            genesis_time: Timestamp::from_unix(T0),
            balances: vec![
                Balance {
                    address: ALICE.into(),
                    amount: 1_000_000_000_000,
                },
                Balance {
                    address: BOB.into(),
                    amount: 1_000_000_000_000,
                },
            ],
            ..AppGenesis::default()
        };
        init_chain(&app, &mut store, &genesis).unwrap();
        (app, store)
    }

    pub fn create_tr(creator: &str, did: &str) -> Msg {
        Msg::CreateTrustRegistry(MsgCreateTrustRegistry {
            creator: creator.into(),
            did: did.into(),
            aka: String::new(),
            language: "en".into(),
            doc_url: "https://example.com/gf.pdf".into(),
            doc_hash: "hash1".into(),
        })
    }

    fn block(height: u64, txs: Vec<Tx>) -> Block {
        Block {
            height,
            time: Timestamp::from_unix(T0 + height as i64 * 5),
            txs,
        }
    }

    #[test]
    fn test_msg_json_routing_tag() {
        let json = r#"{"type":"touch_did","creator":"verana1bob","did":"did:example:1"}"#;
        let msg: Msg = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, Msg::TouchDid(ref m) if m.did == "did:example:1"));
        assert_eq!(msg.signer(), BOB);
    }

    #[test]
    fn test_block_commits_successful_tx() {
        let (app, mut store) = started();
        let result = app
            .execute_block(&mut store, &block(1, vec![Tx::new(vec![create_tr(ALICE, "did:example:1")])]))
            .unwrap();

        assert_eq!(result.tx_results.len(), 1);
        assert!(result.tx_results[0].is_ok());
        assert_eq!(result.tx_results[0].responses, vec![MsgResponse::Created { id: 1 }]);
        assert!(result.tx_results[0]
            .events
            .iter()
            .any(|e| e.kind == "create_trust_registry"));

        let ctx = app.query_context(&store).unwrap();
        assert!(app.trust_registry.get_trust_registry(&ctx, 1).unwrap().is_some());
        assert_eq!(app.last_block(&store).unwrap().unwrap().height, 1);
    }

    #[test]
    fn test_failed_tx_rolls_back_every_message() {
        let (app, mut store) = started();
        let registry_hash = |store: &MemoryStore| {
            verana_core::hashing::namespace_hash(store, verana_trustregistry::MODULE_NAME)
                .unwrap()
        };
        let before = registry_hash(&store);
        // Second message duplicates the DID of the first.
        let tx = Tx::new(vec![
            create_tr(ALICE, "did:example:1"),
            create_tr(BOB, "did:example:1"),
        ]);
        let result = app.execute_block(&mut store, &block(1, vec![tx])).unwrap();

        let tx_result = &result.tx_results[0];
        assert!(!tx_result.is_ok());
        assert_eq!(tx_result.error_kind.as_deref(), Some("AlreadyExists"));
        assert!(tx_result.events.is_empty());

        let ctx = app.query_context(&store).unwrap();
        assert!(app.trust_registry.get_trust_registry(&ctx, 1).unwrap().is_none());
        assert_eq!(app.bank.balance(&ctx, ALICE).unwrap(), 1_000_000_000_000);
        drop(ctx);
        assert_eq!(registry_hash(&store), before);
    }

    #[test]
    fn test_later_tx_sees_earlier_commit() {
        let (app, mut store) = started();
        let txs = vec![
            Tx::new(vec![create_tr(ALICE, "did:example:1")]),
            Tx::new(vec![Msg::ArchiveTrustRegistry(MsgArchiveTrustRegistry {
                creator: ALICE.into(),
                id: 1,
                archive: true,
            })]),
        ];
        let result = app.execute_block(&mut store, &block(1, txs)).unwrap();
        assert!(result.tx_results.iter().all(TxResult::is_ok));
    }

    #[test]
    fn test_block_height_and_time_checks() {
        let (app, mut store) = started();
        let err = app.execute_block(&mut store, &block(2, vec![])).unwrap_err();
        assert!(matches!(err, AppError::InvalidBlock(_)));

        let early = Block {
            height: 1,
            time: Timestamp::from_unix(T0 - 1),
            txs: vec![],
        };
        assert!(matches!(
            app.execute_block(&mut store, &early),
            Err(AppError::InvalidBlock(_))
        ));

        let empty = app.execute_block(&mut MemoryStore::new(), &block(1, vec![]));
        assert!(matches!(empty, Err(AppError::InvalidBlock(_))));
    }

    #[test]
    fn test_empty_tx_rejected() {
        let (app, mut store) = started();
        let result = app
            .execute_block(&mut store, &block(1, vec![Tx::new(vec![])]))
            .unwrap();
        assert_eq!(result.tx_results[0].error_kind.as_deref(), Some("InvalidRequest"));
    }

    #[test]
    fn test_update_params_requires_payload_and_authority() {
        let (app, mut store) = started();
        let missing = Tx::new(vec![Msg::UpdateDidDirectoryParams(
            verana_diddirectory::MsgUpdateParams {
                authority: verana_core::gov_authority(),
                params: None,
            },
        )]);
        let wrong = Tx::new(vec![Msg::UpdateDidDirectoryParams(
            verana_diddirectory::MsgUpdateParams {
                authority: ALICE.into(),
                params: Some(verana_diddirectory::Params::default_params()),
            },
        )]);
        let result = app
            .execute_block(&mut store, &block(1, vec![missing, wrong]))
            .unwrap();
        assert_eq!(result.tx_results[0].error_kind.as_deref(), Some("InvalidRequest"));
        assert_eq!(result.tx_results[1].error_kind.as_deref(), Some("InvalidSigner"));
    }

    #[test]
    fn test_app_hash_is_deterministic() {
        let (app, mut a) = started();
        let (_, mut b) = started();
        let txs = || vec![Tx::new(vec![create_tr(ALICE, "did:example:1")])];
        let ra = app.execute_block(&mut a, &block(1, txs())).unwrap();
        let rb = app.execute_block(&mut b, &block(1, txs())).unwrap();
        assert_eq!(ra.app_hash, rb.app_hash);
        assert_eq!(ra.app_hash.len(), 64);
    }
}
