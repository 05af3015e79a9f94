use serde::{Deserialize, Serialize};
use verana_core::{
    ensure_gov_authority, resolve_response_max_size, validate_address, Collection, Context, Event,
    Item, Timestamp,
};
use verana_trustdeposit::TrustDepositLedger;
use verana_trustregistry::TrustRegistryManager;

use crate::error::DidDirectoryError;
use crate::types::{
    normalize_years, validate_directory_did, DidDirectory, GenesisState, MsgAddDid, MsgRenewDid,
    Params,
};

pub const MODULE_NAME: &str = "diddirectory";

const PARAMS: Item<Params> = Item::new(MODULE_NAME, 0x00);
const DIDS: Collection<str, DidDirectory> = Collection::new(MODULE_NAME, 0x01);

/// Filters of `ListDIDs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListDidsRequest {
    pub account: Option<String>,
    /// Only entries modified after this time.
    pub changed: Option<Timestamp>,
    pub expired: bool,
    pub over_grace: bool,
    pub response_max_size: u32,
}

#[derive(Clone)]
pub struct DidDirectoryManager {
    trust_deposit: TrustDepositLedger,
    trust_registry: TrustRegistryManager,
}

impl DidDirectoryManager {
    pub fn new(trust_deposit: TrustDepositLedger, trust_registry: TrustRegistryManager) -> Self {
        Self {
            trust_deposit,
            trust_registry,
        }
    }

    pub fn params(&self, ctx: &Context<'_>) -> Result<Params, DidDirectoryError> {
        Ok(PARAMS.get(ctx)?.unwrap_or_else(Params::default_params))
    }

    pub fn update_params(
        &self,
        ctx: &mut Context<'_>,
        authority: &str,
        params: Params,
    ) -> Result<(), DidDirectoryError> {
        ensure_gov_authority(authority)?;
        params.validate()?;
        PARAMS.set(ctx, &params);
        tracing::info!(module = MODULE_NAME, "params updated");
        Ok(())
    }

    pub fn add_did(&self, ctx: &mut Context<'_>, msg: &MsgAddDid) -> Result<(), DidDirectoryError> {
        validate_address(&msg.creator)?;
        validate_directory_did(&msg.did)?;
        let years = normalize_years(msg.years)?;
        if DIDS.has(ctx, &msg.did)? {
            return Err(DidDirectoryError::AlreadyExists(msg.did.clone()));
        }

        let deposit = self.lease_deposit(ctx, years)?;
        self.trust_deposit
            .adjust_trust_deposit(ctx, &msg.creator, deposit)?;

        let now = ctx.block_time();
        let entry = DidDirectory {
            did: msg.did.clone(),
            controller: msg.creator.clone(),
            created: now,
            modified: now,
            exp: now.checked_add_years(years)?,
            deposit,
        };
        DIDS.set(ctx, &entry.did, &entry);

        ctx.emit(
            Event::new("add_did")
                .attr("did", &entry.did)
                .attr("controller", &entry.controller)
                .attr("exp", entry.exp)
                .attr("deposit", deposit),
        );
        tracing::info!(did = %entry.did, controller = %entry.controller, years, deposit, "DID added");
        Ok(())
    }

    pub fn renew_did(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgRenewDid,
    ) -> Result<(), DidDirectoryError> {
        let mut entry = self.load(ctx, &msg.did)?;
        if entry.controller != msg.creator {
            tracing::warn!(did = %msg.did, creator = %msg.creator, "renew rejected: not the controller");
            return Err(DidDirectoryError::InvalidSigner(format!(
                "{} is controlled by {}",
                msg.did, entry.controller
            )));
        }
        let years = normalize_years(msg.years)?;
        let deposit = self.lease_deposit(ctx, years)?;
        self.trust_deposit
            .adjust_trust_deposit(ctx, &msg.creator, deposit)?;

        entry.exp = entry.exp.checked_add_years(years)?;
        entry.deposit = entry.deposit.checked_add(deposit).ok_or_else(|| {
            DidDirectoryError::InvalidRequest(format!("deposit of {} overflows", msg.did))
        })?;
        entry.modified = ctx.block_time();
        DIDS.set(ctx, &entry.did, &entry);

        ctx.emit(
            Event::new("renew_did")
                .attr("did", &entry.did)
                .attr("exp", entry.exp)
                .attr("deposit", entry.deposit),
        );
        tracing::info!(did = %entry.did, years, exp = %entry.exp, "DID renewed");
        Ok(())
    }

    /// Remove an entry and release its deposit to the controller.
    ///
    /// Within the grace period after expiration only the controller may
    /// remove it; afterwards anyone may.
    pub fn remove_did(
        &self,
        ctx: &mut Context<'_>,
        creator: &str,
        did: &str,
    ) -> Result<(), DidDirectoryError> {
        validate_address(creator)?;
        let entry = self.load(ctx, did)?;
        let grace_end = self.grace_end(ctx, &entry)?;
        let now = ctx.block_time();
        if now < grace_end && entry.controller != creator {
            tracing::warn!(did, creator, "remove rejected: not the controller before grace end");
            return Err(DidDirectoryError::InvalidSigner(format!(
                "only {} may remove {} before {}",
                entry.controller, did, grace_end
            )));
        }
        if entry.deposit > 0 {
            self.trust_deposit
                .adjust_trust_deposit(ctx, &entry.controller, -entry.deposit)?;
        }
        DIDS.remove(ctx, did);

        ctx.emit(
            Event::new("remove_did")
                .attr("did", did)
                .attr("removed_by", creator)
                .attr("released_deposit", entry.deposit),
        );
        tracing::info!(did, creator, controller = %entry.controller, "DID removed");
        Ok(())
    }

    /// Anyone may touch an entry to bump its `modified` time.
    pub fn touch_did(
        &self,
        ctx: &mut Context<'_>,
        creator: &str,
        did: &str,
    ) -> Result<(), DidDirectoryError> {
        let mut entry = self.load(ctx, did)?;
        entry.modified = ctx.block_time();
        DIDS.set(ctx, did, &entry);
        ctx.emit(
            Event::new("touch_did")
                .attr("did", did)
                .attr("touched_by", creator),
        );
        tracing::debug!(did, creator, "DID touched");
        Ok(())
    }

    pub fn get_did(
        &self,
        ctx: &Context<'_>,
        did: &str,
    ) -> Result<Option<DidDirectory>, DidDirectoryError> {
        Ok(DIDS.get(ctx, did)?)
    }

    /// Entries matching `req`, by ascending `modified`.
    pub fn list_dids(
        &self,
        ctx: &Context<'_>,
        req: &ListDidsRequest,
    ) -> Result<Vec<DidDirectory>, DidDirectoryError> {
        let limit = resolve_response_max_size(req.response_max_size)?;
        let now = ctx.block_time();
        let mut out = Vec::new();
        for entry in DIDS.values(ctx)? {
            if req.account.as_deref().map_or(false, |a| entry.controller != a)
                || req.changed.map_or(false, |t| entry.modified <= t)
            {
                continue;
            }
            if req.over_grace {
                if self.grace_end(ctx, &entry)? > now {
                    continue;
                }
            } else if req.expired && entry.exp > now {
                continue;
            }
            out.push(entry);
        }
        out.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.did.cmp(&b.did)));
        out.truncate(limit);
        Ok(out)
    }

    pub fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        genesis: &GenesisState,
    ) -> Result<(), DidDirectoryError> {
        genesis.params.validate()?;
        PARAMS.set(ctx, &genesis.params);
        for entry in &genesis.dids {
            validate_directory_did(&entry.did)?;
            DIDS.set(ctx, &entry.did, entry);
        }
        tracing::info!(dids = genesis.dids.len(), "DID directory genesis loaded");
        Ok(())
    }

    pub fn export_genesis(&self, ctx: &Context<'_>) -> Result<GenesisState, DidDirectoryError> {
        Ok(GenesisState {
            params: self.params(ctx)?,
            dids: DIDS.values(ctx)?,
        })
    }

    fn load(&self, ctx: &Context<'_>, did: &str) -> Result<DidDirectory, DidDirectoryError> {
        DIDS.get(ctx, did)?
            .ok_or_else(|| DidDirectoryError::NotFound(did.to_string()))
    }

    /// `DidDirectoryTrustDeposit × trustUnitPrice × years`.
    fn lease_deposit(&self, ctx: &Context<'_>, years: u32) -> Result<i64, DidDirectoryError> {
        let per_year = self.params(ctx)?.did_directory_trust_deposit;
        let unit = self.trust_registry.trust_unit_price(ctx)?;
        per_year
            .checked_mul(unit)
            .and_then(|v| v.checked_mul(years as u64))
            .and_then(|v| i64::try_from(v).ok())
            .ok_or_else(|| DidDirectoryError::InvalidRequest("DID deposit overflows".into()))
    }

    fn grace_end(
        &self,
        ctx: &Context<'_>,
        entry: &DidDirectory,
    ) -> Result<Timestamp, DidDirectoryError> {
        let grace = self.params(ctx)?.did_directory_grace_period;
        Ok(entry.exp.checked_add_days(grace as u64)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use verana_core::{gov_authority, Bank, BlockHeader, ErrorKind, MemoryStore, StoreBank};

    const ALICE: &str = "verana1alice";
    const BOB: &str = "verana1bob";
    const T0: i64 = 1_704_067_200;
    const DAY: i64 = 86_400;
    const DID: &str = "did:example:123";

    fn manager() -> DidDirectoryManager {
        let bank: Arc<dyn Bank> = Arc::new(StoreBank::new());
        let td = TrustDepositLedger::new(bank);
        DidDirectoryManager::new(td.clone(), TrustRegistryManager::new(td))
    }

    fn funded(store: &MemoryStore) -> Context<'_> {
        let mut ctx = Context::new(store, BlockHeader::at(Timestamp::from_unix(T0)));
        StoreBank::new().mint(&mut ctx, ALICE, 1_000_000_000).unwrap();
        StoreBank::new().mint(&mut ctx, BOB, 1_000_000_000).unwrap();
        ctx
    }

    fn add(ctx: &mut Context<'_>, mgr: &DidDirectoryManager, years: u32) -> Result<(), DidDirectoryError> {
        mgr.add_did(
            ctx,
            &MsgAddDid {
                creator: ALICE.into(),
                did: DID.into(),
                years,
            },
        )
    }

    #[test]
    fn test_add_did_locks_deposit() {
        let store = MemoryStore::new();
        let mgr = manager();
        let mut ctx = funded(&store);
        add(&mut ctx, &mgr, 0).unwrap();

        let entry = mgr.get_did(&ctx, DID).unwrap().unwrap();
        assert_eq!(entry.controller, ALICE);
        assert_eq!(entry.deposit, 5_000_000);
        assert_eq!(entry.exp, Timestamp::from_unix(T0).checked_add_years(1).unwrap());
        let td = mgr.trust_deposit.get_trust_deposit(&ctx, ALICE).unwrap().unwrap();
        assert_eq!(td.amount, 5_000_000);
        assert_eq!(ctx.events().last().unwrap().kind, "add_did");

        assert_eq!(add(&mut ctx, &mgr, 1).unwrap_err().kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_add_did_rejections() {
        let store = MemoryStore::new();
        let mgr = manager();
        let mut ctx = funded(&store);
        assert_eq!(add(&mut ctx, &mgr, 32).unwrap_err().kind(), ErrorKind::InvalidRequest);
        let err = mgr
            .add_did(
                &mut ctx,
                &MsgAddDid {
                    creator: ALICE.into(),
                    did: "did:example".into(),
                    years: 1,
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(mgr.get_did(&ctx, DID).unwrap().is_none());
    }

    #[test]
    fn test_renew_did() {
        let store = MemoryStore::new();
        let mgr = manager();
        let mut ctx = funded(&store);
        add(&mut ctx, &mgr, 1).unwrap();

        let renew = |creator: &str| MsgRenewDid {
            creator: creator.into(),
            did: DID.into(),
            years: 2,
        };
        assert_eq!(
            mgr.renew_did(&mut ctx, &renew(BOB)).unwrap_err().kind(),
            ErrorKind::InvalidSigner
        );
        mgr.renew_did(&mut ctx, &renew(ALICE)).unwrap();
        let entry = mgr.get_did(&ctx, DID).unwrap().unwrap();
        assert_eq!(entry.exp, Timestamp::from_unix(T0).checked_add_years(3).unwrap());
        assert_eq!(entry.deposit, 15_000_000);
    }

    #[test]
    fn test_remove_respects_grace_period() {
        let store = MemoryStore::new();
        let mgr = manager();
        let mut ctx = funded(&store);
        add(&mut ctx, &mgr, 1).unwrap();
        let exp = mgr.get_did(&ctx, DID).unwrap().unwrap().exp;

        // Expired but within grace: still controller-only.
        ctx.advance_to(2, exp.checked_add_days(10).unwrap());
        assert_eq!(
            mgr.remove_did(&mut ctx, BOB, DID).unwrap_err().kind(),
            ErrorKind::InvalidSigner
        );

        ctx.advance_to(3, exp.checked_add_days(30).unwrap());
        mgr.remove_did(&mut ctx, BOB, DID).unwrap();
        assert!(mgr.get_did(&ctx, DID).unwrap().is_none());
        let td = mgr.trust_deposit.get_trust_deposit(&ctx, ALICE).unwrap().unwrap();
        assert_eq!(td.claimable, 5_000_000);
    }

    #[test]
    fn test_controller_removes_any_time() {
        let store = MemoryStore::new();
        let mgr = manager();
        let mut ctx = funded(&store);
        add(&mut ctx, &mgr, 1).unwrap();
        mgr.remove_did(&mut ctx, ALICE, DID).unwrap();
        assert_eq!(
            mgr.remove_did(&mut ctx, ALICE, DID).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_touch_is_idempotent_within_block() {
        let store = MemoryStore::new();
        let mgr = manager();
        let mut ctx = funded(&store);
        add(&mut ctx, &mgr, 1).unwrap();
        ctx.advance_to(2, Timestamp::from_unix(T0 + 60));
        mgr.touch_did(&mut ctx, BOB, DID).unwrap();
        let once = mgr.get_did(&ctx, DID).unwrap().unwrap();
        for _ in 0..3 {
            mgr.touch_did(&mut ctx, BOB, DID).unwrap();
        }
        assert_eq!(mgr.get_did(&ctx, DID).unwrap().unwrap(), once);
        assert_eq!(once.modified, Timestamp::from_unix(T0 + 60));
    }

    #[test]
    fn test_list_dids_filters() {
        let store = MemoryStore::new();
        let mgr = manager();
        let mut ctx = funded(&store);
        add(&mut ctx, &mgr, 1).unwrap();
        ctx.advance_to(2, Timestamp::from_unix(T0 + 100 * DAY));
        mgr.add_did(
            &mut ctx,
            &MsgAddDid {
                creator: BOB.into(),
                did: "did:example:bob".into(),
                years: 1,
            },
        )
        .unwrap();

        let all = mgr.list_dids(&ctx, &ListDidsRequest::default()).unwrap();
        assert_eq!(
            all.iter().map(|d| d.did.as_str()).collect::<Vec<_>>(),
            vec![DID, "did:example:bob"]
        );
        let bobs = mgr
            .list_dids(
                &ctx,
                &ListDidsRequest {
                    account: Some(BOB.into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(bobs.len(), 1);
        let changed = mgr
            .list_dids(
                &ctx,
                &ListDidsRequest {
                    changed: Some(Timestamp::from_unix(T0)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(changed.len(), 1);

        // Alice's lease ends at T0 + 366d, bob's at T0 + 465d.
        ctx.advance_to(3, Timestamp::from_unix(T0 + 400 * DAY));
        let over_grace = mgr
            .list_dids(&ctx, &ListDidsRequest { over_grace: true, ..Default::default() })
            .unwrap();
        assert_eq!(
            over_grace.iter().map(|d| d.did.as_str()).collect::<Vec<_>>(),
            vec![DID]
        );
        let expired = mgr
            .list_dids(&ctx, &ListDidsRequest { expired: true, ..Default::default() })
            .unwrap();
        assert_eq!(expired.len(), 1);
        ctx.advance_to(4, Timestamp::from_unix(T0 + 500 * DAY));
        let expired = mgr
            .list_dids(&ctx, &ListDidsRequest { expired: true, ..Default::default() })
            .unwrap();
        assert_eq!(expired.len(), 2);
        assert!(mgr
            .list_dids(&ctx, &ListDidsRequest { response_max_size: 1025, ..Default::default() })
            .is_err());
    }

    #[test]
    fn test_update_params_requires_authority() {
        let store = MemoryStore::new();
        let mgr = manager();
        let mut ctx = funded(&store);
        let params = Params {
            did_directory_trust_deposit: 1,
            did_directory_grace_period: 10,
        };
        assert_eq!(
            mgr.update_params(&mut ctx, ALICE, params.clone()).unwrap_err().kind(),
            ErrorKind::InvalidSigner
        );
        mgr.update_params(&mut ctx, &gov_authority(), params.clone()).unwrap();
        assert_eq!(mgr.params(&ctx).unwrap(), params);
        add(&mut ctx, &mgr, 2).unwrap();
        assert_eq!(mgr.get_did(&ctx, DID).unwrap().unwrap().deposit, 2_000_000);
    }

    #[test]
    fn test_genesis_round_trip() {
        let store = MemoryStore::new();
        let mgr = manager();
        let mut ctx = funded(&store);
        add(&mut ctx, &mgr, 3).unwrap();
        let exported = mgr.export_genesis(&ctx).unwrap();
        let json = serde_json::to_string(&exported).unwrap();
        let back: GenesisState = serde_json::from_str(&json).unwrap();

        let fresh = MemoryStore::new();
        let mut ctx2 = Context::new(&fresh, BlockHeader::at(Timestamp::from_unix(T0)));
        mgr.init_genesis(&mut ctx2, &back).unwrap();
        assert_eq!(mgr.export_genesis(&ctx2).unwrap().dids, exported.dids);
    }
}
