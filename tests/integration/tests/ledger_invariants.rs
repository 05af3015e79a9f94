//! Integration test: trust deposit accounting, atomic transactions, and
//! state invariants that span several modules.

use proptest::prelude::*;
use verana_app::{export_genesis, AppGenesis, Msg, MsgResponse, Tx};
use verana_core::{module_address, Bank, Balance, Timestamp};
use verana_credentialschema::PermManagementMode;
use verana_diddirectory::{MsgAddDid, MsgRemoveDid, MsgRenewDid, MsgTouchDid};
use verana_integration_tests::*;
use verana_permission::{MsgCreateRootPermission, PermissionType};
use verana_trustdeposit::{MsgReclaimTrustDeposit, ReclaimOutcome, TrustDeposit};
use verana_validation::{MsgCancelValidation, MsgCreateValidation, MsgSetValidated, ValidationState};

/// Coins held in escrow by each module equal what its records owe.
fn assert_escrow_balances(chain: &Chain) {
    let ctx = chain.ctx().unwrap();
    let app = &chain.app;

    let deposits = app.trust_deposit.all_deposits(&ctx).unwrap();
    for td in &deposits {
        assert!(td.claimable <= td.amount, "claimable above amount for {}", td.account);
    }
    let locked: u64 = deposits.iter().map(|td| td.amount).sum();
    assert_eq!(
        app.bank.balance(&ctx, &app.trust_deposit.module_account()).unwrap(),
        locked
    );

    let pending_perm_fees: u64 = app
        .permissions
        .list_permissions(&ctx, None, 1024)
        .unwrap()
        .iter()
        .map(|p| p.vp_current_fees)
        .sum();
    assert_eq!(
        app.bank.balance(&ctx, &app.permissions.module_account()).unwrap(),
        pending_perm_fees
    );

    let pending_validation_fees: u64 = app
        .validations
        .export_genesis(&ctx)
        .unwrap()
        .validations
        .iter()
        .map(|v| v.current_fees)
        .sum();
    assert_eq!(
        app.bank.balance(&ctx, &app.validations.module_account()).unwrap(),
        pending_validation_fees
    );
}

fn add_did(creator: &str, did: &str, years: u32) -> Msg {
    Msg::AddDid(MsgAddDid {
        creator: creator.into(),
        did: did.into(),
        years,
    })
}

#[test]
fn test_reclaim_burns_and_pays_out() {
    let escrow = module_address(verana_trustdeposit::MODULE_NAME);
    let mut genesis = AppGenesis {
        genesis_time: Timestamp::from_unix(T0),
        balances: vec![
            Balance {
                address: ALICE.into(),
                amount: INITIAL_BALANCE,
            },
            Balance {
                address: escrow.clone(),
                amount: 1000,
            },
        ],
        ..AppGenesis::default()
    };
    genesis.trustdeposit.trust_deposits.push(TrustDeposit {
        account: ALICE.into(),
        share: 1000,
        amount: 1000,
        claimable: 500,
        ..Default::default()
    });
    let mut chain = Chain::from_genesis(genesis).unwrap();
    let supply_before = chain.app.bank.total_supply(&chain.ctx().unwrap()).unwrap();

    let tx = chain
        .submit(vec![Msg::ReclaimTrustDeposit(MsgReclaimTrustDeposit {
            creator: ALICE.into(),
            claimed: 200,
        })])
        .unwrap();
    assert_eq!(
        tx.responses,
        vec![MsgResponse::Reclaimed(ReclaimOutcome {
            burned: 120,
            payout: 80
        })]
    );

    let ctx = chain.ctx().unwrap();
    let td = chain
        .app
        .trust_deposit
        .get_trust_deposit(&ctx, ALICE)
        .unwrap()
        .unwrap();
    assert_eq!((td.share, td.amount, td.claimable), (800, 800, 300));
    assert_eq!(chain.app.bank.balance(&ctx, ALICE).unwrap(), INITIAL_BALANCE + 80);
    assert_eq!(chain.app.bank.balance(&ctx, &escrow).unwrap(), 800);
    assert_eq!(chain.app.bank.total_supply(&ctx).unwrap(), supply_before - 120);
    drop(ctx);

    // More than what is left claimable.
    let tx = chain
        .submit(vec![Msg::ReclaimTrustDeposit(MsgReclaimTrustDeposit {
            creator: ALICE.into(),
            claimed: 301,
        })])
        .unwrap();
    assert!(!tx.is_ok());
}

#[test]
fn test_failed_message_rolls_back_whole_tx() {
    let mut chain = Chain::new().unwrap();
    let before = verana_core::hashing::commit_hash(&chain.store).unwrap();

    // The registry would be created, but bob does not control it.
    let tx = chain
        .submit(vec![
            create_trust_registry(ALICE, "did:example:1"),
            add_did(ALICE, "did:example:dir", 1),
            create_schema(
                BOB,
                1,
                PermManagementMode::Open,
                PermManagementMode::Open,
            ),
        ])
        .unwrap();
    assert_eq!(tx.error_kind.as_deref(), Some("Unauthorized"));
    assert!(tx.events.is_empty());

    let ctx = chain.ctx().unwrap();
    assert!(chain.app.trust_registry.get_trust_registry(&ctx, 1).unwrap().is_none());
    assert!(chain.app.did_directory.get_did(&ctx, "did:example:dir").unwrap().is_none());
    assert!(chain.app.trust_deposit.get_trust_deposit(&ctx, ALICE).unwrap().is_none());
    assert_eq!(chain.app.bank.balance(&ctx, ALICE).unwrap(), INITIAL_BALANCE);
    drop(ctx);

    // Only the block bookkeeping moved; module state is untouched.
    for module in [
        verana_trustregistry::MODULE_NAME,
        verana_diddirectory::MODULE_NAME,
        verana_trustdeposit::MODULE_NAME,
        "bank",
    ] {
        let hash = verana_core::hashing::namespace_hash(&chain.store, module).unwrap();
        let mut fresh = Chain::new().unwrap();
        fresh.submit_block(vec![]).unwrap();
        assert_eq!(
            hash,
            verana_core::hashing::namespace_hash(&fresh.store, module).unwrap(),
            "namespace {} changed",
            module
        );
    }
    assert_ne!(before, verana_core::hashing::commit_hash(&chain.store).unwrap());
}

#[test]
fn test_did_uniqueness_across_txs() {
    let mut chain = Chain::new().unwrap();
    let result = chain
        .submit_block(vec![
            Tx::new(vec![create_trust_registry(ALICE, "did:example:1")]),
            Tx::new(vec![create_trust_registry(BOB, "did:example:1")]),
            Tx::new(vec![add_did(ALICE, "did:example:dir", 1)]),
            Tx::new(vec![add_did(BOB, "did:example:dir", 1)]),
        ])
        .unwrap();
    let kinds: Vec<Option<&str>> = result
        .tx_results
        .iter()
        .map(|r| r.error_kind.as_deref())
        .collect();
    assert_eq!(
        kinds,
        vec![None, Some("AlreadyExists"), None, Some("AlreadyExists")]
    );

    let ctx = chain.ctx().unwrap();
    let entry = chain
        .app
        .did_directory
        .get_did(&ctx, "did:example:dir")
        .unwrap()
        .unwrap();
    assert_eq!(entry.controller, ALICE);
    assert_eq!(
        chain
            .app
            .trust_registry
            .find_id_by_did(&ctx, "did:example:1")
            .unwrap(),
        Some(1)
    );
}

#[test]
fn test_did_lease_and_grace_period() {
    let mut chain = Chain::new().unwrap();
    chain.submit(vec![add_did(ALICE, "did:example:dir", 1)]).unwrap();
    chain
        .submit(vec![Msg::TouchDid(MsgTouchDid {
            creator: BOB.into(),
            did: "did:example:dir".into(),
        })])
        .unwrap();

    // Expired but still inside the 30 day grace period.
    chain.advance_days(370);
    let remove = |creator: &str| {
        Msg::RemoveDid(MsgRemoveDid {
            creator: creator.into(),
            did: "did:example:dir".into(),
        })
    };
    let tx = chain.submit(vec![remove(BOB)]).unwrap();
    assert_eq!(tx.error_kind.as_deref(), Some("InvalidSigner"));

    chain.advance_days(30);
    let tx = chain.submit(vec![remove(BOB)]).unwrap();
    assert!(tx.is_ok(), "{}", tx.log);

    // The lease deposit went back to alice as claimable.
    let ctx = chain.ctx().unwrap();
    let td = chain
        .app
        .trust_deposit
        .get_trust_deposit(&ctx, ALICE)
        .unwrap()
        .unwrap();
    assert_eq!(td.claimable, td.amount);
    assert_eq!(td.amount, 5 * 1_000_000);
    drop(ctx);
    assert_escrow_balances(&chain);
}

#[test]
fn test_renewed_did_reuses_claimable_deposit() {
    let mut chain = Chain::new().unwrap();
    chain.submit(vec![add_did(ALICE, "did:example:a", 1)]).unwrap();
    chain
        .submit(vec![Msg::RemoveDid(MsgRemoveDid {
            creator: ALICE.into(),
            did: "did:example:a".into(),
        })])
        .unwrap();
    chain.submit(vec![add_did(ALICE, "did:example:b", 1)]).unwrap();
    chain
        .submit(vec![Msg::RenewDid(MsgRenewDid {
            creator: ALICE.into(),
            did: "did:example:b".into(),
            years: 2,
        })])
        .unwrap();

    let ctx = chain.ctx().unwrap();
    let td = chain
        .app
        .trust_deposit
        .get_trust_deposit(&ctx, ALICE)
        .unwrap()
        .unwrap();
    // The second lease consumed the released deposit of the first.
    assert_eq!(td.amount, 15 * 1_000_000);
    assert_eq!(td.claimable, 0);
    assert_eq!(
        chain.app.bank.balance(&ctx, ALICE).unwrap(),
        INITIAL_BALANCE - 15 * 1_000_000
    );
    let entry = chain.app.did_directory.get_did(&ctx, "did:example:b").unwrap().unwrap();
    assert_eq!(entry.exp, Timestamp::from_unix(T0).checked_add_years(3).unwrap());
    drop(ctx);
    assert_escrow_balances(&chain);
}

#[test]
fn test_validation_rounds_keep_escrow_balanced() {
    let mut chain = Chain::new().unwrap();
    chain
        .submit(vec![
            create_trust_registry(ALICE, "did:example:1"),
            create_schema(
                ALICE,
                1,
                PermManagementMode::TrustRegistryValidation,
                PermManagementMode::Open,
            ),
            Msg::CreateRootPermission(MsgCreateRootPermission {
                creator: ALICE.into(),
                schema_id: 1,
                did: "did:example:1".into(),
                validation_fees: 50,
                ..Default::default()
            }),
        ])
        .unwrap();

    let create = |creator: &str| {
        Msg::CreateValidation(MsgCreateValidation {
            creator: creator.into(),
            validation_type: PermissionType::Issuer as i32,
            validator_perm_id: 1,
            country: String::new(),
        })
    };
    let result = chain
        .submit_block(vec![Tx::new(vec![create(BOB)]), Tx::new(vec![create(CAROL)])])
        .unwrap();
    assert!(result.tx_results.iter().all(|r| r.is_ok()));
    assert_escrow_balances(&chain);

    let tx = chain
        .submit(vec![Msg::SetValidated(MsgSetValidated {
            creator: ALICE.into(),
            id: 1,
            summary_hash: String::new(),
        })])
        .unwrap();
    assert!(tx.is_ok(), "{}", tx.log);
    let tx = chain
        .submit(vec![Msg::CancelValidation(MsgCancelValidation {
            creator: CAROL.into(),
            id: 2,
        })])
        .unwrap();
    assert!(tx.is_ok(), "{}", tx.log);
    assert_escrow_balances(&chain);

    let ctx = chain.ctx().unwrap();
    let v1 = chain.app.validations.get_validation(&ctx, 1).unwrap().unwrap();
    assert_eq!(v1.state(), ValidationState::Validated);
    assert_eq!(v1.exp, Some(Timestamp::from_unix(T0 + 180 * DAY)));
    let v2 = chain.app.validations.get_validation(&ctx, 2).unwrap().unwrap();
    assert_eq!(v2.state(), ValidationState::Terminated);
    // Fees of 50 are charged as is; cancelling refunds them and leaves the
    // 50 deposit claimable.
    assert_eq!(chain.app.bank.balance(&ctx, BOB).unwrap(), INITIAL_BALANCE - 100);
    assert_eq!(chain.app.bank.balance(&ctx, CAROL).unwrap(), INITIAL_BALANCE - 50);
    let carol = chain.app.trust_deposit.get_trust_deposit(&ctx, CAROL).unwrap().unwrap();
    assert_eq!((carol.amount, carol.claimable), (50, 50));
}

#[test]
fn test_every_schema_resolves_its_registry() {
    let mut chain = Chain::new().unwrap();
    chain
        .submit(vec![
            create_trust_registry(ALICE, "did:example:1"),
            create_trust_registry(BOB, "did:example:2"),
        ])
        .unwrap();
    chain
        .submit(vec![
            create_schema(ALICE, 1, PermManagementMode::Open, PermManagementMode::Open),
            create_schema(BOB, 2, PermManagementMode::Open, PermManagementMode::Open),
            create_schema(BOB, 2, PermManagementMode::Open, PermManagementMode::Open),
        ])
        .unwrap();
    // No schema can point at a registry that does not exist.
    let tx = chain
        .submit(vec![create_schema(ALICE, 9, PermManagementMode::Open, PermManagementMode::Open)])
        .unwrap();
    assert_eq!(tx.error_kind.as_deref(), Some("NotFound"));

    let ctx = chain.ctx().unwrap();
    let schemas = chain
        .app
        .schemas
        .list_credential_schemas(&ctx, &Default::default())
        .unwrap();
    assert_eq!(schemas.len(), 3);
    for schema in schemas {
        let registry = chain
            .app
            .trust_registry
            .get_trust_registry(&ctx, schema.tr_id)
            .unwrap();
        assert!(registry.is_some(), "schema {} has no registry", schema.id);
    }
}

#[test]
fn test_exported_genesis_replays_to_same_state() {
    let mut chain = Chain::new().unwrap();
    chain
        .submit(vec![
            create_trust_registry(ALICE, "did:example:1"),
            create_schema(ALICE, 1, PermManagementMode::Open, PermManagementMode::Open),
            add_did(BOB, "did:example:dir", 2),
        ])
        .unwrap();

    let exported = export_genesis(&chain.app, &chain.store).unwrap();
    let json = exported.to_json().unwrap();
    let imported: AppGenesis = serde_json::from_str(&json).unwrap();
    let replayed = Chain::from_genesis(imported).unwrap();

    for module in [
        verana_trustdeposit::MODULE_NAME,
        verana_trustregistry::MODULE_NAME,
        verana_credentialschema::MODULE_NAME,
        verana_permission::MODULE_NAME,
        verana_diddirectory::MODULE_NAME,
        "bank",
    ] {
        assert_eq!(
            verana_core::hashing::namespace_hash(&chain.store, module).unwrap(),
            verana_core::hashing::namespace_hash(&replayed.store, module).unwrap(),
            "namespace {} differs after replay",
            module
        );
    }
    assert_escrow_balances(&replayed);
}

#[derive(Debug, Clone)]
enum Op {
    Add(u8, u32),
    Renew(u8, u32),
    Remove(u8),
    Reclaim(u64),
    Advance(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..3, 0u32..3).prop_map(|(d, y)| Op::Add(d, y)),
        (0u8..3, 1u32..3).prop_map(|(d, y)| Op::Renew(d, y)),
        (0u8..3).prop_map(Op::Remove),
        (1u64..20_000_000).prop_map(Op::Reclaim),
        (1i64..400).prop_map(Op::Advance),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_deposit_invariants_hold(ops in proptest::collection::vec(op(), 1..25)) {
        let mut chain = Chain::new().unwrap();
        for op in ops {
            let did = |d: u8| format!("did:example:p{}", d);
            let msg = match op {
                Op::Add(d, years) => add_did(ALICE, &did(d), years),
                Op::Renew(d, years) => Msg::RenewDid(MsgRenewDid {
                    creator: ALICE.into(),
                    did: did(d),
                    years,
                }),
                Op::Remove(d) => Msg::RemoveDid(MsgRemoveDid {
                    creator: ALICE.into(),
                    did: did(d),
                }),
                Op::Reclaim(claimed) => Msg::ReclaimTrustDeposit(MsgReclaimTrustDeposit {
                    creator: ALICE.into(),
                    claimed,
                }),
                Op::Advance(days) => {
                    chain.advance_days(days);
                    continue;
                }
            };
            chain.submit(vec![msg]).unwrap();
            assert_escrow_balances(&chain);

            let ctx = chain.ctx().unwrap();
            let held: u64 = chain
                .app
                .did_directory
                .list_dids(&ctx, &Default::default())
                .unwrap()
                .iter()
                .map(|e| e.deposit as u64)
                .sum();
            let td = chain.app.trust_deposit.get_trust_deposit(&ctx, ALICE).unwrap();
            let locked = td.map_or(0, |td| td.locked());
            prop_assert_eq!(locked, held);
        }
    }
}
