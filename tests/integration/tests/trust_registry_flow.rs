//! Integration test: registry, schema, and permission tree across modules,
//! driven through blocks of the composed application.

use verana_app::{Msg, MsgResponse};
use verana_core::{Bank, Timestamp};
use verana_credentialschema::PermManagementMode;
use verana_integration_tests::*;
use verana_permission::{
    AuthorizationVerdict, IsAuthorizedIssuerRequest, MsgCreateRootPermission,
    MsgSetPermissionVpToValidated, MsgStartPermissionVp, PermissionType, VpState,
};

/// Registry 1 and schema 1 owned by alice, both roles under grantor
/// validation.
fn registry_and_schema(chain: &mut Chain) {
    let tx = chain
        .submit(vec![create_trust_registry(ALICE, "did:example:1")])
        .unwrap();
    assert_eq!(tx.responses, vec![MsgResponse::Created { id: 1 }]);
    let tx = chain
        .submit(vec![create_schema(
            ALICE,
            1,
            PermManagementMode::GrantorValidation,
            PermManagementMode::GrantorValidation,
        )])
        .unwrap();
    assert_eq!(tx.responses, vec![MsgResponse::Created { id: 1 }]);
}

fn root(fees: (u64, u64, u64)) -> Msg {
    Msg::CreateRootPermission(MsgCreateRootPermission {
        creator: ALICE.into(),
        schema_id: 1,
        did: "did:example:1".into(),
        validation_fees: fees.0,
        issuance_fees: fees.1,
        verification_fees: fees.2,
        ..Default::default()
    })
}

fn start(creator: &str, perm_type: PermissionType, validator: u64, did: &str) -> Msg {
    Msg::StartPermissionVp(MsgStartPermissionVp {
        creator: creator.into(),
        perm_type: perm_type as i32,
        validator_perm_id: validator,
        country: "US".into(),
        did: did.into(),
    })
}

fn validated(validator: &str, id: u64, effective_until: Option<Timestamp>) -> Msg {
    Msg::SetPermissionVpToValidated(MsgSetPermissionVpToValidated {
        creator: validator.into(),
        id,
        effective_until,
        ..Default::default()
    })
}

/// Root p1 with the given fees, issuer grantor p2 for carol validated
/// until T0 + 365d.
fn grantor_tree(chain: &mut Chain, fees: (u64, u64, u64)) {
    registry_and_schema(chain);
    let tx = chain.submit(vec![root(fees)]).unwrap();
    assert_eq!(tx.responses, vec![MsgResponse::Created { id: 1 }]);
    let tx = chain
        .submit(vec![start(CAROL, PermissionType::IssuerGrantor, 1, "did:example:c")])
        .unwrap();
    assert_eq!(tx.responses, vec![MsgResponse::Created { id: 2 }]);
    let until = Timestamp::from_unix(T0 + 365 * DAY);
    let tx = chain.submit(vec![validated(ALICE, 2, Some(until))]).unwrap();
    assert!(tx.is_ok(), "{}", tx.log);
}

#[test]
fn test_create_registry_and_schema() {
    let mut chain = Chain::new().unwrap();
    registry_and_schema(&mut chain);

    let ctx = chain.ctx().unwrap();
    let schema = chain
        .app
        .schemas
        .get_credential_schema(&ctx, 1)
        .unwrap()
        .expect("schema 1 exists");
    assert_eq!(schema.tr_id, 1);
    assert_eq!(
        schema.issuer_perm_management_mode(),
        PermManagementMode::GrantorValidation
    );
    let registry = chain
        .app
        .trust_registry
        .get_trust_registry(&ctx, 1)
        .unwrap()
        .expect("registry 1 exists");
    assert_eq!(registry.controller, ALICE);
    assert_eq!(registry.deposit, 10_000_000);
}

#[test]
fn test_schema_by_non_controller_is_unauthorized() {
    let mut chain = Chain::new().unwrap();
    registry_and_schema(&mut chain);

    let tx = chain
        .submit(vec![create_schema(
            BOB,
            1,
            PermManagementMode::GrantorValidation,
            PermManagementMode::GrantorValidation,
        )])
        .unwrap();
    assert_eq!(tx.error_kind.as_deref(), Some("Unauthorized"));

    let ctx = chain.ctx().unwrap();
    assert!(chain.app.schemas.get_credential_schema(&ctx, 2).unwrap().is_none());
    assert_eq!(chain.app.bank.balance(&ctx, BOB).unwrap(), INITIAL_BALANCE);
}

#[test]
fn test_permission_tree_happy_path() {
    let mut chain = Chain::new().unwrap();
    grantor_tree(&mut chain, (100, 200, 300));

    let ctx = chain.ctx().unwrap();
    let p1 = chain.app.permissions.get_permission(&ctx, 1).unwrap().unwrap();
    assert_eq!(p1.perm_type(), PermissionType::TrustRegistry);
    assert_eq!(p1.validation_fees, 100);

    let p2 = chain.app.permissions.get_permission(&ctx, 2).unwrap().unwrap();
    assert_eq!(p2.vp_state(), VpState::Validated);
    assert_eq!(p2.validator_perm_id, 1);
    assert_eq!(p2.vp_exp, Some(Timestamp::from_unix(T0 + 365 * DAY)));
    assert_eq!(p2.effective_until, Some(Timestamp::from_unix(T0 + 365 * DAY)));

    // 100 trust units of fees plus a 20% trust deposit.
    let fees = 100 * 1_000_000;
    let deposit = fees / 5;
    assert_eq!(p2.deposit, deposit);
    assert_eq!(
        chain.app.bank.balance(&ctx, CAROL).unwrap(),
        INITIAL_BALANCE - fees - deposit
    );
    let carol = chain
        .app
        .trust_deposit
        .get_trust_deposit(&ctx, CAROL)
        .unwrap()
        .unwrap();
    assert_eq!(carol.amount, deposit);
    assert_eq!(carol.claimable, 0);

    // The validator earned the fees, a fifth of them as trust deposit.
    let alice = chain
        .app
        .trust_deposit
        .get_trust_deposit(&ctx, ALICE)
        .unwrap()
        .unwrap();
    assert!(alice.amount >= fees / 5);
}

#[test]
fn test_overlapping_request_rejected() {
    let mut chain = Chain::new().unwrap();
    grantor_tree(&mut chain, (100, 200, 300));

    let tx = chain
        .submit(vec![start(CAROL, PermissionType::IssuerGrantor, 1, "did:example:c")])
        .unwrap();
    assert_eq!(tx.error_kind.as_deref(), Some("OverlappingPermission"));

    let ctx = chain.ctx().unwrap();
    assert!(chain.app.permissions.get_permission(&ctx, 3).unwrap().is_none());
}

fn issuer_request() -> IsAuthorizedIssuerRequest {
    IsAuthorizedIssuerRequest {
        issuer_did: "did:example:c".into(),
        user_agent_did: "did:example:agent".into(),
        wallet_user_agent_did: "did:example:wallet".into(),
        schema_id: 1,
        country: Some("US".into()),
        when: Some(Timestamp::from_unix(T0 + 10 * DAY)),
        session_id: None,
    }
}

/// Issuer p3 for dave under carol's grantor permission.
fn issue_under_grantor(chain: &mut Chain) {
    let tx = chain
        .submit(vec![start(DAVE, PermissionType::Issuer, 2, "did:example:c")])
        .unwrap();
    assert_eq!(tx.responses, vec![MsgResponse::Created { id: 3 }]);
    let tx = chain.submit(vec![validated(CAROL, 3, None)]).unwrap();
    assert!(tx.is_ok(), "{}", tx.log);
}

#[test]
fn test_issuer_with_fees_needs_session() {
    let mut chain = Chain::new().unwrap();
    grantor_tree(&mut chain, (100, 200, 300));
    issue_under_grantor(&mut chain);

    let ctx = chain.ctx().unwrap();
    let p3 = chain.app.permissions.get_permission(&ctx, 3).unwrap().unwrap();
    assert_eq!(p3.vp_exp, Some(Timestamp::from_unix(T0 + 180 * DAY)));
    assert_eq!(
        chain
            .app
            .permissions
            .is_authorized_issuer(&ctx, &issuer_request())
            .unwrap(),
        AuthorizationVerdict::SessionRequired
    );
}

#[test]
fn test_issuer_without_fees_is_authorized() {
    let mut chain = Chain::new().unwrap();
    grantor_tree(&mut chain, (100, 0, 300));
    issue_under_grantor(&mut chain);

    let ctx = chain.ctx().unwrap();
    assert_eq!(
        chain
            .app
            .permissions
            .is_authorized_issuer(&ctx, &issuer_request())
            .unwrap(),
        AuthorizationVerdict::Authorized
    );

    // Past the issuer's expiration nothing is effective.
    let mut late = issuer_request();
    late.when = Some(Timestamp::from_unix(T0 + 200 * DAY));
    assert_eq!(
        chain.app.permissions.is_authorized_issuer(&ctx, &late).unwrap(),
        AuthorizationVerdict::Forbidden
    );
}

#[test]
fn test_issuer_query_through_app() {
    let mut chain = Chain::new().unwrap();
    grantor_tree(&mut chain, (100, 0, 300));
    issue_under_grantor(&mut chain);

    let query: verana_app::Query = serde_json::from_value(serde_json::json!({
        "type": "is_authorized_issuer",
        "issuer_did": "did:example:c",
        "schema_id": 1,
        "country": "US",
    }))
    .unwrap();
    let ctx = chain.ctx().unwrap();
    let value = chain.app.query(&ctx, &query).unwrap();
    assert_eq!(value["verdict"], "AUTHORIZED");
}
