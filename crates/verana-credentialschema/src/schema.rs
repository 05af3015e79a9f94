use serde::{Deserialize, Serialize};
use verana_core::{
    ensure_gov_authority, resolve_response_max_size, validate_address, Collection, Context, Event,
    Item, Sequence, Timestamp,
};
use verana_trustdeposit::TrustDepositLedger;
use verana_trustregistry::{TrustRegistry, TrustRegistryManager};

use crate::error::SchemaError;
use crate::metaschema::validate_json_schema;
use crate::types::{
    CredentialSchema, GenesisState, MsgCreateCredentialSchema, MsgUpdateCredentialSchema, Params,
    PermManagementMode,
};

pub const MODULE_NAME: &str = "credentialschema";

const PARAMS: Item<Params> = Item::new(MODULE_NAME, 0x00);
const SCHEMAS: Collection<u64, CredentialSchema> = Collection::new(MODULE_NAME, 0x01);
const SCHEMA_SEQ: Sequence = Sequence::new(MODULE_NAME, 0x10);

/// Filters of `ListCredentialSchemas`. At most one of `created_after` and
/// `modified_after` may be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListCredentialSchemasRequest {
    pub tr_id: Option<u64>,
    pub created_after: Option<Timestamp>,
    pub modified_after: Option<Timestamp>,
    pub response_max_size: u32,
}

/// Credential schema registry.
#[derive(Clone)]
pub struct SchemaRegistry {
    trust_registry: TrustRegistryManager,
    trust_deposit: TrustDepositLedger,
}

impl SchemaRegistry {
    pub fn new(trust_registry: TrustRegistryManager, trust_deposit: TrustDepositLedger) -> Self {
        Self {
            trust_registry,
            trust_deposit,
        }
    }

    pub fn params(&self, ctx: &Context<'_>) -> Result<Params, SchemaError> {
        Ok(PARAMS.get(ctx)?.unwrap_or_else(Params::default_params))
    }

    pub fn update_params(
        &self,
        ctx: &mut Context<'_>,
        authority: &str,
        params: Params,
    ) -> Result<(), SchemaError> {
        ensure_gov_authority(authority)?;
        params.validate()?;
        PARAMS.set(ctx, &params);
        tracing::info!(module = MODULE_NAME, "params updated");
        Ok(())
    }

    /// Validate and store a new credential schema. Returns its id.
    pub fn create_credential_schema(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgCreateCredentialSchema,
    ) -> Result<u64, SchemaError> {
        validate_address(&msg.creator)?;
        let registry = self.controlled_registry(ctx, msg.tr_id, &msg.creator)?;
        if registry.archived.is_some() {
            return Err(SchemaError::InvalidState(format!(
                "trust registry {} is archived",
                registry.id
            )));
        }

        let params = self.params(ctx)?;
        validate_json_schema(&msg.json_schema, params.credential_schema_schema_max_size)?;
        let periods = msg.periods();
        params.check_periods(&periods)?;
        let issuer_mode = checked_mode(msg.issuer_perm_management_mode, "issuer")?;
        let verifier_mode = checked_mode(msg.verifier_perm_management_mode, "verifier")?;

        let deposit = params
            .credential_schema_trust_deposit
            .checked_mul(self.trust_registry.trust_unit_price(ctx)?)
            .ok_or_else(|| SchemaError::InvalidRequest("deposit overflows".into()))?;
        let delta = i64::try_from(deposit)
            .map_err(|_| SchemaError::InvalidRequest("deposit overflows".into()))?;
        self.trust_deposit
            .adjust_trust_deposit(ctx, &msg.creator, delta)?;

        let now = ctx.block_time();
        let id = SCHEMA_SEQ.next(ctx)?;
        let schema = CredentialSchema {
            id,
            tr_id: msg.tr_id,
            created: now,
            modified: now,
            archived: None,
            deposit,
            json_schema: msg.json_schema.clone(),
            issuer_perm_management_mode: issuer_mode as i32,
            verifier_perm_management_mode: verifier_mode as i32,
            ..Default::default()
        }
        .with_periods(&periods);
        SCHEMAS.set(ctx, &id, &schema);

        ctx.emit(
            Event::new("create_credential_schema")
                .attr("id", id)
                .attr("tr_id", msg.tr_id)
                .attr("creator", &msg.creator)
                .attr("deposit", deposit)
                .attr("timestamp", now),
        );
        tracing::info!(id, tr_id = msg.tr_id, creator = %msg.creator, "credential schema created");
        Ok(id)
    }

    /// Change the validity periods of a schema.
    pub fn update_credential_schema(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgUpdateCredentialSchema,
    ) -> Result<(), SchemaError> {
        let schema = self.load(ctx, msg.id)?;
        self.controlled_registry(ctx, schema.tr_id, &msg.creator)?;
        if schema.archived.is_some() {
            return Err(SchemaError::InvalidState(format!(
                "credential schema {} is archived",
                msg.id
            )));
        }
        let periods = msg.periods();
        self.params(ctx)?.check_periods(&periods)?;

        let mut schema = schema.with_periods(&periods);
        schema.modified = ctx.block_time();
        SCHEMAS.set(ctx, &schema.id, &schema);
        ctx.emit(
            Event::new("update_credential_schema")
                .attr("id", schema.id)
                .attr("creator", &msg.creator),
        );
        tracing::info!(id = schema.id, "credential schema updated");
        Ok(())
    }

    pub fn archive_credential_schema(
        &self,
        ctx: &mut Context<'_>,
        creator: &str,
        id: u64,
        archive: bool,
    ) -> Result<(), SchemaError> {
        let mut schema = self.load(ctx, id)?;
        self.controlled_registry(ctx, schema.tr_id, creator)?;
        if archive == schema.archived.is_some() {
            return Err(SchemaError::InvalidState(format!(
                "credential schema {} archive flag already {}",
                id, archive
            )));
        }
        let now = ctx.block_time();
        schema.archived = archive.then_some(now);
        schema.modified = now;
        SCHEMAS.set(ctx, &id, &schema);
        ctx.emit(
            Event::new("archive_credential_schema")
                .attr("id", id)
                .attr("archive", archive),
        );
        tracing::info!(id, archive, "credential schema archive flag changed");
        Ok(())
    }

    pub fn get_credential_schema(
        &self,
        ctx: &Context<'_>,
        id: u64,
    ) -> Result<Option<CredentialSchema>, SchemaError> {
        Ok(SCHEMAS.get(ctx, &id)?)
    }

    /// The stored JSON-Schema literal.
    pub fn render_json_schema(&self, ctx: &Context<'_>, id: u64) -> Result<String, SchemaError> {
        Ok(self.load(ctx, id)?.json_schema)
    }

    pub fn list_credential_schemas(
        &self,
        ctx: &Context<'_>,
        req: &ListCredentialSchemasRequest,
    ) -> Result<Vec<CredentialSchema>, SchemaError> {
        if req.created_after.is_some() && req.modified_after.is_some() {
            return Err(SchemaError::InvalidRequest(
                "created_after and modified_after are mutually exclusive".into(),
            ));
        }
        let limit = resolve_response_max_size(req.response_max_size)?;
        let mut schemas: Vec<CredentialSchema> = SCHEMAS
            .values(ctx)?
            .into_iter()
            .filter(|cs| req.tr_id.map_or(true, |tr| cs.tr_id == tr))
            .filter(|cs| req.created_after.map_or(true, |t| cs.created > t))
            .filter(|cs| req.modified_after.map_or(true, |t| cs.modified > t))
            .collect();
        if req.modified_after.is_some() {
            schemas.sort_by(|a, b| a.modified.cmp(&b.modified).then(a.id.cmp(&b.id)));
        } else {
            schemas.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        }
        schemas.truncate(limit);
        Ok(schemas)
    }

    /// The trust registry owning `schema`.
    pub fn trust_registry_of(
        &self,
        ctx: &Context<'_>,
        schema: &CredentialSchema,
    ) -> Result<TrustRegistry, SchemaError> {
        self.trust_registry
            .get_trust_registry(ctx, schema.tr_id)?
            .ok_or_else(|| SchemaError::NotFound(format!("trust registry {}", schema.tr_id)))
    }

    pub fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        genesis: &GenesisState,
    ) -> Result<(), SchemaError> {
        genesis.params.validate()?;
        PARAMS.set(ctx, &genesis.params);
        let mut max_id = 0;
        for cs in &genesis.credential_schemas {
            if self.trust_registry.get_trust_registry(ctx, cs.tr_id)?.is_none() {
                return Err(SchemaError::NotFound(format!(
                    "trust registry {} of credential schema {}",
                    cs.tr_id, cs.id
                )));
            }
            SCHEMAS.set(ctx, &cs.id, cs);
            max_id = max_id.max(cs.id);
        }
        SCHEMA_SEQ.set(ctx, max_id + 1);
        tracing::info!(
            schemas = genesis.credential_schemas.len(),
            "credential schema genesis loaded"
        );
        Ok(())
    }

    pub fn export_genesis(&self, ctx: &Context<'_>) -> Result<GenesisState, SchemaError> {
        Ok(GenesisState {
            params: self.params(ctx)?,
            credential_schemas: SCHEMAS.values(ctx)?,
        })
    }

    fn load(&self, ctx: &Context<'_>, id: u64) -> Result<CredentialSchema, SchemaError> {
        SCHEMAS
            .get(ctx, &id)?
            .ok_or_else(|| SchemaError::NotFound(id.to_string()))
    }

    fn controlled_registry(
        &self,
        ctx: &Context<'_>,
        tr_id: u64,
        caller: &str,
    ) -> Result<TrustRegistry, SchemaError> {
        let registry = self
            .trust_registry
            .get_trust_registry(ctx, tr_id)?
            .ok_or_else(|| SchemaError::NotFound(format!("trust registry {}", tr_id)))?;
        if registry.controller != caller {
            tracing::warn!(tr_id, caller, "credential schema call rejected: not the controller");
            return Err(SchemaError::Unauthorized {
                tr_id,
                caller: caller.to_string(),
            });
        }
        Ok(registry)
    }
}

fn checked_mode(raw: i32, role: &str) -> Result<PermManagementMode, SchemaError> {
    match PermManagementMode::try_from(raw) {
        Ok(PermManagementMode::Unspecified) | Err(_) => Err(SchemaError::InvalidRequest(format!(
            "invalid {} permission management mode {}",
            role, raw
        ))),
        Ok(mode) => Ok(mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metaschema::tests::VALID_SCHEMA;
    use std::sync::Arc;
    use verana_core::{BlockHeader, ErrorKind, MemoryStore, StoreBank};
    use verana_trustregistry::MsgCreateTrustRegistry;

    const ALICE: &str = "verana1alice";
    const BOB: &str = "verana1bob";
    const T0: i64 = 1_704_067_200;

    fn registry() -> SchemaRegistry {
        let td = TrustDepositLedger::new(Arc::new(StoreBank::new()));
        SchemaRegistry::new(TrustRegistryManager::new(td.clone()), td)
    }

    fn with_trust_registry<'a>(store: &'a MemoryStore, reg: &SchemaRegistry) -> Context<'a> {
        let mut ctx = Context::new(store, BlockHeader::at(Timestamp::from_unix(T0)));
        StoreBank::new().mint(&mut ctx, ALICE, 100_000_000).unwrap();
        reg.trust_registry
            .create_trust_registry(
                &mut ctx,
                &MsgCreateTrustRegistry {
                    creator: ALICE.into(),
                    did: "did:example:1".into(),
                    aka: String::new(),
                    language: "en".into(),
                    doc_url: "url1".into(),
                    doc_hash: "hash1".into(),
                },
            )
            .unwrap();
        ctx
    }

    fn create_msg(creator: &str) -> MsgCreateCredentialSchema {
        MsgCreateCredentialSchema {
            creator: creator.into(),
            tr_id: 1,
            json_schema: VALID_SCHEMA.into(),
            issuer_grantor_validation_validity_period: 365,
            verifier_grantor_validation_validity_period: 365,
            issuer_validation_validity_period: 180,
            verifier_validation_validity_period: 180,
            holder_validation_validity_period: 180,
            issuer_perm_management_mode: PermManagementMode::GrantorValidation as i32,
            verifier_perm_management_mode: PermManagementMode::GrantorValidation as i32,
        }
    }

    #[test]
    fn test_create_credential_schema() {
        let store = MemoryStore::new();
        let reg = registry();
        let mut ctx = with_trust_registry(&store, &reg);

        let id = reg
            .create_credential_schema(&mut ctx, &create_msg(ALICE))
            .unwrap();
        assert_eq!(id, 1);
        let cs = reg.get_credential_schema(&ctx, 1).unwrap().unwrap();
        assert_eq!(cs.tr_id, 1);
        assert_eq!(
            cs.issuer_perm_management_mode(),
            PermManagementMode::GrantorValidation
        );
        assert_eq!(cs.issuer_grantor_validation_validity_period, 365);
        assert_eq!(cs.deposit, 10_000_000);
        assert_eq!(reg.render_json_schema(&ctx, 1).unwrap(), VALID_SCHEMA);

        let td = reg.trust_deposit.get_trust_deposit(&ctx, ALICE).unwrap().unwrap();
        assert_eq!(td.amount, 20_000_000);
        let event = ctx
            .events()
            .iter()
            .find(|e| e.kind == "create_credential_schema")
            .unwrap();
        assert_eq!(event.get("tr_id"), Some("1"));
        assert_eq!(event.get("creator"), Some(ALICE));
    }

    #[test]
    fn test_wrong_controller_unauthorized() {
        let store = MemoryStore::new();
        let reg = registry();
        let mut ctx = with_trust_registry(&store, &reg);
        let err = reg
            .create_credential_schema(&mut ctx, &create_msg(BOB))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_invalid_inputs() {
        let store = MemoryStore::new();
        let reg = registry();
        let mut ctx = with_trust_registry(&store, &reg);

        let mut msg = create_msg(ALICE);
        msg.json_schema = "{}".into();
        assert_eq!(
            reg.create_credential_schema(&mut ctx, &msg).unwrap_err().kind(),
            ErrorKind::InvalidJsonSchema
        );

        let mut msg = create_msg(ALICE);
        msg.issuer_validation_validity_period = 4000;
        assert_eq!(
            reg.create_credential_schema(&mut ctx, &msg).unwrap_err().kind(),
            ErrorKind::InvalidRequest
        );

        let mut msg = create_msg(ALICE);
        msg.verifier_perm_management_mode = 0;
        assert_eq!(
            reg.create_credential_schema(&mut ctx, &msg).unwrap_err().kind(),
            ErrorKind::InvalidRequest
        );

        let mut msg = create_msg(ALICE);
        msg.tr_id = 9;
        assert_eq!(
            reg.create_credential_schema(&mut ctx, &msg).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_schema_size_boundary() {
        let store = MemoryStore::new();
        let reg = registry();
        let mut ctx = with_trust_registry(&store, &reg);
        let size = VALID_SCHEMA.len() as u64;
        reg.update_params(
            &mut ctx,
            &verana_core::gov_authority(),
            Params {
                credential_schema_schema_max_size: size,
                ..Params::default_params()
            },
        )
        .unwrap();
        assert!(reg.create_credential_schema(&mut ctx, &create_msg(ALICE)).is_ok());

        reg.update_params(
            &mut ctx,
            &verana_core::gov_authority(),
            Params {
                credential_schema_schema_max_size: size - 1,
                ..Params::default_params()
            },
        )
        .unwrap();
        assert_eq!(
            reg.create_credential_schema(&mut ctx, &create_msg(ALICE))
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidJsonSchema
        );
    }

    #[test]
    fn test_update_and_archive() {
        let store = MemoryStore::new();
        let reg = registry();
        let mut ctx = with_trust_registry(&store, &reg);
        let id = reg
            .create_credential_schema(&mut ctx, &create_msg(ALICE))
            .unwrap();

        ctx.advance_to(2, Timestamp::from_unix(T0 + 10));
        reg.update_credential_schema(
            &mut ctx,
            &MsgUpdateCredentialSchema {
                creator: ALICE.into(),
                id,
                issuer_grantor_validation_validity_period: 30,
                verifier_grantor_validation_validity_period: 30,
                issuer_validation_validity_period: 30,
                verifier_validation_validity_period: 30,
                holder_validation_validity_period: 30,
            },
        )
        .unwrap();
        let cs = reg.get_credential_schema(&ctx, id).unwrap().unwrap();
        assert_eq!(cs.holder_validation_validity_period, 30);
        assert_eq!(cs.modified, Timestamp::from_unix(T0 + 10));

        assert_eq!(
            reg.archive_credential_schema(&mut ctx, BOB, id, true)
                .unwrap_err()
                .kind(),
            ErrorKind::Unauthorized
        );
        reg.archive_credential_schema(&mut ctx, ALICE, id, true).unwrap();
        assert_eq!(
            reg.archive_credential_schema(&mut ctx, ALICE, id, true)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidState
        );
    }

    #[test]
    fn test_list_filters() {
        let store = MemoryStore::new();
        let reg = registry();
        let mut ctx = with_trust_registry(&store, &reg);
        for i in 0..3 {
            ctx.advance_to(i + 1, Timestamp::from_unix(T0 + i as i64));
            reg.create_credential_schema(&mut ctx, &create_msg(ALICE))
                .unwrap();
        }
        let after = reg
            .list_credential_schemas(
                &ctx,
                &ListCredentialSchemasRequest {
                    created_after: Some(Timestamp::from_unix(T0)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(after.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 3]);

        let none = reg
            .list_credential_schemas(
                &ctx,
                &ListCredentialSchemasRequest {
                    tr_id: Some(7),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(none.is_empty());

        let both = reg.list_credential_schemas(
            &ctx,
            &ListCredentialSchemasRequest {
                created_after: Some(Timestamp::from_unix(T0)),
                modified_after: Some(Timestamp::from_unix(T0)),
                ..Default::default()
            },
        );
        assert!(both.is_err());
    }
}
