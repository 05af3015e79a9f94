use std::sync::Arc;

use serde::{Deserialize, Serialize};
use verana_core::{
    ensure_gov_authority, module_address, resolve_response_max_size, validate_address,
    validate_country, validate_did, Bank, Collection, Context, CoreError, Event, Item, Sequence,
    Timestamp,
};
use verana_credentialschema::{CredentialSchema, PermManagementMode, SchemaRegistry};
use verana_trustdeposit::TrustDepositLedger;
use verana_trustregistry::TrustRegistryManager;

use crate::compatibility::{required_validator_type, role_mode, validity_period_days};
use crate::error::PermissionError;
use crate::msgs::{
    MsgCreatePermission, MsgCreateRootPermission, MsgSetPermissionVpToValidated,
    MsgStartPermissionVp,
};
use crate::types::{
    windows_overlap, GenesisState, Params, Permission, PermissionSession, PermissionType, VpState,
};

pub const MODULE_NAME: &str = "permission";

const PARAMS: Item<Params> = Item::new(MODULE_NAME, 0x00);
pub(crate) const PERMISSIONS: Collection<u64, Permission> = Collection::new(MODULE_NAME, 0x01);
/// `(did, id) → id`
pub(crate) const PERMISSIONS_BY_DID: Collection<(String, u64), u64> =
    Collection::new(MODULE_NAME, 0x02);
pub(crate) const SESSIONS: Collection<str, PermissionSession> = Collection::new(MODULE_NAME, 0x03);
const PERMISSION_SEQ: Sequence = Sequence::new(MODULE_NAME, 0x10);

/// Filters of `FindPermissionsWithDID`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FindPermissionsWithDidRequest {
    pub did: String,
    pub perm_type: Option<PermissionType>,
    pub schema_id: Option<u64>,
    pub country: Option<String>,
    /// Only permissions effective at this instant.
    pub when: Option<Timestamp>,
}

/// Permission tree and validation process state machine.
#[derive(Clone)]
pub struct PermissionManager {
    pub(crate) bank: Arc<dyn Bank>,
    pub(crate) trust_deposit: TrustDepositLedger,
    pub(crate) trust_registry: TrustRegistryManager,
    pub(crate) schemas: SchemaRegistry,
}

impl PermissionManager {
    pub fn new(
        bank: Arc<dyn Bank>,
        trust_deposit: TrustDepositLedger,
        trust_registry: TrustRegistryManager,
        schemas: SchemaRegistry,
    ) -> Self {
        Self {
            bank,
            trust_deposit,
            trust_registry,
            schemas,
        }
    }

    /// Escrow account holding validation fees.
    pub fn module_account(&self) -> String {
        module_address(MODULE_NAME)
    }

    pub fn params(&self, ctx: &Context<'_>) -> Result<Params, PermissionError> {
        Ok(PARAMS.get(ctx)?.unwrap_or_else(Params::default_params))
    }

    pub fn update_params(
        &self,
        ctx: &mut Context<'_>,
        authority: &str,
        params: Params,
    ) -> Result<(), PermissionError> {
        ensure_gov_authority(authority)?;
        params.validate()?;
        PARAMS.set(ctx, &params);
        tracing::info!(module = MODULE_NAME, "params updated");
        Ok(())
    }

    // ---- validation process ----------------------------------------------

    /// Open a validation process for a new permission. Returns its id.
    pub fn start_permission_vp(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgStartPermissionVp,
    ) -> Result<u64, PermissionError> {
        validate_address(&msg.creator)?;
        let perm_type = PermissionType::from_wire(msg.perm_type)?;
        if !msg.country.is_empty() {
            validate_country(&msg.country)?;
        }
        if !msg.did.is_empty() {
            validate_did(&msg.did)?;
        }

        let now = ctx.block_time();
        let validator = self.load(ctx, msg.validator_perm_id)?;
        if !validator.is_effective_at(now) || validator.vp_state() != VpState::Validated {
            return Err(PermissionError::InvalidState(format!(
                "validator permission {} is not active",
                validator.id
            )));
        }
        if !validator.country.is_empty() && validator.country != msg.country {
            return Err(PermissionError::InvalidRequest(format!(
                "country {} does not match validator country {}",
                msg.country, validator.country
            )));
        }

        let schema = self.active_schema(ctx, validator.schema_id)?;
        let mode = role_mode(&schema, perm_type);
        match required_validator_type(perm_type, mode) {
            Some(required) if required == validator.perm_type() => {}
            Some(required) => {
                return Err(PermissionError::InvalidRequest(format!(
                    "{:?} permissions must be validated by {:?}, not {:?}",
                    perm_type,
                    required,
                    validator.perm_type()
                )))
            }
            None => {
                return Err(PermissionError::InvalidRequest(format!(
                    "{:?} permissions cannot be requested under mode {:?}",
                    perm_type, mode
                )))
            }
        }

        self.check_overlap(
            ctx,
            validator.schema_id,
            perm_type,
            &msg.country,
            &msg.creator,
            (now, None),
        )?;

        let (fees, deposit) = self.vp_amounts(ctx, &validator)?;
        self.trust_deposit
            .adjust_trust_deposit(ctx, &msg.creator, to_delta(deposit)?)?;
        self.bank
            .send(ctx, &msg.creator, &self.module_account(), fees)?;

        let id = PERMISSION_SEQ.next(ctx)?;
        let perm = Permission {
            id,
            schema_id: validator.schema_id,
            perm_type: perm_type as i32,
            did: msg.did.clone(),
            grantee: msg.creator.clone(),
            created: now,
            created_by: msg.creator.clone(),
            modified: now,
            country: msg.country.clone(),
            validator_perm_id: validator.id,
            vp_state: VpState::Pending as i32,
            vp_last_state_change: Some(now),
            vp_current_fees: fees,
            vp_current_deposit: deposit,
            ..Default::default()
        };
        self.store(ctx, &perm);

        ctx.emit(
            Event::new("start_permission_vp")
                .attr("permission_id", id)
                .attr("creator", &msg.creator)
                .attr("validator_perm_id", validator.id)
                .attr("fees", fees)
                .attr("deposit", deposit)
                .attr("timestamp", now),
        );
        tracing::info!(id, creator = %msg.creator, validator = validator.id, fees, deposit, "permission validation process started");
        Ok(id)
    }

    /// Validator accepts a pending validation process.
    pub fn set_permission_vp_to_validated(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgSetPermissionVpToValidated,
    ) -> Result<(), PermissionError> {
        let mut perm = self.load_mutable(ctx, msg.id)?;
        if perm.vp_state() != VpState::Pending {
            return Err(PermissionError::InvalidState(format!(
                "permission {} is not pending validation",
                perm.id
            )));
        }
        let validator = self.load_mutable(ctx, perm.validator_perm_id)?;
        self.ensure_signer(&validator.grantee, &msg.creator, "validator")?;

        let schema = self.load_schema(ctx, perm.schema_id)?;
        let now = ctx.block_time();
        let initial = perm.effective_from.is_none();
        let period = validity_period_days(&schema, perm.perm_type());
        let vp_exp = if period == 0 {
            None
        } else {
            let base = if initial { now } else { perm.vp_exp.unwrap_or(now) };
            Some(base.checked_add_days(period as u64)?)
        };

        if let Some(until) = msg.effective_until {
            if until <= now {
                return Err(PermissionError::InvalidRequest(
                    "effective_until must be in the future".into(),
                ));
            }
            if vp_exp.map_or(false, |exp| until > exp) {
                return Err(PermissionError::InvalidRequest(format!(
                    "effective_until {} exceeds validation expiration",
                    until
                )));
            }
            if !initial && perm.effective_until.map_or(false, |cur| until < cur) {
                return Err(PermissionError::InvalidRequest(
                    "effective_until cannot move backwards on renewal".into(),
                ));
            }
        }

        if initial {
            if !msg.country.is_empty() {
                validate_country(&msg.country)?;
                perm.country = msg.country.clone();
            }
            perm.effective_from = Some(now);
            perm.effective_until = msg.effective_until.or(vp_exp);
            perm.validation_fees = msg.validation_fees;
            perm.issuance_fees = msg.issuance_fees;
            perm.verification_fees = msg.verification_fees;
        } else if let Some(until) = msg.effective_until {
            perm.effective_until = Some(until);
        }
        if !msg.vp_summary_digest_sri.is_empty() {
            perm.vp_summary_digest_sri = msg.vp_summary_digest_sri.clone();
        }

        self.pay_validator(ctx, &validator.grantee, perm.vp_current_fees)?;

        perm.deposit = checked_add(perm.deposit, perm.vp_current_deposit, "permission deposit")?;
        perm.vp_current_fees = 0;
        perm.vp_current_deposit = 0;
        perm.vp_exp = vp_exp;
        perm.set_vp_state(VpState::Validated);
        perm.vp_last_state_change = Some(now);
        perm.modified = now;
        self.store(ctx, &perm);

        ctx.emit(
            Event::new("set_permission_vp_to_validated")
                .attr("permission_id", perm.id)
                .attr("validator", &msg.creator)
                .attr("vp_exp", vp_exp.map(|t| t.to_string()).unwrap_or_default()),
        );
        tracing::info!(id = perm.id, validator = %msg.creator, initial, "permission validated");
        Ok(())
    }

    /// Grantee restarts the validation process of a validated permission.
    pub fn renew_permission_vp(
        &self,
        ctx: &mut Context<'_>,
        creator: &str,
        id: u64,
    ) -> Result<(), PermissionError> {
        let mut perm = self.load_mutable(ctx, id)?;
        self.ensure_signer(&perm.grantee, creator, "grantee")?;
        if perm.vp_state() != VpState::Validated || perm.validator_perm_id == 0 {
            return Err(PermissionError::InvalidState(format!(
                "permission {} has no renewable validation process",
                id
            )));
        }
        let validator = self.load(ctx, perm.validator_perm_id)?;
        if validator.is_terminal() {
            return Err(PermissionError::InvalidState(format!(
                "validator permission {} is no longer active",
                validator.id
            )));
        }

        let (fees, deposit) = self.vp_amounts(ctx, &validator)?;
        self.trust_deposit
            .adjust_trust_deposit(ctx, creator, to_delta(deposit)?)?;
        self.bank.send(ctx, creator, &self.module_account(), fees)?;

        let now = ctx.block_time();
        perm.vp_current_fees = fees;
        perm.vp_current_deposit = deposit;
        perm.set_vp_state(VpState::Pending);
        perm.vp_last_state_change = Some(now);
        perm.modified = now;
        self.store(ctx, &perm);

        ctx.emit(
            Event::new("renew_permission_vp")
                .attr("permission_id", id)
                .attr("creator", creator)
                .attr("fees", fees)
                .attr("deposit", deposit),
        );
        tracing::info!(id, creator, fees, deposit, "permission validation process renewed");
        Ok(())
    }

    /// Ask for the termination of a validated permission.
    ///
    /// The grantee may always ask; the validator only once the validation
    /// has expired.
    pub fn request_permission_vp_termination(
        &self,
        ctx: &mut Context<'_>,
        creator: &str,
        id: u64,
    ) -> Result<(), PermissionError> {
        let mut perm = self.load_mutable(ctx, id)?;
        if perm.vp_state() != VpState::Validated {
            return Err(PermissionError::InvalidState(format!(
                "permission {} is not validated",
                id
            )));
        }
        let now = ctx.block_time();
        let expired = perm.vp_exp.map_or(false, |exp| exp <= now);
        let is_validator = self
            .validator_grantee(ctx, &perm)?
            .map_or(false, |g| g == creator);
        if creator != perm.grantee && !(expired && is_validator) {
            tracing::warn!(id, creator, "termination request rejected");
            return Err(PermissionError::InvalidSigner(format!(
                "{} may not request termination of permission {}",
                creator, id
            )));
        }

        perm.set_vp_state(VpState::TerminationRequested);
        perm.vp_term_requested = Some(now);
        perm.vp_last_state_change = Some(now);
        perm.modified = now;
        self.store(ctx, &perm);
        ctx.emit(
            Event::new("request_permission_vp_termination")
                .attr("permission_id", id)
                .attr("creator", creator),
        );
        tracing::info!(id, creator, "permission termination requested");
        Ok(())
    }

    /// Confirm a termination request. The validator confirms at once; the
    /// grantee only after the termination timeout.
    pub fn confirm_permission_vp_termination(
        &self,
        ctx: &mut Context<'_>,
        creator: &str,
        id: u64,
    ) -> Result<(), PermissionError> {
        let mut perm = self.load_mutable(ctx, id)?;
        if perm.vp_state() != VpState::TerminationRequested {
            return Err(PermissionError::InvalidState(format!(
                "permission {} has no pending termination request",
                id
            )));
        }
        let now = ctx.block_time();
        let is_validator = self
            .validator_grantee(ctx, &perm)?
            .map_or(false, |g| g == creator);
        if !is_validator {
            if creator != perm.grantee {
                tracing::warn!(id, creator, "termination confirmation rejected");
                return Err(PermissionError::InvalidSigner(format!(
                    "{} may not confirm termination of permission {}",
                    creator, id
                )));
            }
            let timeout = self.params(ctx)?.validation_term_requested_timeout_days;
            let requested = perm.vp_term_requested.unwrap_or(now);
            if now < requested.checked_add_days(timeout as u64)? {
                return Err(PermissionError::InvalidState(format!(
                    "grantee may confirm only {} days after the request",
                    timeout
                )));
            }
        }

        let released = checked_add(perm.deposit, perm.vp_current_deposit, "released deposit")?;
        self.release_deposit(ctx, &perm.grantee, released)?;
        perm.deposit = 0;
        perm.vp_current_deposit = 0;
        perm.set_vp_state(VpState::Terminated);
        perm.terminated = Some(now);
        perm.terminated_by = creator.to_string();
        perm.vp_last_state_change = Some(now);
        perm.modified = now;
        self.store(ctx, &perm);
        ctx.emit(
            Event::new("confirm_permission_vp_termination")
                .attr("permission_id", id)
                .attr("creator", creator)
                .attr("released_deposit", released),
        );
        tracing::info!(id, creator, released, "permission terminated");
        Ok(())
    }

    /// Withdraw the pending validation request.
    ///
    /// A renewal falls back to VALIDATED. An initial request has no prior
    /// resting state, so the permission is terminated.
    pub fn cancel_permission_vp_last_request(
        &self,
        ctx: &mut Context<'_>,
        creator: &str,
        id: u64,
    ) -> Result<(), PermissionError> {
        let mut perm = self.load_mutable(ctx, id)?;
        self.ensure_signer(&perm.grantee, creator, "grantee")?;
        if perm.vp_state() != VpState::Pending {
            return Err(PermissionError::InvalidState(format!(
                "permission {} is not pending",
                id
            )));
        }
        let refunded = perm.vp_current_fees;
        self.bank
            .send(ctx, &self.module_account(), &perm.grantee, refunded)?;
        self.release_deposit(ctx, &perm.grantee, perm.vp_current_deposit)?;

        let now = ctx.block_time();
        perm.vp_current_fees = 0;
        perm.vp_current_deposit = 0;
        if perm.effective_from.is_some() {
            perm.set_vp_state(VpState::Validated);
        } else {
            perm.set_vp_state(VpState::Terminated);
            perm.terminated = Some(now);
            perm.terminated_by = creator.to_string();
        }
        perm.vp_last_state_change = Some(now);
        perm.modified = now;
        self.store(ctx, &perm);
        ctx.emit(
            Event::new("cancel_permission_vp_last_request")
                .attr("permission_id", id)
                .attr("refunded", refunded)
                .attr("state", format!("{:?}", perm.vp_state())),
        );
        tracing::info!(id, creator, refunded, state = ?perm.vp_state(), "validation request cancelled");
        Ok(())
    }

    // ---- direct creation ---------------------------------------------------

    /// Create the TRUST_REGISTRY root permission of a schema.
    pub fn create_root_permission(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgCreateRootPermission,
    ) -> Result<u64, PermissionError> {
        validate_did(&msg.did)?;
        let schema = self.active_schema(ctx, msg.schema_id)?;
        let registry = self.schemas.trust_registry_of(ctx, &schema)?;
        if registry.controller != msg.creator {
            tracing::warn!(schema_id = msg.schema_id, creator = %msg.creator, "root permission rejected: not the registry controller");
            return Err(PermissionError::Unauthorized(format!(
                "{} does not control trust registry {}",
                msg.creator, registry.id
            )));
        }
        if registry.did != msg.did {
            return Err(PermissionError::InvalidRequest(format!(
                "root permission DID must be the trust registry DID {}",
                registry.did
            )));
        }
        let id = self.insert_direct(
            ctx,
            DirectPermission {
                creator: &msg.creator,
                perm_type: PermissionType::TrustRegistry,
                schema_id: msg.schema_id,
                did: &msg.did,
                country: &msg.country,
                effective_from: msg.effective_from,
                effective_until: msg.effective_until,
                validation_fees: msg.validation_fees,
                issuance_fees: msg.issuance_fees,
                verification_fees: msg.verification_fees,
            },
        )?;
        ctx.emit(
            Event::new("create_root_permission")
                .attr("permission_id", id)
                .attr("schema_id", msg.schema_id)
                .attr("creator", &msg.creator)
                .attr("did", &msg.did),
        );
        tracing::info!(id, schema_id = msg.schema_id, creator = %msg.creator, "root permission created");
        Ok(id)
    }

    /// Self-service issuer or verifier permission on a schema whose mode
    /// for that role is OPEN.
    pub fn create_permission(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgCreatePermission,
    ) -> Result<u64, PermissionError> {
        validate_address(&msg.creator)?;
        validate_did(&msg.did)?;
        let perm_type = PermissionType::from_wire(msg.perm_type)?;
        if !matches!(perm_type, PermissionType::Issuer | PermissionType::Verifier) {
            return Err(PermissionError::InvalidRequest(format!(
                "{:?} permissions cannot be self-created",
                perm_type
            )));
        }
        let schema = self.active_schema(ctx, msg.schema_id)?;
        let mode = role_mode(&schema, perm_type);
        if mode != PermManagementMode::Open {
            return Err(PermissionError::InvalidRequest(format!(
                "schema {} does not allow open {:?} permissions",
                msg.schema_id, perm_type
            )));
        }
        let id = self.insert_direct(
            ctx,
            DirectPermission {
                creator: &msg.creator,
                perm_type,
                schema_id: msg.schema_id,
                did: &msg.did,
                country: &msg.country,
                effective_from: msg.effective_from,
                effective_until: msg.effective_until,
                validation_fees: 0,
                issuance_fees: 0,
                verification_fees: msg.verification_fees,
            },
        )?;
        ctx.emit(
            Event::new("create_permission")
                .attr("permission_id", id)
                .attr("schema_id", msg.schema_id)
                .attr("type", format!("{:?}", perm_type))
                .attr("creator", &msg.creator),
        );
        tracing::info!(id, schema_id = msg.schema_id, creator = %msg.creator, "permission created");
        Ok(id)
    }

    fn insert_direct(
        &self,
        ctx: &mut Context<'_>,
        d: DirectPermission<'_>,
    ) -> Result<u64, PermissionError> {
        if !d.country.is_empty() {
            validate_country(d.country)?;
        }
        let now = ctx.block_time();
        let from = d.effective_from.unwrap_or(now);
        if from < now {
            return Err(PermissionError::InvalidRequest(
                "effective_from must not be in the past".into(),
            ));
        }
        if d.effective_until.map_or(false, |until| until <= from) {
            return Err(PermissionError::InvalidRequest(
                "effective_until must be after effective_from".into(),
            ));
        }
        self.check_overlap(
            ctx,
            d.schema_id,
            d.perm_type,
            d.country,
            d.creator,
            (from, d.effective_until),
        )?;

        let id = PERMISSION_SEQ.next(ctx)?;
        let perm = Permission {
            id,
            schema_id: d.schema_id,
            perm_type: d.perm_type as i32,
            did: d.did.to_string(),
            grantee: d.creator.to_string(),
            created: now,
            created_by: d.creator.to_string(),
            modified: now,
            effective_from: Some(from),
            effective_until: d.effective_until,
            validation_fees: d.validation_fees,
            issuance_fees: d.issuance_fees,
            verification_fees: d.verification_fees,
            country: d.country.to_string(),
            validator_perm_id: 0,
            vp_state: VpState::Validated as i32,
            vp_last_state_change: Some(now),
            ..Default::default()
        };
        self.store(ctx, &perm);
        Ok(id)
    }

    // ---- validator actions -------------------------------------------------

    /// Push `effective_until` later.
    pub fn extend_permission(
        &self,
        ctx: &mut Context<'_>,
        creator: &str,
        id: u64,
        effective_until: Timestamp,
    ) -> Result<(), PermissionError> {
        let mut perm = self.load_mutable(ctx, id)?;
        self.ensure_manager(ctx, &perm, creator)?;
        let now = ctx.block_time();
        match perm.effective_until {
            None => {
                return Err(PermissionError::InvalidState(format!(
                    "permission {} has no end to extend",
                    id
                )))
            }
            Some(current) if effective_until <= current => {
                return Err(PermissionError::InvalidRequest(format!(
                    "new effective_until must be after {}",
                    current
                )))
            }
            Some(_) => {}
        }
        if effective_until <= now {
            return Err(PermissionError::InvalidRequest(
                "effective_until must be in the future".into(),
            ));
        }
        if perm.vp_exp.map_or(false, |exp| effective_until > exp) {
            return Err(PermissionError::InvalidRequest(
                "effective_until exceeds validation expiration".into(),
            ));
        }
        perm.effective_until = Some(effective_until);
        perm.extended = Some(now);
        perm.extended_by = creator.to_string();
        perm.modified = now;
        self.store(ctx, &perm);
        ctx.emit(
            Event::new("extend_permission")
                .attr("permission_id", id)
                .attr("effective_until", effective_until)
                .attr("extended_by", creator),
        );
        tracing::info!(id, creator, until = %effective_until, "permission extended");
        Ok(())
    }

    /// Revoke a permission and release its deposit to claimable.
    pub fn revoke_permission(
        &self,
        ctx: &mut Context<'_>,
        creator: &str,
        id: u64,
    ) -> Result<(), PermissionError> {
        let mut perm = self.load_mutable(ctx, id)?;
        self.ensure_manager(ctx, &perm, creator)?;
        if perm.vp_current_fees > 0 {
            self.bank
                .send(ctx, &self.module_account(), &perm.grantee, perm.vp_current_fees)?;
        }
        let released = checked_add(perm.deposit, perm.vp_current_deposit, "released deposit")?;
        self.release_deposit(ctx, &perm.grantee, released)?;

        let now = ctx.block_time();
        perm.deposit = 0;
        perm.vp_current_fees = 0;
        perm.vp_current_deposit = 0;
        perm.revoked = Some(now);
        perm.revoked_by = creator.to_string();
        perm.modified = now;
        self.store(ctx, &perm);
        ctx.emit(
            Event::new("revoke_permission")
                .attr("permission_id", id)
                .attr("revoked_by", creator)
                .attr("released_deposit", released),
        );
        tracing::info!(id, creator, released, "permission revoked");
        Ok(())
    }

    /// Slash part of the deposit backing a permission.
    pub fn slash_permission_trust_deposit(
        &self,
        ctx: &mut Context<'_>,
        creator: &str,
        id: u64,
        amount: u64,
    ) -> Result<(), PermissionError> {
        let mut perm = self.load_mutable(ctx, id)?;
        let schema = self.load_schema(ctx, perm.schema_id)?;
        let registry = self.schemas.trust_registry_of(ctx, &schema)?;
        let is_validator = self
            .validator_grantee(ctx, &perm)?
            .map_or(false, |g| g == creator);
        if !is_validator && registry.controller != creator {
            tracing::warn!(id, creator, "slash rejected");
            return Err(PermissionError::Unauthorized(format!(
                "{} may not slash permission {}",
                creator, id
            )));
        }
        if amount == 0 || amount > perm.deposit {
            return Err(PermissionError::InsufficientDeposit(format!(
                "slash of {} exceeds permission deposit {}",
                amount, perm.deposit
            )));
        }
        self.trust_deposit
            .slash_trust_deposit(ctx, &perm.grantee, amount)?;
        perm.deposit -= amount;
        perm.slashed_deposit = checked_add(perm.slashed_deposit, amount, "slashed deposit")?;
        perm.modified = ctx.block_time();
        self.store(ctx, &perm);
        ctx.emit(
            Event::new("slash_permission_trust_deposit")
                .attr("permission_id", id)
                .attr("amount", amount)
                .attr("slashed_by", creator),
        );
        tracing::info!(id, creator, amount, "permission trust deposit slashed");
        Ok(())
    }

    /// Repay the full slashed deposit of a permission.
    pub fn repay_permission_slashed_trust_deposit(
        &self,
        ctx: &mut Context<'_>,
        payer: &str,
        id: u64,
    ) -> Result<(), PermissionError> {
        let mut perm = self.load_mutable(ctx, id)?;
        let amount = perm.slashed_deposit;
        if amount == 0 {
            return Err(PermissionError::InvalidState(format!(
                "permission {} has no slashed deposit",
                id
            )));
        }
        self.trust_deposit
            .repay_slashed_trust_deposit(ctx, payer, &perm.grantee, amount)?;
        perm.deposit = checked_add(perm.deposit, amount, "permission deposit")?;
        perm.repaid_deposit = checked_add(perm.repaid_deposit, amount, "repaid deposit")?;
        perm.slashed_deposit = 0;
        perm.modified = ctx.block_time();
        self.store(ctx, &perm);
        ctx.emit(
            Event::new("repay_permission_slashed_trust_deposit")
                .attr("permission_id", id)
                .attr("amount", amount)
                .attr("payer", payer),
        );
        tracing::info!(id, payer, amount, "permission slashed deposit repaid");
        Ok(())
    }

    // ---- queries -----------------------------------------------------------

    pub fn get_permission(
        &self,
        ctx: &Context<'_>,
        id: u64,
    ) -> Result<Option<Permission>, PermissionError> {
        Ok(PERMISSIONS.get(ctx, &id)?)
    }

    pub fn list_permissions(
        &self,
        ctx: &Context<'_>,
        modified_after: Option<Timestamp>,
        response_max_size: u32,
    ) -> Result<Vec<Permission>, PermissionError> {
        let limit = resolve_response_max_size(response_max_size)?;
        let mut perms: Vec<Permission> = PERMISSIONS
            .values(ctx)?
            .into_iter()
            .filter(|p| modified_after.map_or(true, |t| p.modified > t))
            .collect();
        perms.sort_by(|a, b| a.modified.cmp(&b.modified).then(a.id.cmp(&b.id)));
        perms.truncate(limit);
        Ok(perms)
    }

    pub fn find_permissions_with_did(
        &self,
        ctx: &Context<'_>,
        req: &FindPermissionsWithDidRequest,
    ) -> Result<Vec<Permission>, PermissionError> {
        validate_did(&req.did)?;
        let mut out = Vec::new();
        for id in PERMISSIONS_BY_DID.prefixed_values(ctx, &req.did)? {
            let Some(perm) = PERMISSIONS.get(ctx, &id)? else {
                continue;
            };
            if req.perm_type.map_or(false, |t| perm.perm_type() != t)
                || req.schema_id.map_or(false, |s| perm.schema_id != s)
                || req
                    .country
                    .as_deref()
                    .map_or(false, |c| !perm.matches_country(c))
                || req.when.map_or(false, |w| !perm.is_effective_at(w))
            {
                continue;
            }
            out.push(perm);
        }
        Ok(out)
    }

    pub fn get_permission_session(
        &self,
        ctx: &Context<'_>,
        id: &str,
    ) -> Result<Option<PermissionSession>, PermissionError> {
        Ok(SESSIONS.get(ctx, id)?)
    }

    pub fn list_permission_sessions(
        &self,
        ctx: &Context<'_>,
        modified_after: Option<Timestamp>,
        response_max_size: u32,
    ) -> Result<Vec<PermissionSession>, PermissionError> {
        let limit = resolve_response_max_size(response_max_size)?;
        let mut sessions: Vec<PermissionSession> = SESSIONS
            .values(ctx)?
            .into_iter()
            .filter(|s| modified_after.map_or(true, |t| s.modified > t))
            .collect();
        sessions.sort_by(|a, b| a.modified.cmp(&b.modified).then(a.id.cmp(&b.id)));
        sessions.truncate(limit);
        Ok(sessions)
    }

    // ---- genesis -----------------------------------------------------------

    pub fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        genesis: &GenesisState,
    ) -> Result<(), PermissionError> {
        genesis.params.validate()?;
        PARAMS.set(ctx, &genesis.params);
        let mut max_id = 0;
        for perm in &genesis.permissions {
            if perm.validator_perm_id != 0
                && !genesis
                    .permissions
                    .iter()
                    .any(|p| p.id == perm.validator_perm_id)
            {
                return Err(PermissionError::NotFound(format!(
                    "validator {} of permission {}",
                    perm.validator_perm_id, perm.id
                )));
            }
            self.store(ctx, perm);
            max_id = max_id.max(perm.id);
        }
        for session in &genesis.permission_sessions {
            SESSIONS.set(ctx, &session.id, session);
        }
        PERMISSION_SEQ.set(ctx, max_id + 1);
        tracing::info!(
            permissions = genesis.permissions.len(),
            sessions = genesis.permission_sessions.len(),
            "permission genesis loaded"
        );
        Ok(())
    }

    pub fn export_genesis(&self, ctx: &Context<'_>) -> Result<GenesisState, PermissionError> {
        Ok(GenesisState {
            params: self.params(ctx)?,
            permissions: PERMISSIONS.values(ctx)?,
            permission_sessions: SESSIONS.values(ctx)?,
        })
    }

    // ---- helpers -----------------------------------------------------------

    pub(crate) fn load(&self, ctx: &Context<'_>, id: u64) -> Result<Permission, PermissionError> {
        PERMISSIONS
            .get(ctx, &id)?
            .ok_or_else(|| PermissionError::NotFound(format!("permission {}", id)))
    }

    /// Load a permission that may still change state.
    fn load_mutable(&self, ctx: &Context<'_>, id: u64) -> Result<Permission, PermissionError> {
        let perm = self.load(ctx, id)?;
        if perm.is_terminal() {
            return Err(PermissionError::InvalidState(format!(
                "permission {} is revoked or terminated",
                id
            )));
        }
        Ok(perm)
    }

    fn store(&self, ctx: &mut Context<'_>, perm: &Permission) {
        PERMISSIONS.set(ctx, &perm.id, perm);
        if !perm.did.is_empty() {
            PERMISSIONS_BY_DID.set(ctx, &(perm.did.clone(), perm.id), &perm.id);
        }
    }

    pub(crate) fn load_schema(
        &self,
        ctx: &Context<'_>,
        id: u64,
    ) -> Result<CredentialSchema, PermissionError> {
        self.schemas
            .get_credential_schema(ctx, id)?
            .ok_or_else(|| PermissionError::NotFound(format!("credential schema {}", id)))
    }

    fn active_schema(
        &self,
        ctx: &Context<'_>,
        id: u64,
    ) -> Result<CredentialSchema, PermissionError> {
        let schema = self.load_schema(ctx, id)?;
        if schema.archived.is_some() {
            return Err(PermissionError::InvalidState(format!(
                "credential schema {} is archived",
                id
            )));
        }
        Ok(schema)
    }

    fn ensure_signer(&self, expected: &str, got: &str, role: &str) -> Result<(), PermissionError> {
        if expected == got {
            Ok(())
        } else {
            tracing::warn!(expected, got, role, "signer mismatch");
            Err(PermissionError::InvalidSigner(format!(
                "expected {} {}, got {}",
                role, expected, got
            )))
        }
    }

    fn validator_grantee(
        &self,
        ctx: &Context<'_>,
        perm: &Permission,
    ) -> Result<Option<String>, PermissionError> {
        if perm.validator_perm_id == 0 {
            return Ok(None);
        }
        Ok(PERMISSIONS
            .get(ctx, &perm.validator_perm_id)?
            .map(|v| v.grantee))
    }

    /// The validator's grantee, or for parentless permissions the trust
    /// registry controller, may extend and revoke.
    fn ensure_manager(
        &self,
        ctx: &Context<'_>,
        perm: &Permission,
        caller: &str,
    ) -> Result<(), PermissionError> {
        let expected = match self.validator_grantee(ctx, perm)? {
            Some(grantee) => grantee,
            None => {
                let schema = self.load_schema(ctx, perm.schema_id)?;
                self.schemas.trust_registry_of(ctx, &schema)?.controller
            }
        };
        self.ensure_signer(&expected, caller, "validator")
    }

    /// Escrowed fees and applicant deposit of a validation process run by
    /// `validator`.
    fn vp_amounts(
        &self,
        ctx: &Context<'_>,
        validator: &Permission,
    ) -> Result<(u64, u64), PermissionError> {
        let unit = self.trust_registry.trust_unit_price(ctx)?;
        let fees = validator
            .validation_fees
            .checked_mul(unit)
            .ok_or_else(|| PermissionError::InvalidRequest("validation fees overflow".into()))?;
        let rate = self.trust_deposit.rates(ctx)?.trust_deposit_rate;
        let deposit = rate.mul_truncate(fees)?;
        Ok((fees, deposit))
    }

    /// Move escrowed fees to the validator, routing the trust deposit rate
    /// share into its trust deposit.
    fn pay_validator(
        &self,
        ctx: &mut Context<'_>,
        validator: &str,
        fees: u64,
    ) -> Result<(), PermissionError> {
        if fees == 0 {
            return Ok(());
        }
        let rate = self.trust_deposit.rates(ctx)?.trust_deposit_rate;
        let to_deposit = rate.mul_truncate(fees)?;
        let direct = fees - to_deposit;
        let escrow = self.module_account();
        self.bank.send(ctx, &escrow, validator, direct)?;
        self.trust_deposit
            .fund_trust_deposit(ctx, &escrow, validator, to_deposit)?;
        tracing::debug!(validator, direct, to_deposit, "validation fees paid");
        Ok(())
    }

    fn release_deposit(
        &self,
        ctx: &mut Context<'_>,
        account: &str,
        amount: u64,
    ) -> Result<(), PermissionError> {
        if amount > 0 {
            self.trust_deposit
                .adjust_trust_deposit(ctx, account, -to_delta(amount)?)?;
        }
        Ok(())
    }

    fn check_overlap(
        &self,
        ctx: &Context<'_>,
        schema_id: u64,
        perm_type: PermissionType,
        country: &str,
        grantee: &str,
        window: (Timestamp, Option<Timestamp>),
    ) -> Result<(), PermissionError> {
        for existing in PERMISSIONS.values(ctx)? {
            if existing.is_terminal()
                || existing.schema_id != schema_id
                || existing.perm_type() != perm_type
                || existing.country != country
                || existing.grantee != grantee
            {
                continue;
            }
            if windows_overlap(existing.window(), window) {
                tracing::warn!(existing = existing.id, grantee, "overlapping permission rejected");
                return Err(PermissionError::Overlapping {
                    existing: existing.id,
                });
            }
        }
        Ok(())
    }
}

struct DirectPermission<'a> {
    creator: &'a str,
    perm_type: PermissionType,
    schema_id: u64,
    did: &'a str,
    country: &'a str,
    effective_from: Option<Timestamp>,
    effective_until: Option<Timestamp>,
    validation_fees: u64,
    issuance_fees: u64,
    verification_fees: u64,
}

fn checked_add(a: u64, b: u64, what: &str) -> Result<u64, PermissionError> {
    a.checked_add(b)
        .ok_or_else(|| CoreError::Overflow(what.to_string()).into())
}

pub(crate) fn to_delta(amount: u64) -> Result<i64, PermissionError> {
    i64::try_from(amount)
        .map_err(|_| PermissionError::InvalidRequest(format!("amount {} too large", amount)))
}
