use std::sync::Arc;

use serde::{Deserialize, Serialize};
use verana_core::{
    module_address, resolve_response_max_size, validate_address, validate_country, Bank,
    Collection, Context, Event, Sequence, Timestamp,
};
use verana_credentialschema::{CredentialSchema, SchemaRegistry};
use verana_permission::{
    required_validator_type, role_mode, validity_period_days, Permission, PermissionManager,
    PermissionType, VpState,
};
use verana_trustdeposit::TrustDepositLedger;
use crate::error::ValidationError;
use crate::types::{
    GenesisState, MsgCreateValidation, MsgRenewValidation, MsgSetValidated, Validation,
    ValidationState, ValidatorDeposit,
};

pub const MODULE_NAME: &str = "validation";

const VALIDATIONS: Collection<u64, Validation> = Collection::new(MODULE_NAME, 0x01);
const VALIDATION_SEQ: Sequence = Sequence::new(MODULE_NAME, 0x10);

/// Filters of `ListValidations`. One of `controller` or
/// `validator_perm_id` is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListValidationsRequest {
    pub controller: Option<String>,
    pub validator_perm_id: Option<u64>,
    pub validation_type: Option<PermissionType>,
    pub state: Option<ValidationState>,
    pub exp_before: Option<Timestamp>,
    pub response_max_size: u32,
}

#[derive(Clone)]
pub struct ValidationManager {
    bank: Arc<dyn Bank>,
    trust_deposit: TrustDepositLedger,
    schemas: SchemaRegistry,
    permissions: PermissionManager,
}

impl ValidationManager {
    pub fn new(
        bank: Arc<dyn Bank>,
        trust_deposit: TrustDepositLedger,
        schemas: SchemaRegistry,
        permissions: PermissionManager,
    ) -> Self {
        Self {
            bank,
            trust_deposit,
            schemas,
            permissions,
        }
    }

    /// Escrow account holding pending validation fees.
    pub fn module_account(&self) -> String {
        module_address(MODULE_NAME)
    }

    pub fn create_validation(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgCreateValidation,
    ) -> Result<u64, ValidationError> {
        validate_address(&msg.creator)?;
        let validation_type = PermissionType::from_wire(msg.validation_type)?;
        if validation_type == PermissionType::TrustRegistry {
            return Err(ValidationError::InvalidRequest(
                "trust registry permissions are not validated".into(),
            ));
        }
        if !msg.country.is_empty() {
            validate_country(&msg.country)?;
        }
        let validator = self.checked_validator(ctx, msg.validator_perm_id, validation_type, &msg.country)?;
        let (fees, deposit) = Self::round_amounts(&validator);
        self.escrow(ctx, &msg.creator, fees, deposit)?;

        let now = ctx.block_time();
        let id = VALIDATION_SEQ.next(ctx)?;
        let validation = Validation {
            id,
            applicant: msg.creator.clone(),
            validation_type: validation_type as i32,
            created: now,
            validator_perm_id: validator.id,
            state: ValidationState::Pending as i32,
            last_state_change: now,
            applicant_deposit: deposit,
            current_fees: fees,
            current_deposit: deposit,
            country: msg.country.clone(),
            ..Default::default()
        };
        VALIDATIONS.set(ctx, &id, &validation);

        ctx.emit(
            Event::new("create_validation")
                .attr("validation_id", id)
                .attr("applicant", &msg.creator)
                .attr("validator_perm_id", validator.id)
                .attr("fees", fees)
                .attr("deposit", deposit),
        );
        tracing::info!(id, applicant = %msg.creator, validator = validator.id, fees, deposit, "validation created");
        Ok(id)
    }

    pub fn renew_validation(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgRenewValidation,
    ) -> Result<(), ValidationError> {
        let mut validation = self.load(ctx, msg.id)?;
        ensure_signer(&validation.applicant, &msg.creator, "applicant")?;
        if validation.state() != ValidationState::Validated {
            return Err(ValidationError::InvalidState(format!(
                "validation {} is not validated",
                msg.id
            )));
        }

        let validator_id = if msg.validator_perm_id == 0 {
            validation.validator_perm_id
        } else {
            msg.validator_perm_id
        };
        let validator = self.checked_validator(
            ctx,
            validator_id,
            validation.validation_type(),
            &validation.country,
        )?;
        if validator.id != validation.validator_perm_id {
            let previous = self.load_permission(ctx, validation.validator_perm_id)?;
            if previous.schema_id != validator.schema_id {
                return Err(ValidationError::InvalidRequest(format!(
                    "validator {} is on schema {}, validation on schema {}",
                    validator.id, validator.schema_id, previous.schema_id
                )));
            }
        }

        let (fees, deposit) = Self::round_amounts(&validator);
        self.escrow(ctx, &msg.creator, fees, deposit)?;

        let now = ctx.block_time();
        validation.validator_perm_id = validator.id;
        validation.current_fees = fees;
        validation.current_deposit = deposit;
        validation.applicant_deposit = validation
            .applicant_deposit
            .checked_add(deposit)
            .ok_or_else(|| ValidationError::InvalidState("applicant deposit overflows".into()))?;
        validation.set_state(ValidationState::Pending);
        validation.last_state_change = now;
        VALIDATIONS.set(ctx, &validation.id, &validation);

        ctx.emit(
            Event::new("renew_validation")
                .attr("validation_id", validation.id)
                .attr("validator_perm_id", validator.id)
                .attr("fees", fees),
        );
        tracing::info!(id = validation.id, applicant = %msg.creator, validator = validator.id, "validation renewed");
        Ok(())
    }

    pub fn set_validated(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgSetValidated,
    ) -> Result<(), ValidationError> {
        let mut validation = self.load(ctx, msg.id)?;
        if validation.state() != ValidationState::Pending {
            return Err(ValidationError::InvalidState(format!(
                "validation {} is not pending",
                msg.id
            )));
        }
        let validator = self.load_permission(ctx, validation.validator_perm_id)?;
        ensure_signer(&validator.grantee, &msg.creator, "validator")?;

        if validation.validation_type() == PermissionType::Holder {
            if !msg.summary_hash.is_empty() {
                return Err(ValidationError::InvalidRequest(
                    "holder validations take no summary hash".into(),
                ));
            }
        } else if !msg.summary_hash.is_empty() {
            check_summary_hash(&msg.summary_hash)?;
        }

        let schema = self.load_schema(ctx, validator.schema_id)?;
        let now = ctx.block_time();
        let period = validity_period_days(&schema, validation.validation_type());
        let exp = if period == 0 {
            None
        } else {
            let base = match validation.exp {
                Some(exp) if exp > now => exp,
                _ => now,
            };
            Some(base.checked_add_days(period as u64)?)
        };

        let to_deposit = self.pay_validator(ctx, &validator.grantee, validation.current_fees)?;
        if to_deposit > 0 {
            validation.validator_deposits.push(ValidatorDeposit {
                validator_perm_id: validator.id,
                amount: to_deposit,
            });
        }

        validation.current_fees = 0;
        validation.current_deposit = 0;
        validation.summary_hash = msg.summary_hash.clone();
        validation.exp = exp;
        validation.validated.get_or_insert(now);
        validation.set_state(ValidationState::Validated);
        validation.last_state_change = now;
        VALIDATIONS.set(ctx, &validation.id, &validation);

        ctx.emit(
            Event::new("set_validated")
                .attr("validation_id", validation.id)
                .attr("validator", &msg.creator)
                .attr("exp", exp.map(|t| t.to_string()).unwrap_or_default()),
        );
        tracing::info!(id = validation.id, validator = %msg.creator, "validation validated");
        Ok(())
    }

    /// Withdraw a pending round. A never-validated request terminates; a
    /// renewal falls back to VALIDATED.
    pub fn cancel_validation(
        &self,
        ctx: &mut Context<'_>,
        creator: &str,
        id: u64,
    ) -> Result<(), ValidationError> {
        let mut validation = self.load(ctx, id)?;
        ensure_signer(&validation.applicant, creator, "applicant")?;
        if validation.state() != ValidationState::Pending {
            return Err(ValidationError::InvalidState(format!(
                "validation {} is not pending",
                id
            )));
        }
        self.bank.send(
            ctx,
            &self.module_account(),
            &validation.applicant,
            validation.current_fees,
        )?;
        self.release(ctx, &validation.applicant, validation.current_deposit)?;
        validation.applicant_deposit -= validation.current_deposit.min(validation.applicant_deposit);
        validation.current_fees = 0;
        validation.current_deposit = 0;
        let state = if validation.validated.is_some() {
            ValidationState::Validated
        } else {
            ValidationState::Terminated
        };
        validation.set_state(state);
        validation.last_state_change = ctx.block_time();
        VALIDATIONS.set(ctx, &id, &validation);

        ctx.emit(
            Event::new("cancel_validation")
                .attr("validation_id", id)
                .attr("state", format!("{:?}", state)),
        );
        tracing::info!(id, applicant = creator, state = ?state, "validation cancelled");
        Ok(())
    }

    /// Applicant ends a validated validation, releasing its deposit.
    pub fn request_validation_termination(
        &self,
        ctx: &mut Context<'_>,
        creator: &str,
        id: u64,
    ) -> Result<(), ValidationError> {
        let mut validation = self.load(ctx, id)?;
        ensure_signer(&validation.applicant, creator, "applicant")?;
        if validation.state() != ValidationState::Validated {
            return Err(ValidationError::InvalidState(format!(
                "validation {} is not validated",
                id
            )));
        }
        let released = validation.applicant_deposit;
        self.release(ctx, &validation.applicant, released)?;
        validation.applicant_deposit = 0;
        validation.set_state(ValidationState::Terminated);
        validation.last_state_change = ctx.block_time();
        VALIDATIONS.set(ctx, &id, &validation);

        ctx.emit(
            Event::new("request_validation_termination")
                .attr("validation_id", id)
                .attr("released_deposit", released),
        );
        tracing::info!(id, applicant = creator, released, "validation terminated");
        Ok(())
    }

    pub fn get_validation(
        &self,
        ctx: &Context<'_>,
        id: u64,
    ) -> Result<Option<Validation>, ValidationError> {
        Ok(VALIDATIONS.get(ctx, &id)?)
    }

    pub fn list_validations(
        &self,
        ctx: &Context<'_>,
        req: &ListValidationsRequest,
    ) -> Result<Vec<Validation>, ValidationError> {
        if req.controller.is_none() && req.validator_perm_id.is_none() {
            return Err(ValidationError::InvalidRequest(
                "controller or validator_perm_id required".into(),
            ));
        }
        let limit = resolve_response_max_size(req.response_max_size)?;
        let mut out: Vec<Validation> = VALIDATIONS
            .values(ctx)?
            .into_iter()
            .filter(|v| {
                req.controller.as_deref().map_or(true, |c| v.applicant == c)
                    && req.validator_perm_id.map_or(true, |p| v.validator_perm_id == p)
                    && req.validation_type.map_or(true, |t| v.validation_type() == t)
                    && req.state.map_or(true, |s| v.state() == s)
                    && req
                        .exp_before
                        .map_or(true, |before| v.exp.map_or(false, |exp| exp < before))
            })
            .collect();
        if req.exp_before.is_some() {
            out.sort_by(|a, b| a.exp.cmp(&b.exp).then(a.id.cmp(&b.id)));
        } else {
            out.sort_by(|a, b| {
                a.last_state_change
                    .cmp(&b.last_state_change)
                    .then(a.id.cmp(&b.id))
            });
        }
        out.truncate(limit);
        Ok(out)
    }

    pub fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        genesis: &GenesisState,
    ) -> Result<(), ValidationError> {
        let mut max_id = 0;
        for validation in &genesis.validations {
            VALIDATIONS.set(ctx, &validation.id, validation);
            max_id = max_id.max(validation.id);
        }
        VALIDATION_SEQ.set(ctx, max_id + 1);
        tracing::info!(validations = genesis.validations.len(), "validation genesis loaded");
        Ok(())
    }

    pub fn export_genesis(&self, ctx: &Context<'_>) -> Result<GenesisState, ValidationError> {
        Ok(GenesisState {
            validations: VALIDATIONS.values(ctx)?,
        })
    }

    fn load(&self, ctx: &Context<'_>, id: u64) -> Result<Validation, ValidationError> {
        VALIDATIONS
            .get(ctx, &id)?
            .ok_or_else(|| ValidationError::NotFound(format!("validation {}", id)))
    }

    fn load_permission(&self, ctx: &Context<'_>, id: u64) -> Result<Permission, ValidationError> {
        self.permissions
            .get_permission(ctx, id)?
            .ok_or_else(|| ValidationError::NotFound(format!("permission {}", id)))
    }

    fn load_schema(&self, ctx: &Context<'_>, id: u64) -> Result<CredentialSchema, ValidationError> {
        self.schemas
            .get_credential_schema(ctx, id)?
            .ok_or_else(|| ValidationError::NotFound(format!("credential schema {}", id)))
    }

    /// Validator permission able to validate `validation_type` for an
    /// applicant in `country`.
    fn checked_validator(
        &self,
        ctx: &Context<'_>,
        validator_perm_id: u64,
        validation_type: PermissionType,
        country: &str,
    ) -> Result<Permission, ValidationError> {
        let validator = self.load_permission(ctx, validator_perm_id)?;
        if !validator.is_effective_at(ctx.block_time())
            || validator.vp_state() != VpState::Validated
        {
            return Err(ValidationError::InvalidState(format!(
                "validator permission {} is not active",
                validator.id
            )));
        }
        if !validator.country.is_empty() && validator.country != country {
            return Err(ValidationError::InvalidRequest(format!(
                "country {} does not match validator country {}",
                country, validator.country
            )));
        }
        let schema = self.load_schema(ctx, validator.schema_id)?;
        if schema.archived.is_some() {
            return Err(ValidationError::InvalidState(format!(
                "credential schema {} is archived",
                schema.id
            )));
        }
        let mode = role_mode(&schema, validation_type);
        if required_validator_type(validation_type, mode) != Some(validator.perm_type()) {
            return Err(ValidationError::InvalidRequest(format!(
                "{:?} permission {} cannot validate {:?} under mode {:?}",
                validator.perm_type(),
                validator.id,
                validation_type,
                mode
            )));
        }
        Ok(validator)
    }

    /// Fees of one round and the applicant deposit, which equals the fees.
    fn round_amounts(validator: &Permission) -> (u64, u64) {
        (validator.validation_fees, validator.validation_fees)
    }

    fn escrow(
        &self,
        ctx: &mut Context<'_>,
        applicant: &str,
        fees: u64,
        deposit: u64,
    ) -> Result<(), ValidationError> {
        self.trust_deposit
            .adjust_trust_deposit(ctx, applicant, to_delta(deposit)?)?;
        self.bank
            .send(ctx, applicant, &self.module_account(), fees)?;
        tracing::debug!(applicant, fees, deposit, "validation round escrowed");
        Ok(())
    }

    /// Pay escrowed fees to the validator; returns the part routed into its
    /// trust deposit.
    fn pay_validator(
        &self,
        ctx: &mut Context<'_>,
        validator: &str,
        fees: u64,
    ) -> Result<u64, ValidationError> {
        if fees == 0 {
            return Ok(0);
        }
        let rate = self.trust_deposit.rates(ctx)?.trust_deposit_rate;
        let to_deposit = rate.mul_truncate(fees)?;
        let escrow = self.module_account();
        self.bank.send(ctx, &escrow, validator, fees - to_deposit)?;
        self.trust_deposit
            .fund_trust_deposit(ctx, &escrow, validator, to_deposit)?;
        Ok(to_deposit)
    }

    fn release(
        &self,
        ctx: &mut Context<'_>,
        account: &str,
        amount: u64,
    ) -> Result<(), ValidationError> {
        if amount > 0 {
            self.trust_deposit
                .adjust_trust_deposit(ctx, account, -to_delta(amount)?)?;
        }
        Ok(())
    }
}

fn ensure_signer(expected: &str, got: &str, role: &str) -> Result<(), ValidationError> {
    if expected == got {
        return Ok(());
    }
    tracing::warn!(expected, got, role, "signer mismatch");
    Err(ValidationError::InvalidSigner(format!(
        "expected {} {}, got {}",
        role, expected, got
    )))
}

/// Summary hashes are hex-encoded SHA-256 digests.
fn check_summary_hash(hash: &str) -> Result<(), ValidationError> {
    match hex::decode(hash) {
        Ok(bytes) if bytes.len() == 32 => Ok(()),
        _ => Err(ValidationError::InvalidRequest(format!(
            "summary hash must be 64 hex characters, got {:?}",
            hash
        ))),
    }
}

fn to_delta(amount: u64) -> Result<i64, ValidationError> {
    i64::try_from(amount)
        .map_err(|_| ValidationError::InvalidRequest(format!("amount {} too large", amount)))
}
