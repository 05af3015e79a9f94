//! Permission sessions and the fee settlement run when an authorization is
//! appended to one.

use serde::{Deserialize, Serialize};
use verana_core::{validate_address, Context, Event};

use crate::error::PermissionError;
use crate::manager::{PermissionManager, MODULE_NAME, SESSIONS};
use crate::msgs::MsgCreateOrUpdatePermissionSession;
use crate::types::{Permission, PermissionSession, PermissionType, SessionAuthz};

/// Coins moved by one session fee settlement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFees {
    pub total: u64,
    pub to_trust_deposits: u64,
    pub user_agent_reward: u64,
    pub wallet_user_agent_reward: u64,
}

impl PermissionManager {
    /// Create session `msg.id` or append one authorization to it, settling
    /// the fees owed along the permission set.
    pub fn create_or_update_permission_session(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgCreateOrUpdatePermissionSession,
    ) -> Result<SessionFees, PermissionError> {
        validate_address(&msg.creator)?;
        uuid::Uuid::parse_str(&msg.id).map_err(|e| {
            PermissionError::InvalidRequest(format!("session id {} is not a UUID: {}", msg.id, e))
        })?;

        let agent = self.load_role(ctx, msg.agent_perm_id, &[PermissionType::Holder], "agent")?;
        let executor = self.load_role(
            ctx,
            msg.executor_perm_id,
            &[PermissionType::Issuer, PermissionType::Verifier],
            "executor",
        )?;
        let wallet_agent = if msg.wallet_agent_perm_id == 0 {
            None
        } else {
            Some(self.load_role(
                ctx,
                msg.wallet_agent_perm_id,
                &[PermissionType::Holder],
                "wallet agent",
            )?)
        };
        let issuer_perm_id = match executor.perm_type() {
            PermissionType::Verifier => {
                if msg.beneficiary_perm_id == 0 {
                    return Err(PermissionError::InvalidRequest(
                        "verifier sessions need an issuer beneficiary".into(),
                    ));
                }
                let beneficiary = self.load_role(
                    ctx,
                    msg.beneficiary_perm_id,
                    &[PermissionType::Issuer],
                    "beneficiary",
                )?;
                if beneficiary.schema_id != executor.schema_id {
                    return Err(PermissionError::InvalidRequest(format!(
                        "beneficiary {} is on schema {}, executor on schema {}",
                        beneficiary.id, beneficiary.schema_id, executor.schema_id
                    )));
                }
                beneficiary.id
            }
            _ => {
                if msg.beneficiary_perm_id != 0 {
                    return Err(PermissionError::InvalidRequest(
                        "issuer sessions take no beneficiary".into(),
                    ));
                }
                executor.id
            }
        };

        let now = ctx.block_time();
        let authz = SessionAuthz {
            executor_perm_id: executor.id,
            beneficiary_perm_id: msg.beneficiary_perm_id,
            wallet_agent_perm_id: msg.wallet_agent_perm_id,
        };
        let mut session = match SESSIONS.get(ctx, &msg.id)? {
            Some(existing) => {
                if existing.controller != msg.creator {
                    tracing::warn!(session = %msg.id, creator = %msg.creator, "session update rejected: not the controller");
                    return Err(PermissionError::InvalidSigner(format!(
                        "session {} is controlled by {}",
                        msg.id, existing.controller
                    )));
                }
                if existing.agent_perm_id != agent.id {
                    return Err(PermissionError::InvalidRequest(format!(
                        "session {} belongs to agent permission {}",
                        msg.id, existing.agent_perm_id
                    )));
                }
                if existing.authz.contains(&authz) {
                    return Err(PermissionError::AlreadyExists(format!(
                        "authorization already recorded in session {}",
                        msg.id
                    )));
                }
                existing
            }
            None => PermissionSession {
                id: msg.id.clone(),
                controller: msg.creator.clone(),
                agent_perm_id: agent.id,
                created: now,
                modified: now,
                authz: Vec::new(),
            },
        };

        let verifier_perm_id = match executor.perm_type() {
            PermissionType::Verifier => executor.id,
            _ => 0,
        };
        let beneficiaries = self.find_beneficiaries(ctx, issuer_perm_id, verifier_perm_id)?;
        let fees = self.settle_session_fees(
            ctx,
            &msg.creator,
            &executor,
            &beneficiaries,
            &agent,
            wallet_agent.as_ref(),
        )?;

        session.authz.push(authz);
        session.modified = now;
        SESSIONS.set(ctx, &session.id, &session);

        ctx.emit(
            Event::new("create_or_update_permission_session")
                .attr("session_id", &session.id)
                .attr("controller", &session.controller)
                .attr("executor_perm_id", executor.id)
                .attr("fees", fees.total),
        );
        tracing::info!(
            module = MODULE_NAME,
            session = %session.id,
            executor = executor.id,
            total = fees.total,
            "permission session updated"
        );
        Ok(fees)
    }

    fn load_role(
        &self,
        ctx: &Context<'_>,
        id: u64,
        allowed: &[PermissionType],
        role: &str,
    ) -> Result<Permission, PermissionError> {
        let perm = self.load(ctx, id)?;
        if perm.is_terminal() {
            return Err(PermissionError::InvalidState(format!(
                "{} permission {} is revoked or terminated",
                role, id
            )));
        }
        if !allowed.contains(&perm.perm_type()) {
            return Err(PermissionError::InvalidRequest(format!(
                "{} permission {} has type {:?}",
                role,
                id,
                perm.perm_type()
            )));
        }
        Ok(perm)
    }

    /// Pay each beneficiary its issuance or verification fee, diverting the
    /// trust deposit rate share into its trust deposit, then pay the agent
    /// rewards. Every transfer is debited from `payer`.
    fn settle_session_fees(
        &self,
        ctx: &mut Context<'_>,
        payer: &str,
        executor: &Permission,
        beneficiaries: &[Permission],
        agent: &Permission,
        wallet_agent: Option<&Permission>,
    ) -> Result<SessionFees, PermissionError> {
        let unit = self.trust_registry.trust_unit_price(ctx)?;
        let rates = self.trust_deposit.rates(ctx)?;
        let mut fees = SessionFees::default();

        for beneficiary in beneficiaries {
            let units = match executor.perm_type() {
                PermissionType::Verifier => beneficiary.verification_fees,
                _ => beneficiary.issuance_fees,
            };
            let amount = units.checked_mul(unit).ok_or_else(|| {
                PermissionError::InvalidRequest(format!(
                    "fees of permission {} overflow",
                    beneficiary.id
                ))
            })?;
            if amount == 0 {
                continue;
            }
            let to_deposit = rates.trust_deposit_rate.mul_truncate(amount)?;
            self.bank
                .send(ctx, payer, &beneficiary.grantee, amount - to_deposit)?;
            self.trust_deposit
                .fund_trust_deposit(ctx, payer, &beneficiary.grantee, to_deposit)?;
            fees.total = fees.total.saturating_add(amount);
            fees.to_trust_deposits = fees.to_trust_deposits.saturating_add(to_deposit);
        }

        fees.user_agent_reward = rates.user_agent_reward_rate.mul_truncate(fees.total)?;
        self.bank
            .send(ctx, payer, &agent.grantee, fees.user_agent_reward)?;
        if let Some(wallet_agent) = wallet_agent {
            fees.wallet_user_agent_reward =
                rates.wallet_user_agent_reward_rate.mul_truncate(fees.total)?;
            self.bank
                .send(ctx, payer, &wallet_agent.grantee, fees.wallet_user_agent_reward)?;
        }
        tracing::debug!(payer, total = fees.total, to_deposits = fees.to_trust_deposits, "session fees settled");
        Ok(fees)
    }
}
