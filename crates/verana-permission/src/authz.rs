//! Permission-set traversal and the read-only authorization queries.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use verana_core::{Context, Timestamp};
use verana_credentialschema::PermManagementMode;

use crate::error::PermissionError;
use crate::manager::{PermissionManager, PERMISSIONS, PERMISSIONS_BY_DID, SESSIONS};
use crate::types::{Permission, PermissionType};

/// Guard against malformed cycles in imported state.
const MAX_ANCESTOR_DEPTH: usize = 64;

/// Outcome of an authorization query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationVerdict {
    Authorized,
    Forbidden,
    /// Fees are due along the permission set; retry with a session.
    SessionRequired,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IsAuthorizedIssuerRequest {
    pub issuer_did: String,
    #[serde(default)]
    pub user_agent_did: String,
    #[serde(default)]
    pub wallet_user_agent_did: String,
    pub schema_id: u64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub when: Option<Timestamp>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IsAuthorizedVerifierRequest {
    pub verifier_did: String,
    pub issuer_did: String,
    #[serde(default)]
    pub user_agent_did: String,
    #[serde(default)]
    pub wallet_user_agent_did: String,
    pub schema_id: u64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub when: Option<Timestamp>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl PermissionManager {
    /// Non-terminal permissions owed fees when `verifier_perm_id` (or, when
    /// it is zero, `issuer_perm_id`) acts: the executor's ancestors, plus
    /// the issuer permission and its ancestors for a verifier.
    pub fn find_beneficiaries(
        &self,
        ctx: &Context<'_>,
        issuer_perm_id: u64,
        verifier_perm_id: u64,
    ) -> Result<Vec<Permission>, PermissionError> {
        if issuer_perm_id == 0 && verifier_perm_id == 0 {
            return Err(PermissionError::InvalidRequest(
                "issuer or verifier permission id required".into(),
            ));
        }
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        if issuer_perm_id != 0 {
            let issuer = self.load(ctx, issuer_perm_id)?;
            if verifier_perm_id != 0 && !issuer.is_terminal() {
                seen.insert(issuer.id);
                out.push(issuer.clone());
            }
            self.collect_ancestors(ctx, issuer.validator_perm_id, &mut seen, &mut out)?;
        }
        if verifier_perm_id != 0 {
            let verifier = self.load(ctx, verifier_perm_id)?;
            self.collect_ancestors(ctx, verifier.validator_perm_id, &mut seen, &mut out)?;
        }
        Ok(out)
    }

    fn collect_ancestors(
        &self,
        ctx: &Context<'_>,
        mut next: u64,
        seen: &mut BTreeSet<u64>,
        out: &mut Vec<Permission>,
    ) -> Result<(), PermissionError> {
        let mut depth = 0;
        while next != 0 {
            if depth == MAX_ANCESTOR_DEPTH {
                return Err(PermissionError::InvalidState(format!(
                    "permission chain deeper than {}",
                    MAX_ANCESTOR_DEPTH
                )));
            }
            depth += 1;
            let Some(perm) = PERMISSIONS.get(ctx, &next)? else {
                break;
            };
            next = perm.validator_perm_id;
            if perm.is_terminal() || !seen.insert(perm.id) {
                continue;
            }
            out.push(perm);
        }
        Ok(())
    }

    pub fn is_authorized_issuer(
        &self,
        ctx: &Context<'_>,
        req: &IsAuthorizedIssuerRequest,
    ) -> Result<AuthorizationVerdict, PermissionError> {
        let Some(schema) = self.schemas.get_credential_schema(ctx, req.schema_id)? else {
            return Ok(AuthorizationVerdict::Forbidden);
        };
        if schema.archived.is_some() {
            return Ok(AuthorizationVerdict::Forbidden);
        }
        if schema.issuer_perm_management_mode() == PermManagementMode::Open {
            return Ok(AuthorizationVerdict::Authorized);
        }
        let when = req.when.unwrap_or_else(|| ctx.block_time());
        let country = req.country.as_deref().unwrap_or_default();
        let Some(issuer) = self.find_effective(
            ctx,
            &req.issuer_did,
            PermissionType::Issuer,
            req.schema_id,
            country,
            when,
        )?
        else {
            tracing::debug!(did = %req.issuer_did, schema_id = req.schema_id, "no effective issuer permission");
            return Ok(AuthorizationVerdict::Forbidden);
        };

        let fees_due = self
            .find_beneficiaries(ctx, issuer.id, 0)?
            .iter()
            .any(|p| p.issuance_fees > 0);
        self.session_verdict(
            ctx,
            req.session_id.as_deref(),
            fees_due,
            SessionMatch {
                executor: issuer.id,
                beneficiary: 0,
                user_agent_did: &req.user_agent_did,
                wallet_user_agent_did: &req.wallet_user_agent_did,
            },
        )
    }

    pub fn is_authorized_verifier(
        &self,
        ctx: &Context<'_>,
        req: &IsAuthorizedVerifierRequest,
    ) -> Result<AuthorizationVerdict, PermissionError> {
        let Some(schema) = self.schemas.get_credential_schema(ctx, req.schema_id)? else {
            return Ok(AuthorizationVerdict::Forbidden);
        };
        if schema.archived.is_some() {
            return Ok(AuthorizationVerdict::Forbidden);
        }
        if schema.verifier_perm_management_mode() == PermManagementMode::Open {
            return Ok(AuthorizationVerdict::Authorized);
        }
        let when = req.when.unwrap_or_else(|| ctx.block_time());
        let country = req.country.as_deref().unwrap_or_default();
        let Some(verifier) = self.find_effective(
            ctx,
            &req.verifier_did,
            PermissionType::Verifier,
            req.schema_id,
            country,
            when,
        )?
        else {
            tracing::debug!(did = %req.verifier_did, schema_id = req.schema_id, "no effective verifier permission");
            return Ok(AuthorizationVerdict::Forbidden);
        };
        let issuer = self.find_effective(
            ctx,
            &req.issuer_did,
            PermissionType::Issuer,
            req.schema_id,
            country,
            when,
        )?;
        let issuer_id = match issuer {
            Some(issuer) => issuer.id,
            None if schema.issuer_perm_management_mode() == PermManagementMode::Open => 0,
            None => {
                tracing::debug!(did = %req.issuer_did, schema_id = req.schema_id, "no effective issuer permission");
                return Ok(AuthorizationVerdict::Forbidden);
            }
        };

        let fees_due = self
            .find_beneficiaries(ctx, issuer_id, verifier.id)?
            .iter()
            .any(|p| p.verification_fees > 0);
        self.session_verdict(
            ctx,
            req.session_id.as_deref(),
            fees_due,
            SessionMatch {
                executor: verifier.id,
                beneficiary: issuer_id,
                user_agent_did: &req.user_agent_did,
                wallet_user_agent_did: &req.wallet_user_agent_did,
            },
        )
    }

    fn find_effective(
        &self,
        ctx: &Context<'_>,
        did: &str,
        perm_type: PermissionType,
        schema_id: u64,
        country: &str,
        when: Timestamp,
    ) -> Result<Option<Permission>, PermissionError> {
        for id in PERMISSIONS_BY_DID.prefixed_values(ctx, &did.to_string())? {
            let Some(perm) = PERMISSIONS.get(ctx, &id)? else {
                continue;
            };
            if perm.perm_type() == perm_type
                && perm.schema_id == schema_id
                && perm.matches_country(country)
                && perm.is_effective_at(when)
            {
                return Ok(Some(perm));
            }
        }
        Ok(None)
    }

    fn session_verdict(
        &self,
        ctx: &Context<'_>,
        session_id: Option<&str>,
        fees_due: bool,
        expected: SessionMatch<'_>,
    ) -> Result<AuthorizationVerdict, PermissionError> {
        let Some(session_id) = session_id.filter(|s| !s.is_empty()) else {
            return Ok(if fees_due {
                AuthorizationVerdict::SessionRequired
            } else {
                AuthorizationVerdict::Authorized
            });
        };
        let Some(session) = SESSIONS.get(ctx, session_id)? else {
            return Ok(AuthorizationVerdict::Forbidden);
        };
        if !self.perm_did_matches(ctx, session.agent_perm_id, expected.user_agent_did)? {
            return Ok(AuthorizationVerdict::Forbidden);
        }
        for authz in &session.authz {
            if authz.executor_perm_id != expected.executor
                || authz.beneficiary_perm_id != expected.beneficiary
            {
                continue;
            }
            if self.perm_did_matches(ctx, authz.wallet_agent_perm_id, expected.wallet_user_agent_did)? {
                return Ok(AuthorizationVerdict::Authorized);
            }
        }
        tracing::debug!(session = session_id, executor = expected.executor, "session does not cover executor");
        Ok(AuthorizationVerdict::Forbidden)
    }

    /// An empty DID is not checked.
    fn perm_did_matches(
        &self,
        ctx: &Context<'_>,
        perm_id: u64,
        did: &str,
    ) -> Result<bool, PermissionError> {
        if did.is_empty() {
            return Ok(true);
        }
        Ok(PERMISSIONS
            .get(ctx, &perm_id)?
            .map_or(false, |p| p.did == did))
    }
}

struct SessionMatch<'a> {
    executor: u64,
    beneficiary: u64,
    user_agent_did: &'a str,
    wallet_user_agent_did: &'a str,
}
