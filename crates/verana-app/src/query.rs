//! Read-only queries over the committed state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use verana_core::{Bank, Context, CoreError, Timestamp};
use verana_credentialschema::ListCredentialSchemasRequest;
use verana_diddirectory::ListDidsRequest;
use verana_permission::{
    FindPermissionsWithDidRequest, IsAuthorizedIssuerRequest, IsAuthorizedVerifierRequest,
};
use verana_trustregistry::ListTrustRegistriesRequest;
use verana_validation::ListValidationsRequest;

use crate::app::VeranaApp;
use crate::error::AppError;

/// Every read the node answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    Params,
    Balance {
        account: String,
    },
    GetTrustDeposit {
        account: String,
    },
    GetTrustRegistry {
        id: u64,
        #[serde(default)]
        active_gf_only: bool,
        #[serde(default)]
        preferred_language: Option<String>,
    },
    GetTrustRegistryByDid {
        did: String,
        #[serde(default)]
        active_gf_only: bool,
        #[serde(default)]
        preferred_language: Option<String>,
    },
    ListTrustRegistries(ListTrustRegistriesRequest),
    GetCredentialSchema {
        id: u64,
    },
    RenderJsonSchema {
        id: u64,
    },
    ListCredentialSchemas(ListCredentialSchemasRequest),
    GetPermission {
        id: u64,
    },
    ListPermissions {
        #[serde(default)]
        modified_after: Option<Timestamp>,
        #[serde(default)]
        response_max_size: u32,
    },
    FindPermissionsWithDid(FindPermissionsWithDidRequest),
    FindBeneficiaries {
        #[serde(default)]
        issuer_perm_id: u64,
        #[serde(default)]
        verifier_perm_id: u64,
    },
    IsAuthorizedIssuer(IsAuthorizedIssuerRequest),
    IsAuthorizedVerifier(IsAuthorizedVerifierRequest),
    GetPermissionSession {
        id: String,
    },
    ListPermissionSessions {
        #[serde(default)]
        modified_after: Option<Timestamp>,
        #[serde(default)]
        response_max_size: u32,
    },
    GetValidation {
        id: u64,
    },
    ListValidations(ListValidationsRequest),
    GetDid {
        did: String,
    },
    ListDids(ListDidsRequest),
}

/// Current parameters of every module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllParams {
    pub trustdeposit: verana_trustdeposit::Params,
    pub trustregistry: verana_trustregistry::Params,
    pub credentialschema: verana_credentialschema::Params,
    pub permission: verana_permission::Params,
    pub diddirectory: verana_diddirectory::Params,
}

impl VeranaApp {
    pub fn all_params(&self, ctx: &Context<'_>) -> Result<AllParams, AppError> {
        Ok(AllParams {
            trustdeposit: self.trust_deposit.params(ctx)?,
            trustregistry: self.trust_registry.params(ctx)?,
            credentialschema: self.schemas.params(ctx)?,
            permission: self.permissions.params(ctx)?,
            diddirectory: self.did_directory.params(ctx)?,
        })
    }

    /// Answer `query` as JSON. Missing single entities are `NotFound`.
    pub fn query(&self, ctx: &Context<'_>, query: &Query) -> Result<Value, AppError> {
        let value = match query {
            Query::Params => serde_json::to_value(self.all_params(ctx)?)?,
            Query::Balance { account } => serde_json::json!({
                "account": account,
                "amount": self.bank.balance(ctx, account)?,
                "denom": verana_core::BOND_DENOM,
            }),
            Query::GetTrustDeposit { account } => found(
                self.trust_deposit.get_trust_deposit(ctx, account)?,
                || format!("trust deposit of {}", account),
            )?,
            Query::GetTrustRegistry {
                id,
                active_gf_only,
                preferred_language,
            } => serde_json::to_value(self.trust_registry.get_trust_registry_view(
                ctx,
                *id,
                *active_gf_only,
                preferred_language.as_deref(),
            )?)?,
            Query::GetTrustRegistryByDid {
                did,
                active_gf_only,
                preferred_language,
            } => serde_json::to_value(self.trust_registry.get_trust_registry_view_by_did(
                ctx,
                did,
                *active_gf_only,
                preferred_language.as_deref(),
            )?)?,
            Query::ListTrustRegistries(req) => {
                serde_json::to_value(self.trust_registry.list_trust_registries(ctx, req)?)?
            }
            Query::GetCredentialSchema { id } => found(
                self.schemas.get_credential_schema(ctx, *id)?,
                || format!("credential schema {}", id),
            )?,
            Query::RenderJsonSchema { id } => {
                serde_json::from_str(&self.schemas.render_json_schema(ctx, *id)?)?
            }
            Query::ListCredentialSchemas(req) => {
                serde_json::to_value(self.schemas.list_credential_schemas(ctx, req)?)?
            }
            Query::GetPermission { id } => found(
                self.permissions.get_permission(ctx, *id)?,
                || format!("permission {}", id),
            )?,
            Query::ListPermissions {
                modified_after,
                response_max_size,
            } => serde_json::to_value(self.permissions.list_permissions(
                ctx,
                *modified_after,
                *response_max_size,
            )?)?,
            Query::FindPermissionsWithDid(req) => {
                serde_json::to_value(self.permissions.find_permissions_with_did(ctx, req)?)?
            }
            Query::FindBeneficiaries {
                issuer_perm_id,
                verifier_perm_id,
            } => serde_json::to_value(self.permissions.find_beneficiaries(
                ctx,
                *issuer_perm_id,
                *verifier_perm_id,
            )?)?,
            Query::IsAuthorizedIssuer(req) => serde_json::json!({
                "verdict": self.permissions.is_authorized_issuer(ctx, req)?,
            }),
            Query::IsAuthorizedVerifier(req) => serde_json::json!({
                "verdict": self.permissions.is_authorized_verifier(ctx, req)?,
            }),
            Query::GetPermissionSession { id } => found(
                self.permissions.get_permission_session(ctx, id)?,
                || format!("permission session {}", id),
            )?,
            Query::ListPermissionSessions {
                modified_after,
                response_max_size,
            } => serde_json::to_value(self.permissions.list_permission_sessions(
                ctx,
                *modified_after,
                *response_max_size,
            )?)?,
            Query::GetValidation { id } => found(
                self.validations.get_validation(ctx, *id)?,
                || format!("validation {}", id),
            )?,
            Query::ListValidations(req) => {
                serde_json::to_value(self.validations.list_validations(ctx, req)?)?
            }
            Query::GetDid { did } => {
                found(self.did_directory.get_did(ctx, did)?, || did.clone())?
            }
            Query::ListDids(req) => serde_json::to_value(self.did_directory.list_dids(ctx, req)?)?,
        };
        Ok(value)
    }
}

fn found<T: Serialize>(entity: Option<T>, what: impl FnOnce() -> String) -> Result<Value, AppError> {
    match entity {
        Some(e) => Ok(serde_json::to_value(e)?),
        None => Err(CoreError::NotFound(what()).into()),
    }
}
