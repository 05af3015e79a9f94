use serde::{Deserialize, Serialize};
use verana_core::Timestamp;

use crate::error::SchemaError;

/// How permissions of one role (issuer or verifier) are granted.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration, Serialize, Deserialize,
)]
#[repr(i32)]
pub enum PermManagementMode {
    Unspecified = 0,
    /// Anyone may self-create the permission.
    Open = 1,
    /// Granted by a grantor that the trust registry validated.
    GrantorValidation = 2,
    /// Granted directly by the trust registry.
    TrustRegistryValidation = 3,
    /// Managed by the ecosystem outside the validation process.
    Ecosystem = 4,
}

/// A JSON-Schema and its governance metadata.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct CredentialSchema {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, tag = "2")]
    pub tr_id: u64,
    #[prost(message, required, tag = "3")]
    pub created: Timestamp,
    #[prost(message, required, tag = "4")]
    pub modified: Timestamp,
    #[prost(message, optional, tag = "5")]
    pub archived: Option<Timestamp>,
    #[prost(uint64, tag = "6")]
    pub deposit: u64,
    #[prost(string, tag = "7")]
    pub json_schema: String,
    #[prost(uint32, tag = "8")]
    pub issuer_grantor_validation_validity_period: u32,
    #[prost(uint32, tag = "9")]
    pub verifier_grantor_validation_validity_period: u32,
    #[prost(uint32, tag = "10")]
    pub issuer_validation_validity_period: u32,
    #[prost(uint32, tag = "11")]
    pub verifier_validation_validity_period: u32,
    #[prost(uint32, tag = "12")]
    pub holder_validation_validity_period: u32,
    #[prost(enumeration = "PermManagementMode", tag = "13")]
    pub issuer_perm_management_mode: i32,
    #[prost(enumeration = "PermManagementMode", tag = "14")]
    pub verifier_perm_management_mode: i32,
}

impl CredentialSchema {
    pub fn periods(&self) -> ValidityPeriods {
        ValidityPeriods {
            issuer_grantor: self.issuer_grantor_validation_validity_period,
            verifier_grantor: self.verifier_grantor_validation_validity_period,
            issuer: self.issuer_validation_validity_period,
            verifier: self.verifier_validation_validity_period,
            holder: self.holder_validation_validity_period,
        }
    }

    fn set_periods(&mut self, p: &ValidityPeriods) {
        self.issuer_grantor_validation_validity_period = p.issuer_grantor;
        self.verifier_grantor_validation_validity_period = p.verifier_grantor;
        self.issuer_validation_validity_period = p.issuer;
        self.verifier_validation_validity_period = p.verifier;
        self.holder_validation_validity_period = p.holder;
    }

    pub(crate) fn with_periods(mut self, p: &ValidityPeriods) -> Self {
        self.set_periods(p);
        self
    }
}

/// Validation validity periods in days, one per role. `0` means the
/// validation never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidityPeriods {
    pub issuer_grantor: u32,
    pub verifier_grantor: u32,
    pub issuer: u32,
    pub verifier: u32,
    pub holder: u32,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Params {
    /// Trust units locked per schema.
    #[prost(uint64, tag = "1")]
    pub credential_schema_trust_deposit: u64,
    #[prost(uint64, tag = "2")]
    pub credential_schema_schema_max_size: u64,
    #[prost(uint32, tag = "3")]
    pub credential_schema_issuer_grantor_validation_validity_period_max_days: u32,
    #[prost(uint32, tag = "4")]
    pub credential_schema_verifier_grantor_validation_validity_period_max_days: u32,
    #[prost(uint32, tag = "5")]
    pub credential_schema_issuer_validation_validity_period_max_days: u32,
    #[prost(uint32, tag = "6")]
    pub credential_schema_verifier_validation_validity_period_max_days: u32,
    #[prost(uint32, tag = "7")]
    pub credential_schema_holder_validation_validity_period_max_days: u32,
}

impl Params {
    pub fn default_params() -> Self {
        Self {
            credential_schema_trust_deposit: 10,
            credential_schema_schema_max_size: 8192,
            credential_schema_issuer_grantor_validation_validity_period_max_days: 3650,
            credential_schema_verifier_grantor_validation_validity_period_max_days: 3650,
            credential_schema_issuer_validation_validity_period_max_days: 3650,
            credential_schema_verifier_validation_validity_period_max_days: 3650,
            credential_schema_holder_validation_validity_period_max_days: 3650,
        }
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let positive = [
            ("trust deposit", self.credential_schema_trust_deposit),
            ("schema max size", self.credential_schema_schema_max_size),
            (
                "issuer grantor period",
                self.credential_schema_issuer_grantor_validation_validity_period_max_days as u64,
            ),
            (
                "verifier grantor period",
                self.credential_schema_verifier_grantor_validation_validity_period_max_days as u64,
            ),
            (
                "issuer period",
                self.credential_schema_issuer_validation_validity_period_max_days as u64,
            ),
            (
                "verifier period",
                self.credential_schema_verifier_validation_validity_period_max_days as u64,
            ),
            (
                "holder period",
                self.credential_schema_holder_validation_validity_period_max_days as u64,
            ),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(SchemaError::InvalidRequest(format!(
                    "{} must be positive",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Reject any period above its ceiling.
    pub fn check_periods(&self, p: &ValidityPeriods) -> Result<(), SchemaError> {
        let checks = [
            (
                "issuer grantor",
                p.issuer_grantor,
                self.credential_schema_issuer_grantor_validation_validity_period_max_days,
            ),
            (
                "verifier grantor",
                p.verifier_grantor,
                self.credential_schema_verifier_grantor_validation_validity_period_max_days,
            ),
            (
                "issuer",
                p.issuer,
                self.credential_schema_issuer_validation_validity_period_max_days,
            ),
            (
                "verifier",
                p.verifier,
                self.credential_schema_verifier_validation_validity_period_max_days,
            ),
            (
                "holder",
                p.holder,
                self.credential_schema_holder_validation_validity_period_max_days,
            ),
        ];
        for (role, days, max) in checks {
            if days > max {
                return Err(SchemaError::InvalidRequest(format!(
                    "{} validation validity period {} exceeds maximum {} days",
                    role, days, max
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    #[serde(default)]
    pub credential_schemas: Vec<CredentialSchema>,
}

impl Default for GenesisState {
    fn default() -> Self {
        Self {
            params: Params::default_params(),
            credential_schemas: Vec::new(),
        }
    }
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgCreateCredentialSchema {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub tr_id: u64,
    #[prost(string, tag = "3")]
    pub json_schema: String,
    #[prost(uint32, tag = "4")]
    pub issuer_grantor_validation_validity_period: u32,
    #[prost(uint32, tag = "5")]
    pub verifier_grantor_validation_validity_period: u32,
    #[prost(uint32, tag = "6")]
    pub issuer_validation_validity_period: u32,
    #[prost(uint32, tag = "7")]
    pub verifier_validation_validity_period: u32,
    #[prost(uint32, tag = "8")]
    pub holder_validation_validity_period: u32,
    #[prost(enumeration = "PermManagementMode", tag = "9")]
    pub issuer_perm_management_mode: i32,
    #[prost(enumeration = "PermManagementMode", tag = "10")]
    pub verifier_perm_management_mode: i32,
}

impl MsgCreateCredentialSchema {
    pub fn periods(&self) -> ValidityPeriods {
        ValidityPeriods {
            issuer_grantor: self.issuer_grantor_validation_validity_period,
            verifier_grantor: self.verifier_grantor_validation_validity_period,
            issuer: self.issuer_validation_validity_period,
            verifier: self.verifier_validation_validity_period,
            holder: self.holder_validation_validity_period,
        }
    }
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgUpdateCredentialSchema {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
    #[prost(uint32, tag = "3")]
    pub issuer_grantor_validation_validity_period: u32,
    #[prost(uint32, tag = "4")]
    pub verifier_grantor_validation_validity_period: u32,
    #[prost(uint32, tag = "5")]
    pub issuer_validation_validity_period: u32,
    #[prost(uint32, tag = "6")]
    pub verifier_validation_validity_period: u32,
    #[prost(uint32, tag = "7")]
    pub holder_validation_validity_period: u32,
}

impl MsgUpdateCredentialSchema {
    pub fn periods(&self) -> ValidityPeriods {
        ValidityPeriods {
            issuer_grantor: self.issuer_grantor_validation_validity_period,
            verifier_grantor: self.verifier_grantor_validation_validity_period,
            issuer: self.issuer_validation_validity_period,
            verifier: self.verifier_validation_validity_period,
            holder: self.holder_validation_validity_period,
        }
    }
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgArchiveCredentialSchema {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
    #[prost(bool, tag = "3")]
    pub archive: bool,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgUpdateParams {
    #[prost(string, tag = "1")]
    pub authority: String,
    #[prost(message, optional, tag = "2")]
    pub params: Option<Params>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_getters() {
        let cs = CredentialSchema {
            issuer_perm_management_mode: PermManagementMode::GrantorValidation as i32,
            verifier_perm_management_mode: 99,
            ..Default::default()
        };
        assert_eq!(
            cs.issuer_perm_management_mode(),
            PermManagementMode::GrantorValidation
        );
        assert_eq!(
            cs.verifier_perm_management_mode(),
            PermManagementMode::Unspecified
        );
    }

    #[test]
    fn test_period_ceilings() {
        let params = Params::default_params();
        let mut p = ValidityPeriods {
            issuer_grantor: 365,
            verifier_grantor: 365,
            issuer: 180,
            verifier: 180,
            holder: 180,
        };
        assert!(params.check_periods(&p).is_ok());
        p.holder = 3651;
        assert!(matches!(
            params.check_periods(&p),
            Err(SchemaError::InvalidRequest(_))
        ));
    }
}
