//! Permission-type compatibility matrix.
//!
//! The type of permission allowed to validate a new permission depends on
//! the schema's management mode for the role (issuer side or verifier side).

use verana_credentialschema::{CredentialSchema, PermManagementMode};

use crate::types::PermissionType;

/// Management mode governing `perm_type` under `schema`.
pub fn role_mode(schema: &CredentialSchema, perm_type: PermissionType) -> PermManagementMode {
    match perm_type {
        PermissionType::Verifier | PermissionType::VerifierGrantor => {
            schema.verifier_perm_management_mode()
        }
        _ => schema.issuer_perm_management_mode(),
    }
}

/// Validator type required to grant `perm_type` under `mode`, or `None`
/// when the combination cannot be obtained through a validation process.
pub fn required_validator_type(
    perm_type: PermissionType,
    mode: PermManagementMode,
) -> Option<PermissionType> {
    use PermManagementMode::{GrantorValidation, TrustRegistryValidation};
    match (perm_type, mode) {
        (PermissionType::Issuer, GrantorValidation) => Some(PermissionType::IssuerGrantor),
        (PermissionType::Issuer, TrustRegistryValidation) => Some(PermissionType::TrustRegistry),
        (PermissionType::IssuerGrantor, GrantorValidation) => Some(PermissionType::TrustRegistry),
        (PermissionType::Verifier, GrantorValidation) => Some(PermissionType::VerifierGrantor),
        (PermissionType::Verifier, TrustRegistryValidation) => Some(PermissionType::TrustRegistry),
        (PermissionType::VerifierGrantor, GrantorValidation) => Some(PermissionType::TrustRegistry),
        (PermissionType::Holder, GrantorValidation | TrustRegistryValidation) => {
            Some(PermissionType::Issuer)
        }
        _ => None,
    }
}

/// Validation validity period of `perm_type` under `schema`, in days.
/// `0` means the validation does not expire.
pub fn validity_period_days(schema: &CredentialSchema, perm_type: PermissionType) -> u32 {
    match perm_type {
        PermissionType::IssuerGrantor => schema.issuer_grantor_validation_validity_period,
        PermissionType::VerifierGrantor => schema.verifier_grantor_validation_validity_period,
        PermissionType::Issuer => schema.issuer_validation_validity_period,
        PermissionType::Verifier => schema.verifier_validation_validity_period,
        PermissionType::Holder => schema.holder_validation_validity_period,
        PermissionType::TrustRegistry | PermissionType::Unspecified => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PermManagementMode::*;

    #[test]
    fn test_issuer_side() {
        assert_eq!(
            required_validator_type(PermissionType::Issuer, GrantorValidation),
            Some(PermissionType::IssuerGrantor)
        );
        assert_eq!(
            required_validator_type(PermissionType::Issuer, TrustRegistryValidation),
            Some(PermissionType::TrustRegistry)
        );
        assert_eq!(required_validator_type(PermissionType::Issuer, Open), None);
        assert_eq!(required_validator_type(PermissionType::Issuer, Ecosystem), None);
        assert_eq!(
            required_validator_type(PermissionType::IssuerGrantor, GrantorValidation),
            Some(PermissionType::TrustRegistry)
        );
        assert_eq!(
            required_validator_type(PermissionType::IssuerGrantor, TrustRegistryValidation),
            None
        );
    }

    #[test]
    fn test_verifier_side() {
        assert_eq!(
            required_validator_type(PermissionType::Verifier, GrantorValidation),
            Some(PermissionType::VerifierGrantor)
        );
        assert_eq!(
            required_validator_type(PermissionType::VerifierGrantor, GrantorValidation),
            Some(PermissionType::TrustRegistry)
        );
        assert_eq!(required_validator_type(PermissionType::Verifier, Open), None);
    }

    #[test]
    fn test_holder_and_root() {
        assert_eq!(
            required_validator_type(PermissionType::Holder, TrustRegistryValidation),
            Some(PermissionType::Issuer)
        );
        assert_eq!(required_validator_type(PermissionType::Holder, Open), None);
        assert_eq!(
            required_validator_type(PermissionType::TrustRegistry, GrantorValidation),
            None
        );
    }

    #[test]
    fn test_role_mode_and_period() {
        let schema = CredentialSchema {
            issuer_perm_management_mode: GrantorValidation as i32,
            verifier_perm_management_mode: Open as i32,
            issuer_grantor_validation_validity_period: 365,
            holder_validation_validity_period: 30,
            ..Default::default()
        };
        assert_eq!(role_mode(&schema, PermissionType::Holder), GrantorValidation);
        assert_eq!(role_mode(&schema, PermissionType::VerifierGrantor), Open);
        assert_eq!(validity_period_days(&schema, PermissionType::IssuerGrantor), 365);
        assert_eq!(validity_period_days(&schema, PermissionType::Holder), 30);
        assert_eq!(validity_period_days(&schema, PermissionType::TrustRegistry), 0);
    }
}
