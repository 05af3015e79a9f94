//! Verana Permission.
//!
//! Permissions form a forest rooted at trust-registry permissions. Every
//! non-root permission is granted through a validation process run by its
//! parent (the validator permission), whose type is fixed by the schema's
//! permission management mode. Sessions record which permissions an agent
//! acted for, and the authorization queries walk the tree to decide
//! whether an issuer or verifier may act and whether fees are due.

pub mod authz;
pub mod compatibility;
pub mod error;
pub mod manager;
pub mod msgs;
pub mod session;
pub mod types;

pub use authz::{AuthorizationVerdict, IsAuthorizedIssuerRequest, IsAuthorizedVerifierRequest};
pub use compatibility::{required_validator_type, role_mode, validity_period_days};
pub use error::PermissionError;
pub use manager::{FindPermissionsWithDidRequest, PermissionManager, MODULE_NAME};
pub use msgs::*;
pub use session::SessionFees;
pub use types::{
    GenesisState, Params, Permission, PermissionSession, PermissionType, SessionAuthz, VpState,
};
