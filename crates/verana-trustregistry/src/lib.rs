//! Verana Trust Registry.
//!
//! A trust registry is identified by a DID and owns a versioned governance
//! framework: each version holds one document per language, and the
//! controller activates versions one at a time in ascending order.

pub mod error;
pub mod registry;
pub mod types;

pub use error::TrustRegistryError;
pub use registry::{ListTrustRegistriesRequest, TrustRegistryManager, MODULE_NAME};
pub use types::{
    GenesisState, GovernanceFrameworkDocument, GovernanceFrameworkVersion,
    MsgAddGovernanceFrameworkDocument, MsgArchiveTrustRegistry, MsgCreateTrustRegistry,
    MsgIncreaseActiveGovernanceFrameworkVersion, MsgUpdateParams, MsgUpdateTrustRegistry, Params,
    TrustRegistry, TrustRegistryView, VersionView,
};
