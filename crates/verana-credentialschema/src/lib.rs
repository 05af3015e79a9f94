//! Verana Credential Schema.
//!
//! Credential schemas are JSON-Schemas owned by a trust registry. Each
//! schema carries the validity periods of every role and, for issuers and
//! verifiers, how permissions are managed.

pub mod error;
pub mod metaschema;
pub mod schema;
pub mod types;

pub use error::SchemaError;
pub use metaschema::validate_json_schema;
pub use schema::{ListCredentialSchemasRequest, SchemaRegistry, MODULE_NAME};
pub use types::{
    CredentialSchema, GenesisState, MsgArchiveCredentialSchema, MsgCreateCredentialSchema,
    MsgUpdateCredentialSchema, MsgUpdateParams, Params, PermManagementMode, ValidityPeriods,
};
