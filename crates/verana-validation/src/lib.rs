//! Verana Validation.
//!
//! A validation records an applicant's request to be validated by the
//! holder of a validator permission for a given role on a credential
//! schema. Fees are escrowed while the request is pending and paid to the
//! validator when it is accepted.

pub mod error;
pub mod types;
pub mod workflow;

pub use error::ValidationError;
pub use types::{
    GenesisState, MsgCancelValidation, MsgCreateValidation, MsgRenewValidation,
    MsgRequestValidationTermination, MsgSetValidated, Validation, ValidationState,
    ValidatorDeposit,
};
pub use workflow::{ListValidationsRequest, ValidationManager, MODULE_NAME};
