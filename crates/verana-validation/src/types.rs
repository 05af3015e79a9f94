use serde::{Deserialize, Serialize};
use verana_core::Timestamp;
use verana_permission::PermissionType;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration, Serialize, Deserialize,
)]
#[repr(i32)]
pub enum ValidationState {
    Unspecified = 0,
    Pending = 1,
    Validated = 2,
    Terminated = 3,
}

/// Part of the fees of one validation round routed into a validator's
/// trust deposit.
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
pub struct ValidatorDeposit {
    #[prost(uint64, tag = "1")]
    pub validator_perm_id: u64,
    #[prost(uint64, tag = "2")]
    pub amount: u64,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Validation {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(string, tag = "2")]
    pub applicant: String,
    #[prost(enumeration = "PermissionType", tag = "3")]
    pub validation_type: i32,
    #[prost(message, required, tag = "4")]
    pub created: Timestamp,
    #[prost(uint64, tag = "5")]
    pub validator_perm_id: u64,
    #[prost(enumeration = "ValidationState", tag = "6")]
    pub state: i32,
    #[prost(message, required, tag = "7")]
    pub last_state_change: Timestamp,
    /// Hex SHA-256 of the validation summary.
    #[prost(string, tag = "8")]
    #[serde(default)]
    pub summary_hash: String,
    #[prost(message, optional, tag = "9")]
    #[serde(default)]
    pub exp: Option<Timestamp>,
    /// Trust deposit locked by the applicant across all rounds.
    #[prost(uint64, tag = "10")]
    pub applicant_deposit: u64,
    #[prost(message, repeated, tag = "11")]
    #[serde(default)]
    pub validator_deposits: Vec<ValidatorDeposit>,
    #[prost(uint64, tag = "12")]
    pub current_fees: u64,
    #[prost(uint64, tag = "13")]
    pub current_deposit: u64,
    #[prost(string, tag = "14")]
    #[serde(default)]
    pub country: String,
    /// First time the validation reached VALIDATED.
    #[prost(message, optional, tag = "15")]
    #[serde(default)]
    pub validated: Option<Timestamp>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgCreateValidation {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(enumeration = "PermissionType", tag = "2")]
    pub validation_type: i32,
    #[prost(uint64, tag = "3")]
    pub validator_perm_id: u64,
    #[prost(string, tag = "4")]
    #[serde(default)]
    pub country: String,
}

/// Restart a validation, optionally with another validator permission.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgRenewValidation {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
    /// `0` keeps the current validator.
    #[prost(uint64, tag = "3")]
    #[serde(default)]
    pub validator_perm_id: u64,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgSetValidated {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
    #[prost(string, tag = "3")]
    #[serde(default)]
    pub summary_hash: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgCancelValidation {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgRequestValidationTermination {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenesisState {
    #[serde(default)]
    pub validations: Vec<Validation>,
}
