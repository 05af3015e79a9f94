//! Transaction messages of the permission module.

use serde::{Deserialize, Serialize};
use verana_core::Timestamp;

use crate::types::{Params, PermissionType};

/// Apply for a permission through the validator permission `validator_perm_id`.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgStartPermissionVp {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(enumeration = "PermissionType", tag = "2")]
    pub perm_type: i32,
    #[prost(uint64, tag = "3")]
    pub validator_perm_id: u64,
    #[prost(string, tag = "4")]
    #[serde(default)]
    pub country: String,
    #[prost(string, tag = "5")]
    #[serde(default)]
    pub did: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgRenewPermissionVp {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
}

/// Validator decision closing a pending validation process.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgSetPermissionVpToValidated {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
    #[prost(message, optional, tag = "3")]
    #[serde(default)]
    pub effective_until: Option<Timestamp>,
    #[prost(uint64, tag = "4")]
    #[serde(default)]
    pub validation_fees: u64,
    #[prost(uint64, tag = "5")]
    #[serde(default)]
    pub issuance_fees: u64,
    #[prost(uint64, tag = "6")]
    #[serde(default)]
    pub verification_fees: u64,
    #[prost(string, tag = "7")]
    #[serde(default)]
    pub country: String,
    #[prost(string, tag = "8")]
    #[serde(default)]
    pub vp_summary_digest_sri: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgRequestPermissionVpTermination {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgConfirmPermissionVpTermination {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgCancelPermissionVpLastRequest {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
}

/// Create the trust-registry root permission of a schema.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgCreateRootPermission {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub schema_id: u64,
    #[prost(string, tag = "3")]
    pub did: String,
    #[prost(string, tag = "4")]
    #[serde(default)]
    pub country: String,
    #[prost(message, optional, tag = "5")]
    #[serde(default)]
    pub effective_from: Option<Timestamp>,
    #[prost(message, optional, tag = "6")]
    #[serde(default)]
    pub effective_until: Option<Timestamp>,
    #[prost(uint64, tag = "7")]
    #[serde(default)]
    pub validation_fees: u64,
    #[prost(uint64, tag = "8")]
    #[serde(default)]
    pub issuance_fees: u64,
    #[prost(uint64, tag = "9")]
    #[serde(default)]
    pub verification_fees: u64,
}

/// Self-service issuer or verifier permission on an OPEN schema.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgCreatePermission {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(enumeration = "PermissionType", tag = "2")]
    pub perm_type: i32,
    #[prost(uint64, tag = "3")]
    pub schema_id: u64,
    #[prost(string, tag = "4")]
    pub did: String,
    #[prost(string, tag = "5")]
    #[serde(default)]
    pub country: String,
    #[prost(message, optional, tag = "6")]
    #[serde(default)]
    pub effective_from: Option<Timestamp>,
    #[prost(message, optional, tag = "7")]
    #[serde(default)]
    pub effective_until: Option<Timestamp>,
    #[prost(uint64, tag = "8")]
    #[serde(default)]
    pub verification_fees: u64,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgExtendPermission {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
    #[prost(message, required, tag = "3")]
    pub effective_until: Timestamp,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgRevokePermission {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgSlashPermissionTrustDeposit {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
    #[prost(uint64, tag = "3")]
    pub amount: u64,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgRepayPermissionSlashedTrustDeposit {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
}

/// Create a session or append one authorization to it.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgCreateOrUpdatePermissionSession {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(string, tag = "2")]
    pub id: String,
    #[prost(uint64, tag = "3")]
    pub agent_perm_id: u64,
    #[prost(uint64, tag = "4")]
    pub executor_perm_id: u64,
    #[prost(uint64, tag = "5")]
    #[serde(default)]
    pub beneficiary_perm_id: u64,
    #[prost(uint64, tag = "6")]
    #[serde(default)]
    pub wallet_agent_perm_id: u64,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgUpdateParams {
    #[prost(string, tag = "1")]
    pub authority: String,
    #[prost(message, optional, tag = "2")]
    pub params: Option<Params>,
}
