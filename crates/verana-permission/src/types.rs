use serde::{Deserialize, Serialize};
use verana_core::Timestamp;

use crate::error::PermissionError;

/// Role granted by a permission.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration, Serialize, Deserialize,
)]
#[repr(i32)]
pub enum PermissionType {
    Unspecified = 0,
    Issuer = 1,
    Verifier = 2,
    IssuerGrantor = 3,
    VerifierGrantor = 4,
    TrustRegistry = 5,
    Holder = 6,
}

impl PermissionType {
    /// Parse a wire value, rejecting unknown and unspecified types.
    pub fn from_wire(raw: i32) -> Result<Self, PermissionError> {
        match Self::try_from(raw) {
            Ok(Self::Unspecified) | Err(_) => Err(PermissionError::InvalidRequest(format!(
                "invalid permission type {}",
                raw
            ))),
            Ok(t) => Ok(t),
        }
    }
}

/// Validation process state of a permission.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration, Serialize, Deserialize,
)]
#[repr(i32)]
pub enum VpState {
    Unspecified = 0,
    Pending = 1,
    Validated = 2,
    TerminationRequested = 3,
    Terminated = 4,
}

/// A node of the permission tree.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Permission {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, tag = "2")]
    pub schema_id: u64,
    #[prost(enumeration = "PermissionType", tag = "3")]
    pub perm_type: i32,
    #[prost(string, tag = "4")]
    pub did: String,
    #[prost(string, tag = "5")]
    pub grantee: String,
    #[prost(message, required, tag = "6")]
    pub created: Timestamp,
    #[prost(string, tag = "7")]
    pub created_by: String,
    #[prost(message, optional, tag = "8")]
    pub extended: Option<Timestamp>,
    #[prost(string, tag = "9")]
    pub extended_by: String,
    #[prost(message, required, tag = "10")]
    pub modified: Timestamp,
    #[prost(message, optional, tag = "11")]
    pub effective_from: Option<Timestamp>,
    /// `None` means open-ended.
    #[prost(message, optional, tag = "12")]
    pub effective_until: Option<Timestamp>,
    #[prost(uint64, tag = "13")]
    pub validation_fees: u64,
    #[prost(uint64, tag = "14")]
    pub issuance_fees: u64,
    #[prost(uint64, tag = "15")]
    pub verification_fees: u64,
    /// Grantee trust deposit locked for this permission.
    #[prost(uint64, tag = "16")]
    pub deposit: u64,
    /// Empty matches any country.
    #[prost(string, tag = "17")]
    pub country: String,
    /// Parent permission; `0` for roots.
    #[prost(uint64, tag = "18")]
    pub validator_perm_id: u64,
    #[prost(enumeration = "VpState", tag = "19")]
    pub vp_state: i32,
    #[prost(message, optional, tag = "20")]
    pub vp_last_state_change: Option<Timestamp>,
    /// Fees escrowed for the running validation process.
    #[prost(uint64, tag = "21")]
    pub vp_current_fees: u64,
    /// Deposit locked for the running validation process.
    #[prost(uint64, tag = "22")]
    pub vp_current_deposit: u64,
    #[prost(string, tag = "23")]
    pub vp_summary_digest_sri: String,
    #[prost(message, optional, tag = "24")]
    pub vp_exp: Option<Timestamp>,
    #[prost(message, optional, tag = "25")]
    pub revoked: Option<Timestamp>,
    #[prost(string, tag = "26")]
    pub revoked_by: String,
    #[prost(message, optional, tag = "27")]
    pub terminated: Option<Timestamp>,
    #[prost(string, tag = "28")]
    pub terminated_by: String,
    #[prost(message, optional, tag = "29")]
    pub vp_term_requested: Option<Timestamp>,
    #[prost(uint64, tag = "30")]
    pub slashed_deposit: u64,
    #[prost(uint64, tag = "31")]
    pub repaid_deposit: u64,
}

impl Permission {
    /// Revoked or terminated; no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        self.revoked.is_some() || self.terminated.is_some()
    }

    /// Effective at `when`: started, not yet ended, and not terminal.
    pub fn is_effective_at(&self, when: Timestamp) -> bool {
        if self.is_terminal() {
            return false;
        }
        match self.effective_from {
            Some(from) if from <= when => self.effective_until.map_or(true, |until| when < until),
            _ => false,
        }
    }

    /// `[from, until)` window used for overlap detection. A permission that
    /// has not started yet occupies the time from its creation onward.
    pub fn window(&self) -> (Timestamp, Option<Timestamp>) {
        (
            self.effective_from.unwrap_or(self.created),
            self.effective_until,
        )
    }

    /// A permission without a country matches any request; otherwise the
    /// requested country must be the same, including an empty one.
    pub fn matches_country(&self, country: &str) -> bool {
        self.country.is_empty() || self.country == country
    }
}

/// Whether two `[from, until)` windows intersect (`None` is unbounded).
pub fn windows_overlap(
    a: (Timestamp, Option<Timestamp>),
    b: (Timestamp, Option<Timestamp>),
) -> bool {
    let a_starts_before_b_ends = b.1.map_or(true, |end| a.0 < end);
    let b_starts_before_a_ends = a.1.map_or(true, |end| b.0 < end);
    a_starts_before_b_ends && b_starts_before_a_ends
}

/// One authorization recorded in a session.
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
pub struct SessionAuthz {
    #[prost(uint64, tag = "1")]
    pub executor_perm_id: u64,
    #[prost(uint64, tag = "2")]
    pub beneficiary_perm_id: u64,
    #[prost(uint64, tag = "3")]
    pub wallet_agent_perm_id: u64,
}

/// A permission session keyed by UUID.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct PermissionSession {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub controller: String,
    #[prost(uint64, tag = "3")]
    pub agent_perm_id: u64,
    #[prost(message, required, tag = "4")]
    pub created: Timestamp,
    #[prost(message, required, tag = "5")]
    pub modified: Timestamp,
    #[prost(message, repeated, tag = "6")]
    pub authz: Vec<SessionAuthz>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Params {
    /// Days a grantee waits before confirming its own termination request.
    #[prost(uint32, tag = "1")]
    pub validation_term_requested_timeout_days: u32,
}

impl Params {
    pub fn default_params() -> Self {
        Self {
            validation_term_requested_timeout_days: 7,
        }
    }

    pub fn validate(&self) -> Result<(), PermissionError> {
        if self.validation_term_requested_timeout_days == 0 {
            return Err(PermissionError::InvalidRequest(
                "validation termination timeout must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub permission_sessions: Vec<PermissionSession>,
}

impl Default for GenesisState {
    fn default() -> Self {
        Self {
            params: Params::default_params(),
            permissions: Vec::new(),
            permission_sessions: Vec::new(),
        }
    }
}
