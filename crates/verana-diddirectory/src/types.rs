use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use verana_core::Timestamp;

use crate::error::DidDirectoryError;

/// Longest lease accepted by add and renew.
pub const MAX_YEARS: u32 = 31;

static DIRECTORY_DID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^did:[a-zA-Z0-9]+:[a-zA-Z0-9._-]+$").expect("static DID pattern compiles")
});

/// Check the restricted DID syntax accepted by the directory.
pub fn validate_directory_did(did: &str) -> Result<(), DidDirectoryError> {
    if DIRECTORY_DID.is_match(did) {
        Ok(())
    } else {
        Err(DidDirectoryError::InvalidRequest(format!(
            "invalid DID: {}",
            did
        )))
    }
}

/// Lease length in years: `0` means one year.
pub fn normalize_years(years: u32) -> Result<u32, DidDirectoryError> {
    match years {
        0 => Ok(1),
        n if n <= MAX_YEARS => Ok(n),
        n => Err(DidDirectoryError::InvalidRequest(format!(
            "years must be between 1 and {}, got {}",
            MAX_YEARS, n
        ))),
    }
}

/// A leased DID.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct DidDirectory {
    #[prost(string, tag = "1")]
    pub did: String,
    #[prost(string, tag = "2")]
    pub controller: String,
    #[prost(message, required, tag = "3")]
    pub created: Timestamp,
    #[prost(message, required, tag = "4")]
    pub modified: Timestamp,
    #[prost(message, required, tag = "5")]
    pub exp: Timestamp,
    /// Trust deposit locked by the controller for the lease.
    #[prost(int64, tag = "6")]
    pub deposit: i64,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Params {
    /// Trust units locked per leased year.
    #[prost(uint64, tag = "1")]
    pub did_directory_trust_deposit: u64,
    /// Days after expiration during which only the controller may remove.
    #[prost(uint32, tag = "2")]
    pub did_directory_grace_period: u32,
}

impl Params {
    pub fn default_params() -> Self {
        Self {
            did_directory_trust_deposit: 5,
            did_directory_grace_period: 30,
        }
    }

    pub fn validate(&self) -> Result<(), DidDirectoryError> {
        if self.did_directory_trust_deposit == 0 || self.did_directory_grace_period == 0 {
            return Err(DidDirectoryError::InvalidRequest(
                "DID directory params must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgAddDid {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(string, tag = "2")]
    pub did: String,
    #[prost(uint32, tag = "3")]
    #[serde(default)]
    pub years: u32,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgRenewDid {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(string, tag = "2")]
    pub did: String,
    #[prost(uint32, tag = "3")]
    #[serde(default)]
    pub years: u32,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgRemoveDid {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(string, tag = "2")]
    pub did: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgTouchDid {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(string, tag = "2")]
    pub did: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgUpdateParams {
    #[prost(string, tag = "1")]
    pub authority: String,
    #[prost(message, optional, tag = "2")]
    pub params: Option<Params>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    #[serde(default)]
    pub dids: Vec<DidDirectory>,
}

impl Default for GenesisState {
    fn default() -> Self {
        Self {
            params: Params::default_params(),
            dids: Vec::new(),
        }
    }
}
