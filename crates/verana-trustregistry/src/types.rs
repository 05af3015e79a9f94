use serde::{Deserialize, Serialize};
use verana_core::Timestamp;

use crate::error::TrustRegistryError;

/// A DID-rooted trust registry.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct TrustRegistry {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(string, tag = "2")]
    pub did: String,
    #[prost(string, tag = "3")]
    pub controller: String,
    #[prost(message, required, tag = "4")]
    pub created: Timestamp,
    #[prost(message, required, tag = "5")]
    pub modified: Timestamp,
    #[prost(message, optional, tag = "6")]
    pub archived: Option<Timestamp>,
    /// Trust deposit locked at creation.
    #[prost(uint64, tag = "7")]
    pub deposit: u64,
    #[prost(string, tag = "8")]
    pub aka: String,
    #[prost(int32, tag = "9")]
    pub active_version: i32,
    /// Primary language; every activated version has a document in it.
    #[prost(string, tag = "10")]
    pub language: String,
}

/// One version of a registry's governance framework.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct GovernanceFrameworkVersion {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, tag = "2")]
    pub tr_id: u64,
    #[prost(message, required, tag = "3")]
    pub created: Timestamp,
    #[prost(int32, tag = "4")]
    pub version: i32,
    /// Set when the version becomes the active one.
    #[prost(message, optional, tag = "5")]
    pub active_since: Option<Timestamp>,
}

/// A governance framework document in one language.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct GovernanceFrameworkDocument {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, tag = "2")]
    pub gfv_id: u64,
    #[prost(message, required, tag = "3")]
    pub created: Timestamp,
    #[prost(string, tag = "4")]
    pub language: String,
    #[prost(string, tag = "5")]
    pub url: String,
    #[prost(string, tag = "6")]
    pub hash: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Params {
    /// Price of one trust unit in base coins.
    #[prost(uint64, tag = "1")]
    pub trust_unit_price: u64,
    /// Trust units locked when a registry is created.
    #[prost(uint64, tag = "2")]
    pub trust_registry_trust_deposit: u64,
}

impl Params {
    pub fn default_params() -> Self {
        Self {
            trust_unit_price: 1_000_000,
            trust_registry_trust_deposit: 10,
        }
    }

    pub fn validate(&self) -> Result<(), TrustRegistryError> {
        if self.trust_unit_price == 0 {
            return Err(TrustRegistryError::InvalidRequest(
                "trust unit price must be positive".into(),
            ));
        }
        if self.trust_registry_trust_deposit == 0 {
            return Err(TrustRegistryError::InvalidRequest(
                "trust registry trust deposit must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// A version and its (possibly language-filtered) documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionView {
    pub version: GovernanceFrameworkVersion,
    pub documents: Vec<GovernanceFrameworkDocument>,
}

/// Query result: a registry with its governance framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustRegistryView {
    pub trust_registry: TrustRegistry,
    pub versions: Vec<VersionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    #[serde(default)]
    pub trust_registries: Vec<TrustRegistry>,
    #[serde(default)]
    pub governance_framework_versions: Vec<GovernanceFrameworkVersion>,
    #[serde(default)]
    pub governance_framework_documents: Vec<GovernanceFrameworkDocument>,
}

impl Default for GenesisState {
    fn default() -> Self {
        Self {
            params: Params::default_params(),
            trust_registries: Vec::new(),
            governance_framework_versions: Vec::new(),
            governance_framework_documents: Vec::new(),
        }
    }
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgCreateTrustRegistry {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(string, tag = "2")]
    pub did: String,
    #[prost(string, tag = "3")]
    #[serde(default)]
    pub aka: String,
    #[prost(string, tag = "4")]
    pub language: String,
    #[prost(string, tag = "5")]
    pub doc_url: String,
    #[prost(string, tag = "6")]
    pub doc_hash: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgAddGovernanceFrameworkDocument {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
    #[prost(string, tag = "3")]
    pub doc_language: String,
    #[prost(string, tag = "4")]
    pub doc_url: String,
    #[prost(string, tag = "5")]
    pub doc_hash: String,
    #[prost(int32, tag = "6")]
    pub version: i32,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgIncreaseActiveGovernanceFrameworkVersion {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgUpdateTrustRegistry {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub id: u64,
    #[prost(string, tag = "3")]
    pub did: String,
    #[prost(string, tag = "4")]
    #[serde(default)]
    pub aka: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgArchiveTrustRegistry {
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
