use chrono::{DateTime, Months, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Name of the governance module; its account is the parameter authority.
pub const GOV_MODULE: &str = "gov";

/// Address prefix used for every account on the chain.
pub const ADDRESS_PREFIX: &str = "verana1";

const SECONDS_PER_DAY: i64 = 86_400;

static DID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^did:[a-z0-9]+(:[A-Za-z0-9._%-]+)+$").expect("static DID pattern compiles")
});

/// Block time with second/nanosecond precision.
///
/// Field tags match `google.protobuf.Timestamp`, so an encoded entity is
/// byte-compatible with the descriptors that embed the well-known type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Message, Serialize, Deserialize)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

impl Timestamp {
    /// Create a timestamp from whole seconds since the UNIX epoch.
    pub fn from_unix(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    /// Convert from a chrono UTC datetime.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos() as i32,
        }
    }

    /// Convert to a chrono UTC datetime, if representable.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos.max(0) as u32)
    }

    /// Add a whole number of days.
    pub fn checked_add_days(&self, days: u64) -> Result<Self, CoreError> {
        let delta = i64::try_from(days)
            .ok()
            .and_then(|d| d.checked_mul(SECONDS_PER_DAY))
            .ok_or_else(|| CoreError::Overflow(format!("{} days", days)))?;
        let seconds = self
            .seconds
            .checked_add(delta)
            .ok_or_else(|| CoreError::Overflow(format!("timestamp + {} days", days)))?;
        Ok(Self {
            seconds,
            nanos: self.nanos,
        })
    }

    /// Add calendar years (leap-day aware).
    pub fn checked_add_years(&self, years: u32) -> Result<Self, CoreError> {
        let dt = self
            .to_datetime()
            .ok_or_else(|| CoreError::Overflow(format!("timestamp {}", self.seconds)))?;
        let shifted = dt
            .checked_add_months(Months::new(years.saturating_mul(12)))
            .ok_or_else(|| CoreError::Overflow(format!("timestamp + {} years", years)))?;
        Ok(Self::from_datetime(shifted))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
            None => write!(f, "{}s", self.seconds),
        }
    }
}

/// Validate DID syntax: `did:<method>:<method-specific-id>`.
pub fn validate_did(did: &str) -> Result<(), CoreError> {
    if DID_PATTERN.is_match(did) {
        Ok(())
    } else {
        Err(CoreError::InvalidDid(format!(
            "DID must have format 'did:<method>:<identifier>', got: {}",
            did
        )))
    }
}

/// Validate a lowercase ISO 639-1 two-letter language tag.
pub fn validate_language(language: &str) -> Result<(), CoreError> {
    if language.len() == 2 && language.bytes().all(|b| b.is_ascii_lowercase()) {
        Ok(())
    } else {
        Err(CoreError::InvalidRequest(format!(
            "language must be a two-letter lowercase ISO 639-1 code, got: {}",
            language
        )))
    }
}

/// Validate an ISO 3166-1 alpha-2 country code.
pub fn validate_country(country: &str) -> Result<(), CoreError> {
    if country.len() == 2 && country.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(CoreError::InvalidRequest(format!(
            "country must be an ISO 3166-1 alpha-2 code, got: {}",
            country
        )))
    }
}

/// Validate an account address.
pub fn validate_address(address: &str) -> Result<(), CoreError> {
    let body = address.strip_prefix(ADDRESS_PREFIX).unwrap_or("");
    if !body.is_empty() && body.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(CoreError::InvalidRequest(format!(
            "address must start with '{}', got: {}",
            ADDRESS_PREFIX, address
        )))
    }
}

/// Deterministic account address of a module (escrow, burn source, authority).
pub fn module_address(module: &str) -> String {
    let digest = blake3::hash(module.as_bytes());
    format!("{}{}", ADDRESS_PREFIX, hex::encode(&digest.as_bytes()[..20]))
}

/// Address allowed to update module parameters and slash deposits.
pub fn gov_authority() -> String {
    module_address(GOV_MODULE)
}

/// Fail with `InvalidSigner` unless `authority` is the governance account.
pub fn ensure_gov_authority(authority: &str) -> Result<(), CoreError> {
    let expected = gov_authority();
    if authority == expected {
        Ok(())
    } else {
        Err(CoreError::InvalidSigner(format!(
            "expected governance authority {}, got {}",
            expected, authority
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_roundtrip_datetime() {
        let ts = Timestamp::from_unix(1_704_067_200);
        let dt = ts.to_datetime().unwrap();
        assert_eq!(Timestamp::from_datetime(dt), ts);
        assert_eq!(format!("{}", ts), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_timestamp_add_days() {
        let ts = Timestamp::from_unix(0);
        assert_eq!(ts.checked_add_days(2).unwrap().seconds, 2 * 86_400);
        assert!(ts.checked_add_days(u64::MAX).is_err());
    }

    #[test]
    fn test_timestamp_add_years_leap() {
        // 2024-02-29 + 1 year clamps to 2025-02-28.
        let ts = Timestamp::from_unix(1_709_164_800);
        let next = ts.checked_add_years(1).unwrap();
        assert_eq!(format!("{}", next), "2025-02-28T00:00:00Z");
    }

    #[test]
    fn test_timestamp_ordering() {
        let a = Timestamp::from_unix(10);
        let b = Timestamp {
            seconds: 10,
            nanos: 5,
        };
        assert!(a < b);
    }

    #[test]
    fn test_validate_did() {
        assert!(validate_did("did:example:1").is_ok());
        assert!(validate_did("did:web:example.com").is_ok());
        assert!(validate_did("did:key:z6Mk:abc").is_ok());
        assert!(validate_did("did:example").is_err());
        assert!(validate_did("example:1").is_err());
        assert!(validate_did("did:Ex:1").is_err());
    }

    #[test]
    fn test_gov_authority() {
        assert!(ensure_gov_authority(&gov_authority()).is_ok());
        assert!(ensure_gov_authority("verana1alice").is_err());
        assert_ne!(gov_authority(), module_address("trustdeposit"));
    }

    #[test]
    fn test_validate_language() {
        assert!(validate_language("en").is_ok());
        assert!(validate_language("EN").is_err());
        assert!(validate_language("eng").is_err());
        assert!(validate_language("").is_err());
    }

    #[test]
    fn test_validate_country() {
        assert!(validate_country("US").is_ok());
        assert!(validate_country("us").is_err());
        assert!(validate_country("USA").is_err());
    }

    #[test]
    fn test_module_address_is_stable() {
        let a = module_address("permission");
        assert_eq!(a, module_address("permission"));
        assert_ne!(a, module_address("trustdeposit"));
        assert!(validate_address(&a).is_ok());
        assert_eq!(a.len(), ADDRESS_PREFIX.len() + 40);
    }

    #[test]
    fn test_validate_address() {
        assert!(validate_address("verana1alice").is_ok());
        assert!(validate_address("cosmos1alice").is_err());
        assert!(validate_address("verana1").is_err());
    }
}
