//! Fixed-point decimal with 18 fractional digits.
//!
//! Governance parameters such as the share value and the burn and reward
//! rates are decimals. Arithmetic stays in 10^-18 units and truncates
//! toward zero only when converting to whole base coins.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

const PRECISION: u32 = 18;
const SCALE: u128 = 1_000_000_000_000_000_000;

/// Non-negative decimal stored as an integer count of 10^-18 units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Dec(u128);

impl Dec {
    /// Zero.
    pub const ZERO: Dec = Dec(0);
    /// One.
    pub const ONE: Dec = Dec(SCALE);

    /// Build from raw 10^-18 units.
    pub const fn from_atomics(units: u128) -> Self {
        Self(units)
    }

    /// Build from a whole percentage (`60` → `0.6`).
    pub const fn from_percent(percent: u64) -> Self {
        Self(percent as u128 * (SCALE / 100))
    }

    /// Build from an integer.
    pub const fn from_int(value: u64) -> Self {
        Self(value as u128 * SCALE)
    }

    /// Raw 10^-18 units.
    pub fn atomics(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `amount × self`, truncated to a whole number.
    pub fn mul_truncate(&self, amount: u64) -> Result<u64, CoreError> {
        let product = (amount as u128)
            .checked_mul(self.0)
            .ok_or_else(|| CoreError::Overflow(format!("{} × {}", amount, self)))?;
        u64::try_from(product / SCALE)
            .map_err(|_| CoreError::Overflow(format!("{} × {}", amount, self)))
    }

    /// `amount ÷ self`, truncated to a whole number.
    pub fn quo_truncate(&self, amount: u64) -> Result<u64, CoreError> {
        if self.0 == 0 {
            return Err(CoreError::Overflow(format!("{} ÷ 0", amount)));
        }
        let scaled = (amount as u128)
            .checked_mul(SCALE)
            .ok_or_else(|| CoreError::Overflow(format!("{} ÷ {}", amount, self)))?;
        u64::try_from(scaled / self.0)
            .map_err(|_| CoreError::Overflow(format!("{} ÷ {}", amount, self)))
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int = self.0 / SCALE;
        let frac = self.0 % SCALE;
        if frac == 0 {
            return write!(f, "{}", int);
        }
        let digits = format!("{:0width$}", frac, width = PRECISION as usize);
        write!(f, "{}.{}", int, digits.trim_end_matches('0'))
    }
}

impl FromStr for Dec {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidDecimal(s.to_string());
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
            || frac_part.len() > PRECISION as usize
        {
            return Err(invalid());
        }
        let int: u128 = int_part.parse().map_err(|_| invalid())?;
        let frac: u128 = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac_part, width = PRECISION as usize);
            padded.parse().map_err(|_| invalid())?
        };
        int.checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac))
            .map(Dec)
            .ok_or_else(invalid)
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
