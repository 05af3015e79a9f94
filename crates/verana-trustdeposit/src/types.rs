use serde::{Deserialize, Serialize};
use verana_core::{Dec, Timestamp};

use crate::error::TrustDepositError;

/// Per-account trust deposit record.
///
/// `claimable ≤ amount` always holds; `amount ≈ share × share_value`
/// while the share value is unchanged.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct TrustDeposit {
    #[prost(string, tag = "1")]
    pub account: String,
    #[prost(uint64, tag = "2")]
    pub share: u64,
    #[prost(uint64, tag = "3")]
    pub amount: u64,
    #[prost(uint64, tag = "4")]
    pub claimable: u64,
    /// Slashed coins not yet repaid.
    #[prost(uint64, tag = "5")]
    pub slashed_deposit: u64,
    /// Cumulative repayments.
    #[prost(uint64, tag = "6")]
    pub repaid_deposit: u64,
    #[prost(message, optional, tag = "7")]
    pub last_slashed: Option<Timestamp>,
    #[prost(message, optional, tag = "8")]
    pub last_repaid: Option<Timestamp>,
    #[prost(uint32, tag = "9")]
    pub slash_count: u32,
    #[prost(string, tag = "10")]
    pub last_repaid_by: String,
}

impl TrustDeposit {
    /// An empty record for `account`.
    pub fn empty(account: &str) -> Self {
        Self {
            account: account.to_string(),
            ..Default::default()
        }
    }

    /// Locked (non-claimable) part of the deposit.
    pub fn locked(&self) -> u64 {
        self.amount - self.claimable.min(self.amount)
    }
}

/// Trust deposit module parameters. Decimal values are stored as strings.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct Params {
    #[prost(string, tag = "1")]
    pub trust_deposit_reclaim_burn_rate: String,
    #[prost(string, tag = "2")]
    pub trust_deposit_share_value: String,
    #[prost(string, tag = "3")]
    pub trust_deposit_rate: String,
    #[prost(string, tag = "4")]
    pub wallet_user_agent_reward_rate: String,
    #[prost(string, tag = "5")]
    pub user_agent_reward_rate: String,
}

impl Params {
    /// Genesis defaults.
    pub fn default_params() -> Self {
        Self {
            trust_deposit_reclaim_burn_rate: "0.6".into(),
            trust_deposit_share_value: "1".into(),
            trust_deposit_rate: "0.2".into(),
            wallet_user_agent_reward_rate: "0.2".into(),
            user_agent_reward_rate: "0.2".into(),
        }
    }

    /// Parse into typed rates, checking bounds.
    pub fn rates(&self) -> Result<TrustDepositRates, TrustDepositError> {
        let rates = TrustDepositRates {
            reclaim_burn_rate: self.trust_deposit_reclaim_burn_rate.parse()?,
            share_value: self.trust_deposit_share_value.parse()?,
            trust_deposit_rate: self.trust_deposit_rate.parse()?,
            wallet_user_agent_reward_rate: self.wallet_user_agent_reward_rate.parse()?,
            user_agent_reward_rate: self.user_agent_reward_rate.parse()?,
        };
        if rates.share_value.is_zero() {
            return Err(TrustDepositError::InvalidRequest(
                "share value must be positive".into(),
            ));
        }
        for (name, rate) in [
            ("reclaim burn rate", rates.reclaim_burn_rate),
            ("trust deposit rate", rates.trust_deposit_rate),
            ("wallet user agent reward rate", rates.wallet_user_agent_reward_rate),
            ("user agent reward rate", rates.user_agent_reward_rate),
        ] {
            if rate > Dec::ONE {
                return Err(TrustDepositError::InvalidRequest(format!(
                    "{} must not exceed 1, got {}",
                    name, rate
                )));
            }
        }
        Ok(rates)
    }

    pub fn validate(&self) -> Result<(), TrustDepositError> {
        self.rates().map(|_| ())
    }
}

/// Typed view of the decimal parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustDepositRates {
    pub trust_deposit_rate: Dec,
    pub user_agent_reward_rate: Dec,
    pub wallet_user_agent_reward_rate: Dec,
    pub reclaim_burn_rate: Dec,
    pub share_value: Dec,
}

/// Genesis section of the module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    #[serde(default)]
    pub trust_deposits: Vec<TrustDeposit>,
}

impl Default for GenesisState {
    fn default() -> Self {
        Self {
            params: Params::default_params(),
            trust_deposits: Vec::new(),
        }
    }
}

/// Reclaim the share-value appreciation of the sender's deposit.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgReclaimTrustDepositYield {
    #[prost(string, tag = "1")]
    pub creator: String,
}

/// Reclaim `claimed` coins of claimable principal (minus the burn).
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgReclaimTrustDeposit {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(uint64, tag = "2")]
    pub claimed: u64,
}

/// Top up the slashed deposit of `account`.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgRepaySlashedTrustDeposit {
    #[prost(string, tag = "1")]
    pub creator: String,
    #[prost(string, tag = "2")]
    pub account: String,
    #[prost(uint64, tag = "3")]
    pub amount: u64,
}

/// Governance slash of an account's deposit.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgSlashTrustDeposit {
    #[prost(string, tag = "1")]
    pub authority: String,
    #[prost(string, tag = "2")]
    pub account: String,
    #[prost(uint64, tag = "3")]
    pub amount: u64,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct MsgUpdateParams {
    #[prost(string, tag = "1")]
    pub authority: String,
    #[prost(message, optional, tag = "2")]
    pub params: Option<Params>,
}
