//! Verana Trust Deposit: a pooled, share-based deposit per account.
//!
//! Every on-chain commitment (registries, schemas, permissions, DIDs) is
//! backed by coins locked here. Locked coins become `claimable` when the
//! commitment is released; claimable coins can be reclaimed minus a burn,
//! and the pool pays yield when governance raises the share value.

pub mod error;
pub mod ledger;
pub mod types;

pub use error::TrustDepositError;
pub use ledger::{ReclaimOutcome, TrustDepositLedger, MODULE_NAME};
pub use types::{
    GenesisState, MsgReclaimTrustDeposit, MsgReclaimTrustDepositYield, MsgRepaySlashedTrustDeposit,
    MsgSlashTrustDeposit, MsgUpdateParams, Params, TrustDeposit, TrustDepositRates,
};
