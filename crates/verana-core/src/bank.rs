//! The `Bank` capability.
//!
//! Coin balances are owned by an external collaborator; modules only move
//! coins through this trait. [`StoreBank`] keeps balances in the same
//! transactional store as the modules, so a failed transaction rolls its
//! transfers back together with every other write.

use serde::{Deserialize, Serialize};

use crate::collections::{Collection, Item};
use crate::context::Context;
use crate::error::CoreError;

/// Native bond denomination. Every fee and deposit amount is in this unit.
pub const BOND_DENOM: &str = "uvna";

const NAMESPACE: &str = "bank";

const BALANCES: Collection<str, Balance> = Collection::new(NAMESPACE, 0x01);
const SUPPLY: Item<u64> = Item::new(NAMESPACE, 0x02);

/// Balance of one account in [`BOND_DENOM`].
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
pub struct Balance {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(uint64, tag = "2")]
    pub amount: u64,
}

/// Coin transfer primitives consumed by every module.
pub trait Bank: Send + Sync {
    /// Spendable balance of `account`.
    fn balance(&self, ctx: &Context<'_>, account: &str) -> Result<u64, CoreError>;

    /// Move `amount` from `from` to `to`. Fails with `InsufficientFunds`.
    fn send(
        &self,
        ctx: &mut Context<'_>,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<(), CoreError>;

    /// Destroy `amount` held by `from` (a module account).
    fn burn(&self, ctx: &mut Context<'_>, from: &str, amount: u64) -> Result<(), CoreError>;
}

/// Store-backed bank.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreBank;

impl StoreBank {
    pub fn new() -> Self {
        Self
    }

    /// Create coins in `to` (genesis funding and tests).
    pub fn mint(&self, ctx: &mut Context<'_>, to: &str, amount: u64) -> Result<(), CoreError> {
        let balance = self.balance(ctx, to)?;
        let credited = balance
            .checked_add(amount)
            .ok_or_else(|| CoreError::Overflow(format!("balance of {}", to)))?;
        let supply = self
            .total_supply(ctx)?
            .checked_add(amount)
            .ok_or_else(|| CoreError::Overflow("total supply".into()))?;
        self.write(ctx, to, credited);
        SUPPLY.set(ctx, &supply);
        Ok(())
    }

    /// Sum of all balances.
    pub fn total_supply(&self, ctx: &Context<'_>) -> Result<u64, CoreError> {
        Ok(SUPPLY.get(ctx)?.unwrap_or(0))
    }

    /// Every non-zero balance in address order.
    pub fn balances(&self, ctx: &Context<'_>) -> Result<Vec<Balance>, CoreError> {
        BALANCES.values(ctx)
    }

    fn write(&self, ctx: &mut Context<'_>, account: &str, amount: u64) {
        if amount == 0 {
            BALANCES.remove(ctx, account);
        } else {
            BALANCES.set(
                ctx,
                account,
                &Balance {
                    address: account.to_string(),
                    amount,
                },
            );
        }
    }
}

impl Bank for StoreBank {
    fn balance(&self, ctx: &Context<'_>, account: &str) -> Result<u64, CoreError> {
        Ok(BALANCES.get(ctx, account)?.map(|b| b.amount).unwrap_or(0))
    }

    fn send(
        &self,
        ctx: &mut Context<'_>,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<(), CoreError> {
        if amount == 0 || from == to {
            return Ok(());
        }
        let available = self.balance(ctx, from)?;
        if available < amount {
            return Err(CoreError::InsufficientFunds {
                account: from.to_string(),
                available,
                required: amount,
            });
        }
        let received = self
            .balance(ctx, to)?
            .checked_add(amount)
            .ok_or_else(|| CoreError::Overflow(format!("balance of {}", to)))?;
        self.write(ctx, from, available - amount);
        self.write(ctx, to, received);
        tracing::debug!(from, to, amount, denom = BOND_DENOM, "bank transfer");
        Ok(())
    }

    fn burn(&self, ctx: &mut Context<'_>, from: &str, amount: u64) -> Result<(), CoreError> {
        if amount == 0 {
            return Ok(());
        }
        let available = self.balance(ctx, from)?;
        if available < amount {
            return Err(CoreError::InsufficientFunds {
                account: from.to_string(),
                available,
                required: amount,
            });
        }
        let supply = self.total_supply(ctx)?.saturating_sub(amount);
        self.write(ctx, from, available - amount);
        SUPPLY.set(ctx, &supply);
        tracing::debug!(from, amount, denom = BOND_DENOM, "coins burned");
        Ok(())
    }
}
