use std::sync::Arc;

use serde::{Deserialize, Serialize};
use verana_core::{
    ensure_gov_authority, module_address, Bank, Collection, Context, Event, Item,
};

use crate::error::TrustDepositError;
use crate::types::{GenesisState, Params, TrustDeposit, TrustDepositRates};

/// Module name; also the store namespace and the escrow account seed.
pub const MODULE_NAME: &str = "trustdeposit";

const PARAMS: Item<Params> = Item::new(MODULE_NAME, 0x00);
const DEPOSITS: Collection<str, TrustDeposit> = Collection::new(MODULE_NAME, 0x01);

/// Result of a principal reclaim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclaimOutcome {
    pub burned: u64,
    pub payout: u64,
}

/// Share/amount ledger of trust deposits.
///
/// Coins of every deposit are held by the module account; the ledger only
/// moves them through the [`Bank`] capability.
#[derive(Clone)]
pub struct TrustDepositLedger {
    bank: Arc<dyn Bank>,
}

impl TrustDepositLedger {
    pub fn new(bank: Arc<dyn Bank>) -> Self {
        Self { bank }
    }

    /// Escrow account holding all deposited coins.
    pub fn module_account(&self) -> String {
        module_address(MODULE_NAME)
    }

    /// Current parameters, falling back to the genesis defaults.
    pub fn params(&self, ctx: &Context<'_>) -> Result<Params, TrustDepositError> {
        Ok(PARAMS.get(ctx)?.unwrap_or_else(Params::default_params))
    }

    /// Typed view of the rates.
    pub fn rates(&self, ctx: &Context<'_>) -> Result<TrustDepositRates, TrustDepositError> {
        self.params(ctx)?.rates()
    }

    /// Replace the parameters. Governance only.
    pub fn update_params(
        &self,
        ctx: &mut Context<'_>,
        authority: &str,
        params: Params,
    ) -> Result<(), TrustDepositError> {
        ensure_gov_authority(authority)?;
        params.validate()?;
        PARAMS.set(ctx, &params);
        tracing::info!(module = MODULE_NAME, "params updated");
        Ok(())
    }

    pub fn get_trust_deposit(
        &self,
        ctx: &Context<'_>,
        account: &str,
    ) -> Result<Option<TrustDeposit>, TrustDepositError> {
        Ok(DEPOSITS.get(ctx, account)?)
    }

    fn load(&self, ctx: &Context<'_>, account: &str) -> Result<TrustDeposit, TrustDepositError> {
        DEPOSITS
            .get(ctx, account)?
            .ok_or_else(|| TrustDepositError::NotFound(account.to_string()))
    }

    /// Lock (`delta > 0`) or release to claimable (`delta < 0`) part of
    /// `account`'s deposit.
    ///
    /// A positive delta first consumes claimable coins; only the remainder
    /// is transferred from the account. A negative delta never moves coins.
    pub fn adjust_trust_deposit(
        &self,
        ctx: &mut Context<'_>,
        account: &str,
        delta: i64,
    ) -> Result<(), TrustDepositError> {
        if delta == 0 {
            return Ok(());
        }
        let rates = self.rates(ctx)?;
        let magnitude = delta.unsigned_abs();

        if delta > 0 {
            let mut td = DEPOSITS
                .get(ctx, account)?
                .unwrap_or_else(|| TrustDeposit::empty(account));
            let absorbed = magnitude.min(td.claimable);
            let remainder = magnitude - absorbed;
            td.claimable -= absorbed;
            if remainder > 0 {
                self.bank
                    .send(ctx, account, &self.module_account(), remainder)?;
                td.amount = checked_add(td.amount, remainder, "amount")?;
                td.share = checked_add(td.share, rates.share_value.quo_truncate(remainder)?, "share")?;
            }
            tracing::debug!(account, delta, absorbed, remainder, "trust deposit locked");
            DEPOSITS.set(ctx, account, &td);
        } else {
            let mut td = self.load(ctx, account)?;
            let claimable = checked_add(td.claimable, magnitude, "claimable")?;
            if claimable > td.amount {
                return Err(TrustDepositError::InsufficientDeposit(format!(
                    "releasing {} would leave claimable {} above amount {}",
                    magnitude, claimable, td.amount
                )));
            }
            td.claimable = claimable;
            tracing::debug!(account, delta, claimable, "trust deposit released");
            DEPOSITS.set(ctx, account, &td);
        }
        Ok(())
    }

    /// Deposit `amount` coins paid by `payer` into `account`'s trust deposit
    /// as locked stake. Used when fees are partly routed to a deposit.
    pub fn fund_trust_deposit(
        &self,
        ctx: &mut Context<'_>,
        payer: &str,
        account: &str,
        amount: u64,
    ) -> Result<(), TrustDepositError> {
        if amount == 0 {
            return Ok(());
        }
        let rates = self.rates(ctx)?;
        let mut td = DEPOSITS
            .get(ctx, account)?
            .unwrap_or_else(|| TrustDeposit::empty(account));
        self.bank.send(ctx, payer, &self.module_account(), amount)?;
        td.amount = checked_add(td.amount, amount, "amount")?;
        td.share = checked_add(td.share, rates.share_value.quo_truncate(amount)?, "share")?;
        DEPOSITS.set(ctx, account, &td);
        tracing::debug!(payer, account, amount, "trust deposit funded");
        Ok(())
    }

    /// Pay out the share-value appreciation: `share × shareValue − amount`.
    pub fn reclaim_yield(
        &self,
        ctx: &mut Context<'_>,
        account: &str,
    ) -> Result<u64, TrustDepositError> {
        let rates = self.rates(ctx)?;
        let mut td = self.load(ctx, account)?;
        let value = rates.share_value.mul_truncate(td.share)?;
        if value <= td.amount {
            return Err(TrustDepositError::InvalidState(format!(
                "no yield available for {}: share value {} does not exceed amount {}",
                account, value, td.amount
            )));
        }
        let claimed = value - td.amount;
        let shares = rates.share_value.quo_truncate(claimed)?;
        td.share = td.share.checked_sub(shares).ok_or_else(|| {
            TrustDepositError::InsufficientDeposit(format!(
                "yield of {} needs {} shares, {} held",
                claimed, shares, td.share
            ))
        })?;
        DEPOSITS.set(ctx, account, &td);
        self.bank.send(ctx, &self.module_account(), account, claimed)?;
        ctx.emit(
            Event::new("reclaim_trust_deposit_yield")
                .attr("account", account)
                .attr("amount", claimed),
        );
        tracing::info!(account, claimed, "trust deposit yield reclaimed");
        Ok(claimed)
    }

    /// Reclaim `claimed` coins of claimable principal; a fraction given by
    /// the reclaim burn rate is burned, the rest is paid out.
    pub fn reclaim_trust_deposit(
        &self,
        ctx: &mut Context<'_>,
        account: &str,
        claimed: u64,
    ) -> Result<ReclaimOutcome, TrustDepositError> {
        if claimed == 0 {
            return Err(TrustDepositError::InvalidRequest(
                "claimed amount must be positive".into(),
            ));
        }
        let rates = self.rates(ctx)?;
        let mut td = self.load(ctx, account)?;
        if claimed > td.claimable {
            return Err(TrustDepositError::InsufficientDeposit(format!(
                "claimed {} exceeds claimable {}",
                claimed, td.claimable
            )));
        }
        let shares = rates.share_value.quo_truncate(claimed)?;
        let burned = rates.reclaim_burn_rate.mul_truncate(claimed)?;
        let payout = claimed - burned;

        td.claimable -= claimed;
        td.amount = td.amount.checked_sub(claimed).ok_or_else(|| {
            TrustDepositError::InsufficientDeposit(format!(
                "claimed {} exceeds amount {}",
                claimed, td.amount
            ))
        })?;
        td.share = td.share.checked_sub(shares).ok_or_else(|| {
            TrustDepositError::InsufficientDeposit(format!(
                "claimed {} needs {} shares, {} held",
                claimed, shares, td.share
            ))
        })?;
        DEPOSITS.set(ctx, account, &td);

        let escrow = self.module_account();
        self.bank.send(ctx, &escrow, account, payout)?;
        self.bank.burn(ctx, &escrow, burned)?;
        ctx.emit(
            Event::new("reclaim_trust_deposit")
                .attr("account", account)
                .attr("claimed", claimed)
                .attr("burned", burned)
                .attr("payout", payout),
        );
        tracing::info!(account, claimed, burned, payout, "trust deposit reclaimed");
        Ok(ReclaimOutcome { burned, payout })
    }

    /// Slash `amount` coins of `account`'s deposit and burn them.
    pub fn slash_trust_deposit(
        &self,
        ctx: &mut Context<'_>,
        account: &str,
        amount: u64,
    ) -> Result<(), TrustDepositError> {
        if amount == 0 {
            return Err(TrustDepositError::InvalidRequest(
                "slash amount must be positive".into(),
            ));
        }
        let rates = self.rates(ctx)?;
        let mut td = self.load(ctx, account)?;
        let shares = rates.share_value.quo_truncate(amount)?;
        td.amount = td.amount.checked_sub(amount).ok_or_else(|| {
            TrustDepositError::InsufficientDeposit(format!(
                "slash of {} exceeds amount {}",
                amount, td.amount
            ))
        })?;
        td.share = td.share.checked_sub(shares).ok_or_else(|| {
            TrustDepositError::InsufficientDeposit(format!(
                "slash of {} needs {} shares, {} held",
                amount, shares, td.share
            ))
        })?;
        td.claimable = td.claimable.min(td.amount);
        td.slashed_deposit = checked_add(td.slashed_deposit, amount, "slashed deposit")?;
        td.slash_count = td.slash_count.saturating_add(1);
        td.last_slashed = Some(ctx.block_time());
        DEPOSITS.set(ctx, account, &td);

        self.bank.burn(ctx, &self.module_account(), amount)?;
        ctx.emit(
            Event::new("trust_deposit_slashed")
                .attr("account", account)
                .attr("amount", amount)
                .attr("slash_count", td.slash_count),
        );
        tracing::info!(account, amount, slash_count = td.slash_count, "trust deposit slashed");
        Ok(())
    }

    /// Governance-initiated slash.
    pub fn slash_by_authority(
        &self,
        ctx: &mut Context<'_>,
        authority: &str,
        account: &str,
        amount: u64,
    ) -> Result<(), TrustDepositError> {
        if let Err(e) = ensure_gov_authority(authority) {
            tracing::warn!(authority, account, "slash rejected: not the governance authority");
            return Err(e.into());
        }
        self.slash_trust_deposit(ctx, account, amount)
    }

    /// Top up a slashed deposit. Any payer may repay on behalf of `account`.
    pub fn repay_slashed_trust_deposit(
        &self,
        ctx: &mut Context<'_>,
        payer: &str,
        account: &str,
        amount: u64,
    ) -> Result<(), TrustDepositError> {
        if amount == 0 {
            return Err(TrustDepositError::InvalidRequest(
                "repay amount must be positive".into(),
            ));
        }
        let rates = self.rates(ctx)?;
        let mut td = self.load(ctx, account)?;
        if amount > td.slashed_deposit {
            return Err(TrustDepositError::InvalidRequest(format!(
                "repay of {} exceeds outstanding slashed deposit {}",
                amount, td.slashed_deposit
            )));
        }
        self.bank.send(ctx, payer, &self.module_account(), amount)?;
        td.amount = checked_add(td.amount, amount, "amount")?;
        td.share = checked_add(td.share, rates.share_value.quo_truncate(amount)?, "share")?;
        td.slashed_deposit -= amount;
        td.repaid_deposit = checked_add(td.repaid_deposit, amount, "repaid deposit")?;
        td.last_repaid = Some(ctx.block_time());
        td.last_repaid_by = payer.to_string();
        DEPOSITS.set(ctx, account, &td);
        ctx.emit(
            Event::new("repay_slashed_trust_deposit")
                .attr("account", account)
                .attr("payer", payer)
                .attr("amount", amount),
        );
        tracing::info!(account, payer, amount, "slashed trust deposit repaid");
        Ok(())
    }

    /// Every deposit in account order.
    pub fn all_deposits(&self, ctx: &Context<'_>) -> Result<Vec<TrustDeposit>, TrustDepositError> {
        Ok(DEPOSITS.values(ctx)?)
    }

    pub fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        genesis: &GenesisState,
    ) -> Result<(), TrustDepositError> {
        genesis.params.validate()?;
        PARAMS.set(ctx, &genesis.params);
        for td in &genesis.trust_deposits {
            if td.claimable > td.amount {
                return Err(TrustDepositError::InvalidState(format!(
                    "genesis deposit of {} has claimable {} above amount {}",
                    td.account, td.claimable, td.amount
                )));
            }
            DEPOSITS.set(ctx, &td.account, td);
        }
        tracing::info!(deposits = genesis.trust_deposits.len(), "trust deposit genesis loaded");
        Ok(())
    }

    pub fn export_genesis(&self, ctx: &Context<'_>) -> Result<GenesisState, TrustDepositError> {
        Ok(GenesisState {
            params: self.params(ctx)?,
            trust_deposits: self.all_deposits(ctx)?,
        })
    }
}

fn checked_add(a: u64, b: u64, what: &str) -> Result<u64, TrustDepositError> {
    a.checked_add(b)
        .ok_or_else(|| verana_core::CoreError::Overflow(what.to_string()).into())
}
