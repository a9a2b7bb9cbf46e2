//! Free-collateral accounting.
//!
//! Tracks the unlocked collateral balance of every account known to the
//! service. Engine operations debit this ledger for payments and credit it
//! for payouts; `deposit`/`withdraw` are the external funding surface.
//! Absent accounts hold zero and zeroed entries are removed, so two ledgers
//! with the same balances compare equal.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{state::error::Error, types::Address};

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CollateralLedger {
    balances: HashMap<Address, u64>,
}

impl CollateralLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Free collateral held by `account`. Absent accounts hold zero.
    pub fn balance(&self, account: &Address) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Credit external funding. Returns the new balance.
    pub fn deposit(
        &mut self,
        account: Address,
        amount: u64,
    ) -> Result<u64, Error> {
        let current = self.balance(&account);
        let updated = current
            .checked_add(amount)
            .ok_or(Error::ArithmeticOverflow)?;
        if updated > 0 {
            self.balances.insert(account, updated);
        }
        Ok(updated)
    }

    /// Debit external funding. Returns the remaining balance.
    pub fn withdraw(
        &mut self,
        account: &Address,
        amount: u64,
    ) -> Result<u64, Error> {
        self.debit(account, amount)?;
        Ok(self.balance(account))
    }

    /// Take a payment from `account`, e.g. to fund a trade.
    pub fn debit(
        &mut self,
        account: &Address,
        amount: u64,
    ) -> Result<(), Error> {
        let current = self.balance(account);
        if amount > current {
            return Err(Error::InsufficientFunds {
                have: current,
                need: amount,
            });
        }
        let remaining = current - amount;
        if remaining > 0 {
            self.balances.insert(*account, remaining);
        } else {
            self.balances.remove(account);
        }
        Ok(())
    }

    /// Issue a payout to `account`. A credit the balance cannot absorb is
    /// the standalone analogue of a rejected transfer.
    pub fn credit(
        &mut self,
        account: Address,
        amount: u64,
    ) -> Result<(), Error> {
        let current = self.balance(&account);
        let updated = current
            .checked_add(amount)
            .ok_or(Error::PayoutFailed { amount })?;
        if updated > 0 {
            self.balances.insert(account, updated);
        }
        Ok(())
    }
}
