//! Balance ledger — per-(owner, asset) scaled balances.
//!
//! Pure state transitions: no external calls, no clock. Entries are created
//! lazily on first credit and only ever zeroed, never deleted. Every balance
//! is capped at [`MAX_SCALED_BALANCE`].

use std::collections::HashMap;

use custodex_types::constants::MAX_SCALED_BALANCE;
use custodex_types::{AccountId, Asset, AssetIndex, CustodexError, LedgerError, Result};

/// Per-account, per-asset scaled balances.
#[derive(Debug, Default, Clone)]
pub struct BalanceLedger {
    balances: HashMap<(AccountId, AssetIndex), u64>,
}

impl BalanceLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scaled balance; zero for untouched entries.
    #[must_use]
    pub fn balance(&self, owner: AccountId, asset: AssetIndex) -> u64 {
        self.balances.get(&(owner, asset)).copied().unwrap_or(0)
    }

    /// Credit scaled units.
    ///
    /// # Errors
    /// [`LedgerError::Overflow`] if the result would exceed `MAX_SCALED_BALANCE`.
    pub fn credit(&mut self, owner: AccountId, asset: &Asset, scaled_amount: u64) -> Result<u64> {
        let entry = self.balances.entry((owner, asset.index)).or_insert(0);
        let new_balance = entry
            .checked_add(scaled_amount)
            .filter(|b| *b <= MAX_SCALED_BALANCE)
            .ok_or(CustodexError::Ledger(LedgerError::Overflow {
                asset: asset.id,
            }))?;
        *entry = new_balance;
        Ok(new_balance)
    }

    /// Debit scaled units.
    ///
    /// # Errors
    /// [`LedgerError::InsufficientBalance`] if the balance is too small.
    pub fn debit(&mut self, owner: AccountId, asset: &Asset, scaled_amount: u64) -> Result<u64> {
        let entry = self.balances.entry((owner, asset.index)).or_insert(0);
        let new_balance =
            entry
                .checked_sub(scaled_amount)
                .ok_or(CustodexError::Ledger(LedgerError::InsufficientBalance {
                    needed: scaled_amount,
                    available: *entry,
                }))?;
        *entry = new_balance;
        Ok(new_balance)
    }

    /// Overwrite a balance. Used by the settlement engine when a validated
    /// batch overlay is flushed; the value has already passed the cap checks.
    pub fn set(&mut self, owner: AccountId, asset: AssetIndex, scaled_balance: u64) {
        debug_assert!(scaled_balance <= MAX_SCALED_BALANCE);
        self.balances.insert((owner, asset), scaled_balance);
    }

    /// Total scaled supply of one asset across all accounts.
    #[must_use]
    pub fn total_supply(&self, asset: AssetIndex) -> u128 {
        self.balances
            .iter()
            .filter(|((_, a), _)| *a == asset)
            .map(|(_, bal)| u128::from(*bal))
            .sum()
    }
}
