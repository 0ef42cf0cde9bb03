//! Custody adapters — the interface to external value-transfer programs.
//!
//! Adapters are **potentially adversarial**: a transfer call may refuse, may
//! claim success while moving nothing, or may move the wrong amount. The
//! settlement engine never trusts the returned flag alone — it re-derives
//! ground truth by reading the adapter's own custody balance around every
//! transfer and rejects on any mismatch.

use custodex_types::AccountId;

/// Value-transfer interface for one registered asset.
///
/// `transfer_in` pulls `amount` native units from the owner into custody;
/// `transfer_out` pushes them from custody back to the owner. Both return
/// `false` when the external program refuses. `custody_balance` is the amount
/// the external program says is currently held in custody — the engine's
/// ground truth.
pub trait CustodyAdapter {
    /// Native decimal precision of the external program.
    fn decimals(&self) -> u32;

    /// Pull funds from the owner into custody. `false` means refused.
    fn transfer_in(&mut self, owner: AccountId, amount: u128) -> bool;

    /// Push funds from custody to the owner. `false` means refused.
    fn transfer_out(&mut self, owner: AccountId, amount: u128) -> bool;

    /// The owner's balance in the external program.
    fn balance_of(&self, owner: AccountId) -> u128;

    /// Funds the external program reports as held by the settlement ledger.
    fn custody_balance(&self) -> u128;
}

/// In-memory adapters for tests, including misbehaving ones modeled after
/// real broken token programs. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing {
    use std::collections::HashMap;

    use custodex_types::AccountId;

    use super::CustodyAdapter;

    /// How the mock external program behaves.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum AdapterConduct {
        /// Moves exactly what it is asked to move.
        Honest,
        /// Claims success on every transfer but never moves funds.
        AcceptWithoutMoving,
        /// Refuses every outbound transfer.
        RefuseOutbound,
        /// Accepts outbound transfers but moves only half the amount.
        ShortOutbound,
    }

    /// A self-contained external balance book with configurable conduct.
    #[derive(Debug, Clone)]
    pub struct MockAdapter {
        decimals: u32,
        conduct: AdapterConduct,
        balances: HashMap<AccountId, u128>,
        custody: u128,
    }

    impl MockAdapter {
        #[must_use]
        pub fn new(decimals: u32) -> Self {
            Self::with_conduct(decimals, AdapterConduct::Honest)
        }

        #[must_use]
        pub fn with_conduct(decimals: u32, conduct: AdapterConduct) -> Self {
            Self {
                decimals,
                conduct,
                balances: HashMap::new(),
                custody: 0,
            }
        }

        /// Seed an owner's external balance.
        pub fn set_balance(&mut self, owner: AccountId, amount: u128) {
            self.balances.insert(owner, amount);
        }
    }

    impl CustodyAdapter for MockAdapter {
        fn decimals(&self) -> u32 {
            self.decimals
        }

        fn transfer_in(&mut self, owner: AccountId, amount: u128) -> bool {
            match self.conduct {
                AdapterConduct::AcceptWithoutMoving => true,
                _ => {
                    let balance = self.balances.entry(owner).or_insert(0);
                    if *balance < amount {
                        return false;
                    }
                    *balance -= amount;
                    self.custody += amount;
                    true
                }
            }
        }

        fn transfer_out(&mut self, owner: AccountId, amount: u128) -> bool {
            match self.conduct {
                AdapterConduct::RefuseOutbound => false,
                AdapterConduct::AcceptWithoutMoving => true,
                AdapterConduct::ShortOutbound => {
                    let moved = (amount / 2).min(self.custody);
                    self.custody -= moved;
                    *self.balances.entry(owner).or_insert(0) += moved;
                    true
                }
                AdapterConduct::Honest => {
                    if self.custody < amount {
                        return false;
                    }
                    self.custody -= amount;
                    *self.balances.entry(owner).or_insert(0) += amount;
                    true
                }
            }
        }

        fn balance_of(&self, owner: AccountId) -> u128 {
            self.balances.get(&owner).copied().unwrap_or(0)
        }

        fn custody_balance(&self) -> u128 {
            self.custody
        }
    }

}
