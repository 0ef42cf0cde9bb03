//! Withdrawal book — pending requests under challenge delay.
//!
//! State machine per request: `NONE -> PENDING -> (COMPLETED | CANCELLED)`.
//! The book only stores PENDING entries; completion and cancellation both
//! remove the entry, and the terminal states live in the audit log.
//!
//! Funds are **not** locked at ask time. The engine re-checks the ledger
//! balance when the request completes, which is what stops a withdrawal from
//! double-spending balances traded away during the challenge window.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use custodex_types::{
    AccountId, AssetIndex, CustodexError, Nonce, Result, WithdrawalError,
};

/// A pending withdrawal request. At most one per owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub owner: AccountId,
    pub asset: AssetIndex,
    /// Requested amount in native units.
    pub amount: u128,
    /// Block at which the request was made.
    pub requested_at: u64,
    /// The nonce consumed by the ask; also the request's key.
    pub nonce: Nonce,
}

impl WithdrawRequest {
    /// First block at which the request may complete.
    #[must_use]
    pub fn unlock_block(&self, wait_blocks: u64) -> u64 {
        self.requested_at + wait_blocks
    }
}

/// All pending withdrawal requests, keyed by nonce with a per-owner index.
#[derive(Debug, Default, Clone)]
pub struct WithdrawBook {
    by_nonce: HashMap<Nonce, WithdrawRequest>,
    by_owner: HashMap<AccountId, Nonce>,
}

impl WithdrawBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new pending request.
    ///
    /// # Errors
    /// [`WithdrawalError::AlreadyPending`] if the owner already has one.
    pub fn insert(&mut self, request: WithdrawRequest) -> Result<()> {
        if self.by_owner.contains_key(&request.owner) {
            return Err(CustodexError::Withdrawal(WithdrawalError::AlreadyPending {
                owner: request.owner,
            }));
        }
        self.by_owner.insert(request.owner, request.nonce);
        self.by_nonce.insert(request.nonce, request);
        Ok(())
    }

    /// Look up the pending request under a nonce.
    pub fn get(&self, nonce: Nonce) -> Result<&WithdrawRequest> {
        self.by_nonce
            .get(&nonce)
            .ok_or(CustodexError::Withdrawal(WithdrawalError::NoSuchRequest {
                nonce,
            }))
    }

    /// Cancel the pending request under `nonce`, on behalf of `caller`.
    ///
    /// # Errors
    /// - [`WithdrawalError::NoSuchRequest`] if no pending request exists
    /// - [`WithdrawalError::NotOwner`] if it belongs to someone else
    pub fn cancel(&mut self, nonce: Nonce, caller: AccountId) -> Result<WithdrawRequest> {
        let request = *self.get(nonce)?;
        if request.owner != caller {
            return Err(CustodexError::Withdrawal(WithdrawalError::NotOwner {
                nonce,
            }));
        }
        self.remove(nonce);
        Ok(request)
    }

    /// Remove a request after completion or cancellation.
    pub fn remove(&mut self, nonce: Nonce) {
        if let Some(request) = self.by_nonce.remove(&nonce) {
            self.by_owner.remove(&request.owner);
        }
    }

    /// Whether the owner has a pending request.
    #[must_use]
    pub fn has_pending(&self, owner: AccountId) -> bool {
        self.by_owner.contains_key(&owner)
    }

    /// Number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_nonce.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_nonce.is_empty()
    }
}
