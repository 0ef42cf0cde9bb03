//! Nonce window — block-indexed replay protection.
//!
//! One global nonce space is shared by deposits, withdrawal asks/cancels and
//! order signatures: a value consumed for one purpose can never be reused for
//! another, by any owner. The space is partitioned into per-block windows:
//! `first_valid(block) = (block - deployment_block) * NONCES_PER_BLOCK`, and
//! anything below that floor is permanently dead whether or not it was ever
//! marked used. Two thresholds, a hard floor and a trailing erasure floor,
//! plus a sparse used-set avoid both unbounded growth and ring-buffer
//! wraparound bugs.

use std::collections::HashSet;

use custodex_types::constants::{NONCES_PER_BLOCK, NONCE_ERASE_MARGIN};
use custodex_types::{CustodexError, Nonce, NonceError, Result};

/// The replay-protection window.
#[derive(Debug, Clone)]
pub struct NonceWindow {
    deployment_block: u64,
    used: HashSet<Nonce>,
}

impl NonceWindow {
    #[must_use]
    pub fn new(deployment_block: u64) -> Self {
        Self {
            deployment_block,
            used: HashSet::new(),
        }
    }

    /// Lower bound of the addressable nonce range at `current_block`.
    #[must_use]
    pub fn first_valid(&self, current_block: u64) -> Nonce {
        current_block.saturating_sub(self.deployment_block) * NONCES_PER_BLOCK
    }

    /// Validate a nonce without marking it.
    ///
    /// # Errors
    /// - [`NonceError::NonceTooOld`] if below the validity floor
    /// - [`NonceError::NonceUsed`] if already marked
    pub fn check(&self, nonce: Nonce, current_block: u64) -> Result<()> {
        let floor = self.first_valid(current_block);
        if nonce < floor {
            return Err(CustodexError::Nonce(NonceError::NonceTooOld {
                nonce,
                floor,
            }));
        }
        if self.used.contains(&nonce) {
            return Err(CustodexError::Nonce(NonceError::NonceUsed { nonce }));
        }
        Ok(())
    }

    /// Mark a nonce used. The caller has already validated it with [`check`]
    /// (or consumed it through [`consume`]).
    ///
    /// [`check`]: NonceWindow::check
    /// [`consume`]: NonceWindow::consume
    pub fn mark(&mut self, nonce: Nonce) {
        self.used.insert(nonce);
    }

    /// Validate and mark in one step.
    pub fn consume(&mut self, nonce: Nonce, current_block: u64) -> Result<()> {
        self.check(nonce, current_block)?;
        self.mark(nonce);
        Ok(())
    }

    /// Whether a nonce is currently marked used.
    #[must_use]
    pub fn is_used(&self, nonce: Nonce) -> bool {
        self.used.contains(&nonce)
    }

    /// Erase used-marks for nonces that trail the validity floor by at least
    /// one full block window. Purely a storage-reclamation hint: skipping
    /// erasure is always safe, and listed nonces that are still reachable are
    /// silently left alone.
    pub fn erase(&mut self, nonces: &[Nonce], current_block: u64) {
        let erase_floor = self.first_valid(current_block).saturating_sub(NONCE_ERASE_MARGIN);
        let mut erased = 0usize;
        for nonce in nonces {
            if *nonce < erase_floor && self.used.remove(nonce) {
                erased += 1;
            }
        }
        if erased > 0 {
            tracing::debug!(erased, erase_floor, "Erased expired nonce marks");
        }
    }

    /// Number of used-marks currently retained.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.used.len()
    }
}
