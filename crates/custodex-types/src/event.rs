//! Settlement events — the durable audit log.
//!
//! Every mutating operation that commits records one or more events. External
//! observers (operators, reconciliation jobs, account owners) rely on this
//! stream as the ground truth of what the ledger did; balances in events are
//! post-operation values in native units.

use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, AssetId, Nonce};

/// One entry of the append-only audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementEvent {
    /// A deposit was accepted and credited.
    DepositAccepted {
        nonce: Nonce,
        owner: AccountId,
        asset: AssetId,
        amount: u128,
        /// Owner's balance in `asset` after the credit.
        balance: u128,
    },

    /// A withdrawal was asked and entered the challenge window.
    WithdrawAsked {
        nonce: Nonce,
        owner: AccountId,
        asset: AssetId,
        amount: u128,
        /// Block at which the challenge delay elapses.
        unlock_block: u64,
    },

    /// A pending withdrawal was cancelled by its owner.
    WithdrawCancelled { nonce: Nonce, owner: AccountId },

    /// A withdrawal completed and the funds left custody.
    WithdrawCompleted {
        nonce: Nonce,
        owner: AccountId,
        asset: AssetId,
        amount: u128,
        /// Owner's balance in `asset` after the debit.
        balance: u128,
    },

    /// One trade of a committed batch was applied.
    TradeApplied {
        maker: AccountId,
        taker: AccountId,
        maker_nonce: Nonce,
        taker_nonce: Nonce,
        maker_buy_asset: AssetId,
        taker_buy_asset: AssetId,
        /// Fill size in the maker's buy asset.
        filled_quantity: u128,
        /// Amount paid in the maker's sell asset, at the maker's rate.
        filled_cost: u128,
        maker_buy_balance: u128,
        maker_sell_balance: u128,
        taker_buy_balance: u128,
        taker_sell_balance: u128,
    },

    /// A whole batch committed. `error_code` is always zero — a failed batch
    /// records nothing at all.
    BatchCommitted { trades: usize, error_code: u64 },
}

impl SettlementEvent {
    /// Short tag for log lines.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DepositAccepted { .. } => "DEPOSIT_ACCEPTED",
            Self::WithdrawAsked { .. } => "WITHDRAW_ASKED",
            Self::WithdrawCancelled { .. } => "WITHDRAW_CANCELLED",
            Self::WithdrawCompleted { .. } => "WITHDRAW_COMPLETED",
            Self::TradeApplied { .. } => "TRADE_APPLIED",
            Self::BatchCommitted { .. } => "BATCH_COMMITTED",
        }
    }
}
