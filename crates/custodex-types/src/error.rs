//! Error taxonomy for the Custodex settlement ledger.
//!
//! Every mutating call either fully succeeds or fully fails with one of the
//! classified reasons below — no error leaves partial state behind, and none
//! is fatal to the ledger itself. Errors are grouped by subsystem and folded
//! into the top-level [`CustodexError`].

use thiserror::Error;

use crate::ids::{AccountId, AssetId, Nonce};

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, CustodexError>;

/// Asset registration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Internal decimals are zero, exceed the native decimals, or would push
    /// the scale factor past the safe exponent range.
    #[error("bad decimal pair for {asset}: native={native_decimals}, internal={internal_decimals}")]
    BadDecimals {
        asset: AssetId,
        native_decimals: u32,
        internal_decimals: u32,
    },

    /// The requested index is already bound to a different asset.
    #[error("asset index {index} is already occupied")]
    IndexOccupied { index: u16 },

    /// The external identifier was registered before.
    #[error("asset {asset} is already registered")]
    AlreadyRegistered { asset: AssetId },

    /// Lookup of an asset that was never registered.
    #[error("asset {asset} is not registered")]
    UnknownAsset { asset: AssetId },
}

/// Balance ledger failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A credit would push the balance past `MAX_SCALED_BALANCE`.
    #[error("balance overflow for {asset}")]
    Overflow { asset: AssetId },

    /// A debit exceeds the current balance.
    #[error("insufficient balance: need {needed}, have {available} (scaled)")]
    InsufficientBalance { needed: u64, available: u64 },
}

/// Replay-protection failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NonceError {
    /// The nonce fell below the current validity floor.
    #[error("nonce {nonce} is below the validity floor {floor}")]
    NonceTooOld { nonce: Nonce, floor: Nonce },

    /// The nonce was already consumed.
    #[error("nonce {nonce} was already used")]
    NonceUsed { nonce: Nonce },
}

/// Withdrawal state machine failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WithdrawalError {
    /// The owner already has a pending withdrawal request.
    #[error("{owner} already has a pending withdrawal")]
    AlreadyPending { owner: AccountId },

    /// Completion parameters do not exactly match the pending request.
    #[error("withdrawal completion does not match the pending ask (nonce {nonce})")]
    AskMismatch { nonce: Nonce },

    /// The challenge delay has not elapsed yet.
    #[error("challenge delay not elapsed: unlocks at block {unlock_block}, current {current_block}")]
    ChallengeNotElapsed {
        unlock_block: u64,
        current_block: u64,
    },

    /// No pending request exists under this nonce.
    #[error("no pending withdrawal under nonce {nonce}")]
    NoSuchRequest { nonce: Nonce },

    /// The pending request under this nonce belongs to someone else.
    #[error("withdrawal under nonce {nonce} belongs to another owner")]
    NotOwner { nonce: Nonce },
}

/// Order validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The ed25519 signature does not verify against the order's signer key.
    #[error("order signature does not verify for {signer}")]
    BadSignature { signer: AccountId },

    /// The two orders of a trade do not reference mirrored asset pairs.
    #[error("order pair currencies do not mirror each other")]
    CurrencyMismatch,

    /// An order buys and sells the same asset.
    #[error("order buys and sells the same asset {asset}")]
    SameCurrency { asset: AssetId },

    /// An amount is not an exact multiple of the asset's scale factor.
    #[error("amount {amount} is not aligned to the scale factor of {asset}")]
    UnalignedAmount { asset: AssetId, amount: u128 },

    /// The fee does not fit the wire encoding (`fee * 2 + flag`).
    #[error("fee {fee} is too large to encode")]
    FeeTooLarge { fee: u128 },

    /// The taker's implied price is worse than the maker demanded.
    #[error("order pair prices do not cross")]
    PriceMismatch,
}

/// Custody adapter failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The external program refused the transfer.
    #[error("external transfer of {asset} was rejected")]
    TransferRejected { asset: AssetId },

    /// The external program reported success but moved a different amount.
    #[error("external transfer of {asset} moved {moved} instead of {expected}")]
    TransferMismatch {
        asset: AssetId,
        expected: u128,
        moved: u128,
    },
}

/// Central error enum: every rejection reason a call can surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodexError {
    #[error("registration: {0}")]
    Registration(#[from] RegistrationError),

    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("nonce: {0}")]
    Nonce(#[from] NonceError),

    #[error("withdrawal: {0}")]
    Withdrawal(#[from] WithdrawalError),

    #[error("order: {0}")]
    Order(#[from] OrderError),

    #[error("transfer: {0}")]
    Transfer(#[from] TransferError),
}
