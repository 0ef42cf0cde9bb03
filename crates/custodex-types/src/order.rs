//! # Order — the signed exchange capability
//!
//! An order is not a resting book entry. It is a **capability**: a signed
//! authorization to spend up to `sell_cost` of `sell_asset` in exchange for
//! up to `buy_quantity` of `buy_asset`. The operator may consume it through
//! any number of partial fills **within one settlement batch**; across
//! batches the order's nonce is burned and the capability is gone.
//!
//! ## Security properties
//!
//! - **Signer-bound**: the ed25519 signature covers every economic field,
//!   the nonce, and the ledger deployment identity
//! - **Single-use**: the nonce is consumed on first settlement, preventing
//!   replay by the operator or anyone else
//! - **Window-bound**: nonces below the block-derived floor are dead whether
//!   or not they were ever used, so stale signed orders expire on their own

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ids::{AccountId, AssetId, Nonce, SettlementId};

/// Which leg of the order the fee is charged on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeSide {
    /// Fee is deducted from the asset the order receives.
    Buy,
    /// Fee is charged on top of the asset the order spends.
    Sell,
}

impl FeeSide {
    /// Wire encoding: the low bit of the encoded fee word.
    #[must_use]
    pub fn flag(self) -> u128 {
        match self {
            Self::Buy => 0,
            Self::Sell => 1,
        }
    }

    /// Decode the low bit of an encoded fee word.
    #[must_use]
    pub fn from_flag(flag: u128) -> Self {
        if flag & 1 == 0 { Self::Buy } else { Self::Sell }
    }
}

impl std::fmt::Display for FeeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// An off-line-signed order. All amounts are in the asset's native precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Asset this order wants to receive.
    pub buy_asset: AssetId,
    /// Maximum amount of `buy_asset` to receive.
    pub buy_quantity: u128,
    /// Asset this order offers.
    pub sell_asset: AssetId,
    /// Maximum amount of `sell_asset` to spend.
    pub sell_cost: u128,
    /// Fee charged once when the order first fills.
    pub fee: u128,
    /// Which leg the fee is charged on.
    pub fee_side: FeeSide,
    /// Replay-protection nonce, shared with deposits and withdrawals.
    pub nonce: Nonce,
    /// The account that signed this order (ed25519 verifying key).
    pub signer: AccountId,
    /// Ed25519 signature over [`Order::digest`].
    pub signature: Vec<u8>,
}

impl Order {
    /// Largest fee the wire encoding can carry.
    pub const MAX_FEE: u128 = (u128::MAX - 1) / 2;

    /// Fee and fee side packed into one word: `fee * 2 + flag`.
    /// Callers validate `fee <= MAX_FEE` before hashing.
    #[must_use]
    pub fn encoded_fee(&self) -> u128 {
        self.fee * 2 + self.fee_side.flag()
    }

    /// Canonical digest the signer commits to.
    ///
    /// SHA-256 over a domain-separated payload covering the deployment
    /// identity and every economic field. The signature never covers the
    /// signer key itself — the key is what the signature is checked against.
    #[must_use]
    pub fn digest(&self, settlement_id: &SettlementId) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"custodex:order:v1:");
        hasher.update(settlement_id.as_bytes());
        hasher.update(self.buy_asset.as_bytes());
        hasher.update(self.buy_quantity.to_be_bytes());
        hasher.update(self.sell_asset.as_bytes());
        hasher.update(self.sell_cost.to_be_bytes());
        hasher.update(self.encoded_fee().to_be_bytes());
        hasher.update(self.nonce.to_be_bytes());
        hasher.finalize().into()
    }
}

/// A pairing of two orders whose asset pairs mirror each other.
///
/// "Maker" and "taker" are positional: the fill executes at the maker's
/// quoted rate. Neither side has matching priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub maker: Order,
    pub taker: Order,
}

/// An ordered list of trades the operator submits for atomic settlement,
/// plus an optional list of expired nonces whose used-marks may be erased
/// to reclaim storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub trades: Vec<Trade>,
    pub erase_nonces: Vec<Nonce>,
}

impl Batch {
    #[must_use]
    pub fn new(trades: Vec<Trade>) -> Self {
        Self {
            trades,
            erase_nonces: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_erasure(mut self, nonces: Vec<Nonce>) -> Self {
        self.erase_nonces = nonces;
        self
    }
}

/// Signing helpers for tests. **Never use in production** — real orders are
/// signed off-line by account owners.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// Build and sign an order with the given ed25519 key.
    #[allow(clippy::too_many_arguments)]
    pub fn signed(
        key: &ed25519_dalek::SigningKey,
        settlement_id: &SettlementId,
        buy_asset: AssetId,
        buy_quantity: u128,
        sell_asset: AssetId,
        sell_cost: u128,
        fee: u128,
        fee_side: FeeSide,
        nonce: Nonce,
    ) -> Self {
        use ed25519_dalek::Signer;

        let mut order = Self {
            buy_asset,
            buy_quantity,
            sell_asset,
            sell_cost,
            fee,
            fee_side,
            nonce,
            signer: AccountId(key.verifying_key().to_bytes()),
            signature: Vec::new(),
        };
        let digest = order.digest(settlement_id);
        order.signature = key.sign(&digest).to_bytes().to_vec();
        order
    }
}
