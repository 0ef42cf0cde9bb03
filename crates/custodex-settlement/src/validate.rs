//! Order validation — signatures, asset resolution, scaling, pair checks.
//!
//! Validation is pure: it reads the registry and touches no state. The engine
//! runs it for every order of every trade before staging any balance change,
//! so a batch containing one bad order rejects as a whole.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use custodex_custody::AssetRegistry;
use custodex_types::{
    AccountId, AssetId, AssetIndex, CustodexError, FeeSide, Nonce, Order, OrderError, Result,
    SettlementId,
};

/// An order that passed validation, with every amount rescaled to ledger
/// units and both assets resolved to their compact indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaledOrder {
    /// Digest the signature was checked against; identifies the order within
    /// a batch.
    pub digest: [u8; 32],
    pub signer: AccountId,
    pub nonce: Nonce,
    pub buy_asset: AssetId,
    pub sell_asset: AssetId,
    pub buy_index: AssetIndex,
    pub sell_index: AssetIndex,
    /// Maximum quantity to receive, in buy-asset scaled units.
    pub buy_quantity: u64,
    /// Maximum amount to spend, in sell-asset scaled units.
    pub sell_cost: u64,
    /// Fee in scaled units of the fee-side asset.
    pub fee: u64,
    pub fee_side: FeeSide,
}

impl ScaledOrder {
    /// The asset index the fee is charged in.
    #[must_use]
    pub fn fee_index(&self) -> AssetIndex {
        match self.fee_side {
            FeeSide::Buy => self.buy_index,
            FeeSide::Sell => self.sell_index,
        }
    }
}

/// Verify the order's ed25519 signature and return the digest it covers.
///
/// # Errors
/// - [`OrderError::FeeTooLarge`] if the fee does not fit the wire encoding
/// - [`OrderError::BadSignature`] if the signer key is malformed, the
///   signature bytes are malformed, or verification fails
pub fn verify_order_signature(order: &Order, settlement_id: &SettlementId) -> Result<[u8; 32]> {
    // Bound the fee before hashing: the digest encodes `fee * 2 + flag`.
    if order.fee > Order::MAX_FEE {
        return Err(CustodexError::Order(OrderError::FeeTooLarge {
            fee: order.fee,
        }));
    }

    let bad_signature = || {
        CustodexError::Order(OrderError::BadSignature {
            signer: order.signer,
        })
    };

    let key = VerifyingKey::from_bytes(order.signer.as_bytes()).map_err(|_| bad_signature())?;
    let signature = Signature::from_slice(&order.signature).map_err(|_| bad_signature())?;
    let digest = order.digest(settlement_id);
    key.verify(&digest, &signature).map_err(|_| bad_signature())?;
    Ok(digest)
}

/// Validate one order in isolation: signature, asset resolution, alignment
/// and scaling of all three amounts.
///
/// # Errors
/// - [`OrderError::BadSignature`] on a failed signature check
/// - [`OrderError::SameCurrency`] if both legs name the same asset
/// - `RegistrationError::UnknownAsset` for an unregistered asset
/// - [`OrderError::UnalignedAmount`] or `LedgerError::Overflow` when an
///   amount fails to rescale
pub fn validate_order(
    order: &Order,
    registry: &AssetRegistry,
    settlement_id: &SettlementId,
) -> Result<ScaledOrder> {
    let digest = verify_order_signature(order, settlement_id)?;

    if order.buy_asset == order.sell_asset {
        return Err(CustodexError::Order(OrderError::SameCurrency {
            asset: order.buy_asset,
        }));
    }
    let buy = registry.by_id(order.buy_asset)?;
    let sell = registry.by_id(order.sell_asset)?;

    let fee_asset = match order.fee_side {
        FeeSide::Buy => buy,
        FeeSide::Sell => sell,
    };

    Ok(ScaledOrder {
        digest,
        signer: order.signer,
        nonce: order.nonce,
        buy_asset: buy.id,
        sell_asset: sell.id,
        buy_index: buy.index,
        sell_index: sell.index,
        buy_quantity: buy.to_scaled(order.buy_quantity)?,
        sell_cost: sell.to_scaled(order.sell_cost)?,
        fee: fee_asset.to_scaled(order.fee)?,
        fee_side: order.fee_side,
    })
}

/// Validate a maker/taker pairing: mirrored asset pairs and crossing prices.
///
/// Prices cross when the product of the two buy quantities does not exceed
/// the product of the two sell costs. Equality is the exact-price case; a
/// strict inequality means the taker offered better than the maker demanded,
/// and the maker's quoted rate wins the difference.
///
/// # Errors
/// - [`OrderError::CurrencyMismatch`] if the pairs do not mirror
/// - [`OrderError::PriceMismatch`] if the prices do not cross
pub fn validate_pair(maker: &ScaledOrder, taker: &ScaledOrder) -> Result<()> {
    if maker.buy_index != taker.sell_index || maker.sell_index != taker.buy_index {
        return Err(CustodexError::Order(OrderError::CurrencyMismatch));
    }
    // Cross products fit u128: both factors are capped at MAX_SCALED_BALANCE.
    let wanted = u128::from(maker.buy_quantity) * u128::from(taker.buy_quantity);
    let offered = u128::from(maker.sell_cost) * u128::from(taker.sell_cost);
    if wanted > offered {
        return Err(CustodexError::Order(OrderError::PriceMismatch));
    }
    Ok(())
}
