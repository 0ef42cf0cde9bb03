//! Asset descriptors and decimal rescaling.
//!
//! External programs express amounts in their own (native) precision; the
//! ledger stores every balance in a coarser internal precision. The bridge is
//! the asset's scale factor: `10^(native_decimals - internal_decimals)`.
//! Every native amount entering the system must be an exact multiple of it.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_SCALED_BALANCE;
use crate::error::{CustodexError, LedgerError, OrderError, Result};
use crate::ids::{AssetId, AssetIndex};

/// A registered asset. Immutable after registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// External identifier (value-transfer program address).
    pub id: AssetId,
    /// Compact index assigned at registration. 0 is the native asset.
    pub index: AssetIndex,
    /// Precision the external program uses.
    pub native_decimals: u32,
    /// Precision the ledger stores balances in. Always `<= native_decimals`.
    pub internal_decimals: u32,
}

impl Asset {
    /// `10^(native_decimals - internal_decimals)`: how many native units one
    /// scaled unit represents.
    ///
    /// Registration bounds the exponent, so this cannot overflow `u64`.
    #[must_use]
    pub fn scale_factor(&self) -> u64 {
        10u64.pow(self.native_decimals - self.internal_decimals)
    }

    /// Whether a native amount is an exact multiple of the scale factor.
    #[must_use]
    pub fn is_aligned(&self, native_amount: u128) -> bool {
        native_amount % u128::from(self.scale_factor()) == 0
    }

    /// Convert a native amount to scaled ledger units.
    ///
    /// # Errors
    /// - [`OrderError::UnalignedAmount`] if the amount is not a multiple of
    ///   the scale factor
    /// - [`LedgerError::Overflow`] if the scaled amount exceeds
    ///   [`MAX_SCALED_BALANCE`]
    pub fn to_scaled(&self, native_amount: u128) -> Result<u64> {
        if !self.is_aligned(native_amount) {
            return Err(CustodexError::Order(OrderError::UnalignedAmount {
                asset: self.id,
                amount: native_amount,
            }));
        }
        let scaled = native_amount / u128::from(self.scale_factor());
        if scaled > u128::from(MAX_SCALED_BALANCE) {
            return Err(CustodexError::Ledger(LedgerError::Overflow {
                asset: self.id,
            }));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(scaled as u64)
    }

    /// Convert a scaled ledger amount back to native units.
    ///
    /// Scaled balances are capped at [`MAX_SCALED_BALANCE`] and the scale
    /// exponent is bounded at registration, so the product fits `u128`.
    #[must_use]
    pub fn to_native(&self, scaled_amount: u64) -> u128 {
        u128::from(scaled_amount) * u128::from(self.scale_factor())
    }
}
