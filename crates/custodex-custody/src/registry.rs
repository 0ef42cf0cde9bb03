//! Asset registry — external asset id → compact index + decimal pair.
//!
//! Registration is write-once: neither the index binding nor the decimal pair
//! of a registered asset can ever change. There is no removal operation.

use std::collections::HashMap;

use custodex_types::constants::MAX_SCALE_EXPONENT;
use custodex_types::{Asset, AssetId, AssetIndex, CustodexError, RegistrationError, Result};

/// Registry of all tradable assets.
#[derive(Debug, Default, Clone)]
pub struct AssetRegistry {
    by_id: HashMap<AssetId, Asset>,
    by_index: HashMap<AssetIndex, AssetId>,
}

impl AssetRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset exactly once.
    ///
    /// # Errors
    /// - [`RegistrationError::BadDecimals`] if `internal_decimals` is zero,
    ///   exceeds `native_decimals`, or the scale exponent leaves the safe range
    /// - [`RegistrationError::IndexOccupied`] if `index` is already bound
    /// - [`RegistrationError::AlreadyRegistered`] if `id` was registered before
    pub fn register(
        &mut self,
        id: AssetId,
        index: AssetIndex,
        native_decimals: u32,
        internal_decimals: u32,
    ) -> Result<&Asset> {
        if internal_decimals == 0
            || internal_decimals > native_decimals
            || native_decimals - internal_decimals > MAX_SCALE_EXPONENT
        {
            return Err(CustodexError::Registration(RegistrationError::BadDecimals {
                asset: id,
                native_decimals,
                internal_decimals,
            }));
        }
        if self.by_id.contains_key(&id) {
            return Err(CustodexError::Registration(
                RegistrationError::AlreadyRegistered { asset: id },
            ));
        }
        if self.by_index.contains_key(&index) {
            return Err(CustodexError::Registration(
                RegistrationError::IndexOccupied { index },
            ));
        }

        let asset = Asset {
            id,
            index,
            native_decimals,
            internal_decimals,
        };
        self.by_index.insert(index, id);
        self.by_id.insert(id, asset);

        tracing::info!(
            asset = %id,
            index,
            native_decimals,
            internal_decimals,
            "Asset registered"
        );
        Ok(&self.by_id[&id])
    }

    /// Look up an asset by its external identifier.
    pub fn by_id(&self, id: AssetId) -> Result<&Asset> {
        self.by_id.get(&id).ok_or(CustodexError::Registration(
            RegistrationError::UnknownAsset { asset: id },
        ))
    }

    /// Look up an asset by its compact index.
    pub fn by_index(&self, index: AssetIndex) -> Result<&Asset> {
        let id = self.by_index.get(&index).ok_or(CustodexError::Registration(
            RegistrationError::UnknownAsset {
                asset: AssetId::NATIVE,
            },
        ))?;
        self.by_id(*id)
    }

    /// Number of registered assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(byte: u8) -> AssetId {
        AssetId([byte; 20])
    }

    #[test]
    fn register_and_lookup() {
        let mut reg = AssetRegistry::new();
        reg.register(AssetId::NATIVE, 0, 18, 9).unwrap();
        reg.register(token(1), 1, 18, 9).unwrap();

        let asset = reg.by_id(token(1)).unwrap();
        assert_eq!(asset.index, 1);
        assert_eq!(asset.scale_factor(), 1_000_000_000);
        assert_eq!(reg.by_index(0).unwrap().id, AssetId::NATIVE);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn zero_internal_decimals_rejected() {
        let mut reg = AssetRegistry::new();
        let err = reg.register(token(1), 1, 18, 0).unwrap_err();
        assert!(matches!(
            err,
            CustodexError::Registration(RegistrationError::BadDecimals { .. })
        ));
    }

    #[test]
    fn internal_above_native_rejected() {
        let mut reg = AssetRegistry::new();
        let err = reg.register(token(1), 1, 18, 20).unwrap_err();
        assert!(matches!(
            err,
            CustodexError::Registration(RegistrationError::BadDecimals { .. })
        ));
    }

    #[test]
    fn scale_exponent_bound() {
        let mut reg = AssetRegistry::new();
        // 33 - 10 = 23 > MAX_SCALE_EXPONENT
        let err = reg.register(token(1), 1, 33, 10).unwrap_err();
        assert!(matches!(
            err,
            CustodexError::Registration(RegistrationError::BadDecimals { .. })
        ));
        // 33 - 14 = 19 is the largest allowed exponent
        reg.register(token(1), 1, 33, 14).unwrap();
    }

    #[test]
    fn occupied_index_rejected() {
        let mut reg = AssetRegistry::new();
        reg.register(token(1), 1, 18, 9).unwrap();
        let err = reg.register(token(2), 1, 18, 9).unwrap_err();
        assert!(matches!(
            err,
            CustodexError::Registration(RegistrationError::IndexOccupied { index: 1 })
        ));
    }

    #[test]
    fn double_register_rejected() {
        let mut reg = AssetRegistry::new();
        reg.register(token(1), 1, 18, 9).unwrap();
        let err = reg.register(token(1), 2, 18, 9).unwrap_err();
        assert!(matches!(
            err,
            CustodexError::Registration(RegistrationError::AlreadyRegistered { .. })
        ));
    }

    #[test]
    fn unknown_lookups_fail() {
        let reg = AssetRegistry::new();
        assert!(reg.by_id(token(1)).is_err());
        assert!(reg.by_index(7).is_err());
    }
}
