//! Identifiers used throughout Custodex.
//!
//! Accounts are identified by their raw ed25519 verifying key, assets by the
//! 20-byte address of their external value-transfer program.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Compact index an asset receives at registration time. Index 0 is reserved
/// for the chain's native asset.
pub type AssetIndex = u16;

/// Nonces and block numbers share the same unsigned counter width.
pub type Nonce = u64;

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// Unique identifier for an account: the raw ed25519 verifying key (32 bytes).
///
/// Order signatures are checked against this key, so an `AccountId` is an
/// unforgeable identity — nobody can produce valid orders for an account
/// without its signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    #[must_use]
    pub fn from_pubkey(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acct:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// External identifier of a tradable asset: the address of its value-transfer
/// program. The all-zero address denotes the chain's native asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AssetId(pub [u8; 20]);

impl AssetId {
    /// The chain's native asset.
    pub const NATIVE: Self = Self([0u8; 20]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the native asset identifier.
    #[must_use]
    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            write!(f, "asset:native")
        } else {
            write!(f, "asset:{}", hex::encode(self.0))
        }
    }
}

// ---------------------------------------------------------------------------
// SettlementId
// ---------------------------------------------------------------------------

/// Identity of one settlement ledger deployment.
///
/// Mixed into every order digest so a signed order is only valid against the
/// deployment it was written for — orders cannot be replayed across ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SettlementId(pub [u8; 32]);

impl SettlementId {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ledger:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
