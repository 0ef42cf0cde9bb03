//! System-wide constants for the Custodex settlement ledger.

/// Number of nonces addressable per logical block. The first valid nonce at
/// block `b` is `(b - deployment_block) * NONCES_PER_BLOCK`.
pub const NONCES_PER_BLOCK: u64 = 1024;

/// Maximum scaled balance any account may hold in a single asset.
///
/// Chosen so that the cross-rate product of two order amounts fits `u128`
/// with plenty of headroom (`10^18 * 10^18 = 10^36 < 2^127`).
pub const MAX_SCALED_BALANCE: u64 = 1_000_000_000_000_000_000;

/// Maximum allowed `native_decimals - internal_decimals` difference, i.e. the
/// largest exponent a scale factor may carry. `10^19` still fits `u64`, and
/// `MAX_SCALED_BALANCE * 10^19` still fits `u128`.
pub const MAX_SCALE_EXPONENT: u32 = 19;

/// Native asset precision on the external chain.
pub const NATIVE_DECIMALS: u32 = 18;

/// Internal ledger precision for the native asset.
pub const NATIVE_INTERNAL_DECIMALS: u32 = 9;

/// Asset index reserved for the chain's native asset.
pub const NATIVE_ASSET_INDEX: u16 = 0;

/// Default withdrawal challenge delay, in blocks.
pub const DEFAULT_WAIT_BLOCKS: u64 = 12;

/// A used-nonce mark may only be erased once it trails the validity floor by
/// at least this many nonces (one full block window). Guarantees no future
/// validity check can ever reach an erased mark.
pub const NONCE_ERASE_MARGIN: u64 = NONCES_PER_BLOCK;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Custodex";
