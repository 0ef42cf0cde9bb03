//! # custodex-settlement
//!
//! The settlement plane of the Custodex ledger: order validation and the
//! engine that applies deposits, withdrawals and atomic trade batches.
//!
//! - [`validate`] checks signatures, resolves assets and rescales amounts
//! - [`engine`] owns the custody state and serializes every mutation

pub mod engine;
pub mod validate;

pub use engine::SettlementEngine;
pub use validate::{ScaledOrder, validate_order, validate_pair, verify_order_signature};
