//! # custodex-custody
//!
//! **Custody plane**: the state the settlement engine is built on.
//!
//! - [`AssetRegistry`] — external asset id → compact index + decimal rescaling
//! - [`BalanceLedger`] — per-(owner, asset) scaled balances with an overflow cap
//! - [`NonceWindow`] — block-windowed replay protection shared by deposits,
//!   withdrawals and order signatures
//! - [`WithdrawBook`] — pending withdrawal requests under challenge delay
//! - [`CustodyAdapter`] — the (potentially adversarial) interface to external
//!   value-transfer programs
//!
//! None of these components performs an external call or consults a clock on
//! its own; the engine in `custodex-settlement` sequences them and passes the
//! current block number in.

pub mod adapter;
pub mod ledger;
pub mod nonce;
pub mod registry;
pub mod withdraw;

pub use adapter::CustodyAdapter;
pub use ledger::BalanceLedger;
pub use nonce::NonceWindow;
pub use registry::AssetRegistry;
pub use withdraw::{WithdrawBook, WithdrawRequest};

#[cfg(any(test, feature = "test-helpers"))]
pub use adapter::testing::{AdapterConduct, MockAdapter};
