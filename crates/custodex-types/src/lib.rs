//! # custodex-types
//!
//! Shared types, errors, and configuration for the **Custodex** settlement
//! ledger.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`AssetId`], [`AssetIndex`], [`SettlementId`]
//! - **Asset model**: [`Asset`] with decimal rescaling
//! - **Order model**: [`Order`], [`FeeSide`], [`Trade`], [`Batch`]
//! - **Event model**: [`SettlementEvent`] — the durable audit log
//! - **Configuration**: [`EngineConfig`]
//! - **Errors**: [`CustodexError`] and the per-subsystem error enums
//! - **Constants**: balance caps, nonce window sizing, native asset decimals

pub mod asset;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod order;

// Re-export all primary types at crate root for ergonomic imports:
//   use custodex_types::{Order, Trade, Batch, AccountId, ...};

pub use asset::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use order::*;

// Constants are accessed via `custodex_types::constants::FOO`
// (not re-exported to avoid name collisions).
