//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::ids::{AccountId, SettlementId};

/// Configuration of one settlement ledger deployment. Fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deployment identity, mixed into every order digest.
    pub settlement_id: SettlementId,
    /// Block at which the ledger was deployed; origin of the nonce space.
    pub deployment_block: u64,
    /// Withdrawal challenge delay in blocks.
    pub wait_blocks: u64,
    /// Account credited with trade fees.
    pub fee_account: AccountId,
}

impl EngineConfig {
    /// Config with the default challenge delay.
    #[must_use]
    pub fn new(settlement_id: SettlementId, deployment_block: u64, fee_account: AccountId) -> Self {
        Self {
            settlement_id,
            deployment_block,
            wait_blocks: constants::DEFAULT_WAIT_BLOCKS,
            fee_account,
        }
    }

    #[must_use]
    pub fn with_wait_blocks(mut self, wait_blocks: u64) -> Self {
        self.wait_blocks = wait_blocks;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_wait_blocks() {
        let cfg = EngineConfig::new(SettlementId([0u8; 32]), 100, AccountId([9u8; 32]));
        assert_eq!(cfg.wait_blocks, constants::DEFAULT_WAIT_BLOCKS);
        assert_eq!(cfg.deployment_block, 100);
    }

    #[test]
    fn wait_blocks_override() {
        let cfg = EngineConfig::new(SettlementId([0u8; 32]), 0, AccountId([9u8; 32]))
            .with_wait_blocks(3);
        assert_eq!(cfg.wait_blocks, 3);
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = EngineConfig::new(SettlementId([7u8; 32]), 5, AccountId([1u8; 32]));
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.settlement_id, back.settlement_id);
        assert_eq!(cfg.wait_blocks, back.wait_blocks);
    }
}
