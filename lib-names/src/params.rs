//! Name Protocol Parameters
//!
//! Consensus constants for the name layer. Every validating node on a
//! network must use the same values.

use serde::{Deserialize, Serialize};

/// Hard protocol limit on name length in bytes
pub const MAX_NAME_LENGTH: usize = 256;

/// Hard protocol limit on value length in bytes
pub const MAX_VALUE_LENGTH: usize = 520;

/// Length of the random salt hidden in a commitment
pub const SALT_LENGTH: usize = 20;

/// Default number of recent blocks whose undo data a node keeps
pub const DEFAULT_UNDO_DEPTH: usize = 288;

/// Network a node is validating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Regtest,
}

/// Height-based windows of the name lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameParams {
    /// Blocks a registration stays active after its last refresh
    pub expiry_window: u64,
    /// Confirmations a commitment needs before it can be revealed
    pub min_maturity: u64,
    /// Confirmations after which an unrevealed commitment lapses
    pub max_reveal_window: u64,
}

impl NameParams {
    pub const fn mainnet() -> Self {
        Self {
            expiry_window: 36_000,
            min_maturity: 12,
            max_reveal_window: 36_000,
        }
    }

    /// Short expiry for functional testing
    pub const fn regtest() -> Self {
        Self {
            expiry_window: 30,
            min_maturity: 12,
            max_reveal_window: 36_000,
        }
    }

    pub const fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => Self::mainnet(),
            Network::Regtest => Self::regtest(),
        }
    }
}

impl Default for NameParams {
    fn default() -> Self {
        Self::mainnet()
    }
}
