//! Mempool Configuration
//!
//! Limits for the pending name-operation pool.

use serde::{Deserialize, Serialize};

/// Configuration for mempool admission checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    // =========================================================================
    // Size Limits
    // =========================================================================
    /// Maximum number of pending name transactions
    pub max_pending_ops: u32,
    /// Maximum number of pending commitments (`name_new`)
    pub max_pending_commitments: u32,

    // =========================================================================
    // Transaction Limits
    // =========================================================================
    /// Maximum number of inputs per transaction
    pub max_inputs: u16,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_pending_ops: 50_000,
            max_pending_commitments: 10_000,
            max_inputs: 256,
        }
    }
}

impl MempoolConfig {
    /// Create a permissive config for testing
    pub fn for_testing() -> Self {
        Self {
            max_pending_ops: u32::MAX,
            max_pending_commitments: u32::MAX,
            max_inputs: u16::MAX,
        }
    }
}
