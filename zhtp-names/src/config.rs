//! Node Configuration
//!
//! TOML configuration for the name node. Every field has a default, so an
//! empty file (or no file) yields a mainnet node without name history.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use lib_mempool::MempoolConfig;
use lib_names::{HistoryLog, NameParams, Network, DEFAULT_UNDO_DEPTH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Protocol constants to use
    pub network: Network,
    /// Keep per-name value history (node-local, no consensus effect)
    pub name_history: bool,
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Deepest reorg the node can undo
    pub undo_depth: usize,
    pub mempool: MempoolConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            name_history: false,
            log_level: "info".to_string(),
            undo_depth: DEFAULT_UNDO_DEPTH,
            mempool: MempoolConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Regtest node with a permissive pool
    pub fn regtest(name_history: bool) -> Self {
        Self {
            network: Network::Regtest,
            name_history,
            mempool: MempoolConfig::for_testing(),
            ..Self::default()
        }
    }

    pub fn params(&self) -> NameParams {
        NameParams::for_network(self.network)
    }

    pub fn history_log(&self) -> HistoryLog {
        HistoryLog::from_flag(self.name_history)
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<NodeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: NodeConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    tracing::info!(
        "Loaded config: network {:?}, name history {}",
        config.network,
        if config.name_history { "enabled" } else { "disabled" }
    );
    Ok(config)
}
