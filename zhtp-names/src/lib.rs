//! ZHTP Name Node
//!
//! Ties the name layer together: confirmed chain state from `lib-names`,
//! the pending pool from `lib-mempool`, node configuration, and a JSON-RPC
//! style surface (`name_new`, `name_firstupdate`, `name_update`,
//! `name_show`, `name_history`, `name_pending`, `name_scan`).

pub mod config;
pub mod errors;
pub mod node;
pub mod rpc;

pub use config::{load_config, NodeConfig};
pub use errors::{NodeError, NodeResult};
pub use node::{CommitmentHandle, NameInfo, NameNode, NameOptions, PendingOp};
