//! Name Mempool Admission
//!
//! Node-local policy for pending (unconfirmed) name operations.
//!
//! # Purpose
//!
//! Validation against confirmed state alone cannot see two pending
//! operations that both look valid but can never both be confirmed. The
//! pool keeps an index of pending operations per name and refuses to hold
//! operations that conflict with each other.
//!
//! # Checks Performed
//!
//! 1. **Identity**: the same transaction is never admitted twice
//! 2. **Validity**: the Operation Validator must accept the transaction at
//!    the height of the next block
//! 3. **Name conflicts**: at most one pending reveal or update per name
//! 4. **Commitment and input conflicts**: no two pending transactions carry
//!    the same commitment or spend the same outpoint, and no pending
//!    commitment repeats one already outstanding on chain
//! 5. **Bounded totals**: pending operation and commitment limits
//!
//! Rejections here are local policy, never consensus-final.
//!
//! # Usage
//!
//! ```ignore
//! use lib_mempool::{admit, AdmitResult, MempoolConfig, MempoolState};
//!
//! match admit(&tx, &chain_state, &config, &pool, chain_state.next_height()) {
//!     AdmitResult::Accepted => pool.add_tx(tx, chain_state.tip()),
//!     AdmitResult::Rejected(reason) => { /* report to caller */ }
//! }
//! ```

pub mod admission;
pub mod config;
pub mod state;
pub mod errors;

pub use admission::{admit, assemble_block, revalidate, AdmitResult};
pub use config::MempoolConfig;
pub use state::{MempoolState, PendingTx};
pub use errors::{AdmitError, AdmitErrorKind};
