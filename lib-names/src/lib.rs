//! Name Registration Layer
//!
//! Name lifecycle state machine layered on top of a UTXO ledger.
//!
//! # Lifecycle
//!
//! 1. **Commit** (`name_new`): publish `H(salt || name)` without revealing the name
//! 2. **Reveal** (`name_firstupdate`): after `min_maturity` confirmations,
//!    disclose name and salt and register the name
//! 3. **Update** (`name_update`): spend the name output to change the value,
//!    transfer ownership and renew the expiry window
//! 4. **Expire**: after `expiry_window` blocks without an update the name is
//!    free for anyone to register again
//!
//! All state here is derived from confirmed blocks and rebuilt by replay.
//! Node-local pool policy lives in `lib-mempool`.
//!
//! # Usage
//!
//! ```ignore
//! use lib_names::{HistoryLog, NameChainState, NameParams};
//!
//! let mut state = NameChainState::new(NameParams::regtest(), HistoryLog::disabled());
//! let outcome = state.connect_block(&block)?;
//! ```

pub mod commitment;
pub mod errors;
pub mod expiry;
pub mod history;
pub mod params;
pub mod state;
pub mod store;
pub mod types;
pub mod validate;

pub use commitment::{Commitment, CommitmentStatus, CommitmentTracker};
pub use errors::{ErrorTier, NameError, NameResult};
pub use expiry::{ExpiryEvent, RegistrationStatus};
pub use history::{HistoryEntry, HistoryLog, HistoryStore, MemoryHistoryStore};
pub use params::{
    Network, NameParams, DEFAULT_UNDO_DEPTH, MAX_NAME_LENGTH, MAX_VALUE_LENGTH, SALT_LENGTH,
};
pub use state::{BlockOutcome, NameChainState, StateSnapshot};
pub use store::{NameRecord, NameStore, RecordWrite};
pub use types::{CommitmentHash, Name, NameBlock, NameOp, NameOpKind, NameOutput, NameTx, NameValue, Salt};
pub use validate::{validate_name_tx, validate_stateful, validate_stateless, NameView, ValidatedOp};
