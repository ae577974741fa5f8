//! Name Layer Errors
//!
//! Every rejection is a typed value; nothing here is fatal to the node.

use thiserror::Error;
use lib_types::{BlockHeight, OutPoint};

use crate::types::{CommitmentHash, Name};

/// How a rejection should be treated by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTier {
    /// Rejected before any state is consulted; identical on every node
    Structural,
    /// Deterministic against confirmed chain state; may succeed later
    StateConflict,
    /// Node-local pool policy; never a consensus-final rejection
    AdmissionPolicy,
}

/// Error raised by name validation or state application
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    // =========================================================================
    // Structural Errors
    // =========================================================================

    #[error("name is empty")]
    EmptyName,

    #[error("name is too long: {len} bytes, max {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("value is too long: {len} bytes, max {max}")]
    ValueTooLong { len: usize, max: usize },

    #[error("invalid block height: expected {expected}, got {actual}")]
    InvalidBlockHeight { expected: BlockHeight, actual: BlockHeight },

    // =========================================================================
    // State Conflict Errors
    // =========================================================================

    #[error("this name is already active: {0}")]
    NameAlreadyActive(Name),

    #[error("this name can not be updated: {0} is not registered")]
    NameNotRegistered(Name),

    #[error("update of {name} does not spend the name output {expected}")]
    OwnerInputMismatch { name: Name, expected: OutPoint },

    #[error("rand value is wrong: no pending commitment {0}")]
    CommitmentNotFound(CommitmentHash),

    #[error("name not mature: commitment {hash} has {confirmations} confirmations, needs {required}")]
    CommitmentNotMature {
        hash: CommitmentHash,
        confirmations: u64,
        required: u64,
    },

    #[error("commitment {0} is already pending")]
    DuplicateCommitment(CommitmentHash),

    #[error("no block to disconnect")]
    NothingToDisconnect,

    // =========================================================================
    // Query Errors
    // =========================================================================

    #[error("name not found: {0}")]
    NameNotFound(Name),

    #[error("namehistory is not enabled")]
    HistoryTrackingDisabled,
}

impl NameError {
    /// Classify this error into its handling tier
    pub fn tier(&self) -> ErrorTier {
        match self {
            NameError::EmptyName
            | NameError::NameTooLong { .. }
            | NameError::ValueTooLong { .. }
            | NameError::InvalidBlockHeight { .. } => ErrorTier::Structural,
            _ => ErrorTier::StateConflict,
        }
    }
}

/// Result type for name operations
pub type NameResult<T> = Result<T, NameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers() {
        assert_eq!(NameError::EmptyName.tier(), ErrorTier::Structural);
        assert_eq!(
            NameError::ValueTooLong { len: 521, max: 520 }.tier(),
            ErrorTier::Structural
        );
        assert_eq!(
            NameError::NameAlreadyActive(Name::from("a")).tier(),
            ErrorTier::StateConflict
        );
        assert_eq!(
            NameError::CommitmentNotFound(CommitmentHash::default()).tier(),
            ErrorTier::StateConflict
        );
    }

    #[test]
    fn test_operator_messages() {
        let err = NameError::CommitmentNotFound(CommitmentHash::default());
        assert!(err.to_string().contains("rand value is wrong"));

        let err = NameError::NameTooLong { len: 257, max: 256 };
        assert!(err.to_string().contains("name is too long"));
    }
}
