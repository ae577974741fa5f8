//! Structured error types for the name node
//!
//! Every operation on the node surface returns one of these. Each maps to
//! a stable RPC error code so callers can tell structural rejections from
//! state conflicts and local pool policy.

use thiserror::Error;
use lib_mempool::{AdmitError, AdmitErrorKind};
use lib_names::{ErrorTier, Name, NameError};

/// Invalid parameter (structural input errors)
pub const RPC_INVALID_PARAMETER: i32 = -8;
/// Rejected by validation or pool policy
pub const RPC_VERIFY_REJECTED: i32 = -25;
/// Requested object does not exist
pub const RPC_NOT_FOUND: i32 = -4;
/// Feature not available on this node
pub const RPC_MISC_ERROR: i32 = -1;
/// Option or parameter of the wrong JSON type
pub const RPC_TYPE_ERROR: i32 = -3;
/// Unparseable address
pub const RPC_INVALID_ADDRESS: i32 = -5;
/// JSON-RPC: method does not exist
pub const RPC_METHOD_NOT_FOUND: i32 = -32601;

/// Name node error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    Admission(#[from] AdmitError),

    #[error("this name exists already: {0}")]
    NameExists(Name),

    #[error("Expected type {expected} for {option}")]
    MalformedOption { option: String, expected: String },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Method not found: {0}")]
    UnknownMethod(String),
}

impl NodeError {
    pub fn malformed(option: impl Into<String>, expected: impl Into<String>) -> Self {
        NodeError::MalformedOption {
            option: option.into(),
            expected: expected.into(),
        }
    }

    pub fn invalid_parameter(reason: impl Into<String>) -> Self {
        NodeError::InvalidParameter(reason.into())
    }

    pub fn tier(&self) -> ErrorTier {
        match self {
            NodeError::Name(e) => e.tier(),
            NodeError::Admission(e) => e.tier(),
            NodeError::NameExists(_) => ErrorTier::StateConflict,
            NodeError::MalformedOption { .. }
            | NodeError::InvalidAddress(_)
            | NodeError::InvalidParameter(_)
            | NodeError::UnknownMethod(_) => ErrorTier::Structural,
        }
    }

    /// Stable JSON-RPC error code
    pub fn rpc_code(&self) -> i32 {
        match self {
            NodeError::Name(NameError::NameNotFound(_)) => RPC_NOT_FOUND,
            NodeError::Name(NameError::HistoryTrackingDisabled) => RPC_MISC_ERROR,
            NodeError::MalformedOption { .. } => RPC_TYPE_ERROR,
            NodeError::InvalidAddress(_) => RPC_INVALID_ADDRESS,
            NodeError::UnknownMethod(_) => RPC_METHOD_NOT_FOUND,
            _ => match self.tier() {
                ErrorTier::Structural => RPC_INVALID_PARAMETER,
                ErrorTier::StateConflict | ErrorTier::AdmissionPolicy => RPC_VERIFY_REJECTED,
            },
        }
    }
}

impl From<AdmitErrorKind> for NodeError {
    fn from(kind: AdmitErrorKind) -> Self {
        match kind {
            // Validator rejections surface exactly as direct validation would
            AdmitErrorKind::Invalid(e) => NodeError::Name(e),
            other => NodeError::Admission(AdmitError::new(other)),
        }
    }
}

/// Result type for node operations
pub type NodeResult<T> = Result<T, NodeError>;
