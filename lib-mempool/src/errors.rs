//! Mempool Admission Errors

use thiserror::Error;
use lib_names::{CommitmentHash, ErrorTier, Name, NameError};
use lib_types::{OutPoint, TxHash};

/// Specific reason for admission rejection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmitErrorKind {
    // Pool conflicts
    #[error("this name is already being registered: {name}")]
    NameRegistrationConflict { name: Name },

    #[error("commitment {0} is already pending")]
    DuplicateCommitment(CommitmentHash),

    #[error("input {outpoint} is already spent by pending transaction {spent_by}")]
    InputAlreadySpent { outpoint: OutPoint, spent_by: TxHash },

    // Size errors
    #[error("too many inputs: {count}, max {max}")]
    TooManyInputs { count: usize, max: u16 },

    // Mempool capacity errors
    #[error("mempool full: {count} pending, max {max}")]
    MempoolFull { count: u32, max: u32 },

    #[error("too many pending commitments: {count}, max {max}")]
    CommitmentLimitReached { count: u32, max: u32 },

    // Validation errors
    #[error("{0}")]
    Invalid(NameError),

    #[error("transaction already in mempool")]
    DuplicateTransaction,
}

impl AdmitErrorKind {
    /// Validator rejections keep their own tier; everything else is pool policy
    pub fn tier(&self) -> ErrorTier {
        match self {
            AdmitErrorKind::Invalid(e) => e.tier(),
            _ => ErrorTier::AdmissionPolicy,
        }
    }
}

/// Error during mempool admission
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Admission rejected: {kind}")]
pub struct AdmitError {
    pub kind: AdmitErrorKind,
}

impl AdmitError {
    pub fn new(kind: AdmitErrorKind) -> Self {
        Self { kind }
    }

    pub fn name_conflict(name: Name) -> Self {
        Self::new(AdmitErrorKind::NameRegistrationConflict { name })
    }

    pub fn duplicate_commitment(hash: CommitmentHash) -> Self {
        Self::new(AdmitErrorKind::DuplicateCommitment(hash))
    }

    pub fn input_spent(outpoint: OutPoint, spent_by: TxHash) -> Self {
        Self::new(AdmitErrorKind::InputAlreadySpent { outpoint, spent_by })
    }

    pub fn mempool_full(count: u32, max: u32) -> Self {
        Self::new(AdmitErrorKind::MempoolFull { count, max })
    }

    pub fn invalid(error: NameError) -> Self {
        Self::new(AdmitErrorKind::Invalid(error))
    }

    pub fn duplicate() -> Self {
        Self::new(AdmitErrorKind::DuplicateTransaction)
    }

    pub fn tier(&self) -> ErrorTier {
        self.kind.tier()
    }
}

impl From<AdmitErrorKind> for AdmitError {
    fn from(kind: AdmitErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<NameError> for AdmitError {
    fn from(error: NameError) -> Self {
        Self::invalid(error)
    }
}
