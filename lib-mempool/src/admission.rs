//! Mempool Admission Logic
//!
//! The `admit` function decides whether a name transaction may join the
//! pending pool. It never mutates anything; the caller adds accepted
//! transactions with [`MempoolState::add_tx`].

use lib_names::{validate_name_tx, NameError, NameOp, NameTx, NameView};
use lib_types::BlockHeight;
use tracing::debug;

use crate::config::MempoolConfig;
use crate::state::MempoolState;
use crate::errors::AdmitErrorKind;

/// Result of admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitResult {
    /// Transaction accepted into mempool
    Accepted,
    /// Transaction rejected with reason
    Rejected(AdmitErrorKind),
}

impl AdmitResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AdmitResult::Accepted)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, AdmitResult::Rejected(_))
    }
}

/// Perform mempool admission check
///
/// # Checks
///
/// 1. **Duplicate**: transaction not already pending
/// 2. **Input limit**: at most `max_inputs` inputs
/// 3. **Validity**: Operation Validator at `next_height` against `view`
/// 4. **Name conflict**: no other pending reveal/update for the same name
/// 5. **Commitment conflict**: no other pending `name_new` with the same hash
/// 6. **Input conflict**: no input already spent by a pending transaction
/// 7. **Bounded totals**: pending operation and commitment limits
///
/// # Arguments
///
/// * `tx` - Transaction to check
/// * `view` - Confirmed name state
/// * `config` - Mempool configuration
/// * `state` - Current mempool state
/// * `next_height` - Height of the block that would include `tx`
pub fn admit<V: NameView + ?Sized>(
    tx: &NameTx,
    view: &V,
    config: &MempoolConfig,
    state: &MempoolState,
    next_height: BlockHeight,
) -> AdmitResult {
    // =========================================================================
    // Check 1: Duplicate transaction
    // =========================================================================
    if state.contains(&tx.tx_hash) {
        return AdmitResult::Rejected(AdmitErrorKind::DuplicateTransaction);
    }

    // =========================================================================
    // Check 2: Input limit
    // =========================================================================
    if tx.inputs.len() > config.max_inputs as usize {
        return AdmitResult::Rejected(AdmitErrorKind::TooManyInputs {
            count: tx.inputs.len(),
            max: config.max_inputs,
        });
    }

    // =========================================================================
    // Check 3: Operation Validator against confirmed state
    // =========================================================================
    if let Err(e) = validate_name_tx(view, tx, next_height) {
        return AdmitResult::Rejected(AdmitErrorKind::Invalid(e));
    }

    // =========================================================================
    // Check 4-5: Pending conflicts on the name or commitment
    // =========================================================================
    match &tx.op {
        NameOp::New { commitment } => {
            if state.commitment_owner(commitment).is_some() {
                return AdmitResult::Rejected(AdmitErrorKind::DuplicateCommitment(*commitment));
            }
        }
        NameOp::FirstUpdate { name, .. } | NameOp::Update { name, .. } => {
            if state.has_pending_for_name(name) {
                return AdmitResult::Rejected(AdmitErrorKind::NameRegistrationConflict {
                    name: name.clone(),
                });
            }
        }
    }

    // =========================================================================
    // Check 6: Pending double spends
    // =========================================================================
    for input in &tx.inputs {
        if let Some(spent_by) = state.spender_of(input) {
            return AdmitResult::Rejected(AdmitErrorKind::InputAlreadySpent {
                outpoint: *input,
                spent_by,
            });
        }
    }

    // =========================================================================
    // Check 7: Mempool capacity (bounded totals)
    // =========================================================================
    if state.tx_count() >= config.max_pending_ops {
        return AdmitResult::Rejected(AdmitErrorKind::MempoolFull {
            count: state.tx_count(),
            max: config.max_pending_ops,
        });
    }

    if matches!(tx.op, NameOp::New { .. })
        && state.commitment_count() >= config.max_pending_commitments
    {
        return AdmitResult::Rejected(AdmitErrorKind::CommitmentLimitReached {
            count: state.commitment_count(),
            max: config.max_pending_commitments,
        });
    }

    AdmitResult::Accepted
}

/// Drop pending transactions that no longer validate at `next_height`
///
/// Returns each dropped transaction with the reason.
pub fn revalidate<V: NameView + ?Sized>(
    view: &V,
    state: &mut MempoolState,
    next_height: BlockHeight,
) -> Vec<(NameTx, NameError)> {
    let stale: Vec<(NameTx, NameError)> = state
        .iter()
        .filter_map(|p| {
            validate_name_tx(view, &p.tx, next_height)
                .err()
                .map(|e| (p.tx.clone(), e))
        })
        .collect();

    for (tx, reason) in &stale {
        state.remove_tx(&tx.tx_hash);
        debug!("Dropped pending {} {}: {}", tx.op.kind(), tx.tx_hash, reason);
    }
    stale
}

/// Pending transactions that validate at `height`, in admission order
///
/// Admission keeps pending operations mutually non-conflicting, so the
/// selection applies as a single block.
pub fn assemble_block<V: NameView + ?Sized>(
    view: &V,
    state: &MempoolState,
    height: BlockHeight,
) -> Vec<NameTx> {
    state
        .iter()
        .filter(|p| validate_name_tx(view, &p.tx, height).is_ok())
        .map(|p| p.tx.clone())
        .collect()
}
