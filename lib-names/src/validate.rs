//! Operation Validator
//!
//! Decides whether a single name transaction is admissible at a height.
//! Validation NEVER mutates state; application is the store's job.
//!
//! # Validation Phases
//!
//! 1. **Stateless** - name and value length limits
//! 2. **Stateful** - commitment uniqueness, match and maturity, active-name
//!    and ownership checks against confirmed state

use lib_types::BlockHeight;

use crate::commitment::{Commitment, CommitmentTracker};
use crate::errors::{NameError, NameResult};
use crate::store::NameRecord;
use crate::types::{Name, NameOp, NameTx};

/// Read-only view of confirmed name state
pub trait NameView {
    /// Current record regardless of status
    fn lookup(&self, name: &Name) -> Option<&NameRecord>;

    fn commitments(&self) -> &CommitmentTracker;
}

/// What a valid transaction will do once applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedOp {
    Commit,
    /// Reveal consuming `commitment`
    Register { commitment: Commitment },
    /// Update of a record currently owned by `previous`
    Update { previous: NameRecord },
}

// =============================================================================
// Stateless Validation
// =============================================================================

/// Structural checks that need no chain state
pub fn validate_stateless(tx: &NameTx) -> NameResult<()> {
    match &tx.op {
        // Only a fixed-size hash is on chain
        NameOp::New { .. } => Ok(()),
        NameOp::FirstUpdate { name, value, .. } | NameOp::Update { name, value } => {
            name.check_length()?;
            value.check_length()
        }
    }
}

// =============================================================================
// Stateful Validation
// =============================================================================

/// Checks against confirmed state for inclusion at `height`
pub fn validate_stateful<V: NameView + ?Sized>(
    view: &V,
    tx: &NameTx,
    height: BlockHeight,
) -> NameResult<ValidatedOp> {
    match &tx.op {
        NameOp::New { commitment } => {
            if view.commitments().is_pending(commitment, height) {
                return Err(NameError::DuplicateCommitment(*commitment));
            }
            Ok(ValidatedOp::Commit)
        }

        NameOp::FirstUpdate { name, salt, .. } => {
            let commitment = view.commitments().find_match(name, salt, height)?;
            if !tx.spends(&commitment.output) {
                return Err(NameError::CommitmentNotFound(commitment.hash));
            }

            // An active registration always wins over a pending reveal
            if view.lookup(name).map(|r| r.is_active(height)).unwrap_or(false) {
                return Err(NameError::NameAlreadyActive(name.clone()));
            }

            Ok(ValidatedOp::Register {
                commitment: commitment.clone(),
            })
        }

        NameOp::Update { name, .. } => {
            let record = view
                .lookup(name)
                .filter(|r| r.is_active(height))
                .ok_or_else(|| NameError::NameNotRegistered(name.clone()))?;

            if !tx.spends(&record.owning_output) {
                return Err(NameError::OwnerInputMismatch {
                    name: name.clone(),
                    expected: record.owning_output,
                });
            }

            Ok(ValidatedOp::Update {
                previous: record.clone(),
            })
        }
    }
}

/// Full validation: stateless, then stateful
pub fn validate_name_tx<V: NameView + ?Sized>(
    view: &V,
    tx: &NameTx,
    height: BlockHeight,
) -> NameResult<ValidatedOp> {
    validate_stateless(tx)?;
    validate_stateful(view, tx, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use lib_types::{Address, OutPoint, TxHash};
    use crate::params::NameParams;
    use crate::types::{CommitmentHash, NameValue, Salt};

    struct MockView {
        records: BTreeMap<Name, NameRecord>,
        commitments: CommitmentTracker,
    }

    impl NameView for MockView {
        fn lookup(&self, name: &Name) -> Option<&NameRecord> {
            self.records.get(name)
        }

        fn commitments(&self) -> &CommitmentTracker {
            &self.commitments
        }
    }

    fn outpoint(byte: u8) -> OutPoint {
        OutPoint::new(TxHash::new([byte; 32]), 0)
    }

    fn view_with_commitment(name: &Name, salt: &Salt) -> MockView {
        let mut commitments = CommitmentTracker::new(NameParams::regtest());
        commitments
            .record_commitment(CommitmentHash::compute(name, salt), 100, outpoint(1))
            .unwrap();
        MockView {
            records: BTreeMap::new(),
            commitments,
        }
    }

    fn reveal(name: &Name, salt: Salt, value: &str) -> NameTx {
        NameTx::new(
            NameOp::FirstUpdate {
                name: name.clone(),
                salt,
                value: NameValue::from(value),
            },
            vec![outpoint(1)],
            Address::zero(),
            0,
        )
    }

    fn active_record(name: &Name) -> NameRecord {
        NameRecord {
            name: name.clone(),
            value: NameValue::from("taken"),
            txid: TxHash::new([5; 32]),
            owning_output: outpoint(5),
            owner: Address::zero(),
            registration_height: 100,
            expiration_height: 130,
        }
    }

    #[test]
    fn test_new_always_structurally_valid() {
        let tx = NameTx::new(
            NameOp::New { commitment: CommitmentHash::default() },
            vec![],
            Address::zero(),
            0,
        );
        let view = view_with_commitment(&Name::from("x"), &Salt::new([0; 20]));
        assert_eq!(validate_name_tx(&view, &tx, 1), Ok(ValidatedOp::Commit));
    }

    #[test]
    fn test_new_rejects_pending_commitment() {
        let name = Name::from("alpha");
        let salt = Salt::new([3; 20]);
        let view = view_with_commitment(&name, &salt);
        let hash = CommitmentHash::compute(&name, &salt);
        let tx = NameTx::new(NameOp::New { commitment: hash }, vec![], Address::zero(), 7);

        assert_eq!(
            validate_name_tx(&view, &tx, 101),
            Err(NameError::DuplicateCommitment(hash))
        );

        // Once the first commitment lapses the hash may be committed again
        let lapsed_at = 101 + NameParams::regtest().max_reveal_window;
        assert_eq!(validate_name_tx(&view, &tx, lapsed_at), Ok(ValidatedOp::Commit));
    }

    #[test]
    fn test_reveal_rules_in_order() {
        let name = Name::from("alpha");
        let salt = Salt::new([3; 20]);
        let view = view_with_commitment(&name, &salt);

        // Structural limits come first
        let mut tx = reveal(&name, salt, "v1");
        if let NameOp::FirstUpdate { value, .. } = &mut tx.op {
            *value = NameValue::new(vec![0u8; 521]);
        }
        assert!(matches!(
            validate_name_tx(&view, &tx, 112),
            Err(NameError::ValueTooLong { .. })
        ));

        let tx = reveal(&name, salt, "v1");
        assert!(matches!(
            validate_name_tx(&view, &tx, 111),
            Err(NameError::CommitmentNotMature { .. })
        ));
        assert!(matches!(
            validate_name_tx(&view, &tx, 112),
            Ok(ValidatedOp::Register { .. })
        ));
    }

    #[test]
    fn test_reveal_wrong_name() {
        let name = Name::from("test-name");
        let salt = Salt::new([3; 20]);
        let view = view_with_commitment(&name, &salt);
        let tx = reveal(&Name::from("test-name-wrong"), salt, "value");
        assert!(matches!(
            validate_name_tx(&view, &tx, 200),
            Err(NameError::CommitmentNotFound(_))
        ));
    }

    #[test]
    fn test_reveal_must_spend_commitment_output() {
        let name = Name::from("alpha");
        let salt = Salt::new([3; 20]);
        let view = view_with_commitment(&name, &salt);
        let mut tx = reveal(&name, salt, "v1");
        tx.inputs = vec![outpoint(9)];
        assert!(matches!(
            validate_name_tx(&view, &tx, 200),
            Err(NameError::CommitmentNotFound(_))
        ));
    }

    #[test]
    fn test_active_name_beats_valid_commitment() {
        let name = Name::from("alpha");
        let salt = Salt::new([3; 20]);
        let mut view = view_with_commitment(&name, &salt);
        view.records.insert(name.clone(), active_record(&name));

        let tx = reveal(&name, salt, "stolen");
        assert_eq!(
            validate_name_tx(&view, &tx, 129),
            Err(NameError::NameAlreadyActive(name.clone()))
        );
        assert!(validate_name_tx(&view, &tx, 130).is_ok());
    }

    #[test]
    fn test_update_rules() {
        let name = Name::from("alpha");
        let mut view = view_with_commitment(&name, &Salt::new([3; 20]));
        let update = |inputs| {
            NameTx::new(
                NameOp::Update {
                    name: name.clone(),
                    value: NameValue::from("v2"),
                },
                inputs,
                Address::zero(),
                0,
            )
        };

        assert_eq!(
            validate_name_tx(&view, &update(vec![outpoint(5)]), 120),
            Err(NameError::NameNotRegistered(name.clone()))
        );

        view.records.insert(name.clone(), active_record(&name));
        assert!(matches!(
            validate_name_tx(&view, &update(vec![outpoint(5)]), 120),
            Ok(ValidatedOp::Update { .. })
        ));
        assert!(matches!(
            validate_name_tx(&view, &update(vec![outpoint(6)]), 120),
            Err(NameError::OwnerInputMismatch { .. })
        ));
        assert_eq!(
            validate_name_tx(&view, &update(vec![outpoint(5)]), 130),
            Err(NameError::NameNotRegistered(name.clone()))
        );
    }
}
