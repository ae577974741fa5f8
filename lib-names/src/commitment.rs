//! Commitment Tracker
//!
//! Outstanding `name_new` commitments waiting to be revealed.
//!
//! # Lifecycle
//!
//! 1. **Immature**: fewer than `min_maturity` confirmations
//! 2. **Revealable**: may be consumed by exactly one matching reveal
//! 3. **Lapsed**: more than `max_reveal_window` confirmations; inert and
//!    eligible for garbage collection

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;
use lib_types::{BlockHeight, OutPoint};

use crate::errors::{NameError, NameResult};
use crate::params::NameParams;
use crate::types::{CommitmentHash, Name, Salt};

/// Pending intent to register a hidden name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub hash: CommitmentHash,
    pub creation_height: BlockHeight,
    /// Output carrying the commitment; the reveal must spend it
    pub output: OutPoint,
}

/// Phase of a commitment at a given height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitmentStatus {
    Immature { matures_at: BlockHeight },
    Revealable { lapses_after: BlockHeight },
    Lapsed,
}

impl Commitment {
    pub fn confirmations(&self, height: BlockHeight) -> u64 {
        height.saturating_sub(self.creation_height)
    }

    pub fn status(&self, height: BlockHeight, params: &NameParams) -> CommitmentStatus {
        let confirmations = self.confirmations(height);
        if confirmations < params.min_maturity {
            CommitmentStatus::Immature {
                matures_at: self.creation_height.saturating_add(params.min_maturity),
            }
        } else if confirmations <= params.max_reveal_window {
            CommitmentStatus::Revealable {
                lapses_after: self.creation_height.saturating_add(params.max_reveal_window),
            }
        } else {
            CommitmentStatus::Lapsed
        }
    }
}

/// Chain-derived set of pending commitments
#[derive(Debug, Clone)]
pub struct CommitmentTracker {
    params: NameParams,
    pending: BTreeMap<CommitmentHash, Commitment>,
    /// Creation height to the commitments created there
    by_height: BTreeMap<BlockHeight, BTreeSet<CommitmentHash>>,
}

impl CommitmentTracker {
    pub fn new(params: NameParams) -> Self {
        Self {
            params,
            pending: BTreeMap::new(),
            by_height: BTreeMap::new(),
        }
    }

    fn insert(&mut self, commitment: Commitment) -> Option<Commitment> {
        let (hash, height) = (commitment.hash, commitment.creation_height);
        let previous = self.pending.insert(hash, commitment);
        if let Some(prev) = &previous {
            self.unindex(prev);
        }
        self.by_height.entry(height).or_default().insert(hash);
        previous
    }

    fn unindex(&mut self, commitment: &Commitment) {
        if let Some(hashes) = self.by_height.get_mut(&commitment.creation_height) {
            hashes.remove(&commitment.hash);
            if hashes.is_empty() {
                self.by_height.remove(&commitment.creation_height);
            }
        }
    }

    pub fn get(&self, hash: &CommitmentHash) -> Option<&Commitment> {
        self.pending.get(hash)
    }

    /// Whether `hash` is pending and has not lapsed at `height`
    pub fn is_pending(&self, hash: &CommitmentHash, height: BlockHeight) -> bool {
        self.pending
            .get(hash)
            .map(|c| c.status(height, &self.params) != CommitmentStatus::Lapsed)
            .unwrap_or(false)
    }

    /// Register a new commitment
    ///
    /// A lapsed commitment with the same hash is replaced and returned so the
    /// caller can restore it on undo.
    pub fn record_commitment(
        &mut self,
        hash: CommitmentHash,
        height: BlockHeight,
        output: OutPoint,
    ) -> NameResult<Option<Commitment>> {
        if self.is_pending(&hash, height) {
            return Err(NameError::DuplicateCommitment(hash));
        }

        let commitment = Commitment {
            hash,
            creation_height: height,
            output,
        };
        debug!("Recorded commitment {} at height {}", hash, height);
        Ok(self.insert(commitment))
    }

    /// Find the revealable commitment for `(name, salt)` without consuming it
    pub fn find_match(
        &self,
        name: &Name,
        salt: &Salt,
        height: BlockHeight,
    ) -> NameResult<&Commitment> {
        let hash = CommitmentHash::compute(name, salt);
        let commitment = self
            .pending
            .get(&hash)
            .ok_or(NameError::CommitmentNotFound(hash))?;

        match commitment.status(height, &self.params) {
            CommitmentStatus::Immature { .. } => Err(NameError::CommitmentNotMature {
                hash,
                confirmations: commitment.confirmations(height),
                required: self.params.min_maturity,
            }),
            CommitmentStatus::Revealable { .. } => Ok(commitment),
            CommitmentStatus::Lapsed => Err(NameError::CommitmentNotFound(hash)),
        }
    }

    /// Match and remove the commitment for `(name, salt)`
    pub fn match_and_consume(
        &mut self,
        name: &Name,
        salt: &Salt,
        height: BlockHeight,
    ) -> NameResult<Commitment> {
        let hash = self.find_match(name, salt, height)?.hash;
        self.remove(&hash).ok_or(NameError::CommitmentNotFound(hash))
    }

    /// Drop every commitment that has lapsed at `height`
    ///
    /// Only commitments created before `height - max_reveal_window` are
    /// visited.
    pub fn prune_lapsed(&mut self, height: BlockHeight) -> Vec<Commitment> {
        let cutoff = match height.checked_sub(self.params.max_reveal_window) {
            Some(cutoff) => cutoff,
            None => return Vec::new(),
        };
        let lapsed: Vec<CommitmentHash> = self
            .by_height
            .range(..cutoff)
            .flat_map(|(_, hashes)| hashes.iter().copied())
            .collect();

        lapsed.iter().filter_map(|hash| self.remove(hash)).collect()
    }

    pub fn remove(&mut self, hash: &CommitmentHash) -> Option<Commitment> {
        let commitment = self.pending.remove(hash)?;
        self.unindex(&commitment);
        Some(commitment)
    }

    /// Put back a commitment removed by a block being undone
    pub fn restore(&mut self, commitment: Commitment) {
        self.insert(commitment);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Commitment> {
        self.pending.values()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_types::TxHash;

    fn outpoint(byte: u8) -> OutPoint {
        OutPoint::new(TxHash::new([byte; 32]), 0)
    }

    fn setup() -> (CommitmentTracker, Name, Salt, CommitmentHash) {
        let tracker = CommitmentTracker::new(NameParams::regtest());
        let name = Name::from("alpha");
        let salt = Salt::new([9u8; 20]);
        let hash = CommitmentHash::compute(&name, &salt);
        (tracker, name, salt, hash)
    }

    #[test]
    fn test_reveal_after_maturity() {
        let (mut tracker, name, salt, hash) = setup();
        tracker.record_commitment(hash, 100, outpoint(1)).unwrap();

        assert!(matches!(
            tracker.match_and_consume(&name, &salt, 111),
            Err(NameError::CommitmentNotMature { confirmations: 11, required: 12, .. })
        ));

        let consumed = tracker.match_and_consume(&name, &salt, 112).unwrap();
        assert_eq!(consumed.hash, hash);
        assert!(tracker.is_empty());

        // Never reused
        assert_eq!(
            tracker.match_and_consume(&name, &salt, 113),
            Err(NameError::CommitmentNotFound(hash))
        );
    }

    #[test]
    fn test_wrong_name_not_found() {
        let (mut tracker, _, salt, hash) = setup();
        tracker.record_commitment(hash, 100, outpoint(1)).unwrap();

        let wrong = Name::from("alpha-wrong");
        assert!(matches!(
            tracker.match_and_consume(&wrong, &salt, 200),
            Err(NameError::CommitmentNotFound(_))
        ));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_duplicate_commitment() {
        let (mut tracker, _, _, hash) = setup();
        tracker.record_commitment(hash, 100, outpoint(1)).unwrap();
        assert_eq!(
            tracker.record_commitment(hash, 101, outpoint(2)),
            Err(NameError::DuplicateCommitment(hash))
        );
    }

    #[test]
    fn test_lapsed_commitment() {
        let (mut tracker, name, salt, hash) = setup();
        tracker.record_commitment(hash, 100, outpoint(1)).unwrap();
        let window = NameParams::regtest().max_reveal_window;

        assert!(tracker.find_match(&name, &salt, 100 + window).is_ok());
        assert_eq!(
            tracker.find_match(&name, &salt, 101 + window),
            Err(NameError::CommitmentNotFound(hash))
        );

        // A lapsed duplicate is replaced rather than rejected
        let replaced = tracker
            .record_commitment(hash, 101 + window, outpoint(2))
            .unwrap();
        assert_eq!(replaced.map(|c| c.creation_height), Some(100));
    }

    #[test]
    fn test_prune_lapsed() {
        let (mut tracker, _, _, hash) = setup();
        let other = CommitmentHash::compute(&Name::from("beta"), &Salt::new([1u8; 20]));
        tracker.record_commitment(hash, 100, outpoint(1)).unwrap();
        tracker.record_commitment(other, 5_000, outpoint(2)).unwrap();

        let window = NameParams::regtest().max_reveal_window;
        let pruned = tracker.prune_lapsed(101 + window);
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].hash, hash);
        assert!(tracker.get(&other).is_some());

        tracker.restore(pruned[0].clone());
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_prune_boundary_matches_status() {
        let params = NameParams::regtest();
        let mut tracker = CommitmentTracker::new(params);
        for (i, height) in [10u64, 11, 12].iter().enumerate() {
            let hash = CommitmentHash::compute(&Name::from("n"), &Salt::new([i as u8; 20]));
            tracker.record_commitment(hash, *height, outpoint(i as u8)).unwrap();
        }

        // Nothing lapses before the window has passed
        assert!(tracker.prune_lapsed(params.max_reveal_window).is_empty());

        let at = 11 + params.max_reveal_window;
        let pruned = tracker.prune_lapsed(at);
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].creation_height, 10);
        for commitment in tracker.iter() {
            assert_ne!(commitment.status(at, &params), CommitmentStatus::Lapsed);
        }

        // Removal keeps the height index in step
        let remaining: Vec<CommitmentHash> = tracker.iter().map(|c| c.hash).collect();
        for hash in &remaining {
            tracker.remove(hash);
        }
        assert!(tracker.prune_lapsed(u64::MAX).is_empty());
    }

    #[test]
    fn test_status_phases() {
        let params = NameParams::regtest();
        let commitment = Commitment {
            hash: CommitmentHash::default(),
            creation_height: 100,
            output: outpoint(1),
        };
        assert_eq!(
            commitment.status(105, &params),
            CommitmentStatus::Immature { matures_at: 112 }
        );
        assert!(matches!(
            commitment.status(112, &params),
            CommitmentStatus::Revealable { .. }
        ));
        assert_eq!(
            commitment.status(100 + params.max_reveal_window + 1, &params),
            CommitmentStatus::Lapsed
        );
    }
}
