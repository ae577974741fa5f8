//! Mempool State
//!
//! Pending name transactions plus the indexes admission checks need:
//! by name, by commitment hash and by spent outpoint.
//!
//! This state is node-local. Nothing in the confirmed name state depends on
//! it, and replaying the chain never touches it.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;
use lib_names::{BlockOutcome, CommitmentHash, ExpiryEvent, Name, NameBlock, NameOp, NameOpKind, NameTx};
use lib_types::{BlockHeight, OutPoint, TxHash};

/// A transaction waiting in the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTx {
    pub tx: NameTx,
    /// Chain tip when the transaction was admitted
    pub admitted_at: BlockHeight,
    sequence: u64,
}

/// Current state of the mempool for admission checks
#[derive(Debug, Clone, Default)]
pub struct MempoolState {
    txs: HashMap<TxHash, PendingTx>,
    /// Admission order
    order: BTreeMap<u64, TxHash>,
    next_sequence: u64,
    /// Pending reveals and updates per name
    by_name: HashMap<Name, BTreeSet<TxHash>>,
    by_commitment: HashMap<CommitmentHash, TxHash>,
    spent: HashMap<OutPoint, TxHash>,
    commitment_count: u32,
}

impl MempoolState {
    /// Create empty mempool state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, tx_hash: &TxHash) -> bool {
        self.txs.contains_key(tx_hash)
    }

    pub fn get(&self, tx_hash: &TxHash) -> Option<&PendingTx> {
        self.txs.get(tx_hash)
    }

    /// Current transaction count
    pub fn tx_count(&self) -> u32 {
        self.txs.len() as u32
    }

    /// Pending `name_new` count
    pub fn commitment_count(&self) -> u32 {
        self.commitment_count
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Whether any pending reveal or update targets `name`
    pub fn has_pending_for_name(&self, name: &Name) -> bool {
        self.by_name.get(name).map(|set| !set.is_empty()).unwrap_or(false)
    }

    /// Pending transactions targeting `name`, in admission order
    pub fn pending_for_name(&self, name: &Name) -> Vec<&PendingTx> {
        let mut pending: Vec<&PendingTx> = self
            .by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|hash| self.txs.get(hash))
            .collect();
        pending.sort_by_key(|p| p.sequence);
        pending
    }

    /// Pending transaction carrying `commitment`, if any
    pub fn commitment_owner(&self, commitment: &CommitmentHash) -> Option<TxHash> {
        self.by_commitment.get(commitment).copied()
    }

    /// Pending transaction spending `outpoint`, if any
    pub fn spender_of(&self, outpoint: &OutPoint) -> Option<TxHash> {
        self.spent.get(outpoint).copied()
    }

    /// All pending transactions in admission order
    pub fn iter(&self) -> impl Iterator<Item = &PendingTx> {
        self.order.values().filter_map(move |hash| self.txs.get(hash))
    }

    /// Record a transaction being added to mempool
    ///
    /// Admission checks are the caller's job; see [`crate::admit`].
    pub fn add_tx(&mut self, tx: NameTx, admitted_at: BlockHeight) {
        let hash = tx.tx_hash;
        if self.txs.contains_key(&hash) {
            return;
        }

        match &tx.op {
            NameOp::New { commitment } => {
                self.by_commitment.insert(*commitment, hash);
                self.commitment_count = self.commitment_count.saturating_add(1);
            }
            NameOp::FirstUpdate { name, .. } | NameOp::Update { name, .. } => {
                self.by_name.entry(name.clone()).or_default().insert(hash);
            }
        }
        for input in &tx.inputs {
            self.spent.insert(*input, hash);
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.order.insert(sequence, hash);
        self.txs.insert(
            hash,
            PendingTx {
                tx,
                admitted_at,
                sequence,
            },
        );
    }

    /// Record a transaction being removed from mempool
    pub fn remove_tx(&mut self, tx_hash: &TxHash) -> Option<NameTx> {
        let pending = self.txs.remove(tx_hash)?;
        self.order.remove(&pending.sequence);

        match &pending.tx.op {
            NameOp::New { commitment } => {
                if self.by_commitment.get(commitment) == Some(tx_hash) {
                    self.by_commitment.remove(commitment);
                }
                self.commitment_count = self.commitment_count.saturating_sub(1);
            }
            NameOp::FirstUpdate { name, .. } | NameOp::Update { name, .. } => {
                if let Some(set) = self.by_name.get_mut(name) {
                    set.remove(tx_hash);
                    // Remove entry if empty
                    if set.is_empty() {
                        self.by_name.remove(name);
                    }
                }
            }
        }
        for input in &pending.tx.inputs {
            if self.spent.get(input) == Some(tx_hash) {
                self.spent.remove(input);
            }
        }

        Some(pending.tx)
    }

    /// Remove every pending transaction for `name`
    pub fn remove_for_name(&mut self, name: &Name) -> Vec<NameTx> {
        self.remove_for_name_where(name, |_| true)
    }

    fn remove_for_name_where(&mut self, name: &Name, keep: impl Fn(&NameTx) -> bool) -> Vec<NameTx> {
        let hashes: Vec<TxHash> = self
            .pending_for_name(name)
            .into_iter()
            .filter(|p| keep(&p.tx))
            .map(|p| p.tx.tx_hash)
            .collect();
        hashes.iter().filter_map(|hash| self.remove_tx(hash)).collect()
    }

    // =========================================================================
    // Block Connect
    // =========================================================================

    /// Drop everything the connected `block` settles or invalidates
    ///
    /// Removes the included transactions, all pending operations for names
    /// the block wrote, pending commitments the block confirmed through a
    /// different transaction, pending spends of outpoints the block spent,
    /// and pending updates of names that expired at this height.
    ///
    /// Returns the evicted transactions that were *not* included in the
    /// block; the caller re-validates them from scratch.
    pub fn evict_for_block(&mut self, block: &NameBlock, outcome: &BlockOutcome) -> Vec<NameTx> {
        let mut included = 0usize;
        for tx in &block.txs {
            if self.remove_tx(&tx.tx_hash).is_some() {
                included += 1;
            }
        }

        let mut evicted = Vec::new();
        for name in outcome.touched_names() {
            evicted.extend(self.remove_for_name(name));
        }

        for commitment in &outcome.commitments {
            if let Some(hash) = self.commitment_owner(commitment) {
                evicted.extend(self.remove_tx(&hash));
            }
        }

        for input in block.txs.iter().flat_map(|tx| tx.inputs.iter()) {
            if let Some(hash) = self.spender_of(input) {
                evicted.extend(self.remove_tx(&hash));
            }
        }

        for event in &outcome.expiry_events {
            if let ExpiryEvent::Expired { name, .. } = event {
                evicted.extend(
                    self.remove_for_name_where(name, |tx| tx.op.kind() == NameOpKind::Update),
                );
            }
        }

        debug!(
            "Block {}: removed {} included, evicted {} pending name txs",
            block.height,
            included,
            evicted.len()
        );
        evicted
    }

    /// Clear all state, returning the pending transactions in admission order
    pub fn clear(&mut self) -> Vec<NameTx> {
        let order = std::mem::take(&mut self.order);
        let mut txs = std::mem::take(&mut self.txs);
        self.by_name.clear();
        self.by_commitment.clear();
        self.spent.clear();
        self.commitment_count = 0;
        order.values().filter_map(|hash| txs.remove(hash)).map(|p| p.tx).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_names::{NameValue, Salt};
    use lib_types::Address;

    fn commit(name: &str, nonce: u64) -> NameTx {
        let commitment = CommitmentHash::compute(&Name::from(name), &Salt::new([nonce as u8; 20]));
        NameTx::new(NameOp::New { commitment }, vec![], Address::zero(), nonce)
    }

    fn update(name: &str, input: OutPoint, nonce: u64) -> NameTx {
        NameTx::new(
            NameOp::Update {
                name: Name::from(name),
                value: NameValue::from("v"),
            },
            vec![input],
            Address::zero(),
            nonce,
        )
    }

    fn outpoint(byte: u8) -> OutPoint {
        OutPoint::new(TxHash::new([byte; 32]), 0)
    }

    #[test]
    fn test_add_remove_tx() {
        let mut state = MempoolState::new();
        let new_tx = commit("alpha", 1);
        let upd = update("beta", outpoint(1), 2);

        state.add_tx(new_tx.clone(), 10);
        state.add_tx(upd.clone(), 10);
        assert_eq!(state.tx_count(), 2);
        assert_eq!(state.commitment_count(), 1);
        assert!(state.has_pending_for_name(&Name::from("beta")));
        assert_eq!(state.spender_of(&outpoint(1)), Some(upd.tx_hash));

        assert_eq!(state.remove_tx(&upd.tx_hash), Some(upd.clone()));
        assert!(!state.has_pending_for_name(&Name::from("beta")));
        assert_eq!(state.spender_of(&outpoint(1)), None);
        assert_eq!(state.tx_count(), 1);
        assert_eq!(state.remove_tx(&upd.tx_hash), None);
    }

    #[test]
    fn test_admission_order_preserved() {
        let mut state = MempoolState::new();
        let txs: Vec<NameTx> = (0..5).map(|i| commit("alpha", i)).collect();
        for tx in &txs {
            state.add_tx(tx.clone(), 1);
        }
        state.remove_tx(&txs[2].tx_hash);

        let order: Vec<TxHash> = state.iter().map(|p| p.tx.tx_hash).collect();
        let expected: Vec<TxHash> = [0, 1, 3, 4].iter().map(|&i| txs[i].tx_hash).collect();
        assert_eq!(order, expected);
        assert_eq!(state.clear().len(), 4);
        assert!(state.is_empty());
        assert_eq!(state.commitment_count(), 0);
    }

    #[test]
    fn test_evict_for_block() {
        let mut state = MempoolState::new();
        let included = update("alpha", outpoint(1), 1);
        let competitor = update("alpha", outpoint(2), 2);
        let double_spend = update("gamma", outpoint(1), 3);
        let expiring = update("delta", outpoint(4), 4);
        let untouched = update("epsilon", outpoint(5), 5);
        for tx in [&included, &competitor, &double_spend, &expiring, &untouched] {
            state.add_tx(tx.clone(), 10);
        }

        let block = NameBlock::new(11, vec![included.clone()]);
        let outcome = BlockOutcome {
            height: 11,
            updated: vec![Name::from("alpha")],
            expiry_events: vec![ExpiryEvent::Expired {
                name: Name::from("delta"),
                height: 11,
            }],
            ..Default::default()
        };

        let evicted = state.evict_for_block(&block, &outcome);
        let evicted: BTreeSet<TxHash> = evicted.iter().map(|tx| tx.tx_hash).collect();
        let expected: BTreeSet<TxHash> = [&competitor, &double_spend, &expiring]
            .iter()
            .map(|tx| tx.tx_hash)
            .collect();
        assert_eq!(evicted, expected);
        assert_eq!(state.tx_count(), 1);
        assert!(state.contains(&untouched.tx_hash));
    }
}
