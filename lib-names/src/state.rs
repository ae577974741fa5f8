//! Name Chain State
//!
//! Single place where confirmed name operations are applied.
//!
//! # Rules
//!
//! 1. **Blocks connect at tip + 1**: no gaps, no reordering
//! 2. **Blocks are atomic**: if any transaction fails, the whole block is
//!    rejected and state is left exactly as before
//! 3. **State is derivable from blocks**: replaying every block from genesis
//!    yields the same state as connecting them one by one
//! 4. **Disconnect restores exact pre-block state**, for the most recent
//!    `undo_depth` blocks

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use lib_types::BlockHeight;

use crate::commitment::{Commitment, CommitmentTracker};
use crate::errors::{NameError, NameResult};
use crate::expiry::ExpiryEvent;
use crate::history::{HistoryEntry, HistoryLog};
use crate::params::{NameParams, DEFAULT_UNDO_DEPTH};
use crate::store::{NameRecord, NameStore, RecordWrite};
use crate::types::{CommitmentHash, Name, NameBlock, NameOp, NameTx, NameValue};
use crate::validate::{validate_name_tx, NameView, ValidatedOp};

/// Undo data for one applied transaction
#[derive(Debug, Clone)]
enum TxUndo {
    Committed {
        hash: CommitmentHash,
        replaced: Option<Commitment>,
    },
    Registered {
        name: Name,
        consumed: Commitment,
        previous: Option<NameRecord>,
    },
    Updated {
        name: Name,
        previous: NameRecord,
    },
}

/// Undo data for one connected block
#[derive(Debug, Clone)]
struct BlockUndo {
    height: BlockHeight,
    pruned: Vec<Commitment>,
    txs: Vec<TxUndo>,
}

/// What connecting or disconnecting a block changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockOutcome {
    pub height: BlockHeight,
    pub commitments: Vec<CommitmentHash>,
    pub registered: Vec<Name>,
    pub updated: Vec<Name>,
    pub expiry_events: Vec<ExpiryEvent>,
    pub pruned_commitments: usize,
}

impl BlockOutcome {
    /// Names whose record was written by the block
    pub fn touched_names(&self) -> impl Iterator<Item = &Name> {
        self.registered.iter().chain(self.updated.iter())
    }
}

/// Comparable dump of the whole derived state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub tip: BlockHeight,
    pub records: Vec<NameRecord>,
    pub commitments: Vec<Commitment>,
    pub history: Vec<(Name, Vec<HistoryEntry>)>,
}

/// Confirmed name state at the current tip
#[derive(Debug)]
pub struct NameChainState {
    params: NameParams,
    tip: BlockHeight,
    store: NameStore,
    commitments: CommitmentTracker,
    /// Undo records of the newest blocks, oldest first
    undo: VecDeque<BlockUndo>,
    undo_depth: usize,
}

impl NameView for NameChainState {
    fn lookup(&self, name: &Name) -> Option<&NameRecord> {
        self.store.lookup(name)
    }

    fn commitments(&self) -> &CommitmentTracker {
        &self.commitments
    }
}

impl NameChainState {
    /// Empty state at genesis (height 0)
    pub fn new(params: NameParams, history: HistoryLog) -> Self {
        Self {
            params,
            tip: 0,
            store: NameStore::new(params.expiry_window, history),
            commitments: CommitmentTracker::new(params),
            undo: VecDeque::new(),
            undo_depth: DEFAULT_UNDO_DEPTH,
        }
    }

    /// Keep undo records for at most `depth` blocks
    pub fn with_undo_depth(mut self, depth: usize) -> Self {
        self.undo_depth = depth;
        self.trim_undo();
        self
    }

    /// Rebuild state by replaying `blocks` from genesis, in order
    pub fn replay<'a>(
        params: NameParams,
        history: HistoryLog,
        blocks: impl IntoIterator<Item = &'a NameBlock>,
    ) -> NameResult<Self> {
        let mut state = Self::new(params, history);
        state.connect_blocks(blocks)?;
        Ok(state)
    }

    /// Connect `blocks` in order on top of the current tip
    pub fn connect_blocks<'a>(
        &mut self,
        blocks: impl IntoIterator<Item = &'a NameBlock>,
    ) -> NameResult<()> {
        for block in blocks {
            self.connect_block(block)?;
        }
        info!("Replayed name state to height {}", self.tip);
        Ok(())
    }

    pub fn params(&self) -> &NameParams {
        &self.params
    }

    pub fn tip(&self) -> BlockHeight {
        self.tip
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_depth
    }

    /// Blocks that can currently be disconnected
    pub fn reorg_depth(&self) -> usize {
        self.undo.len()
    }

    /// Height of the block that would include a transaction submitted now
    pub fn next_height(&self) -> BlockHeight {
        self.tip + 1
    }

    pub fn store(&self) -> &NameStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryLog {
        self.store.history()
    }

    /// Record that is active at the current tip
    pub fn active_record(&self, name: &Name) -> Option<&NameRecord> {
        self.store.active_record(name, self.tip)
    }

    /// Blocks until expiry at the tip; `None` when the name was never registered
    pub fn blocks_until_expiry(&self, name: &Name) -> Option<u64> {
        self.store.lookup(name).map(|r| r.remaining_blocks(self.tip))
    }

    /// Validate `tx` for inclusion in the next block
    pub fn validate_for_next_block(&self, tx: &NameTx) -> NameResult<ValidatedOp> {
        validate_name_tx(self, tx, self.next_height())
    }

    // =========================================================================
    // Block Application
    // =========================================================================

    /// Connect the block at `tip + 1`
    pub fn connect_block(&mut self, block: &NameBlock) -> NameResult<BlockOutcome> {
        let height = block.height;
        if height != self.next_height() {
            return Err(NameError::InvalidBlockHeight {
                expected: self.next_height(),
                actual: height,
            });
        }

        let mut outcome = BlockOutcome {
            height,
            expiry_events: self.store.expire_at(height),
            ..Default::default()
        };

        let pruned = self.commitments.prune_lapsed(height);
        outcome.pruned_commitments = pruned.len();
        let mut undo = BlockUndo {
            height,
            pruned,
            txs: Vec::with_capacity(block.txs.len()),
        };

        for tx in &block.txs {
            match self.apply_tx(tx, height) {
                Ok(tx_undo) => {
                    match &tx_undo {
                        TxUndo::Committed { hash, .. } => outcome.commitments.push(*hash),
                        TxUndo::Registered { name, .. } => outcome.registered.push(name.clone()),
                        TxUndo::Updated { name, .. } => outcome.updated.push(name.clone()),
                    }
                    undo.txs.push(tx_undo);
                }
                Err(e) => {
                    warn!(
                        "Rejecting block {}: {} {} failed: {}",
                        height,
                        tx.op.kind(),
                        tx.tx_hash,
                        e
                    );
                    self.rollback(undo);
                    return Err(e);
                }
            }
        }

        for event in &outcome.expiry_events {
            debug!("Name {} expired at height {}", event.name(), height);
        }

        self.tip = height;
        self.undo.push_back(undo);
        self.trim_undo();
        info!(
            "Connected name block {}: {} commitments, {} registrations, {} updates, {} expiries",
            height,
            outcome.commitments.len(),
            outcome.registered.len(),
            outcome.updated.len(),
            outcome.expiry_events.len()
        );
        Ok(outcome)
    }

    /// Disconnect the tip block, restoring the exact previous state
    pub fn disconnect_block(&mut self) -> NameResult<BlockOutcome> {
        let undo = self.undo.pop_back().ok_or(NameError::NothingToDisconnect)?;
        let height = undo.height;

        let mut outcome = BlockOutcome {
            height,
            pruned_commitments: undo.pruned.len(),
            ..Default::default()
        };
        for tx_undo in &undo.txs {
            match tx_undo {
                TxUndo::Committed { hash, .. } => outcome.commitments.push(*hash),
                TxUndo::Registered { name, .. } => outcome.registered.push(name.clone()),
                TxUndo::Updated { name, .. } => outcome.updated.push(name.clone()),
            }
        }

        self.rollback(undo);
        self.tip = height - 1;
        outcome.expiry_events = self.store.unexpire_at(height);

        info!("Disconnected name block {}", height);
        Ok(outcome)
    }

    fn apply_tx(&mut self, tx: &NameTx, height: BlockHeight) -> NameResult<TxUndo> {
        validate_name_tx(self, tx, height)?;

        match &tx.op {
            NameOp::New { commitment } => {
                let replaced =
                    self.commitments
                        .record_commitment(*commitment, height, tx.name_outpoint())?;
                Ok(TxUndo::Committed {
                    hash: *commitment,
                    replaced,
                })
            }

            NameOp::FirstUpdate { name, salt, value } => {
                let consumed = self.commitments.match_and_consume(name, salt, height)?;
                let write = Self::record_write(tx, value.clone());
                match self.store.apply_first_registration(name, write, height) {
                    Ok(previous) => Ok(TxUndo::Registered {
                        name: name.clone(),
                        consumed,
                        previous,
                    }),
                    Err(e) => {
                        self.commitments.restore(consumed);
                        Err(e)
                    }
                }
            }

            NameOp::Update { name, value } => {
                let write = Self::record_write(tx, value.clone());
                let previous = self.store.apply_update(name, write, &tx.inputs, height)?;
                Ok(TxUndo::Updated {
                    name: name.clone(),
                    previous,
                })
            }
        }
    }

    fn record_write(tx: &NameTx, value: NameValue) -> RecordWrite {
        RecordWrite {
            value,
            txid: tx.tx_hash,
            output: tx.name_outpoint(),
            owner: tx.name_output.recipient,
        }
    }

    fn trim_undo(&mut self) {
        while self.undo.len() > self.undo_depth {
            if let Some(dropped) = self.undo.pop_front() {
                debug!("Dropped undo data of block {}", dropped.height);
            }
        }
    }

    fn rollback(&mut self, undo: BlockUndo) {
        for tx_undo in undo.txs.into_iter().rev() {
            match tx_undo {
                TxUndo::Committed { hash, replaced } => {
                    self.commitments.remove(&hash);
                    if let Some(replaced) = replaced {
                        self.commitments.restore(replaced);
                    }
                }
                TxUndo::Registered {
                    name,
                    consumed,
                    previous,
                } => {
                    self.store.restore(&name, previous);
                    self.commitments.restore(consumed);
                }
                TxUndo::Updated { name, previous } => {
                    self.store.restore(&name, Some(previous));
                }
            }
        }
        for commitment in undo.pruned {
            self.commitments.restore(commitment);
        }
    }

    /// Dump of records, commitments and history for comparison
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            tip: self.tip,
            records: self.store.records().cloned().collect(),
            commitments: self.commitments.iter().cloned().collect(),
            history: self.store.history().dump(),
        }
    }
}
