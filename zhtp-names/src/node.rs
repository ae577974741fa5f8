//! Name Node
//!
//! Facade over confirmed name state and the node-local pending pool.
//!
//! # Locking
//!
//! Chain state sits behind a `RwLock`, the pool behind a `Mutex`. Lock order
//! is always chain, then pool. Submissions hold the chain read lock and the
//! pool lock across validate-then-insert, so no admission decision observes
//! a half-connected block. Connect and disconnect take the chain write lock.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use lib_mempool::{admit, assemble_block, revalidate, AdmitResult, MempoolConfig, MempoolState};
use lib_names::{
    BlockOutcome, CommitmentHash, HistoryEntry, Name, NameBlock, NameChainState, NameError,
    NameOp, NameOpKind, NameParams, NameRecord, NameTx, NameValue, Salt, StateSnapshot,
};
use lib_types::{Address, BlockHeight, OutPoint, TxHash};

use crate::config::NodeConfig;
use crate::errors::{NodeError, NodeResult};

/// Options accepted by the registration and update calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameOptions {
    /// Recipient of the name output
    pub dest_address: Option<Address>,
    /// Skip the node's local "already registered" pre-check
    pub allow_existing: bool,
}

/// Everything needed to reveal a commitment later
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentHandle {
    pub tx_hash: TxHash,
    pub name: Name,
    pub salt: Salt,
    pub commitment: CommitmentHash,
    /// Output the reveal must spend
    pub output: OutPoint,
}

/// Current registration of a name as reported to callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameInfo {
    pub name: Name,
    pub value: NameValue,
    pub txid: TxHash,
    pub owning_output: OutPoint,
    pub owner: Address,
    /// Height of the last registration or update
    pub height: BlockHeight,
    pub expires_at: BlockHeight,
    pub remaining_blocks: u64,
    pub expired: bool,
}

impl NameInfo {
    fn from_record(record: &NameRecord, tip: BlockHeight) -> Self {
        Self {
            name: record.name.clone(),
            value: record.value.clone(),
            txid: record.txid,
            owning_output: record.owning_output,
            owner: record.owner,
            height: record.registration_height,
            expires_at: record.expiration_height,
            remaining_blocks: record.remaining_blocks(tip),
            expired: !record.is_active(tip),
        }
    }
}

/// A pending operation as reported by `name_pending`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOp {
    pub tx_hash: TxHash,
    pub op: NameOpKind,
    pub name: Option<Name>,
    pub value: Option<NameValue>,
}

#[derive(Debug)]
struct ChainStore {
    state: NameChainState,
    blocks: Vec<NameBlock>,
}

/// Name registration node
#[derive(Debug)]
pub struct NameNode {
    chain: RwLock<ChainStore>,
    pool: Mutex<MempoolState>,
    mempool_config: MempoolConfig,
    nonce: AtomicU64,
}

impl NameNode {
    /// Node at genesis
    pub fn new(config: &NodeConfig) -> Self {
        Self::with_state(config, Self::empty_state(config), Vec::new())
    }

    /// Node rebuilt by replaying `blocks` from genesis
    pub fn from_blocks(config: &NodeConfig, blocks: Vec<NameBlock>) -> NodeResult<Self> {
        let mut state = Self::empty_state(config);
        state.connect_blocks(&blocks)?;
        Ok(Self::with_state(config, state, blocks))
    }

    fn empty_state(config: &NodeConfig) -> NameChainState {
        NameChainState::new(config.params(), config.history_log()).with_undo_depth(config.undo_depth)
    }

    fn with_state(config: &NodeConfig, state: NameChainState, blocks: Vec<NameBlock>) -> Self {
        let nonce = blocks.iter().map(|b| b.txs.len() as u64).sum();
        Self {
            chain: RwLock::new(ChainStore { state, blocks }),
            pool: Mutex::new(MempoolState::new()),
            mempool_config: config.mempool.clone(),
            nonce: AtomicU64::new(nonce),
        }
    }

    pub fn tip(&self) -> BlockHeight {
        self.chain.read().state.tip()
    }

    pub fn params(&self) -> NameParams {
        *self.chain.read().state.params()
    }

    /// Every connected block, genesis first
    pub fn blocks(&self) -> Vec<NameBlock> {
        self.chain.read().blocks.clone()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.chain.read().state.snapshot()
    }

    pub fn name_count(&self) -> usize {
        self.chain.read().state.store().len()
    }

    pub fn pending_count(&self) -> u32 {
        self.pool.lock().tx_count()
    }

    fn next_nonce(&self) -> u64 {
        self.nonce.fetch_add(1, Ordering::Relaxed)
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Commit to `name` without revealing it (`name_new`)
    pub fn register_intent(&self, name: &Name, options: &NameOptions) -> NodeResult<CommitmentHandle> {
        name.check_length()?;

        let chain = self.chain.read();
        if !options.allow_existing && chain.state.active_record(name).is_some() {
            return Err(NodeError::NameExists(name.clone()));
        }

        let salt = Salt::random();
        let commitment = CommitmentHash::compute(name, &salt);
        let tx = NameTx::new(
            NameOp::New { commitment },
            vec![],
            options.dest_address.unwrap_or_default(),
            self.next_nonce(),
        );
        let handle = CommitmentHandle {
            tx_hash: tx.tx_hash,
            name: name.clone(),
            salt,
            commitment,
            output: tx.name_outpoint(),
        };

        self.admit_locked(&chain.state, tx)?;
        Ok(handle)
    }

    /// Reveal a matured commitment and register the name (`name_firstupdate`)
    ///
    /// Without `allow_existing` the node refuses up front when the name is
    /// active at the tip. With it the pre-check is skipped, but the pool
    /// still validates the reveal and rejects a genuinely active name.
    pub fn reveal_registration(
        &self,
        handle: &CommitmentHandle,
        value: &NameValue,
        options: &NameOptions,
    ) -> NodeResult<TxHash> {
        handle.name.check_length()?;
        value.check_length()?;

        let chain = self.chain.read();
        if !options.allow_existing && chain.state.active_record(&handle.name).is_some() {
            return Err(NameError::NameAlreadyActive(handle.name.clone()).into());
        }

        let tx = NameTx::new(
            NameOp::FirstUpdate {
                name: handle.name.clone(),
                salt: handle.salt,
                value: value.clone(),
            },
            vec![handle.output],
            options.dest_address.unwrap_or_default(),
            self.next_nonce(),
        );
        self.admit_locked(&chain.state, tx)
    }

    /// Change the value of an active name and renew it (`name_update`)
    ///
    /// The name output goes back to the current owner unless
    /// `dest_address` transfers it.
    pub fn update_name(&self, name: &Name, value: &NameValue, options: &NameOptions) -> NodeResult<TxHash> {
        name.check_length()?;
        value.check_length()?;

        let chain = self.chain.read();
        let record = chain
            .state
            .store()
            .active_record(name, chain.state.next_height())
            .ok_or_else(|| NameError::NameNotRegistered(name.clone()))?;

        let tx = NameTx::new(
            NameOp::Update {
                name: name.clone(),
                value: value.clone(),
            },
            vec![record.owning_output],
            options.dest_address.unwrap_or(record.owner),
            self.next_nonce(),
        );
        self.admit_locked(&chain.state, tx)
    }

    /// Submit a transaction built elsewhere
    pub fn submit_tx(&self, tx: NameTx) -> NodeResult<TxHash> {
        let chain = self.chain.read();
        self.admit_locked(&chain.state, tx)
    }

    fn admit_locked(&self, state: &NameChainState, tx: NameTx) -> NodeResult<TxHash> {
        let mut pool = self.pool.lock();
        let next_height = state.next_height();
        match admit(&tx, state, &self.mempool_config, &pool, next_height) {
            AdmitResult::Accepted => {
                let hash = tx.tx_hash;
                info!("Admitted {} {} for block {}", tx.op.kind(), hash, next_height);
                pool.add_tx(tx, state.tip());
                Ok(hash)
            }
            AdmitResult::Rejected(kind) => {
                debug!("Rejected {} {}: {}", tx.op.kind(), tx.tx_hash, kind);
                Err(kind.into())
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current record of `name`, active or expired (`name_show`)
    pub fn query_name(&self, name: &Name) -> NodeResult<NameInfo> {
        let chain = self.chain.read();
        chain
            .state
            .store()
            .lookup(name)
            .map(|record| NameInfo::from_record(record, chain.state.tip()))
            .ok_or_else(|| NameError::NameNotFound(name.clone()).into())
    }

    /// Every value `name` has held, oldest first (`name_history`)
    pub fn query_history(&self, name: &Name) -> NodeResult<Vec<HistoryEntry>> {
        Ok(self.chain.read().state.history().query(name)?)
    }

    /// Pending operations, optionally only those for `name` (`name_pending`)
    pub fn pending_operations(&self, name: Option<&Name>) -> Vec<PendingOp> {
        let pool = self.pool.lock();
        let pending: Vec<PendingOp> = pool
            .iter()
            .filter(|p| name.is_none() || p.tx.op.name() == name)
            .map(|p| PendingOp {
                tx_hash: p.tx.tx_hash,
                op: p.tx.op.kind(),
                name: p.tx.op.name().cloned(),
                value: p.tx.op.value().cloned(),
            })
            .collect();
        pending
    }

    /// Up to `count` records in name order from `start` (`name_scan`)
    pub fn scan_names(&self, start: Option<&Name>, count: usize) -> Vec<NameInfo> {
        let chain = self.chain.read();
        let tip = chain.state.tip();
        let infos: Vec<NameInfo> = chain
            .state
            .store()
            .scan(start, count)
            .into_iter()
            .map(|record| NameInfo::from_record(record, tip))
            .collect();
        infos
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Build the next block from the pool and connect it
    pub fn mine_block(&self) -> NodeResult<BlockOutcome> {
        let mut chain = self.chain.write();
        let mut pool = self.pool.lock();
        let height = chain.state.next_height();
        let txs = assemble_block(&chain.state, &pool, height);
        let block = NameBlock::new(height, txs);
        self.connect_locked(&mut chain, &mut pool, block)
    }

    pub fn mine_blocks(&self, count: u64) -> NodeResult<Vec<BlockOutcome>> {
        (0..count).map(|_| self.mine_block()).collect()
    }

    /// Connect a block received from elsewhere
    pub fn connect_block(&self, block: NameBlock) -> NodeResult<BlockOutcome> {
        let mut chain = self.chain.write();
        let mut pool = self.pool.lock();
        self.connect_locked(&mut chain, &mut pool, block)
    }

    fn connect_locked(
        &self,
        chain: &mut ChainStore,
        pool: &mut MempoolState,
        block: NameBlock,
    ) -> NodeResult<BlockOutcome> {
        let outcome = chain.state.connect_block(&block)?;

        let evicted = pool.evict_for_block(&block, &outcome);
        let next_height = chain.state.next_height();
        let stale = revalidate(&chain.state, pool, next_height);

        let mut readmitted = 0usize;
        for tx in evicted {
            match admit(&tx, &chain.state, &self.mempool_config, pool, next_height) {
                AdmitResult::Accepted => {
                    pool.add_tx(tx, chain.state.tip());
                    readmitted += 1;
                }
                AdmitResult::Rejected(kind) => {
                    debug!("Evicted {} {}: {}", tx.op.kind(), tx.tx_hash, kind);
                }
            }
        }

        debug!(
            "Pool after block {}: {} pending, {} stale dropped, {} readmitted",
            block.height,
            pool.tx_count(),
            stale.len(),
            readmitted
        );
        chain.blocks.push(block);
        Ok(outcome)
    }

    /// Disconnect the tip block and re-validate the whole pool
    ///
    /// Transactions of the disconnected block go back through admission
    /// ahead of the previously pending ones.
    pub fn disconnect_block(&self) -> NodeResult<BlockOutcome> {
        let mut chain = self.chain.write();
        let mut pool = self.pool.lock();

        let outcome = chain.state.disconnect_block()?;
        let mut candidates = chain.blocks.pop().map(|b| b.txs).unwrap_or_default();
        candidates.extend(pool.clear());

        let next_height = chain.state.next_height();
        for tx in candidates {
            match admit(&tx, &chain.state, &self.mempool_config, &pool, next_height) {
                AdmitResult::Accepted => pool.add_tx(tx, chain.state.tip()),
                AdmitResult::Rejected(kind) => {
                    debug!("Dropped {} {} after disconnect: {}", tx.op.kind(), tx.tx_hash, kind);
                }
            }
        }

        info!(
            "Disconnected block {}; {} pending after re-validation",
            outcome.height,
            pool.tx_count()
        );
        Ok(outcome)
    }
}
