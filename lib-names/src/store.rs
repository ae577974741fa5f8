//! NameRecord Store
//!
//! Authoritative, chain-derived mapping from name to its current record.
//!
//! # Invariants
//!
//! 1. **Single active record**: at most one active record per name at any height
//! 2. **Limits before mutation**: length checks run before any state change
//! 3. **Renewal**: every successful write sets the registration height to the
//!    write height, so expiry is always counted from the last refresh

use std::collections::BTreeMap;
use std::ops::Bound;

use serde::{Deserialize, Serialize};
use tracing::debug;
use lib_types::{Address, BlockHeight, OutPoint, TxHash};

use crate::errors::{NameError, NameResult};
use crate::expiry::{self, ExpiryEvent, ExpiryIndex, RegistrationStatus};
use crate::history::{HistoryEntry, HistoryLog};
use crate::types::{Name, NameValue};

/// Current registration of a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    pub name: Name,
    pub value: NameValue,
    /// Transaction that last wrote this record
    pub txid: TxHash,
    /// Unspent output encoding ownership
    pub owning_output: OutPoint,
    /// Address the owning output pays to
    pub owner: Address,
    pub registration_height: BlockHeight,
    pub expiration_height: BlockHeight,
}

impl NameRecord {
    pub fn is_active(&self, height: BlockHeight) -> bool {
        expiry::is_active(self, height)
    }

    pub fn remaining_blocks(&self, height: BlockHeight) -> u64 {
        expiry::remaining_blocks(self, height)
    }

    pub fn status(&self, height: BlockHeight) -> RegistrationStatus {
        RegistrationStatus::of(self, height)
    }
}

/// Content written by a registration or update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordWrite {
    pub value: NameValue,
    pub txid: TxHash,
    pub output: OutPoint,
    pub owner: Address,
}

/// Name records plus their expiry index and optional history
#[derive(Debug)]
pub struct NameStore {
    expiry_window: u64,
    records: BTreeMap<Name, NameRecord>,
    expiry: ExpiryIndex,
    history: HistoryLog,
}

impl NameStore {
    pub fn new(expiry_window: u64, history: HistoryLog) -> Self {
        Self {
            expiry_window,
            records: BTreeMap::new(),
            expiry: ExpiryIndex::new(),
            history,
        }
    }

    /// Current record regardless of status
    pub fn lookup(&self, name: &Name) -> Option<&NameRecord> {
        self.records.get(name)
    }

    /// Current record only if it is active at `height`
    pub fn active_record(&self, name: &Name, height: BlockHeight) -> Option<&NameRecord> {
        self.records.get(name).filter(|r| r.is_active(height))
    }

    /// Register `name`, replacing an expired record if there is one
    ///
    /// Returns the replaced record for undo.
    pub fn apply_first_registration(
        &mut self,
        name: &Name,
        write: RecordWrite,
        height: BlockHeight,
    ) -> NameResult<Option<NameRecord>> {
        name.check_length()?;
        write.value.check_length()?;

        if self.active_record(name, height).is_some() {
            return Err(NameError::NameAlreadyActive(name.clone()));
        }

        let previous = self.write(name, write, height);
        debug!("Registered {} at height {}", name, height);
        Ok(previous)
    }

    /// Update an active registration owned by one of `spent_inputs`
    ///
    /// Returns the overwritten record for undo.
    pub fn apply_update(
        &mut self,
        name: &Name,
        write: RecordWrite,
        spent_inputs: &[OutPoint],
        height: BlockHeight,
    ) -> NameResult<NameRecord> {
        name.check_length()?;
        write.value.check_length()?;

        let record = self
            .active_record(name, height)
            .ok_or_else(|| NameError::NameNotRegistered(name.clone()))?;

        if !spent_inputs.contains(&record.owning_output) {
            return Err(NameError::OwnerInputMismatch {
                name: name.clone(),
                expected: record.owning_output,
            });
        }

        let previous = self
            .write(name, write, height)
            .ok_or_else(|| NameError::NameNotRegistered(name.clone()))?;
        debug!("Updated {} at height {}", name, height);
        Ok(previous)
    }

    fn write(&mut self, name: &Name, write: RecordWrite, height: BlockHeight) -> Option<NameRecord> {
        let record = NameRecord {
            name: name.clone(),
            value: write.value,
            txid: write.txid,
            owning_output: write.output,
            owner: write.owner,
            registration_height: height,
            expiration_height: expiry::expiration_height(height, self.expiry_window),
        };

        self.history.append(
            name,
            HistoryEntry {
                value: record.value.clone(),
                txid: record.txid,
                height,
            },
        );
        let expiration_height = record.expiration_height;
        let previous = self.records.insert(name.clone(), record);
        if let Some(prev) = &previous {
            self.expiry.remove(name, prev.expiration_height);
        }
        self.expiry.insert(name, expiration_height);
        previous
    }

    /// Undo the latest write of `name`, restoring `previous`
    pub fn restore(&mut self, name: &Name, previous: Option<NameRecord>) {
        if let Some(current) = self.records.remove(name) {
            self.expiry.remove(name, current.expiration_height);
            self.history.pop(name);
        }
        if let Some(prev) = previous {
            self.expiry.insert(name, prev.expiration_height);
            self.records.insert(name.clone(), prev);
        }
    }

    /// Boundary events for connecting the block at `height`
    pub fn expire_at(&self, height: BlockHeight) -> Vec<ExpiryEvent> {
        self.expiry.expired_events(height)
    }

    /// Boundary events for disconnecting the block at `height`
    pub fn unexpire_at(&self, height: BlockHeight) -> Vec<ExpiryEvent> {
        self.expiry.unexpired_events(height)
    }

    /// Up to `count` records in name order, starting at `start` (inclusive)
    pub fn scan(&self, start: Option<&Name>, count: usize) -> Vec<&NameRecord> {
        let lower = match start {
            Some(name) => Bound::Included(name.clone()),
            None => Bound::Unbounded,
        };
        self.records
            .range((lower, Bound::Unbounded))
            .take(count)
            .map(|(_, record)| record)
            .collect()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn records(&self) -> impl Iterator<Item = &NameRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
