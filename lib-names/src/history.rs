//! Name History Log
//!
//! Optional, node-local record of every value a name has held. Enabling it
//! changes no consensus behavior, only what can be queried.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use lib_types::{BlockHeight, TxHash};

use crate::errors::{NameError, NameResult};
use crate::types::{Name, NameValue};

/// One past value of a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub value: NameValue,
    pub txid: TxHash,
    pub height: BlockHeight,
}

/// Storage backend for history entries
///
/// Entries are append-only except for undoing the most recent append when a
/// block is disconnected.
pub trait HistoryStore: fmt::Debug + Send + Sync {
    fn append(&mut self, name: &Name, entry: HistoryEntry);

    /// Remove the newest entry of `name`
    fn pop(&mut self, name: &Name) -> Option<HistoryEntry>;

    fn entries(&self, name: &Name) -> Vec<HistoryEntry>;

    /// Every name with its entries, in name order
    fn dump(&self) -> Vec<(Name, Vec<HistoryEntry>)>;
}

/// In-memory history backend
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    entries: BTreeMap<Name, Vec<HistoryEntry>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&mut self, name: &Name, entry: HistoryEntry) {
        self.entries.entry(name.clone()).or_default().push(entry);
    }

    fn pop(&mut self, name: &Name) -> Option<HistoryEntry> {
        let entries = self.entries.get_mut(name)?;
        let entry = entries.pop();
        if entries.is_empty() {
            self.entries.remove(name);
        }
        entry
    }

    fn entries(&self, name: &Name) -> Vec<HistoryEntry> {
        self.entries.get(name).cloned().unwrap_or_default()
    }

    fn dump(&self) -> Vec<(Name, Vec<HistoryEntry>)> {
        self.entries
            .iter()
            .map(|(name, entries)| (name.clone(), entries.clone()))
            .collect()
    }
}

/// History log, inert unless enabled
#[derive(Debug)]
pub struct HistoryLog {
    store: Option<Box<dyn HistoryStore>>,
}

impl HistoryLog {
    pub fn disabled() -> Self {
        Self { store: None }
    }

    /// Enabled log backed by memory
    pub fn in_memory() -> Self {
        Self::with_store(Box::new(MemoryHistoryStore::new()))
    }

    pub fn with_store(store: Box<dyn HistoryStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn from_flag(enabled: bool) -> Self {
        if enabled {
            Self::in_memory()
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn append(&mut self, name: &Name, entry: HistoryEntry) {
        if let Some(store) = self.store.as_mut() {
            store.append(name, entry);
        }
    }

    pub fn pop(&mut self, name: &Name) -> Option<HistoryEntry> {
        self.store.as_mut().and_then(|store| store.pop(name))
    }

    /// Ordered past values of `name`
    pub fn query(&self, name: &Name) -> NameResult<Vec<HistoryEntry>> {
        let store = self.store.as_ref().ok_or(NameError::HistoryTrackingDisabled)?;
        let entries = store.entries(name);
        if entries.is_empty() {
            return Err(NameError::NameNotFound(name.clone()));
        }
        Ok(entries)
    }

    pub fn dump(&self) -> Vec<(Name, Vec<HistoryEntry>)> {
        self.store.as_ref().map(|store| store.dump()).unwrap_or_default()
    }
}
