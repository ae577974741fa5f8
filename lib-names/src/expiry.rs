//! Expiry Engine
//!
//! Height-driven status of registrations. A record with expiration height
//! `h` is active at `h - 1` and expired from `h` on.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use lib_types::BlockHeight;

use crate::store::NameRecord;
use crate::types::Name;

/// Height at which a registration made at `registration_height` lapses
pub fn expiration_height(registration_height: BlockHeight, expiry_window: u64) -> BlockHeight {
    registration_height.saturating_add(expiry_window)
}

/// Whether the record still imposes an ownership claim at `current_height`
pub fn is_active(record: &NameRecord, current_height: BlockHeight) -> bool {
    current_height < record.expiration_height
}

/// Blocks left before the record lapses, zero once expired
pub fn remaining_blocks(record: &NameRecord, current_height: BlockHeight) -> u64 {
    record.expiration_height.saturating_sub(current_height)
}

/// Derived status of a record at a given height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegistrationStatus {
    Active {
        expires_at: BlockHeight,
        remaining: u64,
    },
    Expired {
        expired_at: BlockHeight,
    },
}

impl RegistrationStatus {
    pub fn of(record: &NameRecord, current_height: BlockHeight) -> Self {
        if is_active(record, current_height) {
            RegistrationStatus::Active {
                expires_at: record.expiration_height,
                remaining: remaining_blocks(record, current_height),
            }
        } else {
            RegistrationStatus::Expired {
                expired_at: record.expiration_height,
            }
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, RegistrationStatus::Active { .. })
    }
}

/// Active/expired boundary crossing produced while moving the tip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryEvent {
    /// Name stopped being active when the block at `height` was connected
    Expired { name: Name, height: BlockHeight },
    /// Name became active again when the block at `height` was disconnected
    Unexpired { name: Name, height: BlockHeight },
}

impl ExpiryEvent {
    pub fn name(&self) -> &Name {
        match self {
            ExpiryEvent::Expired { name, .. } | ExpiryEvent::Unexpired { name, .. } => name,
        }
    }
}

/// Index from expiration height to the names lapsing there
///
/// Holds exactly one entry per stored record.
#[derive(Debug, Clone, Default)]
pub struct ExpiryIndex {
    by_height: BTreeMap<BlockHeight, BTreeSet<Name>>,
}

impl ExpiryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &Name, expiration_height: BlockHeight) {
        self.by_height
            .entry(expiration_height)
            .or_default()
            .insert(name.clone());
    }

    pub fn remove(&mut self, name: &Name, expiration_height: BlockHeight) {
        if let Some(names) = self.by_height.get_mut(&expiration_height) {
            names.remove(name);
            if names.is_empty() {
                self.by_height.remove(&expiration_height);
            }
        }
    }

    /// Names whose records lapse exactly at `height`
    pub fn expiring_at(&self, height: BlockHeight) -> Vec<Name> {
        self.by_height
            .get(&height)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Events for connecting the block at `height`
    pub fn expired_events(&self, height: BlockHeight) -> Vec<ExpiryEvent> {
        self.expiring_at(height)
            .into_iter()
            .map(|name| ExpiryEvent::Expired { name, height })
            .collect()
    }

    /// Events for disconnecting the block at `height`
    pub fn unexpired_events(&self, height: BlockHeight) -> Vec<ExpiryEvent> {
        self.expiring_at(height)
            .into_iter()
            .map(|name| ExpiryEvent::Unexpired { name, height })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_height.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_height.is_empty()
    }
}
