//! Canonical Primitive Types for the Name Layer
//!
//! Rule: No String identifiers in consensus state. Ever.
//!
//! These types are shared by the name store, the commitment tracker and the
//! mempool. They are:
//! - Fixed-size (no dynamic allocation)
//! - Deterministically serializable
//! - Cheap to copy and compare

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// TYPE ALIASES
// ============================================================================

/// Block height in the chain (0 is genesis)
pub type BlockHeight = u64;

// ============================================================================
// HASH TYPES
// ============================================================================

/// 32-byte transaction hash
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    /// Create a new TxHash from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a zeroed TxHash
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Get the underlying bytes
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero hash
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for TxHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for TxHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// 32-byte address (derived from public key outside this layer)
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// Create a new Address from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create a zeroed Address
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Get the underlying bytes
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ============================================================================
// OUTPUT REFERENCES
// ============================================================================

/// Reference to a specific output within a transaction
///
/// This is the canonical way to identify a UTXO. Never use tx hash alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// Transaction containing this output
    pub tx_hash: TxHash,
    /// Index of the output within the transaction (0-based)
    pub output_index: u32,
}

impl OutPoint {
    /// Create a new OutPoint
    pub const fn new(tx_hash: TxHash, output_index: u32) -> Self {
        Self { tx_hash, output_index }
    }

    /// Convert to bytes for storage and hashing
    pub fn to_bytes(&self) -> [u8; 36] {
        let mut bytes = [0u8; 36];
        bytes[..32].copy_from_slice(self.tx_hash.as_bytes());
        bytes[32..36].copy_from_slice(&self.output_index.to_le_bytes());
        bytes
    }

    /// Parse from bytes
    pub fn from_bytes(bytes: &[u8; 36]) -> Self {
        let mut tx_bytes = [0u8; 32];
        tx_bytes.copy_from_slice(&bytes[..32]);
        let output_index = u32::from_le_bytes([bytes[32], bytes[33], bytes[34], bytes[35]]);
        Self {
            tx_hash: TxHash::new(tx_bytes),
            output_index,
        }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_hash, self.output_index)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_hash_basics() {
        let hash = TxHash::new([2u8; 32]);
        assert!(!hash.is_zero());
        assert_eq!(hash.as_bytes(), &[2u8; 32]);
        assert!(TxHash::zero().is_zero());
    }

    #[test]
    fn test_address_basics() {
        let addr = Address::new([3u8; 32]);
        assert!(!addr.is_zero());
        assert_eq!(addr.as_bytes(), &[3u8; 32]);
    }

    #[test]
    fn test_outpoint_bytes() {
        let outpoint = OutPoint::new(TxHash::new([7u8; 32]), 42);
        let restored = OutPoint::from_bytes(&outpoint.to_bytes());
        assert_eq!(outpoint, restored);
    }

    #[test]
    fn test_outpoint_display() {
        let outpoint = OutPoint::new(TxHash::new([0xab; 32]), 3);
        let shown = outpoint.to_string();
        assert!(shown.starts_with("abab"));
        assert!(shown.ends_with(":3"));
    }

    #[test]
    fn test_bincode_is_fixed_size() {
        let hash = TxHash::new([42u8; 32]);
        let serialized = bincode::serialize(&hash).unwrap();
        assert_eq!(serialized.len(), 32);
        let deserialized: TxHash = bincode::deserialize(&serialized).unwrap();
        assert_eq!(hash, deserialized);
    }
}
