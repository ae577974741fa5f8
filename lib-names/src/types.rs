//! Name Layer Types
//!
//! Names and values are opaque byte strings. They serialize as text when they
//! are valid UTF-8 and as raw byte arrays otherwise.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use lib_types::{Address, BlockHeight, OutPoint, TxHash};

use crate::errors::{NameError, NameResult};
use crate::params::{MAX_NAME_LENGTH, MAX_VALUE_LENGTH, SALT_LENGTH};

// ============================================================================
// NAME AND VALUE
// ============================================================================

/// Registered name (1..=256 bytes once validated)
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Name(Vec<u8>);

impl Name {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Enforce the protocol length limits
    pub fn check_length(&self) -> NameResult<()> {
        if self.0.is_empty() {
            return Err(NameError::EmptyName);
        }
        if self.0.len() > MAX_NAME_LENGTH {
            return Err(NameError::NameTooLong {
                len: self.0.len(),
                max: MAX_NAME_LENGTH,
            });
        }
        Ok(())
    }
}

impl From<&str> for Name {
    fn from(name: &str) -> Self {
        Self(name.as_bytes().to_vec())
    }
}

impl From<String> for Name {
    fn from(name: String) -> Self {
        Self(name.into_bytes())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", String::from_utf8_lossy(&self.0))
    }
}

/// Value attached to a name (0..=520 bytes)
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct NameValue(Vec<u8>);

impl NameValue {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Enforce the protocol length limit
    pub fn check_length(&self) -> NameResult<()> {
        if self.0.len() > MAX_VALUE_LENGTH {
            return Err(NameError::ValueTooLong {
                len: self.0.len(),
                max: MAX_VALUE_LENGTH,
            });
        }
        Ok(())
    }
}

impl From<&str> for NameValue {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for NameValue {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl fmt::Display for NameValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for NameValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() > 32 {
            write!(f, "NameValue({} bytes)", self.0.len())
        } else {
            write!(f, "NameValue({:?})", String::from_utf8_lossy(&self.0))
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BytesRepr {
    Text(String),
    Raw(Vec<u8>),
}

impl BytesRepr {
    fn into_bytes(self) -> Vec<u8> {
        match self {
            BytesRepr::Text(text) => text.into_bytes(),
            BytesRepr::Raw(raw) => raw,
        }
    }
}

fn serialize_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    match std::str::from_utf8(bytes) {
        Ok(text) => serializer.serialize_str(text),
        Err(_) => bytes.serialize(serializer),
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_bytes(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BytesRepr::deserialize(deserializer).map(|repr| Self(repr.into_bytes()))
    }
}

impl Serialize for NameValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_bytes(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for NameValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BytesRepr::deserialize(deserializer).map(|repr| Self(repr.into_bytes()))
    }
}

// ============================================================================
// COMMITMENTS
// ============================================================================

/// Random salt that hides a name inside its commitment
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Salt(pub [u8; SALT_LENGTH]);

impl Salt {
    pub const fn new(bytes: [u8; SALT_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; SALT_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", hex::encode(self.0))
    }
}

impl Serialize for Salt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Salt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let mut bytes = [0u8; SALT_LENGTH];
        hex::decode_to_slice(&text, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(Self(bytes))
    }
}

/// BLAKE3 commitment to `salt || name`
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CommitmentHash(pub [u8; 32]);

impl CommitmentHash {
    pub fn compute(name: &Name, salt: &Salt) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(salt.as_bytes());
        hasher.update(name.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for CommitmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitmentHash({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for CommitmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for CommitmentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for CommitmentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&text, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(Self(bytes))
    }
}

// ============================================================================
// OPERATIONS AND TRANSACTIONS
// ============================================================================

/// Name operation carried by a transaction's name output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum NameOp {
    /// Commit to a name without revealing it
    New { commitment: CommitmentHash },
    /// Reveal a matured commitment and register the name
    FirstUpdate {
        name: Name,
        salt: Salt,
        value: NameValue,
    },
    /// Refresh, change or transfer an active registration
    Update { name: Name, value: NameValue },
}

/// Operation discriminant, used for logging and routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameOpKind {
    New,
    FirstUpdate,
    Update,
}

impl fmt::Display for NameOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NameOpKind::New => "name_new",
            NameOpKind::FirstUpdate => "name_firstupdate",
            NameOpKind::Update => "name_update",
        };
        f.write_str(label)
    }
}

impl NameOp {
    pub fn kind(&self) -> NameOpKind {
        match self {
            NameOp::New { .. } => NameOpKind::New,
            NameOp::FirstUpdate { .. } => NameOpKind::FirstUpdate,
            NameOp::Update { .. } => NameOpKind::Update,
        }
    }

    /// Name this operation mutates; a commitment hides its name
    pub fn name(&self) -> Option<&Name> {
        match self {
            NameOp::New { .. } => None,
            NameOp::FirstUpdate { name, .. } | NameOp::Update { name, .. } => Some(name),
        }
    }

    pub fn value(&self) -> Option<&NameValue> {
        match self {
            NameOp::New { .. } => None,
            NameOp::FirstUpdate { value, .. } | NameOp::Update { value, .. } => Some(value),
        }
    }
}

/// Output of a name transaction that carries the name operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameOutput {
    /// Output index within the transaction
    pub index: u32,
    /// Address the output pays to
    pub recipient: Address,
}

/// Name-carrying transaction as seen by the name layer
///
/// Inputs, signatures and fee are validated by the transaction layer; only
/// the outpoints matter here, to prove the referential link to a commitment
/// or an owning output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameTx {
    pub tx_hash: TxHash,
    pub op: NameOp,
    pub inputs: Vec<OutPoint>,
    pub name_output: NameOutput,
}

impl NameTx {
    /// Build a transaction, deriving its hash from the contents and `nonce`
    pub fn new(op: NameOp, inputs: Vec<OutPoint>, recipient: Address, nonce: u64) -> Self {
        let name_output = NameOutput { index: 0, recipient };
        let tx_hash = compute_tx_hash(&op, &inputs, &name_output, nonce);
        Self {
            tx_hash,
            op,
            inputs,
            name_output,
        }
    }

    /// Outpoint of the output carrying the name operation
    pub fn name_outpoint(&self) -> OutPoint {
        OutPoint::new(self.tx_hash, self.name_output.index)
    }

    pub fn spends(&self, outpoint: &OutPoint) -> bool {
        self.inputs.contains(outpoint)
    }
}

fn compute_tx_hash(op: &NameOp, inputs: &[OutPoint], output: &NameOutput, nonce: u64) -> TxHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"name-tx");
    match op {
        NameOp::New { commitment } => {
            hasher.update(&[0u8]);
            hasher.update(commitment.as_bytes());
        }
        NameOp::FirstUpdate { name, salt, value } => {
            hasher.update(&[1u8]);
            update_prefixed(&mut hasher, name.as_bytes());
            hasher.update(salt.as_bytes());
            update_prefixed(&mut hasher, value.as_bytes());
        }
        NameOp::Update { name, value } => {
            hasher.update(&[2u8]);
            update_prefixed(&mut hasher, name.as_bytes());
            update_prefixed(&mut hasher, value.as_bytes());
        }
    }
    hasher.update(&(inputs.len() as u32).to_le_bytes());
    for input in inputs {
        hasher.update(&input.to_bytes());
    }
    hasher.update(&output.index.to_le_bytes());
    hasher.update(output.recipient.as_bytes());
    hasher.update(&nonce.to_le_bytes());
    TxHash::new(*hasher.finalize().as_bytes())
}

fn update_prefixed(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u32).to_le_bytes());
    hasher.update(bytes);
}

/// Name transactions of one block, in block order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NameBlock {
    pub height: BlockHeight,
    #[serde(default)]
    pub txs: Vec<NameTx>,
}

impl NameBlock {
    pub fn new(height: BlockHeight, txs: Vec<NameTx>) -> Self {
        Self { height, txs }
    }

    pub fn empty(height: BlockHeight) -> Self {
        Self { height, txs: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_length_limits() {
        assert_eq!(Name::from("").check_length(), Err(NameError::EmptyName));
        assert!(Name::new(vec![b'x'; 256]).check_length().is_ok());
        assert_eq!(
            Name::new(vec![b'x'; 257]).check_length(),
            Err(NameError::NameTooLong { len: 257, max: 256 })
        );
    }

    #[test]
    fn test_value_length_limits() {
        assert!(NameValue::default().check_length().is_ok());
        assert!(NameValue::new(vec![b'x'; 520]).check_length().is_ok());
        assert_eq!(
            NameValue::new(vec![b'x'; 521]).check_length(),
            Err(NameError::ValueTooLong { len: 521, max: 520 })
        );
    }

    #[test]
    fn test_commitment_binds_name_and_salt() {
        let salt = Salt::new([1u8; SALT_LENGTH]);
        let other_salt = Salt::new([2u8; SALT_LENGTH]);
        let name = Name::from("alpha");

        let hash = CommitmentHash::compute(&name, &salt);
        assert_eq!(hash, CommitmentHash::compute(&name, &salt));
        assert_ne!(hash, CommitmentHash::compute(&Name::from("alphb"), &salt));
        assert_ne!(hash, CommitmentHash::compute(&name, &other_salt));
    }

    #[test]
    fn test_tx_hash_depends_on_nonce() {
        let op = NameOp::Update {
            name: Name::from("alpha"),
            value: NameValue::from("v"),
        };
        let a = NameTx::new(op.clone(), vec![], Address::zero(), 1);
        let b = NameTx::new(op, vec![], Address::zero(), 2);
        assert_ne!(a.tx_hash, b.tx_hash);
        assert_eq!(a.name_outpoint(), OutPoint::new(a.tx_hash, 0));
    }

    #[test]
    fn test_op_accessors() {
        let op = NameOp::New { commitment: CommitmentHash::default() };
        assert_eq!(op.kind(), NameOpKind::New);
        assert!(op.name().is_none());
        assert_eq!(NameOpKind::FirstUpdate.to_string(), "name_firstupdate");
    }
}
