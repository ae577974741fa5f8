//! Name layer primitives.
//! Stable, protocol-neutral, behavior-free.
//!
//! Rule: No String identifiers in consensus state. Ever.

pub mod primitives;

pub use primitives::{Address, BlockHeight, OutPoint, TxHash};
