//! Audit ledger for IntentForge.
//!
//! This module contains the hash-chained log behind the `/blockchain` routes:
//! - Hashing: canonical JSON and block/transaction hash derivation
//! - Chain: serialised appends, receipts and integrity verification
//! - Audit: policy, transaction, violation and clawback operations

mod audit;
mod chain;
pub mod hashing;

pub use audit::*;
pub use chain::*;
