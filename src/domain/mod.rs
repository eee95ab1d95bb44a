//! Domain types for IntentForge Ledger.
//!
//! This module contains the audited resources and the ledger's own block and
//! receipt types.

mod block;
mod clawback;
mod policy;
mod statistics;
mod transaction;
mod validation;
mod violation;

pub use block::*;
pub use clawback::*;
pub use policy::*;
pub use statistics::*;
pub use transaction::*;
pub use validation::*;
pub use violation::*;
