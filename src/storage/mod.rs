//! Storage layer for IntentForge Ledger.
//!
//! Provides database access via SQLx with SQLite.

mod models;
mod repository;

pub use repository::LedgerRepository;

#[cfg(test)]
pub(crate) use repository::tests::setup_test_db;
