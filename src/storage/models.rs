//! Database models for IntentForge Ledger.
//!
//! These are the row types returned by SQLx queries.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::domain::{LedgerBlock, LedgerTotals};
use crate::error::LedgerError;

/// Database row for the ledger_blocks table.
#[derive(Debug, Clone, FromRow)]
pub struct LedgerBlockRow {
    pub block_number: i64,
    pub event_type: String,
    pub subject_id: String,
    pub wallet_id: String,
    pub payload: String,
    pub data_hash: String,
    pub previous_hash: String,
    pub block_hash: String,
    pub tx_hash: String,
    pub created_at: String,
}

/// Why a stored row could not be turned back into a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndecodableBlock {
    pub block_number: i64,
    pub reason: String,
}

impl From<UndecodableBlock> for LedgerError {
    fn from(err: UndecodableBlock) -> Self {
        LedgerError::Internal(format!("block {}: {}", err.block_number, err.reason))
    }
}

impl LedgerBlockRow {
    /// Decode the row, reporting the first column that does not parse.
    pub fn decode(self) -> Result<LedgerBlock, UndecodableBlock> {
        let block_number = self.block_number;
        let undecodable = |reason: &str| UndecodableBlock {
            block_number,
            reason: reason.to_string(),
        };

        Ok(LedgerBlock {
            block_number,
            event_type: self
                .event_type
                .parse()
                .map_err(|_| undecodable("event type is not recognised"))?,
            subject_id: self.subject_id,
            wallet_id: self.wallet_id,
            payload: serde_json::from_str(&self.payload)
                .map_err(|_| undecodable("payload is not valid JSON"))?,
            data_hash: self.data_hash,
            previous_hash: self.previous_hash,
            block_hash: self.block_hash,
            tx_hash: self.tx_hash,
            created_at: DateTime::parse_from_rfc3339(&self.created_at)
                .map_err(|_| undecodable("timestamp is not RFC 3339"))?
                .with_timezone(&Utc),
        })
    }
}

impl TryFrom<LedgerBlockRow> for LedgerBlock {
    type Error = LedgerError;

    fn try_from(row: LedgerBlockRow) -> Result<Self, Self::Error> {
        Ok(row.decode()?)
    }
}

/// Aggregate row for statistics.
#[derive(Debug, Clone, FromRow)]
pub struct TotalsRow {
    pub policies_registered: i64,
    pub policy_versions: i64,
    pub transactions_logged: i64,
    pub violations_logged: i64,
    pub clawbacks_logged: i64,
    pub transaction_volume: f64,
    pub clawback_volume: f64,
    pub latest_block: i64,
}

impl From<TotalsRow> for LedgerTotals {
    fn from(row: TotalsRow) -> Self {
        LedgerTotals {
            policies_registered: row.policies_registered,
            policy_versions: row.policy_versions,
            transactions_logged: row.transactions_logged,
            violations_logged: row.violations_logged,
            clawbacks_logged: row.clawbacks_logged,
            transaction_volume: row.transaction_volume,
            clawback_volume: row.clawback_volume,
            latest_block: row.latest_block,
        }
    }
}
