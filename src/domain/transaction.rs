//! Transaction log records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{EventType, LedgerRecord};

/// Enforcement outcome reported for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    #[default]
    Approved,
    Blocked,
    Pending,
    Violation,
    ClawbackRequired,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Approved => write!(f, "APPROVED"),
            TransactionStatus::Blocked => write!(f, "BLOCKED"),
            TransactionStatus::Pending => write!(f, "PENDING"),
            TransactionStatus::Violation => write!(f, "VIOLATION"),
            TransactionStatus::ClawbackRequired => write!(f, "CLAWBACK_REQUIRED"),
        }
    }
}

/// A transaction recorded on the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub wallet_id: String,
    pub amount: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    pub status: TransactionStatus,
    pub logged_at: DateTime<Utc>,
}

impl LedgerRecord for TransactionRecord {
    const EVENT_TYPE: EventType = EventType::TransactionLogged;

    fn subject_id(&self) -> &str {
        &self.transaction_id
    }

    fn wallet_id(&self) -> &str {
        &self.wallet_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TransactionStatus::ClawbackRequired).unwrap();
        assert_eq!(json, "\"CLAWBACK_REQUIRED\"");

        let parsed: TransactionStatus = serde_json::from_str("\"BLOCKED\"").unwrap();
        assert_eq!(parsed, TransactionStatus::Blocked);
    }

    #[test]
    fn test_status_default_is_approved() {
        assert_eq!(TransactionStatus::default(), TransactionStatus::Approved);
    }
}
