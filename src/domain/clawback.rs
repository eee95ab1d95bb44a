//! Clawback (transaction reversal) records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{EventType, LedgerRecord};

/// Why funds were reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClawbackReason {
    #[default]
    PolicyViolation,
    ExpiredPolicy,
    FraudDetection,
    ComplianceBreach,
    ManualReversal,
}

impl std::fmt::Display for ClawbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClawbackReason::PolicyViolation => write!(f, "POLICY_VIOLATION"),
            ClawbackReason::ExpiredPolicy => write!(f, "EXPIRED_POLICY"),
            ClawbackReason::FraudDetection => write!(f, "FRAUD_DETECTION"),
            ClawbackReason::ComplianceBreach => write!(f, "COMPLIANCE_BREACH"),
            ClawbackReason::ManualReversal => write!(f, "MANUAL_REVERSAL"),
        }
    }
}

/// Execution state of a clawback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClawbackStatus {
    Pending,
    #[default]
    Executed,
    Failed,
    Cancelled,
}

/// A reversal tied to a single transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClawbackRecord {
    pub clawback_id: String,
    pub transaction_id: String,
    pub wallet_id: String,
    pub amount: f64,
    pub reason: ClawbackReason,
    pub status: ClawbackStatus,
    pub logged_at: DateTime<Utc>,
}

impl LedgerRecord for ClawbackRecord {
    const EVENT_TYPE: EventType = EventType::ClawbackLogged;

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
    fn test_defaults() {
        assert_eq!(ClawbackReason::default(), ClawbackReason::PolicyViolation);
        assert_eq!(ClawbackStatus::default(), ClawbackStatus::Executed);
    }

    #[test]
    fn test_reason_wire_format() {
        let reason: ClawbackReason = serde_json::from_str("\"FRAUD_DETECTION\"").unwrap();
        assert_eq!(reason, ClawbackReason::FraudDetection);
        assert_eq!(reason.to_string(), "FRAUD_DETECTION");
    }
}
