//! Policy violation records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{EventType, LedgerRecord};

/// A recorded breach of a policy rule. A transaction may have several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ViolationRecord {
    pub violation_id: String,
    pub transaction_id: String,
    pub wallet_id: String,
    /// Kind of breach, e.g. `CATEGORY_BLOCKED` or `LIMIT_EXCEEDED`.
    pub violation_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub logged_at: DateTime<Utc>,
}

impl LedgerRecord for ViolationRecord {
    const EVENT_TYPE: EventType = EventType::ViolationLogged;

    fn subject_id(&self) -> &str {
        &self.transaction_id
    }

    fn wallet_id(&self) -> &str {
        &self.wallet_id
    }
}
