//! Policy registration records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{EventType, LedgerRecord};

/// A spending/transaction rule set registered for a wallet.
///
/// Registering again for the same wallet appends a new version; the latest
/// version is the one in force.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PolicyRecord {
    /// Policy identifier (caller supplied or generated).
    pub policy_id: String,

    /// Wallet the policy governs.
    pub wallet_id: String,

    /// Human-readable policy name.
    pub name: String,

    /// Free-form policy kind, e.g. `CATEGORY_LIMIT`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_type: Option<String>,

    /// Rule definitions as a JSON object.
    pub rules: serde_json::Value,

    /// When the policy stops applying.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// 1-based registration count for this wallet.
    pub version: i64,

    pub registered_at: DateTime<Utc>,
}

impl PolicyRecord {
    /// Whether the policy has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

impl LedgerRecord for PolicyRecord {
    const EVENT_TYPE: EventType = EventType::PolicyRegistered;

    fn subject_id(&self) -> &str {
        &self.wallet_id
    }

    fn wallet_id(&self) -> &str {
        &self.wallet_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(expires_at: Option<DateTime<Utc>>) -> PolicyRecord {
        PolicyRecord {
            policy_id: "p-1".to_string(),
            wallet_id: "w-1".to_string(),
            name: "Groceries only".to_string(),
            policy_type: Some("CATEGORY_LIMIT".to_string()),
            rules: serde_json::json!({"allowed_categories": ["groceries"]}),
            expires_at,
            version: 1,
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        assert!(!policy(None).is_expired_at(now));
        assert!(policy(Some(now - chrono::Duration::hours(1))).is_expired_at(now));
        assert!(!policy(Some(now + chrono::Duration::hours(1))).is_expired_at(now));
    }

    #[test]
    fn test_subject_is_wallet() {
        let p = policy(None);
        assert_eq!(p.subject_id(), "w-1");
        assert_eq!(PolicyRecord::EVENT_TYPE, EventType::PolicyRegistered);
    }
}
