//! Aggregate ledger statistics for the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Raw counters and sums read from storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerTotals {
    pub policies_registered: i64,
    pub policy_versions: i64,
    pub transactions_logged: i64,
    pub violations_logged: i64,
    pub clawbacks_logged: i64,
    pub transaction_volume: f64,
    pub clawback_volume: f64,
    pub latest_block: i64,
}

/// Statistics served by `GET /blockchain/statistics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LedgerStatistics {
    /// Distinct wallets with at least one registered policy.
    pub policies_registered: i64,
    /// Total policy registrations including re-registrations.
    pub policy_versions: i64,
    pub transactions_logged: i64,
    pub violations_logged: i64,
    pub clawbacks_logged: i64,
    pub transaction_volume: f64,
    pub clawback_volume: f64,
    /// Violations per logged transaction (0 when nothing is logged).
    pub violation_rate: f64,
    pub latest_block: i64,
    pub network: String,
    pub contract_address: String,
    pub generated_at: DateTime<Utc>,
}

impl LedgerStatistics {
    pub fn from_totals(totals: LedgerTotals, network: &str, contract_address: &str) -> Self {
        let violation_rate = if totals.transactions_logged > 0 {
            totals.violations_logged as f64 / totals.transactions_logged as f64
        } else {
            0.0
        };

        Self {
            policies_registered: totals.policies_registered,
            policy_versions: totals.policy_versions,
            transactions_logged: totals.transactions_logged,
            violations_logged: totals.violations_logged,
            clawbacks_logged: totals.clawbacks_logged,
            transaction_volume: totals.transaction_volume,
            clawback_volume: totals.clawback_volume,
            violation_rate,
            latest_block: totals.latest_block,
            network: network.to_string(),
            contract_address: contract_address.to_string(),
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_rate_without_transactions() {
        let stats = LedgerStatistics::from_totals(LedgerTotals::default(), "testnet", "");
        assert_eq!(stats.violation_rate, 0.0);
        assert_eq!(stats.latest_block, 0);
    }

    #[test]
    fn test_violation_rate() {
        let totals = LedgerTotals {
            transactions_logged: 4,
            violations_logged: 1,
            ..Default::default()
        };
        let stats = LedgerStatistics::from_totals(totals, "testnet", "0xabc");
        assert_eq!(stats.violation_rate, 0.25);
        assert_eq!(stats.contract_address, "0xabc");
    }
}
