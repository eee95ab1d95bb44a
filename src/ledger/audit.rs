//! Audit operations behind the `/blockchain` routes.
//!
//! Each write takes the append lock for the whole check-then-append sequence,
//! so duplicate detection and policy versioning cannot race.

use serde::de::DeserializeOwned;

use crate::domain::{
    ClawbackRecord, EventType, LedgerBlock, LedgerEntry, LedgerStatistics, PolicyRecord,
    TransactionRecord, ViolationRecord,
};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::Ledger;

/// Default and maximum page sizes for the audit listing.
pub const DEFAULT_AUDIT_LIMIT: i64 = 50;
pub const MAX_AUDIT_LIMIT: i64 = 500;

impl Ledger {
    // ==================== Writes ====================

    /// Register a policy for its wallet. Re-registration appends a new version.
    pub async fn register_policy(
        &self,
        mut policy: PolicyRecord,
    ) -> LedgerResult<LedgerEntry<PolicyRecord>> {
        let mut writer = self.writer().await;
        let previous = writer
            .repository()
            .count_for_subject(EventType::PolicyRegistered, &policy.wallet_id)
            .await?;
        policy.version = previous + 1;

        let (_, receipt) = writer.append(&policy).await?;
        Ok(LedgerEntry {
            record: policy,
            receipt,
        })
    }

    /// Log a transaction. Each transaction id may be logged once.
    pub async fn log_transaction(
        &self,
        transaction: TransactionRecord,
    ) -> LedgerResult<LedgerEntry<TransactionRecord>> {
        let mut writer = self.writer().await;
        if writer
            .latest(EventType::TransactionLogged, &transaction.transaction_id)
            .await?
            .is_some()
        {
            return Err(LedgerError::Conflict(format!(
                "Transaction {} is already logged",
                transaction.transaction_id
            )));
        }

        let (_, receipt) = writer.append(&transaction).await?;
        Ok(LedgerEntry {
            record: transaction,
            receipt,
        })
    }

    /// Log a policy violation against a transaction.
    pub async fn log_violation(
        &self,
        violation: ViolationRecord,
    ) -> LedgerResult<LedgerEntry<ViolationRecord>> {
        let mut writer = self.writer().await;
        let (_, receipt) = writer.append(&violation).await?;
        Ok(LedgerEntry {
            record: violation,
            receipt,
        })
    }

    /// Log a clawback. A transaction can be clawed back once, and never for
    /// more than was logged for it.
    pub async fn log_clawback(
        &self,
        clawback: ClawbackRecord,
    ) -> LedgerResult<LedgerEntry<ClawbackRecord>> {
        let mut writer = self.writer().await;

        if writer
            .latest(EventType::ClawbackLogged, &clawback.transaction_id)
            .await?
            .is_some()
        {
            return Err(LedgerError::Conflict(format!(
                "Transaction {} already has a clawback",
                clawback.transaction_id
            )));
        }

        if let Some(block) = writer
            .latest(EventType::TransactionLogged, &clawback.transaction_id)
            .await?
        {
            let transaction: TransactionRecord = decode_record(&block)?;
            if transaction.wallet_id != clawback.wallet_id {
                return Err(LedgerError::BadRequest(format!(
                    "Transaction {} belongs to wallet {}, not {}",
                    transaction.transaction_id, transaction.wallet_id, clawback.wallet_id
                )));
            }
            if clawback.amount > transaction.amount {
                return Err(LedgerError::BadRequest(format!(
                    "Clawback amount {} exceeds transaction amount {}",
                    clawback.amount, transaction.amount
                )));
            }
        }

        let (_, receipt) = writer.append(&clawback).await?;
        Ok(LedgerEntry {
            record: clawback,
            receipt,
        })
    }

    // ==================== Reads ====================

    /// Latest policy registered for a wallet.
    pub async fn policy_for_wallet(&self, wallet_id: &str) -> LedgerResult<LedgerEntry<PolicyRecord>> {
        let block = self
            .repository()
            .latest_for_subject(EventType::PolicyRegistered, wallet_id)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!("No policy registered for wallet {}", wallet_id))
            })?;

        self.entry(&block)
    }

    pub async fn transaction(&self, transaction_id: &str) -> LedgerResult<LedgerEntry<TransactionRecord>> {
        let block = self
            .repository()
            .latest_for_subject(EventType::TransactionLogged, transaction_id)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;

        self.entry(&block)
    }

    /// All violations logged for a transaction, oldest first.
    pub async fn violations(
        &self,
        transaction_id: &str,
    ) -> LedgerResult<Vec<LedgerEntry<ViolationRecord>>> {
        let blocks = self
            .repository()
            .blocks_for_subject(EventType::ViolationLogged, transaction_id)
            .await?;
        if blocks.is_empty() {
            return Err(LedgerError::NotFound(format!(
                "No violations logged for transaction {}",
                transaction_id
            )));
        }

        blocks.iter().map(|block| self.entry(block)).collect()
    }

    pub async fn clawback(&self, transaction_id: &str) -> LedgerResult<LedgerEntry<ClawbackRecord>> {
        let block = self
            .repository()
            .latest_for_subject(EventType::ClawbackLogged, transaction_id)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!(
                    "No clawback logged for transaction {}",
                    transaction_id
                ))
            })?;

        self.entry(&block)
    }

    pub async fn statistics(&self) -> LedgerResult<LedgerStatistics> {
        let totals = self.repository().totals().await?;
        Ok(LedgerStatistics::from_totals(
            totals,
            &self.chain().network,
            &self.chain().contract_address,
        ))
    }

    /// Most recent blocks, newest first. `limit` is clamped to 1..=500.
    pub async fn recent_blocks(
        &self,
        event_type: Option<EventType>,
        limit: i64,
    ) -> LedgerResult<Vec<LedgerBlock>> {
        let limit = limit.clamp(1, MAX_AUDIT_LIMIT);
        self.repository().recent_blocks(event_type, limit).await
    }

    fn entry<R: DeserializeOwned>(&self, block: &LedgerBlock) -> LedgerResult<LedgerEntry<R>> {
        Ok(LedgerEntry {
            record: decode_record(block)?,
            receipt: self.receipt(block),
        })
    }
}

fn decode_record<R: DeserializeOwned>(block: &LedgerBlock) -> LedgerResult<R> {
    serde_json::from_value(block.payload.clone()).map_err(|e| {
        LedgerError::Internal(format!(
            "Block {} holds an unreadable {} payload: {}",
            block.block_number, block.event_type, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio_test::{assert_err, assert_ok};

    use crate::config::Config;
    use crate::domain::{ClawbackReason, ClawbackStatus, TransactionStatus};
    use crate::storage::setup_test_db;

    async fn ledger() -> Ledger {
        Ledger::new(setup_test_db().await, Config::for_tests().chain)
    }

    fn policy(wallet: &str) -> PolicyRecord {
        PolicyRecord {
            policy_id: "p-1".to_string(),
            wallet_id: wallet.to_string(),
            name: "Education only".to_string(),
            policy_type: None,
            rules: serde_json::json!({"allowed_categories": ["education"]}),
            expires_at: None,
            version: 0,
            registered_at: Utc::now(),
        }
    }

    fn transaction(id: &str, wallet: &str, amount: f64) -> TransactionRecord {
        TransactionRecord {
            transaction_id: id.to_string(),
            wallet_id: wallet.to_string(),
            amount,
            currency: "INR".to_string(),
            category: None,
            merchant: None,
            status: TransactionStatus::Approved,
            logged_at: Utc::now(),
        }
    }

    fn violation(id: &str, tx: &str) -> ViolationRecord {
        ViolationRecord {
            violation_id: id.to_string(),
            transaction_id: tx.to_string(),
            wallet_id: "w-1".to_string(),
            violation_type: "CATEGORY_BLOCKED".to_string(),
            policy_id: Some("p-1".to_string()),
            amount: Some(40.0),
            details: None,
            logged_at: Utc::now(),
        }
    }

    fn clawback(tx: &str, wallet: &str, amount: f64) -> ClawbackRecord {
        ClawbackRecord {
            clawback_id: format!("cb-{}", tx),
            transaction_id: tx.to_string(),
            wallet_id: wallet.to_string(),
            amount,
            reason: ClawbackReason::PolicyViolation,
            status: ClawbackStatus::Executed,
            logged_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_policy_versions_increment() {
        let ledger = ledger().await;
        let first = ledger.register_policy(policy("w-1")).await.unwrap();
        let second = ledger.register_policy(policy("w-1")).await.unwrap();
        let other = ledger.register_policy(policy("w-2")).await.unwrap();

        assert_eq!(first.record.version, 1);
        assert_eq!(second.record.version, 2);
        assert_eq!(other.record.version, 1);

        let latest = ledger.policy_for_wallet("w-1").await.unwrap();
        assert_eq!(latest.record.version, 2);
        assert_eq!(latest.receipt.block_number, second.receipt.block_number);
    }

    #[tokio::test]
    async fn test_missing_policy_is_not_found() {
        let ledger = ledger().await;
        let err = ledger.policy_for_wallet("nobody").await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_transaction_conflicts() {
        let ledger = ledger().await;
        ledger
            .log_transaction(transaction("tx-1", "w-1", 100.0))
            .await
            .unwrap();
        let err = ledger
            .log_transaction(transaction("tx-1", "w-1", 100.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));

        let fetched = ledger.transaction("tx-1").await.unwrap();
        assert_eq!(fetched.record.amount, 100.0);
        assert_eq!(fetched.receipt.block_number, 1);
    }

    #[tokio::test]
    async fn test_unreadable_stored_payload_is_internal() {
        let ledger = ledger().await;
        ledger
            .log_transaction(transaction("tx-1", "w-1", 100.0))
            .await
            .unwrap();
        ledger
            .repository()
            .tamper_payload(1, "{\"amount\": 5000")
            .await
            .unwrap();

        let err = assert_err!(ledger.transaction("tx-1").await);
        assert!(matches!(err, LedgerError::Internal(_)));
    }

    #[tokio::test]
    async fn test_violations_accumulate() {
        let ledger = ledger().await;
        assert!(matches!(
            ledger.violations("tx-1").await.unwrap_err(),
            LedgerError::NotFound(_)
        ));

        ledger.log_violation(violation("v-1", "tx-1")).await.unwrap();
        ledger.log_violation(violation("v-2", "tx-1")).await.unwrap();

        let found = ledger.violations("tx-1").await.unwrap();
        let ids: Vec<_> = found.iter().map(|e| e.record.violation_id.as_str()).collect();
        assert_eq!(ids, vec!["v-1", "v-2"]);
    }

    #[tokio::test]
    async fn test_clawback_rules() {
        let ledger = ledger().await;
        ledger
            .log_transaction(transaction("tx-1", "w-1", 100.0))
            .await
            .unwrap();

        let too_much = ledger.log_clawback(clawback("tx-1", "w-1", 150.0)).await;
        assert!(matches!(too_much, Err(LedgerError::BadRequest(_))));

        let wrong_wallet = ledger.log_clawback(clawback("tx-1", "w-2", 50.0)).await;
        assert!(matches!(wrong_wallet, Err(LedgerError::BadRequest(_))));

        assert_ok!(ledger.log_clawback(clawback("tx-1", "w-1", 100.0)).await);
        let again = assert_err!(ledger.log_clawback(clawback("tx-1", "w-1", 10.0)).await);
        assert!(matches!(again, LedgerError::Conflict(_)));

        // Transactions that were never logged can still be clawed back.
        assert_ok!(ledger.log_clawback(clawback("tx-unlogged", "w-9", 25.0)).await);

        let fetched = ledger.clawback("tx-1").await.unwrap();
        assert_eq!(fetched.record.amount, 100.0);
    }

    #[tokio::test]
    async fn test_statistics() {
        let ledger = ledger().await;
        ledger.register_policy(policy("w-1")).await.unwrap();
        ledger
            .log_transaction(transaction("tx-1", "w-1", 60.0))
            .await
            .unwrap();
        ledger
            .log_transaction(transaction("tx-2", "w-1", 40.0))
            .await
            .unwrap();
        ledger.log_violation(violation("v-1", "tx-2")).await.unwrap();
        ledger
            .log_clawback(clawback("tx-2", "w-1", 40.0))
            .await
            .unwrap();

        let stats = ledger.statistics().await.unwrap();
        assert_eq!(stats.policies_registered, 1);
        assert_eq!(stats.transactions_logged, 2);
        assert_eq!(stats.violations_logged, 1);
        assert_eq!(stats.clawbacks_logged, 1);
        assert_eq!(stats.transaction_volume, 100.0);
        assert_eq!(stats.clawback_volume, 40.0);
        assert_eq!(stats.violation_rate, 0.5);
        assert_eq!(stats.latest_block, 5);
        assert_eq!(stats.contract_address, "0xc0ffee");
    }

    #[tokio::test]
    async fn test_recent_blocks_clamps_limit() {
        let ledger = ledger().await;
        ledger.register_policy(policy("w-1")).await.unwrap();
        ledger
            .log_transaction(transaction("tx-1", "w-1", 5.0))
            .await
            .unwrap();

        let blocks = ledger.recent_blocks(None, 0).await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].event_type, EventType::TransactionLogged);

        let policies = ledger
            .recent_blocks(Some(EventType::PolicyRegistered), 10_000)
            .await
            .unwrap();
        assert_eq!(policies.len(), 1);
    }
}
