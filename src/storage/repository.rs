//! Repository layer for database operations.

use sqlx::sqlite::SqlitePool;

use crate::domain::{EventType, LedgerBlock, LedgerTotals};
use crate::error::LedgerResult;
use crate::storage::models::{LedgerBlockRow, TotalsRow};

/// Repository for all ledger database operations.
#[derive(Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl LedgerRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init_schema(&self) -> LedgerResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_blocks (
                block_number INTEGER PRIMARY KEY,
                event_type TEXT NOT NULL,
                subject_id TEXT NOT NULL,
                wallet_id TEXT NOT NULL,
                payload TEXT NOT NULL,
                data_hash TEXT NOT NULL,
                previous_hash TEXT NOT NULL,
                block_hash TEXT NOT NULL UNIQUE,
                tx_hash TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_ledger_blocks_subject
                ON ledger_blocks(event_type, subject_id);
            CREATE INDEX IF NOT EXISTS idx_ledger_blocks_wallet ON ledger_blocks(wallet_id);
            CREATE INDEX IF NOT EXISTS idx_ledger_blocks_data_hash ON ledger_blocks(data_hash);

            CREATE UNIQUE INDEX IF NOT EXISTS idx_ledger_blocks_unique_transaction
                ON ledger_blocks(subject_id) WHERE event_type = 'TRANSACTION_LOGGED';
            CREATE UNIQUE INDEX IF NOT EXISTS idx_ledger_blocks_unique_clawback
                ON ledger_blocks(subject_id) WHERE event_type = 'CLAWBACK_LOGGED';
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ==================== Blocks ====================

    /// Save a block. Block number and hashes must already be computed.
    pub async fn insert_block(&self, block: &LedgerBlock) -> LedgerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_blocks (
                block_number, event_type, subject_id, wallet_id, payload,
                data_hash, previous_hash, block_hash, tx_hash, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(block.block_number)
        .bind(block.event_type.as_str())
        .bind(&block.subject_id)
        .bind(&block.wallet_id)
        .bind(serde_json::to_string(&block.payload)?)
        .bind(&block.data_hash)
        .bind(&block.previous_hash)
        .bind(&block.block_hash)
        .bind(&block.tx_hash)
        .bind(block.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get the last block in the chain, if any.
    pub async fn tip(&self) -> LedgerResult<Option<LedgerBlock>> {
        let row: Option<LedgerBlockRow> =
            sqlx::query_as("SELECT * FROM ledger_blocks ORDER BY block_number DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;

        row.map(LedgerBlock::try_from).transpose()
    }

    /// Get the most recent block recorded for a subject.
    pub async fn latest_for_subject(
        &self,
        event_type: EventType,
        subject_id: &str,
    ) -> LedgerResult<Option<LedgerBlock>> {
        let row: Option<LedgerBlockRow> = sqlx::query_as(
            r#"
            SELECT * FROM ledger_blocks
            WHERE event_type = ? AND subject_id = ?
            ORDER BY block_number DESC
            LIMIT 1
            "#,
        )
        .bind(event_type.as_str())
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(LedgerBlock::try_from).transpose()
    }

    /// Get every block recorded for a subject, oldest first.
    pub async fn blocks_for_subject(
        &self,
        event_type: EventType,
        subject_id: &str,
    ) -> LedgerResult<Vec<LedgerBlock>> {
        let rows: Vec<LedgerBlockRow> = sqlx::query_as(
            r#"
            SELECT * FROM ledger_blocks
            WHERE event_type = ? AND subject_id = ?
            ORDER BY block_number ASC
            "#,
        )
        .bind(event_type.as_str())
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LedgerBlock::try_from).collect()
    }

    /// Count blocks recorded for a subject.
    pub async fn count_for_subject(
        &self,
        event_type: EventType,
        subject_id: &str,
    ) -> LedgerResult<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM ledger_blocks WHERE event_type = ? AND subject_id = ?",
        )
        .bind(event_type.as_str())
        .bind(subject_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    /// Find a block by its transaction hash, block hash or data hash.
    pub async fn find_by_hash(&self, hash: &str) -> LedgerResult<Option<LedgerBlock>> {
        let row: Option<LedgerBlockRow> = sqlx::query_as(
            r#"
            SELECT * FROM ledger_blocks
            WHERE tx_hash = ?1 OR block_hash = ?1 OR data_hash = ?1
            ORDER BY block_number ASC
            LIMIT 1
            "#,
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(LedgerBlock::try_from).transpose()
    }

    /// List the most recent blocks, newest first.
    pub async fn recent_blocks(
        &self,
        event_type: Option<EventType>,
        limit: i64,
    ) -> LedgerResult<Vec<LedgerBlock>> {
        let rows: Vec<LedgerBlockRow> = if let Some(event_type) = event_type {
            sqlx::query_as(
                r#"
                SELECT * FROM ledger_blocks
                WHERE event_type = ?
                ORDER BY block_number DESC
                LIMIT ?
                "#,
            )
            .bind(event_type.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as("SELECT * FROM ledger_blocks ORDER BY block_number DESC LIMIT ?")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        };

        rows.into_iter().map(LedgerBlock::try_from).collect()
    }

    /// Page through the chain in order, starting after `after_block`.
    ///
    /// Rows come back undecoded so integrity checks can report a corrupt row
    /// instead of failing on it.
    pub async fn blocks_after(&self, after_block: i64, limit: i64) -> LedgerResult<Vec<LedgerBlockRow>> {
        let rows: Vec<LedgerBlockRow> = sqlx::query_as(
            r#"
            SELECT * FROM ledger_blocks
            WHERE block_number > ?
            ORDER BY block_number ASC
            LIMIT ?
            "#,
        )
        .bind(after_block)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ==================== Statistics ====================

    /// Aggregate counters and volumes across the whole chain.
    pub async fn totals(&self) -> LedgerResult<LedgerTotals> {
        let row: TotalsRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(DISTINCT CASE WHEN event_type = 'POLICY_REGISTERED' THEN subject_id END)
                    AS policies_registered,
                COUNT(CASE WHEN event_type = 'POLICY_REGISTERED' THEN 1 END) AS policy_versions,
                COUNT(CASE WHEN event_type = 'TRANSACTION_LOGGED' THEN 1 END) AS transactions_logged,
                COUNT(CASE WHEN event_type = 'VIOLATION_LOGGED' THEN 1 END) AS violations_logged,
                COUNT(CASE WHEN event_type = 'CLAWBACK_LOGGED' THEN 1 END) AS clawbacks_logged,
                TOTAL(CASE WHEN event_type = 'TRANSACTION_LOGGED'
                    THEN json_extract(payload, '$.amount') END) AS transaction_volume,
                TOTAL(CASE WHEN event_type = 'CLAWBACK_LOGGED'
                    THEN json_extract(payload, '$.amount') END) AS clawback_volume,
                COALESCE(MAX(block_number), 0) AS latest_block
            FROM ledger_blocks
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Overwrite a stored payload. Only used to simulate tampering in tests.
    #[cfg(test)]
    pub async fn tamper_payload(&self, block_number: i64, payload: &str) -> LedgerResult<()> {
        sqlx::query("UPDATE ledger_blocks SET payload = ? WHERE block_number = ?")
            .bind(payload)
            .bind(block_number)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::sqlite::SqlitePoolOptions;

    /// A single-connection in-memory database with the schema applied.
    pub(crate) async fn setup_test_db() -> LedgerRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        let repo = LedgerRepository::new(pool);
        repo.init_schema().await.expect("Failed to init schema");
        repo
    }

    fn block(number: i64, event_type: EventType, subject: &str, amount: f64) -> LedgerBlock {
        LedgerBlock {
            block_number: number,
            event_type,
            subject_id: subject.to_string(),
            wallet_id: "w-1".to_string(),
            payload: serde_json::json!({"amount": amount, "wallet_id": "w-1"}),
            data_hash: format!("0xdata{}", number),
            previous_hash: format!("0xblock{}", number - 1),
            block_hash: format!("0xblock{}", number),
            tx_hash: format!("0xtx{}", number),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_tip() {
        let repo = setup_test_db().await;
        assert!(repo.tip().await.unwrap().is_none());

        repo.insert_block(&block(1, EventType::TransactionLogged, "tx-1", 10.0))
            .await
            .unwrap();
        repo.insert_block(&block(2, EventType::ViolationLogged, "tx-1", 10.0))
            .await
            .unwrap();

        let tip = repo.tip().await.unwrap().unwrap();
        assert_eq!(tip.block_number, 2);
        assert_eq!(tip.event_type, EventType::ViolationLogged);
    }

    #[tokio::test]
    async fn test_subject_lookup() {
        let repo = setup_test_db().await;
        repo.insert_block(&block(1, EventType::PolicyRegistered, "w-1", 0.0))
            .await
            .unwrap();
        repo.insert_block(&block(2, EventType::PolicyRegistered, "w-1", 0.0))
            .await
            .unwrap();
        repo.insert_block(&block(3, EventType::PolicyRegistered, "w-2", 0.0))
            .await
            .unwrap();

        let latest = repo
            .latest_for_subject(EventType::PolicyRegistered, "w-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.block_number, 2);
        assert_eq!(
            repo.count_for_subject(EventType::PolicyRegistered, "w-1")
                .await
                .unwrap(),
            2
        );
        assert!(repo
            .latest_for_subject(EventType::TransactionLogged, "w-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_transaction_rejected_by_schema() {
        let repo = setup_test_db().await;
        repo.insert_block(&block(1, EventType::TransactionLogged, "tx-1", 10.0))
            .await
            .unwrap();
        let result = repo
            .insert_block(&block(2, EventType::TransactionLogged, "tx-1", 10.0))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_find_by_any_hash() {
        let repo = setup_test_db().await;
        repo.insert_block(&block(1, EventType::TransactionLogged, "tx-1", 10.0))
            .await
            .unwrap();

        for hash in ["0xtx1", "0xblock1", "0xdata1"] {
            let found = repo.find_by_hash(hash).await.unwrap().unwrap();
            assert_eq!(found.block_number, 1);
        }
        assert!(repo.find_by_hash("0xnothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_totals() {
        let repo = setup_test_db().await;
        assert_eq!(repo.totals().await.unwrap(), LedgerTotals::default());

        repo.insert_block(&block(1, EventType::PolicyRegistered, "w-1", 0.0))
            .await
            .unwrap();
        repo.insert_block(&block(2, EventType::PolicyRegistered, "w-1", 0.0))
            .await
            .unwrap();
        repo.insert_block(&block(3, EventType::TransactionLogged, "tx-1", 120.5))
            .await
            .unwrap();
        repo.insert_block(&block(4, EventType::TransactionLogged, "tx-2", 79.5))
            .await
            .unwrap();
        repo.insert_block(&block(5, EventType::ClawbackLogged, "tx-2", 79.5))
            .await
            .unwrap();

        let totals = repo.totals().await.unwrap();
        assert_eq!(totals.policies_registered, 1);
        assert_eq!(totals.policy_versions, 2);
        assert_eq!(totals.transactions_logged, 2);
        assert_eq!(totals.violations_logged, 0);
        assert_eq!(totals.clawbacks_logged, 1);
        assert_eq!(totals.transaction_volume, 200.0);
        assert_eq!(totals.clawback_volume, 79.5);
        assert_eq!(totals.latest_block, 5);
    }

    #[tokio::test]
    async fn test_recent_and_paging() {
        let repo = setup_test_db().await;
        for n in 1..=5 {
            let event = if n % 2 == 0 {
                EventType::ViolationLogged
            } else {
                EventType::TransactionLogged
            };
            repo.insert_block(&block(n, event, &format!("tx-{}", n), 1.0))
                .await
                .unwrap();
        }

        let recent = repo.recent_blocks(None, 2).await.unwrap();
        assert_eq!(
            recent.iter().map(|b| b.block_number).collect::<Vec<_>>(),
            vec![5, 4]
        );

        let violations = repo
            .recent_blocks(Some(EventType::ViolationLogged), 10)
            .await
            .unwrap();
        assert_eq!(violations.len(), 2);

        let page = repo.blocks_after(2, 2).await.unwrap();
        assert_eq!(
            page.iter().map(|b| b.block_number).collect::<Vec<_>>(),
            vec![3, 4]
        );
    }
}
