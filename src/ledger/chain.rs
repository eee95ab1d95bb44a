//! The hash-chained ledger.
//!
//! Appends are serialised through a single async mutex so block numbers stay
//! contiguous and every block links to the one before it. Reads go straight
//! to the repository and run concurrently.

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use tokio::sync::{Mutex, MutexGuard};

use crate::config::ChainConfig;
use crate::domain::{
    format_timestamp, ChainReport, EventType, LedgerBlock, LedgerRecord, Receipt,
};
use crate::error::LedgerResult;
use crate::ledger::hashing::{self, GENESIS_HASH};
use crate::storage::LedgerRepository;

/// Blocks fetched per page while verifying the chain.
const VERIFY_PAGE_SIZE: i64 = 500;

/// Append-only audit ledger backed by the repository.
#[derive(Clone)]
pub struct Ledger {
    repository: LedgerRepository,
    chain: Arc<ChainConfig>,
    append_lock: Arc<Mutex<()>>,
}

impl Ledger {
    pub fn new(repository: LedgerRepository, chain: ChainConfig) -> Self {
        Self {
            repository,
            chain: Arc::new(chain),
            append_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn repository(&self) -> &LedgerRepository {
        &self.repository
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    /// Take the append lock. Checks made through the writer cannot race with
    /// other appends until it is dropped.
    pub async fn writer(&self) -> LedgerWriter<'_> {
        LedgerWriter {
            ledger: self,
            _guard: self.append_lock.lock().await,
        }
    }

    /// Build the receipt for a stored block.
    pub fn receipt(&self, block: &LedgerBlock) -> Receipt {
        Receipt::for_block(
            block,
            &self.chain.network,
            &self.chain.chain_id,
            &self.chain.contract_address,
        )
    }

    /// Find a block by any of its hashes.
    pub async fn find_by_hash(&self, hash: &str) -> LedgerResult<Option<LedgerBlock>> {
        self.repository.find_by_hash(hash.trim()).await
    }

    /// Recompute every hash and link in the chain.
    pub async fn verify_chain(&self) -> LedgerResult<ChainReport> {
        let mut expected_previous = GENESIS_HASH.to_string();
        let mut expected_number = 1;
        let mut checked = 0;

        loop {
            let page = self
                .repository
                .blocks_after(expected_number - 1, VERIFY_PAGE_SIZE)
                .await?;
            if page.is_empty() {
                break;
            }

            for row in page {
                checked += 1;
                let block = match row.decode() {
                    Ok(block) => block,
                    Err(undecodable) => {
                        tracing::warn!(
                            block_number = undecodable.block_number,
                            reason = %undecodable.reason,
                            "Ledger block cannot be decoded"
                        );
                        return Ok(ChainReport::broken(
                            checked,
                            undecodable.block_number,
                            undecodable.reason,
                        ));
                    }
                };
                if let Some(reason) = check_block(&block, expected_number, &expected_previous) {
                    tracing::warn!(
                        block_number = block.block_number,
                        reason = %reason,
                        "Ledger integrity check failed"
                    );
                    return Ok(ChainReport::broken(checked, block.block_number, reason));
                }
                expected_previous = block.block_hash;
                expected_number += 1;
            }
        }

        Ok(ChainReport::valid(checked))
    }
}

/// Returns why `block` does not fit at `expected_number`, if it does not.
fn check_block(block: &LedgerBlock, expected_number: i64, expected_previous: &str) -> Option<String> {
    if block.block_number != expected_number {
        return Some(format!(
            "expected block {} but found block {}",
            expected_number, block.block_number
        ));
    }
    if block.previous_hash != expected_previous {
        return Some("previous hash does not match predecessor".to_string());
    }
    if hashing::data_hash(&block.payload) != block.data_hash {
        return Some("payload does not match data hash".to_string());
    }
    let recomputed = hashing::block_hash(
        block.block_number,
        &block.previous_hash,
        &block.data_hash,
        &block.timestamp(),
    );
    if recomputed != block.block_hash {
        return Some("block hash does not match block contents".to_string());
    }
    None
}

/// Exclusive handle for appending to the ledger.
pub struct LedgerWriter<'a> {
    ledger: &'a Ledger,
    _guard: MutexGuard<'a, ()>,
}

impl LedgerWriter<'_> {
    pub fn repository(&self) -> &LedgerRepository {
        &self.ledger.repository
    }

    /// Hash, link and persist a record as the next block.
    pub async fn append<R: LedgerRecord>(&mut self, record: &R) -> LedgerResult<(LedgerBlock, Receipt)> {
        let payload = serde_json::to_value(record)?;
        let tip = self.ledger.repository.tip().await?;
        let (block_number, previous_hash) = match tip {
            Some(tip) => (tip.block_number + 1, tip.block_hash),
            None => (1, GENESIS_HASH.to_string()),
        };

        // Stored timestamps carry microseconds; hash exactly that rendering.
        let created_at = Utc::now().trunc_subsecs(6);
        let timestamp = format_timestamp(&created_at);

        let data_hash = hashing::data_hash(&payload);
        let block_hash = hashing::block_hash(block_number, &previous_hash, &data_hash, &timestamp);
        let chain = &self.ledger.chain;
        let tx_hash = hashing::tx_hash(&chain.network, &chain.contract_address, &block_hash);

        let block = LedgerBlock {
            block_number,
            event_type: R::EVENT_TYPE,
            subject_id: record.subject_id().to_string(),
            wallet_id: record.wallet_id().to_string(),
            payload,
            data_hash,
            previous_hash,
            block_hash,
            tx_hash,
            created_at,
        };
        self.ledger.repository.insert_block(&block).await?;

        tracing::info!(
            block_number = block.block_number,
            event_type = %block.event_type,
            subject_id = %block.subject_id,
            tx_hash = %block.tx_hash,
            "Ledger block appended"
        );

        let receipt = self.ledger.receipt(&block);
        Ok((block, receipt))
    }

    /// Latest block for a subject, seen under the append lock.
    pub async fn latest(&self, event_type: EventType, subject_id: &str) -> LedgerResult<Option<LedgerBlock>> {
        self.ledger
            .repository
            .latest_for_subject(event_type, subject_id)
            .await
    }
}
