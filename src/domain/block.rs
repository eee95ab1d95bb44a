//! Ledger block and receipt types.
//!
//! Every audited record is appended as one block, hash-linked to the block
//! before it. Callers receive a chain-style receipt for each append.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of event a block records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    PolicyRegistered,
    TransactionLogged,
    ViolationLogged,
    ClawbackLogged,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::PolicyRegistered,
        EventType::TransactionLogged,
        EventType::ViolationLogged,
        EventType::ClawbackLogged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PolicyRegistered => "POLICY_REGISTERED",
            EventType::TransactionLogged => "TRANSACTION_LOGGED",
            EventType::ViolationLogged => "VIOLATION_LOGGED",
            EventType::ClawbackLogged => "CLAWBACK_LOGGED",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|event| event.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Unknown event type: {}. Use one of POLICY_REGISTERED, TRANSACTION_LOGGED, VIOLATION_LOGGED, CLAWBACK_LOGGED",
                    s
                )
            })
    }
}

/// A resource that can be appended to the ledger.
pub trait LedgerRecord: Serialize {
    const EVENT_TYPE: EventType;

    /// Key the record is looked up by (wallet id or transaction id).
    fn subject_id(&self) -> &str;

    fn wallet_id(&self) -> &str;
}

/// One entry of the hash-chained ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LedgerBlock {
    /// 1-based, contiguous position in the chain.
    pub block_number: i64,
    pub event_type: EventType,
    pub subject_id: String,
    pub wallet_id: String,
    /// The audited record, as stored.
    pub payload: serde_json::Value,
    pub data_hash: String,
    pub previous_hash: String,
    pub block_hash: String,
    pub tx_hash: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerBlock {
    /// Timestamp exactly as it participates in the block hash.
    pub fn timestamp(&self) -> String {
        format_timestamp(&self.created_at)
    }
}

/// Render a timestamp with microsecond precision, the form hashed and stored.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Acknowledgement returned for every append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Receipt {
    pub transaction_hash: String,
    pub block_number: i64,
    pub block_hash: String,
    pub data_hash: String,
    pub status: String,
    pub network: String,
    pub chain_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub contract_address: String,
    pub timestamp: String,
}

impl Receipt {
    pub fn for_block(block: &LedgerBlock, network: &str, chain_id: &str, contract: &str) -> Self {
        Self {
            transaction_hash: block.tx_hash.clone(),
            block_number: block.block_number,
            block_hash: block.block_hash.clone(),
            data_hash: block.data_hash.clone(),
            status: "confirmed".to_string(),
            network: network.to_string(),
            chain_id: chain_id.to_string(),
            contract_address: contract.to_string(),
            timestamp: block.timestamp(),
        }
    }
}

/// A stored record together with the receipt of the block holding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LedgerEntry<T> {
    pub record: T,
    pub receipt: Receipt,
}

/// Outcome of re-verifying every block in the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChainReport {
    pub valid: bool,
    pub blocks_checked: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_invalid_block: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ChainReport {
    pub fn valid(blocks_checked: i64) -> Self {
        Self {
            valid: true,
            blocks_checked,
            first_invalid_block: None,
            reason: None,
        }
    }

    pub fn broken(blocks_checked: i64, block_number: i64, reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            blocks_checked,
            first_invalid_block: Some(block_number),
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_round_trip() {
        for event in EventType::ALL {
            assert_eq!(event.to_string().parse::<EventType>().unwrap(), event);
            let json = serde_json::to_string(&event).unwrap();
            assert_eq!(json, format!("\"{}\"", event.as_str()));
        }
    }

    #[test]
    fn test_event_type_parse_is_case_insensitive() {
        assert_eq!(
            "clawback_logged".parse::<EventType>().unwrap(),
            EventType::ClawbackLogged
        );
        assert!("POLICY_DELETED".parse::<EventType>().is_err());
    }

    #[test]
    fn test_timestamp_is_stable_across_reparse() {
        let now = Utc::now();
        let rendered = format_timestamp(&now);
        let reparsed = DateTime::parse_from_rfc3339(&rendered)
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(&reparsed), rendered);
    }
}
