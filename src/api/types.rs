//! API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    optional_text, require_text, validate_identifier, validate_non_negative_amount,
    validate_positive_amount, ClawbackReason, ClawbackRecord, ClawbackStatus,
    LedgerBlock, LedgerEntry, PolicyRecord, Receipt, TransactionRecord, TransactionStatus,
    ViolationRecord,
};
use crate::error::{LedgerError, LedgerResult};

/// Currency assumed when a transaction does not name one.
pub const DEFAULT_CURRENCY: &str = "INR";

// ==================== Envelope ====================

/// Success envelope: `{ success, message, data }`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

// ==================== Policy ====================

/// Request to register a policy for a wallet.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterPolicyRequest {
    #[serde(alias = "walletId")]
    pub wallet_id: String,
    /// Generated when omitted.
    #[serde(default, alias = "policyId")]
    pub policy_id: Option<String>,
    pub name: String,
    #[serde(default, alias = "policyType")]
    pub policy_type: Option<String>,
    /// Rule definitions. Must be a JSON object; form bodies may send it as a
    /// JSON-encoded string.
    #[serde(default)]
    pub rules: Option<serde_json::Value>,
    #[serde(default, alias = "expiresAt")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl RegisterPolicyRequest {
    /// Validate into a record. The version is assigned when appended.
    pub fn into_record(self) -> LedgerResult<PolicyRecord> {
        let policy = PolicyRecord {
            policy_id: match optional_text(self.policy_id) {
                Some(id) => validate_identifier("policy_id", &id).map_err(LedgerError::BadRequest)?,
                None => Uuid::new_v4().to_string(),
            },
            wallet_id: validate_identifier("wallet_id", &self.wallet_id)
                .map_err(LedgerError::BadRequest)?,
            name: require_text("name", &self.name).map_err(LedgerError::BadRequest)?,
            policy_type: optional_text(self.policy_type),
            rules: parse_rules(self.rules)?,
            expires_at: self.expires_at,
            version: 0,
            registered_at: Utc::now(),
        };

        if policy.is_expired_at(policy.registered_at) {
            return Err(LedgerError::BadRequest(
                "expires_at must be in the future".to_string(),
            ));
        }
        Ok(policy)
    }
}

fn parse_rules(rules: Option<serde_json::Value>) -> LedgerResult<serde_json::Value> {
    let rules = match rules {
        None | Some(serde_json::Value::Null) => return Ok(serde_json::json!({})),
        Some(serde_json::Value::String(encoded)) => serde_json::from_str(&encoded).map_err(|e| {
            LedgerError::BadRequest(format!("rules is not valid JSON: {}", e))
        })?,
        Some(value) => value,
    };

    if !rules.is_object() {
        return Err(LedgerError::BadRequest(
            "rules must be a JSON object".to_string(),
        ));
    }
    Ok(rules)
}

// ==================== Transaction ====================

/// Request to log a transaction.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LogTransactionRequest {
    #[serde(alias = "transactionId", alias = "txId")]
    pub transaction_id: String,
    #[serde(alias = "walletId")]
    pub wallet_id: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
    /// Defaults to `APPROVED`.
    #[serde(default)]
    pub status: Option<TransactionStatus>,
}

impl LogTransactionRequest {
    pub fn into_record(self) -> LedgerResult<TransactionRecord> {
        Ok(TransactionRecord {
            transaction_id: validate_identifier("transaction_id", &self.transaction_id)
                .map_err(LedgerError::BadRequest)?,
            wallet_id: validate_identifier("wallet_id", &self.wallet_id)
                .map_err(LedgerError::BadRequest)?,
            amount: validate_positive_amount("amount", self.amount)
                .map_err(LedgerError::BadRequest)?,
            currency: optional_text(self.currency)
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            category: optional_text(self.category),
            merchant: optional_text(self.merchant),
            status: self.status.unwrap_or_default(),
            logged_at: Utc::now(),
        })
    }
}

// ==================== Violation ====================

/// Request to log a policy violation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LogViolationRequest {
    #[serde(alias = "transactionId", alias = "txId")]
    pub transaction_id: String,
    #[serde(alias = "walletId")]
    pub wallet_id: String,
    #[serde(alias = "violationType")]
    pub violation_type: String,
    #[serde(default, alias = "policyId")]
    pub policy_id: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub details: Option<String>,
}

impl LogViolationRequest {
    pub fn into_record(self) -> LedgerResult<ViolationRecord> {
        Ok(ViolationRecord {
            violation_id: Uuid::new_v4().to_string(),
            transaction_id: validate_identifier("transaction_id", &self.transaction_id)
                .map_err(LedgerError::BadRequest)?,
            wallet_id: validate_identifier("wallet_id", &self.wallet_id)
                .map_err(LedgerError::BadRequest)?,
            violation_type: require_text("violation_type", &self.violation_type)
                .map_err(LedgerError::BadRequest)?,
            policy_id: optional_text(self.policy_id)
                .map(|id| validate_identifier("policy_id", &id))
                .transpose()
                .map_err(LedgerError::BadRequest)?,
            amount: self
                .amount
                .map(|a| validate_non_negative_amount("amount", a))
                .transpose()
                .map_err(LedgerError::BadRequest)?,
            details: optional_text(self.details),
            logged_at: Utc::now(),
        })
    }
}

// ==================== Clawback ====================

/// Request to log a clawback.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LogClawbackRequest {
    /// Generated when omitted.
    #[serde(default, alias = "clawbackId")]
    pub clawback_id: Option<String>,
    #[serde(alias = "transactionId", alias = "txId")]
    pub transaction_id: String,
    #[serde(alias = "walletId")]
    pub wallet_id: String,
    pub amount: f64,
    /// Defaults to `POLICY_VIOLATION`.
    #[serde(default)]
    pub reason: Option<ClawbackReason>,
    /// Defaults to `EXECUTED`.
    #[serde(default)]
    pub status: Option<ClawbackStatus>,
}

impl LogClawbackRequest {
    pub fn into_record(self) -> LedgerResult<ClawbackRecord> {
        Ok(ClawbackRecord {
            clawback_id: match optional_text(self.clawback_id) {
                Some(id) => {
                    validate_identifier("clawback_id", &id).map_err(LedgerError::BadRequest)?
                }
                None => Uuid::new_v4().to_string(),
            },
            transaction_id: validate_identifier("transaction_id", &self.transaction_id)
                .map_err(LedgerError::BadRequest)?,
            wallet_id: validate_identifier("wallet_id", &self.wallet_id)
                .map_err(LedgerError::BadRequest)?,
            amount: validate_positive_amount("amount", self.amount)
                .map_err(LedgerError::BadRequest)?,
            reason: self.reason.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            logged_at: Utc::now(),
        })
    }
}

// ==================== Reads ====================

/// Violations logged for one transaction.
#[derive(Debug, Serialize, ToSchema)]
pub struct ViolationsResponse {
    pub transaction_id: String,
    pub count: usize,
    pub violations: Vec<LedgerEntry<ViolationRecord>>,
}

/// Query parameters for the audit log.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AuditLogQuery {
    /// Maximum number of blocks (default 50, max 500).
    #[serde(default)]
    pub limit: Option<i64>,
    /// Filter by event type, e.g. `CLAWBACK_LOGGED`.
    #[serde(default)]
    pub event_type: Option<String>,
}

/// Recent ledger blocks, newest first.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogResponse {
    pub blocks: Vec<LedgerBlock>,
    pub count: usize,
}

/// A block found by hash.
#[derive(Debug, Serialize, ToSchema)]
pub struct HashLookupResponse {
    pub block: LedgerBlock,
    pub receipt: Receipt,
}

// ==================== Health ====================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub success: bool,
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Database connectivity.
    pub database: String,
    pub network: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

/// Version information.
#[derive(Debug, Serialize, ToSchema)]
pub struct VersionResponse {
    pub version: String,
    pub network: String,
    pub chain_id: String,
    pub api_prefix: String,
    pub timestamp: String,
}
