//! HTTP request handlers.
//!
//! Paths in the OpenAPI annotations assume the default `/api/v1` prefix.

use axum::{extract::State, http::StatusCode, Json};

use crate::api::extract::{PathParam, Payload, QueryParams};
use crate::api::types::*;
use crate::domain::{
    validate_identifier, ChainReport, ClawbackRecord, EventType, LedgerEntry, LedgerStatistics,
    PolicyRecord, TransactionRecord, ViolationRecord,
};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::DEFAULT_AUDIT_LIMIT;
use crate::AppState;

type Created<T> = (StatusCode, Json<ApiResponse<T>>);

fn path_id(field: &str, raw: &str) -> LedgerResult<String> {
    validate_identifier(field, raw).map_err(LedgerError::BadRequest)
}

// ==================== Health ====================

/// Health check endpoint.
///
/// GET /health
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    // Check database connectivity
    let db_status = match sqlx::query("SELECT 1")
        .fetch_one(state.ledger.repository().pool())
        .await
    {
        Ok(_) => "connected".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            "unavailable".to_string()
        }
    };

    Json(HealthResponse {
        success: true,
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
        network: state.config.chain.network.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Version information.
///
/// GET /version
#[utoipa::path(
    get,
    path = "/api/v1/version",
    responses(
        (status = 200, description = "Version information", body = VersionResponse)
    ),
    tag = "health"
)]
pub async fn version(State(state): State<AppState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        network: state.config.chain.network.clone(),
        chain_id: state.config.chain.chain_id.clone(),
        api_prefix: state.config.server.api_prefix.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

// ==================== Policy ====================

/// Register a policy for a wallet.
///
/// POST /blockchain/policy/register
#[utoipa::path(
    post,
    path = "/api/v1/blockchain/policy/register",
    request_body = RegisterPolicyRequest,
    responses(
        (status = 201, description = "Policy recorded", body = ApiResponse<LedgerEntry<PolicyRecord>>),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Missing or invalid API key")
    ),
    security(("api_key" = [])),
    tag = "policy"
)]
pub async fn register_policy(
    State(state): State<AppState>,
    Payload(request): Payload<RegisterPolicyRequest>,
) -> LedgerResult<Created<LedgerEntry<PolicyRecord>>> {
    let policy = request.into_record()?;

    let entry = state.ledger.register_policy(policy).await?;

    tracing::info!(
        wallet_id = %entry.record.wallet_id,
        policy_id = %entry.record.policy_id,
        version = entry.record.version,
        block_number = entry.receipt.block_number,
        "Policy registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Policy registered", entry)),
    ))
}

/// Fetch the policy in force for a wallet.
///
/// GET /blockchain/policy/{wallet_id}
#[utoipa::path(
    get,
    path = "/api/v1/blockchain/policy/{wallet_id}",
    params(
        ("wallet_id" = String, Path, description = "Wallet ID")
    ),
    responses(
        (status = 200, description = "Latest policy", body = ApiResponse<LedgerEntry<PolicyRecord>>),
        (status = 404, description = "No policy for wallet")
    ),
    tag = "policy"
)]
pub async fn get_policy(
    State(state): State<AppState>,
    PathParam(wallet_id): PathParam<String>,
) -> LedgerResult<Json<ApiResponse<LedgerEntry<PolicyRecord>>>> {
    let wallet_id = path_id("wallet_id", &wallet_id)?;
    let entry = state.ledger.policy_for_wallet(&wallet_id).await?;

    Ok(Json(ApiResponse::ok("Policy found", entry)))
}

// ==================== Transaction ====================

/// Log a transaction.
///
/// POST /blockchain/transaction/log
#[utoipa::path(
    post,
    path = "/api/v1/blockchain/transaction/log",
    request_body = LogTransactionRequest,
    responses(
        (status = 201, description = "Transaction recorded", body = ApiResponse<LedgerEntry<TransactionRecord>>),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 409, description = "Transaction already logged")
    ),
    security(("api_key" = [])),
    tag = "transaction"
)]
pub async fn log_transaction(
    State(state): State<AppState>,
    Payload(request): Payload<LogTransactionRequest>,
) -> LedgerResult<Created<LedgerEntry<TransactionRecord>>> {
    let transaction = request.into_record()?;

    let entry = state.ledger.log_transaction(transaction).await?;

    tracing::info!(
        transaction_id = %entry.record.transaction_id,
        wallet_id = %entry.record.wallet_id,
        status = %entry.record.status,
        block_number = entry.receipt.block_number,
        "Transaction logged"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Transaction logged", entry)),
    ))
}

/// Fetch a logged transaction.
///
/// GET /blockchain/transaction/{tx_id}
#[utoipa::path(
    get,
    path = "/api/v1/blockchain/transaction/{tx_id}",
    params(
        ("tx_id" = String, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Transaction", body = ApiResponse<LedgerEntry<TransactionRecord>>),
        (status = 404, description = "Transaction not found")
    ),
    tag = "transaction"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    PathParam(tx_id): PathParam<String>,
) -> LedgerResult<Json<ApiResponse<LedgerEntry<TransactionRecord>>>> {
    let tx_id = path_id("tx_id", &tx_id)?;
    let entry = state.ledger.transaction(&tx_id).await?;

    Ok(Json(ApiResponse::ok("Transaction found", entry)))
}

// ==================== Violation ====================

/// Log a policy violation.
///
/// POST /blockchain/violation/log
#[utoipa::path(
    post,
    path = "/api/v1/blockchain/violation/log",
    request_body = LogViolationRequest,
    responses(
        (status = 201, description = "Violation recorded", body = ApiResponse<LedgerEntry<ViolationRecord>>),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Missing or invalid API key")
    ),
    security(("api_key" = [])),
    tag = "violation"
)]
pub async fn log_violation(
    State(state): State<AppState>,
    Payload(request): Payload<LogViolationRequest>,
) -> LedgerResult<Created<LedgerEntry<ViolationRecord>>> {
    let violation = request.into_record()?;

    let entry = state.ledger.log_violation(violation).await?;

    tracing::info!(
        transaction_id = %entry.record.transaction_id,
        violation_type = %entry.record.violation_type,
        block_number = entry.receipt.block_number,
        "Violation logged"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Violation logged", entry)),
    ))
}

/// Fetch the violations logged for a transaction.
///
/// GET /blockchain/violation/{tx_id}
#[utoipa::path(
    get,
    path = "/api/v1/blockchain/violation/{tx_id}",
    params(
        ("tx_id" = String, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Violations, oldest first", body = ApiResponse<ViolationsResponse>),
        (status = 404, description = "No violations for transaction")
    ),
    tag = "violation"
)]
pub async fn get_violations(
    State(state): State<AppState>,
    PathParam(tx_id): PathParam<String>,
) -> LedgerResult<Json<ApiResponse<ViolationsResponse>>> {
    let tx_id = path_id("tx_id", &tx_id)?;
    let violations = state.ledger.violations(&tx_id).await?;

    Ok(Json(ApiResponse::ok(
        "Violations found",
        ViolationsResponse {
            transaction_id: tx_id,
            count: violations.len(),
            violations,
        },
    )))
}

// ==================== Clawback ====================

/// Log a clawback.
///
/// POST /blockchain/clawback/log
#[utoipa::path(
    post,
    path = "/api/v1/blockchain/clawback/log",
    request_body = LogClawbackRequest,
    responses(
        (status = 201, description = "Clawback recorded", body = ApiResponse<LedgerEntry<ClawbackRecord>>),
        (status = 400, description = "Invalid request or amount exceeds transaction"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 409, description = "Transaction already clawed back")
    ),
    security(("api_key" = [])),
    tag = "clawback"
)]
pub async fn log_clawback(
    State(state): State<AppState>,
    Payload(request): Payload<LogClawbackRequest>,
) -> LedgerResult<Created<LedgerEntry<ClawbackRecord>>> {
    let clawback = request.into_record()?;

    let entry = state.ledger.log_clawback(clawback).await?;

    tracing::info!(
        clawback_id = %entry.record.clawback_id,
        transaction_id = %entry.record.transaction_id,
        reason = %entry.record.reason,
        amount = entry.record.amount,
        block_number = entry.receipt.block_number,
        "Clawback logged"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Clawback logged", entry)),
    ))
}

/// Fetch the clawback for a transaction.
///
/// GET /blockchain/clawback/{tx_id}
#[utoipa::path(
    get,
    path = "/api/v1/blockchain/clawback/{tx_id}",
    params(
        ("tx_id" = String, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Clawback", body = ApiResponse<LedgerEntry<ClawbackRecord>>),
        (status = 404, description = "No clawback for transaction")
    ),
    tag = "clawback"
)]
pub async fn get_clawback(
    State(state): State<AppState>,
    PathParam(tx_id): PathParam<String>,
) -> LedgerResult<Json<ApiResponse<LedgerEntry<ClawbackRecord>>>> {
    let tx_id = path_id("tx_id", &tx_id)?;
    let entry = state.ledger.clawback(&tx_id).await?;

    Ok(Json(ApiResponse::ok("Clawback found", entry)))
}

// ==================== Ledger ====================

/// Aggregate ledger statistics.
///
/// GET /blockchain/statistics
#[utoipa::path(
    get,
    path = "/api/v1/blockchain/statistics",
    responses(
        (status = 200, description = "Statistics", body = ApiResponse<LedgerStatistics>)
    ),
    tag = "ledger"
)]
pub async fn get_statistics(
    State(state): State<AppState>,
) -> LedgerResult<Json<ApiResponse<LedgerStatistics>>> {
    let stats = state.ledger.statistics().await?;

    Ok(Json(ApiResponse::ok("Statistics generated", stats)))
}

/// Recent ledger blocks.
///
/// GET /blockchain/audit
#[utoipa::path(
    get,
    path = "/api/v1/blockchain/audit",
    params(
        ("limit" = Option<i64>, Query, description = "Maximum blocks (default 50, max 500)"),
        ("event_type" = Option<String>, Query, description = "POLICY_REGISTERED, TRANSACTION_LOGGED, VIOLATION_LOGGED or CLAWBACK_LOGGED")
    ),
    responses(
        (status = 200, description = "Blocks, newest first", body = ApiResponse<AuditLogResponse>),
        (status = 400, description = "Unknown event type")
    ),
    tag = "ledger"
)]
pub async fn list_audit_log(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<AuditLogQuery>,
) -> LedgerResult<Json<ApiResponse<AuditLogResponse>>> {
    let event_type = query
        .event_type
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<EventType>().map_err(LedgerError::BadRequest))
        .transpose()?;

    let blocks = state
        .ledger
        .recent_blocks(event_type, query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT))
        .await?;

    Ok(Json(ApiResponse::ok(
        "Audit log",
        AuditLogResponse {
            count: blocks.len(),
            blocks,
        },
    )))
}

/// Look up a block by transaction hash, block hash or data hash.
///
/// GET /blockchain/verify/{hash}
#[utoipa::path(
    get,
    path = "/api/v1/blockchain/verify/{hash}",
    params(
        ("hash" = String, Path, description = "Transaction, block or data hash")
    ),
    responses(
        (status = 200, description = "Block found", body = ApiResponse<HashLookupResponse>),
        (status = 404, description = "Hash not on the ledger")
    ),
    tag = "ledger"
)]
pub async fn verify_hash(
    State(state): State<AppState>,
    PathParam(hash): PathParam<String>,
) -> LedgerResult<Json<ApiResponse<HashLookupResponse>>> {
    let block = state
        .ledger
        .find_by_hash(&hash)
        .await?
        .ok_or_else(|| LedgerError::NotFound(format!("Hash {} is not on the ledger", hash)))?;

    let receipt = state.ledger.receipt(&block);
    Ok(Json(ApiResponse::ok(
        "Hash verified",
        HashLookupResponse { block, receipt },
    )))
}

/// Re-verify every block in the chain.
///
/// GET /blockchain/chain/verify
#[utoipa::path(
    get,
    path = "/api/v1/blockchain/chain/verify",
    responses(
        (status = 200, description = "Integrity report", body = ApiResponse<ChainReport>)
    ),
    tag = "ledger"
)]
pub async fn verify_chain(
    State(state): State<AppState>,
) -> LedgerResult<Json<ApiResponse<ChainReport>>> {
    let report = state.ledger.verify_chain().await?;
    let message = if report.valid {
        "Chain is intact"
    } else {
        "Chain integrity violated"
    };

    Ok(Json(ApiResponse::ok(message, report)))
}
