//! Route definitions and the middleware stack.

use std::any::Any;
use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, MethodRouter},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::handlers;
use crate::auth::{require_api_key, ApiKeyValidator, API_KEY_HEADER};
use crate::config::{AuthConfig, Config, CorsConfig};
use crate::error::{ErrorResponse, ENDPOINT_NOT_FOUND, INTERNAL_SERVER_ERROR};
use crate::AppState;

/// Response header carrying the handling time in milliseconds.
pub const PROCESS_TIME_HEADER: &str = "x-process-time-ms";

/// Security scheme modifier for OpenAPI.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
            );
        }
    }
}

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health_check,
        handlers::version,
        handlers::register_policy,
        handlers::get_policy,
        handlers::log_transaction,
        handlers::get_transaction,
        handlers::log_violation,
        handlers::get_violations,
        handlers::log_clawback,
        handlers::get_clawback,
        handlers::get_statistics,
        handlers::list_audit_log,
        handlers::verify_hash,
        handlers::verify_chain,
    ),
    components(schemas(
        crate::api::types::RegisterPolicyRequest,
        crate::api::types::LogTransactionRequest,
        crate::api::types::LogViolationRequest,
        crate::api::types::LogClawbackRequest,
        crate::api::types::ViolationsResponse,
        crate::api::types::AuditLogResponse,
        crate::api::types::HashLookupResponse,
        crate::api::types::HealthResponse,
        crate::api::types::VersionResponse,
        crate::domain::PolicyRecord,
        crate::domain::TransactionRecord,
        crate::domain::TransactionStatus,
        crate::domain::ViolationRecord,
        crate::domain::ClawbackRecord,
        crate::domain::ClawbackReason,
        crate::domain::ClawbackStatus,
        crate::domain::EventType,
        crate::domain::LedgerBlock,
        crate::domain::Receipt,
        crate::domain::ChainReport,
        crate::domain::LedgerStatistics,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "policy", description = "Spending policy registration"),
        (name = "transaction", description = "Transaction logging"),
        (name = "violation", description = "Policy violation logging"),
        (name = "clawback", description = "Clawback logging"),
        (name = "ledger", description = "Statistics, audit log and integrity checks"),
        (name = "health", description = "Health and status endpoints")
    ),
    info(
        title = "IntentForge Ledger API",
        version = "0.1.0",
        description = "Hash-chained audit ledger for IntentForge policies, transactions, violations and clawbacks",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Build the application router, mounted at the configured API prefix and
/// wrapped in the full middleware stack.
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();
    let prefix = config.server.api_prefix.as_str();

    let api = api_routes(&config.auth);
    let app = if prefix.is_empty() {
        Router::new().merge(api)
    } else {
        // Load balancers probe the root regardless of prefix
        Router::new()
            .nest(prefix, api)
            .route("/health", or_not_found(get(handlers::health_check)))
    };

    let app = app
        .fallback(endpoint_not_found)
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    with_middleware(app, &config)
}

/// Routes relative to the API prefix. Writes require an API key when auth is
/// enabled; reads stay public.
fn api_routes(auth: &AuthConfig) -> Router<AppState> {
    let validator = if auth.enabled {
        let validator = ApiKeyValidator::new(auth.api_keys.clone());
        tracing::info!(api_keys = validator.key_count(), "API key auth enabled for writes");
        Some(validator)
    } else {
        tracing::warn!("Authentication is DISABLED - enable for production");
        None
    };

    // The key check wraps only the POST handler, so a wrong method on a write
    // path still falls through to the 404 envelope.
    let write = |method_router: MethodRouter<AppState>| {
        let method_router = match &validator {
            Some(validator) => method_router.route_layer(middleware::from_fn_with_state(
                validator.clone(),
                require_api_key,
            )),
            None => method_router,
        };
        or_not_found(method_router)
    };

    Router::new()
        .route("/blockchain/policy/register", write(post(handlers::register_policy)))
        .route("/blockchain/transaction/log", write(post(handlers::log_transaction)))
        .route("/blockchain/violation/log", write(post(handlers::log_violation)))
        .route("/blockchain/clawback/log", write(post(handlers::log_clawback)))
        .route("/health", or_not_found(get(handlers::health_check)))
        .route("/version", or_not_found(get(handlers::version)))
        .route("/blockchain/policy/:wallet_id", or_not_found(get(handlers::get_policy)))
        .route("/blockchain/transaction/:tx_id", or_not_found(get(handlers::get_transaction)))
        .route("/blockchain/violation/:tx_id", or_not_found(get(handlers::get_violations)))
        .route("/blockchain/clawback/:tx_id", or_not_found(get(handlers::get_clawback)))
        .route("/blockchain/statistics", or_not_found(get(handlers::get_statistics)))
        .route("/blockchain/audit", or_not_found(get(handlers::list_audit_log)))
        .route("/blockchain/verify/:hash", or_not_found(get(handlers::verify_hash)))
        .route("/blockchain/chain/verify", or_not_found(get(handlers::verify_chain)))
}

/// Answer unsupported methods on a known path with the 404 envelope instead
/// of a bare 405.
fn or_not_found(method_router: MethodRouter<AppState>) -> MethodRouter<AppState> {
    method_router.fallback(endpoint_not_found)
}

/// Outermost first: panic catcher, CORS, timeout, access log, timing.
pub(crate) fn with_middleware(router: Router, config: &Config) -> Router {
    router
        .layer(middleware::from_fn(record_processing_time))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors_layer(&config.cors))
        .layer(CatchPanicLayer::custom(handle_panic))
}

fn cors_layer(settings: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(cors::Any)
        .allow_headers(cors::Any);

    if settings.allowed_origins.is_empty() || settings.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(cors::Any);
    }

    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

async fn record_processing_time(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let mut response = next.run(request).await;

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    if let Ok(value) = HeaderValue::from_str(&format!("{:.3}", elapsed_ms)) {
        response.headers_mut().insert(PROCESS_TIME_HEADER, value);
    }
    response
}

async fn endpoint_not_found() -> Response {
    ErrorResponse::new(ENDPOINT_NOT_FOUND).into_response_with(StatusCode::NOT_FOUND)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!(panic = %detail, "Handler panicked");
    ErrorResponse::new(INTERNAL_SERVER_ERROR).into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
}
