//! HTTP API layer for IntentForge Ledger.
//!
//! Provides the `/blockchain` REST endpoints, the health check and the
//! OpenAPI document.

mod extract;
pub mod handlers;
mod routes;
mod types;

pub use routes::build_router;
