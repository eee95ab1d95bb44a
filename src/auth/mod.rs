//! Authentication module for IntentForge Ledger.
//!
//! Write routes can be guarded by API keys, matching the bearer key the
//! enforcement engine sends with every audit call.

mod api_key;
mod middleware;

pub use api_key::*;
pub use middleware::*;
