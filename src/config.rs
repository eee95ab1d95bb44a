//! Configuration module for IntentForge Ledger.
//!
//! Loads configuration from YAML files and environment variables. The process
//! environment is read exactly once, in [`Config::load`]; everything downstream
//! receives the resulting struct.

use std::collections::HashMap;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

use crate::auth::ConfiguredApiKey;

/// Flat environment variables honoured on top of the nested `LEDGER__*` form.
const LEGACY_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("HOST", "server.host"),
    ("API_PREFIX", "server.api_prefix"),
    ("NETWORK", "chain.network"),
    ("RPC_URL", "chain.rpc_url"),
    ("CONTRACT_ADDRESS", "chain.contract_address"),
    ("DATABASE_URL", "database.url"),
];

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub chain: ChainConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix the versioned API is mounted under, e.g. `/api/v1`.
    pub api_prefix: String,
    pub request_timeout_secs: u64,
}

/// Chain identity stamped into every receipt.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub network: String,
    pub chain_id: String,
    pub rpc_url: String,
    #[serde(default)]
    pub contract_address: String,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// CORS configuration. An empty list or a `*` entry allows any origin.
///
/// From the environment the list is comma separated:
/// `LEDGER__CORS__ALLOWED_ORIGINS=https://a.example,https://b.example`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// API key authentication for write routes.
///
/// `api_keys` is a list of tables and can only be set from the config files;
/// `LEDGER__AUTH__ENABLED` still toggles auth from the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_keys: Vec<ConfiguredApiKey>,
}

impl Config {
    /// Load configuration from files and the process environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Flat variables (`PORT`, `API_PREFIX`, `NETWORK`, ...)
    /// 2. Environment variables (`LEDGER__SECTION__KEY`)
    /// 3. config/local.yaml (if exists)
    /// 4. config/default.yaml (if exists)
    /// 5. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(std::env::vars().collect())
    }

    /// Build configuration from an explicit environment map.
    pub fn from_env(env: HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut builder = ConfigLoader::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3001)?
            .set_default("server.api_prefix", "/api/v1")?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("chain.network", "testnet")?
            .set_default("chain.chain_id", "intentforge-audit-chain")?
            .set_default("chain.rpc_url", "http://localhost:8545")?
            .set_default("chain.contract_address", "")?
            .set_default("database.url", "sqlite://intentforge-ledger.db?mode=rwc")?
            .set_default("cors.allowed_origins", Vec::<String>::new())?
            .set_default("auth.enabled", false)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("LEDGER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true)
                    .source(Some(env.clone().into_iter().collect())),
            );

        for (var, key) in LEGACY_ENV_OVERRIDES {
            builder = builder.set_override_option(*key, env.get(*var).cloned())?;
        }

        let mut config: Config = builder.build()?.try_deserialize()?;
        config.server.api_prefix = normalize_prefix(&config.server.api_prefix);
        Ok(config)
    }
}

/// Normalise an API prefix to `/segment[/segment...]`, or `""` for the root.
pub fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
impl Config {
    /// Defaults with an in-memory database, for router and handler tests.
    pub fn for_tests() -> Self {
        let mut config = Self::from_env(HashMap::new()).expect("default config");
        config.database.url = "sqlite::memory:".to_string();
        config.chain.contract_address = "0xc0ffee".to_string();
        config
    }
}
