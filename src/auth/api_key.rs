//! API Key authentication for services that write to the ledger.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

/// Represents an API key with its metadata.
#[derive(Debug, Clone)]
pub struct ApiKeyInfo {
    /// Unique identifier for this key.
    pub key_id: String,
    /// Calling service, recorded in access logs.
    pub client_id: String,
}

/// API Key validator. Keys are held only as SHA-256 digests.
#[derive(Clone, Default)]
pub struct ApiKeyValidator {
    keys: Arc<HashMap<String, ApiKeyInfo>>,
}

impl ApiKeyValidator {
    /// Create a new validator with the keys from config.
    pub fn new(configured_keys: Vec<ConfiguredApiKey>) -> Self {
        let keys = configured_keys
            .into_iter()
            .map(|key| {
                (
                    Self::hash_key(&key.key),
                    ApiKeyInfo {
                        key_id: key.id,
                        client_id: key.client_id,
                    },
                )
            })
            .collect();

        Self {
            keys: Arc::new(keys),
        }
    }

    /// Hash an API key for secure storage/comparison.
    pub fn hash_key(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Validate an API key and return its info if valid.
    pub fn validate(&self, key: &str) -> Option<ApiKeyInfo> {
        self.keys.get(&Self::hash_key(key)).cloned()
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}

/// API key configuration from config file.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ConfiguredApiKey {
    /// Unique ID for the key.
    pub id: String,
    /// The actual API key value.
    pub key: String,
    /// Calling service identifier.
    pub client_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_validation() {
        let validator = ApiKeyValidator::new(vec![ConfiguredApiKey {
            id: "key-1".to_string(),
            key: "intentforge-internal".to_string(),
            client_id: "intentforge-backend".to_string(),
        }]);

        let result = validator.validate("intentforge-internal");
        assert_eq!(result.unwrap().client_id, "intentforge-backend");

        assert!(validator.validate("wrong-key").is_none());
        assert_eq!(validator.key_count(), 1);
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        assert_eq!(
            ApiKeyValidator::hash_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
