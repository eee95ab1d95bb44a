//! Canonical hashing for ledger blocks.
//!
//! Payloads are hashed over a canonical JSON rendering: object keys sorted
//! recursively, no insignificant whitespace. This keeps data hashes stable
//! regardless of field order or how `serde_json` was built.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Predecessor hash of the first block.
pub const GENESIS_HASH: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000000";

/// Hex digits kept for transaction hashes (16 bytes).
const TX_HASH_HEX_LEN: usize = 32;

/// Render a JSON value canonically.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// SHA-256 of `bytes` as `0x`-prefixed lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("0x{}", hex::encode(hasher.finalize()))
}

/// Hash of a block's payload.
pub fn data_hash(payload: &Value) -> String {
    sha256_hex(canonical_json(payload).as_bytes())
}

/// Hash linking a block to its predecessor.
pub fn block_hash(block_number: i64, previous_hash: &str, data_hash: &str, timestamp: &str) -> String {
    sha256_hex(format!("{}:{}:{}:{}", block_number, previous_hash, data_hash, timestamp).as_bytes())
}

/// Chain-style transaction hash for a block on a given network/contract.
pub fn tx_hash(network: &str, contract_address: &str, block_hash: &str) -> String {
    let full = sha256_hex(format!("{}:{}:{}", network, contract_address, block_hash).as_bytes());
    full[..2 + TX_HASH_HEX_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorts_keys_recursively() {
        let value = json!({"b": 1, "a": {"z": [3, {"y": true, "x": null}], "c": "s"}});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":{"c":"s","z":[3,{"x":null,"y":true}]},"b":1}"#
        );
    }

    #[test]
    fn test_data_hash_ignores_key_order() {
        let a: Value = serde_json::from_str(r#"{"amount": 10.5, "wallet_id": "w-1"}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"wallet_id": "w-1", "amount": 10.5}"#).unwrap();
        assert_eq!(data_hash(&a), data_hash(&b));
        assert_ne!(data_hash(&a), data_hash(&json!({"wallet_id": "w-1", "amount": 10.6})));
    }

    #[test]
    fn test_canonical_json_escapes_strings() {
        let value = json!({"quote\"key": "line\nbreak"});
        assert_eq!(canonical_json(&value), r#"{"quote\"key":"line\nbreak"}"#);
    }

    #[test]
    fn test_hash_shapes() {
        let h = sha256_hex(b"abc");
        assert_eq!(
            h,
            "0xba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(GENESIS_HASH.len(), h.len());

        let tx = tx_hash("testnet", "0xabc", &h);
        assert!(tx.starts_with("0x"));
        assert_eq!(tx.len(), 34);
    }

    #[test]
    fn test_block_hash_depends_on_every_input() {
        let base = block_hash(1, GENESIS_HASH, "0xdata", "2026-01-01T00:00:00.000000Z");
        assert_ne!(base, block_hash(2, GENESIS_HASH, "0xdata", "2026-01-01T00:00:00.000000Z"));
        assert_ne!(base, block_hash(1, "0x01", "0xdata", "2026-01-01T00:00:00.000000Z"));
        assert_ne!(base, block_hash(1, GENESIS_HASH, "0xdatb", "2026-01-01T00:00:00.000000Z"));
        assert_ne!(base, block_hash(1, GENESIS_HASH, "0xdata", "2026-01-01T00:00:00.000001Z"));
    }
}
