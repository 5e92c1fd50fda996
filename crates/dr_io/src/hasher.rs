//! crates/dr_io/src/hasher.rs
//!
//! SHA-256 digests and artifact ids.
//! - `sha256_canonical(..)` hashes JSON values/structs through canonical_json.
//! - `sha256_hex(..)` / `sha256_file(..)` hash raw bytes.
//! - Evaluation ids are `EVAL:<hex64>` over the canonical body without its id.
//! - Hex digests are lowercase.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::canonical_json::to_canonical_bytes;
use crate::IoError;

pub const EVAL_PREFIX: &str = "EVAL:";

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 over canonical JSON bytes of any serializable value.
pub fn sha256_canonical<T: Serialize>(value: &T) -> Result<String, IoError> {
    Ok(sha256_hex(&to_canonical_bytes(value)?))
}

/// SHA-256 over a file's raw bytes (streamed).
pub fn sha256_file(path: &Path) -> Result<String, IoError> {
    let f = File::open(path).map_err(|e| IoError::Hash(format!("{}: {e}", path.display())))?;
    let mut r = BufReader::new(f);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = r.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// `EVAL:<hex>` for an evaluation body.
pub fn eval_id_from_canonical<T: Serialize>(value: &T) -> Result<String, IoError> {
    Ok(format!("{EVAL_PREFIX}{}", sha256_canonical(value)?))
}

/// Accepts `EVAL:` followed by 64 lowercase hex digits.
pub fn is_eval_id(s: &str) -> bool {
    s.strip_prefix(EVAL_PREFIX)
        .map(|h| h.len() == 64 && h.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn key_order_does_not_change_digest() {
        let a = json!({"x": 1, "y": [1, 2]});
        let b: serde_json::Value = serde_json::from_str(r#"{"y":[1,2],"x":1}"#).unwrap();
        assert_eq!(sha256_canonical(&a).unwrap(), sha256_canonical(&b).unwrap());
    }

    #[test]
    fn eval_ids_have_shape() {
        let id = eval_id_from_canonical(&json!({"k": 1})).unwrap();
        assert!(is_eval_id(&id));
        assert!(!is_eval_id("EVAL:xyz"));
        assert!(!is_eval_id("RES:0000"));
    }

    #[test]
    fn file_digest_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("f.bin");
        std::fs::write(&p, b"abc").unwrap();
        assert_eq!(sha256_file(&p).unwrap(), sha256_hex(b"abc"));
    }
}
