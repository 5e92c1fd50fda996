//! crates/dr_io/src/lib.rs
//! I/O crate for the evaluation engine.
//!
//! - Shared error type (`IoError`) with `From` conversions used across modules.
//! - Loading of matrix / weights / params documents, directly or via a manifest.
//! - Canonical JSON bytes and atomic writes; SHA-256 digests and artifact ids.
//! - Embedded JSON Schemas checked before typed deserialization.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for dr_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (open, create_dir_all, rename, fsync, etc.)
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON parse or shape errors with a JSON Pointer hint.
    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    /// Instance failed its JSON Schema.
    #[error("schema error: {0}")]
    Schema(String),

    /// Manifest shape or offline-path policy violations.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Hashing / canonicalization failures.
    #[error("hash error: {0}")]
    Hash(String),

    /// Input exceeded a size limit.
    #[error("limit exceeded: {0}")]
    Limit(String),

    /// Well-formed document carrying invalid keys or parameter values.
    #[error("invalid: {0}")]
    Invalid(String),
}

/* ---------------- From conversions (used by file modules) ---------------- */

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        // serde_json keeps line/column, not a pointer; default to root.
        IoError::Json { pointer: "/".to_string(), msg: e.to_string() }
    }
}

impl From<dr_core::CoreError> for IoError {
    fn from(e: dr_core::CoreError) -> Self {
        IoError::Invalid(e.to_string())
    }
}

pub mod canonical_json;
pub mod hasher;
pub mod manifest;
pub mod schema;
pub mod loader;

/// Returns true if `s` looks like a URL (any `<scheme>://`, including `file://`).
#[inline]
pub fn looks_like_url(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:")
}
