// crates/dr_io/src/manifest.rs
//
// Manifest: one JSON file naming the inputs of an evaluation run.
// • Paths are local only: any scheme ("://", "http:", "https:") is rejected.
// • Relative paths resolve against the manifest's directory.
// • Required inputs must exist and be files.

use std::fs;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::schema::{self, SchemaKind};
use crate::{looks_like_url, IoError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub matrix: String,
    pub weights: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
    /// Optional `@TOPSIS_POSITIVE:a,b` step directive selecting indicators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directive: Option<String>,
}

/// Manifest with every path resolved and existence-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedManifest {
    pub matrix: Utf8PathBuf,
    pub weights: Utf8PathBuf,
    pub params: Option<Utf8PathBuf>,
    pub directive: Option<String>,
}

pub fn load_manifest(path: &Path) -> Result<Manifest, IoError> {
    let text = fs::read_to_string(path)
        .map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    schema::validate_value(SchemaKind::Manifest, &value)?;
    Ok(serde_json::from_value(value)?)
}

/// Resolve `man` against the directory holding `manifest_path`.
pub fn resolve_paths(manifest_path: &Path, man: &Manifest) -> Result<ResolvedManifest, IoError> {
    let manifest_path = utf8(manifest_path)?;
    let base = manifest_path.parent().unwrap_or_else(|| Utf8Path::new("."));
    Ok(ResolvedManifest {
        matrix: resolve_one(base, "matrix", &man.matrix)?,
        weights: resolve_one(base, "weights", &man.weights)?,
        params: man
            .params
            .as_deref()
            .map(|p| resolve_one(base, "params", p))
            .transpose()?,
        directive: man.directive.clone(),
    })
}

pub fn load_and_resolve(manifest_path: &Path) -> Result<ResolvedManifest, IoError> {
    let man = load_manifest(manifest_path)?;
    resolve_paths(manifest_path, &man)
}

fn utf8(path: &Path) -> Result<&Utf8Path, IoError> {
    Utf8Path::from_path(path)
        .ok_or_else(|| IoError::Manifest(format!("path is not UTF-8: {}", path.display())))
}

fn resolve_one(base: &Utf8Path, field: &'static str, raw: &str) -> Result<Utf8PathBuf, IoError> {
    if raw.trim().is_empty() {
        return Err(IoError::Manifest(format!("{field}: empty path")));
    }
    if looks_like_url(raw) {
        return Err(IoError::Manifest(format!("{field}: path must be local: {raw}")));
    }
    let p = Utf8Path::new(raw);
    let full = if p.is_absolute() { p.to_path_buf() } else { base.join(p) };
    match fs::metadata(&full) {
        Ok(m) if m.is_file() => Ok(full),
        Ok(_) => Err(IoError::Manifest(format!("{field}: not a file: {full}"))),
        Err(e) => Err(IoError::Manifest(format!("{field}: cannot access {full}: {e}"))),
    }
}
