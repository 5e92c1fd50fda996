//! Loader: read local JSON inputs (manifest → matrix → weights → params),
//! check them against the embedded schemas, convert to typed core values, and
//! return `LoadedInputs` with input digests. No network I/O.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use dr_core::{
    CategoryCode, EvalParams, IndicatorCode, IndicatorMatrix, RegionId, TopsisDirective, WeightSpec,
};

use crate::schema::{self, SchemaKind};
use crate::{hasher, manifest, IoError};

/// Upper bound on a single input document.
pub const MAX_INPUT_BYTES: u64 = 16 * 1024 * 1024;

// ----------------------------- Wire-facing documents -----------------------------

/// Matrix document: `null` cells mean "not reported" and load as absent cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixDoc {
    pub regions: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightsDoc {
    pub primary: BTreeMap<String, f64>,
    pub secondary: BTreeMap<String, f64>,
    pub category_of: BTreeMap<String, String>,
}

/// SHA-256 of each input file's raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDigests {
    pub matrix_sha256: String,
    pub weights_sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params_sha256: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub matrix: IndicatorMatrix,
    pub weights: WeightSpec,
    pub params: EvalParams,
    pub digests: InputDigests,
    /// Cells given as `null` in the matrix document.
    pub null_cells: usize,
}

// ----------------------------- Orchestration -----------------------------

/// Load from explicit paths. Params default when `params` is `None`.
pub fn load_inputs(
    matrix: &Path,
    weights: &Path,
    params: Option<&Path>,
) -> Result<LoadedInputs, IoError> {
    let (matrix_doc, matrix_sha256) = read_checked::<MatrixDoc>(matrix, SchemaKind::Matrix)?;
    let (weights_doc, weights_sha256) = read_checked::<WeightsDoc>(weights, SchemaKind::Weights)?;
    let (params, params_sha256) = match params {
        Some(p) => {
            let (ps, sha) = read_checked::<EvalParams>(p, SchemaKind::Params)?;
            (ps, Some(sha))
        }
        None => (EvalParams::default(), None),
    };
    params.validate_domains()?;

    let null_cells = count_nulls(&matrix_doc);
    let matrix = matrix_from_doc(matrix_doc)?;
    let weights = weights_from_doc(weights_doc)?;
    tracing::debug!(
        regions = matrix.region_count(),
        cells = matrix.cell_count(),
        null_cells,
        "inputs loaded"
    );

    Ok(LoadedInputs {
        matrix,
        weights,
        params,
        digests: InputDigests { matrix_sha256, weights_sha256, params_sha256 },
        null_cells,
    })
}

/// Load through a manifest; a manifest directive narrows `params.indicators`.
pub fn load_inputs_from_manifest(manifest_path: &Path) -> Result<LoadedInputs, IoError> {
    let resolved = manifest::load_and_resolve(manifest_path)?;
    let mut loaded = load_inputs(
        resolved.matrix.as_std_path(),
        resolved.weights.as_std_path(),
        resolved.params.as_ref().map(|p| p.as_std_path()),
    )?;
    if let Some(text) = &resolved.directive {
        let directive: TopsisDirective = text.parse()?;
        loaded.params.indicators = Some(directive.indicators);
    }
    Ok(loaded)
}

// ----------------------------- Targeted helpers -----------------------------

fn read_checked<T: for<'de> Deserialize<'de>>(
    path: &Path,
    kind: SchemaKind,
) -> Result<(T, String), IoError> {
    let meta = fs::metadata(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    if meta.len() > MAX_INPUT_BYTES {
        return Err(IoError::Limit(format!(
            "{} is {} bytes (max {MAX_INPUT_BYTES})",
            path.display(),
            meta.len()
        )));
    }
    let bytes = fs::read(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|e| IoError::Json {
        pointer: "/".into(),
        msg: format!("{}: {e}", path.display()),
    })?;
    schema::validate_value(kind, &value)?;
    let typed: T = serde_json::from_value(value)?;
    Ok((typed, hasher::sha256_hex(&bytes)))
}

fn count_nulls(doc: &MatrixDoc) -> usize {
    doc.regions
        .values()
        .map(|row| row.values().filter(|v| v.is_none()).count())
        .sum()
}

pub fn matrix_from_doc(doc: MatrixDoc) -> Result<IndicatorMatrix, IoError> {
    let mut m = IndicatorMatrix::new();
    for (region, row) in doc.regions {
        let region = RegionId::new(region.as_str()).map_err(|e| json_err("/regions", e))?;
        m.insert_region(region.clone());
        for (code, value) in row {
            let code = IndicatorCode::new(code.as_str())
                .map_err(|e| json_err(&format!("/regions/{region}"), e))?;
            if let Some(v) = value {
                m.insert(region.clone(), code, v);
            }
        }
    }
    Ok(m)
}

pub fn weights_from_doc(doc: WeightsDoc) -> Result<WeightSpec, IoError> {
    let mut w = WeightSpec::default();
    for (k, v) in doc.primary {
        let k = CategoryCode::new(k.as_str()).map_err(|e| json_err("/primary", e))?;
        w.primary.insert(k, v);
    }
    for (k, v) in doc.secondary {
        let k = IndicatorCode::new(k.as_str()).map_err(|e| json_err("/secondary", e))?;
        w.secondary.insert(k, v);
    }
    for (k, c) in doc.category_of {
        let k = IndicatorCode::new(k.as_str()).map_err(|e| json_err("/category_of", e))?;
        let c = CategoryCode::new(c.as_str()).map_err(|e| json_err("/category_of", e))?;
        w.category_of.insert(k, c);
    }
    Ok(w)
}

fn json_err(pointer: &str, e: dr_core::CoreError) -> IoError {
    IoError::Json { pointer: pointer.to_string(), msg: e.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dr_core::Strategy;

    fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let p = dir.join(name);
        fs::write(&p, body).unwrap();
        p
    }

    const MATRIX: &str = r#"{"regions":{
        "青竹街道": {"staff": 12, "funds": 3.5},
        "r2": {"staff": 4, "funds": null}
    }}"#;
    const WEIGHTS: &str = r#"{
        "primary": {"team": 0.4},
        "secondary": {"staff": 0.5, "funds": 0.5},
        "category_of": {"staff": "team", "funds": "team"}
    }"#;

    #[test]
    fn loads_explicit_paths_and_treats_null_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let m = write(dir.path(), "m.json", MATRIX);
        let w = write(dir.path(), "w.json", WEIGHTS);
        let loaded = load_inputs(&m, &w, None).unwrap();
        assert_eq!(loaded.matrix.region_count(), 2);
        assert_eq!(loaded.null_cells, 1);
        let r2 = RegionId::new("r2").unwrap();
        assert_eq!(loaded.matrix.row(&r2).unwrap().len(), 1);
        assert_eq!(loaded.params, EvalParams::default());
        assert_eq!(loaded.digests.matrix_sha256.len(), 64);
        assert!(loaded.digests.params_sha256.is_none());
    }

    #[test]
    fn manifest_directive_selects_indicators() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "m.json", MATRIX);
        write(dir.path(), "w.json", WEIGHTS);
        write(dir.path(), "p.json", r#"{"strategy":"legacy"}"#);
        let man = write(
            dir.path(),
            "manifest.json",
            r#"{"matrix":"m.json","weights":"w.json","params":"p.json","directive":"@TOPSIS_POSITIVE:staff"}"#,
        );
        let loaded = load_inputs_from_manifest(&man).unwrap();
        assert_eq!(loaded.params.strategy, Strategy::Legacy);
        assert_eq!(loaded.params.indicators, Some(vec!["staff".parse().unwrap()]));
        assert!(loaded.digests.params_sha256.is_some());
    }

    #[test]
    fn bad_keys_and_shapes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let w = write(dir.path(), "w.json", WEIGHTS);
        let bad_code = write(dir.path(), "m1.json", r#"{"regions":{"a":{"has space":1}}}"#);
        assert!(matches!(load_inputs(&bad_code, &w, None), Err(IoError::Json { .. })));
        let bad_shape = write(dir.path(), "m2.json", r#"{"rows":{}}"#);
        assert!(matches!(load_inputs(&bad_shape, &w, None), Err(IoError::Schema(_))));
        let not_json = write(dir.path(), "m3.json", "{");
        assert!(matches!(load_inputs(&not_json, &w, None), Err(IoError::Json { .. })));
    }
}
