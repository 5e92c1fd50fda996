//! crates/dr_io/src/schema.rs
//! Embedded JSON Schemas (draft-07) for the input documents, checked before
//! typed deserialization so shape errors carry an instance path.

use serde_json::Value;

use crate::IoError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaKind {
    Matrix,
    Weights,
    Params,
    Manifest,
}

impl SchemaKind {
    pub fn name(self) -> &'static str {
        match self {
            SchemaKind::Matrix => "matrix",
            SchemaKind::Weights => "weights",
            SchemaKind::Params => "params",
            SchemaKind::Manifest => "manifest",
        }
    }

    fn source(self) -> &'static str {
        match self {
            SchemaKind::Matrix => MATRIX_SCHEMA,
            SchemaKind::Weights => WEIGHTS_SCHEMA,
            SchemaKind::Params => PARAMS_SCHEMA,
            SchemaKind::Manifest => MANIFEST_SCHEMA,
        }
    }
}

const MATRIX_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "type": "object",
  "required": ["regions"],
  "additionalProperties": false,
  "properties": {
    "regions": {
      "type": "object",
      "additionalProperties": {
        "type": "object",
        "additionalProperties": { "type": ["number", "null"] }
      }
    }
  }
}"#;

const WEIGHTS_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "type": "object",
  "required": ["primary", "secondary", "category_of"],
  "additionalProperties": false,
  "properties": {
    "primary":     { "type": "object", "additionalProperties": { "type": "number" } },
    "secondary":   { "type": "object", "additionalProperties": { "type": "number" } },
    "category_of": { "type": "object", "additionalProperties": { "type": "string" } }
  }
}"#;

const PARAMS_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "type": "object",
  "additionalProperties": false,
  "properties": {
    "strategy":               { "enum": ["legacy", "unified"] },
    "default_score":          { "type": "number", "minimum": 0, "maximum": 1 },
    "single_region_handling": { "type": "boolean" },
    "baseline_ratio":         { "type": "number", "exclusiveMinimum": 0, "exclusiveMaximum": 1 },
    "missing_fill":           { "type": "number", "minimum": 0 },
    "missing_rate_limit":     { "type": "number", "exclusiveMinimum": 0, "maximum": 1 },
    "outlier_iqr_k":          { "type": "number", "exclusiveMinimum": 0 },
    "clamp_outliers":         { "type": "boolean" },
    "discrimination_floor":   { "type": "number", "minimum": 0, "exclusiveMaximum": 1 },
    "indicators":             { "type": "array", "minItems": 1, "items": { "type": "string" } }
  }
}"#;

const MANIFEST_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "type": "object",
  "required": ["matrix", "weights"],
  "additionalProperties": false,
  "properties": {
    "matrix":    { "type": "string", "minLength": 1 },
    "weights":   { "type": "string", "minLength": 1 },
    "params":    { "type": "string", "minLength": 1 },
    "directive": { "type": "string", "minLength": 1 }
  }
}"#;

/// Validate `instance` against the embedded schema for `kind`.
pub fn validate_value(kind: SchemaKind, instance: &Value) -> Result<(), IoError> {
    let schema: Value = serde_json::from_str(kind.source())
        .map_err(|e| IoError::Schema(format!("{} schema: {e}", kind.name())))?;
    let compiled = jsonschema::JSONSchema::compile(&schema)
        .map_err(|e| IoError::Schema(format!("{} schema: {e}", kind.name())))?;
    let result = compiled.validate(instance);
    if let Err(errors) = result {
        let msgs: Vec<String> = errors
            .map(|e| format!("{} {}: {e}", kind.name(), e.instance_path))
            .collect();
        return Err(IoError::Schema(msgs.join("; ")));
    }
    Ok(())
}
