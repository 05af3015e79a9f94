//! Embedded Draft 2020-12 meta-schema every credential schema must satisfy.

use serde_json::Value;

use crate::error::SchemaError;

/// The structure accepted for a credential schema.
pub const CREDENTIAL_SCHEMA_META_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "object",
  "required": ["$id", "$schema", "type", "title", "description", "properties"],
  "properties": {
    "$id": {
      "type": "string",
      "pattern": "^vpr:verana:mainnet/cs/v1/js/(VPR_CREDENTIAL_SCHEMA_ID|[0-9]+)$"
    },
    "$schema": {
      "type": "string",
      "const": "https://json-schema.org/draft/2020-12/schema"
    },
    "type": { "const": "object" },
    "title": { "type": "string", "minLength": 1 },
    "description": { "type": "string", "minLength": 1 },
    "properties": {
      "type": "object",
      "minProperties": 1,
      "additionalProperties": {
        "type": "object",
        "required": ["type"],
        "properties": {
          "type": {
            "enum": ["string", "number", "integer", "boolean", "object", "array"]
          }
        }
      }
    },
    "required": {
      "type": "array",
      "items": { "type": "string" }
    },
    "additionalProperties": { "type": "boolean" },
    "$defs": { "type": "object" }
  },
  "additionalProperties": false
}"#;

/// Check size, JSON syntax, and meta-schema conformance of `json_schema`.
pub fn validate_json_schema(json_schema: &str, max_size: u64) -> Result<Value, SchemaError> {
    if json_schema.len() as u64 > max_size {
        return Err(SchemaError::InvalidJsonSchema(format!(
            "schema is {} bytes, maximum is {}",
            json_schema.len(),
            max_size
        )));
    }
    let instance: Value = serde_json::from_str(json_schema)
        .map_err(|e| SchemaError::InvalidJsonSchema(format!("not valid JSON: {}", e)))?;

    let meta: Value = serde_json::from_str(CREDENTIAL_SCHEMA_META_SCHEMA)
        .map_err(|e| SchemaError::InvalidJsonSchema(format!("meta-schema: {}", e)))?;
    let mut opts = jsonschema::options();
    opts.with_draft(jsonschema::Draft::Draft202012);
    let validator = opts
        .build(&meta)
        .map_err(|e| SchemaError::InvalidJsonSchema(format!("meta-schema: {}", e)))?;

    let violations: Vec<String> = validator
        .iter_errors(&instance)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect();
    if violations.is_empty() {
        Ok(instance)
    } else {
        Err(SchemaError::InvalidJsonSchema(violations.join("; ")))
    }
}
