use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde_json::json;
use tracing::error;

static PERSISTED: Lazy<Option<JSONSchema>> = Lazy::new(|| {
    let schema = persisted_state_schema();
    let compiled = JSONSchema::compile(&schema).map_err(|e| {
        error!("persisted state schema failed to compile: {e}");
    });
    compiled.ok()
});

pub fn persisted_state_schema() -> serde_json::Value {
    // Minimal shape a restored record needs; everything else comes from the catalog.
    json!({
      "$schema": "http://json-schema.org/draft-07/schema#",
      "title": "PersistedThreats",
      "type": "array",
      "minItems": 1,
      "items": {
        "type": "object",
        "required": ["id", "mitigated"],
        "properties": {
          "id": {"type": "string", "minLength": 1},
          "mitigated": {"type": "boolean"},
          "category": {"type": "string"},
          "title": {"type": "string"},
          "affectedComponents": {"type": "array", "items": {"type": "string"}},
          "impact": {"type": "string", "enum": ["Low", "Medium", "High"]}
        }
      }
    })
}

/// True when `value` has the persisted threat-list shape.
pub fn matches_persisted_shape(value: &serde_json::Value) -> bool {
    match PERSISTED.as_ref() {
        Some(schema) => schema.is_valid(value),
        None => false,
    }
}
