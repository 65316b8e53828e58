//! Response schemas for structured generation, and their enforcement.
//!
//! Schemas use the generator's own dialect (`"type": "OBJECT"`, `properties`,
//! `required`, `items`) so the same value is sent with the request and used
//! to check what comes back. The generator is asked to follow the schema but
//! nothing guarantees it does, so every structured response goes through
//! [`parse_structured`] before it reaches a plan.

use serde_json::{Map, Value, json};
use thiserror::Error;

/// Why a structured response was rejected.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("generator returned no content")]
    Empty,

    #[error("generator returned malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("generated content does not match the expected shape at {path}: {problem}")]
    Schema { path: String, problem: String },
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn string() -> Value {
    json!({ "type": "STRING" })
}

pub fn number() -> Value {
    json!({ "type": "NUMBER" })
}

pub fn array_of(items: Value) -> Value {
    json!({ "type": "ARRAY", "items": items })
}

/// An object whose listed `required` properties must all be present.
pub fn object(properties: Vec<(&str, Value)>, required: &[&str]) -> Value {
    let properties: Map<String, Value> = properties
        .into_iter()
        .map(|(name, schema)| (name.to_string(), schema))
        .collect();
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
    })
}

/// An object of string properties, all required.
pub fn string_object(fields: &[&str]) -> Value {
    object(fields.iter().map(|f| (*f, string())).collect(), fields)
}

/// An object of number properties, all required.
pub fn number_object(fields: &[&str]) -> Value {
    object(fields.iter().map(|f| (*f, number())).collect(), fields)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check `value` against `schema`.
///
/// Required properties must be present and non-null; properties not named
/// in the schema are allowed. Paths in errors are dotted (`swot.ameacas`),
/// with array positions in brackets (`recursosHumanos.membros[2].nome`).
pub fn validate(value: &Value, schema: &Value) -> Result<(), ContentError> {
    check(value, schema, "")
}

fn check(value: &Value, schema: &Value, path: &str) -> Result<(), ContentError> {
    let kind = schema.get("type").and_then(Value::as_str).unwrap_or("");
    let mismatch = |expected: &str| ContentError::Schema {
        path: display_path(path),
        problem: format!("expected {expected}, found {}", describe(value)),
    };

    match kind {
        "OBJECT" => {
            let obj = value.as_object().ok_or_else(|| mismatch("an object"))?;
            let properties = schema.get("properties").and_then(Value::as_object);

            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for name in required.iter().filter_map(Value::as_str) {
                    if obj.get(name).is_none_or(Value::is_null) {
                        return Err(ContentError::Schema {
                            path: join(path, name),
                            problem: "required field is missing".to_string(),
                        });
                    }
                }
            }

            if let Some(properties) = properties {
                for (name, sub_schema) in properties {
                    match obj.get(name) {
                        Some(Value::Null) | None => {}
                        Some(sub_value) => check(sub_value, sub_schema, &join(path, name))?,
                    }
                }
            }
            Ok(())
        }
        "ARRAY" => {
            let items = value.as_array().ok_or_else(|| mismatch("an array"))?;
            if let Some(item_schema) = schema.get("items") {
                for (i, item) in items.iter().enumerate() {
                    check(item, item_schema, &format!("{path}[{i}]"))?;
                }
            }
            Ok(())
        }
        "STRING" if !value.is_string() => Err(mismatch("a string")),
        "NUMBER" | "INTEGER" if !value.is_number() => Err(mismatch("a number")),
        "BOOLEAN" if !value.is_boolean() => Err(mismatch("a boolean")),
        _ => Ok(()),
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse generator output as JSON and validate it against `schema`.
///
/// Tolerates surrounding whitespace and a Markdown code fence around the
/// JSON, which some models emit even when asked for raw JSON.
pub fn parse_structured(text: &str, schema: &Value) -> Result<Value, ContentError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(ContentError::Empty);
    }
    let value: Value = serde_json::from_str(body)?;
    validate(&value, schema)?;
    Ok(value)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swot_schema() -> Value {
        object(
            vec![(
                "swot",
                object(
                    vec![
                        ("pontosFortes", array_of(string())),
                        ("ameacas", array_of(string())),
                    ],
                    &["pontosFortes", "ameacas"],
                ),
            )],
            &["swot"],
        )
    }

    #[test]
    fn accepts_conforming_value() {
        let v = json!({ "swot": { "pontosFortes": ["a"], "ameacas": [], "extra": 1 } });
        validate(&v, &swot_schema()).unwrap();
    }

    #[test]
    fn missing_required_reports_path() {
        let v = json!({ "swot": { "ameacas": [] } });
        let err = validate(&v, &swot_schema()).unwrap_err();
        match err {
            ContentError::Schema { path, .. } => assert_eq!(path, "swot.pontosFortes"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn null_counts_as_missing() {
        let v = json!({ "swot": { "pontosFortes": null, "ameacas": [] } });
        assert!(validate(&v, &swot_schema()).is_err());
    }

    #[test]
    fn wrong_item_type_reports_index() {
        let v = json!({ "swot": { "pontosFortes": ["ok", 3], "ameacas": [] } });
        let err = validate(&v, &swot_schema()).unwrap_err();
        match err {
            ContentError::Schema { path, problem } => {
                assert_eq!(path, "swot.pontosFortes[1]");
                assert!(problem.contains("string"), "{problem}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn number_object_rejects_numeric_strings() {
        let schema = number_object(&["software"]);
        assert!(validate(&json!({ "software": 10.5 }), &schema).is_ok());
        assert!(validate(&json!({ "software": "10" }), &schema).is_err());
    }

    #[test]
    fn parse_structured_strips_fence() {
        let text = "```json\n{\"swot\": {\"pontosFortes\": [], \"ameacas\": []}}\n```";
        let v = parse_structured(text, &swot_schema()).unwrap();
        assert!(v["swot"]["pontosFortes"].is_array());
    }

    #[test]
    fn parse_structured_rejects_empty_and_garbage() {
        assert!(matches!(parse_structured("  ", &swot_schema()), Err(ContentError::Empty)));
        assert!(matches!(
            parse_structured("not json", &swot_schema()),
            Err(ContentError::Json(_))
        ));
    }
}
