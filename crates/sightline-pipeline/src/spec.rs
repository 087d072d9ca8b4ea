//! Pipeline document parsing: JSON text into an immutable [`StageSpec`] list.
//!
//! A pipeline document is either a top-level array of stage objects or
//! an object carrying that array under a `"pipeline"` key:
//!
//! ```json
//! { "pipeline": [
//!     { "op": "blur", "params": { "sigma": 1.4 } },
//!     { "op": "canny", "name": "edges", "params": { "low": "{low}" } }
//! ] }
//! ```
//!
//! Each stage object needs an `"op"` type tag; `"name"` is optional and
//! auto-generated as `op#index` when absent, so the result document can
//! always address every stage. `"params"` defaults to an empty object.
//! Parameters are stored unresolved — `{identifier}` substitution
//! happens per run, not at parse time.

use std::collections::HashSet;

use serde_json::Value;

use crate::types::{EngineError, JsonMap};

/// One validated stage entry: a name unique within the pipeline, a kind
/// tag, and raw (unresolved) parameters. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct StageSpec {
    name: String,
    kind: String,
    params: JsonMap,
}

impl StageSpec {
    /// The stage's unique name, used to key its result entry and
    /// artifact slot.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type tag dispatched through the stage registry.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The raw parameter object, before variable substitution.
    #[must_use]
    pub const fn params(&self) -> &JsonMap {
        &self.params
    }
}

/// Parse a pipeline document into stage specifications.
///
/// # Errors
///
/// Returns [`EngineError::Configuration`] if the text is not valid
/// JSON, no stage array can be located, a stage entry is not an object,
/// an `"op"` tag is missing or not a string, `"params"` is present but
/// not an object, or two stages resolve to the same name. Duplicate
/// names would make later stages silently overwrite earlier result
/// entries and artifact slots, so they are rejected here.
pub fn parse_pipeline(json_text: &str) -> Result<Vec<StageSpec>, EngineError> {
    let document: Value = serde_json::from_str(json_text)
        .map_err(|e| EngineError::Configuration(format!("pipeline is not valid JSON: {e}")))?;

    let entries = stage_array(&document)?;
    let mut specs = Vec::with_capacity(entries.len());
    let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let spec = parse_stage(index, entry)?;
        if !seen.insert(spec.name.clone()) {
            return Err(EngineError::Configuration(format!(
                "duplicate stage name \"{}\" (stage {index})",
                spec.name,
            )));
        }
        specs.push(spec);
    }

    Ok(specs)
}

/// Locate the stage array: the document itself, or its `"pipeline"` key.
fn stage_array(document: &Value) -> Result<&Vec<Value>, EngineError> {
    match document {
        Value::Array(entries) => Ok(entries),
        Value::Object(map) => match map.get("pipeline") {
            Some(Value::Array(entries)) => Ok(entries),
            Some(other) => Err(EngineError::Configuration(format!(
                "\"pipeline\" must be an array of stage objects, got {}",
                value_kind(other),
            ))),
            None => Err(EngineError::Configuration(
                "document has no \"pipeline\" array".to_string(),
            )),
        },
        other => Err(EngineError::Configuration(format!(
            "pipeline document must be an array or an object, got {}",
            value_kind(other),
        ))),
    }
}

fn parse_stage(index: usize, entry: &Value) -> Result<StageSpec, EngineError> {
    let object = entry.as_object().ok_or_else(|| {
        EngineError::Configuration(format!(
            "stage {index} must be a JSON object, got {}",
            value_kind(entry),
        ))
    })?;

    let kind = match object.get("op") {
        Some(Value::String(op)) if !op.is_empty() => op.clone(),
        Some(other) => {
            return Err(EngineError::Configuration(format!(
                "stage {index}: \"op\" must be a non-empty string, got {}",
                value_kind(other),
            )));
        }
        None => {
            return Err(EngineError::Configuration(format!(
                "stage {index} has no \"op\" type tag",
            )));
        }
    };

    let name = match object.get("name") {
        Some(Value::String(name)) if !name.is_empty() => name.clone(),
        Some(other) => {
            return Err(EngineError::Configuration(format!(
                "stage {index}: \"name\" must be a non-empty string, got {}",
                value_kind(other),
            )));
        }
        None => format!("{kind}#{index}"),
    };

    let params = match object.get("params") {
        Some(Value::Object(params)) => params.clone(),
        Some(other) => {
            return Err(EngineError::Configuration(format!(
                "stage {index} (\"{name}\"): \"params\" must be an object, got {}",
                value_kind(other),
            )));
        }
        None => JsonMap::new(),
    };

    Ok(StageSpec { name, kind, params })
}

/// Human-readable JSON type name for error messages.
fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(s) if s.is_empty() => "an empty string",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_array() {
        let specs = parse_pipeline(r#"[{"op": "blur", "params": {"sigma": 2.0}}]"#).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].kind(), "blur");
        assert_eq!(specs[0].name(), "blur#0");
        assert_eq!(specs[0].params().get("sigma"), Some(&serde_json::json!(2.0)));
    }

    #[test]
    fn parses_pipeline_key_wrapper() {
        let specs = parse_pipeline(
            r#"{"pipeline": [{"op": "grayscale"}, {"op": "canny", "name": "edges"}]}"#,
        )
        .unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name(), "grayscale#0");
        assert_eq!(specs[1].name(), "edges");
    }

    #[test]
    fn missing_params_defaults_to_empty_object() {
        let specs = parse_pipeline(r#"[{"op": "invert"}]"#).unwrap();
        assert!(specs[0].params().is_empty());
    }

    #[test]
    fn invalid_json_is_configuration_error() {
        let err = parse_pipeline("not json at all").unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn object_without_pipeline_key_is_rejected() {
        let err = parse_pipeline(r#"{"stages": []}"#).unwrap_err();
        assert!(err.to_string().contains("no \"pipeline\" array"));
    }

    #[test]
    fn scalar_document_is_rejected() {
        let err = parse_pipeline("42").unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn non_object_stage_is_rejected() {
        let err = parse_pipeline(r#"[{"op": "blur"}, 7]"#).unwrap_err();
        assert!(err.to_string().contains("stage 1"));
    }

    #[test]
    fn missing_op_is_rejected() {
        let err = parse_pipeline(r#"[{"name": "first"}]"#).unwrap_err();
        assert!(err.to_string().contains("no \"op\" type tag"));
    }

    #[test]
    fn non_string_op_is_rejected() {
        let err = parse_pipeline(r#"[{"op": 3}]"#).unwrap_err();
        assert!(err.to_string().contains("\"op\" must be a non-empty string"));
    }

    #[test]
    fn non_object_params_is_rejected() {
        let err = parse_pipeline(r#"[{"op": "blur", "params": [1, 2]}]"#).unwrap_err();
        assert!(err.to_string().contains("\"params\" must be an object"));
    }

    #[test]
    fn duplicate_explicit_names_are_rejected() {
        let err = parse_pipeline(
            r#"[{"op": "blur", "name": "x"}, {"op": "canny", "name": "x"}]"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate stage name \"x\""));
    }

    #[test]
    fn duplicate_generated_names_are_rejected() {
        // An explicit name colliding with a generated one is still a duplicate.
        let err = parse_pipeline(r#"[{"op": "blur"}, {"op": "x", "name": "blur#0"}]"#).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn generated_names_use_declared_position() {
        let specs =
            parse_pipeline(r#"[{"op": "grayscale"}, {"op": "blur"}, {"op": "blur"}]"#).unwrap();
        let names: Vec<&str> = specs.iter().map(StageSpec::name).collect();
        assert_eq!(names, vec!["grayscale#0", "blur#1", "blur#2"]);
    }

    #[test]
    fn params_are_stored_unresolved() {
        let specs =
            parse_pipeline(r#"[{"op": "canny", "params": {"low": "{low}"}}]"#).unwrap();
        assert_eq!(
            specs[0].params().get("low"),
            Some(&serde_json::json!("{low}")),
        );
    }
}
