//! Run-time variable substitution into stage parameters.
//!
//! A string parameter value exactly matching `{identifier}` is replaced
//! by the ArgMap entry for `identifier`. Substitution recurses into
//! nested objects and arrays, and runs once per pipeline run (never at
//! parse time) so the same pipeline can be re-run with different
//! ArgMaps.
//!
//! An identifier absent from the ArgMap is an error rather than a
//! pass-through: letting the literal `{x}` token reach a stage would
//! surface later as a confusing numeric- or enum-parse failure in an
//! unrelated place.

use serde_json::Value;

use crate::types::{ArgMap, EngineError, JsonMap};

/// Resolve every `{identifier}` placeholder in `params` against `args`.
///
/// # Errors
///
/// Returns [`EngineError::UndefinedVariable`] naming the first
/// placeholder whose identifier is not present in `args`.
pub fn resolve_params(params: &JsonMap, args: &ArgMap) -> Result<JsonMap, EngineError> {
    params
        .iter()
        .map(|(key, value)| Ok((key.clone(), resolve_value(value, args)?)))
        .collect()
}

fn resolve_value(value: &Value, args: &ArgMap) -> Result<Value, EngineError> {
    match value {
        Value::String(s) => match placeholder(s) {
            Some(identifier) => args
                .get(identifier)
                .map(|resolved| Value::String(resolved.clone()))
                .ok_or_else(|| EngineError::UndefinedVariable(identifier.to_string())),
            None => Ok(value.clone()),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_value(item, args))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(key, nested)| Ok((key.clone(), resolve_value(nested, args)?)))
            .collect::<Result<JsonMap, _>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

/// Returns the identifier when `s` is exactly `{identifier}`.
///
/// Identifiers follow the usual rules: a leading ASCII letter or
/// underscore, then letters, digits, or underscores. Anything else —
/// embedded placeholders, empty braces, trailing text — is treated as a
/// literal string, not a substitution target.
fn placeholder(s: &str) -> Option<&str> {
    let inner = s.strip_prefix('{')?.strip_suffix('}')?;
    let mut chars = inner.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Some(inner)
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(pairs: &[(&str, &str)]) -> ArgMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn object(value: Value) -> JsonMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn replaces_exact_placeholder() {
        let params = object(json!({"threshold": "{x}"}));
        let resolved = resolve_params(&params, &args(&[("x", "5")])).unwrap();
        assert_eq!(resolved.get("threshold"), Some(&json!("5")));
    }

    #[test]
    fn missing_identifier_is_undefined_variable() {
        let params = object(json!({"threshold": "{x}"}));
        let err = resolve_params(&params, &ArgMap::new()).unwrap_err();
        assert!(matches!(err, EngineError::UndefinedVariable(ref name) if name == "x"));
    }

    #[test]
    fn recurses_into_nested_objects_and_arrays() {
        let params = object(json!({
            "roi": {"x": "{left}", "y": 10},
            "channels": ["{first}", "literal"],
        }));
        let resolved =
            resolve_params(&params, &args(&[("left", "32"), ("first", "red")])).unwrap();
        assert_eq!(resolved.get("roi"), Some(&json!({"x": "32", "y": 10})));
        assert_eq!(resolved.get("channels"), Some(&json!(["red", "literal"])));
    }

    #[test]
    fn missing_identifier_deep_in_nesting_is_reported() {
        let params = object(json!({"outer": {"inner": ["{gone}"]}}));
        let err = resolve_params(&params, &ArgMap::new()).unwrap_err();
        assert!(matches!(err, EngineError::UndefinedVariable(ref name) if name == "gone"));
    }

    #[test]
    fn non_placeholder_strings_pass_through() {
        let params = object(json!({
            "plain": "hello",
            "braced_word": "{not valid!}",
            "embedded": "pre{x}post",
            "empty_braces": "{}",
            "unterminated": "{x",
        }));
        let resolved = resolve_params(&params, &ArgMap::new()).unwrap();
        assert_eq!(resolved, params);
    }

    #[test]
    fn non_string_values_are_untouched() {
        let params = object(json!({"n": 3, "b": true, "nothing": null}));
        let resolved = resolve_params(&params, &args(&[("n", "9")])).unwrap();
        assert_eq!(resolved, params);
    }

    #[test]
    fn leading_digit_is_not_an_identifier() {
        let params = object(json!({"v": "{2x}"}));
        let resolved = resolve_params(&params, &ArgMap::new()).unwrap();
        assert_eq!(resolved.get("v"), Some(&json!("{2x}")));
    }

    #[test]
    fn underscore_identifiers_resolve() {
        let params = object(json!({"v": "{_low_2}"}));
        let resolved = resolve_params(&params, &args(&[("_low_2", "7")])).unwrap();
        assert_eq!(resolved.get("v"), Some(&json!("7")));
    }

    #[test]
    fn resolution_does_not_mutate_input() {
        let params = object(json!({"threshold": "{x}"}));
        let before = params.clone();
        let _ = resolve_params(&params, &args(&[("x", "5")])).unwrap();
        assert_eq!(params, before);
    }

    #[test]
    fn same_params_resolve_differently_per_argmap() {
        let params = object(json!({"threshold": "{x}"}));
        let first = resolve_params(&params, &args(&[("x", "5")])).unwrap();
        let second = resolve_params(&params, &args(&[("x", "9")])).unwrap();
        assert_eq!(first.get("threshold"), Some(&json!("5")));
        assert_eq!(second.get("threshold"), Some(&json!("9")));
    }
}
