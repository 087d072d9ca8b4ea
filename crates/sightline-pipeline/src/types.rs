//! Shared types for the sightline pipeline engine.

use std::collections::HashMap;

use serde_json::Value;

/// Re-export `DynamicImage` so downstream crates can reference the
/// working image without depending on `image` directly.
pub use image::DynamicImage;

/// Name → value substitution table supplied for one run, typically built
/// from CLI-style `name=value` pairs. Read-only for the duration of the
/// run; the same pipeline may be re-run with a different table.
pub type ArgMap = HashMap<String, String>;

/// A JSON object whose keys keep insertion order (`serde_json` is built
/// with the `preserve_order` feature).
pub type JsonMap = serde_json::Map<String, Value>;

/// Errors produced by the engine, grouped into the four kinds the
/// result document reports.
///
/// During a run, errors are not propagated out of
/// [`Pipeline::process`](crate::Pipeline::process) — they are recorded
/// into the failing stage's result entry (via [`EngineError::kind`] and
/// the `Display` message) and stop the run there. Only construction
/// ([`Pipeline::new`](crate::Pipeline::new)) and callers at the I/O
/// boundary see an `Err` directly.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid or missing pipeline document, unknown stage kind, or
    /// malformed stage parameters.
    #[error("invalid pipeline configuration: {0}")]
    Configuration(String),

    /// A `{identifier}` substitution target was absent from the ArgMap.
    #[error("undefined variable {{{0}}}")]
    UndefinedVariable(String),

    /// A stage failed at run time — absent stage data, an incompatible
    /// or empty working image, out-of-bounds geometry.
    #[error("stage execution failed: {0}")]
    Execution(String),

    /// Image decode or encode failure at the I/O boundary.
    #[error("image I/O failed: {0}")]
    Io(#[from] image::ImageError),
}

impl EngineError {
    /// Stable kind string recorded as `errorKind` in the result document.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::UndefinedVariable(_) => "UndefinedVariableError",
            Self::Execution(_) => "ExecutionError",
            Self::Io(_) => "IOError",
        }
    }
}

/// Diagnostic fields a successful stage contributes to its result entry.
///
/// The engine merges these into the stage's namespace of the result
/// document after the uniform `status` and `elapsedMs` fields.
#[derive(Debug, Default)]
pub struct StageOutcome {
    diagnostics: JsonMap,
}

impl StageOutcome {
    /// An outcome with no diagnostic fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of one diagnostic field.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.diagnostics.insert(key.to_string(), value.into());
        self
    }

    /// Insert one diagnostic field.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.diagnostics.insert(key.to_string(), value.into());
    }

    /// Consume the outcome, yielding the diagnostic fields.
    #[must_use]
    pub fn into_diagnostics(self) -> JsonMap {
        self.diagnostics
    }
}

/// The ordered result document returned by one pipeline run.
///
/// One entry per attempted stage, keyed by stage name, in execution
/// order. On a fail-fast stop the trailing stages are simply absent.
/// The document's lifetime is independent of the run that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult(JsonMap);

impl PipelineResult {
    pub(crate) const fn new(entries: JsonMap) -> Self {
        Self(entries)
    }

    /// The result entry recorded for `stage`, if that stage was attempted.
    #[must_use]
    pub fn get(&self, stage: &str) -> Option<&Value> {
        self.0.get(stage)
    }

    /// Number of attempted stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no stage was attempted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Borrow the underlying ordered map.
    #[must_use]
    pub const fn as_map(&self) -> &JsonMap {
        &self.0
    }

    /// Consume the document into a plain JSON value for serialization.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(
            EngineError::Configuration(String::new()).kind(),
            "ConfigurationError",
        );
        assert_eq!(
            EngineError::UndefinedVariable(String::new()).kind(),
            "UndefinedVariableError",
        );
        assert_eq!(EngineError::Execution(String::new()).kind(), "ExecutionError");
    }

    #[test]
    fn image_errors_convert_to_the_io_kind() {
        let source = image::ImageError::IoError(std::io::Error::other("disk gone"));
        let err = EngineError::from(source);
        assert_eq!(err.kind(), "IOError");
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn undefined_variable_display_includes_braces() {
        let err = EngineError::UndefinedVariable("threshold".to_string());
        assert_eq!(err.to_string(), "undefined variable {threshold}");
    }

    #[test]
    fn configuration_display() {
        let err = EngineError::Configuration("stage 2 has no \"op\" field".to_string());
        assert_eq!(
            err.to_string(),
            "invalid pipeline configuration: stage 2 has no \"op\" field",
        );
    }

    #[test]
    fn outcome_builder_accumulates_fields() {
        let outcome = StageOutcome::new().with("sigma", 1.5).with("applied", true);
        let diagnostics = outcome.into_diagnostics();
        assert_eq!(diagnostics.get("sigma"), Some(&json!(1.5)));
        assert_eq!(diagnostics.get("applied"), Some(&json!(true)));
    }

    #[test]
    fn result_preserves_insertion_order() {
        let mut entries = JsonMap::new();
        entries.insert("zebra".to_string(), json!({}));
        entries.insert("apple".to_string(), json!({}));
        entries.insert("mango".to_string(), json!({}));

        let result = PipelineResult::new(entries);
        let names: Vec<&str> = result.stage_names().collect();
        assert_eq!(names, vec!["zebra", "apple", "mango"]);
    }

    #[test]
    fn empty_result() {
        let result = PipelineResult::new(JsonMap::new());
        assert!(result.is_empty());
        assert_eq!(result.len(), 0);
        assert!(result.get("anything").is_none());
    }
}
