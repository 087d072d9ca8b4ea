//! Per-run mutable state: the accumulating result document, named stage
//! artifacts, and the run's ArgMap.
//!
//! A fresh [`Model`] is created for every call to
//! [`Pipeline::process`](crate::Pipeline::process) and dropped when the
//! run ends — artifacts never leak across runs, and no manual cleanup
//! is needed. The result document is detached into a
//! [`PipelineResult`](crate::PipelineResult) with its own lifetime.

use std::collections::HashMap;

use image::DynamicImage;
use serde_json::Value;

use crate::types::{ArgMap, EngineError, JsonMap, PipelineResult};

/// An opaque intermediate value a stage stores for later stages to
/// reference by the producing stage's name.
///
/// Artifacts are what let a pipeline branch despite linear execution:
/// a later stage can declare `"input": "stageA"` and operate on the
/// image `stageA` captured instead of the current shared image.
#[derive(Debug, Clone)]
pub enum Artifact {
    /// An intermediate raster image.
    Image(DynamicImage),
    /// A JSON payload (measurements, detected geometry, ...).
    Value(Value),
}

/// Mutable state owned by exactly one pipeline run.
#[derive(Debug)]
pub struct Model {
    result: JsonMap,
    stage_data: HashMap<String, Artifact>,
    args: ArgMap,
}

impl Model {
    /// Create an empty model seeded with the run's ArgMap.
    #[must_use]
    pub fn new(args: ArgMap) -> Self {
        Self {
            result: JsonMap::new(),
            stage_data: HashMap::new(),
            args,
        }
    }

    /// The resolved ArgMap for this run. Fixed for the run's duration.
    #[must_use]
    pub const fn args(&self) -> &ArgMap {
        &self.args
    }

    /// The writable result namespace for `name`, created on first use.
    ///
    /// Stage names are unique within a pipeline, so distinct stages can
    /// never collide here; repeated calls for the same name return the
    /// same namespace.
    pub fn begin_stage(&mut self, name: &str) -> &mut JsonMap {
        if !matches!(self.result.get(name), Some(Value::Object(_))) {
            self.result
                .insert(name.to_string(), Value::Object(JsonMap::new()));
        }
        match self.result.get_mut(name) {
            Some(Value::Object(entry)) => entry,
            // The slot was initialized as an object just above.
            #[allow(clippy::unreachable)]
            _ => unreachable!("stage result slot is always an object"),
        }
    }

    /// Store `artifact` under the producing stage's name, replacing any
    /// previous artifact stored there.
    pub fn put_stage_data(&mut self, name: &str, artifact: Artifact) {
        self.stage_data.insert(name.to_string(), artifact);
    }

    /// The artifact stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Execution`] if no artifact was stored
    /// under that name — referencing a stage that never ran (or never
    /// captured anything) is a runtime failure of the requesting stage.
    pub fn stage_data(&self, name: &str) -> Result<&Artifact, EngineError> {
        self.stage_data.get(name).ok_or_else(|| {
            EngineError::Execution(format!("no stage data stored under \"{name}\""))
        })
    }

    /// Number of artifacts currently retained.
    #[must_use]
    pub fn stage_data_len(&self) -> usize {
        self.stage_data.len()
    }

    /// Detach the result document, dropping the artifact store.
    #[must_use]
    pub fn into_result(self) -> PipelineResult {
        PipelineResult::new(self.result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn begin_stage_creates_namespace_once() {
        let mut model = Model::new(ArgMap::new());
        model.begin_stage("blur").insert("sigma".to_string(), json!(1.4));
        model.begin_stage("blur").insert("status".to_string(), json!("ok"));

        let result = model.into_result();
        assert_eq!(result.len(), 1);
        assert_eq!(
            result.get("blur"),
            Some(&json!({"sigma": 1.4, "status": "ok"})),
        );
    }

    #[test]
    fn result_keys_follow_begin_order() {
        let mut model = Model::new(ArgMap::new());
        model.begin_stage("third");
        model.begin_stage("first");
        model.begin_stage("second");

        let result = model.into_result();
        let names: Vec<&str> = result.stage_names().collect();
        assert_eq!(names, vec!["third", "first", "second"]);
    }

    #[test]
    fn stage_data_round_trip() {
        let mut model = Model::new(ArgMap::new());
        model.put_stage_data("measure", Artifact::Value(json!({"count": 3})));

        match model.stage_data("measure").unwrap() {
            Artifact::Value(v) => assert_eq!(v, &json!({"count": 3})),
            Artifact::Image(_) => panic!("expected a value artifact"),
        }
    }

    #[test]
    fn absent_stage_data_is_execution_error() {
        let model = Model::new(ArgMap::new());
        let err = model.stage_data("ghost").unwrap_err();
        assert!(matches!(err, EngineError::Execution(_)));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn put_stage_data_replaces_previous() {
        let mut model = Model::new(ArgMap::new());
        model.put_stage_data("slot", Artifact::Value(json!(1)));
        model.put_stage_data("slot", Artifact::Value(json!(2)));

        assert_eq!(model.stage_data_len(), 1);
        match model.stage_data("slot").unwrap() {
            Artifact::Value(v) => assert_eq!(v, &json!(2)),
            Artifact::Image(_) => panic!("expected a value artifact"),
        }
    }

    #[test]
    fn image_artifacts_survive_storage() {
        let mut model = Model::new(ArgMap::new());
        let image = DynamicImage::new_luma8(4, 3);
        model.put_stage_data("capture", Artifact::Image(image));

        match model.stage_data("capture").unwrap() {
            Artifact::Image(stored) => {
                assert_eq!(stored.width(), 4);
                assert_eq!(stored.height(), 3);
            }
            Artifact::Value(_) => panic!("expected an image artifact"),
        }
    }

    #[test]
    fn fresh_model_retains_nothing() {
        let model = Model::new(ArgMap::new());
        assert_eq!(model.stage_data_len(), 0);
        assert!(model.into_result().is_empty());
    }

    #[test]
    fn args_are_readable() {
        let mut args = ArgMap::new();
        args.insert("x".to_string(), "5".to_string());
        let model = Model::new(args);
        assert_eq!(model.args().get("x").map(String::as_str), Some("5"));
    }
}
