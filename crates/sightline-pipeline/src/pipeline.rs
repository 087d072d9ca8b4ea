//! Pipeline construction and execution.
//!
//! A [`Pipeline`] is parsed once from JSON text and is immutable
//! afterwards; every call to [`Pipeline::process`] is an independent
//! run with its own [`Model`], so one instance can serve concurrent
//! callers. Execution is fail-fast: the first stage error is recorded
//! in that stage's result entry and the run stops there, leaving
//! trailing stages absent from the document.

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::DynamicImage;
use serde_json::Value;

use crate::model::{Artifact, Model};
use crate::registry::StageRegistry;
use crate::spec::{StageSpec, parse_pipeline};
use crate::subst::resolve_params;
use crate::types::{ArgMap, EngineError, JsonMap, PipelineResult, StageOutcome};

/// An immutable, reusable sequence of stage specs bound to a registry.
#[derive(Debug)]
pub struct Pipeline {
    specs: Vec<StageSpec>,
    registry: Arc<StageRegistry>,
}

impl Pipeline {
    /// Parse `json_text` against the built-in stage registry.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if the text is not a
    /// JSON stage array (bare or under a `"pipeline"` key), a stage
    /// entry is malformed, or two stages share a name. Stage *kinds*
    /// are not checked here — an unknown kind surfaces as that stage's
    /// failure at run time.
    pub fn new(json_text: &str) -> Result<Self, EngineError> {
        Self::from_json(json_text, Arc::new(StageRegistry::builtin()))
    }

    /// Parse `json_text` against a caller-supplied registry.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Pipeline::new`].
    pub fn from_json(json_text: &str, registry: Arc<StageRegistry>) -> Result<Self, EngineError> {
        let specs = parse_pipeline(json_text)?;
        Ok(Self { specs, registry })
    }

    /// Number of declared stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.specs.len()
    }

    /// Returns `true` if the pipeline declares no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Run every stage against `image`, threading a fresh [`Model`].
    ///
    /// `image` is mutated in place; after the run it holds whatever the
    /// last attempted stage left behind. Errors never propagate to the
    /// caller: a failing stage gets `status = "error"` plus `errorKind`
    /// and `errorMessage` in its result entry, and the run stops there.
    #[must_use]
    pub fn process(&self, image: &mut DynamicImage, args: &ArgMap) -> PipelineResult {
        let mut model = Model::new(args.clone());

        for spec in &self.specs {
            let started = Instant::now();
            let attempt = self.run_stage(spec, image, &mut model);
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

            let entry = model.begin_stage(spec.name());
            match attempt {
                Ok(outcome) => {
                    tracing::debug!(
                        stage = spec.name(),
                        kind = spec.kind(),
                        elapsed_ms,
                        "stage complete"
                    );
                    record_success(entry, elapsed_ms, outcome);
                }
                Err(error) => {
                    tracing::warn!(
                        stage = spec.name(),
                        kind = spec.kind(),
                        error_kind = error.kind(),
                        %error,
                        "stage failed, stopping run"
                    );
                    record_failure(entry, elapsed_ms, &error);
                    break;
                }
            }
        }

        model.into_result()
    }

    /// Substitute, bind, and apply one stage.
    fn run_stage(
        &self,
        spec: &StageSpec,
        image: &mut DynamicImage,
        model: &mut Model,
    ) -> Result<StageOutcome, EngineError> {
        let params = resolve_params(spec.params(), model.args())?;

        if let Some(input) = params.get("input") {
            let name = input.as_str().ok_or_else(|| {
                EngineError::Execution(format!(
                    "parameter \"input\" must be a stage name string, got {input}",
                ))
            })?;
            match model.stage_data(name)? {
                Artifact::Image(stored) => *image = stored.clone(),
                Artifact::Value(_) => {
                    return Err(EngineError::Execution(format!(
                        "stage data \"{name}\" is not an image",
                    )));
                }
            }
        }

        let stage = self.registry.bind(spec, &params)?;
        stage.apply(image, model)
    }

    /// Run the pipeline `iterations` times against clones of `image`
    /// and return the mean wall time per run. Result documents are
    /// discarded; this is the benchmark path behind the CLI's `--time`.
    #[must_use]
    pub fn measure(&self, image: &DynamicImage, args: &ArgMap, iterations: u32) -> Duration {
        if iterations == 0 {
            return Duration::ZERO;
        }

        let started = Instant::now();
        for _ in 0..iterations {
            let mut working = image.clone();
            let _ = self.process(&mut working, args);
        }
        started.elapsed() / iterations
    }
}

/// Result-entry fields owned by the engine. A stage diagnostic with one
/// of these names must not overwrite them — the `model` stage echoes
/// arbitrary params, so collisions are reachable from valid input.
const RESERVED_FIELDS: [&str; 4] = ["status", "elapsedMs", "errorKind", "errorMessage"];

fn record_success(entry: &mut JsonMap, elapsed_ms: f64, outcome: StageOutcome) {
    entry.insert("status".to_string(), Value::from("ok"));
    entry.insert("elapsedMs".to_string(), Value::from(elapsed_ms));
    for (key, value) in outcome.into_diagnostics() {
        if !RESERVED_FIELDS.contains(&key.as_str()) {
            entry.insert(key, value);
        }
    }
}

fn record_failure(entry: &mut JsonMap, elapsed_ms: f64, error: &EngineError) {
    entry.insert("status".to_string(), Value::from("error"));
    entry.insert("elapsedMs".to_string(), Value::from(elapsed_ms));
    entry.insert("errorKind".to_string(), Value::from(error.kind()));
    entry.insert("errorMessage".to_string(), Value::from(error.to_string()));
}
