//! Capture stage.
//!
//! Snapshots the current working image into the model's artifact store
//! under the stage's name, so a later stage can restore it with the
//! `input` parameter.

use image::DynamicImage;

use crate::model::{Artifact, Model};
use crate::registry::Stage;
use crate::spec::StageSpec;
use crate::types::{EngineError, JsonMap, StageOutcome};

/// Bind a `capture` stage. Takes no parameters; the artifact is stored
/// under the stage's own name.
///
/// # Errors
///
/// Never fails; present for factory signature uniformity.
pub fn bind(spec: &StageSpec, _params: &JsonMap) -> Result<Box<dyn Stage>, EngineError> {
    Ok(Box::new(Capture {
        name: spec.name().to_string(),
    }))
}

#[derive(Debug)]
struct Capture {
    name: String,
}

impl Stage for Capture {
    fn apply(
        &self,
        image: &mut DynamicImage,
        model: &mut Model,
    ) -> Result<StageOutcome, EngineError> {
        model.put_stage_data(&self.name, Artifact::Image(image.clone()));
        Ok(StageOutcome::new()
            .with("width", image.width())
            .with("height", image.height()))
    }
}
