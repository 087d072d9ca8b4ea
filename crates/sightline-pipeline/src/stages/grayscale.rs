//! Grayscale conversion stage.

use image::DynamicImage;

use crate::model::Model;
use crate::registry::Stage;
use crate::spec::StageSpec;
use crate::types::{EngineError, JsonMap, StageOutcome};

/// Bind a `grayscale` stage. Takes no parameters.
///
/// # Errors
///
/// Never fails; present for factory signature uniformity.
pub fn bind(_spec: &StageSpec, _params: &JsonMap) -> Result<Box<dyn Stage>, EngineError> {
    Ok(Box::new(Grayscale))
}

/// Convert the working image to single-channel luma.
#[derive(Debug)]
struct Grayscale;

impl Stage for Grayscale {
    fn apply(
        &self,
        image: &mut DynamicImage,
        _model: &mut Model,
    ) -> Result<StageOutcome, EngineError> {
        let gray = image.to_luma8();
        let outcome = StageOutcome::new()
            .with("width", gray.width())
            .with("height", gray.height());
        *image = DynamicImage::ImageLuma8(gray);
        Ok(outcome)
    }
}
