//! Resize stage.

use image::DynamicImage;
use image::imageops::FilterType;

use crate::model::Model;
use crate::registry::Stage;
use crate::spec::StageSpec;
use crate::types::{EngineError, JsonMap, StageOutcome};

use super::require_u32;

/// Bind a `resize` stage.
///
/// Parameters: `width` and `height` (integers, both required, both at
/// least 1). Scaling uses triangle (bilinear) filtering.
///
/// # Errors
///
/// Returns [`EngineError::Configuration`] if either dimension is
/// missing, malformed, or zero.
pub fn bind(_spec: &StageSpec, params: &JsonMap) -> Result<Box<dyn Stage>, EngineError> {
    let width = require_u32(params, "width")?;
    let height = require_u32(params, "height")?;
    if width == 0 || height == 0 {
        return Err(EngineError::Configuration(format!(
            "resize dimensions must be at least 1, got {width}x{height}",
        )));
    }
    Ok(Box::new(Resize { width, height }))
}

#[derive(Debug)]
struct Resize {
    width: u32,
    height: u32,
}

impl Stage for Resize {
    fn apply(
        &self,
        image: &mut DynamicImage,
        _model: &mut Model,
    ) -> Result<StageOutcome, EngineError> {
        let outcome = StageOutcome::new()
            .with("sourceWidth", image.width())
            .with("sourceHeight", image.height())
            .with("width", self.width)
            .with("height", self.height);
        *image = image.resize_exact(self.width, self.height, FilterType::Triangle);
        Ok(outcome)
    }
}
