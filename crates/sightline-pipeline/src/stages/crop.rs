//! Crop stage.

use image::DynamicImage;

use crate::model::Model;
use crate::registry::Stage;
use crate::spec::StageSpec;
use crate::types::{EngineError, JsonMap, StageOutcome};

use super::{require_u32, u32_param};

/// Bind a `crop` stage.
///
/// Parameters: `width` and `height` (integers, required, at least 1);
/// `x` and `y` (integers, default 0). The rectangle is validated
/// against the working image's bounds at execution time, since the
/// image is not known when the stage is bound.
///
/// # Errors
///
/// Returns [`EngineError::Configuration`] if a dimension is missing,
/// malformed, or zero.
pub fn bind(_spec: &StageSpec, params: &JsonMap) -> Result<Box<dyn Stage>, EngineError> {
    let x = u32_param(params, "x")?.unwrap_or(0);
    let y = u32_param(params, "y")?.unwrap_or(0);
    let width = require_u32(params, "width")?;
    let height = require_u32(params, "height")?;
    if width == 0 || height == 0 {
        return Err(EngineError::Configuration(format!(
            "crop dimensions must be at least 1, got {width}x{height}",
        )));
    }
    Ok(Box::new(Crop {
        x,
        y,
        width,
        height,
    }))
}

#[derive(Debug)]
struct Crop {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl Stage for Crop {
    fn apply(
        &self,
        image: &mut DynamicImage,
        _model: &mut Model,
    ) -> Result<StageOutcome, EngineError> {
        let (iw, ih) = (image.width(), image.height());
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        if right.is_none_or(|r| r > iw) || bottom.is_none_or(|b| b > ih) {
            return Err(EngineError::Execution(format!(
                "crop rectangle {}x{}+{}+{} exceeds image bounds {iw}x{ih}",
                self.width, self.height, self.x, self.y,
            )));
        }

        *image = image.crop_imm(self.x, self.y, self.width, self.height);
        Ok(StageOutcome::new()
            .with("x", self.x)
            .with("y", self.y)
            .with("width", self.width)
            .with("height", self.height))
    }
}
