//! Binary threshold stage.

use image::{DynamicImage, GrayImage};

use crate::model::Model;
use crate::registry::Stage;
use crate::spec::StageSpec;
use crate::types::{EngineError, JsonMap, StageOutcome};

use super::{require_pixels, u32_param};

/// Default cutoff when no `value` parameter is given.
pub const DEFAULT_VALUE: u8 = 128;

/// Bind a `threshold` stage.
///
/// Parameters: `value` (integer 0-255, default [`DEFAULT_VALUE`]).
/// Luma values strictly above the cutoff become 255, the rest 0.
///
/// # Errors
///
/// Returns [`EngineError::Configuration`] if `value` is not an
/// integer in `0..=255`.
pub fn bind(_spec: &StageSpec, params: &JsonMap) -> Result<Box<dyn Stage>, EngineError> {
    let value = match u32_param(params, "value")? {
        None => DEFAULT_VALUE,
        Some(v) => u8::try_from(v).map_err(|_| {
            EngineError::Configuration(format!(
                "parameter \"value\" must be in 0..=255, got {v}",
            ))
        })?,
    };
    Ok(Box::new(Threshold { value }))
}

#[derive(Debug)]
struct Threshold {
    value: u8,
}

impl Stage for Threshold {
    fn apply(
        &self,
        image: &mut DynamicImage,
        _model: &mut Model,
    ) -> Result<StageOutcome, EngineError> {
        require_pixels(image)?;

        let gray = image.to_luma8();
        let binary = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            if gray.get_pixel(x, y).0[0] > self.value {
                image::Luma([255])
            } else {
                image::Luma([0])
            }
        });
        let foreground: u64 = binary.pixels().map(|p| u64::from(p.0[0] > 0)).sum();
        *image = DynamicImage::ImageLuma8(binary);

        Ok(StageOutcome::new()
            .with("value", u32::from(self.value))
            .with("foregroundPixels", foreground))
    }
}
