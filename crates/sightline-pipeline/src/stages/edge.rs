//! Canny edge detection and inversion stages.
//!
//! `canny` wraps [`imageproc::edges::canny`], producing a binary image
//! where white pixels (255) are edges and black pixels (0) are
//! background. `invert` flips every channel value, which on a binary
//! edge map swaps edge and background pixels.

use image::DynamicImage;

use crate::model::Model;
use crate::registry::Stage;
use crate::spec::StageSpec;
use crate::types::{EngineError, JsonMap, StageOutcome};

use super::{f32_param, require_pixels};

/// Default hysteresis low threshold.
pub const DEFAULT_LOW: f32 = 50.0;
/// Default hysteresis high threshold.
pub const DEFAULT_HIGH: f32 = 150.0;

/// Minimum allowed Canny threshold.
///
/// A low threshold of zero treats every pixel with any gradient as a
/// potential edge, producing a degenerate edge map.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Bind a `canny` stage.
///
/// Parameters: `low` (number, default [`DEFAULT_LOW`]) and `high`
/// (number, default [`DEFAULT_HIGH`]). Both are clamped to at least
/// [`MIN_THRESHOLD`] and `low` is clamped to at most `high`.
///
/// # Errors
///
/// Returns [`EngineError::Configuration`] if either threshold is not
/// a number.
pub fn bind_canny(_spec: &StageSpec, params: &JsonMap) -> Result<Box<dyn Stage>, EngineError> {
    let high = f32_param(params, "high")?
        .unwrap_or(DEFAULT_HIGH)
        .max(MIN_THRESHOLD);
    let low = f32_param(params, "low")?
        .unwrap_or(DEFAULT_LOW)
        .max(MIN_THRESHOLD)
        .min(high);
    Ok(Box::new(Canny { low, high }))
}

/// Bind an `invert` stage. Takes no parameters.
///
/// # Errors
///
/// Never fails; present for factory signature uniformity.
pub fn bind_invert(_spec: &StageSpec, _params: &JsonMap) -> Result<Box<dyn Stage>, EngineError> {
    Ok(Box::new(Invert))
}

#[derive(Debug)]
struct Canny {
    low: f32,
    high: f32,
}

impl Stage for Canny {
    fn apply(
        &self,
        image: &mut DynamicImage,
        _model: &mut Model,
    ) -> Result<StageOutcome, EngineError> {
        require_pixels(image)?;

        let gray = image.to_luma8();
        let edges = imageproc::edges::canny(&gray, self.low, self.high);
        let edge_pixels: u64 = edges.pixels().map(|p| u64::from(p.0[0] > 0)).sum();
        *image = DynamicImage::ImageLuma8(edges);

        Ok(StageOutcome::new()
            .with("low", f64::from(self.low))
            .with("high", f64::from(self.high))
            .with("edgePixels", edge_pixels))
    }
}

/// Flip every channel value of the working image in place.
#[derive(Debug)]
struct Invert;

impl Stage for Invert {
    fn apply(
        &self,
        image: &mut DynamicImage,
        _model: &mut Model,
    ) -> Result<StageOutcome, EngineError> {
        image.invert();
        Ok(StageOutcome::new())
    }
}
