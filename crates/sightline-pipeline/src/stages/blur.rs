//! Gaussian blur stage.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`]. That function only
//! accepts single-channel images, so color inputs are split into
//! R/G/B/A channels, blurred independently, and reassembled (Gaussian
//! blur is a linear, per-channel operation, so this is equivalent to
//! blurring in color space).

use image::{DynamicImage, GrayImage, RgbaImage};

use crate::model::Model;
use crate::registry::Stage;
use crate::spec::StageSpec;
use crate::types::{EngineError, JsonMap, StageOutcome};

use super::{f32_param, require_pixels};

/// Default smoothing radius when no `sigma` parameter is given.
pub const DEFAULT_SIGMA: f32 = 1.4;

/// Bind a `blur` stage.
///
/// Parameters: `sigma` (number, optional, default [`DEFAULT_SIGMA`]).
/// Non-positive sigma leaves the image unchanged, since the underlying
/// filter panics on `sigma <= 0.0`.
///
/// # Errors
///
/// Returns [`EngineError::Configuration`] if `sigma` is not a number.
pub fn bind(_spec: &StageSpec, params: &JsonMap) -> Result<Box<dyn Stage>, EngineError> {
    let sigma = f32_param(params, "sigma")?.unwrap_or(DEFAULT_SIGMA);
    Ok(Box::new(Blur { sigma }))
}

#[derive(Debug)]
struct Blur {
    sigma: f32,
}

impl Stage for Blur {
    fn apply(
        &self,
        image: &mut DynamicImage,
        _model: &mut Model,
    ) -> Result<StageOutcome, EngineError> {
        require_pixels(image)?;

        let applied = self.sigma > 0.0;
        if applied {
            *image = match &*image {
                DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(
                    imageproc::filter::gaussian_blur_f32(gray, self.sigma),
                ),
                other => {
                    DynamicImage::ImageRgba8(blur_rgba(&other.to_rgba8(), self.sigma))
                }
            };
        }

        Ok(StageOutcome::new()
            .with("sigma", f64::from(self.sigma))
            .with("applied", applied))
    }
}

/// Blur each RGBA channel independently and reassemble.
fn blur_rgba(image: &RgbaImage, sigma: f32) -> RgbaImage {
    let (w, h) = (image.width(), image.height());

    let channels: [GrayImage; 4] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| image::Luma([image.get_pixel(x, y).0[c]]))
    });

    let blurred: [GrayImage; 4] =
        std::array::from_fn(|c| imageproc::filter::gaussian_blur_f32(&channels[c], sigma));

    RgbaImage::from_fn(w, h, |x, y| {
        image::Rgba([
            blurred[0].get_pixel(x, y).0[0],
            blurred[1].get_pixel(x, y).0[0],
            blurred[2].get_pixel(x, y).0[0],
            blurred[3].get_pixel(x, y).0[0],
        ])
    })
}
