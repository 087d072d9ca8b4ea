//! Built-in raster stage kinds.
//!
//! Each submodule provides one stage kind as a `bind` factory that
//! validates resolved parameters and returns a boxed [`Stage`]
//! instance. The engine dispatches to these through the
//! [`StageRegistry`] exactly like any externally registered kind.
//!
//! Parameter values may arrive as JSON numbers or as numeric strings,
//! because `{identifier}` substitution always produces strings; the
//! helpers here accept both.

pub mod blur;
pub mod capture;
pub mod crop;
pub mod echo;
pub mod edge;
pub mod grayscale;
pub mod resize;
pub mod threshold;

use image::DynamicImage;
use serde_json::Value;

use crate::registry::StageRegistry;
use crate::types::{EngineError, JsonMap};

/// Register every built-in kind on `registry`.
pub(crate) fn register_builtin(registry: &mut StageRegistry) {
    registry.register("grayscale", Box::new(grayscale::bind));
    registry.register("blur", Box::new(blur::bind));
    registry.register("canny", Box::new(edge::bind_canny));
    registry.register("invert", Box::new(edge::bind_invert));
    registry.register("threshold", Box::new(threshold::bind));
    registry.register("resize", Box::new(resize::bind));
    registry.register("crop", Box::new(crop::bind));
    registry.register("capture", Box::new(capture::bind));
    registry.register("model", Box::new(echo::bind));
}

/// Read an optional floating-point parameter.
///
/// # Errors
///
/// Returns [`EngineError::Configuration`] if the value is present but
/// neither a JSON number nor a string parseable as one.
fn f32_param(params: &JsonMap, key: &str) -> Result<Option<f32>, EngineError> {
    match params.get(key) {
        None => Ok(None),
        Some(Value::Number(n)) => {
            #[allow(clippy::cast_possible_truncation)]
            let value = n.as_f64().map(|v| v as f32);
            Ok(value)
        }
        Some(Value::String(s)) => s.parse::<f32>().map(Some).map_err(|_| {
            EngineError::Configuration(format!(
                "parameter \"{key}\" must be a number, got \"{s}\"",
            ))
        }),
        Some(other) => Err(EngineError::Configuration(format!(
            "parameter \"{key}\" must be a number, got {other}",
        ))),
    }
}

/// Read an optional unsigned integer parameter.
///
/// # Errors
///
/// Returns [`EngineError::Configuration`] if the value is present but
/// not an unsigned integer that fits in `u32` (JSON number or string).
fn u32_param(params: &JsonMap, key: &str) -> Result<Option<u32>, EngineError> {
    match params.get(key) {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| {
                EngineError::Configuration(format!(
                    "parameter \"{key}\" must be an unsigned integer, got {n}",
                ))
            }),
        Some(Value::String(s)) => s.parse::<u32>().map(Some).map_err(|_| {
            EngineError::Configuration(format!(
                "parameter \"{key}\" must be an unsigned integer, got \"{s}\"",
            ))
        }),
        Some(other) => Err(EngineError::Configuration(format!(
            "parameter \"{key}\" must be an unsigned integer, got {other}",
        ))),
    }
}

/// Read a required unsigned integer parameter.
///
/// # Errors
///
/// Returns [`EngineError::Configuration`] if the value is absent or
/// malformed.
fn require_u32(params: &JsonMap, key: &str) -> Result<u32, EngineError> {
    u32_param(params, key)?.ok_or_else(|| {
        EngineError::Configuration(format!("missing required parameter \"{key}\""))
    })
}

/// Fail with an [`EngineError::Execution`] when the working image has
/// no pixels — stages that transform pixel data cannot operate on an
/// empty buffer.
fn require_pixels(image: &DynamicImage) -> Result<(u32, u32), EngineError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(EngineError::Execution(
            "working image is empty (no pixels)".to_string(),
        ));
    }
    Ok((width, height))
}
