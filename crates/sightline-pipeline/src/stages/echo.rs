//! Model echo stage.
//!
//! The `model` stage performs no image work: it copies its resolved
//! parameters into its diagnostics, which lands them in the result
//! document. Useful for threading run arguments or fixed annotations
//! into the output, and for observing what substitution produced.

use image::DynamicImage;

use crate::model::Model;
use crate::registry::Stage;
use crate::spec::StageSpec;
use crate::types::{EngineError, JsonMap, StageOutcome};

/// Bind a `model` stage. Every parameter is echoed verbatim.
///
/// # Errors
///
/// Never fails; present for factory signature uniformity.
pub fn bind(_spec: &StageSpec, params: &JsonMap) -> Result<Box<dyn Stage>, EngineError> {
    Ok(Box::new(Echo {
        params: params.clone(),
    }))
}

#[derive(Debug)]
struct Echo {
    params: JsonMap,
}

impl Stage for Echo {
    fn apply(
        &self,
        _image: &mut DynamicImage,
        _model: &mut Model,
    ) -> Result<StageOutcome, EngineError> {
        let mut outcome = StageOutcome::new();
        for (key, value) in &self.params {
            outcome.insert(key, value.clone());
        }
        Ok(outcome)
    }
}
