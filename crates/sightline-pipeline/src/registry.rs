//! The [`Stage`] capability and the kind-tag registry — the engine's
//! single point of polymorphic dispatch.
//!
//! The engine is agnostic to what stages compute. A registry maps a
//! type-tag string to a factory; per run, the factory validates the
//! stage's resolved parameters and binds a ready-to-apply instance.
//! Binding happens per run (not at parse time) because `{identifier}`
//! substitution can change parameter values between runs.
//!
//! The registry is built once at startup and treated as read-only
//! thereafter; [`Pipeline`](crate::Pipeline) shares it via `Arc`, which
//! is what makes one pipeline instance safe to run from concurrent
//! callers.

use std::collections::HashMap;

use image::DynamicImage;

use crate::model::Model;
use crate::spec::StageSpec;
use crate::types::{EngineError, JsonMap, StageOutcome};

/// One bound, ready-to-run unit of work.
pub trait Stage: std::fmt::Debug {
    /// Apply the stage to the working image.
    ///
    /// The stage may mutate `image` in place and read or write the
    /// model's artifact store. On success it returns diagnostic fields
    /// for its result entry; on failure the returned error's kind and
    /// message are recorded there instead and the run stops.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Execution`] (or another variant where the
    /// cause is configuration or substitution) describing why the stage
    /// could not complete.
    fn apply(&self, image: &mut DynamicImage, model: &mut Model)
    -> Result<StageOutcome, EngineError>;
}

/// Validates a stage's resolved parameters and produces a bound
/// [`Stage`] instance.
pub type StageFactory =
    Box<dyn Fn(&StageSpec, &JsonMap) -> Result<Box<dyn Stage>, EngineError> + Send + Sync>;

/// Mapping from type-tag string to stage factory.
pub struct StageRegistry {
    factories: HashMap<String, StageFactory>,
}

impl StageRegistry {
    /// A registry with no kinds registered.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with all built-in raster stage kinds registered.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        crate::stages::register_builtin(&mut registry);
        registry
    }

    /// Register (or replace) the factory for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, factory: StageFactory) {
        self.factories.insert(kind.into(), factory);
    }

    /// Whether a factory is registered for `kind`.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kind tags, in no particular order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Bind a stage instance for `spec` with its resolved parameters.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if the spec's kind is not
    /// registered, or whatever error the factory raises while
    /// validating `params`.
    pub fn bind(&self, spec: &StageSpec, params: &JsonMap) -> Result<Box<dyn Stage>, EngineError> {
        let factory = self.factories.get(spec.kind()).ok_or_else(|| {
            EngineError::Configuration(format!("unknown stage kind \"{}\"", spec.kind()))
        })?;
        factory(spec, params)
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.kinds().collect();
        kinds.sort_unstable();
        f.debug_struct("StageRegistry").field("kinds", &kinds).finish()
    }
}
