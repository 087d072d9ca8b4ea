//! sightline-pipeline: JSON-configured image processing engine (sans-IO).
//!
//! A pipeline is declared as a JSON array of stages, each tagged with an
//! `"op"` kind dispatched through a [`StageRegistry`]. One run threads a
//! shared working image and a per-run [`Model`] (result document,
//! artifact store, ArgMap) through the stages in declared order,
//! stopping at the first failure and recording per-stage status, wall
//! time, and diagnostics into an insertion-ordered JSON document.
//!
//! Parameter values may reference `{identifier}` variables resolved
//! from a per-run ArgMap, so a parsed [`Pipeline`] is reusable across
//! runs with different arguments.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! images and returns structured data. File reading, image decode and
//! encode, and the CLI all live in the `sightline` binary crate.
//!
//! ```
//! use sightline_pipeline::{ArgMap, DynamicImage, Pipeline};
//!
//! # fn main() -> Result<(), sightline_pipeline::EngineError> {
//! let pipeline = Pipeline::new(
//!     r#"[
//!         {"op": "blur", "name": "smooth", "params": {"sigma": "{sigma}"}},
//!         {"op": "canny", "name": "edges"}
//!     ]"#,
//! )?;
//!
//! let mut args = ArgMap::new();
//! args.insert("sigma".to_string(), "2.0".to_string());
//!
//! let mut image = DynamicImage::new_rgb8(64, 64);
//! let result = pipeline.process(&mut image, &args);
//! assert_eq!(result.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod model;
pub mod pipeline;
pub mod registry;
pub mod spec;
pub mod stages;
pub mod subst;
pub mod types;

pub use model::{Artifact, Model};
pub use pipeline::Pipeline;
pub use registry::{Stage, StageFactory, StageRegistry};
pub use spec::StageSpec;
pub use types::{ArgMap, DynamicImage, EngineError, JsonMap, PipelineResult, StageOutcome};
