//! Distributed feature-toggle engine.
//!
//! Instances of an application share feature state through a pluggable
//! shared store (optimistic compare-and-swap mutation) and converge
//! through a pub/sub change channel. Reads are local and synchronous
//! against an in-memory mirror; every value entering the system passes
//! one validation pipeline; losing the store degrades the engine to
//! fallback-only operation instead of crashing it.

mod config;
mod engine;
mod error;
mod registry;
mod state;
mod validation;

pub use config::EngineConfig;
pub use engine::{Engine, FeatureInfo};
pub use error::{EngineError, EngineResult};
pub use registry::{ChangeHandler, FeatureChange, FeatureValidator};
pub use state::ScopedValues;
pub use validation::messages;
