//! Cover type inference: artifact loading, classification and sweeps.
//!
//! ```no_run
//! use covertype_engine::{ArtifactPaths, shared};
//! use covertype_features::InputVector;
//!
//! let engine = shared(&ArtifactPaths::default())?;
//! let result = engine.classify_input(&InputVector::default())?;
//! println!("{} ({:.2})", result.cover_type(), result.confidence());
//! # Ok::<(), covertype_engine::EngineError>(())
//! ```

mod artifact;
mod cache;
mod engine;
mod error;
mod scaler;
mod synthetic;
pub mod sweep;

pub use artifact::{
    ArtifactPaths, ArtifactSource, ClassifierArtifact, FEATURES_FILE, MODEL_FILE, SCALER_FILE,
};
pub use cache::shared;
pub use engine::{InferenceEngine, PredictionResult, ProbabilitySource};
pub use error::EngineError;
pub use scaler::StandardScaler;
pub use sweep::{ConfidenceCurve, MAX_SWEEP_POINTS, Sweep, SweepDomain, SweepPoint};
pub use synthetic::SyntheticConfig;
