use std::path::PathBuf;

use covertype_features::FeatureError;
use covertype_forest::ForestError;

/// Errors from loading, building, and querying the classifier artifact.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Returned when the forest fails to fit, load, or predict.
    #[error(transparent)]
    Forest(#[from] ForestError),

    /// Returned when site inputs fail validation.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Returned when an artifact file cannot be read.
    #[error("failed to read {path}")]
    ReadFile {
        /// File that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when an artifact file cannot be written.
    #[error("failed to write {path}")]
    WriteFile {
        /// File that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a JSON artifact file cannot be decoded.
    #[error("invalid JSON in {path}")]
    ParseJson {
        /// File that failed to parse.
        path: PathBuf,
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when a JSON artifact cannot be encoded.
    #[error("failed to encode {what} as JSON")]
    EncodeJson {
        /// Which artifact part was being encoded.
        what: &'static str,
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when the loaded model, scaler and feature list disagree on width.
    #[error(
        "inconsistent artifact: model expects {model} features, scaler {scaler}, feature list {names}"
    )]
    InconsistentArtifact {
        /// Width the forest was fitted on.
        model: usize,
        /// Width the scaler was fitted on.
        scaler: usize,
        /// Number of entries in the feature-name list.
        names: usize,
    },

    /// Returned when the forest predicts a label outside the cover type range.
    #[error("model predicted label {label}, which is not a cover type")]
    UnknownClass {
        /// The out-of-range label.
        label: usize,
    },

    /// Returned when the forest knows more classes than there are cover types.
    #[error("model predicts {n_classes} classes, at most 7 cover types exist")]
    TooManyClasses {
        /// Class count stored in the forest.
        n_classes: usize,
    },

    /// Returned when a sweep range is reversed, has a non-positive step, or
    /// holds more than `MAX_SWEEP_POINTS` values.
    #[error(
        "invalid sweep domain: start {start}, stop {stop}, step {step} \
         (need start <= stop, step > 0, at most 10000 points)"
    )]
    InvalidSweepDomain {
        start: f64,
        stop: f64,
        step: f64,
    },

    /// Returned when a scaler cannot be fitted (no rows or ragged rows).
    #[error("cannot fit scaler: {reason}")]
    ScalerFit {
        /// What was wrong with the data.
        reason: String,
    },

    /// Returned when the process-wide artifact failed to initialize earlier.
    #[error("classifier artifact unavailable: {message}")]
    Unavailable {
        /// Rendered error from the failed initialization.
        message: String,
    },
}
