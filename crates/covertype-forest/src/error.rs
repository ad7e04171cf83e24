use std::path::PathBuf;

/// Errors from fitting, querying, and persisting a forest.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The rejected tree count.
        n_trees: usize,
    },

    /// Returned when max_depth is `Some(0)`.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The rejected depth limit.
        max_depth: usize,
    },

    /// Returned when min_samples_split is less than 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The rejected value.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The rejected value.
        min_samples_leaf: usize,
    },

    /// Returned when max_features resolves to 0 or exceeds the feature count.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved value.
        max_features: usize,
        /// Number of feature columns in the training data.
        n_features: usize,
    },

    /// Returned when bootstrap_fraction is not in (0.0, 1.0].
    #[error("bootstrap_fraction must be in (0.0, 1.0], got {fraction}")]
    InvalidBootstrapFraction {
        /// The rejected fraction.
        fraction: f64,
    },

    /// Returned when the training set has no rows.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training rows have no columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when the label slice and the feature rows differ in length.
    #[error("got {n_labels} labels for {n_samples} samples")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_samples: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a training row has a different width than the first row.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        got: usize,
        /// Zero-based index of the offending row.
        sample_index: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// Zero-based row index.
        sample_index: usize,
        /// Zero-based column index.
        feature_index: usize,
    },

    /// Returned when a prediction input has the wrong width.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// Width the forest was fitted on.
        expected: usize,
        /// Width of the input.
        got: usize,
    },

    /// Returned when a forest's trees are missing or structurally unsound.
    #[error("malformed forest: {reason}")]
    MalformedForest {
        /// First problem found.
        reason: String,
    },

    /// Returned when class probabilities are requested from a hard-voting forest.
    #[error("hard-voting forest does not produce class probabilities")]
    ProbabilityUnsupported,

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Model file that could not be decoded.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Destination path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Source path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a decoded model file disagrees with its own header or
    /// holds a malformed forest.
    #[error("corrupt model in {path}: {reason}")]
    CorruptModel {
        /// Path to the model file.
        path: PathBuf,
        /// First problem found.
        reason: String,
    },

    /// Returned when a model file carries an unknown format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// Version this build writes and reads.
        expected: u32,
        /// Version found in the file.
        found: u32,
        /// Path to the model file.
        path: PathBuf,
    },
}
