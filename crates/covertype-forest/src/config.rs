//! Builder for forest fitting parameters.

use crate::error::ForestError;
use crate::forest::RandomForest;
use crate::split::SplitCriterion;

/// How many features each split may consider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// Ceiling of the square root of the feature count.
    Sqrt,
    /// Ceiling of log2 of the feature count.
    Log2,
    /// A fraction of the feature count, in (0.0, 1.0].
    Fraction(f64),
    /// An explicit count.
    Fixed(usize),
    /// Every feature.
    All,
}

/// How per-tree outputs are combined into one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Voting {
    /// Average the leaf class distributions; probabilities are available.
    Soft,
    /// Majority vote over per-tree labels; probabilities are not available.
    Hard,
}

/// Parameters for fitting a [`RandomForest`].
///
/// Construct via [`ForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter            | Default    |
/// |----------------------|------------|
/// | `max_features`       | `Sqrt`     |
/// | `max_depth`          | `None`     |
/// | `min_samples_split`  | 2          |
/// | `min_samples_leaf`   | 1          |
/// | `criterion`          | `Gini`     |
/// | `voting`             | `Soft`     |
/// | `seed`               | 42         |
/// | `bootstrap_fraction` | 1.0        |
#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) voting: Voting,
    pub(crate) seed: u64,
    pub(crate) bootstrap_fraction: f64,
}

impl ForestConfig {
    /// Create a config for a forest of `n_trees` trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Gini,
            voting: Voting::Soft,
            seed: 42,
            bootstrap_fraction: 1.0,
        })
    }

    /// Set the per-split feature budget.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth. `None` grows until leaves are pure.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples a node needs before it may split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples each child must keep.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the impurity criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the voting scheme stored with the fitted forest.
    #[must_use]
    pub fn with_voting(mut self, voting: Voting) -> Self {
        self.voting = voting;
        self
    }

    /// Set the master seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the share of samples drawn (with replacement) for each tree.
    #[must_use]
    pub fn with_bootstrap_fraction(mut self, bootstrap_fraction: f64) -> Self {
        self.bootstrap_fraction = bootstrap_fraction;
        self
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    #[must_use]
    pub fn voting(&self) -> Voting {
        self.voting
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fit a forest on a row-major dataset.
    ///
    /// `features[sample][feature]`, `labels[sample]` zero-based class ids.
    ///
    /// # Errors
    ///
    /// | Variant                                   | When                                      |
    /// |-------------------------------------------|-------------------------------------------|
    /// | [`ForestError::EmptyDataset`]             | `features` is empty                       |
    /// | [`ForestError::ZeroFeatures`]             | rows have no columns                      |
    /// | [`ForestError::LabelCountMismatch`]       | `labels.len() != features.len()`          |
    /// | [`ForestError::FeatureCountMismatch`]     | rows differ in width                      |
    /// | [`ForestError::NonFiniteValue`]           | any value is NaN or infinite              |
    /// | [`ForestError::InvalidMaxFeatures`]       | budget resolves outside [1, n_features]   |
    /// | [`ForestError::InvalidBootstrapFraction`] | fraction outside (0.0, 1.0]               |
    /// | [`ForestError::InvalidMaxDepth`]          | `max_depth` is `Some(0)`                  |
    /// | [`ForestError::InvalidMinSamplesSplit`]   | `min_samples_split < 2`                   |
    /// | [`ForestError::InvalidMinSamplesLeaf`]    | `min_samples_leaf < 1`                    |
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<RandomForest, ForestError> {
        crate::forest::train(self, features, labels, feature_names)
    }
}
