//! Fixed-seed demonstration data.

use covertype_features::{DEFAULT_FEATURE_COUNT, N_COVER_TYPES};
use covertype_forest::{ForestConfig, ForestError, MaxFeatures, SplitCriterion, Voting};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

/// Recipe for the demonstration artifact.
///
/// Every feature is drawn from a standard normal. Feature 0 is then
/// rescaled to `x * 500 + 2500` so it reads like an elevation in meters,
/// and the label is `trunc((x0 - 1800) / 500)` clamped to `[0, 6]`. The
/// resulting classes are elevation bands and the remaining 53 features
/// are noise.
///
/// | Parameter | Default |
/// |---|---|
/// | `n_samples` | 5000 |
/// | `n_trees` | 50 |
/// | `seed` | 42 |
/// | `voting` | [`Voting::Soft`] |
/// | `max_features` | [`MaxFeatures::Sqrt`] |
/// | `max_depth` | `None` |
/// | `min_samples_split` | 2 |
/// | `min_samples_leaf` | 1 |
/// | `criterion` | [`SplitCriterion::Gini`] |
/// | `bootstrap_fraction` | 1.0 |
///
/// The forest parameters are checked when the forest is fitted, through
/// [`forest_config`](Self::forest_config).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticConfig {
    n_samples: usize,
    n_trees: usize,
    seed: u64,
    voting: Voting,
    max_features: MaxFeatures,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    criterion: SplitCriterion,
    bootstrap_fraction: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self::new(5000, 50)
    }
}

impl SyntheticConfig {
    #[must_use]
    pub fn new(n_samples: usize, n_trees: usize) -> Self {
        Self {
            n_samples,
            n_trees,
            seed: 42,
            voting: Voting::Soft,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Gini,
            bootstrap_fraction: 1.0,
        }
    }

    /// Seed for both data generation and forest fitting.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_voting(mut self, voting: Voting) -> Self {
        self.voting = voting;
        self
    }

    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Depth limit per tree; `None` grows until leaves are pure.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Share of samples drawn with replacement for each tree.
    #[must_use]
    pub fn with_bootstrap_fraction(mut self, bootstrap_fraction: f64) -> Self {
        self.bootstrap_fraction = bootstrap_fraction;
        self
    }

    /// Forest parameters for fitting on the generated data.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] when `n_trees` is zero. The
    /// remaining parameters are validated by [`ForestConfig::fit`].
    pub fn forest_config(&self) -> Result<ForestConfig, ForestError> {
        Ok(ForestConfig::new(self.n_trees)?
            .with_seed(self.seed)
            .with_voting(self.voting)
            .with_max_features(self.max_features)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_criterion(self.criterion)
            .with_bootstrap_fraction(self.bootstrap_fraction))
    }

    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn voting(&self) -> Voting {
        self.voting
    }

    /// Draw the unscaled rows and their labels.
    #[must_use]
    pub fn generate(&self) -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let rows: Vec<Vec<f64>> = (0..self.n_samples)
            .map(|_| {
                let mut row: Vec<f64> = (0..DEFAULT_FEATURE_COUNT)
                    .map(|_| rng.sample::<f64, _>(StandardNormal))
                    .collect();
                row[0] = row[0] * 500.0 + 2500.0;
                row
            })
            .collect();
        let labels = rows.iter().map(|row| elevation_band(row[0])).collect();
        (rows, labels)
    }
}

/// Class for a synthetic elevation: 500 m bands starting at 1800 m.
fn elevation_band(elevation: f64) -> usize {
    ((elevation - 1800.0) / 500.0)
        .trunc()
        .clamp(0.0, (N_COVER_TYPES - 1) as f64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands() {
        assert_eq!(elevation_band(1000.0), 0);
        assert_eq!(elevation_band(1799.0), 0);
        assert_eq!(elevation_band(2299.9), 0);
        assert_eq!(elevation_band(2300.0), 1);
        assert_eq!(elevation_band(2800.0), 2);
        assert_eq!(elevation_band(4800.0), 6);
        assert_eq!(elevation_band(9000.0), 6);
    }

    #[test]
    fn same_seed_same_data() {
        let recipe = SyntheticConfig::new(50, 1);
        assert_eq!(recipe.generate(), recipe.generate());
        let other = recipe.with_seed(7).generate();
        assert_ne!(recipe.generate().0, other.0);
    }

    #[test]
    fn shape_and_elevation_scale() {
        let (rows, labels) = SyntheticConfig::new(2000, 1).generate();
        assert_eq!(rows.len(), 2000);
        assert_eq!(labels.len(), 2000);
        assert!(rows.iter().all(|r| r.len() == DEFAULT_FEATURE_COUNT));

        let mean = rows.iter().map(|r| r[0]).sum::<f64>() / 2000.0;
        assert!((mean - 2500.0).abs() < 50.0, "mean elevation {mean}");
        let noise_mean = rows.iter().map(|r| r[5]).sum::<f64>() / 2000.0;
        assert!(noise_mean.abs() < 0.1);
        assert!(labels.iter().all(|&l| l < N_COVER_TYPES));
    }

    #[test]
    fn defaults() {
        let recipe = SyntheticConfig::default();
        assert_eq!(recipe.n_samples(), 5000);
        assert_eq!(recipe.n_trees(), 50);
        assert_eq!(recipe.seed(), 42);
        assert_eq!(recipe.voting(), Voting::Soft);
        let forest = recipe.forest_config().unwrap();
        assert_eq!(forest.n_trees(), 50);
        assert_eq!(forest.max_features(), MaxFeatures::Sqrt);
        assert_eq!(forest.max_depth(), None);
    }

    #[test]
    fn forest_options_reach_the_forest_config() {
        let recipe = SyntheticConfig::new(100, 3)
            .with_max_features(MaxFeatures::Log2)
            .with_max_depth(Some(4))
            .with_criterion(SplitCriterion::Entropy)
            .with_seed(9);
        let forest = recipe.forest_config().unwrap();
        assert_eq!(forest.max_features(), MaxFeatures::Log2);
        assert_eq!(forest.max_depth(), Some(4));
        assert_eq!(forest.seed(), 9);
        assert!(SyntheticConfig::new(100, 0).forest_config().is_err());
    }
}
