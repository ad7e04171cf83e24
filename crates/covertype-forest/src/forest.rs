//! Forest fitting with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{ForestConfig, MaxFeatures, Voting};
use crate::error::ForestError;
use crate::tree::{DecisionTree, TreeParams};

/// A fitted random forest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) feature_names: Vec<String>,
    pub(crate) voting: Voting,
}

impl RandomForest {
    /// Check that the forest can predict without panicking.
    ///
    /// Fitted forests always pass. Decoded or hand-built ones may not.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::MalformedForest`] when there are no trees, no
    /// classes, or any tree disagrees with the forest's widths or holds an
    /// out-of-range child, feature or class.
    pub fn validate(&self) -> Result<(), ForestError> {
        if self.trees.is_empty() {
            return Err(ForestError::MalformedForest {
                reason: "forest has no trees".to_owned(),
            });
        }
        if self.n_classes == 0 || self.n_features == 0 {
            return Err(ForestError::MalformedForest {
                reason: format!(
                    "forest is {} features x {} classes",
                    self.n_features, self.n_classes
                ),
            });
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.n_classes)
                .map_err(|reason| ForestError::MalformedForest {
                    reason: format!("tree {i}: {reason}"),
                })?;
        }
        Ok(())
    }
}

pub(crate) fn resolve_max_features(
    max_features: MaxFeatures,
    n_features: usize,
) -> Result<usize, ForestError> {
    let resolved = match max_features {
        MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
        MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
        MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
        MaxFeatures::Fixed(n) => n,
        MaxFeatures::All => n_features,
    };
    if resolved == 0 || resolved > n_features {
        return Err(ForestError::InvalidMaxFeatures {
            max_features: resolved,
            n_features,
        });
    }
    Ok(resolved)
}

fn validate_data(features: &[Vec<f64>], labels: &[usize]) -> Result<usize, ForestError> {
    let Some(first) = features.first() else {
        return Err(ForestError::EmptyDataset);
    };
    let n_features = first.len();
    if n_features == 0 {
        return Err(ForestError::ZeroFeatures);
    }
    if labels.len() != features.len() {
        return Err(ForestError::LabelCountMismatch {
            n_samples: features.len(),
            n_labels: labels.len(),
        });
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(ForestError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(ForestError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

fn validate_params(config: &ForestConfig, n_features: usize) -> Result<TreeParams, ForestError> {
    if config.max_depth == Some(0) {
        return Err(ForestError::InvalidMaxDepth { max_depth: 0 });
    }
    if config.min_samples_split < 2 {
        return Err(ForestError::InvalidMinSamplesSplit {
            min_samples_split: config.min_samples_split,
        });
    }
    if config.min_samples_leaf < 1 {
        return Err(ForestError::InvalidMinSamplesLeaf {
            min_samples_leaf: config.min_samples_leaf,
        });
    }
    if config.bootstrap_fraction <= 0.0 || config.bootstrap_fraction > 1.0 {
        return Err(ForestError::InvalidBootstrapFraction {
            fraction: config.bootstrap_fraction,
        });
    }
    Ok(TreeParams {
        criterion: config.criterion,
        max_depth: config.max_depth,
        min_samples_split: config.min_samples_split,
        min_samples_leaf: config.min_samples_leaf,
        max_features: resolve_max_features(config.max_features, n_features)?,
    })
}

/// Draw `draw_count` row indices with replacement.
fn bootstrap(n_samples: usize, draw_count: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..draw_count).map(|_| rng.gen_range(0..n_samples)).collect()
}

#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &ForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<RandomForest, ForestError> {
    let n_features = validate_data(features, labels)?;
    let params = validate_params(config, n_features)?;

    let n_samples = features.len();
    let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
    let draw_count = ((n_samples as f64) * config.bootstrap_fraction).ceil() as usize;

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        n_classes,
        max_features = params.max_features,
        voting = ?config.voting,
        "fitting random forest"
    );

    // Per-tree seeds come from one master stream so results do not depend
    // on rayon's scheduling.
    let mut master = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master.r#gen()).collect();

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let drawn = bootstrap(n_samples, draw_count, &mut rng);
            let rows: Vec<Vec<f64>> = drawn.iter().map(|&i| features[i].clone()).collect();
            let tree_labels: Vec<usize> = drawn.iter().map(|&i| labels[i]).collect();
            DecisionTree::grow(params, &rows, &tree_labels, n_classes, rng.r#gen())
        })
        .collect();

    debug!(
        total_nodes = trees.iter().map(DecisionTree::n_nodes).sum::<usize>(),
        "tree fitting complete"
    );

    Ok(RandomForest {
        trees,
        n_features,
        n_classes,
        feature_names: feature_names.to_vec(),
        voting: config.voting,
    })
}

#[cfg(test)]
mod tests {
    use super::resolve_max_features;
    use crate::config::{ForestConfig, MaxFeatures, Voting};
    use crate::error::ForestError;

    /// Three elevation bands, one class each, plus a constant column.
    fn banded() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for (class, base) in [2000.0, 2800.0, 3500.0].into_iter().enumerate() {
            for i in 0..20 {
                features.push(vec![base + i as f64 * 5.0, 1.0]);
                labels.push(class);
            }
        }
        let names = vec!["Elevation".to_string(), "Slope".to_string()];
        (features, labels, names)
    }

    #[test]
    fn max_features_resolution() {
        assert_eq!(resolve_max_features(MaxFeatures::Sqrt, 54).unwrap(), 8);
        assert_eq!(resolve_max_features(MaxFeatures::Log2, 54).unwrap(), 6);
        assert_eq!(resolve_max_features(MaxFeatures::All, 54).unwrap(), 54);
        assert!(resolve_max_features(MaxFeatures::Fixed(60), 54).is_err());
    }

    #[test]
    fn fits_separable_bands() {
        let (features, labels, names) = banded();
        let forest = ForestConfig::new(25)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .fit(&features, &labels, &names)
            .unwrap();
        assert_eq!(forest.n_trees(), 25);
        assert_eq!(forest.n_classes(), 3);
        assert_eq!(forest.predict(&[2010.0, 1.0]).unwrap(), 0);
        assert_eq!(forest.predict(&[2850.0, 1.0]).unwrap(), 1);
        assert_eq!(forest.predict(&[3560.0, 1.0]).unwrap(), 2);
    }

    #[test]
    fn same_seed_same_forest() {
        let (features, labels, names) = banded();
        let config = ForestConfig::new(10).unwrap().with_seed(99);
        let a = config.fit(&features, &labels, &names).unwrap();
        let b = config.fit(&features, &labels, &names).unwrap();
        for sample in &features {
            assert_eq!(
                a.predict_proba(sample).unwrap().as_slice(),
                b.predict_proba(sample).unwrap().as_slice()
            );
        }
    }

    #[test]
    fn voting_is_carried_onto_the_forest() {
        let (features, labels, names) = banded();
        let forest = ForestConfig::new(5)
            .unwrap()
            .with_voting(Voting::Hard)
            .fit(&features, &labels, &names)
            .unwrap();
        assert_eq!(forest.voting(), Voting::Hard);
        assert!(!forest.supports_proba());
    }

    #[test]
    fn empty_dataset_error() {
        let err = ForestConfig::new(3).unwrap().fit(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, ForestError::EmptyDataset));
    }

    #[test]
    fn label_count_mismatch_error() {
        let (features, _, names) = banded();
        let err = ForestConfig::new(3)
            .unwrap()
            .fit(&features, &[0, 1], &names)
            .unwrap_err();
        assert!(matches!(err, ForestError::LabelCountMismatch { n_labels: 2, .. }));
    }

    #[test]
    fn non_finite_value_error() {
        let features = vec![vec![1.0, f64::NAN], vec![2.0, 3.0]];
        let err = ForestConfig::new(3)
            .unwrap()
            .fit(&features, &[0, 1], &[])
            .unwrap_err();
        assert!(matches!(
            err,
            ForestError::NonFiniteValue { sample_index: 0, feature_index: 1 }
        ));
    }

    #[test]
    fn zero_depth_rejected() {
        let (features, labels, names) = banded();
        let err = ForestConfig::new(3)
            .unwrap()
            .with_max_depth(Some(0))
            .fit(&features, &labels, &names)
            .unwrap_err();
        assert!(matches!(err, ForestError::InvalidMaxDepth { .. }));
    }

    #[test]
    fn fitted_forest_validates_and_empty_one_does_not() {
        let (features, labels, names) = banded();
        let mut forest = ForestConfig::new(4)
            .unwrap()
            .fit(&features, &labels, &names)
            .unwrap();
        assert!(forest.validate().is_ok());

        forest.trees.clear();
        assert!(matches!(
            forest.validate(),
            Err(ForestError::MalformedForest { .. })
        ));
    }

    #[test]
    fn tree_of_another_width_is_malformed() {
        let (features, labels, names) = banded();
        let mut forest = ForestConfig::new(2)
            .unwrap()
            .fit(&features, &labels, &names)
            .unwrap();
        forest.n_classes = 5;
        let err = forest.validate().unwrap_err();
        assert!(err.to_string().contains("tree 0"), "{err}");
    }
}
