//! Prediction over a fitted forest.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::config::Voting;
use crate::error::ForestError;
use crate::forest::RandomForest;
use crate::tree::DecisionTree;

/// Averaged class probabilities for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    pub(crate) fn new(probs: Vec<f64>) -> Self {
        Self { probs }
    }

    /// Index of the largest probability; the lowest index wins ties.
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        argmax(&self.probs)
    }

    /// The `k` most probable classes, most probable first.
    #[must_use]
    pub fn top_k(&self, k: usize) -> Vec<(usize, f64)> {
        let mut indexed: Vec<(usize, f64)> = self.probs.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
        indexed.truncate(k);
        indexed
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.probs
    }
}

fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| {
            if v > best.1 { (i, v) } else { best }
        })
        .0
}

impl RandomForest {
    /// Predict the class label of one sample.
    ///
    /// Soft voting takes the argmax of the averaged distribution; hard
    /// voting takes the most frequent per-tree label. Ties go to the lower
    /// class index in both cases.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, ForestError> {
        match self.voting {
            Voting::Soft => Ok(self.averaged(sample)?.predicted_class()),
            Voting::Hard => {
                self.check_width(sample)?;
                let mut votes = vec![0usize; self.n_classes];
                for tree in &self.trees {
                    votes[tree.predict(sample)?] += 1;
                }
                let counts: Vec<f64> = votes.into_iter().map(|v| v as f64).collect();
                Ok(argmax(&counts))
            }
        }
    }

    /// Whether [`predict_proba`](Self::predict_proba) is available.
    #[must_use]
    pub fn supports_proba(&self) -> bool {
        self.voting == Voting::Soft
    }

    /// Class probabilities for one sample: the mean of the leaf
    /// distributions across all trees.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::ProbabilityUnsupported`] | the forest uses hard voting |
    /// | [`ForestError::PredictionFeatureMismatch`] | `sample.len() != n_features` |
    pub fn predict_proba(&self, sample: &[f64]) -> Result<ClassDistribution, ForestError> {
        if !self.supports_proba() {
            return Err(ForestError::ProbabilityUnsupported);
        }
        self.averaged(sample)
    }

    /// Predict labels for many samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns the first [`ForestError::PredictionFeatureMismatch`] encountered.
    pub fn predict_batch(&self, samples: &[Vec<f64>]) -> Result<Vec<usize>, ForestError> {
        samples
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Class probabilities for many samples in parallel.
    ///
    /// # Errors
    ///
    /// Same conditions as [`predict_proba`](Self::predict_proba).
    pub fn predict_proba_batch(
        &self,
        samples: &[Vec<f64>],
    ) -> Result<Vec<ClassDistribution>, ForestError> {
        samples
            .into_par_iter()
            .map(|sample| self.predict_proba(sample))
            .collect()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of classes seen during fitting (largest label + 1).
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    #[must_use]
    pub fn voting(&self) -> Voting {
        self.voting
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn check_width(&self, sample: &[f64]) -> Result<(), ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }

    fn averaged(&self, sample: &[f64]) -> Result<ClassDistribution, ForestError> {
        self.check_width(sample)?;
        let mut avg = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in avg.iter_mut().zip(tree.predict_proba(sample)?) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        avg.iter_mut().for_each(|v| *v /= n);
        Ok(ClassDistribution::new(avg))
    }
}
