use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Impurity measure used to score candidate splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// `1 - Σ p_i²`
    Gini,
    /// `-Σ p_i ln p_i`
    Entropy,
}

impl SplitCriterion {
    /// Impurity of a node with the given class counts. Empty nodes are pure.
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let value = match self {
            SplitCriterion::Gini => {
                1.0 - class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum::<f64>()
            }
            SplitCriterion::Entropy => -class_counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
        };
        Impurity::new(value)
    }
}

/// Best split found for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Inputs shared by every split search within one tree.
pub(crate) struct SplitContext<'a> {
    /// Column-major: `columns[feature][sample]`.
    pub(crate) columns: &'a [Vec<f64>],
    pub(crate) labels: &'a [usize],
    pub(crate) n_classes: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

impl SplitContext<'_> {
    /// Search a random subset of `max_features` columns for the threshold
    /// with the largest weighted impurity decrease.
    ///
    /// Returns `None` when every candidate column is constant over the node
    /// or every boundary would leave a child below `min_samples_leaf`.
    pub(crate) fn best_split(
        &self,
        sample_indices: &[usize],
        rng: &mut impl Rng,
    ) -> Option<SplitResult> {
        let n_features = self.columns.len();
        let n_samples = sample_indices.len();
        if n_samples < 2 || n_features == 0 {
            return None;
        }

        let mut parent_counts = vec![0usize; self.n_classes];
        for &si in sample_indices {
            parent_counts[self.labels[si]] += 1;
        }
        let parent = self.criterion.impurity(&parent_counts, n_samples).value();

        // Partial Fisher-Yates over the column ids.
        let mut order: Vec<usize> = (0..n_features).collect();
        let take = self.max_features.min(n_features);
        for i in 0..take {
            let j = rng.gen_range(i..n_features);
            order.swap(i, j);
        }

        let mut best_decrease = f64::NEG_INFINITY;
        let mut best: Option<(usize, f64)> = None;
        let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(n_samples);

        for &feature in &order[..take] {
            let column = &self.columns[feature];
            sorted.clear();
            sorted.extend(sample_indices.iter().map(|&si| (column[si], si)));
            sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = vec![0usize; self.n_classes];
            let mut right = parent_counts.clone();

            for i in 0..n_samples - 1 {
                let (value, si) = sorted[i];
                left[self.labels[si]] += 1;
                right[self.labels[si]] -= 1;

                let next = sorted[i + 1].0;
                if value == next {
                    continue;
                }
                let n_left = i + 1;
                let n_right = n_samples - n_left;
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let decrease = n_samples as f64 * parent
                    - n_left as f64 * self.criterion.impurity(&left, n_left).value()
                    - n_right as f64 * self.criterion.impurity(&right, n_right).value();
                if decrease > best_decrease {
                    best_decrease = decrease;
                    best = Some((feature, (value + next) / 2.0));
                }
            }
        }

        let (feature, threshold) = best?;
        let column = &self.columns[feature];
        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
            .iter()
            .copied()
            .partition(|&si| column[si] <= threshold);

        Some(SplitResult {
            feature: FeatureIndex::new(feature),
            threshold,
            left_indices,
            right_indices,
        })
    }
}
