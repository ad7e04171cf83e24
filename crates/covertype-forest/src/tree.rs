use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::ForestError;
use crate::node::{Impurity, Node, NodeIndex};
use crate::split::{SplitContext, SplitCriterion};

/// Growth limits for a single tree, resolved and validated by the forest.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: usize,
}

/// A fitted CART decision tree.
///
/// Stored as an arena of [`Node`]s; the root is at index 0.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Grow a tree on pre-validated row-major data.
    ///
    /// `n_classes` fixes the leaf distribution width so every tree in a
    /// forest agrees even when a bootstrap sample misses a class.
    pub(crate) fn grow(
        params: TreeParams,
        rows: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        seed: u64,
    ) -> Self {
        let n_features = rows.first().map_or(0, Vec::len);
        let columns: Vec<Vec<f64>> = (0..n_features)
            .map(|f| rows.iter().map(|row| row[f]).collect())
            .collect();

        let mut builder = Builder {
            params,
            context: SplitContext {
                columns: &columns,
                labels,
                n_classes,
                criterion: params.criterion,
                max_features: params.max_features,
                min_samples_leaf: params.min_samples_leaf,
            },
            rng: ChaCha8Rng::seed_from_u64(seed),
            arena: Vec::new(),
        };
        let all: Vec<usize> = (0..rows.len()).collect();
        builder.build(&all, 0);

        trace!(n_nodes = builder.arena.len(), "tree grown");

        Self {
            nodes: builder.arena,
            n_features,
            n_classes,
        }
    }

    /// Majority class of the leaf the sample lands in.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when
    /// `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, ForestError> {
        match self.leaf_for(sample)? {
            Node::Leaf { prediction, .. } => Ok(*prediction),
            Node::Split { .. } => unreachable!("descent always ends at a leaf"),
        }
    }

    /// Class distribution of the leaf the sample lands in (length `n_classes`).
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when
    /// `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<&[f64], ForestError> {
        match self.leaf_for(sample)? {
            Node::Leaf { distribution, .. } => Ok(distribution),
            Node::Split { .. } => unreachable!("descent always ends at a leaf"),
        }
    }

    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Longest root-to-leaf path; a lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, d)) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { .. } => deepest = deepest.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((left.index(), d + 1));
                    stack.push((right.index(), d + 1));
                }
            }
        }
        deepest
    }

    /// Check the arena against the forest's widths.
    ///
    /// Children must sit after their parent and inside the arena, so a
    /// valid tree always descends to a leaf. Returns the first problem
    /// found as a message.
    pub(crate) fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_owned());
        }
        if self.n_features != n_features || self.n_classes != n_classes {
            return Err(format!(
                "tree is {} features x {} classes, forest is {n_features} x {n_classes}",
                self.n_features, self.n_classes
            ));
        }
        let len = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if feature.index() >= n_features {
                        return Err(format!(
                            "node {i} splits on feature {} of {n_features}",
                            feature.index()
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {i} has a NaN threshold"));
                    }
                    for child in [left.index(), right.index()] {
                        if child <= i || child >= len {
                            return Err(format!(
                                "node {i} points at child {child} in a {len}-node tree"
                            ));
                        }
                    }
                }
                Node::Leaf {
                    prediction,
                    distribution,
                    ..
                } => {
                    if *prediction >= n_classes {
                        return Err(format!(
                            "leaf {i} predicts class {prediction} of {n_classes}"
                        ));
                    }
                    if distribution.len() != n_classes {
                        return Err(format!(
                            "leaf {i} has {} probabilities for {n_classes} classes",
                            distribution.len()
                        ));
                    }
                    if distribution.iter().any(|p| !p.is_finite() || *p < 0.0) {
                        return Err(format!("leaf {i} has an invalid probability"));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_for(&self, sample: &[f64]) -> Result<&Node, ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                leaf @ Node::Leaf { .. } => return Ok(leaf),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}

struct Builder<'a> {
    params: TreeParams,
    context: SplitContext<'a>,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl Builder<'_> {
    fn build(&mut self, samples: &[usize], depth: usize) -> NodeIndex {
        let n_samples = samples.len();
        let mut counts = vec![0usize; self.context.n_classes];
        for &si in samples {
            counts[self.context.labels[si]] += 1;
        }
        let impurity = self.params.criterion.impurity(&counts, n_samples);

        let stop = n_samples < self.params.min_samples_split
            || impurity.value() == 0.0
            || self.params.max_depth.is_some_and(|max| depth >= max);
        let split = if stop {
            None
        } else {
            self.context.best_split(samples, &mut self.rng)
        };

        let Some(split) = split else {
            return self.push_leaf(&counts, impurity, n_samples);
        };

        // Reserve the slot so children get higher indices, then fill it in.
        let idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction: 0,
            distribution: Vec::new(),
            impurity,
            n_samples,
        });
        let left = self.build(&split.left_indices, depth + 1);
        let right = self.build(&split.right_indices, depth + 1);
        self.arena[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
        };
        NodeIndex::new(idx)
    }

    fn push_leaf(&mut self, counts: &[usize], impurity: Impurity, n_samples: usize) -> NodeIndex {
        let total = n_samples.max(1) as f64;
        let distribution = counts.iter().map(|&c| c as f64 / total).collect();
        // First index wins ties.
        let prediction = counts
            .iter()
            .enumerate()
            .fold((0, 0), |best, (i, &c)| if c > best.1 { (i, c) } else { best })
            .0;
        let idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction,
            distribution,
            impurity,
            n_samples,
        });
        NodeIndex::new(idx)
    }
}
