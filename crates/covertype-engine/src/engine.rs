//! Single-site inference over a loaded artifact.

use covertype_features::{
    CoverType, FeatureArray, FeatureAssembler, InputVector, LengthAdjustment, N_COVER_TYPES,
    reconcile,
};
use serde::Serialize;
use tracing::debug;

use crate::EngineError;
use crate::artifact::ClassifierArtifact;

/// Where a prediction's distribution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilitySource {
    /// Averaged leaf distributions from a soft-voting forest.
    Model,
    /// All mass on the predicted class; the forest has no probabilities.
    Degenerate,
}

/// One classification: the chosen cover type and a 7-way distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    cover_type: CoverType,
    probabilities: [f64; N_COVER_TYPES],
    probability_source: ProbabilitySource,
    adjustment: LengthAdjustment,
}

impl PredictionResult {
    #[must_use]
    pub fn cover_type(&self) -> CoverType {
        self.cover_type
    }

    /// Zero-based class label.
    #[must_use]
    pub fn label(&self) -> usize {
        self.cover_type.index()
    }

    /// Probability per cover type, indexed by label.
    #[must_use]
    pub fn probabilities(&self) -> &[f64; N_COVER_TYPES] {
        &self.probabilities
    }

    #[must_use]
    pub fn probability_of(&self, cover: CoverType) -> f64 {
        self.probabilities[cover.index()]
    }

    /// Probability assigned to the chosen cover type.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.probability_of(self.cover_type)
    }

    #[must_use]
    pub fn probability_source(&self) -> ProbabilitySource {
        self.probability_source
    }

    /// How the feature vector was fitted to the scaler width.
    #[must_use]
    pub fn adjustment(&self) -> LengthAdjustment {
        self.adjustment
    }

    /// The `k` most probable cover types, highest first, ties by label.
    #[must_use]
    pub fn top_k(&self, k: usize) -> Vec<(CoverType, f64)> {
        let mut ranked: Vec<(CoverType, f64)> = CoverType::ALL
            .iter()
            .map(|&c| (c, self.probabilities[c.index()]))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);
        ranked
    }
}

/// Scales, predicts and fills in a full distribution for feature vectors.
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    artifact: ClassifierArtifact,
}

impl InferenceEngine {
    #[must_use]
    pub fn new(artifact: ClassifierArtifact) -> Self {
        Self { artifact }
    }

    #[must_use]
    pub fn artifact(&self) -> &ClassifierArtifact {
        &self.artifact
    }

    /// Assembler matching this artifact's input width.
    #[must_use]
    pub fn assembler(&self) -> FeatureAssembler {
        FeatureAssembler::new(self.artifact.n_features())
    }

    /// Classify one feature vector.
    ///
    /// The vector is reconciled to the scaler width, standardized and
    /// passed to the forest. Forests without probability support yield a
    /// degenerate distribution with 1.0 on the predicted class. Shorter
    /// distributions are zero-padded to seven entries.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EngineError::UnknownClass`] | the forest predicts a label >= 7 |
    /// | [`EngineError::Forest`] | the forest rejects the scaled row |
    pub fn classify(&self, features: &FeatureArray) -> Result<PredictionResult, EngineError> {
        let scaler = self.artifact.scaler();
        let (row, reconciled) = reconcile(features.as_slice().to_vec(), scaler.n_features());
        let adjustment = if features.adjustment().is_exact() {
            reconciled
        } else {
            features.adjustment()
        };
        let scaled = scaler.transform(&row);

        let forest = self.artifact.forest();
        let label = forest.predict(&scaled)?;
        let cover_type =
            CoverType::from_index(label).map_err(|_| EngineError::UnknownClass { label })?;

        let mut probabilities = [0.0; N_COVER_TYPES];
        let probability_source = if forest.supports_proba() {
            let dist = forest.predict_proba(&scaled)?;
            for (slot, p) in probabilities.iter_mut().zip(dist.as_slice()) {
                *slot = *p;
            }
            ProbabilitySource::Model
        } else {
            probabilities[label] = 1.0;
            ProbabilitySource::Degenerate
        };

        debug!(
            cover_type = cover_type.name(),
            confidence = probabilities[label],
            ?probability_source,
            "classified"
        );
        Ok(PredictionResult {
            cover_type,
            probabilities,
            probability_source,
            adjustment,
        })
    }

    /// Validate, assemble and classify site inputs.
    ///
    /// # Errors
    ///
    /// [`EngineError::Feature`] for out-of-range inputs, otherwise as
    /// [`classify`](Self::classify).
    pub fn classify_input(&self, input: &InputVector) -> Result<PredictionResult, EngineError> {
        input.validate()?;
        self.classify(&self.assembler().assemble(input))
    }
}

#[cfg(test)]
mod tests {
    use covertype_features::{Field, Wilderness, default_feature_names};
    use covertype_forest::{ForestConfig, Voting};

    use super::*;
    use crate::artifact::ArtifactSource;
    use crate::scaler::StandardScaler;
    use crate::synthetic::SyntheticConfig;

    fn engine(voting: Voting) -> InferenceEngine {
        let recipe = SyntheticConfig::new(400, 8).with_voting(voting);
        InferenceEngine::new(ClassifierArtifact::synthesize(&recipe).unwrap())
    }

    #[test]
    fn distribution_is_complete() {
        let engine = engine(Voting::Soft);
        let result = engine.classify_input(&InputVector::default()).unwrap();
        assert!(result.label() < N_COVER_TYPES);
        assert_eq!(result.probabilities().len(), N_COVER_TYPES);
        assert!(result.probabilities().iter().all(|&p| p >= 0.0));
        let sum: f64 = result.probabilities().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum {sum}");
        assert_eq!(result.probability_source(), ProbabilitySource::Model);
    }

    #[test]
    fn hard_voting_gives_degenerate_distribution() {
        let engine = engine(Voting::Hard);
        let result = engine.classify_input(&InputVector::default()).unwrap();
        assert_eq!(result.probability_source(), ProbabilitySource::Degenerate);
        assert_eq!(result.confidence(), 1.0);
        assert_eq!(result.probabilities().iter().sum::<f64>(), 1.0);
        assert_eq!(
            result.probabilities().iter().filter(|&&p| p == 0.0).count(),
            N_COVER_TYPES - 1
        );
    }

    #[test]
    fn short_distribution_is_zero_padded() {
        let (rows, labels) = SyntheticConfig::new(400, 1).generate();
        let labels: Vec<usize> = labels.into_iter().map(|l| l.min(2)).collect();
        let scaler = StandardScaler::fit(&rows).unwrap();
        let names = default_feature_names();
        let forest = ForestConfig::new(8)
            .unwrap()
            .fit(&scaler.transform_all(&rows), &labels, &names)
            .unwrap();
        let artifact =
            ClassifierArtifact::new(forest, scaler, names, ArtifactSource::Synthetic).unwrap();
        let n_classes = artifact.forest().n_classes();
        assert_eq!(n_classes, 3);
        assert!(n_classes < N_COVER_TYPES);

        let engine = InferenceEngine::new(artifact);
        let result = engine.classify_input(&InputVector::default()).unwrap();
        assert_eq!(result.probability_source(), ProbabilitySource::Model);
        assert!(result.label() < n_classes);
        assert!(result.probabilities()[n_classes..].iter().all(|&p| p == 0.0));
        let sum: f64 = result.probabilities().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum {sum}");
    }

    #[test]
    fn classify_is_idempotent() {
        let engine = engine(Voting::Soft);
        let features = engine.assembler().assemble(&InputVector::default());
        assert_eq!(engine.classify(&features).unwrap(), engine.classify(&features).unwrap());
    }

    #[test]
    fn mismatched_vector_is_reconciled() {
        let engine = engine(Voting::Soft);
        let short = FeatureArray::from_values(vec![2800.0, 180.0, 14.0], 3);
        let result = engine.classify(&short).unwrap();
        assert_eq!(result.adjustment(), LengthAdjustment::Padded { added: 51 });

        let long = FeatureArray::from_values(vec![0.0; 60], 60);
        let result = engine.classify(&long).unwrap();
        assert_eq!(result.adjustment(), LengthAdjustment::Truncated { dropped: 6 });
    }

    #[test]
    fn out_of_range_input_fails_fast() {
        let engine = engine(Voting::Soft);
        let input = InputVector::default().with(Field::Slope, 90.0);
        assert!(matches!(engine.classify_input(&input), Err(EngineError::Feature(_))));
    }

    #[test]
    fn top_k_is_sorted() {
        let engine = engine(Voting::Soft);
        let input = InputVector {
            wilderness: Wilderness::Neota,
            ..InputVector::default()
        };
        let result = engine.classify_input(&input).unwrap();
        let top = result.top_k(3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].0, result.cover_type());
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
        assert_eq!(result.top_k(20).len(), N_COVER_TYPES);
    }

    #[test]
    fn result_serializes_with_snake_case_names() {
        let engine = engine(Voting::Hard);
        let result = engine.classify_input(&InputVector::default()).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["probability_source"], "degenerate");
        assert_eq!(json["adjustment"]["kind"], "exact");
        assert_eq!(json["probabilities"].as_array().unwrap().len(), 7);
    }
}
