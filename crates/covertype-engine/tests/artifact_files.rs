//! Artifact persistence and the load-or-synthesize fallback.

use std::fs;

use tempfile::TempDir;

use covertype_engine::{
    ArtifactPaths, ArtifactSource, ClassifierArtifact, EngineError, InferenceEngine,
    ProbabilitySource, SyntheticConfig,
};
use covertype_features::{Field, InputVector};
use covertype_forest::Voting;

fn small(voting: Voting) -> ClassifierArtifact {
    ClassifierArtifact::synthesize(&SyntheticConfig::new(400, 6).with_voting(voting)).unwrap()
}

#[test]
fn reloaded_artifact_predicts_identically() {
    let dir = TempDir::new().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    let original = InferenceEngine::new(small(Voting::Soft));
    original.artifact().save(&paths).unwrap();
    let reloaded = InferenceEngine::new(ClassifierArtifact::load_or_synthesize(&paths).unwrap());
    assert_eq!(reloaded.artifact().source(), ArtifactSource::Loaded);

    for elevation in [1800.0, 2400.0, 2800.0, 3300.0, 3900.0] {
        let input = InputVector::default().with(Field::Elevation, elevation);
        assert_eq!(
            original.classify_input(&input).unwrap(),
            reloaded.classify_input(&input).unwrap()
        );
    }
}

#[test]
fn partial_set_falls_back_to_synthesis() {
    let dir = TempDir::new().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    small(Voting::Soft).save(&paths).unwrap();
    fs::remove_file(&paths.scaler).unwrap();

    let artifact = ClassifierArtifact::load_or_synthesize(&paths).unwrap();
    assert_eq!(artifact.source(), ArtifactSource::Synthetic);
    assert_eq!(artifact.forest().n_trees(), 50);
}

#[test]
fn inconsistent_scaler_is_rejected() {
    let dir = TempDir::new().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    small(Voting::Soft).save(&paths).unwrap();
    fs::write(&paths.scaler, r#"{"mean":[0.0,0.0],"scale":[1.0,1.0]}"#).unwrap();

    assert!(matches!(
        ClassifierArtifact::load_or_synthesize(&paths),
        Err(EngineError::InconsistentArtifact { model: 54, scaler: 2, names: 54 })
    ));
}

#[test]
fn corrupt_model_is_an_error() {
    let dir = TempDir::new().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    small(Voting::Soft).save(&paths).unwrap();
    fs::write(&paths.model, b"not a forest").unwrap();
    assert!(matches!(
        ClassifierArtifact::load(&paths),
        Err(EngineError::Forest(_))
    ));
}

#[test]
fn hard_voting_artifact_survives_reload() {
    let dir = TempDir::new().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    small(Voting::Hard).save(&paths).unwrap();

    let engine = InferenceEngine::new(ClassifierArtifact::load(&paths).unwrap());
    assert_eq!(engine.artifact().voting(), Voting::Hard);
    let result = engine.classify_input(&InputVector::default()).unwrap();
    assert_eq!(result.probability_source(), ProbabilitySource::Degenerate);
    assert_eq!(result.probabilities().iter().sum::<f64>(), 1.0);
    assert_eq!(result.confidence(), 1.0);
}
