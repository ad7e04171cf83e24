//! Classifier artifact: forest, scaler and feature names, loaded from disk
//! or synthesized for demonstration.

use std::fs;
use std::path::{Path, PathBuf};

use covertype_features::{N_COVER_TYPES, default_feature_names};
use covertype_forest::{RandomForest, Voting};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::EngineError;
use crate::scaler::StandardScaler;
use crate::synthetic::SyntheticConfig;

/// Serialized forest file name.
pub const MODEL_FILE: &str = "forest_model.bin";
/// Fitted scaler file name.
pub const SCALER_FILE: &str = "forest_scaler.json";
/// JSON array of feature names.
pub const FEATURES_FILE: &str = "forest_features.json";

/// Locations of the three artifact files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub features: PathBuf,
}

impl ArtifactPaths {
    /// The standard file names inside `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join(MODEL_FILE),
            scaler: dir.join(SCALER_FILE),
            features: dir.join(FEATURES_FILE),
        }
    }

    fn all(&self) -> [&Path; 3] {
        [&self.model, &self.scaler, &self.features]
    }
}

impl Default for ArtifactPaths {
    /// The standard file names in the working directory.
    fn default() -> Self {
        Self::in_dir(".")
    }
}

/// Where an artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSource {
    Loaded,
    Synthetic,
}

/// A fitted forest with its scaler and feature names, all of one width.
#[derive(Debug, Clone)]
pub struct ClassifierArtifact {
    forest: RandomForest,
    scaler: StandardScaler,
    feature_names: Vec<String>,
    source: ArtifactSource,
}

impl ClassifierArtifact {
    /// Bundle the parts after checking they agree.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EngineError::Forest`] | the forest fails structural validation |
    /// | [`EngineError::InconsistentArtifact`] | forest, scaler and names disagree on width |
    /// | [`EngineError::TooManyClasses`] | the forest knows more than 7 classes |
    pub fn new(
        forest: RandomForest,
        scaler: StandardScaler,
        feature_names: Vec<String>,
        source: ArtifactSource,
    ) -> Result<Self, EngineError> {
        forest.validate()?;
        let model = forest.n_features();
        if scaler.n_features() != model || feature_names.len() != model {
            return Err(EngineError::InconsistentArtifact {
                model,
                scaler: scaler.n_features(),
                names: feature_names.len(),
            });
        }
        if forest.n_classes() > N_COVER_TYPES {
            return Err(EngineError::TooManyClasses {
                n_classes: forest.n_classes(),
            });
        }
        Ok(Self {
            forest,
            scaler,
            feature_names,
            source,
        })
    }

    /// Load all three files.
    ///
    /// # Errors
    ///
    /// Any read, decode or consistency failure.
    #[instrument(skip_all, fields(model = %paths.model.display()))]
    pub fn load(paths: &ArtifactPaths) -> Result<Self, EngineError> {
        let forest = RandomForest::load(&paths.model)?;
        let scaler: StandardScaler = read_json(&paths.scaler)?;
        let feature_names: Vec<String> = read_json(&paths.features)?;
        let artifact = Self::new(forest, scaler, feature_names, ArtifactSource::Loaded)?;
        info!(
            n_trees = artifact.forest.n_trees(),
            n_features = artifact.n_features(),
            n_classes = artifact.forest.n_classes(),
            "classifier artifact loaded"
        );
        Ok(artifact)
    }

    /// Load the artifact if all files exist, otherwise synthesize the
    /// default demonstration artifact.
    ///
    /// A partial set of files is ignored with a warning. Files that exist
    /// but fail to decode are reported as errors.
    ///
    /// # Errors
    ///
    /// Any failure from [`load`](Self::load) or [`synthesize`](Self::synthesize).
    pub fn load_or_synthesize(paths: &ArtifactPaths) -> Result<Self, EngineError> {
        let present: Vec<&Path> = paths.all().into_iter().filter(|p| p.exists()).collect();
        match present.len() {
            3 => Self::load(paths),
            0 => {
                info!("no classifier artifact found, synthesizing demonstration model");
                Self::synthesize(&SyntheticConfig::default())
            }
            _ => {
                warn!(
                    found = ?present,
                    "incomplete classifier artifact, synthesizing demonstration model"
                );
                Self::synthesize(&SyntheticConfig::default())
            }
        }
    }

    /// Fit a demonstration artifact from fixed-seed random data.
    ///
    /// See [`SyntheticConfig`] for the data recipe.
    ///
    /// # Errors
    ///
    /// Propagates scaler or forest fitting failures: zero samples or trees,
    /// or forest parameters rejected by the fit.
    #[instrument(skip_all, fields(n_samples = recipe.n_samples(), n_trees = recipe.n_trees(), seed = recipe.seed()))]
    pub fn synthesize(recipe: &SyntheticConfig) -> Result<Self, EngineError> {
        let (rows, labels) = recipe.generate();
        let scaler = StandardScaler::fit(&rows)?;
        let scaled = scaler.transform_all(&rows);
        let feature_names = default_feature_names();
        let forest = recipe
            .forest_config()?
            .fit(&scaled, &labels, &feature_names)?;
        info!(n_classes = forest.n_classes(), "demonstration artifact synthesized");
        Self::new(forest, scaler, feature_names, ArtifactSource::Synthetic)
    }

    /// Write all three files, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Any directory, encode or write failure.
    #[instrument(skip_all, fields(model = %paths.model.display()))]
    pub fn save(&self, paths: &ArtifactPaths) -> Result<(), EngineError> {
        for path in paths.all() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|source| EngineError::WriteFile {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        self.forest.save(&paths.model)?;
        write_json(&paths.scaler, "scaler", &self.scaler)?;
        write_json(&paths.features, "feature names", &self.feature_names)?;
        info!("classifier artifact saved");
        Ok(())
    }

    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    #[must_use]
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    #[must_use]
    pub fn source(&self) -> ArtifactSource {
        self.source
    }

    /// Input width shared by forest, scaler and feature list.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Whether the forest yields class probabilities.
    #[must_use]
    pub fn voting(&self) -> Voting {
        self.forest.voting()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, EngineError> {
    let text = fs::read_to_string(path).map_err(|source| EngineError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| EngineError::ParseJson {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    what: &'static str,
    value: &T,
) -> Result<(), EngineError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|source| EngineError::EncodeJson { what, source })?;
    fs::write(path, json).map_err(|source| EngineError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use covertype_forest::ForestError;
    use tempfile::TempDir;

    use super::*;

    fn tiny() -> ClassifierArtifact {
        ClassifierArtifact::synthesize(&SyntheticConfig::new(300, 5)).unwrap()
    }

    #[test]
    fn synthetic_artifact_is_consistent() {
        let artifact = tiny();
        assert_eq!(artifact.source(), ArtifactSource::Synthetic);
        assert_eq!(artifact.n_features(), 54);
        assert_eq!(artifact.forest().n_features(), 54);
        assert_eq!(artifact.scaler().n_features(), 54);
        assert!(artifact.forest().n_classes() <= N_COVER_TYPES);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path().join("model"));
        let artifact = tiny();
        artifact.save(&paths).unwrap();

        let loaded = ClassifierArtifact::load(&paths).unwrap();
        assert_eq!(loaded.source(), ArtifactSource::Loaded);
        assert_eq!(loaded.feature_names(), artifact.feature_names());
        assert_eq!(loaded.scaler(), artifact.scaler());
    }

    #[test]
    fn complete_set_is_loaded_not_synthesized() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        tiny().save(&paths).unwrap();
        let artifact = ClassifierArtifact::load_or_synthesize(&paths).unwrap();
        assert_eq!(artifact.source(), ArtifactSource::Loaded);
    }

    #[test]
    fn mismatched_feature_list_rejected() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        tiny().save(&paths).unwrap();
        fs::write(&paths.features, r#"["Elevation", "Aspect"]"#).unwrap();

        let err = ClassifierArtifact::load(&paths).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InconsistentArtifact { model: 54, scaler: 54, names: 2 }
        ));
    }

    #[test]
    fn corrupt_scaler_is_an_error() {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        tiny().save(&paths).unwrap();
        fs::write(&paths.scaler, "{ not json").unwrap();
        assert!(matches!(
            ClassifierArtifact::load_or_synthesize(&paths),
            Err(EngineError::ParseJson { .. })
        ));
    }

    #[test]
    fn forest_options_shape_the_synthetic_forest() {
        let recipe = SyntheticConfig::new(300, 4).with_max_depth(Some(2));
        let artifact = ClassifierArtifact::synthesize(&recipe).unwrap();
        assert_eq!(artifact.forest().n_trees(), 4);
        assert!(artifact.forest().trees().iter().all(|t| t.depth() <= 2));

        let bad_leaf = SyntheticConfig::new(300, 4).with_min_samples_leaf(0);
        assert!(matches!(
            ClassifierArtifact::synthesize(&bad_leaf),
            Err(EngineError::Forest(ForestError::InvalidMinSamplesLeaf { .. }))
        ));
    }

    #[test]
    fn default_paths_use_working_directory() {
        let paths = ArtifactPaths::default();
        assert_eq!(paths.model, Path::new(".").join(MODEL_FILE));
        assert_eq!(paths.features, Path::new(".").join(FEATURES_FILE));
    }
}
