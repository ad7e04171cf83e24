//! Versioned bincode persistence for fitted forests.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::config::Voting;
use crate::error::ForestError;
use crate::forest::RandomForest;

/// Bumped whenever the on-disk layout changes.
const FORMAT_VERSION: u32 = 2;

#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    format_version: u32,
    n_trees: usize,
    n_features: usize,
    n_classes: usize,
    voting: Voting,
    forest: RandomForest,
}

impl ModelEnvelope {
    fn check(&self) -> Result<(), String> {
        let forest = &self.forest;
        let header = (self.n_trees, self.n_features, self.n_classes);
        let actual = (forest.trees.len(), forest.n_features, forest.n_classes);
        if header != actual {
            return Err(format!(
                "header says {header:?} trees/features/classes, forest has {actual:?}"
            ));
        }
        if self.voting != forest.voting {
            return Err(format!(
                "header says {:?} voting, forest has {:?}",
                self.voting, forest.voting
            ));
        }
        forest.validate().map_err(|err| err.to_string())
    }
}

impl RandomForest {
    /// Write the forest to `path` as a versioned bincode envelope.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::SerializeModel`] | bincode encoding failed |
    /// | [`ForestError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let path = path.as_ref();
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_trees: self.trees.len(),
            n_features: self.n_features,
            n_classes: self.n_classes,
            voting: self.voting,
            forest: self.clone(),
        };

        let bytes = bincode::serialize(&envelope)
            .map_err(|source| ForestError::SerializeModel { source })?;
        std::fs::write(path, &bytes).map_err(|source| ForestError::WriteModel {
            path: path.to_path_buf(),
            source,
        })?;

        info!(size_bytes = bytes.len(), n_trees = self.trees.len(), "forest saved");
        Ok(())
    }

    /// Read a forest written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::ReadModel`] | file read failed |
    /// | [`ForestError::DeserializeModel`] | bincode decoding failed |
    /// | [`ForestError::IncompatibleModelVersion`] | format version mismatch |
    /// | [`ForestError::CorruptModel`] | header disagrees with the forest, or the forest fails [`validate`](Self::validate) |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ForestError::ReadModel {
            path: path.to_path_buf(),
            source,
        })?;

        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|source| ForestError::DeserializeModel {
                path: path.to_path_buf(),
                source,
            })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(ForestError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        envelope
            .check()
            .map_err(|reason| ForestError::CorruptModel {
                path: path.to_path_buf(),
                reason,
            })?;

        debug!(
            n_trees = envelope.n_trees,
            n_features = envelope.n_features,
            n_classes = envelope.n_classes,
            voting = ?envelope.voting,
            "forest loaded"
        );
        Ok(envelope.forest)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use super::{FORMAT_VERSION, ModelEnvelope};
    use crate::config::{ForestConfig, Voting};
    use crate::error::ForestError;
    use crate::forest::RandomForest;
    use crate::node::{FeatureIndex, Impurity, Node, NodeIndex};
    use crate::tree::DecisionTree;

    fn small_forest(voting: Voting) -> RandomForest {
        let features = vec![
            vec![1900.0, 5.0],
            vec![2000.0, 7.0],
            vec![2100.0, 6.0],
            vec![3300.0, 20.0],
            vec![3400.0, 22.0],
            vec![3500.0, 21.0],
        ];
        let names = vec!["Elevation".to_string(), "Slope".to_string()];
        ForestConfig::new(5)
            .unwrap()
            .with_voting(voting)
            .fit(&features, &[0, 0, 0, 1, 1, 1], &names)
            .unwrap()
    }

    #[test]
    fn reload_preserves_predictions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("forest_model.bin");
        let forest = small_forest(Voting::Soft);
        forest.save(&path).unwrap();
        let loaded = RandomForest::load(&path).unwrap();

        for sample in [[1950.0, 6.0], [3450.0, 21.0], [2700.0, 12.0]] {
            assert_eq!(forest.predict(&sample).unwrap(), loaded.predict(&sample).unwrap());
            assert_eq!(
                forest.predict_proba(&sample).unwrap(),
                loaded.predict_proba(&sample).unwrap()
            );
        }
        assert_eq!(loaded.feature_names(), forest.feature_names());
    }

    #[test]
    fn reload_keeps_voting_mode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hard.bin");
        small_forest(Voting::Hard).save(&path).unwrap();
        assert_eq!(RandomForest::load(&path).unwrap().voting(), Voting::Hard);
    }

    #[test]
    fn missing_file_error() {
        let dir = TempDir::new().unwrap();
        let err = RandomForest::load(dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, ForestError::ReadModel { .. }));
    }

    #[test]
    fn corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, b"definitely not a forest").unwrap();
        let err = RandomForest::load(&path).unwrap_err();
        assert!(matches!(err, ForestError::DeserializeModel { .. }));
    }

    fn write_envelope(path: &Path, forest: RandomForest, n_trees: usize) {
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_trees,
            n_features: forest.n_features,
            n_classes: forest.n_classes,
            voting: forest.voting,
            forest,
        };
        std::fs::write(path, bincode::serialize(&envelope).unwrap()).unwrap();
    }

    fn leaf(prediction: usize, distribution: Vec<f64>) -> Node {
        Node::Leaf {
            prediction,
            distribution,
            impurity: Impurity::new(0.0),
            n_samples: 3,
        }
    }

    fn assert_corrupt(path: &Path) {
        let err = RandomForest::load(path).unwrap_err();
        assert!(matches!(err, ForestError::CorruptModel { .. }), "{err:?}");
    }

    #[test]
    fn forest_without_trees_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.bin");
        let mut forest = small_forest(Voting::Soft);
        forest.trees.clear();
        write_envelope(&path, forest, 0);
        assert_corrupt(&path);
    }

    #[test]
    fn dangling_child_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dangling.bin");
        let mut forest = small_forest(Voting::Soft);
        forest.trees = vec![DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: FeatureIndex::new(0),
                    threshold: 2700.0,
                    left: NodeIndex::new(1),
                    right: NodeIndex::new(5),
                    impurity: Impurity::new(0.5),
                    n_samples: 6,
                },
                leaf(0, vec![1.0, 0.0]),
            ],
            n_features: 2,
            n_classes: 2,
        }];
        write_envelope(&path, forest, 1);
        assert_corrupt(&path);
    }

    #[test]
    fn out_of_range_leaf_class_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stray_class.bin");
        let mut forest = small_forest(Voting::Hard);
        forest.trees = vec![DecisionTree {
            nodes: vec![leaf(4, vec![0.5, 0.5])],
            n_features: 2,
            n_classes: 2,
        }];
        write_envelope(&path, forest, 1);
        assert_corrupt(&path);
    }

    #[test]
    fn short_leaf_distribution_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short_leaf.bin");
        let mut forest = small_forest(Voting::Soft);
        forest.trees = vec![DecisionTree {
            nodes: vec![leaf(0, vec![1.0])],
            n_features: 2,
            n_classes: 2,
        }];
        write_envelope(&path, forest, 1);
        assert_corrupt(&path);
    }

    #[test]
    fn header_tree_count_must_match() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("header.bin");
        write_envelope(&path, small_forest(Voting::Soft), 9);
        let err = RandomForest::load(&path).unwrap_err();
        assert!(err.to_string().contains("header"), "{err}");
        assert!(matches!(err, ForestError::CorruptModel { .. }));
    }
}
