//! Random forest ensemble used as the cover type classifier.
//!
//! CART trees grown on bootstrap samples in parallel, combined either by
//! averaging leaf distributions (soft voting) or by majority vote (hard
//! voting). Fitted forests persist to a versioned bincode file.

mod config;
mod error;
mod forest;
mod node;
mod predict;
mod serialize;
mod split;
mod tree;

pub use config::{ForestConfig, MaxFeatures, Voting};
pub use error::ForestError;
pub use forest::RandomForest;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use predict::ClassDistribution;
pub use split::SplitCriterion;
pub use tree::DecisionTree;
