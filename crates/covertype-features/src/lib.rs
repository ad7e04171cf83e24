//! Site inputs and feature-vector assembly for cover type prediction.

mod assemble;
mod cover;
mod error;
mod input;

pub use assemble::{
    DEFAULT_FEATURE_COUNT, FeatureArray, FeatureAssembler, LengthAdjustment, N_SOIL,
    default_feature_names, placeholder_soil_index, reconcile,
};
pub use cover::{CoverType, ElevationZone, N_COVER_TYPES};
pub use error::FeatureError;
pub use input::{Field, InputVector, N_WILDERNESS, Wilderness};
