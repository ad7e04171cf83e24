//! Feature-vector assembly.
//!
//! Layout: the ten numeric fields, then a 4-slot wilderness one-hot, then a
//! 40-slot soil one-hot. The result is fitted to the classifier's width by
//! [`reconcile`].

use serde::Serialize;
use tracing::warn;

use crate::input::{Field, InputVector, N_WILDERNESS};

/// Slots in the soil one-hot segment.
pub const N_SOIL: usize = 40;

/// Width of the full layout before reconciliation.
pub const DEFAULT_FEATURE_COUNT: usize = Field::ALL.len() + N_WILDERNESS + N_SOIL;

/// Soil slot derived from elevation: `floor(elevation / 100) mod 40`.
///
/// Placeholder only. Sites carry no soil survey data, so this picks a slot
/// deterministically from elevation to keep the segment populated. It does
/// not model any real soil classification.
#[must_use]
pub fn placeholder_soil_index(elevation: f64) -> usize {
    ((elevation / 100.0).floor() as i64).rem_euclid(N_SOIL as i64) as usize
}

/// Canonical column names for the default 54-wide layout.
#[must_use]
pub fn default_feature_names() -> Vec<String> {
    const BASE: [&str; 10] = [
        "Elevation",
        "Aspect",
        "Slope",
        "H_Dist_Hydro",
        "V_Dist_Hydro",
        "H_Dist_Roads",
        "Hillshade_9am",
        "Hillshade_Noon",
        "Hillshade_3pm",
        "H_Dist_Fire",
    ];
    BASE.iter()
        .map(|s| s.to_string())
        .chain((0..N_WILDERNESS).map(|i| format!("Wilderness_{i}")))
        .chain((0..N_SOIL).map(|i| format!("Soil_{i}")))
        .collect()
}

/// How a vector was fitted to its target width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LengthAdjustment {
    /// Lengths already matched.
    Exact,
    /// Trailing values were dropped.
    Truncated { dropped: usize },
    /// Zeros were appended.
    Padded { added: usize },
}

impl LengthAdjustment {
    #[must_use]
    pub fn is_exact(self) -> bool {
        self == LengthAdjustment::Exact
    }
}

/// Fit `values` to exactly `width` entries.
///
/// Longer inputs lose their tail; shorter inputs are right-padded with
/// zeros. This never fails, which means a layout that disagrees with the
/// classifier silently shifts or drops features. Every non-exact outcome is
/// logged at `warn` and returned so callers can surface it.
#[must_use]
pub fn reconcile(mut values: Vec<f64>, width: usize) -> (Vec<f64>, LengthAdjustment) {
    let len = values.len();
    let adjustment = if len > width {
        values.truncate(width);
        LengthAdjustment::Truncated { dropped: len - width }
    } else if len < width {
        values.resize(width, 0.0);
        LengthAdjustment::Padded { added: width - len }
    } else {
        LengthAdjustment::Exact
    };
    if !adjustment.is_exact() {
        warn!(from = len, to = width, ?adjustment, "feature vector length reconciled");
    }
    (values, adjustment)
}

/// Feature vector fitted to a classifier's input width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureArray {
    values: Vec<f64>,
    adjustment: LengthAdjustment,
}

impl FeatureArray {
    /// Wrap raw values, reconciling them to `width`.
    #[must_use]
    pub fn from_values(values: Vec<f64>, width: usize) -> Self {
        let (values, adjustment) = reconcile(values, width);
        Self { values, adjustment }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// How the assembled layout was fitted to the target width.
    #[must_use]
    pub fn adjustment(&self) -> LengthAdjustment {
        self.adjustment
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}

/// Builds [`FeatureArray`]s of a fixed width from [`InputVector`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureAssembler {
    width: usize,
}

impl Default for FeatureAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_FEATURE_COUNT)
    }
}

impl FeatureAssembler {
    /// Assembler targeting `width` features, normally the classifier's
    /// fitted feature count.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Concatenate numeric fields, wilderness one-hot and soil one-hot,
    /// then reconcile to [`width`](Self::width).
    #[must_use]
    pub fn assemble(&self, input: &InputVector) -> FeatureArray {
        let mut values = Vec::with_capacity(DEFAULT_FEATURE_COUNT);
        values.extend(input.numeric());
        values.extend(input.wilderness.one_hot());
        let mut soil = [0.0; N_SOIL];
        soil[placeholder_soil_index(input.elevation)] = 1.0;
        values.extend(soil);
        FeatureArray::from_values(values, self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Wilderness;

    fn soil_segment(array: &FeatureArray) -> &[f64] {
        &array.as_slice()[14..54]
    }

    #[test]
    fn soil_index_for_2800_is_28() {
        assert_eq!(placeholder_soil_index(2800.0), 28);
        let array = FeatureAssembler::default().assemble(&InputVector::default());
        let soil = soil_segment(&array);
        assert_eq!(soil[28], 1.0);
        assert_eq!(soil.iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn soil_index_wraps_at_forty() {
        assert_eq!(placeholder_soil_index(3900.0), 39);
        assert_eq!(placeholder_soil_index(4000.0), 0);
        assert_eq!(placeholder_soil_index(1899.9), 18);
    }

    #[test]
    fn layout_order() {
        let input = InputVector {
            wilderness: Wilderness::ComanchePeak,
            ..InputVector::default()
        };
        let array = FeatureAssembler::default().assemble(&input);
        assert_eq!(array.len(), DEFAULT_FEATURE_COUNT);
        assert_eq!(array.adjustment(), LengthAdjustment::Exact);
        assert_eq!(
            &array.as_slice()[..10],
            &[2800.0, 180.0, 14.0, 300.0, 30.0, 1200.0, 212.0, 220.0, 142.0, 1700.0]
        );
        assert_eq!(&array.as_slice()[10..14], &[0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn narrower_width_truncates_tail() {
        let array = FeatureAssembler::new(12).assemble(&InputVector::default());
        assert_eq!(array.len(), 12);
        assert_eq!(array.adjustment(), LengthAdjustment::Truncated { dropped: 42 });
        assert_eq!(array.as_slice()[10], 1.0);
    }

    #[test]
    fn wider_width_pads_with_zeros() {
        let array = FeatureAssembler::new(60).assemble(&InputVector::default());
        assert_eq!(array.len(), 60);
        assert_eq!(array.adjustment(), LengthAdjustment::Padded { added: 6 });
        assert!(array.as_slice()[54..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn length_always_matches_width() {
        for width in [0, 1, 10, 53, 54, 55, 100] {
            for elevation in [1800.0, 2450.0, 3900.0] {
                let input = InputVector::default().with(Field::Elevation, elevation);
                assert_eq!(FeatureAssembler::new(width).assemble(&input).len(), width);
            }
        }
    }

    #[test]
    fn reconcile_exact_is_untouched() {
        let (values, adjustment) = reconcile(vec![1.0, 2.0], 2);
        assert_eq!(values, vec![1.0, 2.0]);
        assert!(adjustment.is_exact());
    }

    #[test]
    fn default_names_match_layout() {
        let names = default_feature_names();
        assert_eq!(names.len(), DEFAULT_FEATURE_COUNT);
        assert_eq!(names[0], "Elevation");
        assert_eq!(names[9], "H_Dist_Fire");
        assert_eq!(names[13], "Wilderness_3");
        assert_eq!(names[53], "Soil_39");
    }
}
