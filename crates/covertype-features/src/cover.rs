//! Cover type catalogue and elevation zones.

use std::fmt;

use serde::Serialize;

use crate::FeatureError;

/// Number of cover type classes.
pub const N_COVER_TYPES: usize = 7;

/// Forest cover type, indexed 0..=6 in classifier output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverType {
    SpruceFir,
    LodgepolePine,
    PonderosaPine,
    CottonwoodWillow,
    Aspen,
    DouglasFir,
    Krummholz,
}

impl CoverType {
    /// All cover types in index order.
    pub const ALL: [CoverType; N_COVER_TYPES] = [
        CoverType::SpruceFir,
        CoverType::LodgepolePine,
        CoverType::PonderosaPine,
        CoverType::CottonwoodWillow,
        CoverType::Aspen,
        CoverType::DouglasFir,
        CoverType::Krummholz,
    ];

    /// Map a classifier label to a cover type.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::UnknownCoverType`] for indices outside 0..=6.
    pub fn from_index(index: usize) -> Result<Self, FeatureError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(FeatureError::UnknownCoverType { index })
    }

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            CoverType::SpruceFir => "Spruce/Fir",
            CoverType::LodgepolePine => "Lodgepole Pine",
            CoverType::PonderosaPine => "Ponderosa Pine",
            CoverType::CottonwoodWillow => "Cottonwood/Willow",
            CoverType::Aspen => "Aspen",
            CoverType::DouglasFir => "Douglas-fir",
            CoverType::Krummholz => "Krummholz",
        }
    }

    /// One-line ecological summary of where the cover type grows.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            CoverType::SpruceFir => "High elevation cold climate zones, typically above 8,000 ft",
            CoverType::LodgepolePine => "Most common forest type, broad elevation range",
            CoverType::PonderosaPine => "Lower elevation warm zones, fire-dependent ecosystem",
            CoverType::CottonwoodWillow => "Riparian zones near streams and rivers",
            CoverType::Aspen => "Mid-elevation mixed forests with aspen groves",
            CoverType::DouglasFir => "Moderate elevation well-drained slopes",
            CoverType::Krummholz => "Subalpine treeline, harsh wind-exposed ridges",
        }
    }
}

impl fmt::Display for CoverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Montane belt an elevation falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevationZone {
    /// [1800, 2200)
    LowMontane,
    /// [2200, 2800)
    MidMontane,
    /// [2800, 3200)
    UpperMontane,
    /// [3200, 3600)
    Subalpine,
    /// [3600, 3900]
    Alpine,
}

impl ElevationZone {
    pub const ALL: [ElevationZone; 5] = [
        ElevationZone::LowMontane,
        ElevationZone::MidMontane,
        ElevationZone::UpperMontane,
        ElevationZone::Subalpine,
        ElevationZone::Alpine,
    ];

    /// Zone containing `elevation`, or `None` outside 1800..=3900 m.
    #[must_use]
    pub fn for_elevation(elevation: f64) -> Option<Self> {
        if elevation == 3900.0 {
            return Some(ElevationZone::Alpine);
        }
        Self::ALL.into_iter().find(|zone| {
            let (lo, hi) = zone.bounds();
            lo <= elevation && elevation < hi
        })
    }

    /// Lower (inclusive) and upper bounds in metres.
    #[must_use]
    pub fn bounds(self) -> (f64, f64) {
        match self {
            ElevationZone::LowMontane => (1800.0, 2200.0),
            ElevationZone::MidMontane => (2200.0, 2800.0),
            ElevationZone::UpperMontane => (2800.0, 3200.0),
            ElevationZone::Subalpine => (3200.0, 3600.0),
            ElevationZone::Alpine => (3600.0, 3900.0),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ElevationZone::LowMontane => "Low Montane",
            ElevationZone::MidMontane => "Mid Montane",
            ElevationZone::UpperMontane => "Upper Montane",
            ElevationZone::Subalpine => "Subalpine",
            ElevationZone::Alpine => "Alpine",
        }
    }
}
