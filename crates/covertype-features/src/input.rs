//! Site measurements as collected from the user.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::FeatureError;

/// Number of wilderness areas.
pub const N_WILDERNESS: usize = 4;

/// Wilderness area of the Roosevelt National Forest a site lies in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Wilderness {
    #[default]
    Rawah,
    Neota,
    ComanchePeak,
    CacheLaPoudre,
}

impl Wilderness {
    /// All areas in one-hot order.
    pub const ALL: [Wilderness; N_WILDERNESS] = [
        Wilderness::Rawah,
        Wilderness::Neota,
        Wilderness::ComanchePeak,
        Wilderness::CacheLaPoudre,
    ];

    /// Position of this area's slot in the one-hot segment.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Wilderness::Rawah => "Rawah",
            Wilderness::Neota => "Neota",
            Wilderness::ComanchePeak => "Comanche Peak",
            Wilderness::CacheLaPoudre => "Cache la Poudre",
        }
    }

    /// Four-element one-hot encoding.
    #[must_use]
    pub fn one_hot(self) -> [f64; N_WILDERNESS] {
        let mut segment = [0.0; N_WILDERNESS];
        segment[self.index()] = 1.0;
        segment
    }
}

impl fmt::Display for Wilderness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Wilderness {
    type Err = FeatureError;

    /// Accepts display names or slugs, case-insensitively:
    /// `"Comanche Peak"`, `"comanche-peak"` and `"comanche_peak"` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_name(s);
        Self::ALL
            .into_iter()
            .find(|area| normalize_name(area.name()) == wanted)
            .ok_or_else(|| FeatureError::UnknownWilderness { name: s.to_string() })
    }
}

fn normalize_name(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| if c == '-' || c == '_' { ' ' } else { c.to_ascii_lowercase() })
        .collect()
}

/// One of the ten numeric site measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Elevation,
    Aspect,
    Slope,
    HorizontalDistanceToHydrology,
    VerticalDistanceToHydrology,
    HorizontalDistanceToRoadways,
    Hillshade9am,
    HillshadeNoon,
    Hillshade3pm,
    HorizontalDistanceToFirePoints,
}

impl Field {
    /// Fields in feature-vector order.
    pub const ALL: [Field; 10] = [
        Field::Elevation,
        Field::Aspect,
        Field::Slope,
        Field::HorizontalDistanceToHydrology,
        Field::VerticalDistanceToHydrology,
        Field::HorizontalDistanceToRoadways,
        Field::Hillshade9am,
        Field::HillshadeNoon,
        Field::Hillshade3pm,
        Field::HorizontalDistanceToFirePoints,
    ];

    /// Stable snake_case name, accepted back by [`FromStr`].
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Field::Elevation => "elevation",
            Field::Aspect => "aspect",
            Field::Slope => "slope",
            Field::HorizontalDistanceToHydrology => "h_hydro",
            Field::VerticalDistanceToHydrology => "v_hydro",
            Field::HorizontalDistanceToRoadways => "h_roads",
            Field::Hillshade9am => "hillshade_9am",
            Field::HillshadeNoon => "hillshade_noon",
            Field::Hillshade3pm => "hillshade_3pm",
            Field::HorizontalDistanceToFirePoints => "h_fire",
        }
    }

    /// Inclusive `(min, max)` accepted for this field.
    #[must_use]
    pub fn range(self) -> (f64, f64) {
        match self {
            Field::Elevation => (1800.0, 3900.0),
            Field::Aspect => (0.0, 360.0),
            Field::Slope => (0.0, 52.0),
            Field::HorizontalDistanceToHydrology => (0.0, 1400.0),
            Field::VerticalDistanceToHydrology => (-150.0, 600.0),
            Field::HorizontalDistanceToRoadways | Field::HorizontalDistanceToFirePoints => {
                (0.0, 7000.0)
            }
            Field::Hillshade9am | Field::HillshadeNoon | Field::Hillshade3pm => (0.0, 254.0),
        }
    }

    /// Value used when the user supplies nothing.
    #[must_use]
    pub fn default_value(self) -> f64 {
        match self {
            Field::Elevation => 2800.0,
            Field::Aspect => 180.0,
            Field::Slope => 14.0,
            Field::HorizontalDistanceToHydrology => 300.0,
            Field::VerticalDistanceToHydrology => 30.0,
            Field::HorizontalDistanceToRoadways => 1200.0,
            Field::Hillshade9am => 212.0,
            Field::HillshadeNoon => 220.0,
            Field::Hillshade3pm => 142.0,
            Field::HorizontalDistanceToFirePoints => 1700.0,
        }
    }

    /// Grid spacing used when sweeping this field over its range.
    #[must_use]
    pub fn sweep_step(self) -> f64 {
        match self {
            Field::Elevation => 30.0,
            Field::Aspect => 10.0,
            Field::Slope => 1.0,
            Field::HorizontalDistanceToHydrology => 20.0,
            Field::VerticalDistanceToHydrology => 10.0,
            Field::HorizontalDistanceToRoadways | Field::HorizontalDistanceToFirePoints => 100.0,
            Field::Hillshade9am | Field::HillshadeNoon | Field::Hillshade3pm => 5.0,
        }
    }

    /// Min-max scale `value` onto [0, 1] using this field's range.
    #[must_use]
    pub fn normalize(self, value: f64) -> f64 {
        let (min, max) = self.range();
        (value - min) / (max - min)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|field| field.name() == wanted)
            .ok_or_else(|| FeatureError::UnknownField { name: s.to_string() })
    }
}

/// Measurements for one site, as entered for one request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InputVector {
    pub elevation: f64,
    pub aspect: f64,
    pub slope: f64,
    pub h_hydro: f64,
    pub v_hydro: f64,
    pub h_roads: f64,
    pub hillshade_9am: f64,
    pub hillshade_noon: f64,
    pub hillshade_3pm: f64,
    pub h_fire: f64,
    pub wilderness: Wilderness,
}

impl Default for InputVector {
    fn default() -> Self {
        let mut input = Self {
            elevation: 0.0,
            aspect: 0.0,
            slope: 0.0,
            h_hydro: 0.0,
            v_hydro: 0.0,
            h_roads: 0.0,
            hillshade_9am: 0.0,
            hillshade_noon: 0.0,
            hillshade_3pm: 0.0,
            h_fire: 0.0,
            wilderness: Wilderness::default(),
        };
        for field in Field::ALL {
            *input.slot(field) = field.default_value();
        }
        input
    }
}

impl InputVector {
    /// Current value of a numeric field.
    #[must_use]
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Elevation => self.elevation,
            Field::Aspect => self.aspect,
            Field::Slope => self.slope,
            Field::HorizontalDistanceToHydrology => self.h_hydro,
            Field::VerticalDistanceToHydrology => self.v_hydro,
            Field::HorizontalDistanceToRoadways => self.h_roads,
            Field::Hillshade9am => self.hillshade_9am,
            Field::HillshadeNoon => self.hillshade_noon,
            Field::Hillshade3pm => self.hillshade_3pm,
            Field::HorizontalDistanceToFirePoints => self.h_fire,
        }
    }

    /// Copy of `self` with one field replaced.
    #[must_use]
    pub fn with(mut self, field: Field, value: f64) -> Self {
        *self.slot(field) = value;
        self
    }

    /// The ten numeric measurements in feature-vector order.
    #[must_use]
    pub fn numeric(&self) -> [f64; 10] {
        Field::ALL.map(|field| self.get(field))
    }

    /// Check every field against its documented range.
    ///
    /// # Errors
    ///
    /// Returns the first [`FeatureError::NonFinite`] or
    /// [`FeatureError::OutOfRange`] found, in feature-vector order.
    pub fn validate(&self) -> Result<(), FeatureError> {
        for field in Field::ALL {
            let value = self.get(field);
            if !value.is_finite() {
                return Err(FeatureError::NonFinite { field: field.name() });
            }
            let (min, max) = field.range();
            if value < min || value > max {
                return Err(FeatureError::OutOfRange {
                    field: field.name(),
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    /// Each numeric field min-max scaled onto [0, 1], for intensity displays.
    #[must_use]
    pub fn intensity(&self) -> Vec<(Field, f64)> {
        Field::ALL
            .into_iter()
            .map(|field| (field, field.normalize(self.get(field))))
            .collect()
    }

    fn slot(&mut self, field: Field) -> &mut f64 {
        match field {
            Field::Elevation => &mut self.elevation,
            Field::Aspect => &mut self.aspect,
            Field::Slope => &mut self.slope,
            Field::HorizontalDistanceToHydrology => &mut self.h_hydro,
            Field::VerticalDistanceToHydrology => &mut self.v_hydro,
            Field::HorizontalDistanceToRoadways => &mut self.h_roads,
            Field::Hillshade9am => &mut self.hillshade_9am,
            Field::HillshadeNoon => &mut self.hillshade_noon,
            Field::Hillshade3pm => &mut self.hillshade_3pm,
            Field::HorizontalDistanceToFirePoints => &mut self.h_fire,
        }
    }
}
