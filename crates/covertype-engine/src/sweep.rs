//! One-field sweeps and the chart series built from them.

use covertype_features::{CoverType, FeatureAssembler, Field, InputVector};
use serde::Serialize;
use tracing::debug;

use crate::EngineError;
use crate::engine::{InferenceEngine, PredictionResult};

/// Fields plotted by [`sensitivity_profile`].
pub const SENSITIVITY_FIELDS: [Field; 4] = [
    Field::Elevation,
    Field::Slope,
    Field::HorizontalDistanceToHydrology,
    Field::HorizontalDistanceToRoadways,
];

/// Largest number of grid points a [`SweepDomain`] may hold.
pub const MAX_SWEEP_POINTS: usize = 10_000;

/// Ascending grid `start, start + step, ...` up to and including `stop`
/// when `stop` lies on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepDomain {
    start: f64,
    stop: f64,
    step: f64,
    #[serde(skip)]
    n_points: usize,
}

/// Grid points for a validated range, or `None` above [`MAX_SWEEP_POINTS`].
fn point_count(start: f64, stop: f64, step: f64) -> Option<usize> {
    // Small slack so 2100 / 30 lands on 70 rather than 69.999...
    let intervals = ((stop - start) / step + 1e-9).floor();
    // Also false for an infinite quotient.
    if intervals < MAX_SWEEP_POINTS as f64 {
        Some(intervals as usize + 1)
    } else {
        None
    }
}

impl SweepDomain {
    /// # Errors
    ///
    /// [`EngineError::InvalidSweepDomain`] unless all three values are
    /// finite, `start <= stop`, `step > 0` and the grid holds at most
    /// [`MAX_SWEEP_POINTS`] values.
    pub fn new(start: f64, stop: f64, step: f64) -> Result<Self, EngineError> {
        let finite = start.is_finite() && stop.is_finite() && step.is_finite();
        if !finite || start > stop || step <= 0.0 {
            return Err(EngineError::InvalidSweepDomain { start, stop, step });
        }
        let n_points = point_count(start, stop, step)
            .ok_or(EngineError::InvalidSweepDomain { start, stop, step })?;
        Ok(Self {
            start,
            stop,
            step,
            n_points,
        })
    }

    /// The field's whole accepted range at its default step.
    #[must_use]
    pub fn full(field: Field) -> Self {
        let (start, stop) = field.range();
        let step = field.sweep_step();
        Self {
            start,
            stop,
            step,
            n_points: point_count(start, stop, step).unwrap_or(MAX_SWEEP_POINTS),
        }
    }

    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    #[must_use]
    pub fn stop(&self) -> f64 {
        self.stop
    }

    #[must_use]
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Number of grid points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n_points
    }

    /// A domain always holds at least `start`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_points == 0
    }

    /// The `i`-th grid value, computed without accumulating rounding error.
    #[must_use]
    pub fn value_at(&self, i: usize) -> f64 {
        self.start + i as f64 * self.step
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).map(|i| self.value_at(i))
    }
}

/// One sample of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    pub value: f64,
    pub prediction: PredictionResult,
}

/// Lazy sweep over a [`SweepDomain`], yielding one classification per value.
#[derive(Debug, Clone)]
pub struct Sweep<'a> {
    engine: &'a InferenceEngine,
    assembler: FeatureAssembler,
    base: InputVector,
    field: Field,
    domain: SweepDomain,
    next: usize,
    len: usize,
}

impl Iterator for Sweep<'_> {
    type Item = Result<SweepPoint, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let value = self.domain.value_at(self.next);
        self.next += 1;
        let input = self.base.with(self.field, value);
        let features = self.assembler.assemble(&input);
        Some(
            self.engine
                .classify(&features)
                .map(|prediction| SweepPoint { value, prediction }),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Sweep<'_> {}

/// Vary `field` across `domain` with every other input held at `base`.
///
/// Values are not validated against the field's range, so a sweep may run
/// outside it.
#[must_use]
pub fn sweep<'a>(
    engine: &'a InferenceEngine,
    assembler: &FeatureAssembler,
    base: &InputVector,
    field: Field,
    domain: SweepDomain,
) -> Sweep<'a> {
    debug!(field = field.name(), points = domain.len(), "sweep");
    Sweep {
        engine,
        assembler: *assembler,
        base: *base,
        field,
        domain,
        next: 0,
        len: domain.len(),
    }
}

/// `(elevation, predicted cover type)` over the full elevation range.
///
/// # Errors
///
/// The first classification failure.
pub fn class_scatter(
    engine: &InferenceEngine,
    assembler: &FeatureAssembler,
    base: &InputVector,
) -> Result<Vec<(f64, CoverType)>, EngineError> {
    let domain = SweepDomain::full(Field::Elevation);
    sweep(engine, assembler, base, Field::Elevation, domain)
        .map(|point| point.map(|p| (p.value, p.prediction.cover_type())))
        .collect()
}

/// Probability of one cover type along a single field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceCurve {
    pub field: Field,
    pub cover_type: CoverType,
    pub points: Vec<(f64, f64)>,
}

/// `(value, probability of cover)` for each value of `domain`.
///
/// # Errors
///
/// The first classification failure.
pub fn confidence_curve(
    engine: &InferenceEngine,
    assembler: &FeatureAssembler,
    base: &InputVector,
    field: Field,
    domain: SweepDomain,
    cover: CoverType,
) -> Result<ConfidenceCurve, EngineError> {
    let points = sweep(engine, assembler, base, field, domain)
        .map(|point| point.map(|p| (p.value, p.prediction.probability_of(cover))))
        .collect::<Result<_, _>>()?;
    Ok(ConfidenceCurve {
        field,
        cover_type: cover,
        points,
    })
}

/// Confidence curves of the base prediction's class across
/// [`SENSITIVITY_FIELDS`], each over its full range.
///
/// # Errors
///
/// The first classification failure.
pub fn sensitivity_profile(
    engine: &InferenceEngine,
    assembler: &FeatureAssembler,
    base: &InputVector,
) -> Result<Vec<ConfidenceCurve>, EngineError> {
    let cover = engine.classify(&assembler.assemble(base))?.cover_type();
    SENSITIVITY_FIELDS
        .into_iter()
        .map(|field| {
            confidence_curve(engine, assembler, base, field, SweepDomain::full(field), cover)
        })
        .collect()
}
