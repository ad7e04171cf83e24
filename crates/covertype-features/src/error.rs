/// Errors from parsing and validating site inputs.
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    /// Returned when a wilderness name is not one of the four known areas.
    #[error("unknown wilderness area \"{name}\": expected one of Rawah, Neota, Comanche Peak, Cache la Poudre")]
    UnknownWilderness {
        /// The rejected name.
        name: String,
    },

    /// Returned when a field name does not match any numeric input.
    #[error("unknown input field \"{name}\"")]
    UnknownField {
        /// The rejected name.
        name: String,
    },

    /// Returned when a class index is outside 0..=6.
    #[error("cover type index {index} is outside 0..=6")]
    UnknownCoverType {
        /// The rejected index.
        index: usize,
    },

    /// Returned when an input lies outside its documented range.
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// Returned when an input is NaN or infinite.
    #[error("{field} is not a finite number")]
    NonFinite {
        /// Name of the offending field.
        field: &'static str,
    },
}
