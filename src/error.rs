//! Error type shared by the descriptors, datasets and rebinners.
//!
//! Per-bin data gaps are never errors; they show up as fill values with zero
//! weight in the output. Everything here aborts the whole call.

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RebinError {
    /// The requested destination range does not intersect the data.
    #[error("No data in interval [{start}, {end}) {units}: {reason}")]
    NoDataInInterval {
        start: f64,
        end: f64,
        units: String,
        reason: &'static str,
    },

    #[error("Degenerate axis: {0}")]
    DegenerateAxis(String),

    #[error("Dataset has {tables} tables but no y axis was given; y tags are ambiguous")]
    AmbiguousYTags { tables: usize },

    #[error("Dataset has no tables or no x samples")]
    EmptyDataSet,

    #[error("Shape mismatch in {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Tags must be strictly increasing: {what} at index {index}")]
    NonMonotonic { what: &'static str, index: usize },

    #[error("Units {from} are not convertible to {to}")]
    UnitMismatch { from: String, to: String },

    #[error("No plane named {0:?}")]
    UnknownPlane(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T, E = RebinError> = std::result::Result<T, E>;
