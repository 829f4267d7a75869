//! Error taxonomy for frequency algebra, crossover decisions and calibration merging
//!
//! Instrument collaborators report failures through `anyhow::Error`; everything the
//! core itself can reject is a [`CalError`].

use thiserror::Error;

/// Calibration core errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalError {
    /// The available ECal modules leave part of the measured range uncovered.
    #[error("frequency range {start} Hz to {stop} Hz is not fully covered by the available ECal modules")]
    IncompleteCoverage { start: f64, stop: f64 },

    /// An operation would have to return two disjoint pieces.
    #[error("{operation} would produce a non-contiguous frequency range")]
    NonContiguousResult { operation: &'static str },

    /// A requested sub-range is not contained in the current measurement range.
    #[error(
        "requested range {start} Hz to {stop} Hz extends beyond the measurement range {range_start} Hz to {range_stop} Hz"
    )]
    SubsetExtendsBeyondRange {
        start: f64,
        stop: f64,
        range_start: f64,
        range_stop: f64,
    },

    /// Concatenation of calibrations with different models or coefficient sets.
    #[error("cannot concatenate calibrations: {0}")]
    IncompatibleCalibrationTypes(String),

    /// Concatenated ranges overlap or are given in the wrong order.
    #[error("ranges overlap or are out of order: lower part stops at {low_stop} Hz, upper part starts at {high_start} Hz")]
    OverlappingRanges { low_stop: f64, high_start: f64 },

    /// A step that needs data ended up with no frequency points.
    #[error("{0} produced an empty result")]
    EmptyResult(&'static str),

    /// Frequency points are not strictly increasing.
    #[error("frequency points must be strictly increasing (violated at index {index})")]
    UnorderedPoints { index: usize },

    /// Sweep parameters that cannot produce strictly increasing points.
    #[error("cannot sweep {npoints} points from {start} Hz to {stop} Hz")]
    InvalidSweep { start: f64, stop: f64, npoints: usize },

    /// A coefficient array does not run parallel to its frequency range.
    #[error("coefficient '{name}' has {actual} points, expected {expected}")]
    CoefficientLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// VNA port without a mapping to an ECal port.
    #[error("VNA port {0} has no ECal port mapping")]
    UnknownVnaPort(usize),

    /// A standard exposed by the module carries no characterization data.
    #[error("standard 0x{id:04x} has no characterization data")]
    MissingStandardData { id: u16 },
}
