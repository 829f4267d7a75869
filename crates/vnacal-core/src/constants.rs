//! Numerical constants for calibration calculations
//!
//! Provides standardized tolerance values used throughout the library.

/// Tolerance for detecting near-zero values in division and singularity checks.
pub const NEAR_ZERO: f64 = 1e-15;

/// Tolerance for SVD solve in the least squares error-model fit.
pub const SVD_TOLERANCE: f64 = 1e-14;

/// Minimum number of reflect standards needed to fit a 3-term one-port model.
pub const MIN_REFLECT_STANDARDS: usize = 3;

/// Reference impedance assigned to networks built from raw instrument data.
pub const DEFAULT_Z0: f64 = 50.0;
