//! Calibration results, solver seam and concatenation

pub mod merge;
pub mod result;
pub mod solver;

pub use merge::concatenate;
pub use result::{CalibrationModel, CalibrationResult};
pub use solver::{CalibrationSolver, OnePortStandards, SolSolver, TwoPortStandards};
