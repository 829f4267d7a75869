//! vnacal-core: ECal calibration core for vector network analyzers
//!
//! Splits a VNA sweep between one or two electronic calibration modules,
//! collects the standards of each module, solves the error terms and joins the
//! partial calibrations into one that covers the whole sweep.
//!
//! ## Modules
//!
//! - `frequency` - Frequency grids and their set algebra
//! - `crossover` - Policy dividing a sweep between a low and a high module
//! - `network` - S-parameter data: crop, overlap, cascade, flip
//! - `instrument` - VNA and ECal interfaces
//! - `collector` - Standard collection and port orientation
//! - `calibration` - Calibration results, merging and the SOL solver
//! - `wizard` - Operator-guided one-port and two-port calibration
//! - `sim` - Simulated bench for tests and demos

pub mod adapter;
pub mod calibration;
pub mod collector;
pub mod config;
pub mod constants;
pub mod crossover;
pub mod error;
pub mod frequency;
pub mod instrument;
pub mod network;
pub mod prompt;
pub mod sim;
pub mod wizard;

pub use calibration::{CalibrationResult, CalibrationSolver};
pub use collector::CalibrationCollector;
pub use config::WizardConfig;
pub use crossover::CoverageCrossoverPolicy;
pub use error::CalError;
pub use frequency::Frequency;
pub use network::Network;
pub use wizard::CalWizard;
