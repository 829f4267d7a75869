//! Network module - N-port electrical network representation
//!
//! Provides the Network struct and the operations the calibration collector
//! needs: cropping, grid alignment, cascading adapters and pairing reflects.

mod core;
mod interpolation;
mod operators;

pub use core::Network;
pub use interpolation::overlap;
pub use operators::two_port_reflect;
