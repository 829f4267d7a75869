//! Core Network struct and constructors
//!
//! Contains the S-parameter sample set exchanged with instruments and solvers.

use ndarray::{Array1, Array3};
use num_complex::Complex64;

use crate::constants::DEFAULT_Z0;
use crate::frequency::Frequency;

/// An N-port electrical network
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    /// Frequency data
    pub frequency: Frequency,
    /// S-parameter data [nfreq, nports, nports]
    pub s: Array3<Complex64>,
    /// Reference impedance (per port)
    pub z0: Array1<Complex64>,
    /// Network name
    pub name: Option<String>,
}

impl Network {
    /// Create a new Network from S-parameters
    pub fn new(frequency: Frequency, s: Array3<Complex64>, z0: Array1<Complex64>) -> Self {
        Self {
            frequency,
            s,
            z0,
            name: None,
        }
    }

    /// Create a network with the default 50 ohm reference on every port
    pub fn from_s(frequency: Frequency, s: Array3<Complex64>) -> Self {
        let nports = s.shape()[1];
        let z0 = Array1::from_elem(nports, Complex64::new(DEFAULT_Z0, 0.0));
        Self::new(frequency, s, z0)
    }

    /// One-port network with the same reflection coefficient at every point
    pub fn constant_reflect(frequency: Frequency, gamma: Complex64) -> Self {
        let nfreq = frequency.npoints();
        Self::from_s(frequency, Array3::from_elem((nfreq, 1, 1), gamma))
    }

    /// Set the network name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Get the number of ports
    #[inline]
    pub fn nports(&self) -> usize {
        self.s.shape()[1]
    }

    /// Get the number of frequency points
    #[inline]
    pub fn nfreq(&self) -> usize {
        self.s.shape()[0]
    }

    /// Get frequency object
    pub fn frequency(&self) -> &Frequency {
        &self.frequency
    }

    /// Get frequency vector in Hz
    pub fn f(&self) -> &[f64] {
        self.frequency.f()
    }

    /// Get S-parameters
    pub fn s(&self) -> &Array3<Complex64> {
        &self.s
    }

    /// Single S-parameter trace S[i][j] over frequency (zero-based indices)
    pub fn s_trace(&self, i: usize, j: usize) -> Array1<Complex64> {
        self.s.slice(ndarray::s![.., i, j]).to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::{FrequencyUnit, SweepType};

    #[test]
    fn test_network_creation() {
        let freq = Frequency::new(1.0, 10.0, 10, FrequencyUnit::GHz, SweepType::Linear).unwrap();

        let s = Array3::<Complex64>::zeros((10, 2, 2));
        let ntwk = Network::from_s(freq, s);

        assert_eq!(ntwk.nports(), 2);
        assert_eq!(ntwk.nfreq(), 10);
        assert_eq!(ntwk.z0[0].re, 50.0);
    }

    #[test]
    fn test_constant_reflect_trace() {
        let freq = Frequency::new(1.0, 2.0, 3, FrequencyUnit::GHz, SweepType::Linear).unwrap();
        let ntwk = Network::constant_reflect(freq, Complex64::new(-1.0, 0.0)).named("short");

        assert_eq!(ntwk.nports(), 1);
        assert_eq!(ntwk.name.as_deref(), Some("short"));
        assert!(ntwk.s_trace(0, 0).iter().all(|&g| g == Complex64::new(-1.0, 0.0)));
    }
}
