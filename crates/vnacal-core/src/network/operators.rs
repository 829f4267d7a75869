//! Network operations
//!
//! Provides the cascade, flip and reflect-pairing operations needed to build
//! calibration inputs.

use ndarray::{Array1, Array3};
use num_complex::Complex64;

use super::core::Network;

impl Network {
    /// Cascade with another network (self ** other)
    ///
    /// `self` must be a 2-port. Port 2 of self is connected to port 1 of
    /// `other`, which may be a 2-port or a 1-port termination. Both networks
    /// must share the frequency grid.
    pub fn cascade(&self, other: &Network) -> Option<Network> {
        if self.nports() != 2 || self.nfreq() != other.nfreq() {
            return None;
        }

        let nfreq = self.nfreq();
        let one = Complex64::new(1.0, 0.0);

        match other.nports() {
            1 => {
                let mut s_result = Array3::<Complex64>::zeros((nfreq, 1, 1));
                for f in 0..nfreq {
                    let gamma = other.s[[f, 0, 0]];
                    let denom = one - self.s[[f, 1, 1]] * gamma;
                    s_result[[f, 0, 0]] =
                        self.s[[f, 0, 0]] + self.s[[f, 0, 1]] * self.s[[f, 1, 0]] * gamma / denom;
                }
                Some(Network::new(
                    other.frequency.clone(),
                    s_result,
                    Array1::from_vec(vec![self.z0[0]]),
                ))
            }
            2 => {
                let mut s_result = Array3::<Complex64>::zeros((nfreq, 2, 2));
                for f in 0..nfreq {
                    let s_a = [
                        [self.s[[f, 0, 0]], self.s[[f, 0, 1]]],
                        [self.s[[f, 1, 0]], self.s[[f, 1, 1]]],
                    ];
                    let s_b = [
                        [other.s[[f, 0, 0]], other.s[[f, 0, 1]]],
                        [other.s[[f, 1, 0]], other.s[[f, 1, 1]]],
                    ];

                    // Signal flow graph reduction
                    let denom = one - s_a[1][1] * s_b[0][0];

                    s_result[[f, 0, 0]] = s_a[0][0] + (s_a[0][1] * s_a[1][0] * s_b[0][0]) / denom;
                    s_result[[f, 0, 1]] = (s_a[0][1] * s_b[0][1]) / denom;
                    s_result[[f, 1, 0]] = (s_a[1][0] * s_b[1][0]) / denom;
                    s_result[[f, 1, 1]] = s_b[1][1] + (s_b[0][1] * s_b[1][0] * s_a[1][1]) / denom;
                }
                Some(Network::new(
                    other.frequency.clone(),
                    s_result,
                    Array1::from_vec(vec![self.z0[0], other.z0[1]]),
                ))
            }
            _ => None,
        }
    }

    /// Flip the ports of a 2-port network (swap port 1 and port 2)
    pub fn flipped(&self) -> Option<Network> {
        if self.nports() != 2 {
            return None;
        }

        let nfreq = self.nfreq();
        let mut s_flipped = Array3::<Complex64>::zeros((nfreq, 2, 2));

        for f in 0..nfreq {
            // new[i,j] = old[1-i, 1-j]
            s_flipped[[f, 0, 0]] = self.s[[f, 1, 1]];
            s_flipped[[f, 0, 1]] = self.s[[f, 1, 0]];
            s_flipped[[f, 1, 0]] = self.s[[f, 0, 1]];
            s_flipped[[f, 1, 1]] = self.s[[f, 0, 0]];
        }

        let z0_flipped = Array1::from_vec(vec![self.z0[1], self.z0[0]]);

        Some(Network {
            frequency: self.frequency.clone(),
            s: s_flipped,
            z0: z0_flipped,
            name: self.name.clone(),
        })
    }
}

/// Combine two 1-ports into a 2-port with no transmission
///
/// `port1` becomes S11 and `port2` S22. This is the shape twelve-term
/// solvers expect for reflect standards measured one port at a time.
pub fn two_port_reflect(port1: &Network, port2: &Network) -> Option<Network> {
    if port1.nports() != 1 || port2.nports() != 1 || port1.nfreq() != port2.nfreq() {
        return None;
    }

    let nfreq = port1.nfreq();
    let mut s = Array3::<Complex64>::zeros((nfreq, 2, 2));
    for f in 0..nfreq {
        s[[f, 0, 0]] = port1.s[[f, 0, 0]];
        s[[f, 1, 1]] = port2.s[[f, 0, 0]];
    }

    Some(Network::new(
        port1.frequency.clone(),
        s,
        Array1::from_vec(vec![port1.z0[0], port2.z0[0]]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::{Frequency, FrequencyUnit, SweepType};
    use approx::assert_relative_eq;

    fn freq() -> Frequency {
        Frequency::new(1.0, 2.0, 3, FrequencyUnit::GHz, SweepType::Linear).unwrap()
    }

    fn two_port(s11: Complex64, s21: Complex64, s12: Complex64, s22: Complex64) -> Network {
        let mut s = Array3::<Complex64>::zeros((3, 2, 2));
        for f in 0..3 {
            s[[f, 0, 0]] = s11;
            s[[f, 1, 0]] = s21;
            s[[f, 0, 1]] = s12;
            s[[f, 1, 1]] = s22;
        }
        Network::from_s(freq(), s)
    }

    #[test]
    fn test_cascade_thru_with_load_is_transparent() {
        let thru = two_port(
            Complex64::new(0.0, 0.0),
            Complex64::new(1.0, 0.0),
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
        );
        let load = Network::constant_reflect(freq(), Complex64::new(0.3, -0.2));

        let result = thru.cascade(&load).unwrap();

        assert_eq!(result.nports(), 1);
        assert_relative_eq!(result.s[[1, 0, 0]].re, 0.3, epsilon = 1e-15);
        assert_relative_eq!(result.s[[1, 0, 0]].im, -0.2, epsilon = 1e-15);
    }

    #[test]
    fn test_cascade_line_rotates_reflection() {
        // Matched quarter-wave line: S21 = S12 = -j
        let line = two_port(
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, -1.0),
            Complex64::new(0.0, -1.0),
            Complex64::new(0.0, 0.0),
        );
        let short = Network::constant_reflect(freq(), Complex64::new(-1.0, 0.0));

        let result = line.cascade(&short).unwrap();
        assert_relative_eq!(result.s[[0, 0, 0]].re, 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_cascade_two_ports() {
        let a = two_port(
            Complex64::new(0.1, 0.0),
            Complex64::new(0.9, 0.0),
            Complex64::new(0.9, 0.0),
            Complex64::new(0.0, 0.0),
        );
        let thru = two_port(
            Complex64::new(0.0, 0.0),
            Complex64::new(1.0, 0.0),
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
        );

        let result = a.cascade(&thru).unwrap();
        assert_eq!(result.s, a.s);
    }

    #[test]
    fn test_cascade_rejects_mismatched_inputs() {
        let load = Network::constant_reflect(freq(), Complex64::new(0.0, 0.0));
        assert!(load.cascade(&load).is_none());
    }

    #[test]
    fn test_flipped() {
        let a = two_port(
            Complex64::new(0.1, 0.0),
            Complex64::new(0.5, 0.0),
            Complex64::new(0.4, 0.0),
            Complex64::new(0.2, 0.0),
        );
        let b = a.flipped().unwrap();

        assert_eq!(b.s[[0, 0, 0]].re, 0.2);
        assert_eq!(b.s[[0, 1, 0]].re, 0.4);
        assert_eq!(b.flipped().unwrap().s, a.s);
    }

    #[test]
    fn test_two_port_reflect() {
        let p1 = Network::constant_reflect(freq(), Complex64::new(1.0, 0.0));
        let p2 = Network::constant_reflect(freq(), Complex64::new(-1.0, 0.0));

        let ntwk = two_port_reflect(&p1, &p2).unwrap();

        assert_eq!(ntwk.nports(), 2);
        assert_eq!(ntwk.s[[2, 0, 0]].re, 1.0);
        assert_eq!(ntwk.s[[2, 1, 1]].re, -1.0);
        assert_eq!(ntwk.s[[2, 1, 0]].norm(), 0.0);
    }
}
