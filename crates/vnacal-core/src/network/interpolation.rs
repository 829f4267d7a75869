//! Frequency interpolation, cropping and grid alignment
//!
//! Measured data and ECal characterization data are generally sampled on
//! different grids; [`overlap`] brings a pair onto one common grid.

use ndarray::Array3;
use num_complex::Complex64;

use super::core::Network;
use crate::error::CalError;
use crate::frequency::Frequency;

impl Network {
    /// Interpolate S-parameters to a new frequency vector
    ///
    /// Uses linear interpolation in the complex domain.
    /// Points outside the network's own range are extrapolated.
    pub fn interpolate(&self, new_freq: &Frequency) -> Network {
        let old_f = self.frequency.f();
        let new_f = new_freq.f();
        let nports = self.nports();

        let s_new = Array3::from_shape_fn((new_f.len(), nports, nports), |(nfi, i, j)| {
            interpolate_complex(old_f, &self.s, i, j, new_f[nfi])
        });

        Network {
            frequency: new_freq.clone(),
            s: s_new,
            z0: self.z0.clone(),
            name: self.name.clone(),
        }
    }

    /// Crop network to a frequency range (in Hz)
    ///
    /// Returns a new network containing only points within [f_start, f_stop].
    pub fn cropped(&self, f_start: f64, f_stop: f64) -> Network {
        let f = self.frequency.f();
        let begin = f.partition_point(|&x| x < f_start);
        let end = f.partition_point(|&x| x <= f_stop).max(begin);

        Network {
            frequency: self.frequency.above(f_start, true).below(f_stop, true),
            s: self.s.slice(ndarray::s![begin..end, .., ..]).to_owned(),
            z0: self.z0.clone(),
            name: self.name.clone(),
        }
    }

    /// Crop network to the interval of another frequency range
    pub fn cropped_to(&self, range: &Frequency) -> Network {
        if range.is_empty() {
            return self.cropped(f64::INFINITY, f64::NEG_INFINITY);
        }
        self.cropped(range.start(), range.stop())
    }
}

/// Bring two networks onto their common frequency grid
///
/// Both are cropped to the overlap of their intervals. The first network's
/// grid wins: if the second was sampled elsewhere it is interpolated onto it.
/// An empty overlap is reported as [`CalError::EmptyResult`].
pub fn overlap(a: &Network, b: &Network) -> Result<(Network, Network), CalError> {
    if a.frequency.is_disjoint_from(&b.frequency) {
        return Err(CalError::EmptyResult("frequency overlap"));
    }
    let lo = a.frequency.start().max(b.frequency.start());
    let hi = a.frequency.stop().min(b.frequency.stop());

    let a_cropped = a.cropped(lo, hi);
    if a_cropped.nfreq() == 0 {
        return Err(CalError::EmptyResult("frequency overlap"));
    }

    let b_cropped = b.cropped(lo, hi);
    let b_aligned = if b_cropped.frequency == a_cropped.frequency {
        b_cropped
    } else {
        b.interpolate(&a_cropped.frequency)
    };

    Ok((a_cropped, b_aligned))
}

/// Linear interpolation for a single complex value
fn interpolate_complex(
    f_old: &[f64],
    s: &Array3<Complex64>,
    i: usize,
    j: usize,
    f_new: f64,
) -> Complex64 {
    let n = f_old.len();

    if n == 0 {
        return Complex64::new(0.0, 0.0);
    }

    if n == 1 {
        return s[[0, i, j]];
    }

    if f_new <= f_old[0] {
        let slope = (s[[1, i, j]] - s[[0, i, j]]) / Complex64::new(f_old[1] - f_old[0], 0.0);
        return s[[0, i, j]] + slope * Complex64::new(f_new - f_old[0], 0.0);
    }

    if f_new >= f_old[n - 1] {
        let slope = (s[[n - 1, i, j]] - s[[n - 2, i, j]])
            / Complex64::new(f_old[n - 1] - f_old[n - 2], 0.0);
        return s[[n - 1, i, j]] + slope * Complex64::new(f_new - f_old[n - 1], 0.0);
    }

    let idx = match f_old.partition_point(|&f| f < f_new) {
        0 => 0,
        i if i >= n => n - 2,
        i => i - 1,
    };

    let t = (f_new - f_old[idx]) / (f_old[idx + 1] - f_old[idx]);
    s[[idx, i, j]] * Complex64::new(1.0 - t, 0.0) + s[[idx + 1, i, j]] * Complex64::new(t, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::{FrequencyUnit, SweepType};
    use approx::assert_relative_eq;

    fn ramp(start: f64, stop: f64, npoints: usize) -> Network {
        let freq = Frequency::new(start, stop, npoints, FrequencyUnit::GHz, SweepType::Linear).unwrap();
        // S11 equals the frequency in GHz, which makes interpolation easy to check
        let s = Array3::from_shape_fn((npoints, 1, 1), |(f, _, _)| {
            Complex64::new(freq.f()[f] / 1e9, 0.0)
        });
        Network::from_s(freq, s)
    }

    #[test]
    fn test_crop() {
        let ntwk = ramp(1.0, 10.0, 10);
        let cropped = ntwk.cropped(3e9, 7e9);

        assert_eq!(cropped.nfreq(), 5);
        assert_eq!(cropped.frequency.start(), 3e9);
        assert_eq!(cropped.s[[0, 0, 0]].re, 3.0);
    }

    #[test]
    fn test_crop_outside_is_empty() {
        let ntwk = ramp(1.0, 10.0, 10);
        let cropped = ntwk.cropped(11e9, 12e9);
        assert_eq!(cropped.nfreq(), 0);
        assert!(cropped.frequency.is_empty());
    }

    #[test]
    fn test_interpolate_identity() {
        let ntwk = ramp(1.0, 5.0, 5);
        let interp = ntwk.interpolate(&ntwk.frequency.clone());

        assert_eq!(interp.nfreq(), 5);
        for f in 0..5 {
            assert_relative_eq!(interp.s[[f, 0, 0]].re, ntwk.s[[f, 0, 0]].re, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_overlap_aligns_grids() {
        let measured = ramp(2.0, 8.0, 13);
        let ideal = ramp(1.0, 5.0, 5);

        let (m, i) = overlap(&measured, &ideal).unwrap();

        assert_eq!(m.frequency.start(), 2e9);
        assert_eq!(m.frequency.stop(), 5e9);
        assert_eq!(m.frequency, i.frequency);
        for f in 0..m.nfreq() {
            assert_relative_eq!(i.s[[f, 0, 0]].re, m.f()[f] / 1e9, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_overlap_of_disjoint_networks_fails() {
        let a = ramp(1.0, 2.0, 3);
        let b = ramp(3.0, 4.0, 3);
        assert_eq!(
            overlap(&a, &b).unwrap_err(),
            CalError::EmptyResult("frequency overlap")
        );
    }
}
