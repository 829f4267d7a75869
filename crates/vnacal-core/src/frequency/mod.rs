//! Frequency module - represents a swept frequency range
//!
//! A [`Frequency`] is an ordered, strictly increasing list of sample points in Hz
//! plus a display unit. The unit is cosmetic: every comparison is done in Hz.
//! Set-like operations live in [`algebra`].

pub mod algebra;

pub use algebra::SplitSide;

use std::fmt;

use crate::error::CalError;

/// Frequency unit enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrequencyUnit {
    #[default]
    Hz,
    KHz,
    MHz,
    GHz,
    THz,
}

impl FrequencyUnit {
    /// Get the multiplier to convert to Hz
    pub fn multiplier(&self) -> f64 {
        match self {
            FrequencyUnit::Hz => 1.0,
            FrequencyUnit::KHz => 1e3,
            FrequencyUnit::MHz => 1e6,
            FrequencyUnit::GHz => 1e9,
            FrequencyUnit::THz => 1e12,
        }
    }

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hz" => Some(FrequencyUnit::Hz),
            "khz" => Some(FrequencyUnit::KHz),
            "mhz" => Some(FrequencyUnit::MHz),
            "ghz" => Some(FrequencyUnit::GHz),
            "thz" => Some(FrequencyUnit::THz),
            _ => None,
        }
    }

    /// Unit label as used in listings
    pub fn label(&self) -> &'static str {
        match self {
            FrequencyUnit::Hz => "Hz",
            FrequencyUnit::KHz => "kHz",
            FrequencyUnit::MHz => "MHz",
            FrequencyUnit::GHz => "GHz",
            FrequencyUnit::THz => "THz",
        }
    }
}

/// Sweep type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepType {
    #[default]
    Linear,
    Log,
}

/// A swept frequency range
///
/// Never mutated in place: every algebraic operation returns a new value.
/// The empty range is a valid value with no points.
#[derive(Debug, Clone, Default)]
pub struct Frequency {
    /// Frequency vector in Hz, strictly increasing
    f: Vec<f64>,
    /// Display unit
    unit: FrequencyUnit,
    /// Sweep type (linear or log)
    sweep_type: SweepType,
}

impl Frequency {
    /// Create a new Frequency with start/stop/npoints
    ///
    /// `npoints == 0` yields the empty range. The last point of a sweep is
    /// exactly `stop`, so ranges built from the same arguments are bit-identical.
    /// Fails with [`CalError::InvalidSweep`] unless the points come out finite
    /// and strictly increasing (`start < stop`, or a single point).
    ///
    /// # Example
    /// ```
    /// use vnacal_core::frequency::{Frequency, FrequencyUnit, SweepType};
    /// let freq = Frequency::new(1.0, 10.0, 10, FrequencyUnit::GHz, SweepType::Linear).unwrap();
    /// assert_eq!(freq.stop(), 10e9);
    /// assert!(Frequency::new(5.0, 1.0, 3, FrequencyUnit::GHz, SweepType::Linear).is_err());
    /// ```
    pub fn new(
        start: f64,
        stop: f64,
        npoints: usize,
        unit: FrequencyUnit,
        sweep_type: SweepType,
    ) -> Result<Self, CalError> {
        let mult = unit.multiplier();
        let start_hz = start * mult;
        let stop_hz = stop * mult;

        let f = match (npoints, sweep_type) {
            (0, _) => Vec::new(),
            (1, _) => vec![start_hz],
            (n, SweepType::Linear) => {
                let step = (stop_hz - start_hz) / (n - 1) as f64;
                let mut f: Vec<f64> = (0..n - 1).map(|i| start_hz + i as f64 * step).collect();
                f.push(stop_hz);
                f
            }
            (n, SweepType::Log) => {
                let log_start = start_hz.ln();
                let log_stop = stop_hz.ln();
                let log_step = (log_stop - log_start) / (n - 1) as f64;
                let mut f: Vec<f64> = (0..n - 1)
                    .map(|i| (log_start + i as f64 * log_step).exp())
                    .collect();
                f.push(stop_hz);
                f
            }
        };

        let increasing = f.windows(2).all(|w| w[0] < w[1]);
        if !increasing || f.iter().any(|x| !x.is_finite()) {
            return Err(CalError::InvalidSweep {
                start: start_hz,
                stop: stop_hz,
                npoints,
            });
        }

        Ok(Self {
            f,
            unit,
            sweep_type,
        })
    }

    /// Create from a frequency vector given in `unit`
    ///
    /// Fails unless the points are strictly increasing.
    pub fn from_f(f: Vec<f64>, unit: FrequencyUnit) -> Result<Self, CalError> {
        let mult = unit.multiplier();
        let f_hz: Vec<f64> = f.iter().map(|&x| x * mult).collect();
        if let Some(index) = f_hz.windows(2).position(|w| !(w[0] < w[1])) {
            return Err(CalError::UnorderedPoints { index: index + 1 });
        }
        Ok(Self::from_sorted_hz(f_hz, unit))
    }

    /// The empty range
    pub fn empty() -> Self {
        Self::default()
    }

    /// Internal constructor for points already known to be strictly increasing
    pub(crate) fn from_sorted_hz(f: Vec<f64>, unit: FrequencyUnit) -> Self {
        Self {
            f,
            unit,
            sweep_type: SweepType::Linear, // actual sweep type unknown
        }
    }

    /// Same points, different display unit
    pub fn with_unit(&self, unit: FrequencyUnit) -> Self {
        Self {
            f: self.f.clone(),
            unit,
            sweep_type: self.sweep_type,
        }
    }

    /// Get frequency vector in Hz
    #[inline]
    pub fn f(&self) -> &[f64] {
        &self.f
    }

    /// Get frequency vector in the current unit
    pub fn f_scaled(&self) -> Vec<f64> {
        let mult = self.unit.multiplier();
        self.f.iter().map(|&x| x / mult).collect()
    }

    /// Get the number of frequency points
    #[inline]
    pub fn npoints(&self) -> usize {
        self.f.len()
    }

    /// True when the range has no points
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.f.is_empty()
    }

    /// Get the start frequency in Hz (0 for an empty range)
    #[inline]
    pub fn start(&self) -> f64 {
        *self.f.first().unwrap_or(&0.0)
    }

    /// Get the stop frequency in Hz (0 for an empty range)
    #[inline]
    pub fn stop(&self) -> f64 {
        *self.f.last().unwrap_or(&0.0)
    }

    /// Get the center frequency in Hz, the mean of start and stop
    pub fn center(&self) -> f64 {
        (self.start() + self.stop()) / 2.0
    }

    /// Get the current unit
    #[inline]
    pub fn unit(&self) -> FrequencyUnit {
        self.unit
    }

    /// Get the sweep type
    #[inline]
    pub fn sweep_type(&self) -> SweepType {
        self.sweep_type
    }

    /// Get the frequency span in Hz
    #[inline]
    pub fn span(&self) -> f64 {
        self.stop() - self.start()
    }

    /// Get the multiplier for the current unit
    pub fn multiplier(&self) -> f64 {
        self.unit.multiplier()
    }
}

/// Two ranges are equal iff their point sequences are identical.
impl PartialEq for Frequency {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(fmt, "empty frequency range");
        }
        let mult = self.multiplier();
        write!(
            fmt,
            "{}-{} {}, {} pts",
            self.start() / mult,
            self.stop() / mult,
            self.unit.label(),
            self.npoints()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_create_linear_sweep() {
        let freq = Frequency::new(1.0, 10.0, 10, FrequencyUnit::GHz, SweepType::Linear).unwrap();

        assert_eq!(freq.npoints(), 10);
        assert_eq!(freq.start(), 1e9);
        assert_eq!(freq.stop(), 10e9);

        let f_scaled = freq.f_scaled();
        assert_relative_eq!(f_scaled[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(f_scaled[9], 10.0, epsilon = 1e-10);
    }

    #[test]
    fn test_create_log_sweep() {
        let freq = Frequency::new(1.0, 10.0, 10, FrequencyUnit::GHz, SweepType::Log).unwrap();

        assert_relative_eq!(freq.start(), 1e9, epsilon = 1.0);
        assert_eq!(freq.stop(), 10e9);

        // Ratio between adjacent points is constant
        let f = freq.f();
        let ratios: Vec<f64> = f.windows(2).map(|w| w[1] / w[0]).collect();
        for r in &ratios[1..] {
            assert_relative_eq!(*r, ratios[0], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_zero_points_is_empty() {
        let freq = Frequency::new(1.0, 10.0, 0, FrequencyUnit::GHz, SweepType::Linear).unwrap();
        assert!(freq.is_empty());
        assert_eq!(freq, Frequency::empty());
    }

    #[test]
    fn test_new_rejects_degenerate_sweeps() {
        let same = Frequency::new(2.0, 2.0, 3, FrequencyUnit::GHz, SweepType::Linear);
        assert!(matches!(same, Err(CalError::InvalidSweep { npoints: 3, .. })));

        let reversed = Frequency::new(5.0, 1.0, 3, FrequencyUnit::GHz, SweepType::Linear);
        assert!(matches!(reversed, Err(CalError::InvalidSweep { .. })));

        let log_from_zero = Frequency::new(0.0, 1.0, 3, FrequencyUnit::GHz, SweepType::Log);
        assert!(log_from_zero.is_err());

        // A single point needs no ordering
        let single = Frequency::new(2.0, 2.0, 1, FrequencyUnit::GHz, SweepType::Linear).unwrap();
        assert_eq!(single.f(), &[2e9]);
    }

    #[test]
    fn test_from_f() {
        let freq = Frequency::from_f(vec![1.0, 5.0, 200.0], FrequencyUnit::KHz).unwrap();

        assert_eq!(freq.npoints(), 3);
        assert_relative_eq!(freq.f()[0], 1e3, epsilon = 1e-10);
        assert_relative_eq!(freq.f()[1], 5e3, epsilon = 1e-10);
        assert_relative_eq!(freq.f()[2], 200e3, epsilon = 1e-10);
    }

    #[test]
    fn test_from_f_rejects_unordered_points() {
        let err = Frequency::from_f(vec![1.0, 3.0, 3.0], FrequencyUnit::GHz).unwrap_err();
        assert_eq!(err, CalError::UnorderedPoints { index: 2 });

        assert!(Frequency::from_f(vec![2.0, 1.0], FrequencyUnit::GHz).is_err());
    }

    #[test]
    fn test_equality_ignores_unit() {
        let a = Frequency::new(1.0, 2.0, 3, FrequencyUnit::GHz, SweepType::Linear).unwrap();
        let b = a.with_unit(FrequencyUnit::MHz);
        assert_eq!(a, b);
        assert_eq!(b.f_scaled()[2], 2000.0);
    }

    #[test]
    fn test_display() {
        let freq = Frequency::new(1.0, 26.5, 256, FrequencyUnit::GHz, SweepType::Linear).unwrap();
        assert_eq!(freq.to_string(), "1-26.5 GHz, 256 pts");
        assert_eq!(Frequency::empty().to_string(), "empty frequency range");
    }

    #[test]
    fn test_frequency_unit_from_str() {
        assert_eq!(FrequencyUnit::from_str("ghz"), Some(FrequencyUnit::GHz));
        assert_eq!(FrequencyUnit::from_str("GHZ"), Some(FrequencyUnit::GHz));
        assert_eq!(FrequencyUnit::from_str("MHz"), Some(FrequencyUnit::MHz));
        assert_eq!(FrequencyUnit::from_str("invalid"), None);
    }
}
