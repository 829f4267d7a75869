//! Coverage crossover policy
//!
//! Decides how a measured sweep is divided between a "low" and a "high" ECal
//! module whose coverage ranges may overlap, touch, or be absent.
//!
//! The decision order matters. Soft limits and the single-source preferences
//! keep the wizard from placing a crossover in the middle of an overlap when
//! one module already covers the whole sweep and the other barely reaches
//! into it.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::CalError;
use crate::frequency::{Frequency, SplitSide};

/// Where responsibility passes from the low to the high module
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(from = "CrossoverRepr")]
pub enum CrossoverFrequency {
    /// Explicit frequency in Hz
    Hz(f64),
    /// Center of the part of the sweep both modules cover, kept within soft limits
    #[default]
    Center,
    /// Stop of the low module
    PreferLow,
    /// Start of the high module
    PreferHigh,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CrossoverRepr {
    Hz(f64),
    Named(NamedCrossover),
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum NamedCrossover {
    Center,
    PreferLow,
    PreferHigh,
}

impl From<CrossoverRepr> for CrossoverFrequency {
    fn from(repr: CrossoverRepr) -> Self {
        match repr {
            CrossoverRepr::Hz(hz) => CrossoverFrequency::Hz(hz),
            CrossoverRepr::Named(NamedCrossover::Center) => CrossoverFrequency::Center,
            CrossoverRepr::Named(NamedCrossover::PreferLow) => CrossoverFrequency::PreferLow,
            CrossoverRepr::Named(NamedCrossover::PreferHigh) => CrossoverFrequency::PreferHigh,
        }
    }
}

/// Whether one module should cover the whole sweep when it legally can
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingleSourcePreference {
    /// Always split at the crossover frequency
    None,
    /// Only the low module may act as single source
    OnlyLow,
    /// Only the high module may act as single source
    OnlyHigh,
    /// Either may; the high module wins a tie
    #[default]
    HighOverLow,
    /// Either may; the low module wins a tie
    LowOverHigh,
}

/// Per-point classification of the measured sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Coverage {
    all_covered: bool,
    all_below_soft_lo: bool,
    all_above_soft_hi: bool,
    all_below_crossover_in_low: bool,
    all_above_crossover_in_high: bool,
}

impl Coverage {
    fn classify(
        measured: &Frequency,
        low: &Frequency,
        high: &Frequency,
        soft: (f64, f64),
        crossover: f64,
    ) -> Self {
        let mut c = Coverage {
            all_covered: true,
            all_below_soft_lo: true,
            all_above_soft_hi: true,
            all_below_crossover_in_low: true,
            all_above_crossover_in_high: true,
        };
        for &f in measured.f() {
            let in_low = low.contains(f);
            let in_high = high.contains(f);
            c.all_covered &= in_low || in_high;
            c.all_below_soft_lo &= in_low && f <= soft.1;
            c.all_above_soft_hi &= in_high && f >= soft.0;
            c.all_below_crossover_in_low &= f <= low.stop() && f <= crossover;
            c.all_above_crossover_in_high &= f >= high.start() && f >= crossover;
        }
        c
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Low,
    High,
}

/// Policy for splitting a sweep between two ECal modules
///
/// Immutable once built; one policy can be reused for any number of splits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageCrossoverPolicy {
    crossover: CrossoverFrequency,
    single_source: SingleSourcePreference,
    soft_limits: Option<Frequency>,
}

impl CoverageCrossoverPolicy {
    pub fn new(
        crossover: CrossoverFrequency,
        single_source: SingleSourcePreference,
        soft_limits: Option<Frequency>,
    ) -> Self {
        Self {
            crossover,
            single_source,
            soft_limits,
        }
    }

    pub fn crossover(&self) -> CrossoverFrequency {
        self.crossover
    }

    pub fn single_source(&self) -> SingleSourcePreference {
        self.single_source
    }

    /// Window the crossover must fall in, as (start, stop) in Hz
    ///
    /// Defaults to `(high.start, low.stop)`, the region both modules cover.
    /// When the modules do not overlap this window is inverted.
    pub fn soft_limits(&self, low: &Frequency, high: &Frequency) -> (f64, f64) {
        match self.soft_limits.as_ref().filter(|s| !s.is_empty()) {
            Some(limits) => (limits.start(), limits.stop()),
            None => (high.start(), low.stop()),
        }
    }

    /// Resolve the configured crossover to an absolute frequency in Hz
    pub fn crossover_frequency(&self, measured: &Frequency, low: &Frequency, high: &Frequency) -> f64 {
        match self.crossover {
            CrossoverFrequency::Hz(hz) => hz,
            CrossoverFrequency::Center => {
                let overlap = measured.within(low).within(high);
                if overlap.is_empty() {
                    high.start()
                } else {
                    let (soft_start, soft_stop) = self.soft_limits(low, high);
                    overlap.center().max(soft_start).min(soft_stop)
                }
            }
            CrossoverFrequency::PreferLow => low.stop(),
            CrossoverFrequency::PreferHigh => high.start(),
        }
    }

    /// Split `measured` into the parts the low and high modules should cover
    ///
    /// An empty `low` or `high` range stands for an absent module. With
    /// `allow_incomplete` set, uncovered parts of the sweep are dropped instead
    /// of failing with [`CalError::IncompleteCoverage`]. Modules that do not
    /// touch each other and cannot jointly cover the sweep always fail with
    /// [`CalError::NonContiguousResult`].
    pub fn split_between_sources(
        &self,
        measured: &Frequency,
        low: &Frequency,
        high: &Frequency,
        allow_incomplete: bool,
    ) -> Result<(Frequency, Frequency), CalError> {
        let none = Frequency::empty().with_unit(measured.unit());
        if measured.is_empty() {
            return Ok((none.clone(), none));
        }

        match (low.is_empty(), high.is_empty()) {
            (true, true) if allow_incomplete => {
                warn!("No ECal coverage at all for {}", measured);
                return Ok((none.clone(), none));
            }
            (true, true) => return Err(incomplete(measured)),
            (true, false) => {
                return Ok((none, single_module(measured, high, allow_incomplete)?));
            }
            (false, true) => {
                return Ok((single_module(measured, low, allow_incomplete)?, none));
            }
            (false, false) => {}
        }

        let mut measured = measured.clone();
        if !jointly_covers(&measured, low, high) {
            if low.is_disjoint_from(high) {
                return Err(CalError::NonContiguousResult {
                    operation: "crossover split",
                });
            }
            if !allow_incomplete {
                return Err(incomplete(&measured));
            }
            measured = measured.within(&low.union(high)?);
            warn!("Sweep only partially covered, calibrating {}", measured);
            if measured.is_empty() {
                return Ok((none.clone(), none));
            }
        }

        let soft = self.soft_limits(low, high);
        let crossover = self.crossover_frequency(&measured, low, high);
        let coverage = Coverage::classify(&measured, low, high, soft, crossover);
        debug!(
            "Crossover at {} Hz, soft limits {} Hz to {} Hz, {:?}",
            crossover, soft.0, soft.1, coverage
        );

        if !coverage.all_covered && !allow_incomplete {
            return Err(incomplete(&measured));
        }

        let source = match (self.single_source, coverage.all_below_soft_lo, coverage.all_above_soft_hi) {
            (SingleSourcePreference::None, _, _) => None,
            (pref, true, false) if pref != SingleSourcePreference::OnlyHigh => Some(Source::Low),
            (pref, false, true) if pref != SingleSourcePreference::OnlyLow => Some(Source::High),
            (SingleSourcePreference::LowOverHigh | SingleSourcePreference::OnlyLow, true, true) => {
                Some(Source::Low)
            }
            (SingleSourcePreference::HighOverLow | SingleSourcePreference::OnlyHigh, true, true) => {
                Some(Source::High)
            }
            _ => None,
        };

        let parts = match source {
            Some(Source::Low) => (measured, none),
            Some(Source::High) => (none, measured),
            None if coverage.all_below_crossover_in_low => (measured, none),
            None if coverage.all_above_crossover_in_high => (none, measured),
            None => measured.split(crossover, SplitSide::Low),
        };
        let parts = (
            assigned_part(parts.0, low, allow_incomplete)?,
            assigned_part(parts.1, high, allow_incomplete)?,
        );
        debug!("Low module covers {}, high module covers {}", parts.0, parts.1);
        Ok(parts)
    }
}

/// A crossover outside a module's coverage hands it points it cannot measure
fn assigned_part(part: Frequency, module: &Frequency, allow_incomplete: bool) -> Result<Frequency, CalError> {
    if part.is_subset_of(module) {
        return Ok(part);
    }
    if !allow_incomplete {
        return Err(incomplete(&part));
    }
    let trimmed = part.within(module);
    warn!("Crossover assigns {} beyond module coverage {}, keeping {}", part, module, trimmed);
    Ok(trimmed)
}

/// Sweep covered by one module, or by both together when they touch
fn jointly_covers(measured: &Frequency, low: &Frequency, high: &Frequency) -> bool {
    measured.is_subset_of(low)
        || measured.is_subset_of(high)
        || low
            .union(high)
            .map(|envelope| measured.is_subset_of(&envelope))
            .unwrap_or(false)
}

fn single_module(
    measured: &Frequency,
    module: &Frequency,
    allow_incomplete: bool,
) -> Result<Frequency, CalError> {
    if measured.is_subset_of(module) {
        Ok(measured.clone())
    } else if allow_incomplete {
        warn!("Sweep {} only partially covered by {}", measured, module);
        Ok(measured.within(module))
    } else {
        Err(incomplete(measured))
    }
}

fn incomplete(measured: &Frequency) -> CalError {
    CalError::IncompleteCoverage {
        start: measured.start(),
        stop: measured.stop(),
    }
}
