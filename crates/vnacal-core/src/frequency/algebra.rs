//! Set-like operations on frequency ranges
//!
//! Relationships are decided on the Hz interval `[start, stop]`, not on exact
//! point membership. Derived ranges keep the points of the operand they are
//! taken from, so no new frequency values are ever synthesized.
//!
//! The empty range is disjoint from every range and a subset of every range;
//! it is a superset only of another empty range.

use super::Frequency;
use crate::error::CalError;

/// Side that owns a point lying exactly on a split frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitSide {
    /// Low part gets `f <= split`, high part gets `f > split`
    Low,
    /// Low part gets `f < split`, high part gets `f >= split`
    High,
    /// Both parts get the boundary point
    Both,
}

impl Frequency {
    /// True when the two intervals do not touch
    pub fn is_disjoint_from(&self, other: &Frequency) -> bool {
        if self.is_empty() || other.is_empty() {
            return true;
        }
        self.stop() < other.start() || other.stop() < self.start()
    }

    /// Interval containment: `self.start >= other.start && self.stop <= other.stop`
    pub fn is_subset_of(&self, other: &Frequency) -> bool {
        if self.is_empty() {
            return true;
        }
        if other.is_empty() {
            return false;
        }
        self.start() >= other.start() && self.stop() <= other.stop()
    }

    /// `other.is_subset_of(self)`
    pub fn is_superset_of(&self, other: &Frequency) -> bool {
        other.is_subset_of(self)
    }

    /// True when `start <= f <= stop`
    pub fn contains(&self, f: f64) -> bool {
        !self.is_empty() && self.start() <= f && f <= self.stop()
    }

    /// Points up to `f` (`f` itself kept when `inclusive`)
    pub fn below(&self, f: f64, inclusive: bool) -> Frequency {
        let end = if inclusive {
            self.f.partition_point(|&x| x <= f)
        } else {
            self.f.partition_point(|&x| x < f)
        };
        self.derive(self.f[..end].to_vec())
    }

    /// Points from `f` on (`f` itself kept when `inclusive`)
    pub fn above(&self, f: f64, inclusive: bool) -> Frequency {
        let begin = if inclusive {
            self.f.partition_point(|&x| x < f)
        } else {
            self.f.partition_point(|&x| x <= f)
        };
        self.derive(self.f[begin..].to_vec())
    }

    /// Union of two touching or overlapping ranges
    ///
    /// If `self` covers `other` the result is `self`; if `other` covers `self`
    /// it is `other`. Otherwise `self` is extended with the points of `other`
    /// lying outside `self`'s interval. Disjoint ranges cannot be bridged and
    /// yield [`CalError::NonContiguousResult`].
    pub fn union(&self, other: &Frequency) -> Result<Frequency, CalError> {
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(other.with_unit(self.unit));
        }
        if self.is_disjoint_from(other) {
            return Err(CalError::NonContiguousResult { operation: "union" });
        }
        if self.is_superset_of(other) {
            return Ok(self.clone());
        }
        if self.is_subset_of(other) {
            return Ok(other.with_unit(self.unit));
        }

        let mut f = Vec::with_capacity(self.npoints() + other.npoints());
        f.extend_from_slice(other.below(self.start(), false).f());
        f.extend_from_slice(&self.f);
        f.extend_from_slice(other.above(self.stop(), false).f());
        Ok(self.derive(f))
    }

    /// Points inside the overlap interval, empty if none
    ///
    /// Mirrors [`Frequency::union`]: when one range lies inside the other the
    /// result is the inner range, whichever side it is on. Partial overlaps
    /// keep the points of `self`.
    pub fn intersection(&self, other: &Frequency) -> Frequency {
        if self.is_disjoint_from(other) {
            return self.derive(Vec::new());
        }
        if self.is_subset_of(other) {
            return self.clone();
        }
        if other.is_subset_of(self) {
            return other.with_unit(self.unit);
        }
        let lo = self.start().max(other.start());
        let hi = self.stop().min(other.stop());
        self.above(lo, true).below(hi, true)
    }

    /// Points of `self` inside `other`'s interval, whatever `other`'s grid
    pub fn within(&self, other: &Frequency) -> Frequency {
        if self.is_disjoint_from(other) {
            return self.derive(Vec::new());
        }
        self.above(other.start(), true).below(other.stop(), true)
    }

    /// Points of `self` outside `other`'s interval
    ///
    /// Fails with [`CalError::NonContiguousResult`] when `other` lies strictly
    /// inside `self` and would cut it in two.
    pub fn difference(&self, other: &Frequency) -> Result<Frequency, CalError> {
        if self.is_disjoint_from(other) {
            return Ok(self.clone());
        }
        let lower = self.below(other.start(), false);
        let upper = self.above(other.stop(), false);
        match (lower.is_empty(), upper.is_empty()) {
            (false, false) => Err(CalError::NonContiguousResult {
                operation: "difference",
            }),
            (false, true) => Ok(lower),
            _ => Ok(upper),
        }
    }

    /// Split at `f`, `side` deciding who owns a point exactly at `f`
    ///
    /// The low part followed by the high part always reproduces `self`
    /// (with the boundary point once, or twice for [`SplitSide::Both`]).
    pub fn split(&self, f: f64, side: SplitSide) -> (Frequency, Frequency) {
        let low = self.below(f, matches!(side, SplitSide::Low | SplitSide::Both));
        let high = self.above(f, matches!(side, SplitSide::High | SplitSide::Both));
        (low, high)
    }

    /// Clamp `f` into `[start, stop]`; `None` for an empty range
    pub fn coerce(&self, f: f64) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(f.clamp(self.start(), self.stop()))
    }

    /// Plain concatenation of point lists, `self` first
    ///
    /// Requires `self.stop < other.start` so the result stays strictly increasing.
    pub fn concatenated(&self, other: &Frequency) -> Result<Frequency, CalError> {
        if !self.is_empty() && !other.is_empty() && self.stop() >= other.start() {
            return Err(CalError::OverlappingRanges {
                low_stop: self.stop(),
                high_start: other.start(),
            });
        }
        let mut f = self.f.clone();
        f.extend_from_slice(other.f());
        Ok(self.derive(f))
    }

    fn derive(&self, f: Vec<f64>) -> Frequency {
        Frequency::from_sorted_hz(f, self.unit)
    }
}
