//! Calibration coefficient sets
//!
//! A [`CalibrationResult`] holds named complex coefficient arrays running in
//! parallel with a frequency range.

use std::collections::BTreeMap;
use std::fmt;

use ndarray::Array1;
use num_complex::Complex64;

use crate::error::CalError;
use crate::frequency::Frequency;

/// Error model a calibration was fitted with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationModel {
    /// 3-term one-port model
    OnePort,
    /// Full two-port twelve-term model
    TwelveTerm,
}

impl CalibrationModel {
    /// Coefficient names produced by the reference solver for this model
    pub fn term_names(&self) -> &'static [&'static str] {
        match self {
            CalibrationModel::OnePort => &ONE_PORT_TERMS,
            CalibrationModel::TwelveTerm => &TWELVE_TERMS,
        }
    }
}

impl fmt::Display for CalibrationModel {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationModel::OnePort => write!(fmt, "one-port"),
            CalibrationModel::TwelveTerm => write!(fmt, "twelve-term"),
        }
    }
}

pub const DIRECTIVITY: &str = "directivity";
pub const SOURCE_MATCH: &str = "source match";
pub const REFLECTION_TRACKING: &str = "reflection tracking";

pub const ONE_PORT_TERMS: [&str; 3] = [DIRECTIVITY, SOURCE_MATCH, REFLECTION_TRACKING];

pub const FORWARD_DIRECTIVITY: &str = "forward directivity";
pub const FORWARD_SOURCE_MATCH: &str = "forward source match";
pub const FORWARD_REFLECTION_TRACKING: &str = "forward reflection tracking";
pub const FORWARD_LOAD_MATCH: &str = "forward load match";
pub const FORWARD_TRANSMISSION_TRACKING: &str = "forward transmission tracking";
pub const FORWARD_ISOLATION: &str = "forward isolation";
pub const REVERSE_DIRECTIVITY: &str = "reverse directivity";
pub const REVERSE_SOURCE_MATCH: &str = "reverse source match";
pub const REVERSE_REFLECTION_TRACKING: &str = "reverse reflection tracking";
pub const REVERSE_LOAD_MATCH: &str = "reverse load match";
pub const REVERSE_TRANSMISSION_TRACKING: &str = "reverse transmission tracking";
pub const REVERSE_ISOLATION: &str = "reverse isolation";

pub const TWELVE_TERMS: [&str; 12] = [
    FORWARD_DIRECTIVITY,
    FORWARD_SOURCE_MATCH,
    FORWARD_REFLECTION_TRACKING,
    FORWARD_LOAD_MATCH,
    FORWARD_TRANSMISSION_TRACKING,
    FORWARD_ISOLATION,
    REVERSE_DIRECTIVITY,
    REVERSE_SOURCE_MATCH,
    REVERSE_REFLECTION_TRACKING,
    REVERSE_LOAD_MATCH,
    REVERSE_TRANSMISSION_TRACKING,
    REVERSE_ISOLATION,
];

/// Fitted error-model coefficients over a frequency range
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationResult {
    model: CalibrationModel,
    frequency: Frequency,
    coefs: BTreeMap<String, Array1<Complex64>>,
}

impl CalibrationResult {
    /// Build a result, checking every array runs parallel to `frequency`
    pub fn new(
        model: CalibrationModel,
        frequency: Frequency,
        coefs: BTreeMap<String, Array1<Complex64>>,
    ) -> Result<Self, CalError> {
        for (name, values) in &coefs {
            if values.len() != frequency.npoints() {
                return Err(CalError::CoefficientLength {
                    name: name.clone(),
                    expected: frequency.npoints(),
                    actual: values.len(),
                });
            }
        }
        Ok(Self {
            model,
            frequency,
            coefs,
        })
    }

    pub fn model(&self) -> CalibrationModel {
        self.model
    }

    pub fn frequency(&self) -> &Frequency {
        &self.frequency
    }

    #[inline]
    pub fn npoints(&self) -> usize {
        self.frequency.npoints()
    }

    /// Coefficient array by name
    pub fn coef(&self, name: &str) -> Option<&Array1<Complex64>> {
        self.coefs.get(name)
    }

    /// Coefficient names in sorted order
    pub fn coef_names(&self) -> impl Iterator<Item = &str> {
        self.coefs.keys().map(String::as_str)
    }

    pub fn coefs(&self) -> &BTreeMap<String, Array1<Complex64>> {
        &self.coefs
    }
}
