//! Concatenation of calibrations taken over adjacent sub-ranges
//!
//! When two ECal modules split a sweep, each produces its own coefficient set.
//! [`concatenate`] joins them into one calibration over the whole sweep.

use std::collections::BTreeMap;

use ndarray::{concatenate as join, Axis};
use tracing::debug;

use super::result::CalibrationResult;
use crate::error::CalError;

/// Join a lower and an upper calibration into one
///
/// Both must use the same model and carry the same coefficient names. The
/// lower range must stop strictly below the start of the upper range. The
/// result's frequency points are the lower points followed by the upper
/// points, and every coefficient array is joined in that same order.
pub fn concatenate(
    low: &CalibrationResult,
    high: &CalibrationResult,
) -> Result<CalibrationResult, CalError> {
    if low.model() != high.model() {
        return Err(CalError::IncompatibleCalibrationTypes(format!(
            "{} and {} models",
            low.model(),
            high.model()
        )));
    }
    if !low.coef_names().eq(high.coef_names()) {
        return Err(CalError::IncompatibleCalibrationTypes(
            "coefficient names differ".to_string(),
        ));
    }

    let frequency = low.frequency().concatenated(high.frequency())?;

    let mut coefs = BTreeMap::new();
    for (name, lo) in low.coefs() {
        let hi = high
            .coef(name)
            .ok_or_else(|| CalError::IncompatibleCalibrationTypes(format!("missing '{name}'")))?;
        let joined = join(Axis(0), &[lo.view(), hi.view()]).map_err(|_| {
            CalError::CoefficientLength {
                name: name.clone(),
                expected: frequency.npoints(),
                actual: lo.len() + hi.len(),
            }
        })?;
        coefs.insert(name.clone(), joined);
    }

    debug!(
        "Concatenated {} calibration: {} + {} points, boundary {} Hz | {} Hz",
        low.model(),
        low.npoints(),
        high.npoints(),
        low.frequency().stop(),
        high.frequency().start()
    );

    CalibrationResult::new(low.model(), frequency, coefs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::result::{CalibrationModel, DIRECTIVITY, ONE_PORT_TERMS};
    use crate::frequency::{Frequency, FrequencyUnit, SweepType};
    use ndarray::Array1;
    use num_complex::Complex64;

    fn one_port(start: f64, stop: f64, n: usize, value: f64) -> CalibrationResult {
        let freq = Frequency::new(start, stop, n, FrequencyUnit::GHz, SweepType::Linear).unwrap();
        let coefs = ONE_PORT_TERMS
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    Array1::from_elem(n, Complex64::new(value, 0.0)),
                )
            })
            .collect();
        CalibrationResult::new(CalibrationModel::OnePort, freq, coefs).unwrap()
    }

    #[test]
    fn test_concatenate_orders_segments() {
        let low = one_port(1.0, 2.0, 3, 0.1);
        let high = one_port(3.0, 4.0, 2, 0.2);

        let merged = concatenate(&low, &high).unwrap();
        let d = merged.coef(DIRECTIVITY).unwrap();

        assert_eq!(merged.npoints(), 5);
        assert_eq!(d.len(), 5);
        assert_eq!(d[2].re, 0.1);
        assert_eq!(d[3].re, 0.2);
    }

    #[test]
    fn test_concatenate_rejects_reversed_order() {
        let low = one_port(1.0, 2.0, 3, 0.1);
        let high = one_port(3.0, 4.0, 2, 0.2);
        assert!(matches!(
            concatenate(&high, &low),
            Err(CalError::OverlappingRanges { .. })
        ));
    }

    #[test]
    fn test_concatenate_rejects_different_names() {
        let low = one_port(1.0, 2.0, 3, 0.1);
        let freq = Frequency::new(3.0, 4.0, 2, FrequencyUnit::GHz, SweepType::Linear).unwrap();
        let mut coefs = BTreeMap::new();
        coefs.insert("directivity".to_string(), Array1::zeros(2));
        let high = CalibrationResult::new(CalibrationModel::OnePort, freq, coefs).unwrap();

        assert!(matches!(
            concatenate(&low, &high),
            Err(CalError::IncompatibleCalibrationTypes(_))
        ));
    }
}
