use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Result};
use nalgebra::{DMatrix, DVector};
use ndarray::Array1;
use num_complex::Complex64;

use super::result::*;
use crate::constants::{MIN_REFLECT_STANDARDS, NEAR_ZERO, SVD_TOLERANCE};
use crate::frequency::Frequency;
use crate::network::Network;

/// Paired (measured, ideal) reflect standards for one port
#[derive(Debug, Clone, Default)]
pub struct OnePortStandards {
    pub measured: Vec<Network>,
    pub ideals: Vec<Network>,
}

impl OnePortStandards {
    pub fn push(&mut self, measured: Network, ideal: Network) {
        self.measured.push(measured);
        self.ideals.push(ideal);
    }

    pub fn len(&self) -> usize {
        self.measured.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measured.is_empty()
    }

    /// Frequency grid shared by every pair
    pub fn frequency(&self) -> Option<&Frequency> {
        self.measured.first().map(Network::frequency)
    }
}

/// Inputs of a twelve-term fit
///
/// Reflects are synthetic 2-ports pairing the port 1 and port 2 readings of
/// the same standard index (see [`crate::network::two_port_reflect`]).
#[derive(Debug, Clone, Default)]
pub struct TwoPortStandards {
    pub thru_measured: Vec<Network>,
    pub thru_ideals: Vec<Network>,
    pub reflect_measured: Vec<Network>,
    pub reflect_ideals: Vec<Network>,
}

impl TwoPortStandards {
    pub fn frequency(&self) -> Option<&Frequency> {
        self.thru_measured.first().map(Network::frequency)
    }
}

/// Fits an error model to collected standards
///
/// The numerical fit is a collaborator of the calibration core; any
/// implementation returning coefficients parallel to the standards' grid will do.
pub trait CalibrationSolver {
    fn solve_one_port(&self, standards: &OnePortStandards) -> Result<CalibrationResult>;

    fn solve_twelve_term(&self, standards: &TwoPortStandards) -> Result<CalibrationResult>;
}

/// Least-squares SOL solver with a flush-thru twelve-term extension
///
/// One-port: at each frequency solves `[1, -Si, Sm*Si] . [e00, de, e11] = Sm`
/// in the least squares sense over all reflect standards, where
/// `de = e00*e11 - e10*e01`. Isolation terms are reported as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolSolver;

impl CalibrationSolver for SolSolver {
    fn solve_one_port(&self, standards: &OnePortStandards) -> Result<CalibrationResult> {
        let frequency = check_grid(&standards.measured, &standards.ideals, 1)?;
        let (e00, e11, er) = fit_port(&standards.measured, &standards.ideals, 0)?;

        let mut coefs = BTreeMap::new();
        coefs.insert(DIRECTIVITY.to_string(), e00);
        coefs.insert(SOURCE_MATCH.to_string(), e11);
        coefs.insert(REFLECTION_TRACKING.to_string(), er);
        Ok(CalibrationResult::new(CalibrationModel::OnePort, frequency, coefs)?)
    }

    fn solve_twelve_term(&self, standards: &TwoPortStandards) -> Result<CalibrationResult> {
        let frequency = check_grid(&standards.reflect_measured, &standards.reflect_ideals, 2)?;
        let thru_frequency = check_grid(&standards.thru_measured, &standards.thru_ideals, 2)?;
        if thru_frequency != frequency {
            bail!("Thru and reflect standards were collected on different frequency grids");
        }

        // 1. Three-term fits on each port
        let (edf, esf, erf) = fit_port(&standards.reflect_measured, &standards.reflect_ideals, 0)?;
        let (edr, esr, err) = fit_port(&standards.reflect_measured, &standards.reflect_ideals, 1)?;

        // 2. Load match and transmission tracking from the thru
        let thru = &standards.thru_measured[0];
        let thru_model = &standards.thru_ideals[0];
        let nfreq = frequency.npoints();
        let one = Complex64::new(1.0, 0.0);

        let mut elf = Array1::<Complex64>::zeros(nfreq);
        let mut etf = Array1::<Complex64>::zeros(nfreq);
        let mut elr = Array1::<Complex64>::zeros(nfreq);
        let mut etr = Array1::<Complex64>::zeros(nfreq);

        for f in 0..nfreq {
            let s11m = thru.s[[f, 0, 0]];
            let s21m = thru.s[[f, 1, 0]];
            let s12m = thru.s[[f, 0, 1]];
            let s22m = thru.s[[f, 1, 1]];
            let s21i = thru_model.s[[f, 1, 0]];
            let s12i = thru_model.s[[f, 0, 1]];

            let det_f = edf[f] * esf[f] - erf[f];
            let det_r = edr[f] * esr[f] - err[f];

            let den_f = s11m * esf[f] - det_f;
            let den_r = s22m * esr[f] - det_r;
            if den_f.norm() < NEAR_ZERO || den_r.norm() < NEAR_ZERO {
                bail!("Degenerate thru measurement at frequency index {}", f);
            }
            if s21i.norm() < NEAR_ZERO || s12i.norm() < NEAR_ZERO {
                bail!("Thru model has no transmission at frequency index {}", f);
            }

            // Reflection seen at the port when the thru terminates it
            elf[f] = (s11m - edf[f]) / den_f;
            elr[f] = (s22m - edr[f]) / den_r;

            etf[f] = s21m * (one - esf[f] * elf[f]) / s21i;
            etr[f] = s12m * (one - esr[f] * elr[f]) / s12i;
        }

        let terms = [
            (FORWARD_DIRECTIVITY, edf),
            (FORWARD_SOURCE_MATCH, esf),
            (FORWARD_REFLECTION_TRACKING, erf),
            (FORWARD_LOAD_MATCH, elf),
            (FORWARD_TRANSMISSION_TRACKING, etf),
            (FORWARD_ISOLATION, Array1::zeros(nfreq)),
            (REVERSE_DIRECTIVITY, edr),
            (REVERSE_SOURCE_MATCH, esr),
            (REVERSE_REFLECTION_TRACKING, err),
            (REVERSE_LOAD_MATCH, elr),
            (REVERSE_TRANSMISSION_TRACKING, etr),
            (REVERSE_ISOLATION, Array1::zeros(nfreq)),
        ];
        let coefs = terms
            .into_iter()
            .map(|(name, values)| (name.to_string(), values))
            .collect();

        Ok(CalibrationResult::new(
            CalibrationModel::TwelveTerm,
            frequency,
            coefs,
        )?)
    }
}

/// All measured/ideal networks must share one grid and have at least
/// `min_ports` ports; returns the grid
fn check_grid(measured: &[Network], ideals: &[Network], min_ports: usize) -> Result<Frequency> {
    if measured.is_empty() || measured.len() != ideals.len() {
        bail!(
            "Expected matching measured/ideal lists, got {} and {}",
            measured.len(),
            ideals.len()
        );
    }
    let frequency = measured[0].frequency.clone();
    for ntwk in measured.iter().chain(ideals) {
        if ntwk.frequency != frequency {
            bail!("Standards are not sampled on a common frequency grid");
        }
        if ntwk.nports() < min_ports {
            bail!(
                "Standard data must have {} ports, got {}",
                min_ports,
                ntwk.nports()
            );
        }
    }
    Ok(frequency)
}

/// Three-term fit on port `port` of every standard
///
/// Returns (directivity, source match, reflection tracking).
fn fit_port(
    measured: &[Network],
    ideals: &[Network],
    port: usize,
) -> Result<(Array1<Complex64>, Array1<Complex64>, Array1<Complex64>)> {
    let nstd = measured.len();
    if nstd < MIN_REFLECT_STANDARDS {
        bail!(
            "Need at least {} reflect standards, got {}",
            MIN_REFLECT_STANDARDS,
            nstd
        );
    }

    let nfreq = measured[0].nfreq();
    let mut e00 = Array1::<Complex64>::zeros(nfreq);
    let mut e11 = Array1::<Complex64>::zeros(nfreq);
    let mut er = Array1::<Complex64>::zeros(nfreq);

    for f in 0..nfreq {
        let mut a = DMatrix::<Complex64>::zeros(nstd, 3);
        let mut b = DVector::<Complex64>::zeros(nstd);

        for (k, (m, i)) in measured.iter().zip(ideals).enumerate() {
            let sm = m.s[[f, port, port]];
            let si = i.s[[f, port, port]];
            a[(k, 0)] = Complex64::new(1.0, 0.0);
            a[(k, 1)] = -si;
            a[(k, 2)] = sm * si;
            b[k] = sm;
        }

        let x = a
            .svd(true, true)
            .solve(&b, SVD_TOLERANCE)
            .map_err(|e| anyhow!("Failed to solve calibration equations at frequency index {}: {}", f, e))?;

        e00[f] = x[0];
        e11[f] = x[2];
        er[f] = x[0] * x[2] - x[1];
    }

    Ok((e00, e11, er))
}
