//! Standards collection
//!
//! Drives an ECal module and a VNA through the standard sequence and pairs
//! every raw reading with the standard's characterization on a common grid.
//! The resulting sets are handed to a [`CalibrationSolver`](crate::calibration::CalibrationSolver).

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Result};
use num_complex::Complex64;
use tracing::{debug, info, warn};

use crate::adapter::RfAdapter;
use crate::calibration::{OnePortStandards, TwoPortStandards};
use crate::error::CalError;
use crate::frequency::{Frequency, FrequencyUnit};
use crate::instrument::{CorrectionSetScope, EcalModule, EcalPort, PortMap, Vna};
use crate::network::{overlap, two_port_reflect, Network};

/// Outcome of the port orientation heuristic
///
/// Standards presented on the port that is actually connected change the
/// reading a lot; standards switched on the other port barely move it. The
/// port with the larger spread is reported. Nothing guarantees this: a
/// standard set with near-identical reflections can fool it, so both
/// variances are exposed for the caller to judge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationReport {
    /// ECal port judged to be connected
    pub port: EcalPort,
    /// Variance of the readings while port A standards were presented
    pub variance_a: f64,
    /// Variance of the readings while port B standards were presented
    pub variance_b: f64,
    /// Probe frequency in Hz
    pub frequency: f64,
}

impl OrientationReport {
    /// Relative separation of the two variances, 0 (undecided) to 1 (clear)
    pub fn margin(&self) -> f64 {
        let larger = self.variance_a.max(self.variance_b);
        if larger <= 0.0 {
            return 0.0;
        }
        (self.variance_a - self.variance_b).abs() / larger
    }
}

/// Collects calibration standards through a borrowed VNA
pub struct CalibrationCollector<'a, V: Vna + ?Sized> {
    vna: &'a mut V,
}

impl<'a, V: Vna + ?Sized> CalibrationCollector<'a, V> {
    pub fn new(vna: &'a mut V) -> Self {
        Self { vna }
    }

    /// Collect reflect standards for a one-port calibration of `vna_port`
    ///
    /// Error correction is switched off first so readings are raw. `subset`
    /// restricts the calibration to part of the current sweep and must lie
    /// inside it. `adapter` is cascaded in front of every ideal standard.
    pub fn collect_one_port(
        &mut self,
        vna_port: usize,
        module: &mut dyn EcalModule,
        port_map: &PortMap,
        subset: Option<&Frequency>,
        adapter: Option<&RfAdapter>,
    ) -> Result<OnePortStandards> {
        self.vna.set_correction_on(false)?;
        let window = self.measurement_window(subset)?;
        let ecal_port = port_map.ecal_port(vna_port)?;

        let standards = module.standards(ecal_port.scope()).to_vec();
        if standards.is_empty() {
            return Err(CalError::EmptyResult("reflect standard set").into());
        }
        info!(
            "Collecting {} standards on VNA port {} via {} port {} over {}",
            standards.len(),
            vna_port,
            module.label(),
            ecal_port,
            window
        );

        let mut collected = OnePortStandards::default();
        for standard in &standards {
            let ideal = standard.require_network()?;
            module.activate(standard)?;
            self.vna.sweep()?;
            let measured = self.vna.network(&[vna_port])?.cropped_to(&window);

            let (m, s) = overlap(&measured, ideal)?;
            let s = match adapter {
                Some(adapter) => cascade_aligned(adapter.network(), &s)?,
                None => s,
            };
            debug!("Standard 0x{:04x}: {} points", standard.id(), m.nfreq());
            collected.push(m, s);
        }
        Ok(collected)
    }

    /// Collect everything a twelve-term calibration of `vna_ports` needs
    ///
    /// Both one-port sets, then every thru standard. Adapters are keyed by the
    /// ECal port they sit on. When VNA port 1 faces ECal port B the stored
    /// thru data (defined A to B) is flipped before adapters are cascaded.
    pub fn collect_two_port(
        &mut self,
        vna_ports: (usize, usize),
        module: &mut dyn EcalModule,
        port_map: &PortMap,
        subset: Option<&Frequency>,
        adapters: &BTreeMap<EcalPort, RfAdapter>,
    ) -> Result<TwoPortStandards> {
        let (p1, p2) = vna_ports;
        self.vna.set_correction_on(false)?;
        let window = self.measurement_window(subset)?;
        let e1 = port_map.ecal_port(p1)?;
        let e2 = port_map.ecal_port(p2)?;

        let port1 = self.collect_one_port(p1, module, port_map, Some(&window), adapters.get(&e1))?;
        let port2 = self.collect_one_port(p2, module, port_map, Some(&window), adapters.get(&e2))?;

        let thrus = module.standards(CorrectionSetScope::ThruAB).to_vec();
        if thrus.is_empty() {
            return Err(CalError::EmptyResult("thru standard set").into());
        }

        let mut collected = TwoPortStandards::default();
        for standard in &thrus {
            let ideal = standard.require_network()?;
            module.activate(standard)?;
            self.vna.sweep()?;
            let measured = self.vna.network(&[p1, p2])?.cropped_to(&window);

            let (m, s) = overlap(&measured, ideal)?;
            let s = orient_thru(&s, e1, adapters)?;
            debug!("Thru 0x{:04x}: {} points", standard.id(), m.nfreq());
            collected.thru_measured.push(m);
            collected.thru_ideals.push(s);
        }

        if port1.len() != port2.len() {
            warn!(
                "Port standard counts differ ({} vs {}), pairing the first {}",
                port1.len(),
                port2.len(),
                port1.len().min(port2.len())
            );
        }
        for (a, b) in port1.measured.iter().zip(&port2.measured) {
            collected.reflect_measured.push(pair_reflects(a, b)?);
        }
        for (a, b) in port1.ideals.iter().zip(&port2.ideals) {
            collected.reflect_ideals.push(pair_reflects(a, b)?);
        }

        Ok(collected)
    }

    /// Guess which ECal port is attached to `vna_port`
    ///
    /// Probes a single frequency, the module's center unless `frequency` is
    /// given. The VNA sweep is restored afterwards, also when a reading fails.
    pub fn orient_one_port(
        &mut self,
        vna_port: usize,
        module: &mut dyn EcalModule,
        frequency: Option<f64>,
    ) -> Result<OrientationReport> {
        let backup = self.vna.frequency()?;
        let probe_hz = frequency.unwrap_or_else(|| module.frequency().center());
        let probe = Frequency::from_f(vec![probe_hz], FrequencyUnit::Hz)?;

        self.vna.set_frequency(&probe)?;
        let readings = self.port_variances(vna_port, module);
        let restored = self.vna.set_frequency(&backup);
        let (variance_a, variance_b) = readings?;
        restored?;

        let report = OrientationReport {
            port: if variance_a > variance_b {
                EcalPort::A
            } else {
                EcalPort::B
            },
            variance_a,
            variance_b,
            frequency: probe_hz,
        };
        info!(
            "VNA port {} faces ECal port {} (variance A {:.3e}, B {:.3e}, margin {:.2})",
            vna_port,
            report.port,
            variance_a,
            variance_b,
            report.margin()
        );
        Ok(report)
    }

    /// Reading variances with the port A set and then the port B set presented
    fn port_variances(&mut self, vna_port: usize, module: &mut dyn EcalModule) -> Result<(f64, f64)> {
        let a = self.reflection_variance(vna_port, module, CorrectionSetScope::PortA)?;
        let b = self.reflection_variance(vna_port, module, CorrectionSetScope::PortB)?;
        Ok((a, b))
    }

    fn reflection_variance(
        &mut self,
        vna_port: usize,
        module: &mut dyn EcalModule,
        scope: CorrectionSetScope,
    ) -> Result<f64> {
        let standards = module.standards(scope).to_vec();
        let mut readings = Vec::with_capacity(standards.len());
        for standard in &standards {
            module.activate(standard)?;
            self.vna.sweep()?;
            let ntwk = self.vna.network(&[vna_port])?;
            let gamma = ntwk
                .s
                .get([0, 0, 0])
                .copied()
                .ok_or(CalError::EmptyResult("orientation reading"))?;
            readings.push(gamma);
        }
        Ok(variance(&readings))
    }

    /// Current sweep, or `subset` after checking it lies inside the sweep
    fn measurement_window(&self, subset: Option<&Frequency>) -> Result<Frequency> {
        let current = self.vna.frequency()?;
        match subset {
            Some(subset) if !subset.is_subset_of(&current) => {
                Err(CalError::SubsetExtendsBeyondRange {
                    start: subset.start(),
                    stop: subset.stop(),
                    range_start: current.start(),
                    range_stop: current.stop(),
                }
                .into())
            }
            Some(subset) => Ok(subset.clone()),
            None => Ok(current),
        }
    }
}

/// Population variance of complex samples, `mean(|x - mean(x)|^2)`
fn variance(values: &[Complex64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<Complex64>() / n;
    values.iter().map(|v| (v - mean).norm_sqr()).sum::<f64>() / n
}

/// `left ** right` after bringing the adapter side onto the standard's grid
fn cascade_aligned(adapter: &Network, standard: &Network) -> Result<Network> {
    let adapter = align(adapter, &standard.frequency)?;
    adapter
        .cascade(standard)
        .ok_or_else(|| anyhow!("Adapter data must be a 2-port network"))
}

fn align(ntwk: &Network, grid: &Frequency) -> Result<Network, CalError> {
    if !grid.is_subset_of(&ntwk.frequency) {
        return Err(CalError::IncompleteCoverage {
            start: grid.start(),
            stop: grid.stop(),
        });
    }
    if ntwk.frequency == *grid {
        Ok(ntwk.clone())
    } else {
        Ok(ntwk.interpolate(grid))
    }
}

/// Put the stored A-to-B thru into VNA port order and add adapters
///
/// Adapter port 1 faces the VNA, so the far-side adapter is flipped.
fn orient_thru(
    thru: &Network,
    ecal_on_port1: EcalPort,
    adapters: &BTreeMap<EcalPort, RfAdapter>,
) -> Result<Network> {
    if thru.nports() != 2 {
        bail!("Thru standard data must be a 2-port network, got {} ports", thru.nports());
    }
    let mut s = match ecal_on_port1 {
        EcalPort::A => thru.clone(),
        EcalPort::B => thru
            .flipped()
            .ok_or_else(|| anyhow!("Thru standard data must be a 2-port network"))?,
    };
    if let Some(near) = adapters.get(&ecal_on_port1) {
        s = cascade_aligned(near.network(), &s)?;
    }
    if let Some(far) = adapters.get(&ecal_on_port1.other()) {
        let far = align(far.network(), &s.frequency)?
            .flipped()
            .ok_or_else(|| anyhow!("Adapter data must be a 2-port network"))?;
        s = s
            .cascade(&far)
            .ok_or_else(|| anyhow!("Thru standard data must be a 2-port network"))?;
    }
    Ok(s)
}

fn pair_reflects(port1: &Network, port2: &Network) -> Result<Network> {
    two_port_reflect(port1, port2).ok_or_else(|| {
        anyhow!(
            "Cannot pair reflects: {} and {} points",
            port1.nfreq(),
            port2.nfreq()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::SweepType;

    #[test]
    fn test_variance() {
        assert_eq!(variance(&[]), 0.0);
        let same = [Complex64::new(0.3, 0.1); 4];
        assert_eq!(variance(&same), 0.0);

        let spread = [Complex64::new(1.0, 0.0), Complex64::new(-1.0, 0.0)];
        assert_eq!(variance(&spread), 1.0);
    }

    #[test]
    fn test_margin() {
        let report = OrientationReport {
            port: EcalPort::A,
            variance_a: 0.8,
            variance_b: 0.2,
            frequency: 1e9,
        };
        assert!((report.margin() - 0.75).abs() < 1e-12);

        let undecided = OrientationReport {
            variance_a: 0.0,
            variance_b: 0.0,
            ..report
        };
        assert_eq!(undecided.margin(), 0.0);
    }

    #[test]
    fn test_align_requires_coverage() {
        let freq = Frequency::new(1.0, 2.0, 3, FrequencyUnit::GHz, SweepType::Linear).unwrap();
        let adapter = Network::constant_reflect(freq, Complex64::new(0.0, 0.0));
        let wider = Frequency::new(0.5, 2.0, 4, FrequencyUnit::GHz, SweepType::Linear).unwrap();

        assert!(matches!(
            align(&adapter, &wider),
            Err(CalError::IncompleteCoverage { .. })
        ));
    }

    #[test]
    fn test_orient_thru_needs_two_ports() {
        let freq = Frequency::new(1.0, 2.0, 3, FrequencyUnit::GHz, SweepType::Linear).unwrap();
        let thru = Network::constant_reflect(freq, Complex64::new(0.0, 0.0));

        for port in [EcalPort::A, EcalPort::B] {
            assert!(orient_thru(&thru, port, &BTreeMap::new()).is_err());
        }
    }
}
