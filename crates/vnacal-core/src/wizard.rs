//! Calibration wizard
//!
//! Top-level orchestration: split the VNA sweep between up to two ECal
//! modules, ask the operator to connect each one, collect and solve per
//! module, join the partial calibrations and write the result back.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::adapter::{RfAdapter, RfPort};
use crate::calibration::{concatenate, CalibrationResult, CalibrationSolver, SolSolver};
use crate::collector::CalibrationCollector;
use crate::config::{ConfigError, WizardConfig};
use crate::crossover::CoverageCrossoverPolicy;
use crate::error::CalError;
use crate::frequency::Frequency;
use crate::instrument::{EcalModule, EcalPort, PortMap, Vna};
use crate::prompt::{OperatorPrompt, PromptOption};

const ABORT_KEY: &str = "a";

/// Guides an operator through an ECal calibration of one VNA
///
/// With two modules the one with the lower start frequency is the "low"
/// module. The VNA's calibration is only touched after every part was
/// collected and solved, and only when the parts add up to the whole sweep.
/// A failed run restores the VNA's error correction state.
pub struct CalWizard<V: Vna> {
    vna: V,
    low: Option<Box<dyn EcalModule>>,
    high: Option<Box<dyn EcalModule>>,
    prompt: Box<dyn OperatorPrompt>,
    solver: Box<dyn CalibrationSolver>,
    config: WizardConfig,
    policy: CoverageCrossoverPolicy,
    adapters: BTreeMap<EcalPort, RfAdapter>,
}

impl<V: Vna> CalWizard<V> {
    pub fn new(
        vna: V,
        prompt: Box<dyn OperatorPrompt>,
        config: WizardConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = config.policy()?;
        Ok(Self {
            vna,
            low: None,
            high: None,
            prompt,
            solver: Box::new(SolSolver),
            config,
            policy,
            adapters: BTreeMap::new(),
        })
    }

    pub fn with_solver(mut self, solver: Box<dyn CalibrationSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// Add an ECal module; at most two are supported
    pub fn with_module(mut self, module: Box<dyn EcalModule>) -> Result<Self> {
        if self.high.is_some() {
            bail!("At most two ECal modules can be used, {} is one too many", module.label());
        }
        match self.low.take() {
            None => self.low = Some(module),
            Some(first) if module.frequency().start() < first.frequency().start() => {
                self.low = Some(module);
                self.high = Some(first);
            }
            Some(first) => {
                self.low = Some(first);
                self.high = Some(module);
            }
        }
        Ok(self)
    }

    /// Use `adapter` between the VNA cable and `port` of the ECal
    ///
    /// `ecal_connector` is the connector on the ECal port; the adapter's port 2
    /// has to mate with it.
    pub fn with_adapter(
        mut self,
        port: EcalPort,
        adapter: RfAdapter,
        ecal_connector: &RfPort,
    ) -> Result<Self> {
        adapter.check_mates(ecal_connector)?;
        info!("Using {} on ECal port {}", adapter.label(), port);
        self.adapters.insert(port, adapter);
        Ok(self)
    }

    pub fn vna(&self) -> &V {
        &self.vna
    }

    pub fn vna_mut(&mut self) -> &mut V {
        &mut self.vna
    }

    pub fn into_vna(self) -> V {
        self.vna
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    pub fn policy(&self) -> &CoverageCrossoverPolicy {
        &self.policy
    }

    /// Coverage of the low and high module; empty where a module is absent
    pub fn coverage(&self) -> (Frequency, Frequency) {
        let range = |module: &Option<Box<dyn EcalModule>>| {
            module
                .as_ref()
                .map(|m| m.frequency())
                .unwrap_or_else(Frequency::empty)
        };
        (range(&self.low), range(&self.high))
    }

    /// One-port calibration of `vna_port` over the current sweep
    pub fn calibrate_one_port(&mut self, vna_port: usize) -> Result<CalibrationResult> {
        let correction_was_on = self.vna.correction_on()?;
        let outcome = self.one_port(vna_port);
        self.restore_on_error(outcome, correction_was_on)
    }

    /// Twelve-term calibration between `vna_ports` over the current sweep
    pub fn calibrate_two_port(&mut self, vna_ports: (usize, usize)) -> Result<CalibrationResult> {
        let (p1, p2) = vna_ports;
        if p1 == p2 {
            bail!("Two-port calibration needs two different VNA ports, got {} twice", p1);
        }
        let correction_was_on = self.vna.correction_on()?;
        let outcome = self.two_port(vna_ports);
        self.restore_on_error(outcome, correction_was_on)
    }

    fn one_port(&mut self, vna_port: usize) -> Result<CalibrationResult> {
        let measured = self.vna.frequency()?;
        let parts = self.split(&measured)?;
        let expected = parts.0.concatenated(&parts.1)?;

        let mut results = Vec::with_capacity(2);
        for (module, part) in [(self.low.as_deref_mut(), parts.0), (self.high.as_deref_mut(), parts.1)] {
            if part.is_empty() {
                continue;
            }
            let Some(module) = module else {
                return Err(CalError::EmptyResult("module selection").into());
            };

            let message = if self.config.auto_orient {
                format!("Connect {} to VNA port {} ({})", module.label(), vna_port, part)
            } else {
                format!(
                    "Connect {} port {} to VNA port {} ({})",
                    module.label(),
                    self.config.port_map.ecal_port(vna_port)?,
                    vna_port,
                    part
                )
            };
            confirm(self.prompt.as_mut(), &message)?;

            let mut collector = CalibrationCollector::new(&mut self.vna);
            let port_map = if self.config.auto_orient {
                let report = collector.orient_one_port(vna_port, module, None)?;
                PortMap::with_port(vna_port, report.port)?
            } else {
                self.config.port_map
            };
            let ecal_port = port_map.ecal_port(vna_port)?;
            let standards = collector.collect_one_port(
                vna_port,
                module,
                &port_map,
                Some(&part),
                self.adapters.get(&ecal_port),
            )?;
            module.isolate()?;

            let solved = self.solver.solve_one_port(&standards)?;
            check_covers(&solved, &part)?;
            results.push(solved);
        }

        let result = join(results)?;
        check_covers(&result, &expected)?;
        self.write_back(&result)?;
        Ok(result)
    }

    fn two_port(&mut self, vna_ports: (usize, usize)) -> Result<CalibrationResult> {
        let (p1, p2) = vna_ports;
        let measured = self.vna.frequency()?;
        let parts = self.split(&measured)?;
        let expected = parts.0.concatenated(&parts.1)?;

        let mut results = Vec::with_capacity(2);
        for (module, part) in [(self.low.as_deref_mut(), parts.0), (self.high.as_deref_mut(), parts.1)] {
            if part.is_empty() {
                continue;
            }
            let Some(module) = module else {
                return Err(CalError::EmptyResult("module selection").into());
            };

            let message = if self.config.auto_orient {
                format!(
                    "Connect {} between VNA ports {} and {} ({})",
                    module.label(),
                    p1,
                    p2,
                    part
                )
            } else {
                let map = self.config.port_map;
                format!(
                    "Connect {} port {} to VNA port {} and port {} to VNA port {} ({})",
                    module.label(),
                    map.ecal_port(p1)?,
                    p1,
                    map.ecal_port(p2)?,
                    p2,
                    part
                )
            };
            confirm(self.prompt.as_mut(), &message)?;

            let mut collector = CalibrationCollector::new(&mut self.vna);
            let port_map = if self.config.auto_orient {
                let report = collector.orient_one_port(p1, module, None)?;
                PortMap::with_port(p1, report.port)?
            } else {
                self.config.port_map
            };
            let standards =
                collector.collect_two_port(vna_ports, module, &port_map, Some(&part), &self.adapters)?;
            module.isolate()?;

            let solved = self.solver.solve_twelve_term(&standards)?;
            check_covers(&solved, &part)?;
            results.push(solved);
        }

        let result = join(results)?;
        check_covers(&result, &expected)?;
        self.write_back(&result)?;
        Ok(result)
    }

    fn restore_on_error(
        &mut self,
        outcome: Result<CalibrationResult>,
        correction_was_on: bool,
    ) -> Result<CalibrationResult> {
        if outcome.is_err() {
            if let Err(err) = self.vna.set_correction_on(correction_was_on) {
                warn!("Could not restore error correction: {:#}", err);
            }
        }
        outcome
    }

    fn split(&self, measured: &Frequency) -> Result<(Frequency, Frequency)> {
        let (low, high) = self.coverage();
        let (low_part, high_part) =
            self.policy
                .split_between_sources(measured, &low, &high, self.config.allow_incomplete)?;
        if low_part.is_empty() && high_part.is_empty() {
            return Err(CalError::EmptyResult("crossover split").into());
        }
        info!(
            "Calibrating {}: low module {}, high module {}",
            measured, low_part, high_part
        );
        Ok((low_part, high_part))
    }

    fn write_back(&mut self, result: &CalibrationResult) -> Result<()> {
        self.vna.set_calibration(result)?;
        self.vna.set_correction_on(true)?;
        info!(
            "Wrote {} calibration over {}",
            result.model(),
            result.frequency()
        );
        Ok(())
    }
}

/// Ask to continue; an abort answer fails the calibration
fn confirm(prompt: &mut dyn OperatorPrompt, message: &str) -> Result<()> {
    let options = [
        PromptOption::proceed(),
        PromptOption::new("Abort", ABORT_KEY),
    ];
    if prompt.ask(message, &options)? == ABORT_KEY {
        bail!("Calibration aborted by operator");
    }
    Ok(())
}

/// A solved calibration has to span exactly the sweep it was collected for
fn check_covers(result: &CalibrationResult, part: &Frequency) -> Result<(), CalError> {
    if result.frequency() == part {
        return Ok(());
    }
    warn!("Calibration covers {}, expected {}", result.frequency(), part);
    Err(CalError::IncompleteCoverage {
        start: part.start(),
        stop: part.stop(),
    })
}

/// Low part followed by the high part, whichever exist
fn join(results: Vec<CalibrationResult>) -> Result<CalibrationResult, CalError> {
    let mut results = results.into_iter();
    match (results.next(), results.next()) {
        (Some(low), Some(high)) => concatenate(&low, &high),
        (Some(only), None) => Ok(only),
        _ => Err(CalError::EmptyResult("calibration")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::{FrequencyUnit, SweepType};
    use crate::sim::{ScriptedPrompt, SimBench};

    fn ghz(start: f64, stop: f64, n: usize) -> Frequency {
        Frequency::new(start, stop, n, FrequencyUnit::GHz, SweepType::Linear).unwrap()
    }

    #[test]
    fn test_modules_sorted_by_start() -> Result<()> {
        let bench = SimBench::new(ghz(1.0, 2.0, 3));
        let high = bench.ecal("N4693", "0002", ghz(1.0, 26.5, 11));
        let low = bench.ecal("N4691", "0001", ghz(0.3, 9.0, 11));

        let wizard = CalWizard::new(bench.vna(), Box::new(ScriptedPrompt::new()), WizardConfig::default())?
            .with_module(Box::new(high))?
            .with_module(Box::new(low))?;

        let (low, high) = wizard.coverage();
        assert_eq!(low.start(), 0.3e9);
        assert_eq!(high.start(), 1.0e9);
        Ok(())
    }

    #[test]
    fn test_third_module_rejected() -> Result<()> {
        let bench = SimBench::new(ghz(1.0, 2.0, 3));
        let wizard = CalWizard::new(bench.vna(), Box::new(ScriptedPrompt::new()), WizardConfig::default())?
            .with_module(Box::new(bench.ecal("A", "1", ghz(0.3, 9.0, 11))))?
            .with_module(Box::new(bench.ecal("B", "2", ghz(1.0, 26.5, 11))))?;
        assert!(wizard
            .with_module(Box::new(bench.ecal("C", "3", ghz(2.0, 50.0, 11))))
            .is_err());
        Ok(())
    }

    #[test]
    fn test_abort_leaves_vna_untouched() -> Result<()> {
        let bench = SimBench::new(ghz(1.0, 2.0, 3));
        let module = bench.ecal("N4691", "0001", ghz(0.3, 9.0, 11));
        let mut wizard = CalWizard::new(
            bench.vna(),
            Box::new(ScriptedPrompt::new().answer("a")),
            WizardConfig::default(),
        )?
        .with_module(Box::new(module))?;

        assert!(wizard.calibrate_one_port(1).is_err());
        assert_eq!(bench.calibration_writes(), 0);
        assert_eq!(bench.sweeps(), 0);
        Ok(())
    }

    #[test]
    fn test_check_covers() {
        let part = ghz(1.0, 2.0, 11);
        let empty = |frequency| {
            CalibrationResult::new(crate::calibration::CalibrationModel::OnePort, frequency, BTreeMap::new())
                .unwrap()
        };

        assert!(check_covers(&empty(part.clone()), &part).is_ok());
        assert_eq!(
            check_covers(&empty(part.below(1.5e9, true)), &part),
            Err(CalError::IncompleteCoverage {
                start: 1e9,
                stop: 2e9
            })
        );
    }

    #[test]
    fn test_join() {
        assert_eq!(join(Vec::new()), Err(CalError::EmptyResult("calibration")));
    }
}
