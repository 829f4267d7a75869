//! Simulated calibration bench
//!
//! A VNA with known per-port error boxes, ECal modules presenting ideal
//! constant-reflection standards, and a scripted operator. All parts share one
//! [`SimBench`] state so that switching a standard in a module changes what
//! the VNA reads on the ports the module is connected to.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::f64::consts::PI;
use std::rc::Rc;

use anyhow::{anyhow, bail, Result};
use ndarray::Array3;
use num_complex::Complex64;
use tracing::debug;

use crate::calibration::CalibrationResult;
use crate::frequency::Frequency;
use crate::instrument::{CalibrationStandard, CorrectionSetScope, EcalModule, EcalPort, Vna};
use crate::network::Network;
use crate::prompt::{OperatorPrompt, PromptOption};

/// Reflection of an ECal port whose standards are not being presented
pub const ISOLATED_GAMMA: Complex64 = Complex64::new(0.05, 0.02);

/// Reflect standards every simulated module carries on each port
pub const REFLECT_GAMMAS: [Complex64; 4] = [
    Complex64::new(-1.0, 0.0),
    Complex64::new(1.0, 0.0),
    Complex64::new(0.0, 0.0),
    Complex64::new(0.0, 0.5),
];

/// Error box of one VNA port
///
/// Reflection tracking rotates with the round trip through a cable of
/// `delay` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortErrors {
    pub directivity: Complex64,
    pub source_match: Complex64,
    pub reflection_tracking: Complex64,
    /// One-way transmission factor of the port, used for the thru terms
    pub transmission: Complex64,
    pub delay: f64,
}

impl PortErrors {
    /// Rotation of a path through the cable `trips` times
    fn phase(&self, f: f64, trips: f64) -> Complex64 {
        Complex64::from_polar(1.0, -2.0 * PI * f * self.delay * trips)
    }

    pub fn directivity_at(&self, _f: f64) -> Complex64 {
        self.directivity
    }

    pub fn source_match_at(&self, _f: f64) -> Complex64 {
        self.source_match
    }

    pub fn reflection_tracking_at(&self, f: f64) -> Complex64 {
        self.reflection_tracking * self.phase(f, 2.0)
    }

    /// Raw reading for an actual reflection `gamma`
    pub fn measure(&self, f: f64, gamma: Complex64) -> Complex64 {
        let one = Complex64::new(1.0, 0.0);
        self.directivity_at(f)
            + self.reflection_tracking_at(f) * gamma / (one - self.source_match_at(f) * gamma)
    }
}

impl Default for PortErrors {
    fn default() -> Self {
        Self {
            directivity: Complex64::new(0.02, -0.01),
            source_match: Complex64::new(0.08, 0.03),
            reflection_tracking: Complex64::new(0.92, -0.05),
            transmission: Complex64::new(0.95, 0.02),
            delay: 1.0e-10,
        }
    }
}

/// Forward or reverse transmission tracking between two ports
pub fn transmission_tracking(from: &PortErrors, to: &PortErrors, f: f64) -> Complex64 {
    from.transmission * to.transmission * from.phase(f, 1.0) * to.phase(f, 1.0)
}

#[derive(Debug, Clone, Copy)]
struct Presenting {
    module: usize,
    scope: CorrectionSetScope,
    gamma: Option<Complex64>,
}

#[derive(Debug)]
struct BenchState {
    frequency: Frequency,
    correction_on: bool,
    calibration: Option<CalibrationResult>,
    errors: BTreeMap<usize, PortErrors>,
    connections: BTreeMap<usize, (usize, EcalPort)>,
    presenting: Option<Presenting>,
    modules: usize,
    sweeps: usize,
    calibration_writes: usize,
    fail_after_sweeps: Option<usize>,
}

impl BenchState {
    fn port_errors(&self, port: usize) -> Result<PortErrors> {
        self.errors
            .get(&port)
            .copied()
            .ok_or_else(|| anyhow!("Simulated VNA has no port {port}"))
    }

    /// Actual reflection at the reference plane of `port`
    fn dut_gamma(&self, port: usize) -> Result<Complex64> {
        let Some(&(module, ecal_port)) = self.connections.get(&port) else {
            return Ok(ISOLATED_GAMMA);
        };
        match self.presenting {
            Some(p) if p.module == module && p.scope == ecal_port.scope() => {
                Ok(p.gamma.unwrap_or(ISOLATED_GAMMA))
            }
            Some(p) if p.module == module && p.scope == CorrectionSetScope::ThruAB => {
                // Terminated by the port on the other side of the thru
                let other = self
                    .connections
                    .iter()
                    .find(|&(&vna_port, &(m, e))| vna_port != port && m == module && e != ecal_port)
                    .map(|(&vna_port, _)| vna_port);
                match other {
                    Some(other) => Ok(self.port_errors(other)?.source_match),
                    None => Ok(Complex64::new(0.0, 0.0)),
                }
            }
            _ => Ok(ISOLATED_GAMMA),
        }
    }

    /// Whether `p1` and `p2` are joined by a presented thru
    fn thru_between(&self, p1: usize, p2: usize) -> bool {
        match (self.presenting, self.connections.get(&p1), self.connections.get(&p2)) {
            (Some(p), Some(&(m1, e1)), Some(&(m2, e2))) => {
                p.scope == CorrectionSetScope::ThruAB && p.module == m1 && m1 == m2 && e1 != e2
            }
            _ => false,
        }
    }

    fn read(&self, ports: &[usize]) -> Result<Network> {
        if let Some(limit) = self.fail_after_sweeps {
            if self.sweeps > limit {
                bail!("Simulated VNA stopped responding");
            }
        }
        let f = self.frequency.f();
        match *ports {
            [port] => {
                let errors = self.port_errors(port)?;
                let gamma = self.dut_gamma(port)?;
                let mut s = Array3::<Complex64>::zeros((f.len(), 1, 1));
                for (i, &fi) in f.iter().enumerate() {
                    s[[i, 0, 0]] = errors.measure(fi, gamma);
                }
                Ok(Network::from_s(self.frequency.clone(), s))
            }
            [p1, p2] => {
                let e1 = self.port_errors(p1)?;
                let e2 = self.port_errors(p2)?;
                let thru = self.thru_between(p1, p2);
                let g1 = self.dut_gamma(p1)?;
                let g2 = self.dut_gamma(p2)?;
                let one = Complex64::new(1.0, 0.0);

                let mut s = Array3::<Complex64>::zeros((f.len(), 2, 2));
                for (i, &fi) in f.iter().enumerate() {
                    s[[i, 0, 0]] = e1.measure(fi, g1);
                    s[[i, 1, 1]] = e2.measure(fi, g2);
                    if thru {
                        // Flush thru: each source sees the other port's match
                        s[[i, 1, 0]] = transmission_tracking(&e1, &e2, fi)
                            / (one - e1.source_match * e2.source_match);
                        s[[i, 0, 1]] = transmission_tracking(&e2, &e1, fi)
                            / (one - e2.source_match * e1.source_match);
                    }
                }
                Ok(Network::from_s(self.frequency.clone(), s))
            }
            _ => bail!("Simulated VNA reads one or two ports, got {:?}", ports),
        }
    }
}

/// Shared state of a simulated bench
#[derive(Debug, Clone)]
pub struct SimBench {
    state: Rc<RefCell<BenchState>>,
}

impl SimBench {
    /// Two-port VNA sweeping `frequency` with default error boxes on both ports
    pub fn new(frequency: Frequency) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(1, PortErrors::default());
        errors.insert(
            2,
            PortErrors {
                directivity: Complex64::new(-0.015, 0.025),
                source_match: Complex64::new(0.06, -0.04),
                reflection_tracking: Complex64::new(0.88, 0.07),
                transmission: Complex64::new(0.93, -0.03),
                delay: 1.5e-10,
            },
        );
        Self {
            state: Rc::new(RefCell::new(BenchState {
                frequency,
                correction_on: true,
                calibration: None,
                errors,
                connections: BTreeMap::new(),
                presenting: None,
                modules: 0,
                sweeps: 0,
                calibration_writes: 0,
                fail_after_sweeps: None,
            })),
        }
    }

    pub fn vna(&self) -> SimulatedVna {
        SimulatedVna {
            state: Rc::clone(&self.state),
        }
    }

    /// New module covering `frequency` with [`REFLECT_GAMMAS`] on both ports
    /// and a flush thru
    pub fn ecal(&self, model: &str, serial_number: &str, frequency: Frequency) -> SimulatedEcal {
        let id = {
            let mut state = self.state.borrow_mut();
            state.modules += 1;
            state.modules
        };
        SimulatedEcal::new(Rc::clone(&self.state), id, model, serial_number, frequency)
    }

    /// Attach `ecal_port` of module `module` (see [`SimulatedEcal::id`]) to `vna_port`
    pub fn connect(&self, vna_port: usize, module: usize, ecal_port: EcalPort) {
        debug!("Bench: VNA port {} to module {} port {}", vna_port, module, ecal_port);
        self.state
            .borrow_mut()
            .connections
            .insert(vna_port, (module, ecal_port));
    }

    pub fn disconnect(&self, vna_port: usize) {
        self.state.borrow_mut().connections.remove(&vna_port);
    }

    pub fn port_errors(&self, vna_port: usize) -> Option<PortErrors> {
        self.state.borrow().errors.get(&vna_port).copied()
    }

    pub fn set_port_errors(&self, vna_port: usize, errors: PortErrors) {
        self.state.borrow_mut().errors.insert(vna_port, errors);
    }

    /// Make every read after `sweeps` sweeps fail
    pub fn fail_reads_after(&self, sweeps: usize) {
        self.state.borrow_mut().fail_after_sweeps = Some(sweeps);
    }

    pub fn sweeps(&self) -> usize {
        self.state.borrow().sweeps
    }

    pub fn calibration_writes(&self) -> usize {
        self.state.borrow().calibration_writes
    }
}

/// VNA side of a [`SimBench`]
#[derive(Debug)]
pub struct SimulatedVna {
    state: Rc<RefCell<BenchState>>,
}

impl Vna for SimulatedVna {
    fn frequency(&self) -> Result<Frequency> {
        Ok(self.state.borrow().frequency.clone())
    }

    fn set_frequency(&mut self, frequency: &Frequency) -> Result<()> {
        if frequency.is_empty() {
            bail!("Cannot sweep an empty frequency range");
        }
        self.state.borrow_mut().frequency = frequency.clone();
        Ok(())
    }

    fn network(&mut self, ports: &[usize]) -> Result<Network> {
        self.state.borrow().read(ports)
    }

    fn sweep(&mut self) -> Result<()> {
        self.state.borrow_mut().sweeps += 1;
        Ok(())
    }

    fn correction_on(&self) -> Result<bool> {
        Ok(self.state.borrow().correction_on)
    }

    fn set_correction_on(&mut self, on: bool) -> Result<()> {
        self.state.borrow_mut().correction_on = on;
        Ok(())
    }

    fn calibration(&self) -> Result<Option<CalibrationResult>> {
        Ok(self.state.borrow().calibration.clone())
    }

    fn set_calibration(&mut self, calibration: &CalibrationResult) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calibration = Some(calibration.clone());
        state.calibration_writes += 1;
        Ok(())
    }
}

/// ECal side of a [`SimBench`]
#[derive(Debug)]
pub struct SimulatedEcal {
    state: Rc<RefCell<BenchState>>,
    id: usize,
    model: String,
    serial_number: String,
    frequency: Frequency,
    standards: BTreeMap<CorrectionSetScope, Vec<CalibrationStandard>>,
    gammas: BTreeMap<u16, Complex64>,
}

impl SimulatedEcal {
    fn new(
        state: Rc<RefCell<BenchState>>,
        id: usize,
        model: &str,
        serial_number: &str,
        frequency: Frequency,
    ) -> Self {
        let mut standards = BTreeMap::new();
        let mut gammas = BTreeMap::new();

        for (base, scope) in [
            (0x0100u16, CorrectionSetScope::PortA),
            (0x0200u16, CorrectionSetScope::PortB),
        ] {
            let set = REFLECT_GAMMAS
                .iter()
                .enumerate()
                .map(|(k, &gamma)| {
                    let gate = base | (1 << k);
                    gammas.insert(gate, gamma);
                    let ideal = Network::constant_reflect(frequency.clone(), gamma);
                    CalibrationStandard::new(gate, scope, Some(ideal))
                })
                .collect();
            standards.insert(scope, set);
        }

        let nfreq = frequency.npoints();
        let mut thru = Array3::<Complex64>::zeros((nfreq, 2, 2));
        for i in 0..nfreq {
            thru[[i, 1, 0]] = Complex64::new(1.0, 0.0);
            thru[[i, 0, 1]] = Complex64::new(1.0, 0.0);
        }
        standards.insert(
            CorrectionSetScope::ThruAB,
            vec![CalibrationStandard::new(
                0x0400,
                CorrectionSetScope::ThruAB,
                Some(Network::from_s(frequency.clone(), thru)),
            )],
        );

        Self {
            state,
            id,
            model: model.to_string(),
            serial_number: serial_number.to_string(),
            frequency,
            standards,
            gammas,
        }
    }

    /// Handle used by [`SimBench::connect`]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Replace the standards of `scope`, e.g. to drop characterization data
    pub fn set_standards(&mut self, scope: CorrectionSetScope, standards: Vec<CalibrationStandard>) {
        self.standards.insert(scope, standards);
    }
}

impl EcalModule for SimulatedEcal {
    fn model(&self) -> &str {
        &self.model
    }

    fn serial_number(&self) -> &str {
        &self.serial_number
    }

    fn connector_type(&self) -> &str {
        "3.5 mm"
    }

    fn frequency(&self) -> Frequency {
        self.frequency.clone()
    }

    fn standards(&self, scope: CorrectionSetScope) -> &[CalibrationStandard] {
        self.standards.get(&scope).map(Vec::as_slice).unwrap_or(&[])
    }

    fn activate(&mut self, standard: &CalibrationStandard) -> Result<()> {
        let known = self
            .standards(standard.scope())
            .iter()
            .any(|s| s.id() == standard.id());
        if !known {
            bail!("{} has no standard 0x{:04x}", self.label(), standard.id());
        }
        self.state.borrow_mut().presenting = Some(Presenting {
            module: self.id,
            scope: standard.scope(),
            gamma: self.gammas.get(&standard.id()).copied(),
        });
        Ok(())
    }

    fn isolate(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.presenting.is_some_and(|p| p.module == self.id) {
            state.presenting = None;
        }
        Ok(())
    }
}

type Action = Box<dyn FnMut()>;

/// Messages shown by a [`ScriptedPrompt`], shared with the test that owns it
#[derive(Debug, Clone, Default)]
pub struct Transcript(Rc<RefCell<Vec<String>>>);

impl Transcript {
    pub fn messages(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

/// Operator that answers from a script
///
/// Each step gives an answer and optionally rewires the bench before the
/// answer is returned, the way an operator moves cables before confirming.
#[derive(Default)]
pub struct ScriptedPrompt {
    steps: VecDeque<(String, Option<Action>)>,
    transcript: Transcript,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, answer: &str) -> Self {
        self.steps.push_back((answer.to_string(), None));
        self
    }

    pub fn answer_after(mut self, answer: &str, action: impl FnMut() + 'static) -> Self {
        self.steps
            .push_back((answer.to_string(), Some(Box::new(action))));
        self
    }

    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }
}

impl OperatorPrompt for ScriptedPrompt {
    fn ask(&mut self, message: &str, options: &[PromptOption]) -> Result<String> {
        self.transcript.0.borrow_mut().push(message.to_string());
        let (answer, action) = self
            .steps
            .pop_front()
            .ok_or_else(|| anyhow!("Script has no answer for: {message}"))?;
        if let Some(mut action) = action {
            action();
        }
        options
            .iter()
            .find(|o| o.accepts(&answer))
            .map(|o| o.key.clone())
            .ok_or_else(|| anyhow!("Scripted answer {answer:?} is not an option for: {message}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::{FrequencyUnit, SweepType};
    use approx::assert_relative_eq;

    fn bench() -> SimBench {
        SimBench::new(Frequency::new(1.0, 2.0, 3, FrequencyUnit::GHz, SweepType::Linear).unwrap())
    }

    #[test]
    fn test_reads_presented_standard() -> Result<()> {
        let bench = bench();
        let mut vna = bench.vna();
        let mut ecal = bench.ecal(
            "N4691",
            "0001",
            Frequency::new(0.5, 3.0, 6, FrequencyUnit::GHz, SweepType::Linear).unwrap(),
        );
        bench.connect(1, ecal.id(), EcalPort::A);

        let short = ecal.standards(CorrectionSetScope::PortA)[0].clone();
        ecal.activate(&short)?;
        vna.sweep()?;
        let ntwk = vna.network(&[1])?;

        let errors = PortErrors::default();
        let expected = errors.measure(1.5e9, REFLECT_GAMMAS[0]);
        assert_relative_eq!(ntwk.s[[1, 0, 0]].re, expected.re, epsilon = 1e-12);
        assert_relative_eq!(ntwk.s[[1, 0, 0]].im, expected.im, epsilon = 1e-12);

        // Port B standards leave port A isolated
        let other = ecal.standards(CorrectionSetScope::PortB)[0].clone();
        ecal.activate(&other)?;
        let ntwk = vna.network(&[1])?;
        let isolated = errors.measure(1.5e9, ISOLATED_GAMMA);
        assert_relative_eq!(ntwk.s[[1, 0, 0]].re, isolated.re, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_thru_transmission() -> Result<()> {
        let bench = bench();
        let mut vna = bench.vna();
        let mut ecal = bench.ecal(
            "N4691",
            "0001",
            Frequency::new(0.5, 3.0, 6, FrequencyUnit::GHz, SweepType::Linear).unwrap(),
        );
        bench.connect(1, ecal.id(), EcalPort::A);
        bench.connect(2, ecal.id(), EcalPort::B);

        let thru = ecal.standards(CorrectionSetScope::ThruAB)[0].clone();
        ecal.activate(&thru)?;
        let ntwk = vna.network(&[1, 2])?;
        assert!(ntwk.s[[0, 1, 0]].norm() > 0.5);

        ecal.isolate()?;
        let ntwk = vna.network(&[1, 2])?;
        assert_eq!(ntwk.s[[0, 1, 0]], Complex64::new(0.0, 0.0));
        Ok(())
    }

    #[test]
    fn test_scripted_prompt() {
        let flag = Rc::new(RefCell::new(false));
        let seen = Rc::clone(&flag);
        let mut prompt = ScriptedPrompt::new()
            .answer_after("", move || *seen.borrow_mut() = true)
            .answer("x");
        let transcript = prompt.transcript();

        let options = [PromptOption::proceed()];
        assert_eq!(prompt.ask("Connect", &options).unwrap(), "c");
        assert!(*flag.borrow());
        assert!(prompt.ask("Again", &options).is_err());
        assert!(prompt.ask("Third", &options).is_err());
        assert_eq!(transcript.messages(), vec!["Connect", "Again", "Third"]);
    }

    #[test]
    fn test_read_failure() {
        let bench = bench();
        let mut vna = bench.vna();
        bench.fail_reads_after(0);
        vna.sweep().unwrap();
        assert!(vna.network(&[1]).is_err());
    }
}
