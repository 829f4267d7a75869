//! Instrument collaborator interfaces
//!
//! The calibration core talks to a VNA and to ECal modules only through these
//! traits. Transports (GPIB, FTDI, serial) and the ECal flash layout live in
//! the implementations, not here. Every call blocks until the instrument has
//! finished; transport errors are returned as-is and never retried.

use std::fmt;

use anyhow::Result;
use serde::Deserialize;

use crate::calibration::CalibrationResult;
use crate::error::CalError;
use crate::frequency::Frequency;
use crate::network::Network;

/// A vector network analyzer that can be calibrated
pub trait Vna {
    /// Current sweep
    fn frequency(&self) -> Result<Frequency>;

    fn set_frequency(&mut self, frequency: &Frequency) -> Result<()>;

    /// Read the network seen on `ports` (1-based) over the current sweep
    fn network(&mut self, ports: &[usize]) -> Result<Network>;

    /// Trigger a single sweep and wait for it to complete
    fn sweep(&mut self) -> Result<()>;

    fn correction_on(&self) -> Result<bool>;

    fn set_correction_on(&mut self, on: bool) -> Result<()>;

    /// Active calibration, if the instrument holds one
    fn calibration(&self) -> Result<Option<CalibrationResult>>;

    fn set_calibration(&mut self, calibration: &CalibrationResult) -> Result<()>;
}

/// Group of standards stored in an ECal module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CorrectionSetScope {
    PortA,
    PortB,
    ThruAB,
    VerifyAB,
}

/// Physical port of an ECal module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum EcalPort {
    A,
    B,
}

impl EcalPort {
    /// Correction set holding this port's reflect standards
    pub fn scope(&self) -> CorrectionSetScope {
        match self {
            EcalPort::A => CorrectionSetScope::PortA,
            EcalPort::B => CorrectionSetScope::PortB,
        }
    }

    pub fn other(&self) -> EcalPort {
        match self {
            EcalPort::A => EcalPort::B,
            EcalPort::B => EcalPort::A,
        }
    }
}

impl fmt::Display for EcalPort {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcalPort::A => write!(fmt, "A"),
            EcalPort::B => write!(fmt, "B"),
        }
    }
}

/// Which ECal port is attached to VNA port 1 and port 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PortMap {
    pub port1: EcalPort,
    pub port2: EcalPort,
}

impl Default for PortMap {
    fn default() -> Self {
        Self {
            port1: EcalPort::A,
            port2: EcalPort::B,
        }
    }
}

impl PortMap {
    pub fn ecal_port(&self, vna_port: usize) -> Result<EcalPort, CalError> {
        match vna_port {
            1 => Ok(self.port1),
            2 => Ok(self.port2),
            other => Err(CalError::UnknownVnaPort(other)),
        }
    }

    /// Same map with `vna_port` attached to `ecal_port` and the other VNA port
    /// to the remaining ECal port
    pub fn with_port(vna_port: usize, ecal_port: EcalPort) -> Result<Self, CalError> {
        match vna_port {
            1 => Ok(Self {
                port1: ecal_port,
                port2: ecal_port.other(),
            }),
            2 => Ok(Self {
                port1: ecal_port.other(),
                port2: ecal_port,
            }),
            other => Err(CalError::UnknownVnaPort(other)),
        }
    }
}

/// A switchable standard inside an ECal module
///
/// The id is the gate word that presents the standard. Characterization data
/// is fetched once by the module and cached here; it is absent when the module
/// never delivered it.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationStandard {
    id: u16,
    scope: CorrectionSetScope,
    network: Option<Network>,
}

impl CalibrationStandard {
    pub fn new(id: u16, scope: CorrectionSetScope, network: Option<Network>) -> Self {
        Self { id, scope, network }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn scope(&self) -> CorrectionSetScope {
        self.scope
    }

    /// Ideal characterization of the standard on the module's native grid
    pub fn network(&self) -> Option<&Network> {
        self.network.as_ref()
    }

    /// Characterization data, or [`CalError::MissingStandardData`]
    pub fn require_network(&self) -> Result<&Network, CalError> {
        self.network
            .as_ref()
            .ok_or(CalError::MissingStandardData { id: self.id })
    }
}

/// An electronic calibration module
pub trait EcalModule {
    fn model(&self) -> &str;

    fn serial_number(&self) -> &str;

    fn connector_type(&self) -> &str;

    /// Frequency range covered by the characterization data
    fn frequency(&self) -> Frequency;

    /// Standards of one correction set, in module order
    fn standards(&self, scope: CorrectionSetScope) -> &[CalibrationStandard];

    /// Switch the module to present `standard`
    fn activate(&mut self, standard: &CalibrationStandard) -> Result<()>;

    /// Open all gates
    fn isolate(&mut self) -> Result<()>;

    /// Short label used in operator messages and logs
    fn label(&self) -> String {
        format!("ECal {} s/n {}", self.model(), self.serial_number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_map() {
        let map = PortMap::default();
        assert_eq!(map.ecal_port(1), Ok(EcalPort::A));
        assert_eq!(map.ecal_port(2), Ok(EcalPort::B));
        assert_eq!(map.ecal_port(3), Err(CalError::UnknownVnaPort(3)));

        let swapped = PortMap::with_port(1, EcalPort::B).unwrap();
        assert_eq!(swapped.port2, EcalPort::A);
    }

    #[test]
    fn test_missing_standard_data() {
        let std = CalibrationStandard::new(0x0102, CorrectionSetScope::PortA, None);
        assert_eq!(
            std.require_network().unwrap_err().to_string(),
            "standard 0x0102 has no characterization data"
        );
    }
}
