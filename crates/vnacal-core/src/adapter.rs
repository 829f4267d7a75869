//! RF adapters between the VNA test-port cable and an ECal port
//!
//! Port 1 of an adapter always faces the VNA, port 2 faces the ECal.

use std::fmt;

use anyhow::{bail, Result};

use crate::network::Network;

/// Connector gender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorGender {
    Male,
    Female,
    Genderless,
}

impl ConnectorGender {
    /// Suffix used in adapter labels ("M", "F" or nothing)
    fn suffix(&self) -> &'static str {
        match self {
            ConnectorGender::Male => "M",
            ConnectorGender::Female => "F",
            ConnectorGender::Genderless => "",
        }
    }
}

/// One side of an RF connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RfPort {
    pub connector_type: String,
    pub gender: ConnectorGender,
}

impl RfPort {
    pub fn new(connector_type: impl Into<String>, gender: ConnectorGender) -> Self {
        Self {
            connector_type: connector_type.into(),
            gender,
        }
    }

    /// True when the two connectors can be mated directly
    pub fn mates_with(&self, other: &RfPort) -> bool {
        if self.connector_type != other.connector_type {
            return false;
        }
        matches!(
            (self.gender, other.gender),
            (ConnectorGender::Genderless, ConnectorGender::Genderless)
                | (ConnectorGender::Male, ConnectorGender::Female)
                | (ConnectorGender::Female, ConnectorGender::Male)
        )
    }
}

impl fmt::Display for RfPort {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}{}", self.connector_type, self.gender.suffix())
    }
}

/// A characterized 2-port adapter
#[derive(Debug, Clone)]
pub struct RfAdapter {
    port1: RfPort,
    port2: RfPort,
    network: Network,
    model: Option<String>,
    serial_number: Option<String>,
}

impl RfAdapter {
    pub fn new(port1: RfPort, port2: RfPort, network: Network) -> Result<Self> {
        if network.nports() != 2 {
            bail!("Adapter data must be a 2-port network, got {} ports", network.nports());
        }
        Ok(Self {
            port1,
            port2,
            network,
            model: None,
            serial_number: None,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    /// Side facing the VNA
    pub fn port1(&self) -> &RfPort {
        &self.port1
    }

    /// Side facing the ECal
    pub fn port2(&self) -> &RfPort {
        &self.port2
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Fail unless port 2 mates with the ECal connector
    pub fn check_mates(&self, ecal: &RfPort) -> Result<()> {
        if !self.port2.mates_with(ecal) {
            bail!("{} cannot be mated to {}", self.port2, ecal);
        }
        Ok(())
    }

    /// Label in the form `Adapter 35M to 35F Model:SM3310 SN:0001`
    pub fn label(&self) -> String {
        let mut label = format!("Adapter {} to {}", self.port1, self.port2);
        if let Some(model) = &self.model {
            label.push_str(&format!(" Model:{model}"));
        }
        if let Some(serial) = &self.serial_number {
            label.push_str(&format!(" SN:{serial}"));
        }
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::{Frequency, FrequencyUnit, SweepType};
    use ndarray::Array3;
    use num_complex::Complex64;

    fn thru() -> Network {
        let freq = Frequency::new(1.0, 2.0, 2, FrequencyUnit::GHz, SweepType::Linear).unwrap();
        let mut s = Array3::<Complex64>::zeros((2, 2, 2));
        for f in 0..2 {
            s[[f, 1, 0]] = Complex64::new(1.0, 0.0);
            s[[f, 0, 1]] = Complex64::new(1.0, 0.0);
        }
        Network::from_s(freq, s)
    }

    #[test]
    fn test_mating() {
        let male = RfPort::new("3.5mm", ConnectorGender::Male);
        let female = RfPort::new("3.5mm", ConnectorGender::Female);
        let apc7 = RfPort::new("APC-7", ConnectorGender::Genderless);

        assert!(male.mates_with(&female));
        assert!(!male.mates_with(&male));
        assert!(apc7.mates_with(&apc7.clone()));
        assert!(!apc7.mates_with(&female));
    }

    #[test]
    fn test_label() {
        let adapter = RfAdapter::new(
            RfPort::new("35", ConnectorGender::Male),
            RfPort::new("35", ConnectorGender::Female),
            thru(),
        )
        .unwrap()
        .with_model("SM3310")
        .with_serial_number("0001");

        assert_eq!(adapter.label(), "Adapter 35M to 35F Model:SM3310 SN:0001");
        assert!(adapter.check_mates(&RfPort::new("35", ConnectorGender::Male)).is_ok());
        assert!(adapter.check_mates(&RfPort::new("35", ConnectorGender::Female)).is_err());
    }

    #[test]
    fn test_rejects_one_port_data() {
        let freq = Frequency::new(1.0, 2.0, 2, FrequencyUnit::GHz, SweepType::Linear).unwrap();
        let load = Network::constant_reflect(freq, Complex64::new(0.0, 0.0));
        let port = RfPort::new("N", ConnectorGender::Male);
        assert!(RfAdapter::new(port.clone(), port, load).is_err());
    }
}
