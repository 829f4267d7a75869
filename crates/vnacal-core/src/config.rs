//! Wizard configuration
//!
//! Loaded from TOML. Every key is optional:
//!
//! ```toml
//! allow_incomplete = false
//! auto_orient = false
//!
//! [port_map]
//! port1 = "A"
//! port2 = "B"
//!
//! [crossover]
//! frequency = "center"          # or a number in Hz, "prefer_low", "prefer_high"
//! single_source = "high_over_low"
//! soft_limits_hz = [4.0e9, 6.0e9]
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::crossover::{CoverageCrossoverPolicy, CrossoverFrequency, SingleSourcePreference};
use crate::frequency::{Frequency, FrequencyUnit};
use crate::instrument::PortMap;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Crossover section
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrossoverConfig {
    pub frequency: CrossoverFrequency,
    pub single_source: SingleSourcePreference,
    /// Window the crossover must fall in, `[start, stop]` in Hz
    pub soft_limits_hz: Option<[f64; 2]>,
}

/// Settings for [`CalWizard`](crate::wizard::CalWizard)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WizardConfig {
    /// Calibrate what is covered instead of failing on gaps
    pub allow_incomplete: bool,
    /// Detect the connected ECal port instead of trusting `port_map`
    pub auto_orient: bool,
    pub port_map: PortMap,
    pub crossover: CrossoverConfig,
}

impl WizardConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: WizardConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port_map.port1 == self.port_map.port2 {
            return Err(ConfigError::Invalid(format!(
                "port_map assigns ECal port {} to both VNA ports",
                self.port_map.port1
            )));
        }
        if let CrossoverFrequency::Hz(hz) = self.crossover.frequency {
            if !hz.is_finite() || hz < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "crossover frequency {hz} Hz is not a valid frequency"
                )));
            }
        }
        if let Some([start, stop]) = self.crossover.soft_limits_hz {
            if !(start.is_finite() && stop.is_finite() && start < stop) {
                return Err(ConfigError::Invalid(format!(
                    "soft_limits_hz [{start}, {stop}] must be increasing"
                )));
            }
        }
        Ok(())
    }

    /// Crossover policy described by the `[crossover]` section
    pub fn policy(&self) -> Result<CoverageCrossoverPolicy, ConfigError> {
        let soft_limits = match self.crossover.soft_limits_hz {
            Some([start, stop]) => Some(
                Frequency::from_f(vec![start, stop], FrequencyUnit::Hz)
                    .map_err(|e| ConfigError::Invalid(format!("soft_limits_hz: {e}")))?,
            ),
            None => None,
        };
        Ok(CoverageCrossoverPolicy::new(
            self.crossover.frequency,
            self.crossover.single_source,
            soft_limits,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::EcalPort;

    #[test]
    fn test_defaults() {
        let config = WizardConfig::from_toml_str("").unwrap();
        assert_eq!(config, WizardConfig::default());
        assert!(!config.allow_incomplete);
        assert_eq!(config.crossover.frequency, CrossoverFrequency::Center);
        assert_eq!(
            config.crossover.single_source,
            SingleSourcePreference::HighOverLow
        );
        assert_eq!(config.port_map, PortMap::default());
    }

    #[test]
    fn test_full_config() {
        let config = WizardConfig::from_toml_str(
            r#"
            allow_incomplete = true
            auto_orient = true

            [port_map]
            port1 = "B"
            port2 = "A"

            [crossover]
            frequency = 5.5e9
            single_source = "only_low"
            soft_limits_hz = [4.0e9, 6.0e9]
            "#,
        )
        .unwrap();

        assert!(config.allow_incomplete);
        assert!(config.auto_orient);
        assert_eq!(config.port_map.port1, EcalPort::B);
        assert_eq!(config.crossover.frequency, CrossoverFrequency::Hz(5.5e9));

        let policy = config.policy().unwrap();
        assert_eq!(policy.single_source(), SingleSourcePreference::OnlyLow);
        let empty = Frequency::empty();
        assert_eq!(policy.soft_limits(&empty, &empty), (4.0e9, 6.0e9));
    }

    #[test]
    fn test_named_crossover() {
        let config = WizardConfig::from_toml_str("[crossover]\nfrequency = \"prefer_high\"").unwrap();
        assert_eq!(config.crossover.frequency, CrossoverFrequency::PreferHigh);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            WizardConfig::from_toml_str("[port_map]\nport1 = \"B\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            WizardConfig::from_toml_str("[crossover]\nsoft_limits_hz = [6e9, 4e9]"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            WizardConfig::from_toml_str("[crossover]\nfrequency = \"middle\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            WizardConfig::from_toml_str("unknown_key = 1"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            WizardConfig::load("/nonexistent/vnacal.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
