//! Device Configuration
//!
//! Loaded from an optional file, then overridden by `SPP_`-prefixed
//! environment variables. Nested keys use a double underscore, e.g.
//! `SPP_ACQUISITION__PERIOD_NS=500000`.

use crate::DeviceError;
use acquisition::AcquisitionConfig;
use bus_transport::{MockBehavior, SpiSettings};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SPP";

/// Everything needed to bring up a sampler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Pool, period and teardown settings
    pub acquisition: AcquisitionConfig,
    /// Bus parameters
    pub spi: SpiSettings,
    /// Behavior of the simulated transport
    pub mock: MockBehavior,
    /// How long the runner samples before stopping (0 = until interrupted)
    pub run_for_ms: u64,
    /// Converter reference voltage in millivolts
    pub vref_mv: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            acquisition: AcquisitionConfig::default(),
            spi: SpiSettings::default(),
            mock: MockBehavior::default(),
            run_for_ms: 0,
            vref_mv: 2500,
        }
    }
}

impl DeviceConfig {
    /// Load from `path` (if any) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, DeviceError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    pub(crate) fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self, DeviceError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        Self::from_builder(builder.add_source(
            Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        ))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, DeviceError> {
        let config: DeviceConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section
    pub fn validate(&self) -> Result<(), DeviceError> {
        self.acquisition.validate()?;
        self.spi.validate()?;
        if self.vref_mv == 0 {
            return Err(DeviceError::InvalidArgument("vref_mv must be > 0".into()));
        }
        Ok(())
    }

    /// Reference voltage in volts
    pub fn vref(&self) -> f64 {
        f64::from(self.vref_mv) / 1000.0
    }

    /// Run length, `None` meaning until interrupted
    pub fn run_for(&self) -> Option<Duration> {
        (self.run_for_ms > 0).then(|| Duration::from_millis(self.run_for_ms))
    }
}
