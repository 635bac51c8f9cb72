//! Application configuration
//!
//! Settings are read from an optional TOML file; every key has a default so
//! an empty file (or none at all) is valid. Command-line flags are applied
//! on top by the binary before [`AppConfig::validate`] runs.
//!
//! ```toml
//! sample_rate_hz = 100
//! dark_theme = true
//! port = "/dev/ttyUSB0"
//! buffer_capacity = 1000
//! reconnect_interval_ms = 5000
//! connect_timeout_ms = 2000
//! peak_min_distance = 30
//! cutoff = { hz = 15.0 }
//! zeroing = "one-sided"
//! export_path = "session.csv"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use cardioscope_core::error::ConfigError;
use cardioscope_core::types::{
    SamplingConfig, BAUD_RATE, DEFAULT_BUFFER_CAPACITY, DEFAULT_PEAK_MIN_DISTANCE,
    DEFAULT_RECONNECT_INTERVAL_MS, DEFAULT_SAMPLE_RATE_HZ,
};

use crate::bridge::serial::DEFAULT_CONNECT_TIMEOUT;
use crate::bridge::LinkConfig;
use crate::processing::{CutoffPolicy, PeakDetector, Zeroing};
use crate::viz::Theme;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum AppConfigError {
    /// The file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or has unknown keys
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Config validation error: {0}")]
    Invalid(#[from] ConfigError),
}

/// Full application configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Sampling rate in Hz (30-250)
    pub sample_rate_hz: u16,

    /// Start with the dark theme
    pub dark_theme: bool,

    /// Only connect to this port
    pub port: Option<String>,

    /// Ring buffer capacity (samples)
    pub buffer_capacity: usize,

    /// Reconnect task period (ms)
    pub reconnect_interval_ms: u64,

    /// Bound on a single port open (ms)
    pub connect_timeout_ms: u64,

    /// Minimum distance between heartbeat peaks (samples)
    pub peak_min_distance: usize,

    /// Low-pass cutoff
    pub cutoff: CutoffPolicy,

    /// Spectrum indices cleared by the cutoff
    pub zeroing: Zeroing,

    /// Default destination for exports
    pub export_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            dark_theme: false,
            port: None,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
            connect_timeout_ms: u64::try_from(DEFAULT_CONNECT_TIMEOUT.as_millis())
                .unwrap_or(u64::MAX),
            peak_min_distance: DEFAULT_PEAK_MIN_DISTANCE,
            cutoff: CutoffPolicy::default(),
            zeroing: Zeroing::default(),
            export_path: None,
        }
    }
}

impl AppConfig {
    /// Load and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AppConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, otherwise use defaults.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, AppConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate TOML text.
    ///
    /// # Errors
    ///
    /// Returns error if the text is invalid or a value is out of range.
    pub fn from_toml_str(content: &str) -> Result<Self, AppConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value is in range.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        SamplingConfig::new(self.sample_rate_hz)?;
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.reconnect_interval_ms == 0 {
            return Err(ConfigError::ZeroPeriod { timer: "reconnect" });
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::ZeroPeriod { timer: "connect timeout" });
        }
        self.cutoff.validate()
    }

    /// Validated sampling configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SampleRateOutOfRange`] for an invalid rate.
    pub fn sampling(&self) -> Result<SamplingConfig, ConfigError> {
        SamplingConfig::new(self.sample_rate_hz)
    }

    /// Device link settings.
    #[must_use]
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            baud_rate: BAUD_RATE,
            port_override: self.port.clone(),
        }
    }

    /// Reconnect task period.
    #[must_use]
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    /// Port open timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Initial theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        Theme::from_dark(self.dark_theme)
    }

    /// Peak detector for live view and export.
    #[must_use]
    pub fn peak_detector(&self) -> PeakDetector {
        PeakDetector::new(self.peak_min_distance)
    }
}

// ============================================================================
// Tests
// ============================================================================
