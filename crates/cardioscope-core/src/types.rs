//! Core data types for the Cardioscope pipeline
//!
//! Sampling configuration, per-tick heart-rate estimates and the constants
//! shared between the device link, the processor and the exporter.

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ============================================================================
// Constants
// ============================================================================

/// Fixed serial baud rate of the sensor.
pub const BAUD_RATE: u32 = 9600;

/// Lowest supported sample rate (Hz).
pub const MIN_SAMPLE_RATE_HZ: u16 = 30;

/// Highest supported sample rate (Hz).
pub const MAX_SAMPLE_RATE_HZ: u16 = 250;

/// Default sample rate (Hz).
pub const DEFAULT_SAMPLE_RATE_HZ: u16 = 30;

/// Default number of samples kept in the ring buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1000;

/// Default low-pass cutoff expressed as a DFT coefficient index.
pub const DEFAULT_CUTOFF_BIN: usize = 200;

/// Minimum horizontal distance between two heartbeat peaks (samples).
pub const DEFAULT_PEAK_MIN_DISTANCE: usize = 30;

/// Default period of the reconnect task (ms).
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 5000;

// ============================================================================
// Sampling Configuration
// ============================================================================

/// Acquisition sampling configuration.
///
/// The sample rate drives both the sampling tick period and the time axis
/// used when converting peak intervals to beats per minute.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingConfig {
    sample_rate_hz: u16,
}

impl SamplingConfig {
    /// Create a validated sampling configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SampleRateOutOfRange`] outside 30-250 Hz.
    pub const fn new(sample_rate_hz: u16) -> Result<Self, ConfigError> {
        if sample_rate_hz < MIN_SAMPLE_RATE_HZ || sample_rate_hz > MAX_SAMPLE_RATE_HZ {
            return Err(ConfigError::SampleRateOutOfRange {
                requested_hz: sample_rate_hz,
                min_hz: MIN_SAMPLE_RATE_HZ,
                max_hz: MAX_SAMPLE_RATE_HZ,
            });
        }
        Ok(Self { sample_rate_hz })
    }

    /// Sample rate in Hz.
    #[inline]
    pub const fn sample_rate_hz(&self) -> u16 {
        self.sample_rate_hz
    }

    /// Sample rate as a float, for time-axis math.
    #[inline]
    pub fn sample_rate(&self) -> f64 {
        f64::from(self.sample_rate_hz)
    }

    /// Sampling tick period in whole milliseconds (`1000 / rate`, truncated).
    #[inline]
    pub const fn tick_period_ms(&self) -> u64 {
        1000 / self.sample_rate_hz as u64
    }

    /// Convert an interval measured in samples to seconds.
    #[inline]
    pub fn samples_to_seconds(&self, samples: usize) -> f64 {
        samples as f64 / self.sample_rate()
    }

    /// Time axis for a window of `len` samples.
    ///
    /// Evenly spaced from `0` to `len / fs` inclusive, so the last point sits
    /// exactly at the window duration.
    pub fn time_axis(&self, len: usize) -> Vec<f64> {
        match len {
            0 => Vec::new(),
            1 => alloc::vec![0.0],
            _ => {
                let duration = len as f64 / self.sample_rate();
                let step = duration / (len - 1) as f64;
                (0..len).map(|i| i as f64 * step).collect()
            }
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ }
    }
}

// ============================================================================
// Heart Rate
// ============================================================================

/// Instantaneous heart rate between two consecutive peaks.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeakEstimate {
    /// Buffer index of the later peak of the pair
    pub sample_index: usize,
    /// Beats per minute over the interval ending at `sample_index`
    pub bpm: f64,
}

/// Heart-rate view of one buffer snapshot.
///
/// `NoData` is the expected outcome for flat or short windows and is not an
/// error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum HeartRate {
    /// Fewer than two peaks were detected
    #[default]
    NoData,
    /// At least one inter-peak interval is available
    Estimate {
        /// Per-interval estimates in peak order
        beats: Vec<PeakEstimate>,
        /// Arithmetic mean of the instantaneous rates
        average_bpm: f64,
    },
}

impl HeartRate {
    /// Build an estimate from instantaneous readings, or `NoData` when empty.
    pub fn from_beats(beats: Vec<PeakEstimate>) -> Self {
        if beats.is_empty() {
            return Self::NoData;
        }
        let average_bpm = beats.iter().map(|b| b.bpm).sum::<f64>() / beats.len() as f64;
        Self::Estimate { beats, average_bpm }
    }

    /// Check whether a numeric estimate exists.
    #[inline]
    pub fn has_data(&self) -> bool {
        matches!(self, Self::Estimate { .. })
    }

    /// Average BPM, if available.
    pub fn average_bpm(&self) -> Option<f64> {
        match self {
            Self::NoData => None,
            Self::Estimate { average_bpm, .. } => Some(*average_bpm),
        }
    }

    /// Per-interval estimates (empty for `NoData`).
    pub fn beats(&self) -> &[PeakEstimate] {
        match self {
            Self::NoData => &[],
            Self::Estimate { beats, .. } => beats,
        }
    }

    /// Slowest instantaneous rate.
    pub fn min_bpm(&self) -> Option<f64> {
        self.beats().iter().map(|b| b.bpm).reduce(f64::min)
    }

    /// Fastest instantaneous rate.
    pub fn max_bpm(&self) -> Option<f64> {
        self.beats().iter().map(|b| b.bpm).reduce(f64::max)
    }
}

// ============================================================================
// Tests
// ============================================================================
