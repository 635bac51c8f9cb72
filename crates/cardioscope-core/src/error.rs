//! Error types for the Cardioscope pipeline
//!
//! This module provides error types that work in `no_std` environments.
//! Errors carry enough context to be logged directly without heap
//! allocation.

use core::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration Errors
// ============================================================================

/// Errors raised while validating acquisition settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Requested sample rate is outside the supported range
    SampleRateOutOfRange {
        /// Requested sample rate in Hz
        requested_hz: u16,
        /// Lowest accepted rate in Hz
        min_hz: u16,
        /// Highest accepted rate in Hz
        max_hz: u16,
    },
    /// Buffer capacity must hold at least one sample
    ZeroCapacity,
    /// Low-pass cutoff is not usable
    InvalidCutoff {
        /// Description of the issue
        reason: &'static str,
    },
    /// A timer period of zero would spin the scheduler
    ZeroPeriod {
        /// Which timer was misconfigured
        timer: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SampleRateOutOfRange { requested_hz, min_hz, max_hz } => {
                write!(
                    f,
                    "Sample rate {requested_hz} Hz outside supported range {min_hz}-{max_hz} Hz"
                )
            }
            Self::ZeroCapacity => write!(f, "Buffer capacity must be at least 1 sample"),
            Self::InvalidCutoff { reason } => write!(f, "Invalid low-pass cutoff: {reason}"),
            Self::ZeroPeriod { timer } => write!(f, "{timer} period must be non-zero"),
        }
    }
}

// ============================================================================
// Processing Errors
// ============================================================================

/// Errors from the per-tick signal processing pass.
///
/// These are reported for the tick that produced them; the next tick starts
/// from a fresh snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingError {
    /// A sample in the snapshot is NaN or infinite
    NonFiniteInput {
        /// Position of the offending sample
        index: usize,
    },
    /// The smoothing pass produced a NaN or infinite value
    NonFiniteOutput {
        /// Position of the offending output value
        index: usize,
    },
    /// Transform output length does not match the snapshot
    LengthMismatch {
        /// Snapshot length
        expected: usize,
        /// Produced length
        actual: usize,
    },
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteInput { index } => {
                write!(f, "Non-finite sample at index {index}")
            }
            Self::NonFiniteOutput { index } => {
                write!(f, "Smoothing produced a non-finite value at index {index}")
            }
            Self::LengthMismatch { expected, actual } => {
                write!(f, "Smoothed length {actual} does not match snapshot length {expected}")
            }
        }
    }
}

// ============================================================================
// Protocol Errors
// ============================================================================

/// Reasons a line received from the sensor was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolError {
    /// Line bytes are not valid UTF-8
    InvalidUtf8,
    /// Line is not a decimal number
    InvalidNumber {
        /// Length of the rejected line in bytes
        len: usize,
    },
    /// Line parsed to NaN or infinity
    NonFinite,
    /// No line terminator seen within the length limit
    LineTooLong {
        /// Bytes accumulated before the line was discarded
        len: usize,
        /// Maximum accepted line length
        max: usize,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUtf8 => write!(f, "Line is not valid UTF-8"),
            Self::InvalidNumber { len } => write!(f, "Line of {len} bytes is not a number"),
            Self::NonFinite => write!(f, "Sample is not a finite number"),
            Self::LineTooLong { len, max } => {
                write!(f, "Line exceeded {max} bytes ({len} buffered) without terminator")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for ProcessingError {}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}

// ============================================================================
// Tests
// ============================================================================
