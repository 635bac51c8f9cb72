//! Cardioscope Native - Host acquisition and signal processing
//!
//! This crate provides the host side of the Cardioscope pipeline:
//! - Serial device link with discovery and reconnection
//! - Bounded sample buffering
//! - Fourier low-pass smoothing and peak-based heart rate
//! - A single-threaded acquisition scheduler
//! - Session summary export
//!
//! # Modules
//!
//! - [`bridge`]: Serial transport and device link lifecycle
//! - [`processing`]: Sample buffer, smoothing, and heart-rate estimation
//! - [`scheduler`]: Sampling and reconnect tasks plus acquisition state
//! - [`export`]: Session summary statistics and CSV records
//! - [`viz`]: Presentation contract consumed by the scheduler
//! - [`config`]: File and default configuration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod bridge;
pub mod config;
pub mod export;
pub mod processing;
pub mod scheduler;
pub mod viz;

// Re-export key types
pub use bridge::{DeviceLinkManager, LinkStatus, PortBackend, SystemPorts};
pub use config::AppConfig;
pub use export::{ExportError, SessionExporter, SessionSummary};
pub use processing::{ProcessedFrame, SampleBuffer, SignalProcessor};
pub use scheduler::{AcquisitionScheduler, AcquisitionState, ControlCommand};
pub use viz::{Diagnostic, LogPresenter, Presenter, Theme};
