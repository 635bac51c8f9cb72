//! Signal processing pipelines
//!
//! This module provides per-tick processing of the sample window:
//! - [`buffer`]: Fixed-capacity ring buffer of recent samples
//! - [`fft`]: Fourier low-pass smoothing
//! - [`peaks`]: Peak detection and heart-rate estimation
//! - [`pipeline`]: Both views computed from one snapshot

pub mod buffer;
pub mod fft;
pub mod peaks;
pub mod pipeline;

pub use buffer::SampleBuffer;
pub use fft::{CutoffPolicy, SpectralSmoother, Zeroing};
pub use peaks::PeakDetector;
pub use pipeline::{ProcessedFrame, SignalProcessor};
