//! Per-tick processing of a buffer snapshot
//!
//! Computes the two derived views of the window (smoothed signal and heart
//! rate) from scratch on every call. No state carries over between ticks
//! apart from FFT plans.

use serde::Serialize;

use cardioscope_core::error::ProcessingError;
use cardioscope_core::math;
use cardioscope_core::types::{HeartRate, SamplingConfig};

use super::fft::{CutoffPolicy, SpectralSmoother, Zeroing};
use super::peaks::PeakDetector;

/// Everything the presentation layer needs for one redraw.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProcessedFrame {
    /// Raw snapshot, oldest first
    pub raw: Vec<f64>,
    /// Seconds since the start of the window, one per sample
    pub time_axis: Vec<f64>,
    /// Low-passed snapshot (same length as `raw`)
    pub smoothed: Vec<f64>,
    /// Peak-based heart rate, or `NoData`
    pub heart_rate: HeartRate,
}

impl ProcessedFrame {
    /// Number of samples in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Check if the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Window duration in seconds.
    #[must_use]
    pub fn duration_s(&self) -> f64 {
        self.time_axis.last().copied().unwrap_or(0.0)
    }
}

/// Smoothing plus heart-rate estimation.
pub struct SignalProcessor {
    smoother: SpectralSmoother,
    detector: PeakDetector,
}

impl SignalProcessor {
    /// Create a processor.
    #[must_use]
    pub fn new(cutoff: CutoffPolicy, detector: PeakDetector) -> Self {
        Self {
            smoother: SpectralSmoother::new(cutoff),
            detector,
        }
    }

    /// Select which spectrum indices the cutoff clears.
    #[must_use]
    pub fn with_zeroing(mut self, zeroing: Zeroing) -> Self {
        self.smoother = self.smoother.with_zeroing(zeroing);
        self
    }

    /// Peak detector shared with the exporter.
    #[must_use]
    pub fn detector(&self) -> PeakDetector {
        self.detector
    }

    /// Low-pass cutoff.
    #[must_use]
    pub fn cutoff(&self) -> CutoffPolicy {
        self.smoother.cutoff()
    }

    /// Process one snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError`] when the snapshot or the smoothed output
    /// contains non-finite values.
    pub fn process(
        &mut self,
        snapshot: Vec<f64>,
        config: &SamplingConfig,
    ) -> Result<ProcessedFrame, ProcessingError> {
        if let Some(index) = math::first_non_finite(&snapshot) {
            return Err(ProcessingError::NonFiniteInput { index });
        }

        let smoothed = self.smoother.smooth(&snapshot, config.sample_rate());
        if smoothed.len() != snapshot.len() {
            return Err(ProcessingError::LengthMismatch {
                expected: snapshot.len(),
                actual: smoothed.len(),
            });
        }
        if let Some(index) = math::first_non_finite(&smoothed) {
            return Err(ProcessingError::NonFiniteOutput { index });
        }

        let heart_rate = self.detector.heart_rate(&snapshot, config);
        let time_axis = config.time_axis(snapshot.len());

        Ok(ProcessedFrame {
            raw: snapshot,
            time_axis,
            smoothed,
            heart_rate,
        })
    }
}

impl Default for SignalProcessor {
    fn default() -> Self {
        Self::new(CutoffPolicy::default(), PeakDetector::default())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_frame_shapes() {
        let config = SamplingConfig::new(100).unwrap();
        let snapshot: Vec<f64> = (0..500).map(|i| (f64::from(i) * 0.1).sin()).collect();

        let frame = SignalProcessor::default().process(snapshot.clone(), &config).unwrap();

        assert_eq!(frame.raw, snapshot);
        assert_eq!(frame.len(), 500);
        assert_eq!(frame.time_axis.len(), 500);
        assert_eq!(frame.smoothed.len(), 500);
        assert!((frame.duration_s() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot_is_not_an_error() {
        let frame = SignalProcessor::default()
            .process(Vec::new(), &SamplingConfig::default())
            .unwrap();

        assert!(frame.is_empty());
        assert_eq!(frame.heart_rate, HeartRate::NoData);
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let result = SignalProcessor::default()
            .process(vec![1.0, f64::INFINITY, 2.0], &SamplingConfig::default());

        assert_eq!(result, Err(ProcessingError::NonFiniteInput { index: 1 }));
    }

    #[test]
    fn test_zeroing_mode_sets_smoothed_amplitude() {
        let config = SamplingConfig::new(100).unwrap();
        let snapshot: Vec<f64> = (0..1000)
            .map(|i| (2.0 * PI * 4.0 * f64::from(i) / 1000.0).cos())
            .collect();

        let one_sided = SignalProcessor::default().process(snapshot.clone(), &config).unwrap();
        let symmetric = SignalProcessor::default()
            .with_zeroing(Zeroing::Symmetric)
            .process(snapshot, &config)
            .unwrap();

        assert!((one_sided.smoothed[0] - 0.5).abs() < 1e-9);
        assert!((symmetric.smoothed[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_smoothing_never_adds_peaks() {
        // 1.5 Hz carrier with 40 Hz ripple, sampled at 250 Hz
        let config = SamplingConfig::new(250).unwrap();
        let snapshot: Vec<f64> = (0..1000)
            .map(|i| {
                let t = f64::from(i) / 250.0;
                (2.0 * PI * 1.5 * t).sin() + 0.3 * (2.0 * PI * 40.0 * t).sin()
            })
            .collect();

        let mut processor = SignalProcessor::new(CutoffPolicy::Hz(5.0), PeakDetector::new(1));
        let frame = processor.process(snapshot, &config).unwrap();

        let raw_peaks = PeakDetector::new(1).find_peaks(&frame.raw, f64::MIN);
        let smooth_peaks = PeakDetector::new(1).find_peaks(&frame.smoothed, f64::MIN);

        // Four seconds of a 1.5 Hz carrier
        assert!(smooth_peaks.len() <= raw_peaks.len());
        assert!(raw_peaks.len() > 20);
        assert_eq!(smooth_peaks.len(), 6);
    }
}
