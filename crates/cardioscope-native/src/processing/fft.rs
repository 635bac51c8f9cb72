//! FFT-based low-pass smoothing
//!
//! The window is transformed, every coefficient from the cutoff index up is
//! zeroed, and the inverse transform's real part becomes the smoothed signal.
//!
//! With the default [`Zeroing::OneSided`] the negative-frequency mirrors of
//! the kept bins are discarded too, so every kept non-DC component comes out
//! at half amplitude. [`Zeroing::Symmetric`] keeps the mirrors and returns the
//! band-limited signal at full amplitude.

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

use cardioscope_core::error::ConfigError;
use cardioscope_core::types::DEFAULT_CUTOFF_BIN;

/// Where the low-pass filter cuts the spectrum.
///
/// A fixed bin keeps the same number of coefficients for any window length,
/// so its cutoff in Hz moves with the window length and the sample rate. A
/// cutoff in Hz is converted to a bin for each window instead.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutoffPolicy {
    /// Keep DFT coefficients with frequency index below this bin
    Bin(usize),
    /// Keep frequencies below this value in Hz
    Hz(f64),
}

impl CutoffPolicy {
    /// Validate the policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCutoff`] for a zero bin or a
    /// non-positive frequency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Bin(0) => Err(ConfigError::InvalidCutoff { reason: "bin must be at least 1" }),
            Self::Hz(hz) if !hz.is_finite() || hz <= 0.0 => {
                Err(ConfigError::InvalidCutoff { reason: "frequency must be positive" })
            }
            _ => Ok(()),
        }
    }

    /// First discarded frequency index for a window of `len` samples.
    ///
    /// Never below 1, so the DC component always survives.
    #[must_use]
    pub fn bin_for(&self, len: usize, sample_rate: f64) -> usize {
        match *self {
            Self::Bin(bin) => bin.max(1),
            Self::Hz(hz) => {
                let bin = (hz * len as f64 / sample_rate).round();
                if bin.is_finite() && bin >= 1.0 {
                    bin as usize
                } else {
                    1
                }
            }
        }
    }

    /// Cutoff frequency in Hz for a window of `len` samples.
    #[must_use]
    pub fn cutoff_hz(&self, len: usize, sample_rate: f64) -> f64 {
        if len == 0 {
            return 0.0;
        }
        self.bin_for(len, sample_rate) as f64 * sample_rate / len as f64
    }
}

impl Default for CutoffPolicy {
    fn default() -> Self {
        Self::Bin(DEFAULT_CUTOFF_BIN)
    }
}

/// Which spectrum indices the cutoff clears.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Zeroing {
    /// Clear every index `k >= cutoff`
    #[default]
    OneSided,
    /// Clear index `k` when `min(k, n - k) >= cutoff`
    Symmetric,
}

impl Zeroing {
    /// Zero the selected coefficients of `spectrum` in place.
    pub fn apply(self, spectrum: &mut [Complex<f64>], cutoff: usize) {
        let n = spectrum.len();
        match self {
            Self::OneSided => {
                if let Some(tail) = spectrum.get_mut(cutoff..) {
                    tail.fill(Complex::new(0.0, 0.0));
                }
            }
            Self::Symmetric => {
                for (k, coeff) in spectrum.iter_mut().enumerate() {
                    if k.min(n - k) >= cutoff {
                        *coeff = Complex::new(0.0, 0.0);
                    }
                }
            }
        }
    }
}

/// Fourier low-pass smoother
pub struct SpectralSmoother {
    cutoff: CutoffPolicy,
    zeroing: Zeroing,
    planner: FftPlanner<f64>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl SpectralSmoother {
    /// Create a new smoother
    ///
    /// # Arguments
    ///
    /// * `cutoff` - Where to cut the spectrum
    #[must_use]
    pub fn new(cutoff: CutoffPolicy) -> Self {
        Self {
            cutoff,
            zeroing: Zeroing::default(),
            planner: FftPlanner::new(),
            buffer: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Configured cutoff.
    #[must_use]
    pub fn cutoff(&self) -> CutoffPolicy {
        self.cutoff
    }

    /// Use `zeroing` instead of [`Zeroing::OneSided`].
    #[must_use]
    pub fn with_zeroing(mut self, zeroing: Zeroing) -> Self {
        self.zeroing = zeroing;
        self
    }

    /// Configured zeroing mode.
    #[must_use]
    pub fn zeroing(&self) -> Zeroing {
        self.zeroing
    }

    /// Low-pass `samples` and return a signal of the same length.
    ///
    /// Windows no longer than the cutoff bin pass through unchanged apart
    /// from floating-point rounding.
    pub fn smooth(&mut self, samples: &[f64], sample_rate: f64) -> Vec<f64> {
        let n = samples.len();
        if n == 0 {
            return Vec::new();
        }

        self.buffer.clear();
        self.buffer.extend(samples.iter().map(|&s| Complex::new(s, 0.0)));

        let forward = self.planner.plan_fft_forward(n);
        self.scratch.resize(forward.get_inplace_scratch_len(), Complex::new(0.0, 0.0));
        forward.process_with_scratch(&mut self.buffer, &mut self.scratch);

        self.zeroing.apply(&mut self.buffer, self.cutoff.bin_for(n, sample_rate));

        let inverse = self.planner.plan_fft_inverse(n);
        self.scratch.resize(inverse.get_inplace_scratch_len(), Complex::new(0.0, 0.0));
        inverse.process_with_scratch(&mut self.buffer, &mut self.scratch);

        // rustfft leaves the inverse unnormalized
        let norm = 1.0 / n as f64;
        self.buffer.iter().map(|c| c.re * norm).collect()
    }
}

impl Default for SpectralSmoother {
    fn default() -> Self {
        Self::new(CutoffPolicy::default())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq_hz: f64, sample_rate: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_output_length_matches_input() {
        let mut smoother = SpectralSmoother::default();

        for len in [0, 1, 5, 399, 1000] {
            let samples = sine(2.0, 250.0, len);
            assert_eq!(smoother.smooth(&samples, 250.0).len(), len);
        }
    }

    /// Forward FFT, clear `spectrum[cutoff..]`, inverse FFT, scale by 1/N.
    fn reference_lowpass(samples: &[f64], cutoff: usize) -> Vec<f64> {
        let n = samples.len();
        let mut planner = FftPlanner::<f64>::new();
        let mut buf: Vec<Complex<f64>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();

        planner.plan_fft_forward(n).process(&mut buf);
        for coeff in &mut buf[cutoff..] {
            *coeff = Complex::new(0.0, 0.0);
        }
        planner.plan_fft_inverse(n).process(&mut buf);

        buf.iter().map(|c| c.re / n as f64).collect()
    }

    fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
    }

    #[test]
    fn test_default_matches_one_sided_reference() {
        // Five cycles of a cosine over 1000 samples
        let samples: Vec<f64> = (0..1000)
            .map(|i| (2.0 * PI * 5.0 * f64::from(i) / 1000.0).cos())
            .collect();

        let mut smoother = SpectralSmoother::default();
        assert_eq!(smoother.zeroing(), Zeroing::OneSided);
        let smoothed = smoother.smooth(&samples, 30.0);

        let reference = reference_lowpass(&samples, 200);
        assert!(max_abs_diff(&smoothed, &reference) < 1e-9);
        assert!((smoothed[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_one_sided_halves_kept_components() {
        // 1000 samples at 250 Hz: bin 200 sits at 50 Hz
        let slow = sine(2.0, 250.0, 1000);
        let fast = sine(100.0, 250.0, 1000);
        let mixed: Vec<f64> = slow.iter().zip(&fast).map(|(a, b)| a + b).collect();

        let smoothed = SpectralSmoother::default().smooth(&mixed, 250.0);

        let half: Vec<f64> = slow.iter().map(|v| v * 0.5).collect();
        assert!(max_abs_diff(&smoothed, &half) < 1e-6);
        assert!(max_abs_diff(&smoothed, &reference_lowpass(&mixed, 200)) < 1e-9);
    }

    #[test]
    fn test_short_window_passes_through() {
        let samples = sine(7.0, 100.0, 150);
        let smoothed = SpectralSmoother::default().smooth(&samples, 100.0);
        assert!(max_abs_diff(&samples, &smoothed) < 1e-9);

        // Symmetric zeroing keeps windows shorter than twice the cutoff
        let samples = sine(7.0, 100.0, 300);
        let smoothed = SpectralSmoother::default()
            .with_zeroing(Zeroing::Symmetric)
            .smooth(&samples, 100.0);
        assert!(max_abs_diff(&samples, &smoothed) < 1e-9);
    }

    #[test]
    fn test_symmetric_removes_high_frequency_component() {
        let slow = sine(2.0, 250.0, 1000);
        let fast = sine(100.0, 250.0, 1000);
        let mixed: Vec<f64> = slow.iter().zip(&fast).map(|(a, b)| a + b).collect();

        let mut smoother = SpectralSmoother::default().with_zeroing(Zeroing::Symmetric);
        let smoothed = smoother.smooth(&mixed, 250.0);

        let max_error = smoothed
            .iter()
            .zip(&slow)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        assert!(max_error < 1e-6, "residual {max_error}");
    }

    #[test]
    fn test_dc_level_preserved() {
        let samples = vec![512.0; 800];
        for zeroing in [Zeroing::OneSided, Zeroing::Symmetric] {
            let mut smoother = SpectralSmoother::new(CutoffPolicy::Bin(1)).with_zeroing(zeroing);

            let smoothed = smoother.smooth(&samples, 30.0);

            assert!(smoothed.iter().all(|v| (v - 512.0).abs() < 1e-9));
        }
    }

    #[test]
    fn test_hz_cutoff_conversion() {
        let policy = CutoffPolicy::Hz(15.0);

        assert_eq!(policy.bin_for(1000, 250.0), 60);
        assert_eq!(policy.bin_for(1000, 30.0), 500);
        assert_eq!(CutoffPolicy::Hz(0.001).bin_for(10, 250.0), 1);
        assert!((policy.cutoff_hz(1000, 250.0) - 15.0).abs() < 1e-9);
        assert_eq!(CutoffPolicy::Bin(200).bin_for(10, 30.0), 200);
    }

    #[test]
    fn test_cutoff_validation() {
        assert!(CutoffPolicy::default().validate().is_ok());
        assert!(CutoffPolicy::Bin(0).validate().is_err());
        assert!(CutoffPolicy::Hz(-1.0).validate().is_err());
        assert!(CutoffPolicy::Hz(f64::NAN).validate().is_err());
    }
}
