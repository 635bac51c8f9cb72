//! Heartbeat peak detection
//!
//! Peaks are local maxima of the raw window that rise at least one standard
//! deviation above its mean and sit at least `min_distance` samples apart.
//! When two candidates are too close the taller one wins. Consecutive peak
//! intervals become instantaneous heart rates.

use cardioscope_core::math;
use cardioscope_core::types::{HeartRate, PeakEstimate, SamplingConfig, DEFAULT_PEAK_MIN_DISTANCE};

/// Peak detector with a minimum horizontal separation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PeakDetector {
    min_distance: usize,
}

impl PeakDetector {
    /// Create a detector; a distance below 1 is treated as 1.
    #[must_use]
    pub fn new(min_distance: usize) -> Self {
        Self { min_distance: min_distance.max(1) }
    }

    /// Minimum separation between kept peaks (samples).
    #[must_use]
    pub fn min_distance(&self) -> usize {
        self.min_distance
    }

    /// Height threshold for a window: `mean + stddev`.
    #[must_use]
    pub fn threshold(samples: &[f64]) -> f64 {
        math::mean(samples) + math::std_dev(samples)
    }

    /// Detect peaks using the adaptive `mean + stddev` threshold.
    #[must_use]
    pub fn detect(&self, samples: &[f64]) -> Vec<usize> {
        self.find_peaks(samples, Self::threshold(samples))
    }

    /// Indices of local maxima at least `min_height` tall and at least
    /// `min_distance` apart, in ascending order.
    #[must_use]
    pub fn find_peaks(&self, samples: &[f64], min_height: f64) -> Vec<usize> {
        let candidates: Vec<usize> = local_maxima(samples)
            .into_iter()
            .filter(|&i| samples[i] >= min_height)
            .collect();

        select_by_distance(&candidates, samples, self.min_distance)
    }

    /// Heart rate from the peaks of a raw window.
    ///
    /// Each estimate is attributed to the later peak of its pair. Fewer than
    /// two peaks yields [`HeartRate::NoData`].
    #[must_use]
    pub fn heart_rate(&self, samples: &[f64], config: &SamplingConfig) -> HeartRate {
        let peaks = self.detect(samples);

        let beats = peaks
            .windows(2)
            .map(|pair| {
                let seconds = config.samples_to_seconds(pair[1] - pair[0]);
                PeakEstimate {
                    sample_index: pair[1],
                    bpm: 60.0 / seconds,
                }
            })
            .collect();

        HeartRate::from_beats(beats)
    }
}

impl Default for PeakDetector {
    fn default() -> Self {
        Self::new(DEFAULT_PEAK_MIN_DISTANCE)
    }
}

/// Indices of strict local maxima.
///
/// A flat top counts once, at the middle of the plateau (rounded down). The
/// first and last samples are never peaks.
#[must_use]
pub fn local_maxima(samples: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if samples.len() < 3 {
        return peaks;
    }

    let last = samples.len() - 1;
    let mut i = 1;

    while i < last {
        if samples[i - 1] < samples[i] {
            let mut ahead = i + 1;
            while ahead < last && samples[ahead] == samples[i] {
                ahead += 1;
            }

            if samples[ahead] < samples[i] {
                let right_edge = ahead - 1;
                peaks.push((i + right_edge) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }

    peaks
}

/// Drop peaks closer than `distance` to a taller kept peak.
fn select_by_distance(peaks: &[usize], samples: &[f64], distance: usize) -> Vec<usize> {
    if peaks.len() < 2 || distance <= 1 {
        return peaks.to_vec();
    }

    // Visit tallest first; among equal heights the later peak wins
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| samples[peaks[a]].total_cmp(&samples[peaks[b]]));

    let mut keep = vec![true; peaks.len()];

    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }

        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }

        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
