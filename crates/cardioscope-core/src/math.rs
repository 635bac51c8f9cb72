//! Summary statistics for sample windows
//!
//! Population statistics over `f64` slices. Empty input yields `0.0` for the
//! moments and `None` for the extrema, so callers decide how to treat an
//! empty window.

/// Compute the arithmetic mean.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.iter().sum::<f64>() / values.len() as f64
}

/// Compute the population variance (divides by `n`).
#[must_use]
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Compute the population standard deviation.
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    libm::sqrt(variance(values))
}

/// Find minimum value.
#[must_use]
pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

/// Find maximum value.
#[must_use]
pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Round to two decimal places the way `{:.2}` formats.
///
/// Ties resolve on the exact binary value, half to even, so a rounded value
/// always equals the text written for it.
#[must_use]
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    alloc::format!("{value:.2}").parse().unwrap_or(value)
}

/// Index of the first non-finite value, if any.
#[must_use]
pub fn first_non_finite(values: &[f64]) -> Option<usize> {
    values.iter().position(|v| !v.is_finite())
}

// ============================================================================
// Tests
// ============================================================================
