//! Plot view bounds and zoom
//!
//! Zooming rescales every axis limit by a constant factor. Data is never
//! touched; the scale is kept across redraws and applied on top of the
//! bounds fitted to each frame.

use serde::{Deserialize, Serialize};

use cardioscope_core::math;

use crate::processing::ProcessedFrame;

/// Scale factor applied for a zoom-in step.
pub const ZOOM_IN_FACTOR: f64 = 1.1;

/// Scale factor applied for a zoom-out step.
pub const ZOOM_OUT_FACTOR: f64 = 0.9;

/// Fixed y range of the heart-rate plot (BPM).
pub const PULSE_Y_RANGE: (f64, f64) = (0.0, 200.0);

/// Zoom step direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomDirection {
    /// Scale limits by 1.1
    In,
    /// Scale limits by 0.9
    Out,
}

impl ZoomDirection {
    /// Direction for a scroll-wheel delta; positive is `In`.
    #[must_use]
    pub fn from_wheel_delta(delta: i32) -> Self {
        if delta > 0 {
            Self::In
        } else {
            Self::Out
        }
    }

    /// Multiplicative factor for one step.
    #[must_use]
    pub fn factor(self) -> f64 {
        match self {
            Self::In => ZOOM_IN_FACTOR,
            Self::Out => ZOOM_OUT_FACTOR,
        }
    }
}

/// Visible axis limits of one plot.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewBounds {
    /// Left limit
    pub x_min: f64,
    /// Right limit
    pub x_max: f64,
    /// Bottom limit
    pub y_min: f64,
    /// Top limit
    pub y_max: f64,
}

impl ViewBounds {
    /// Create bounds.
    #[must_use]
    pub const fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self { x_min, x_max, y_min, y_max }
    }

    /// Multiply every limit by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            x_min: self.x_min * factor,
            x_max: self.x_max * factor,
            y_min: self.y_min * factor,
            y_max: self.y_max * factor,
        }
    }

    /// Visible width.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Visible height.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

impl Default for ViewBounds {
    fn default() -> Self {
        Self::new(0.0, 1.0, 0.0, 1.0)
    }
}

/// Bounds of the raw, heart-rate and smoothed plots.
#[derive(Clone, Debug, PartialEq)]
pub struct PlotLayout {
    /// Raw signal plot
    pub raw: ViewBounds,
    /// Heart-rate plot
    pub pulse: ViewBounds,
    /// Smoothed signal plot
    pub smoothed: ViewBounds,
    scale: f64,
}

impl PlotLayout {
    /// Layout with unit bounds and no zoom.
    #[must_use]
    pub fn new() -> Self {
        Self {
            raw: ViewBounds::default(),
            pulse: ViewBounds::new(0.0, 1.0, PULSE_Y_RANGE.0, PULSE_Y_RANGE.1),
            smoothed: ViewBounds::default(),
            scale: 1.0,
        }
    }

    /// Accumulated zoom factor.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Apply one zoom step to every plot.
    pub fn zoom(&mut self, direction: ZoomDirection) {
        let factor = direction.factor();
        self.scale *= factor;
        self.raw = self.raw.scaled(factor);
        self.pulse = self.pulse.scaled(factor);
        self.smoothed = self.smoothed.scaled(factor);
    }

    /// Fit bounds to a frame, keeping the current zoom.
    pub fn fit(&mut self, frame: &ProcessedFrame) {
        let duration = frame.duration_s();

        self.raw = data_bounds(duration, &frame.raw).scaled(self.scale);
        self.smoothed = data_bounds(duration, &frame.smoothed).scaled(self.scale);
        self.pulse =
            ViewBounds::new(0.0, duration, PULSE_Y_RANGE.0, PULSE_Y_RANGE.1).scaled(self.scale);
    }

    /// Drop the zoom and return to unit bounds.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for PlotLayout {
    fn default() -> Self {
        Self::new()
    }
}

fn data_bounds(duration: f64, values: &[f64]) -> ViewBounds {
    match (math::min(values), math::max(values)) {
        (Some(lo), Some(hi)) => ViewBounds::new(0.0, duration, lo, hi),
        _ => ViewBounds::new(0.0, duration, 0.0, 1.0),
    }
}
