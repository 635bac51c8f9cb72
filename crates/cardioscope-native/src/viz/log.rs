//! Presenter that reports through `tracing`
//!
//! Used by the command-line binary in place of a plotting window. Frames
//! arrive at up to 250 Hz, so frame summaries are throttled.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use cardioscope_core::types::HeartRate;

use super::theme::Theme;
use super::view::{PlotLayout, ZoomDirection};
use super::{Diagnostic, Presenter, Severity};
use crate::processing::ProcessedFrame;

/// Default interval between frame summaries.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Logging presenter
pub struct LogPresenter {
    theme: Theme,
    layout: PlotLayout,
    report_interval: Duration,
    last_report: Option<Instant>,
    frames: u64,
}

impl LogPresenter {
    /// Create a presenter with the default report interval.
    #[must_use]
    pub fn new(theme: Theme) -> Self {
        Self::with_interval(theme, DEFAULT_REPORT_INTERVAL)
    }

    /// Create a presenter reporting at most once per `report_interval`.
    #[must_use]
    pub fn with_interval(theme: Theme, report_interval: Duration) -> Self {
        Self {
            theme,
            layout: PlotLayout::new(),
            report_interval,
            last_report: None,
            frames: 0,
        }
    }

    /// Current theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Current plot bounds.
    #[must_use]
    pub fn layout(&self) -> &PlotLayout {
        &self.layout
    }

    /// Frames rendered since the last reset.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn report_due(&mut self) -> bool {
        let now = Instant::now();
        let due = self
            .last_report
            .map_or(true, |last| now.duration_since(last) >= self.report_interval);
        if due {
            self.last_report = Some(now);
        }
        due
    }
}

impl Presenter for LogPresenter {
    fn render(&mut self, frame: &ProcessedFrame) {
        self.frames += 1;
        self.layout.fit(frame);

        if !self.report_due() {
            return;
        }

        let latest = frame.raw.last().copied().unwrap_or_default();
        match &frame.heart_rate {
            HeartRate::NoData => {
                info!(
                    "{} samples ({:.1} s), latest {:.2}, pulse: no data",
                    frame.len(),
                    frame.duration_s(),
                    latest
                );
            }
            HeartRate::Estimate { beats, average_bpm } => {
                info!(
                    "{} samples ({:.1} s), latest {:.2}, pulse {:.1} bpm over {} beats",
                    frame.len(),
                    frame.duration_s(),
                    latest,
                    average_bpm,
                    beats.len()
                );
            }
        }
    }

    fn reset(&mut self) {
        self.frames = 0;
        self.last_report = None;
        self.layout.reset();
        info!("Display cleared");
    }

    fn notify(&mut self, diagnostic: &Diagnostic) {
        match diagnostic.severity() {
            Severity::Info => info!("{diagnostic}"),
            Severity::Warning => warn!("{diagnostic}"),
            Severity::Error => error!("{diagnostic}"),
        }
    }

    fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        let palette = theme.palette();
        info!(
            "Theme set to {theme} (background {}, trace {})",
            palette.figure, palette.traces.raw
        );
    }

    fn zoom(&mut self, direction: ZoomDirection) {
        self.layout.zoom(direction);
        debug!("Zoom {:?}, scale now {:.3}", direction, self.layout.scale());
    }
}

impl Default for LogPresenter {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}
