//! Presentation contract
//!
//! The scheduler hands every processed frame and every user-visible
//! condition to a [`Presenter`]. Drawing itself lives behind the trait:
//! - [`theme`]: Light and dark palettes
//! - [`view`]: Axis bounds and proportional zoom
//! - [`log`]: A presenter that reports through `tracing`
//!
//! # Example
//!
//! ```rust,ignore
//! use cardioscope_native::viz::{LogPresenter, Presenter, Theme, ZoomDirection};
//!
//! let mut presenter = LogPresenter::new(Theme::Dark);
//! presenter.zoom(ZoomDirection::In);
//! presenter.render(&frame);
//! ```

use std::fmt;
use std::path::PathBuf;

use cardioscope_core::error::ProcessingError;

use crate::processing::ProcessedFrame;

pub mod log;
pub mod theme;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use log::LogPresenter;
pub use theme::{Palette, Rgb, Theme, TraceColors, TRACE_COLORS};
pub use view::{PlotLayout, ViewBounds, ZoomDirection};

// ============================================================================
// Diagnostics
// ============================================================================

/// How prominently a diagnostic should be shown.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational
    Info,
    /// Recoverable problem
    Warning,
    /// Operation failed
    Error,
}

/// User-visible condition raised by the scheduler.
#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    /// No serial device could be opened
    DeviceUnavailable,
    /// A device was opened
    DeviceConnected {
        /// Port identifier
        port: String,
    },
    /// An open device stopped responding
    LinkLost {
        /// Port identifier
        port: String,
        /// Read error text
        reason: String,
    },
    /// Processing failed for one tick
    ProcessingFailed(ProcessingError),
    /// A setting change was refused
    Rejected(String),
    /// A summary was written
    Exported {
        /// Destination file
        path: PathBuf,
    },
    /// Export did not happen
    ExportFailed(String),
    /// Answer to a status request
    Status(String),
}

impl Diagnostic {
    /// Display severity.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::DeviceConnected { .. } | Self::Exported { .. } | Self::Status(_) => {
                Severity::Info
            }
            Self::DeviceUnavailable | Self::LinkLost { .. } | Self::Rejected(_) => {
                Severity::Warning
            }
            Self::ProcessingFailed(_) | Self::ExportFailed(_) => Severity::Error,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceUnavailable => write!(f, "Device unavailable: connect the sensor"),
            Self::DeviceConnected { port } => write!(f, "Connected to {port}"),
            Self::LinkLost { port, reason } => write!(f, "Lost connection to {port}: {reason}"),
            Self::ProcessingFailed(err) => write!(f, "Processing failed: {err}"),
            Self::Rejected(reason) => write!(f, "Rejected: {reason}"),
            Self::Exported { path } => write!(f, "Session summary saved to {}", path.display()),
            Self::ExportFailed(reason) => write!(f, "Export failed: {reason}"),
            Self::Status(text) => write!(f, "{text}"),
        }
    }
}

// ============================================================================
// Presenter
// ============================================================================

/// Sink for frames and diagnostics.
///
/// All calls come from the scheduler's single execution context.
pub trait Presenter {
    /// Draw one processed frame.
    fn render(&mut self, frame: &ProcessedFrame);

    /// Clear all plots (acquisition stopped).
    fn reset(&mut self);

    /// Show a user-visible condition.
    fn notify(&mut self, diagnostic: &Diagnostic);

    /// Switch colour theme.
    fn set_theme(&mut self, theme: Theme);

    /// Rescale the view without touching data.
    fn zoom(&mut self, direction: ZoomDirection);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity() {
        assert_eq!(Diagnostic::DeviceUnavailable.severity(), Severity::Warning);
        assert_eq!(
            Diagnostic::ProcessingFailed(ProcessingError::NonFiniteInput { index: 0 }).severity(),
            Severity::Error
        );
        assert!(Severity::Error > Severity::Info);
    }

    #[test]
    fn test_diagnostic_messages() {
        let lost = Diagnostic::LinkLost {
            port: "/dev/ttyUSB0".into(),
            reason: "broken pipe".into(),
        };
        assert_eq!(lost.to_string(), "Lost connection to /dev/ttyUSB0: broken pipe");
        assert!(Diagnostic::DeviceUnavailable.to_string().starts_with("Device unavailable"));
    }
}
