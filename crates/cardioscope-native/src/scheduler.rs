//! Acquisition scheduler
//!
//! Owns the device link, the sample buffer, the processor, the exporter and
//! the presenter, and drives two periodic tasks on one execution context:
//!
//! - **Reconnect**: every `reconnect_interval`, runs
//!   [`DeviceLinkManager::tick`] regardless of acquisition state.
//! - **Sampling**: every `1000 / sample_rate_hz` ms while running, reads
//!   pending samples, buffers them, processes a snapshot and renders it.
//!
//! # State Machine
//!
//! ```text
//!            start (device open)
//!  Stopped ───────────────────────▶ Running
//!     ▲                            │     ▲
//!     │ stop (buffer cleared)      │     │ start
//!     └────────────────────────────┤     │
//!     ▲                       pause│     │
//!     │ stop                       ▼     │
//!     └─────────────────────────── Paused
//! ```
//!
//! Ticks never overlap: both tasks and the command channel are polled from a
//! single `tokio::select!` loop, so the buffer is only touched inside the
//! sampling tick and needs no lock.

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use cardioscope_core::error::ConfigError;
use cardioscope_core::types::SamplingConfig;

use crate::bridge::{DeviceLinkManager, LinkEvent, LinkStatus};
use crate::config::AppConfig;
use crate::export::{ExportError, SessionExporter};
use crate::processing::{SampleBuffer, SignalProcessor};
use crate::viz::{Diagnostic, Presenter, Theme, ZoomDirection};

// ============================================================================
// Commands and State
// ============================================================================

/// Acquisition state.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionState {
    /// Not sampling; buffer empty
    #[default]
    Stopped,
    /// Sampling tick is active
    Running,
    /// Sampling suspended; buffer retained
    Paused,
}

/// Control request delivered to the run loop.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlCommand {
    /// Begin or resume sampling
    Start,
    /// Stop sampling and clear data
    Stop,
    /// Suspend sampling, keeping data
    Pause,
    /// Change the sampling rate (Hz)
    SetSampleRate(u16),
    /// Switch between light and dark themes
    ToggleTheme,
    /// Rescale the view
    Zoom(ZoomDirection),
    /// Export a summary to the given path, or the configured default
    Export(Option<PathBuf>),
    /// Report current state
    Status,
    /// Leave the run loop
    Shutdown,
}

// ============================================================================
// Scheduler
// ============================================================================

/// Single-threaded acquisition scheduler.
pub struct AcquisitionScheduler {
    link: DeviceLinkManager,
    buffer: SampleBuffer,
    processor: SignalProcessor,
    exporter: SessionExporter,
    presenter: Box<dyn Presenter>,
    sampling: SamplingConfig,
    reconnect_interval: Duration,
    export_path: Option<PathBuf>,
    theme: Theme,
    state: AcquisitionState,
    rate_changed: bool,
}

impl AcquisitionScheduler {
    /// Build a scheduler from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is out of range.
    pub fn from_config(
        config: &AppConfig,
        link: DeviceLinkManager,
        presenter: Box<dyn Presenter>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let detector = config.peak_detector();
        let mut scheduler = Self {
            link,
            buffer: SampleBuffer::new(config.buffer_capacity)?,
            processor: SignalProcessor::new(config.cutoff, detector).with_zeroing(config.zeroing),
            exporter: SessionExporter::new(detector),
            presenter,
            sampling: config.sampling()?,
            reconnect_interval: config.reconnect_interval(),
            export_path: config.export_path.clone(),
            theme: config.theme(),
            state: AcquisitionState::Stopped,
            rate_changed: false,
        };
        scheduler.presenter.set_theme(scheduler.theme);
        Ok(scheduler)
    }

    /// Current acquisition state.
    #[must_use]
    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    /// Active sampling configuration.
    #[must_use]
    pub fn sampling(&self) -> SamplingConfig {
        self.sampling
    }

    /// Current theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Device link.
    #[must_use]
    pub fn link(&self) -> &DeviceLinkManager {
        &self.link
    }

    /// Sample buffer.
    #[must_use]
    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    /// Sampling tick period.
    #[must_use]
    pub fn sampling_period(&self) -> Duration {
        Duration::from_millis(self.sampling.tick_period_ms())
    }

    // ------------------------------------------------------------------------
    // State transitions
    // ------------------------------------------------------------------------

    /// Begin (or resume) sampling.
    ///
    /// Requires an open device; otherwise reports it unavailable and leaves
    /// the state unchanged. Returns whether sampling is now running.
    pub fn start(&mut self) -> bool {
        if self.state == AcquisitionState::Running {
            return true;
        }

        if !self.link.is_open() {
            warn!("Start requested with no device connected");
            self.presenter.notify(&Diagnostic::DeviceUnavailable);
            return false;
        }

        info!(
            rate_hz = self.sampling.sample_rate_hz(),
            resumed = self.state == AcquisitionState::Paused,
            "Acquisition started"
        );
        self.state = AcquisitionState::Running;
        true
    }

    /// Stop sampling, clear the buffer and the display.
    pub fn stop(&mut self) {
        self.state = AcquisitionState::Stopped;
        self.buffer.clear();
        self.presenter.reset();
        info!("Acquisition stopped");
    }

    /// Suspend sampling, keeping buffered data.
    pub fn pause(&mut self) {
        if self.state == AcquisitionState::Running {
            self.state = AcquisitionState::Paused;
            info!(buffered = self.buffer.len(), "Acquisition paused");
        }
    }

    /// Change the sampling rate.
    ///
    /// The new period takes effect from the next sampling tick. Returns
    /// `false` and reports the problem for an out-of-range rate.
    pub fn set_sample_rate(&mut self, sample_rate_hz: u16) -> bool {
        match SamplingConfig::new(sample_rate_hz) {
            Ok(sampling) => {
                if sampling != self.sampling {
                    self.sampling = sampling;
                    self.rate_changed = true;
                    info!(rate_hz = sample_rate_hz, "Sample rate changed");
                }
                true
            }
            Err(e) => {
                warn!(error = %e, "Sample rate rejected");
                self.presenter.notify(&Diagnostic::Rejected(e.to_string()));
                false
            }
        }
    }

    /// Switch between light and dark themes.
    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        self.presenter.set_theme(self.theme);
    }

    /// Rescale the view.
    pub fn zoom(&mut self, direction: ZoomDirection) {
        self.presenter.zoom(direction);
    }

    /// Export a summary of the current buffer.
    ///
    /// `destination` falls back to the configured export path. The outcome
    /// is also reported through the presenter.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NothingToExport`] for an empty buffer,
    /// [`ExportError::NoDestination`] without a path, or the write error.
    pub fn export(&mut self, destination: Option<PathBuf>) -> Result<PathBuf, ExportError> {
        let destination = destination.or_else(|| self.export_path.clone());
        let snapshot = self.buffer.snapshot();

        let result = self
            .exporter
            .export_snapshot(&snapshot, &self.sampling, destination.as_deref())
            .map(|(_, path)| path);

        match &result {
            Ok(path) => self.presenter.notify(&Diagnostic::Exported { path: path.clone() }),
            Err(e) => {
                warn!(error = %e, "Export failed");
                self.presenter.notify(&Diagnostic::ExportFailed(e.to_string()));
            }
        }
        result
    }

    /// One-line summary of scheduler state.
    #[must_use]
    pub fn status_line(&self) -> String {
        format!(
            "{:?} at {} Hz, {} of {} samples buffered, device {}, {} dropped lines",
            self.state,
            self.sampling.sample_rate_hz(),
            self.buffer.len(),
            self.buffer.capacity(),
            self.link.port().unwrap_or("not connected"),
            self.link.dropped_lines()
        )
    }

    // ------------------------------------------------------------------------
    // Periodic tasks
    // ------------------------------------------------------------------------

    /// Sampling task body. No-op unless running.
    pub fn sampling_tick(&mut self) {
        if self.state != AcquisitionState::Running {
            return;
        }

        let samples = self.link.read_available();
        self.report_link_events();
        self.buffer.extend(samples);

        let snapshot = self.buffer.snapshot();
        match self.processor.process(snapshot, &self.sampling) {
            Ok(frame) => self.presenter.render(&frame),
            Err(e) => {
                warn!(error = %e, "Processing failed for this tick");
                self.presenter.notify(&Diagnostic::ProcessingFailed(e));
            }
        }
    }

    /// Reconnect task body.
    pub fn reconnect_tick(&mut self) -> LinkStatus {
        let status = self.link.tick();
        match &status {
            LinkStatus::AlreadyOpen => {}
            LinkStatus::Reconnected { port } | LinkStatus::Discovered { port } => {
                self.presenter.notify(&Diagnostic::DeviceConnected { port: port.clone() });
            }
            LinkStatus::Unavailable => self.presenter.notify(&Diagnostic::DeviceUnavailable),
        }
        status
    }

    fn report_link_events(&mut self) {
        for event in self.link.drain_events() {
            match event {
                LinkEvent::Lost { port, reason } => {
                    self.presenter.notify(&Diagnostic::LinkLost { port, reason });
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Run loop
    // ------------------------------------------------------------------------

    /// Apply one control command.
    pub fn handle_command(&mut self, command: ControlCommand) -> ControlFlow<()> {
        debug!(?command, "Control command");

        match command {
            ControlCommand::Start => {
                self.start();
            }
            ControlCommand::Stop => self.stop(),
            ControlCommand::Pause => self.pause(),
            ControlCommand::SetSampleRate(hz) => {
                self.set_sample_rate(hz);
            }
            ControlCommand::ToggleTheme => self.toggle_theme(),
            ControlCommand::Zoom(direction) => self.zoom(direction),
            ControlCommand::Export(destination) => {
                // Reported through the presenter
                let _ = self.export(destination);
            }
            ControlCommand::Status => {
                let line = self.status_line();
                self.presenter.notify(&Diagnostic::Status(line));
            }
            ControlCommand::Shutdown => return ControlFlow::Break(()),
        }

        ControlFlow::Continue(())
    }

    /// Drive both periodic tasks and the command channel until
    /// [`ControlCommand::Shutdown`] arrives or every sender is dropped.
    ///
    /// The reconnect task fires immediately, so the first device scan runs
    /// as soon as the loop starts. The device link is closed on return.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<ControlCommand>) {
        let mut reconnect = periodic(self.reconnect_interval);
        let mut sampling = periodic(self.sampling_period());

        info!(
            rate_hz = self.sampling.sample_rate_hz(),
            reconnect_ms = u64::try_from(self.reconnect_interval.as_millis()).unwrap_or(u64::MAX),
            "Scheduler running"
        );

        loop {
            tokio::select! {
                _ = reconnect.tick() => {
                    self.reconnect_tick();
                }
                _ = sampling.tick() => {
                    self.sampling_tick();
                }
                command = commands.recv() => {
                    let Some(command) = command else {
                        debug!("Command channel closed");
                        break;
                    };
                    if self.handle_command(command).is_break() {
                        break;
                    }
                }
            }

            if std::mem::take(&mut self.rate_changed) {
                sampling = periodic(self.sampling_period());
            }
        }

        self.shutdown();
    }

    /// Stop sampling and close the device link.
    pub fn shutdown(&mut self) {
        self.state = AcquisitionState::Stopped;
        self.link.shutdown();
        info!("Scheduler shut down");
    }
}

fn periodic(period: Duration) -> Interval {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::testing::ScriptedBackend;
    use crate::bridge::LinkConfig;
    use crate::viz::testing::RecordingPresenter;

    const PORT: &str = "/dev/ttyUSB0";

    fn scheduler_with(
        backend: &ScriptedBackend,
        config: &AppConfig,
    ) -> (AcquisitionScheduler, RecordingPresenter) {
        let link = DeviceLinkManager::new(Box::new(backend.clone()), config.link_config());
        let presenter = RecordingPresenter::new();
        let scheduler =
            AcquisitionScheduler::from_config(config, link, Box::new(presenter.clone())).unwrap();
        (scheduler, presenter)
    }

    fn connected() -> (AcquisitionScheduler, RecordingPresenter, ScriptedBackend) {
        let backend = ScriptedBackend::new(&[PORT]);
        backend.set_openable(PORT, true);
        let (mut scheduler, presenter) = scheduler_with(&backend, &AppConfig::default());
        assert!(scheduler.reconnect_tick().is_connected());
        (scheduler, presenter, backend)
    }

    #[test]
    fn test_start_without_device_is_noop() {
        let backend = ScriptedBackend::new(&["COM1", "COM2"]);
        let (mut scheduler, presenter) = scheduler_with(&backend, &AppConfig::default());

        assert_eq!(scheduler.reconnect_tick(), LinkStatus::Unavailable);
        assert!(!scheduler.start());

        assert_eq!(scheduler.state(), AcquisitionState::Stopped);
        assert_eq!(backend.open_attempts(), vec!["COM1", "COM2"]);
        assert_eq!(
            presenter.diagnostics(),
            vec![Diagnostic::DeviceUnavailable, Diagnostic::DeviceUnavailable]
        );
    }

    #[test]
    fn test_sampling_tick_buffers_and_renders() {
        let (mut scheduler, presenter, backend) = connected();
        backend.push_bytes(PORT, b"512\n515.5\nbad\n520\n");

        // Not running yet
        scheduler.sampling_tick();
        assert_eq!(presenter.frame_count(), 0);

        assert!(scheduler.start());
        scheduler.sampling_tick();

        let frame = presenter.last_frame().unwrap();
        assert_eq!(frame.raw, vec![512.0, 515.5, 520.0]);
        assert_eq!(frame.smoothed.len(), 3);
        assert_eq!(scheduler.link().dropped_lines(), 1);
    }

    #[test]
    fn test_pause_retains_and_stop_clears() {
        let (mut scheduler, presenter, backend) = connected();
        backend.push_bytes(PORT, b"1\n2\n3\n");
        scheduler.start();
        scheduler.sampling_tick();

        scheduler.pause();
        assert_eq!(scheduler.state(), AcquisitionState::Paused);
        backend.push_bytes(PORT, b"4\n");
        scheduler.sampling_tick();
        assert_eq!(scheduler.buffer().snapshot(), vec![1.0, 2.0, 3.0]);
        assert_eq!(presenter.frame_count(), 1);

        // Resume picks up bytes that arrived while paused
        assert!(scheduler.start());
        scheduler.sampling_tick();
        assert_eq!(scheduler.buffer().len(), 4);

        scheduler.stop();
        assert_eq!(scheduler.state(), AcquisitionState::Stopped);
        assert!(scheduler.buffer().is_empty());
        assert_eq!(presenter.with(|r| r.resets), 1);
    }

    #[test]
    fn test_link_loss_reported_and_ticks_continue() {
        let (mut scheduler, presenter, backend) = connected();
        backend.push_bytes(PORT, b"7\n");
        scheduler.start();
        scheduler.sampling_tick();

        backend.fail_next_read(PORT);
        scheduler.sampling_tick();
        assert!(!scheduler.link().is_open());
        assert!(presenter
            .diagnostics()
            .iter()
            .any(|d| matches!(d, Diagnostic::LinkLost { port, .. } if port == PORT)));

        // Still running on retained data until the link comes back
        scheduler.sampling_tick();
        assert_eq!(scheduler.state(), AcquisitionState::Running);
        assert_eq!(presenter.last_frame().unwrap().raw, vec![7.0]);

        assert_eq!(scheduler.reconnect_tick(), LinkStatus::Reconnected { port: PORT.into() });
        backend.push_bytes(PORT, b"8\n");
        scheduler.sampling_tick();
        assert_eq!(scheduler.buffer().snapshot(), vec![7.0, 8.0]);
    }

    #[test]
    fn test_sample_rate_validation() {
        let (mut scheduler, presenter, _backend) = connected();

        assert!(!scheduler.set_sample_rate(10));
        assert_eq!(scheduler.sampling().sample_rate_hz(), 30);
        assert!(matches!(presenter.diagnostics().last(), Some(Diagnostic::Rejected(_))));

        assert!(scheduler.set_sample_rate(250));
        assert_eq!(scheduler.sampling_period(), Duration::from_millis(4));
    }

    #[test]
    fn test_theme_and_zoom_forwarded() {
        let (mut scheduler, presenter, _backend) = connected();
        assert_eq!(presenter.with(|r| r.theme), Some(Theme::Light));

        scheduler.handle_command(ControlCommand::ToggleTheme);
        scheduler.handle_command(ControlCommand::Zoom(ZoomDirection::In));

        assert_eq!(scheduler.theme(), Theme::Dark);
        assert_eq!(presenter.with(|r| r.theme), Some(Theme::Dark));
        assert_eq!(presenter.with(|r| r.zooms.clone()), vec![ZoomDirection::In]);
    }

    #[test]
    fn test_export_empty_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let (mut scheduler, presenter, _backend) = connected();

        let result = scheduler.export(Some(path.clone()));

        assert!(matches!(result, Err(ExportError::NothingToExport)));
        assert!(!path.exists());
        assert!(matches!(presenter.diagnostics().last(), Some(Diagnostic::ExportFailed(_))));
    }

    #[test]
    fn test_export_uses_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.csv");
        let backend = ScriptedBackend::new(&[PORT]);
        backend.set_openable(PORT, true);
        let config = AppConfig {
            export_path: Some(path.clone()),
            ..AppConfig::default()
        };
        let (mut scheduler, _presenter) = scheduler_with(&backend, &config);
        scheduler.reconnect_tick();

        backend.push_bytes(PORT, b"100\n200\n150\n");
        scheduler.start();
        scheduler.sampling_tick();

        assert_eq!(scheduler.export(None).unwrap(), path);
        let summary = crate::export::read_record(&path).unwrap();
        assert_eq!(summary.max_amplitude, 200.0);
        assert_eq!(summary.avg_bpm, 0.0);
    }

    #[test]
    fn test_port_override_is_exclusive() {
        let backend = ScriptedBackend::new(&["COM1", "COM7"]);
        backend.set_openable("COM1", true);
        let config = AppConfig {
            port: Some("COM7".into()),
            ..AppConfig::default()
        };
        let (mut scheduler, _presenter) = scheduler_with(&backend, &config);
        assert_eq!(scheduler.reconnect_tick(), LinkStatus::Unavailable);
        assert_eq!(scheduler.link().last_known_port(), None);
        assert!(backend.open_attempts().iter().all(|p| p == "COM7"));
        assert_eq!(backend.last_baud_rate(), Some(LinkConfig::default().baud_rate));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_connects_samples_and_shuts_down() {
        let backend = ScriptedBackend::new(&[PORT]);
        backend.set_openable(PORT, true);
        backend.push_bytes(PORT, b"10\n20\n30\n");
        let (mut scheduler, presenter) = scheduler_with(&backend, &AppConfig::default());
        let (tx, rx) = mpsc::channel(8);

        let driver = async {
            tx.send(ControlCommand::Start).await.unwrap();
            time::sleep(Duration::from_millis(200)).await;
            tx.send(ControlCommand::Shutdown).await.unwrap();
        };
        tokio::join!(scheduler.run(rx), driver);

        assert!(presenter.frame_count() >= 1);
        assert_eq!(presenter.last_frame().unwrap().raw, vec![10.0, 20.0, 30.0]);
        assert!(!scheduler.link().is_open());
        assert_eq!(scheduler.state(), AcquisitionState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_change_rearms_sampling_timer() {
        let backend = ScriptedBackend::new(&[PORT]);
        backend.set_openable(PORT, true);
        let (mut scheduler, presenter) = scheduler_with(&backend, &AppConfig::default());
        let (tx, rx) = mpsc::channel(8);
        let observer = presenter.clone();

        let driver = async {
            tx.send(ControlCommand::Start).await.unwrap();
            time::sleep(Duration::from_millis(330)).await;
            let slow = observer.frame_count();

            tx.send(ControlCommand::SetSampleRate(250)).await.unwrap();
            time::sleep(Duration::from_millis(330)).await;
            let fast = observer.frame_count() - slow;

            tx.send(ControlCommand::Shutdown).await.unwrap();
            (slow, fast)
        };
        let ((), (slow, fast)) = tokio::join!(scheduler.run(rx), driver);

        assert!((8..=12).contains(&slow), "slow {slow}");
        assert!(fast > 60, "fast {fast}");
        assert_eq!(scheduler.sampling().sample_rate_hz(), 250);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_ends_when_senders_dropped() {
        let backend = ScriptedBackend::new(&[]);
        let (mut scheduler, presenter) = scheduler_with(&backend, &AppConfig::default());
        let (tx, rx) = mpsc::channel(1);
        drop(tx);

        scheduler.run(rx).await;

        assert_eq!(presenter.frame_count(), 0);
    }
}
