//! Recording presenter for scheduler tests

use std::sync::{Arc, Mutex};

use super::{Diagnostic, Presenter, Theme, ZoomDirection};
use crate::processing::ProcessedFrame;

#[derive(Default)]
pub(crate) struct Recorded {
    pub frames: Vec<ProcessedFrame>,
    pub resets: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub theme: Option<Theme>,
    pub zooms: Vec<ZoomDirection>,
}

/// Presenter whose calls can be inspected after it is moved into a scheduler.
#[derive(Clone, Default)]
pub(crate) struct RecordingPresenter {
    state: Arc<Mutex<Recorded>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R>(&self, f: impl FnOnce(&Recorded) -> R) -> R {
        f(&self.state.lock().unwrap())
    }

    pub fn frame_count(&self) -> usize {
        self.with(|r| r.frames.len())
    }

    pub fn last_frame(&self) -> Option<ProcessedFrame> {
        self.with(|r| r.frames.last().cloned())
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.with(|r| r.diagnostics.clone())
    }
}

impl Presenter for RecordingPresenter {
    fn render(&mut self, frame: &ProcessedFrame) {
        self.state.lock().unwrap().frames.push(frame.clone());
    }

    fn reset(&mut self) {
        self.state.lock().unwrap().resets += 1;
    }

    fn notify(&mut self, diagnostic: &Diagnostic) {
        self.state.lock().unwrap().diagnostics.push(diagnostic.clone());
    }

    fn set_theme(&mut self, theme: Theme) {
        self.state.lock().unwrap().theme = Some(theme);
    }

    fn zoom(&mut self, direction: ZoomDirection) {
        self.state.lock().unwrap().zooms.push(direction);
    }
}
