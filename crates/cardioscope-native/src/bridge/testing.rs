//! Scripted serial ports for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use super::device_manager::{DeviceError, DeviceResult};
use super::serial::{PortBackend, SerialStream};

#[derive(Default)]
struct StreamState {
    incoming: VecDeque<u8>,
    fail_next_read: bool,
}

#[derive(Default)]
struct BackendState {
    ports: Vec<String>,
    openable: HashSet<String>,
    open_attempts: Vec<String>,
    last_baud_rate: Option<u32>,
    streams: HashMap<String, Arc<Mutex<StreamState>>>,
}

/// Port backend whose ports, open results and incoming bytes are set by the test.
#[derive(Clone, Default)]
pub(crate) struct ScriptedBackend {
    state: Arc<Mutex<BackendState>>,
}

impl ScriptedBackend {
    /// Backend enumerating `ports`; none of them open until marked openable.
    pub(crate) fn new(ports: &[&str]) -> Self {
        let backend = Self::default();
        backend.state.lock().unwrap().ports = ports.iter().map(|p| (*p).to_string()).collect();
        backend
    }

    pub(crate) fn set_openable(&self, port: &str, openable: bool) {
        let mut state = self.state.lock().unwrap();
        if openable {
            state.openable.insert(port.to_string());
        } else {
            state.openable.remove(port);
        }
    }

    pub(crate) fn push_bytes(&self, port: &str, bytes: &[u8]) {
        let stream = self.stream(port);
        stream.lock().unwrap().incoming.extend(bytes.iter().copied());
    }

    pub(crate) fn fail_next_read(&self, port: &str) {
        self.stream(port).lock().unwrap().fail_next_read = true;
    }

    pub(crate) fn open_attempts(&self) -> Vec<String> {
        self.state.lock().unwrap().open_attempts.clone()
    }

    pub(crate) fn last_baud_rate(&self) -> Option<u32> {
        self.state.lock().unwrap().last_baud_rate
    }

    fn stream(&self, port: &str) -> Arc<Mutex<StreamState>> {
        let mut state = self.state.lock().unwrap();
        Arc::clone(state.streams.entry(port.to_string()).or_default())
    }
}

impl PortBackend for ScriptedBackend {
    fn available_ports(&self) -> DeviceResult<Vec<String>> {
        Ok(self.state.lock().unwrap().ports.clone())
    }

    fn open(&self, port: &str, baud_rate: u32) -> DeviceResult<Box<dyn SerialStream>> {
        let openable = {
            let mut state = self.state.lock().unwrap();
            state.open_attempts.push(port.to_string());
            state.last_baud_rate = Some(baud_rate);
            state.openable.contains(port)
        };

        if !openable {
            return Err(DeviceError::ConnectionFailed {
                port: port.to_string(),
                reason: "scripted failure".to_string(),
            });
        }

        Ok(Box::new(ScriptedStream { state: self.stream(port) }))
    }
}

struct ScriptedStream {
    state: Arc<Mutex<StreamState>>,
}

impl SerialStream for ScriptedStream {
    fn read_pending(&mut self, out: &mut Vec<u8>) -> std::io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "device unplugged"));
        }

        let n = state.incoming.len();
        out.extend(state.incoming.drain(..));
        Ok(n)
    }
}
