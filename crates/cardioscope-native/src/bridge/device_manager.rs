//! Single-device link manager.
//!
//! This module owns the serial connection lifecycle for the sensor:
//! discovery, open, non-blocking reads, close on failure, and reconnection.
//!
//! # Features
//!
//! - Discovery over enumerated ports (or a single configured override)
//! - Reconnection biased towards the last-known port
//! - Lossy line decoding with a dropped-line counter
//! - Event queue for link changes discovered during reads
//!
//! # Example
//!
//! ```rust,ignore
//! use cardioscope_native::bridge::{DeviceLinkManager, LinkConfig, LinkStatus, SystemPorts};
//!
//! let mut link = DeviceLinkManager::new(Box::new(SystemPorts::default()), LinkConfig::default());
//!
//! match link.tick() {
//!     LinkStatus::Unavailable => eprintln!("check device connection"),
//!     _ => {}
//! }
//!
//! for sample in link.read_available() {
//!     println!("{sample}");
//! }
//! ```

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use cardioscope_core::protocol::LineDecoder;
use cardioscope_core::types::BAUD_RATE;

use super::serial::{PortBackend, SerialStream};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while opening the sensor link.
///
/// These never escape [`DeviceLinkManager`]'s public methods; they are logged
/// and folded into [`LinkStatus`] / [`LinkEvent`].
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No candidate port could be opened
    #[error("No device found")]
    NoDeviceFound,

    /// Opening a specific port failed
    #[error("Connection to {port} failed: {reason}")]
    ConnectionFailed {
        /// Port identifier
        port: String,
        /// Failure description
        reason: String,
    },

    /// Opening a port did not finish in time
    #[error("Connection to {port} timed out after {timeout_ms}ms")]
    Timeout {
        /// Port identifier
        port: String,
        /// Configured connect timeout
        timeout_ms: u64,
    },

    /// Serial driver error
    #[cfg(feature = "serial")]
    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the device link.
#[derive(Clone, Debug)]
pub struct LinkConfig {
    /// Serial baud rate
    pub baud_rate: u32,

    /// Only ever try this port when set
    pub port_override: Option<String>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            port_override: None,
        }
    }
}

// ============================================================================
// Device Handle
// ============================================================================

/// An open (or closed) connection to one serial port.
pub struct DeviceHandle {
    port: String,
    stream: Option<Box<dyn SerialStream>>,
    opened_at: Instant,
}

impl DeviceHandle {
    fn new(port: String, stream: Box<dyn SerialStream>) -> Self {
        Self {
            port,
            stream: Some(stream),
            opened_at: Instant::now(),
        }
    }

    /// Port identifier.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Check if the handle is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Time since the handle was opened.
    #[must_use]
    pub fn connection_duration(&self) -> Duration {
        self.opened_at.elapsed()
    }

    fn close(&mut self) {
        self.stream = None;
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("port", &self.port)
            .field("open", &self.is_open())
            .finish()
    }
}

// ============================================================================
// Link Status and Events
// ============================================================================

/// Outcome of one reconnect tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkStatus {
    /// Handle was already open; nothing to do
    AlreadyOpen,
    /// The last-known port was reopened
    Reconnected {
        /// Port identifier
        port: String,
    },
    /// Discovery opened a port
    Discovered {
        /// Port identifier
        port: String,
    },
    /// No port could be opened
    Unavailable,
}

impl LinkStatus {
    /// Check if a handle is open after this tick.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

/// Link changes noticed outside a reconnect tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    /// Handle closed after a read failure
    Lost {
        /// Port identifier
        port: String,
        /// Failure description
        reason: String,
    },
}

/// Counters for the current link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Bytes received
    pub bytes_received: u64,
    /// Samples successfully decoded
    pub samples_received: u64,
    /// Read calls that failed and closed the handle
    pub read_failures: u64,
    /// Successful opens (first connection included)
    pub connections: u64,
}

// ============================================================================
// Link Manager
// ============================================================================

/// Serial link manager for a single sensor.
pub struct DeviceLinkManager {
    backend: Box<dyn PortBackend>,
    config: LinkConfig,
    handle: Option<DeviceHandle>,
    last_known_port: Option<String>,
    decoder: LineDecoder,
    read_buffer: Vec<u8>,
    events: Vec<LinkEvent>,
    stats: LinkStats,
}

impl DeviceLinkManager {
    /// Create a manager over a port backend. No port is opened yet.
    #[must_use]
    pub fn new(backend: Box<dyn PortBackend>, config: LinkConfig) -> Self {
        Self {
            backend,
            config,
            handle: None,
            last_known_port: None,
            decoder: LineDecoder::new(),
            read_buffer: Vec::with_capacity(1024),
            events: Vec::new(),
            stats: LinkStats::default(),
        }
    }

    /// Enumerate ports and open the first one that accepts a connection.
    ///
    /// Records the opened port as last-known.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::NoDeviceFound`] when no candidate opens.
    pub fn discover_and_open(&mut self) -> DeviceResult<&DeviceHandle> {
        let candidates = match &self.config.port_override {
            Some(port) => vec![port.clone()],
            None => match self.backend.available_ports() {
                Ok(ports) => ports,
                Err(e) => {
                    warn!(error = %e, "Port enumeration failed");
                    Vec::new()
                }
            },
        };

        debug!(count = candidates.len(), "Scanning serial ports");

        for port in candidates {
            match self.backend.open(&port, self.config.baud_rate) {
                Ok(stream) => {
                    info!(port = %port, baud = self.config.baud_rate, "Device connected");
                    self.install(port.clone(), stream);
                    return self.handle.as_ref().ok_or(DeviceError::NoDeviceFound);
                }
                Err(e) => {
                    debug!(port = %port, error = %e, "Port did not open");
                }
            }
        }

        Err(DeviceError::NoDeviceFound)
    }

    /// Periodic link health check.
    ///
    /// No-op while the handle is open. Otherwise tries the last-known port,
    /// then falls back to full discovery.
    pub fn tick(&mut self) -> LinkStatus {
        if self.is_open() {
            return LinkStatus::AlreadyOpen;
        }

        if let Some(port) = self.last_known_port.clone() {
            match self.backend.open(&port, self.config.baud_rate) {
                Ok(stream) => {
                    info!(port = %port, "Reconnected to device");
                    self.install(port.clone(), stream);
                    return LinkStatus::Reconnected { port };
                }
                Err(e) => {
                    warn!(port = %port, error = %e, "Reconnect failed");
                }
            }
        }

        match self.discover_and_open() {
            Ok(handle) => LinkStatus::Discovered {
                port: handle.port().to_string(),
            },
            Err(e) => {
                warn!(error = %e, "Device unavailable, check device connection");
                LinkStatus::Unavailable
            }
        }
    }

    /// Drain pending bytes and decode complete sample lines.
    ///
    /// Returns immediately with no samples when the handle is closed or
    /// nothing is pending. A read failure closes the handle and queues a
    /// [`LinkEvent::Lost`].
    pub fn read_available(&mut self) -> Vec<f64> {
        let Some(handle) = self.handle.as_mut() else {
            return Vec::new();
        };
        let Some(stream) = handle.stream.as_mut() else {
            return Vec::new();
        };

        self.read_buffer.clear();
        let failure = stream.read_pending(&mut self.read_buffer).err();

        let decoded = self.decoder.feed(&self.read_buffer);
        for reason in &decoded.dropped {
            warn!(port = %handle.port, reason = %reason, "Dropped malformed sample line");
        }

        self.stats.bytes_received += self.read_buffer.len() as u64;
        self.stats.samples_received += decoded.samples.len() as u64;

        if let Some(e) = failure {
            warn!(
                port = %handle.port,
                error = %e,
                connected_for = ?handle.connection_duration(),
                "Serial read failed, closing handle"
            );
            handle.close();
            self.decoder.reset();
            self.stats.read_failures += 1;
            self.events.push(LinkEvent::Lost {
                port: handle.port.clone(),
                reason: e.to_string(),
            });
        }

        decoded.samples
    }

    /// Take queued link events.
    pub fn drain_events(&mut self) -> Vec<LinkEvent> {
        std::mem::take(&mut self.events)
    }

    /// Check if a handle is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.handle.as_ref().is_some_and(DeviceHandle::is_open)
    }

    /// Current handle, open or closed.
    #[must_use]
    pub fn handle(&self) -> Option<&DeviceHandle> {
        self.handle.as_ref()
    }

    /// Port of the open handle.
    #[must_use]
    pub fn port(&self) -> Option<&str> {
        self.handle.as_ref().filter(|h| h.is_open()).map(DeviceHandle::port)
    }

    /// Port remembered from the last successful open.
    #[must_use]
    pub fn last_known_port(&self) -> Option<&str> {
        self.last_known_port.as_deref()
    }

    /// Lines dropped as malformed since creation.
    #[must_use]
    pub fn dropped_lines(&self) -> u64 {
        self.decoder.dropped_lines()
    }

    /// Link counters.
    #[must_use]
    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// List ports the backend can see.
    ///
    /// # Errors
    ///
    /// Returns error if enumeration fails.
    pub fn available_ports(&self) -> DeviceResult<Vec<String>> {
        self.backend.available_ports()
    }

    /// Close any open handle. The last-known port is kept.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            if handle.is_open() {
                info!(port = %handle.port, "Closing device link");
            }
            handle.close();
        }
        self.decoder.reset();
    }

    fn install(&mut self, port: String, stream: Box<dyn SerialStream>) {
        self.decoder.reset();
        self.last_known_port = Some(port.clone());
        self.handle = Some(DeviceHandle::new(port, stream));
        self.stats.connections += 1;
    }
}

impl Drop for DeviceLinkManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================
