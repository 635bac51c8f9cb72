//! Serial bridge for the biosignal sensor
//!
//! Handles port enumeration and non-blocking reads over a USB serial link.
//! The [`PortBackend`] trait is the seam between the link manager and the
//! operating system, so reconnection logic can be driven by a scripted port
//! set in tests.

use std::time::Duration;

use super::device_manager::{DeviceError, DeviceResult};

/// Default upper bound on how long opening a port may take.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Default read timeout applied to an open port.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// An open byte stream from the sensor.
pub trait SerialStream: Send {
    /// Append every byte currently pending on the port to `out`.
    ///
    /// Must return immediately with `Ok(0)` when nothing is pending.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error; the caller treats it as link loss.
    fn read_pending(&mut self, out: &mut Vec<u8>) -> std::io::Result<usize>;
}

/// Source of serial endpoints.
pub trait PortBackend {
    /// List available port identifiers in enumeration order.
    ///
    /// # Errors
    ///
    /// Returns error if the ports cannot be enumerated.
    fn available_ports(&self) -> DeviceResult<Vec<String>>;

    /// Open a port at the given baud rate.
    ///
    /// Implementations must bound the time spent opening.
    ///
    /// # Errors
    ///
    /// Returns error if the port cannot be opened in time.
    fn open(&self, port: &str, baud_rate: u32) -> DeviceResult<Box<dyn SerialStream>>;
}

// ============================================================================
// serialport-backed implementation
// ============================================================================

/// USB serial connection to the sensor
#[cfg(feature = "serial")]
pub struct SerialBridge {
    port: Box<dyn serialport::SerialPort>,
    read_buffer: Vec<u8>,
}

#[cfg(feature = "serial")]
impl SerialBridge {
    /// Open a serial connection to the sensor
    ///
    /// # Arguments
    ///
    /// * `port_name` - Serial port name (e.g., "/dev/ttyUSB0" or "COM3")
    /// * `baud_rate` - Baud rate (the sensor uses 9600)
    /// * `read_timeout` - Timeout for a single read call
    ///
    /// # Errors
    ///
    /// Returns error if port cannot be opened
    pub fn open(port_name: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, anyhow::Error> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(read_timeout)
            .open()?;

        Ok(Self {
            port,
            read_buffer: vec![0u8; 256],
        })
    }
}

#[cfg(feature = "serial")]
impl SerialStream for SerialBridge {
    fn read_pending(&mut self, out: &mut Vec<u8>) -> std::io::Result<usize> {
        let mut total = 0;

        loop {
            let pending = self.port.bytes_to_read().map_err(std::io::Error::from)? as usize;
            if pending == 0 {
                return Ok(total);
            }

            let want = pending.min(self.read_buffer.len());
            match std::io::Read::read(&mut self.port, &mut self.read_buffer[..want]) {
                Ok(0) => return Ok(total),
                Ok(n) => {
                    out.extend_from_slice(&self.read_buffer[..n]);
                    total += n;
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => return Ok(total),
                Err(e) => return Err(e),
            }
        }
    }
}

/// Operating-system serial ports.
#[derive(Clone, Debug)]
pub struct SystemPorts {
    /// Upper bound on a single open attempt
    pub connect_timeout: Duration,
    /// Read timeout for an open port
    pub read_timeout: Duration,
}

impl SystemPorts {
    /// Create a backend with an explicit connect timeout.
    #[must_use]
    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout, ..Self::default() }
    }
}

impl Default for SystemPorts {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

#[cfg(feature = "serial")]
impl PortBackend for SystemPorts {
    fn available_ports(&self) -> DeviceResult<Vec<String>> {
        let ports = serialport::available_ports()?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    fn open(&self, port: &str, baud_rate: u32) -> DeviceResult<Box<dyn SerialStream>> {
        let name = port.to_string();
        let read_timeout = self.read_timeout;

        let bridge = open_with_timeout(port, self.connect_timeout, move || {
            SerialBridge::open(&name, baud_rate, read_timeout)
        })?;
        Ok(Box::new(bridge))
    }
}

/// Run `open` on a helper thread and wait at most `timeout` for it.
///
/// On timeout the thread is abandoned and its late result dropped.
///
/// # Errors
///
/// Returns [`DeviceError::Timeout`] when `open` does not finish in time and
/// [`DeviceError::ConnectionFailed`] when it fails.
#[cfg_attr(not(feature = "serial"), allow(dead_code))]
pub(crate) fn open_with_timeout<T, F>(port: &str, timeout: Duration, open: F) -> DeviceResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    use std::sync::mpsc;

    let (tx, rx) = mpsc::channel();

    std::thread::Builder::new()
        .name(format!("serial-open-{port}"))
        .spawn(move || {
            let _ = tx.send(open());
        })
        .map_err(|e| DeviceError::ConnectionFailed {
            port: port.to_string(),
            reason: e.to_string(),
        })?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(opened)) => Ok(opened),
        Ok(Err(e)) => Err(DeviceError::ConnectionFailed {
            port: port.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(DeviceError::Timeout {
            port: port.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Serial backend stub when feature disabled.
#[cfg(not(feature = "serial"))]
impl PortBackend for SystemPorts {
    fn available_ports(&self) -> DeviceResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn open(&self, port: &str, _baud_rate: u32) -> DeviceResult<Box<dyn SerialStream>> {
        Err(DeviceError::ConnectionFailed {
            port: port.to_string(),
            reason: "serial support not enabled".to_string(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_system_ports_defaults() {
        let ports = SystemPorts::default();
        assert_eq!(ports.connect_timeout, DEFAULT_CONNECT_TIMEOUT);

        let ports = SystemPorts::with_connect_timeout(Duration::from_millis(250));
        assert_eq!(ports.connect_timeout, Duration::from_millis(250));
        assert_eq!(ports.read_timeout, DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn test_slow_open_times_out() {
        let timeout = Duration::from_millis(50);
        let started = Instant::now();

        let result = open_with_timeout("/dev/ttySLOW", timeout, || {
            std::thread::sleep(Duration::from_millis(1000));
            Ok(())
        });

        assert!(started.elapsed() < Duration::from_millis(800));
        match result {
            Err(DeviceError::Timeout { port, timeout_ms }) => {
                assert_eq!(port, "/dev/ttySLOW");
                assert_eq!(timeout_ms, 50);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_open_result_passes_through() {
        let opened = open_with_timeout("COM3", Duration::from_secs(5), || Ok(7_u8));
        assert!(matches!(opened, Ok(7)));

        let failed: DeviceResult<()> =
            open_with_timeout("COM4", Duration::from_secs(5), || anyhow::bail!("access denied"));
        match failed {
            Err(DeviceError::ConnectionFailed { port, reason }) => {
                assert_eq!(port, "COM4");
                assert!(reason.contains("access denied"));
            }
            other => panic!("expected connection failure, got {other:?}"),
        }
    }

    #[test]
    fn test_open_missing_port_fails() {
        let ports = SystemPorts::with_connect_timeout(Duration::from_millis(500));
        let result = ports.open("/dev/cardioscope-does-not-exist", 9600);

        assert!(matches!(
            result,
            Err(DeviceError::ConnectionFailed { .. } | DeviceError::Timeout { .. })
        ));
    }
}
