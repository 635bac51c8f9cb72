//! Communication bridge to the biosignal sensor
//!
//! This module provides the serial transport and its lifecycle:
//! - [`serial`]: Port enumeration and non-blocking reads (requires `serial` feature
//!   for real hardware)
//! - [`device_manager`]: Single-device link with discovery and reconnection
//!
//! # Reconnection
//!
//! The [`DeviceLinkManager`] never returns an error across its public
//! boundary. A failed read closes the handle, and the next
//! [`DeviceLinkManager::tick`] tries the last-known port before running a
//! full discovery again.
//!
//! ```rust,ignore
//! use cardioscope_native::bridge::{DeviceLinkManager, LinkConfig, SystemPorts};
//!
//! let mut link = DeviceLinkManager::new(Box::new(SystemPorts::default()), LinkConfig::default());
//!
//! link.tick();
//! let samples = link.read_available();
//! ```

pub mod device_manager;
pub mod serial;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types
pub use device_manager::{
    DeviceError, DeviceHandle, DeviceLinkManager, DeviceResult, LinkConfig, LinkEvent, LinkStats,
    LinkStatus,
};
pub use serial::{PortBackend, SerialStream, SystemPorts};

#[cfg(feature = "serial")]
pub use serial::SerialBridge;
