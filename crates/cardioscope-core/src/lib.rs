//! Cardioscope Core - `no_std` compatible types and utilities
//!
//! This crate provides the foundational types, statistics and serial framing
//! for the Cardioscope biosignal pipeline. It only needs `alloc`, so the same
//! sample parsing and heart-rate types can run on the sensor side as well as
//! on the host.
//!
//! # Modules
//!
//! - [`types`]: Sampling configuration and heart-rate estimates
//! - [`error`]: Error types for configuration, processing, and protocol
//! - [`math`]: Summary statistics over sample windows
//! - [`protocol`]: Newline-delimited ASCII sample framing
//!
//! # Features
//!
//! - `std`: Enable standard library support (`std::error::Error` impls)
//!
//! # Example
//!
//! ```rust
//! use cardioscope_core::protocol::LineDecoder;
//! use cardioscope_core::types::SamplingConfig;
//!
//! let config = SamplingConfig::new(50).unwrap();
//! assert_eq!(config.tick_period_ms(), 20);
//!
//! let mut decoder = LineDecoder::new();
//! let decoded = decoder.feed(b"512.0\nnoise\n498.5\n");
//! assert_eq!(decoded.samples, vec![512.0, 498.5]);
//! assert_eq!(decoder.dropped_lines(), 1);
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod error;
pub mod math;
pub mod protocol;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{ConfigError, ProcessingError, ProtocolError};
pub use protocol::{Decoded, LineDecoder};
pub use types::{HeartRate, PeakEstimate, SamplingConfig};
