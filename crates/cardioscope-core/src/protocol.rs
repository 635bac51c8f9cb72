//! Serial sample framing
//!
//! The sensor streams one ASCII decimal sample per line at a fixed baud
//! rate:
//!
//! ```text
//! 512.25\n
//! 498\r\n
//! ```
//!
//! The link is noisy, so framing is lossy by policy: a malformed line is
//! dropped and counted, and decoding continues with the next line. A line
//! split across two reads is reassembled from the decoder's pending bytes.

use alloc::vec::Vec;

use crate::error::ProtocolError;

/// Longest line accepted before the pending bytes are discarded.
pub const MAX_LINE_LEN: usize = 64;

/// Samples and drop reasons from one [`LineDecoder::feed`] call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Decoded {
    /// Successfully parsed samples, in arrival order
    pub samples: Vec<f64>,
    /// One entry per dropped line, in arrival order
    pub dropped: Vec<ProtocolError>,
}

/// Incremental newline-delimited sample decoder.
#[derive(Clone, Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
    overflowed: bool,
    dropped_lines: u64,
}

impl LineDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return every complete line decoded from them.
    ///
    /// Bytes after the last newline are kept for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Decoded {
        let mut decoded = Decoded::default();

        for &byte in bytes {
            if byte == b'\n' {
                if self.overflowed {
                    self.overflowed = false;
                } else {
                    self.finish_line(&mut decoded);
                }
                self.pending.clear();
                continue;
            }

            if self.overflowed {
                continue;
            }

            self.pending.push(byte);
            if self.pending.len() > MAX_LINE_LEN {
                decoded.dropped.push(ProtocolError::LineTooLong {
                    len: self.pending.len(),
                    max: MAX_LINE_LEN,
                });
                self.dropped_lines += 1;
                self.pending.clear();
                self.overflowed = true;
            }
        }

        decoded
    }

    /// Discard any partially received line.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.overflowed = false;
    }

    /// Total number of lines dropped since creation.
    #[inline]
    pub fn dropped_lines(&self) -> u64 {
        self.dropped_lines
    }

    /// Number of bytes waiting for a line terminator.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn finish_line(&mut self, decoded: &mut Decoded) {
        let line = trim_ascii(&self.pending);
        if line.is_empty() {
            return;
        }

        match parse_sample(line) {
            Ok(value) => decoded.samples.push(value),
            Err(e) => {
                decoded.dropped.push(e);
                self.dropped_lines += 1;
            }
        }
    }
}

/// Parse one line (without terminator) as a finite sample value.
///
/// # Errors
///
/// Returns the reason the line cannot be used as a sample.
pub fn parse_sample(line: &[u8]) -> Result<f64, ProtocolError> {
    let text = core::str::from_utf8(line).map_err(|_| ProtocolError::InvalidUtf8)?;
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidNumber { len: line.len() })?;

    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProtocolError::NonFinite)
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &bytes[start..end]
}

// ============================================================================
// Tests
// ============================================================================
