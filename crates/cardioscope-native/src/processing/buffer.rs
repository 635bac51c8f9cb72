//! Bounded sample buffer
//!
//! Single writer (sampling tick), single reader (processing on the same
//! tick). Readers work on a [`SampleBuffer::snapshot`] copy so processing
//! never observes a buffer that is being pushed to.

use std::collections::VecDeque;

use cardioscope_core::error::ConfigError;
use cardioscope_core::types::DEFAULT_BUFFER_CAPACITY;

/// Fixed-capacity FIFO ring buffer.
#[derive(Clone, Debug)]
pub struct SampleBuffer<T = f64> {
    samples: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> SampleBuffer<T> {
    /// Create a buffer holding at most `capacity` samples.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroCapacity`] for a zero capacity.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        Ok(Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append a sample, evicting the oldest one when full.
    pub fn push(&mut self, sample: T) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Ordered copy of the current contents, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.samples.iter().cloned().collect()
    }

    /// Remove all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Number of buffered samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Check if the next push will evict.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Maximum number of samples held.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent sample.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.samples.back()
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.samples.iter()
    }
}

impl<T: Clone> Extend<T> for SampleBuffer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for sample in iter {
            self.push(sample);
        }
    }
}

impl Default for SampleBuffer<f64> {
    fn default() -> Self {
        Self {
            samples: VecDeque::with_capacity(DEFAULT_BUFFER_CAPACITY),
            capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
