//! Fixed-capacity circular store for the trailing audio history.
//!
//! The buffer always holds exactly `capacity` samples. Pushes overwrite the
//! oldest samples in place; snapshots copy the whole window out in
//! oldest-to-newest order. State lives behind a `parking_lot::Mutex`, so the
//! capture thread and the render tick never observe a half-written chunk.

use crate::error::{Result, VizError};
use parking_lot::Mutex;

/// Rolling window of the most recent samples, shared between the capture
/// thread (writer) and the render scheduler (reader).
pub struct RingBuffer {
    capacity: usize,
    inner: Mutex<RingState>,
}

struct RingState {
    data: Vec<f32>,
    /// Index of the oldest sample, which is also the next write position.
    write_pos: usize,
    /// Total samples pushed since creation or the last reset.
    total_written: u64,
}

impl RingBuffer {
    /// Creates a zero-filled buffer holding `capacity` samples.
    ///
    /// # Errors
    /// - `InvalidParameter` if `capacity` is zero
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(VizError::InvalidParameter(
                "ring buffer capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            inner: Mutex::new(RingState {
                data: vec![0.0; capacity],
                write_pos: 0,
                total_written: 0,
            }),
        })
    }

    /// Creates a buffer sized for `seconds` of audio at `sample_rate`.
    ///
    /// # Errors
    /// - `InvalidParameter` if either argument is zero
    pub fn with_duration(sample_rate: u32, seconds: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(VizError::InvalidParameter(
                "sample rate must be positive".to_string(),
            ));
        }
        if seconds == 0 {
            return Err(VizError::InvalidParameter(
                "buffer length must be at least one second".to_string(),
            ));
        }
        Self::new(sample_rate as usize * seconds as usize)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a chunk, overwriting the oldest samples.
    ///
    /// Runs in O(chunk length). A chunk longer than the capacity only
    /// contributes its last `capacity` samples.
    pub fn push(&self, chunk: &[f32]) {
        if chunk.is_empty() {
            return;
        }
        let tail = &chunk[chunk.len().saturating_sub(self.capacity)..];

        let mut state = self.inner.lock();
        let start = state.write_pos;
        let first_len = tail.len().min(self.capacity - start);
        state.data[start..start + first_len].copy_from_slice(&tail[..first_len]);
        let rest = &tail[first_len..];
        state.data[..rest.len()].copy_from_slice(rest);

        state.write_pos = (start + tail.len()) % self.capacity;
        state.total_written += chunk.len() as u64;
    }

    /// Returns all `capacity` samples, oldest first.
    pub fn snapshot(&self) -> Vec<f32> {
        let state = self.inner.lock();
        let mut out = Vec::with_capacity(self.capacity);
        out.extend_from_slice(&state.data[state.write_pos..]);
        out.extend_from_slice(&state.data[..state.write_pos]);
        out
    }

    /// Zeroes every sample and rewinds the write cursor.
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        state.data.fill(0.0);
        state.write_pos = 0;
        state.total_written = 0;
    }

    /// Number of samples pushed since creation or the last reset.
    pub fn total_written(&self) -> u64 {
        self.inner.lock().total_written
    }
}
