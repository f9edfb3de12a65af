//! Audio ring buffer and PCM helpers.
//!
//! [`AudioRingBuffer`] sits between the network receive path, which writes
//! decoded samples as they arrive, and an audio device that pulls fixed-size
//! blocks at its own cadence.

use crate::error::{LiveError, Result};
use parking_lot::Mutex;

/// Highest sample rate accepted for model audio.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Largest ring buffer that will be allocated, in samples.
pub const MAX_CAPACITY: usize = 1 << 27;

/// Bounded circular buffer of `f32` samples with overwrite-oldest semantics.
///
/// All operations take one internal lock, so a writer on the network side
/// and a reader on the audio side can share the buffer through an `Arc`.
pub struct AudioRingBuffer {
    inner: Mutex<RingState>,
}

struct RingState {
    buf: Box<[f32]>,
    write: usize,
    read: usize,
    count: usize,
    delta: usize,
}

impl AudioRingBuffer {
    /// Create a buffer holding at most `capacity` samples.
    ///
    /// Fails for a zero capacity or one above [`MAX_CAPACITY`].
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(LiveError::config("audio ring buffer capacity must be non-zero"));
        }
        if capacity > MAX_CAPACITY {
            return Err(LiveError::config(format!(
                "audio ring buffer capacity {} exceeds the limit of {} samples",
                capacity, MAX_CAPACITY
            )));
        }
        Ok(Self {
            inner: Mutex::new(RingState {
                buf: vec![0.0; capacity].into_boxed_slice(),
                write: 0,
                read: 0,
                count: 0,
                delta: 0,
            }),
        })
    }

    /// Create a buffer sized for `seconds` of audio at `sample_rate`.
    pub fn with_duration(sample_rate: u32, seconds: u32) -> Result<Self> {
        if sample_rate == 0 || sample_rate > MAX_SAMPLE_RATE {
            return Err(LiveError::config(format!(
                "unsupported sample rate {} (expected 1..={})",
                sample_rate, MAX_SAMPLE_RATE
            )));
        }
        let capacity = (sample_rate as usize)
            .checked_mul(seconds as usize)
            .ok_or_else(|| LiveError::config("audio buffer size overflows usize"))?;
        Self::new(capacity)
    }

    /// Maximum number of samples held.
    pub fn capacity(&self) -> usize {
        self.inner.lock().buf.len()
    }

    /// Number of unread samples.
    pub fn len(&self) -> usize {
        self.inner.lock().count
    }

    /// Whether there are no unread samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append samples. Once full, each new sample evicts the oldest unread one.
    pub fn write(&self, samples: &[f32]) {
        let mut state = self.inner.lock();
        let capacity = state.buf.len();
        state.delta += samples.len();

        for &sample in samples {
            let write = state.write;
            state.buf[write] = sample;
            state.write = (write + 1) % capacity;
            if state.count < capacity {
                state.count += 1;
            } else {
                state.read = (state.read + 1) % capacity;
            }
        }
    }

    /// Fill `target` oldest-first and zero the slots left over.
    ///
    /// Returns the number of real samples copied.
    pub fn read(&self, target: &mut [f32]) -> usize {
        let delivered = {
            let mut state = self.inner.lock();
            let capacity = state.buf.len();
            let n = state.count.min(target.len());

            // At most two contiguous runs: read..end, then 0..
            let first = n.min(capacity - state.read);
            target[..first].copy_from_slice(&state.buf[state.read..state.read + first]);
            target[first..n].copy_from_slice(&state.buf[..n - first]);

            state.read = (state.read + n) % capacity;
            state.count -= n;
            n
        };
        target[delivered..].fill(0.0);
        delivered
    }

    /// Number of samples written since the last call, resetting the counter.
    pub fn drain_delta(&self) -> usize {
        std::mem::take(&mut self.inner.lock().delta)
    }
}

impl std::fmt::Debug for AudioRingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("AudioRingBuffer")
            .field("capacity", &state.buf.len())
            .field("len", &state.count)
            .field("delta", &state.delta)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(AudioRingBuffer::new(0), Err(LiveError::Config(_))));
    }

    #[test]
    fn read_zero_fills_tail() {
        let ring = AudioRingBuffer::new(8).unwrap();
        ring.write(&[0.1, 0.2, 0.3]);

        let mut out = [9.0; 5];
        assert_eq!(ring.read(&mut out), 3);
        assert_eq!(out, [0.1, 0.2, 0.3, 0.0, 0.0]);
        assert!(ring.is_empty());
    }

    #[test]
    fn overwrite_keeps_newest() {
        let ring = AudioRingBuffer::new(4).unwrap();
        ring.write(&[1.0, 2.0, 3.0]);
        ring.write(&[4.0, 5.0, 6.0]);
        assert_eq!(ring.len(), 4);

        let mut out = [0.0; 4];
        assert_eq!(ring.read(&mut out), 4);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn read_across_wraparound() {
        let ring = AudioRingBuffer::new(4).unwrap();
        ring.write(&[1.0, 2.0, 3.0]);
        let mut out = [0.0; 2];
        ring.read(&mut out);
        ring.write(&[4.0, 5.0, 6.0]);

        let mut out = [0.0; 4];
        assert_eq!(ring.read(&mut out), 4);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn drain_delta_counts_writes_not_reads() {
        let ring = AudioRingBuffer::new(2).unwrap();
        ring.write(&[1.0, 2.0, 3.0]);
        ring.write(&[4.0]);
        let mut out = [0.0; 2];
        ring.read(&mut out);

        assert_eq!(ring.drain_delta(), 4);
        assert_eq!(ring.drain_delta(), 0);
    }

    #[test]
    fn with_duration_sizes_capacity() {
        let ring = AudioRingBuffer::with_duration(24000, 2).unwrap();
        assert_eq!(ring.capacity(), 48000);
    }

    #[test]
    fn oversized_buffers_are_rejected() {
        assert!(matches!(AudioRingBuffer::new(MAX_CAPACITY + 1), Err(LiveError::Config(_))));
        assert!(matches!(
            AudioRingBuffer::with_duration(4_000_000_000, 240),
            Err(LiveError::Config(_))
        ));
        assert!(matches!(AudioRingBuffer::with_duration(0, 240), Err(LiveError::Config(_))));
        assert!(matches!(
            AudioRingBuffer::with_duration(MAX_SAMPLE_RATE, u32::MAX),
            Err(LiveError::Config(_))
        ));
    }

    #[test]
    fn highest_rate_fits_default_duration() {
        let capacity = MAX_SAMPLE_RATE as usize * 240;
        assert!(capacity <= MAX_CAPACITY);
    }
}
