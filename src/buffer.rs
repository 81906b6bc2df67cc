//! Bounded sample buffer between the emulation and audio threads
//!
//! A ring of finished host-rate stereo frames. The emulation thread is the
//! only producer, the host audio backend the only consumer. Backpressure
//! policy: a push against a full ring drops the new frame and counts one
//! overrun; the producer never blocks and the ring never grows.
//!
//! Uses mutex-protected storage with atomic position tracking for
//! cross-thread visibility.

use crate::resampler::Frame;
use crate::{ApuError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Largest accepted ring capacity in frames (1M frames ≈ 20s at 48 kHz)
const MAX_CAPACITY: usize = 1 << 20;

/// Bounded FIFO ring of stereo frames with an overrun counter
///
/// # Thread safety
/// - One producer (the emulation thread pushing resampled frames)
/// - One consumer (the audio device or `drain_frames` caller)
/// - Frame order is strictly FIFO; unread frames are never overwritten
#[derive(Debug)]
pub struct SampleBuffer {
    /// Shared frame storage (protected by mutex for thread safety)
    frames: Mutex<Vec<Frame>>,
    /// Write position (producer)
    write_pos: AtomicUsize,
    /// Read position (consumer)
    read_pos: AtomicUsize,
    /// Capacity (power of 2 for cheap wrapping)
    capacity: usize,
    /// Capacity mask: `pos & mask == pos % capacity`
    mask: usize,
    /// Frames dropped against a full ring
    overruns: AtomicU64,
}

impl SampleBuffer {
    /// Create a buffer with at least the requested capacity
    ///
    /// Capacity is rounded up to the next power of two.
    ///
    /// # Errors
    ///
    /// Returns [`ApuError::BufferError`] when the requested capacity is 0
    /// or larger than the maximum safe allocation.
    pub fn new(requested_capacity: usize) -> Result<Self> {
        if requested_capacity == 0 {
            return Err(ApuError::BufferError(
                "sample buffer capacity must be greater than 0".into(),
            ));
        }
        let capacity = requested_capacity.next_power_of_two();
        if capacity > MAX_CAPACITY {
            return Err(ApuError::BufferError(format!(
                "sample buffer capacity {capacity} exceeds maximum {MAX_CAPACITY}"
            )));
        }

        Ok(Self {
            frames: Mutex::new(vec![(0, 0); capacity]),
            write_pos: AtomicUsize::new(0),
            read_pos: AtomicUsize::new(0),
            capacity,
            mask: capacity - 1,
            overruns: AtomicU64::new(0),
        })
    }

    /// Ring capacity in frames
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of frames available to read
    pub fn available(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    /// Frames dropped so far because the ring was full
    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Push one frame (producer side)
    ///
    /// Returns `false` and records an overrun when the ring is full; the
    /// frame is dropped, never queued late.
    pub fn push(&self, frame: Frame) -> bool {
        let mut frames = self.frames.lock();
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);

        if write.wrapping_sub(read) >= self.capacity {
            drop(frames);
            self.overruns.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        frames[write & self.mask] = frame;
        drop(frames);
        self.write_pos.store(write.wrapping_add(1), Ordering::Release);
        true
    }

    /// Read frames into `dest` (consumer side)
    ///
    /// Returns the number of frames copied; frames come out in push order.
    pub fn read(&self, dest: &mut [Frame]) -> usize {
        let frames = self.frames.lock();
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);

        let available = write.wrapping_sub(read);
        let to_read = dest.len().min(available);
        if to_read == 0 {
            return 0;
        }

        let read_idx = read & self.mask;
        if read_idx + to_read <= self.capacity {
            dest[..to_read].copy_from_slice(&frames[read_idx..read_idx + to_read]);
        } else {
            let first_part = self.capacity - read_idx;
            dest[..first_part].copy_from_slice(&frames[read_idx..]);
            dest[first_part..to_read].copy_from_slice(&frames[..to_read - first_part]);
        }
        drop(frames);

        self.read_pos
            .store(read.wrapping_add(to_read), Ordering::Release);
        to_read
    }

    /// Pop up to `max` frames into a fresh vector (consumer side)
    pub fn drain(&self, max: usize) -> Vec<Frame> {
        let mut out = vec![(0, 0); max.min(self.available())];
        let read = self.read(&mut out);
        out.truncate(read);
        out
    }

    /// Discard all queued frames
    pub fn clear(&self) {
        let write = self.write_pos.load(Ordering::Acquire);
        self.read_pos.store(write, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        let buffer = SampleBuffer::new(1000).unwrap();
        assert_eq!(buffer.capacity(), 1024);
    }

    #[test]
    fn test_zero_capacity_is_an_error() {
        assert!(SampleBuffer::new(0).is_err());
    }

    #[test]
    fn test_excessive_capacity_is_an_error() {
        assert!(SampleBuffer::new(MAX_CAPACITY + 1).is_err());
    }

    #[test]
    fn test_fifo_order() {
        let buffer = SampleBuffer::new(8).unwrap();
        for i in 0..5i16 {
            assert!(buffer.push((i, -i)));
        }
        assert_eq!(buffer.available(), 5);

        let frames = buffer.drain(16);
        assert_eq!(frames, vec![(0, 0), (1, -1), (2, -2), (3, -3), (4, -4)]);
        assert_eq!(buffer.available(), 0);
    }

    #[test]
    fn test_full_ring_drops_and_counts() {
        let buffer = SampleBuffer::new(4).unwrap();
        for i in 0..4i16 {
            assert!(buffer.push((i, i)));
        }

        // Exactly one overrun per dropped frame, queued frames untouched
        assert!(!buffer.push((99, 99)));
        assert!(!buffer.push((98, 98)));
        assert_eq!(buffer.overruns(), 2);

        let frames = buffer.drain(4);
        assert_eq!(frames, vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn test_wrap_around_read() {
        let buffer = SampleBuffer::new(4).unwrap();
        for i in 0..4i16 {
            buffer.push((i, i));
        }
        assert_eq!(buffer.drain(2), vec![(0, 0), (1, 1)]);

        buffer.push((4, 4));
        buffer.push((5, 5));
        assert_eq!(buffer.drain(4), vec![(2, 2), (3, 3), (4, 4), (5, 5)]);
    }

    #[test]
    fn test_drain_respects_max() {
        let buffer = SampleBuffer::new(8).unwrap();
        for i in 0..6i16 {
            buffer.push((i, i));
        }
        assert_eq!(buffer.drain(2).len(), 2);
        assert_eq!(buffer.available(), 4);
    }

    #[test]
    fn test_clear() {
        let buffer = SampleBuffer::new(8).unwrap();
        buffer.push((1, 1));
        buffer.clear();
        assert_eq!(buffer.available(), 0);
        assert_eq!(buffer.overruns(), 0);
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        use std::sync::Arc;

        let buffer = Arc::new(SampleBuffer::new(256).unwrap());
        let producer = Arc::clone(&buffer);

        let handle = std::thread::spawn(move || {
            for i in 0..10_000i32 {
                while !producer.push((i as i16, i as i16)) {
                    std::thread::yield_now();
                }
            }
        });

        let mut expected = 0i32;
        while expected < 10_000 {
            for (l, _) in buffer.drain(64) {
                assert_eq!(l as i32, expected, "frame out of order or lost");
                expected += 1;
            }
        }
        handle.join().unwrap();
    }
}
