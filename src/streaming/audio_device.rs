//! Audio device integration using rodio
//!
//! Plays frames from the APU's sample buffer on the default output device.
//! The device thread drains the buffer at its own cadence; an empty buffer
//! yields silence rather than stalling the stream.

use crate::buffer::SampleBuffer;
use crate::{ApuError, Result};
use rodio::{OutputStream, Sink, Source};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Frames fetched from the ring per batch read
const BATCH_FRAMES: usize = 512;

/// Audio source that reads stereo frames from the sample buffer
struct BufferSource {
    buffer: Arc<SampleBuffer>,
    sample_rate: u32,
    finished: Arc<AtomicBool>,
    /// Interleaved samples from the last batch read
    batch: Vec<f32>,
    /// Position in the interleaved batch
    batch_pos: usize,
}

impl BufferSource {
    fn new(buffer: Arc<SampleBuffer>, sample_rate: u32, finished: Arc<AtomicBool>) -> Self {
        Self {
            buffer,
            sample_rate,
            finished,
            batch: Vec::with_capacity(BATCH_FRAMES * 2),
            batch_pos: 0,
        }
    }

    /// Refill the interleaved batch from the ring; silence on underrun
    fn refill(&mut self) {
        let mut frames = [(0i16, 0i16); BATCH_FRAMES];
        let read = self.buffer.read(&mut frames);

        self.batch.clear();
        if read == 0 {
            // Underrun: keep the stream alive with silence
            self.batch.resize(BATCH_FRAMES * 2, 0.0);
        } else {
            for &(left, right) in &frames[..read] {
                self.batch.push(left as f32 / i16::MAX as f32);
                self.batch.push(right as f32 / i16::MAX as f32);
            }
        }
        self.batch_pos = 0;
    }
}

impl Iterator for BufferSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.finished.load(Ordering::Relaxed) {
            return None;
        }
        if self.batch_pos >= self.batch.len() {
            self.refill();
        }
        let sample = self.batch[self.batch_pos];
        self.batch_pos += 1;
        Some(sample)
    }
}

impl Source for BufferSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(BATCH_FRAMES * 2)
    }

    fn channels(&self) -> u16 {
        2
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Audio playback device draining the APU sample buffer
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    finished: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Acquire the default output device and start playback
    ///
    /// # Errors
    ///
    /// Returns [`ApuError::AudioDeviceError`] when no output device is
    /// available; the caller decides whether that is fatal (it is, unless
    /// running silent).
    pub fn new(sample_rate: u32, buffer: Arc<SampleBuffer>) -> Result<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| ApuError::AudioDeviceError(format!("failed to open output: {e}")))?;
        let sink = Sink::try_new(&handle)
            .map_err(|e| ApuError::AudioDeviceError(format!("failed to create sink: {e}")))?;

        let finished = Arc::new(AtomicBool::new(false));
        let source = BufferSource::new(buffer, sample_rate, Arc::clone(&finished));
        sink.append(source);
        sink.play();

        Ok(Self {
            _stream: stream,
            sink,
            finished,
        })
    }

    /// Pause playback without tearing down the device
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume playback
    pub fn play(&self) {
        self.sink.play();
    }

    /// Stop the stream permanently
    pub fn stop(&self) {
        self.finished.store(true, Ordering::Relaxed);
        self.sink.stop();
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.finished.store(true, Ordering::Relaxed);
    }
}
