//! Real-time audio output
//!
//! Host-facing playback layer: a stream configuration helper and a rodio
//! device that pulls finished frames from the APU's sample buffer. The
//! emulation core never touches the device; it only fills the buffer.

mod audio_device;

pub use audio_device::AudioDevice;

/// Stream configuration for real-time playback
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    /// Playback sample rate in Hz
    pub sample_rate: u32,
    /// Sample buffer capacity in frames
    pub buffer_frames: usize,
}

impl StreamConfig {
    /// Low-latency preset (~23 ms of buffered audio at 44.1 kHz)
    pub fn low_latency(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            buffer_frames: 1024,
        }
    }

    /// Stability-first preset (~186 ms of buffered audio at 44.1 kHz)
    pub fn stable(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            buffer_frames: 8192,
        }
    }

    /// Worst-case buffered latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        self.buffer_frames as f32 * 1000.0 / self.sample_rate as f32
    }
}
