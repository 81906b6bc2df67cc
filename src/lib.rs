//! Game Boy (DMG) APU Emulator
//!
//! A cycle-accurate emulator of the Game Boy sound unit: two pulse-wave
//! channels (one with frequency sweep), a programmable wave channel and a
//! noise channel, gated by the 512 Hz frame sequencer and mixed into a
//! host-rate stereo stream.
//!
//! # Features
//! - Cycle-accurate emulation of all 4 audio channels
//! - Frame sequencer with hardware length/sweep/envelope gating,
//!   including the extra length clock quirk
//! - Full NR10-NR52 register map with per-register read-back masks and
//!   live NR52 status bits
//! - Tick-rate to host-rate resampling with time-weighted averaging
//! - Bounded producer/consumer sample buffer with overrun accounting
//!
//! # Crate feature flags
//! - `streaming` (opt-in): real-time audio output (enables optional
//!   `rodio` dep)
//! - `export-wav` (opt-in): offline WAV rendering (enables optional
//!   `hound` dep)
//!
//! # Quick start
//! ```
//! use dmg_apu::{Apu, ApuConfig};
//!
//! let mut apu = Apu::new(ApuConfig::default()).unwrap();
//! apu.write_register(0xFF26, 0x80); // NR52: power on
//! apu.write_register(0xFF25, 0x11); // NR51: channel 1 both sides
//! apu.write_register(0xFF24, 0x77); // NR50: full master volume
//! apu.write_register(0xFF12, 0xF3); // NR12: volume 15, decay
//! apu.write_register(0xFF14, 0x86); // NR14: trigger
//!
//! apu.advance(70_224); // one video frame worth of cycles
//! for (_left, _right) in apu.drain_frames(1024) {
//!     // hand frames to the audio backend
//! }
//! ```
//!
//! # Real-time streaming
//! ```no_run
//! # #[cfg(feature = "streaming")]
//! # {
//! use dmg_apu::{Apu, ApuConfig, AudioDevice, StreamConfig};
//!
//! let stream = StreamConfig::low_latency(48_000);
//! let mut apu = Apu::new(ApuConfig {
//!     sample_rate: stream.sample_rate,
//!     buffer_capacity: stream.buffer_frames,
//!     ..ApuConfig::default()
//! }).unwrap();
//! let _device = AudioDevice::new(stream.sample_rate, apu.sample_buffer()).unwrap();
//! // drive apu.advance(..) from the emulation loop
//! # }
//! ```

#![warn(missing_docs)]

pub mod apu;
pub mod buffer;
pub mod channels;
pub mod constants;
pub mod mixer;
pub mod resampler;
pub mod sequencer;

#[cfg(feature = "export-wav")]
pub mod export;
#[cfg(feature = "streaming")]
pub mod streaming;

/// Error types for APU operations
#[derive(thiserror::Error, Debug)]
pub enum ApuError {
    /// Invalid construction-time configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Sample buffer sizing or allocation problem
    #[error("Sample buffer error: {0}")]
    BufferError(String),

    /// Audio device acquisition or playback failure
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Offline render failure
    #[error("Export error: {0}")]
    ExportError(String),
}

/// Result type for APU operations
pub type Result<T> = std::result::Result<T, ApuError>;

// Public API exports
pub use apu::{Apu, ApuConfig, ApuState};
pub use buffer::SampleBuffer;
pub use resampler::Frame;

#[cfg(feature = "export-wav")]
pub use export::render_wav;
#[cfg(feature = "streaming")]
pub use streaming::{AudioDevice, StreamConfig};
