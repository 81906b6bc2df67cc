//! APU orchestrator and memory-mapped register interface
//!
//! Owns the four channel state machines, the frame sequencer, mixer,
//! resampler and the outgoing sample buffer. The CPU side drives it
//! through `advance`, `read_register` and `write_register`; the host audio
//! side drains finished frames at its own cadence.

use crate::buffer::SampleBuffer;
use crate::channels::{Noise, Pulse, Wave};
use crate::constants::{
    CPU_CLOCK, OPEN_BUS, READ_OR_MASK, REG_BASE, REG_NR52, WAVE_RAM_BASE, WAVE_RAM_END,
};
use crate::mixer::{Mixer, MixerConfig};
use crate::resampler::{Frame, Resampler};
use crate::sequencer::FrameSequencer;
use crate::{ApuError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Construction-time configuration
#[derive(Debug, Clone, Copy)]
pub struct ApuConfig {
    /// Host playback sample rate in Hz
    pub sample_rate: u32,
    /// Sample buffer capacity in frames (rounded up to a power of two)
    pub buffer_capacity: usize,
    /// Headless mode: no device interaction, emulation runs identically
    pub silent: bool,
    /// Trace register writes and channel cutoffs to stderr
    pub debug: bool,
}

impl Default for ApuConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            buffer_capacity: 4096,
            silent: false,
            debug: false,
        }
    }
}

/// Snapshot of every externally serializable piece of core state
///
/// Captured with [`Apu::snapshot`] and restored with [`Apu::restore`]; the
/// actual persistence format belongs to the caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApuState {
    /// Pulse channel 1 (with sweep)
    pub pulse1: Pulse,
    /// Pulse channel 2
    pub pulse2: Pulse,
    /// Programmable wave channel
    pub wave: Wave,
    /// Noise channel
    pub noise: Noise,
    /// Frame sequencer position
    pub sequencer: FrameSequencer,
    /// NR50/NR51 routing and volumes
    pub mixer: MixerConfig,
    /// NR52 bit 7
    pub powered: bool,
    /// Elapsed T-cycles since power-on
    pub cycles: u64,
}

/// Cycle-accurate DMG APU core
///
/// # Example
///
/// ```
/// use dmg_apu::{Apu, ApuConfig};
///
/// let mut apu = Apu::new(ApuConfig::default()).unwrap();
/// apu.write_register(0xFF26, 0x80); // power on
/// apu.write_register(0xFF25, 0x11); // channel 1 to both sides
/// apu.write_register(0xFF24, 0x77); // full master volume
/// apu.write_register(0xFF12, 0xF0); // full envelope volume
/// apu.write_register(0xFF13, 0x00);
/// apu.write_register(0xFF14, 0x87); // trigger at frequency 1792
///
/// apu.advance(8192);
/// let frames = apu.drain_frames(128);
/// assert!(!frames.is_empty());
/// ```
pub struct Apu {
    pulse1: Pulse,
    pulse2: Pulse,
    wave: Wave,
    noise: Noise,
    sequencer: FrameSequencer,
    mixer: Mixer,
    resampler: Resampler,
    buffer: Arc<SampleBuffer>,
    /// NR52 bit 7; while clear, channels and sequencer are halted
    powered: bool,
    /// Monotonic count of elapsed T-cycles
    cycles: u64,
    silent: bool,
    debug: bool,
}

impl Apu {
    /// Create an APU core for the given host configuration
    ///
    /// # Errors
    ///
    /// Returns [`ApuError::ConfigError`] for an unusable sample rate and
    /// [`ApuError::BufferError`] for an unusable buffer capacity.
    pub fn new(config: ApuConfig) -> Result<Self> {
        if config.sample_rate == 0 || config.sample_rate > CPU_CLOCK {
            return Err(ApuError::ConfigError(format!(
                "sample rate {} outside 1..={}",
                config.sample_rate, CPU_CLOCK
            )));
        }

        Ok(Self {
            pulse1: Pulse::new(),
            pulse2: Pulse::new(),
            wave: Wave::new(),
            noise: Noise::new(),
            sequencer: FrameSequencer::new(),
            mixer: Mixer::new(),
            resampler: Resampler::new(config.sample_rate),
            buffer: Arc::new(SampleBuffer::new(config.buffer_capacity)?),
            powered: false,
            cycles: 0,
            silent: config.silent,
            debug: config.debug,
        })
    }

    /// Host playback sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.resampler.host_rate()
    }

    /// Elapsed T-cycles since construction
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Whether the core runs headless
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// Frames dropped against a full sample buffer
    pub fn overruns(&self) -> u64 {
        self.buffer.overruns()
    }

    /// Shared handle to the outgoing sample buffer
    ///
    /// Hand this to the audio device so its thread can drain frames
    /// directly.
    pub fn sample_buffer(&self) -> Arc<SampleBuffer> {
        Arc::clone(&self.buffer)
    }

    /// Advance the chip by `cycle_count` T-cycles
    ///
    /// Safe to call with 0 or any batched value; the core loops
    /// tick-by-tick internally. Each tick drives the frame sequencer and
    /// all four channels, mixes their outputs and feeds the resampler.
    pub fn advance(&mut self, cycle_count: u32) {
        for _ in 0..cycle_count {
            self.cycles += 1;

            let sample = if self.powered {
                self.tick_chip()
            } else {
                (0, 0)
            };

            if let Some(frame) = self.resampler.push(sample.0, sample.1) {
                self.buffer.push(frame);
            }
        }
    }

    /// One powered T-cycle: sequencer, channels, mixer
    #[inline]
    fn tick_chip(&mut self) -> Frame {
        if let Some(step) = self.sequencer.tick() {
            if step.clocks_length() {
                self.pulse1.clock_length();
                self.pulse2.clock_length();
                self.wave.clock_length();
                self.noise.clock_length();
            }
            if step.clocks_sweep() {
                self.pulse1.clock_sweep();
            }
            if step.clocks_envelope() {
                self.pulse1.clock_envelope();
                self.pulse2.clock_envelope();
                self.noise.clock_envelope();
            }
        }

        let amplitudes = [
            self.pulse1.step(),
            self.pulse2.step(),
            self.wave.step(),
            self.noise.step(),
        ];
        let dac_on = [
            self.pulse1.dac_enabled(),
            self.pulse2.dac_enabled(),
            self.wave.dac_enabled(),
            self.noise.dac_enabled(),
        ];
        self.mixer.mix(amplitudes, dac_on)
    }

    /// Write a memory-mapped sound register
    ///
    /// While powered off only NR52 and wave RAM are writable; everything
    /// else is ignored. Unmapped addresses are ignored entirely.
    pub fn write_register(&mut self, address: u16, value: u8) {
        if self.debug {
            eprintln!("apu: write {address:#06X} <- {value:#04X}");
        }
        if !self.powered && address != REG_NR52 && !Self::is_wave_ram(address) {
            return;
        }

        let next_len = self.sequencer.next_step_clocks_length();
        match address {
            0xFF10..=0xFF14 => {
                self.pulse1
                    .write_register((address - 0xFF10) as u8, value, next_len)
            }
            0xFF16..=0xFF19 => {
                self.pulse2
                    .write_register((address - 0xFF15) as u8, value, next_len)
            }
            0xFF1A..=0xFF1E => {
                self.wave
                    .write_register((address - 0xFF1A) as u8, value, next_len)
            }
            0xFF20..=0xFF23 => {
                self.noise
                    .write_register((address - 0xFF1F) as u8, value, next_len)
            }
            0xFF24 => self.mixer.config.write_nr50(value),
            0xFF25 => self.mixer.config.write_nr51(value),
            REG_NR52 => self.write_power(value),
            WAVE_RAM_BASE..=WAVE_RAM_END => {
                self.wave.write_ram((address - WAVE_RAM_BASE) as usize, value)
            }
            _ => {}
        }
    }

    /// Read a memory-mapped sound register
    ///
    /// Applies the per-register OR masks; write-only bits read as 1.
    /// Unmapped addresses read as open bus (0xFF). Channel status bits in
    /// NR52 come from live channel state, never stored copies.
    pub fn read_register(&self, address: u16) -> u8 {
        let raw = match address {
            0xFF10..=0xFF14 => self.pulse1.read_register((address - 0xFF10) as u8),
            0xFF16..=0xFF19 => self.pulse2.read_register((address - 0xFF15) as u8),
            0xFF1A..=0xFF1E => self.wave.read_register((address - 0xFF1A) as u8),
            0xFF20..=0xFF23 => self.noise.read_register((address - 0xFF1F) as u8),
            0xFF24 => self.mixer.config.read_nr50(),
            0xFF25 => self.mixer.config.read_nr51(),
            REG_NR52 => self.read_status(),
            WAVE_RAM_BASE..=WAVE_RAM_END => {
                return self.wave.read_ram((address - WAVE_RAM_BASE) as usize)
            }
            _ => return OPEN_BUS,
        };
        raw | READ_OR_MASK[(address - REG_BASE) as usize]
    }

    /// Drain up to `max_count` finished stereo frames, oldest first
    ///
    /// Undrained frames stay queued for the next call.
    pub fn drain_frames(&mut self, max_count: usize) -> Vec<Frame> {
        self.buffer.drain(max_count)
    }

    /// Capture all serializable core state
    pub fn snapshot(&self) -> ApuState {
        ApuState {
            pulse1: self.pulse1.clone(),
            pulse2: self.pulse2.clone(),
            wave: self.wave.clone(),
            noise: self.noise.clone(),
            sequencer: self.sequencer.clone(),
            mixer: self.mixer.config.clone(),
            powered: self.powered,
            cycles: self.cycles,
        }
    }

    /// Restore state captured with [`Apu::snapshot`]
    ///
    /// Queued frames are discarded; the resampler restarts cleanly from
    /// the restored chip state.
    pub fn restore(&mut self, state: &ApuState) {
        self.pulse1 = state.pulse1.clone();
        self.pulse2 = state.pulse2.clone();
        self.wave = state.wave.clone();
        self.noise = state.noise.clone();
        self.sequencer = state.sequencer.clone();
        self.mixer.config = state.mixer.clone();
        self.powered = state.powered;
        self.cycles = state.cycles;
        self.buffer.clear();
    }

    fn is_wave_ram(address: u16) -> bool {
        (WAVE_RAM_BASE..=WAVE_RAM_END).contains(&address)
    }

    /// NR52 write: only bit 7 is writable
    fn write_power(&mut self, value: u8) {
        let on = value & 0x80 != 0;
        if on && !self.powered {
            // Power-on restarts the frame sequencer at step 0
            self.sequencer.reset();
        } else if !on && self.powered {
            // Power-off zeroes every register; wave RAM and the length
            // counters themselves survive on DMG hardware
            self.pulse1.power_off();
            self.pulse2.power_off();
            self.wave.power_off();
            self.noise.power_off();
            self.mixer.config = MixerConfig::new();
            if self.debug {
                eprintln!("apu: powered off");
            }
        }
        self.powered = on;
    }

    /// NR52 read: power bit plus live channel status
    fn read_status(&self) -> u8 {
        let mut status = if self.powered { 0x80 } else { 0 };
        if self.pulse1.enabled() {
            status |= 0x01;
        }
        if self.pulse2.enabled() {
            status |= 0x02;
        }
        if self.wave.enabled() {
            status |= 0x04;
        }
        if self.noise.enabled() {
            status |= 0x08;
        }
        status
    }
}

impl std::fmt::Debug for Apu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Apu")
            .field("powered", &self.powered)
            .field("cycles", &self.cycles)
            .field("sample_rate", &self.resampler.host_rate())
            .field("status", &self.read_status())
            .finish_non_exhaustive()
    }
}
