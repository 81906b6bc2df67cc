//! DMG Hardware Constants
//!
//! Shared clocks, lookup tables and register masks used across APU components.

/// CPU clock frequency in T-cycles per second (4.194304 MHz)
pub const CPU_CLOCK: u32 = 4_194_304;

/// T-cycles between frame sequencer steps (512 Hz at 4.194304 MHz)
pub const FRAME_SEQUENCER_PERIOD: u32 = 8192;

/// Number of frame sequencer steps before wrapping
pub const FRAME_SEQUENCER_STEPS: u8 = 8;

/// Number of audio channels (pulse 1, pulse 2, wave, noise)
pub const NUM_CHANNELS: usize = 4;

/// Maximum 11-bit channel frequency value
pub const MAX_FREQUENCY: u16 = 2047;

/// Wave pattern RAM size in bytes (32 samples, 4 bits each)
pub const WAVE_RAM_SIZE: usize = 16;

/// Pulse duty waveforms (4 presets, 8 phase steps each)
///
/// Each row is one full duty cycle; a `1` means the channel outputs its
/// current envelope volume during that phase step.
pub const DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 0, 0, 0, 0, 0, 0, 1], // 12.5%
    [1, 0, 0, 0, 0, 0, 0, 1], // 25%
    [1, 0, 0, 0, 0, 1, 1, 1], // 50%
    [0, 1, 1, 1, 1, 1, 1, 0], // 75%
];

/// Noise channel base divisors, indexed by the divisor code in NR43
///
/// The noise frequency timer period is `divisor << clock_shift` T-cycles.
pub const NOISE_DIVISORS: [u16; 8] = [8, 16, 32, 48, 64, 80, 96, 112];

/// First APU register address (NR10)
pub const REG_BASE: u16 = 0xFF10;

/// NR52 sound on/off and status register address
pub const REG_NR52: u16 = 0xFF26;

/// First wave RAM address
pub const WAVE_RAM_BASE: u16 = 0xFF30;

/// Last wave RAM address
pub const WAVE_RAM_END: u16 = 0xFF3F;

/// Per-register OR masks applied on read-back, indexed by `addr - 0xFF10`
///
/// Write-only and unused bits read back as 1 on the real chip. Unmapped
/// addresses inside the register window (0xFF15, 0xFF1F) read as 0xFF.
pub const READ_OR_MASK: [u8; 23] = [
    0x80, 0x3F, 0x00, 0xFF, 0xBF, // NR10-NR14
    0xFF, 0x3F, 0x00, 0xFF, 0xBF, // unused, NR21-NR24
    0x7F, 0xFF, 0x9F, 0xFF, 0xBF, // NR30-NR34
    0xFF, 0xFF, 0x00, 0x00, 0xBF, // unused, NR41-NR44
    0x00, 0x00, 0x70, // NR50-NR52
];

/// Value returned for reads outside the APU address range (open bus)
pub const OPEN_BUS: u8 = 0xFF;
