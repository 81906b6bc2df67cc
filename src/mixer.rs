//! Stereo output mixer
//!
//! Combines the four channel amplitudes into one stereo sample per chip
//! tick. NR51 routes each channel to the left and/or right side, NR50
//! scales each side by an independent master volume. Output saturates to
//! the i16 range rather than wrapping.

use crate::constants::NUM_CHANNELS;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Sound panning register (NR51) bitflags
    ///
    /// Low nibble routes channels 1-4 to the right output, high nibble to
    /// the left.
    ///
    /// Serde impls come from the bitflags `serde` feature.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Panning: u8 {
        /// Channel 1 to right output
        const CH1_RIGHT = 0x01;
        /// Channel 2 to right output
        const CH2_RIGHT = 0x02;
        /// Channel 3 to right output
        const CH3_RIGHT = 0x04;
        /// Channel 4 to right output
        const CH4_RIGHT = 0x08;
        /// Channel 1 to left output
        const CH1_LEFT = 0x10;
        /// Channel 2 to left output
        const CH2_LEFT = 0x20;
        /// Channel 3 to left output
        const CH3_LEFT = 0x40;
        /// Channel 4 to left output
        const CH4_LEFT = 0x80;
    }
}

/// Mixer configuration mutated only through NR50/NR51 writes
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MixerConfig {
    /// Per-channel left/right routing (NR51)
    pub panning: Panning,
    /// Left master volume (0-7)
    pub left_volume: u8,
    /// Right master volume (0-7)
    pub right_volume: u8,
    /// VIN-to-left bit (NR50 bit 7, stored for read-back only)
    pub vin_left: bool,
    /// VIN-to-right bit (NR50 bit 3, stored for read-back only)
    pub vin_right: bool,
}

impl MixerConfig {
    /// All channels unrouted, volumes zero
    pub fn new() -> Self {
        Self {
            panning: Panning::empty(),
            left_volume: 0,
            right_volume: 0,
            vin_left: false,
            vin_right: false,
        }
    }

    /// Load from an NR50 write
    pub fn write_nr50(&mut self, value: u8) {
        self.vin_left = value & 0x80 != 0;
        self.left_volume = (value >> 4) & 0x07;
        self.vin_right = value & 0x08 != 0;
        self.right_volume = value & 0x07;
    }

    /// Reconstruct the NR50 register value
    pub fn read_nr50(&self) -> u8 {
        (if self.vin_left { 0x80 } else { 0 })
            | (self.left_volume << 4)
            | (if self.vin_right { 0x08 } else { 0 })
            | self.right_volume
    }

    /// Load from an NR51 write
    pub fn write_nr51(&mut self, value: u8) {
        self.panning = Panning::from_bits_retain(value);
    }

    /// Reconstruct the NR51 register value
    pub fn read_nr51(&self) -> u8 {
        self.panning.bits()
    }

    /// Whether the given channel (0-3) is routed to the left output
    #[inline]
    fn routed_left(&self, channel: usize) -> bool {
        self.panning.bits() & (0x10 << channel) != 0
    }

    /// Whether the given channel (0-3) is routed to the right output
    #[inline]
    fn routed_right(&self, channel: usize) -> bool {
        self.panning.bits() & (0x01 << channel) != 0
    }
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Sums channel DAC levels into one saturated stereo sample per tick
#[derive(Clone, Debug, Default)]
pub struct Mixer {
    /// Routing and volume configuration
    pub config: MixerConfig,
}

impl Mixer {
    /// Fixed output gain applied after volume scaling
    ///
    /// Worst case per side: 4 channels x |15| DAC level x volume 8 x 64
    /// = 30720, inside the i16 range; the clamp is the documented
    /// saturation policy, not an expected path.
    const OUTPUT_GAIN: i32 = 64;

    /// Create a mixer with everything unrouted
    pub fn new() -> Self {
        Self {
            config: MixerConfig::new(),
        }
    }

    /// Mix one tick's channel amplitudes into a stereo sample
    ///
    /// `amplitudes` are the 4-bit channel outputs; `dac_on` marks channels
    /// whose DAC is powered. A powered DAC maps amplitude 0..=15 onto the
    /// signed level -15..=15; an unpowered DAC contributes nothing.
    pub fn mix(&self, amplitudes: [u8; NUM_CHANNELS], dac_on: [bool; NUM_CHANNELS]) -> (i16, i16) {
        let mut left = 0i32;
        let mut right = 0i32;

        for (channel, (&amp, &dac)) in amplitudes.iter().zip(dac_on.iter()).enumerate() {
            debug_assert!(amp <= 15, "channel {channel} amplitude {amp} out of range");
            if !dac {
                continue;
            }
            let level = amp as i32 * 2 - 15;
            if self.config.routed_left(channel) {
                left += level;
            }
            if self.config.routed_right(channel) {
                right += level;
            }
        }

        left *= (self.config.left_volume as i32 + 1) * Self::OUTPUT_GAIN;
        right *= (self.config.right_volume as i32 + 1) * Self::OUTPUT_GAIN;

        (
            left.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            right.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
        )
    }
}
