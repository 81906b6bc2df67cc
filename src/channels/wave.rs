//! Programmable wave channel
//!
//! Plays 32 caller-loaded 4-bit samples from wave RAM. There is no envelope
//! unit; NR32 selects a volume shift applied to every sample.

use crate::channels::LengthCounter;
use crate::constants::WAVE_RAM_SIZE;
use serde::{Deserialize, Serialize};

/// Wave channel length counter reload value
const LENGTH_MAX: u16 = 256;

/// Volume shift per NR32 output-level code (0 = mute via shift 4)
const VOLUME_SHIFT: [u8; 4] = [4, 0, 1, 2];

/// Programmable wave channel state machine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Wave {
    /// DAC power bit (NR30 bit 7)
    dac: bool,
    /// Output level code (NR32 bits 6-5)
    volume_code: u8,
    /// 11-bit frequency from NR33/NR34
    frequency: u16,
    /// Frequency timer position (counts up to the period)
    counter: u32,
    /// Current index into the 32-sample table
    position: u8,
    /// Channel active flag (NR52 status bit)
    enabled: bool,
    /// Wave pattern RAM (two 4-bit samples per byte, high nibble first)
    ram: [u8; WAVE_RAM_SIZE],
    length: LengthCounter,
}

impl Wave {
    /// Create a silenced wave channel with zeroed wave RAM
    pub fn new() -> Self {
        Self {
            dac: false,
            volume_code: 0,
            frequency: 0,
            counter: 0,
            position: 0,
            enabled: false,
            ram: [0; WAVE_RAM_SIZE],
            length: LengthCounter::new(LENGTH_MAX),
        }
    }

    /// Frequency timer period in T-cycles (twice the pulse rate)
    #[inline]
    fn timer_period(&self) -> u32 {
        (2048 - self.frequency as u32) * 2
    }

    /// Whether the channel DAC is powered (NR30 bit 7)
    #[inline]
    pub fn dac_enabled(&self) -> bool {
        self.dac
    }

    /// Whether the channel is currently producing output
    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// 4-bit sample at the given table index
    fn sample_at(&self, position: u8) -> u8 {
        let byte = self.ram[position as usize / 2];
        if position % 2 == 0 {
            byte >> 4
        } else {
            byte & 0x0F
        }
    }

    /// Write one of the channel registers (offset 0 = NR30 .. 4 = NR34)
    pub fn write_register(&mut self, offset: u8, value: u8, next_step_clocks_length: bool) {
        match offset {
            0 => {
                self.dac = value & 0x80 != 0;
                if !self.dac {
                    self.enabled = false;
                }
            }
            1 => self.length.set_length(value as u16),
            2 => self.volume_code = (value >> 5) & 0x03,
            3 => self.frequency = (self.frequency & 0x0700) | value as u16,
            4 => {
                self.frequency = (self.frequency & 0x00FF) | (((value & 0x07) as u16) << 8);
                if self
                    .length
                    .set_enabled(value & 0x40 != 0, next_step_clocks_length)
                {
                    self.enabled = false;
                }
                if value & 0x80 != 0 {
                    self.trigger(next_step_clocks_length);
                }
            }
            _ => {}
        }
    }

    /// Read one of the channel registers without the read-back OR mask
    pub fn read_register(&self, offset: u8) -> u8 {
        match offset {
            0 => {
                if self.dac {
                    0x80
                } else {
                    0
                }
            }
            2 => self.volume_code << 5,
            3 => (self.frequency & 0xFF) as u8,
            4 => {
                let enable = if self.length.enabled() { 0x40 } else { 0 };
                enable | ((self.frequency >> 8) as u8 & 0x07)
            }
            _ => 0,
        }
    }

    /// Read a wave RAM byte
    pub fn read_ram(&self, index: usize) -> u8 {
        self.ram[index]
    }

    /// Write a wave RAM byte
    pub fn write_ram(&mut self, index: usize, value: u8) {
        self.ram[index] = value;
    }

    /// Restart the channel (NR34 bit 7 write-strobe)
    pub fn trigger(&mut self, next_step_clocks_length: bool) {
        self.enabled = self.dac;
        self.length.on_trigger(next_step_clocks_length);
        self.counter = 0;
        self.position = 0;
    }

    /// Length clock from the frame sequencer
    pub fn clock_length(&mut self) {
        if self.length.clock() {
            self.enabled = false;
        }
    }

    /// Advance the frequency timer by one T-cycle and return the amplitude
    #[inline]
    pub fn step(&mut self) -> u8 {
        if !self.enabled || !self.dac {
            return 0;
        }
        self.counter += 1;
        if self.counter >= self.timer_period() {
            self.counter = 0;
            self.position = (self.position + 1) & 31;
        }
        self.sample_at(self.position) >> VOLUME_SHIFT[self.volume_code as usize]
    }

    /// Clear registers on APU power-off, preserving wave RAM and length
    pub fn power_off(&mut self) {
        self.dac = false;
        self.volume_code = 0;
        self.frequency = 0;
        self.counter = 0;
        self.position = 0;
        self.enabled = false;
        self.length.power_off();
    }
}

impl Default for Wave {
    fn default() -> Self {
        Self::new()
    }
}
