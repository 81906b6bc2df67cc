//! Channel state machines for the four DMG sound generators
//!
//! This module contains the shared per-channel hardware units:
//! - Length counters (auto-disable after a programmed duration)
//! - Volume envelopes (pulse and noise channels)
//! - Frequency sweep (pulse channel 1 only)
//!
//! The channel types themselves live in the submodules.

mod noise;
mod pulse;
mod wave;

pub use noise::Noise;
pub use pulse::Pulse;
pub use wave::Wave;

use crate::constants::MAX_FREQUENCY;
use serde::{Deserialize, Serialize};

/// Length counter shared by all four channels
///
/// When enabled, each length clock decrements the counter by one; reaching
/// zero disables the channel regardless of any other state. Pulse and noise
/// channels count from 64, the wave channel from 256.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LengthCounter {
    /// Reload value (64 or 256)
    max: u16,
    /// Remaining length clocks before the channel is cut off
    counter: u16,
    /// Length enable bit from NRx4
    enabled: bool,
}

impl LengthCounter {
    /// Create a length counter with the given reload value
    pub fn new(max: u16) -> Self {
        Self {
            max,
            counter: 0,
            enabled: false,
        }
    }

    /// Load the counter from the length data written to NRx1
    ///
    /// The stored value is `max - data`, so writing 0 programs the longest
    /// duration.
    pub fn set_length(&mut self, data: u16) {
        self.counter = self.max - data;
    }

    /// Current counter value
    pub fn counter(&self) -> u16 {
        self.counter
    }

    /// Whether the length enable bit is set
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Update the enable bit from an NRx4 write
    ///
    /// Returns `true` when the channel must be disabled. Enabling the
    /// counter in the first half of a length period (the frame sequencer's
    /// next step will not clock length) performs one extra decrement, which
    /// can itself cut the channel off.
    pub fn set_enabled(&mut self, enable: bool, next_step_clocks_length: bool) -> bool {
        let was_enabled = self.enabled;
        self.enabled = enable;

        if enable && !was_enabled && !next_step_clocks_length && self.counter > 0 {
            self.counter -= 1;
            return self.counter == 0;
        }
        false
    }

    /// Length clock from the frame sequencer
    ///
    /// Returns `true` when the counter reaches zero and the channel must be
    /// disabled.
    pub fn clock(&mut self) -> bool {
        if self.enabled && self.counter > 0 {
            self.counter -= 1;
            return self.counter == 0;
        }
        false
    }

    /// Reload on trigger when the counter has run out
    ///
    /// A zero counter reloads to `max`; if the counter is enabled and the
    /// next frame sequencer step will not clock length, the reload lands on
    /// `max - 1` instead (the same extra-clock quirk as `set_enabled`).
    pub fn on_trigger(&mut self, next_step_clocks_length: bool) {
        if self.counter == 0 {
            self.counter = self.max;
            if self.enabled && !next_step_clocks_length {
                self.counter -= 1;
            }
        }
    }

    /// Clear the enable bit while preserving the counter (APU power-off)
    pub fn power_off(&mut self) {
        self.enabled = false;
    }
}

/// Volume envelope unit (pulse and noise channels)
///
/// Every `period` envelope clocks the 4-bit volume moves one step in the
/// programmed direction and saturates at 0 or 15. A period of zero freezes
/// the volume.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Envelope {
    /// Current output volume (0-15)
    volume: u8,
    /// Volume reloaded on trigger (NRx2 bits 7-4)
    start_volume: u8,
    /// Direction bit (NRx2 bit 3): true = increase
    increase: bool,
    /// Programmed period (NRx2 bits 2-0)
    period: u8,
    /// Envelope clocks until the next volume step
    countdown: u8,
}

impl Envelope {
    /// Create a silent envelope
    pub fn new() -> Self {
        Self::default()
    }

    /// Load parameters from an NRx2 write
    pub fn set_register(&mut self, value: u8) {
        self.start_volume = value >> 4;
        self.increase = value & 0x08 != 0;
        self.period = value & 0x07;
    }

    /// Reconstruct the NRx2 register value
    pub fn register(&self) -> u8 {
        (self.start_volume << 4) | if self.increase { 0x08 } else { 0 } | self.period
    }

    /// Current output volume (0-15)
    #[inline]
    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Envelope clock from the frame sequencer
    #[inline]
    pub fn clock(&mut self) {
        if self.period == 0 {
            return;
        }
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            self.countdown = self.period;
            if self.increase {
                if self.volume < 15 {
                    self.volume += 1;
                }
            } else if self.volume > 0 {
                self.volume -= 1;
            }
        }
    }

    /// Restart the envelope on channel trigger
    pub fn trigger(&mut self) {
        self.volume = self.start_volume;
        self.countdown = self.period;
    }
}

/// Result of one sweep clock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepClock {
    /// Nothing happened this clock
    Idle,
    /// The candidate frequency overflowed; disable the channel
    Overflow,
    /// Write this frequency back to the channel
    Update(u16),
}

/// Frequency sweep unit (pulse channel 1)
///
/// On each sweep clock the candidate frequency is
/// `shadow ± (shadow >> shift)`. A candidate above the 11-bit maximum
/// disables the channel; this overflow check also runs once immediately at
/// trigger time when the shift is non-zero.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Sweep {
    /// Programmed period (NR10 bits 6-4)
    period: u8,
    /// Direction bit (NR10 bit 3): true = decrease
    negate: bool,
    /// Shift amount (NR10 bits 2-0)
    shift: u8,
    /// Sweep clocks until the next frequency step
    countdown: u8,
    /// Shadow copy of the channel frequency
    shadow: u16,
    /// Latched at trigger: sweep is processing at all
    active: bool,
}

impl Sweep {
    /// Create an inactive sweep unit
    pub fn new() -> Self {
        Self::default()
    }

    /// Load parameters from an NR10 write
    pub fn set_register(&mut self, value: u8) {
        self.period = (value >> 4) & 0x07;
        self.negate = value & 0x08 != 0;
        self.shift = value & 0x07;
    }

    /// Reconstruct the NR10 register value
    pub fn register(&self) -> u8 {
        (self.period << 4) | if self.negate { 0x08 } else { 0 } | self.shift
    }

    /// The internal timer treats a period of 0 as 8
    fn reload_value(&self) -> u8 {
        if self.period == 0 { 8 } else { self.period }
    }

    /// Candidate frequency from the current shadow value
    fn next_frequency(&self) -> u16 {
        let delta = self.shadow >> self.shift;
        if self.negate {
            self.shadow.wrapping_sub(delta)
        } else {
            self.shadow + delta
        }
    }

    /// Whether the next candidate frequency overflows the 11-bit range
    pub fn overflows_next(&self) -> bool {
        self.next_frequency() > MAX_FREQUENCY
    }

    /// Latch the shadow frequency on channel trigger
    ///
    /// Returns `true` when the immediate overflow check fails and the
    /// channel must be disabled.
    pub fn on_trigger(&mut self, frequency: u16) -> bool {
        self.shadow = frequency;
        self.countdown = self.reload_value();
        self.active = self.period != 0 || self.shift != 0;
        self.shift != 0 && self.overflows_next()
    }

    /// Sweep clock from the frame sequencer
    pub fn clock(&mut self) -> SweepClock {
        if self.countdown > 0 {
            self.countdown -= 1;
        }
        if self.countdown != 0 {
            return SweepClock::Idle;
        }
        self.countdown = self.reload_value();

        if !self.active || self.period == 0 {
            return SweepClock::Idle;
        }

        let candidate = self.next_frequency();
        if candidate > MAX_FREQUENCY {
            return SweepClock::Overflow;
        }
        if self.shift != 0 {
            self.shadow = candidate;
            return SweepClock::Update(candidate);
        }
        SweepClock::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_counter_reaches_zero() {
        let mut length = LengthCounter::new(64);
        length.set_length(63); // counter = 1
        assert!(!length.set_enabled(true, true));

        // Exactly one clock disables the channel
        assert!(length.clock());
        assert_eq!(length.counter(), 0);

        // Further clocks are inert
        assert!(!length.clock());
    }

    #[test]
    fn test_length_counter_extra_clock_on_enable() {
        let mut length = LengthCounter::new(64);
        length.set_length(63); // counter = 1

        // Enabling while the next step skips length clocks immediately
        assert!(length.set_enabled(true, false));
        assert_eq!(length.counter(), 0);
    }

    #[test]
    fn test_length_counter_no_extra_clock_when_already_enabled() {
        let mut length = LengthCounter::new(64);
        length.set_length(62);
        length.set_enabled(true, true);

        // Re-writing the enable bit must not clock again
        assert!(!length.set_enabled(true, false));
        assert_eq!(length.counter(), 2);
    }

    #[test]
    fn test_length_trigger_reload_quirk() {
        let mut length = LengthCounter::new(64);
        length.set_enabled(true, true);
        assert_eq!(length.counter(), 0);

        // Reload in the first half of a length period lands on max - 1
        length.on_trigger(false);
        assert_eq!(length.counter(), 63);

        // Normal reload hits max
        let mut length = LengthCounter::new(256);
        length.on_trigger(true);
        assert_eq!(length.counter(), 256);
    }

    #[test]
    fn test_envelope_decreases_and_saturates() {
        let mut env = Envelope::new();
        env.set_register(0x31); // start volume 3, decrease, period 1
        env.trigger();
        assert_eq!(env.volume(), 3);

        for expected in [2, 1, 0, 0, 0] {
            env.clock();
            assert_eq!(env.volume(), expected);
        }
    }

    #[test]
    fn test_envelope_increases_and_saturates() {
        let mut env = Envelope::new();
        env.set_register(0xD9); // start volume 13, increase, period 1
        env.trigger();

        for _ in 0..10 {
            env.clock();
            assert!(env.volume() <= 15);
        }
        assert_eq!(env.volume(), 15);
    }

    #[test]
    fn test_envelope_period_zero_freezes_volume() {
        let mut env = Envelope::new();
        env.set_register(0xA0); // start volume 10, period 0
        env.trigger();

        for _ in 0..20 {
            env.clock();
        }
        assert_eq!(env.volume(), 10);
    }

    #[test]
    fn test_envelope_respects_period() {
        let mut env = Envelope::new();
        env.set_register(0xF3); // start volume 15, decrease, period 3
        env.trigger();

        env.clock();
        env.clock();
        assert_eq!(env.volume(), 15);
        env.clock();
        assert_eq!(env.volume(), 14);
    }

    #[test]
    fn test_sweep_overflow_at_trigger() {
        let mut sweep = Sweep::new();
        sweep.set_register(0x11); // period 1, increase, shift 1

        // 2047 + (2047 >> 1) overflows immediately
        assert!(sweep.on_trigger(2047));

        // A low frequency passes the same check
        assert!(!sweep.on_trigger(100));
    }

    #[test]
    fn test_sweep_updates_frequency() {
        let mut sweep = Sweep::new();
        sweep.set_register(0x11);
        assert!(!sweep.on_trigger(256));

        assert_eq!(sweep.clock(), SweepClock::Update(384)); // 256 + 128
        assert_eq!(sweep.clock(), SweepClock::Update(576)); // 384 + 192
    }

    #[test]
    fn test_sweep_overflow_on_clock() {
        let mut sweep = Sweep::new();
        sweep.set_register(0x11);
        assert!(!sweep.on_trigger(1400));

        // 1400 + 700 = 2100 > 2047
        assert_eq!(sweep.clock(), SweepClock::Overflow);
    }

    #[test]
    fn test_sweep_decrease_never_overflows() {
        let mut sweep = Sweep::new();
        sweep.set_register(0x19); // period 1, decrease, shift 1
        assert!(!sweep.on_trigger(2047));

        assert_eq!(sweep.clock(), SweepClock::Update(1024));
    }

    #[test]
    fn test_sweep_period_zero_is_idle() {
        let mut sweep = Sweep::new();
        sweep.set_register(0x01); // period 0, shift 1
        assert!(!sweep.on_trigger(512));

        // Timer runs with the period-8 reload but never updates
        for _ in 0..32 {
            assert_eq!(sweep.clock(), SweepClock::Idle);
        }
    }
}
