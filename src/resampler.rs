//! Chip-tick to host-rate resampler
//!
//! The chip produces one stereo sample per T-cycle (4.194304 MHz); the
//! host plays back at 44.1 or 48 kHz. A fractional accumulator adds the
//! host rate once per tick and carries against the chip clock; every carry
//! emits one frame holding the average of all ticks since the previous
//! carry. Averaging preserves the time-weighted amplitude of the chip
//! signal, which keeps aliasing of the raw square edges down.

use crate::constants::CPU_CLOCK;
use serde::{Deserialize, Serialize};

/// One finished host-rate stereo frame
pub type Frame = (i16, i16);

/// Downsamples the T-cycle amplitude stream to the host sample rate
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Resampler {
    /// Host playback rate in Hz
    host_rate: u32,
    /// Fractional accumulator against the chip clock
    accumulator: u32,
    /// Sum of left samples since the last emitted frame
    sum_left: i64,
    /// Sum of right samples since the last emitted frame
    sum_right: i64,
    /// Ticks accumulated since the last emitted frame
    ticks: u32,
}

impl Resampler {
    /// Create a resampler for the given host rate
    ///
    /// The rate must be non-zero and no higher than the chip clock.
    pub fn new(host_rate: u32) -> Self {
        debug_assert!(host_rate > 0 && host_rate <= CPU_CLOCK);
        Self {
            host_rate,
            accumulator: 0,
            sum_left: 0,
            sum_right: 0,
            ticks: 0,
        }
    }

    /// Host playback rate in Hz
    pub fn host_rate(&self) -> u32 {
        self.host_rate
    }

    /// Feed one chip tick; returns a finished frame on accumulator carry
    #[inline]
    pub fn push(&mut self, left: i16, right: i16) -> Option<Frame> {
        self.sum_left += left as i64;
        self.sum_right += right as i64;
        self.ticks += 1;

        self.accumulator += self.host_rate;
        if self.accumulator < CPU_CLOCK {
            return None;
        }
        self.accumulator -= CPU_CLOCK;

        let ticks = self.ticks as i64;
        let frame = (
            (self.sum_left / ticks) as i16,
            (self.sum_right / ticks) as i16,
        );
        self.sum_left = 0;
        self.sum_right = 0;
        self.ticks = 0;
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Feed a DC signal for one second of chip time, collect the frames
    fn render_dc(host_rate: u32, level: i16) -> Vec<Frame> {
        let mut resampler = Resampler::new(host_rate);
        let mut frames = Vec::new();
        for _ in 0..CPU_CLOCK {
            if let Some(frame) = resampler.push(level, -level) {
                frames.push(frame);
            }
        }
        frames
    }

    #[test]
    fn test_dc_signal_stays_flat() {
        for host_rate in [44_100, 48_000] {
            for (l, r) in render_dc(host_rate, 12_000) {
                assert_eq!(l, 12_000);
                assert_eq!(r, -12_000);
            }
        }
    }

    #[test]
    fn test_output_rate_matches_host_rate() {
        for host_rate in [22_050, 44_100, 48_000, 96_000] {
            let frames = render_dc(host_rate, 100);
            assert_relative_eq!(
                frames.len() as f64,
                host_rate as f64,
                max_relative = 1e-4
            );
        }
    }

    #[test]
    fn test_alternating_signal_averages_out() {
        // A 50% square at half the chip rate must average to the midpoint
        let mut resampler = Resampler::new(48_000);
        let mut high = false;
        for _ in 0..CPU_CLOCK {
            high = !high;
            let level = if high { 1000 } else { 0 };
            if let Some((l, _)) = resampler.push(level, level) {
                assert_relative_eq!(l as f64, 500.0, max_relative = 0.02);
            }
        }
    }

    #[test]
    fn test_frames_preserve_order() {
        // A slow ramp must come out monotonically non-decreasing
        let mut resampler = Resampler::new(44_100);
        let mut previous = i16::MIN;
        for tick in 0..CPU_CLOCK {
            let level = (tick / 1024) as i16;
            if let Some((l, _)) = resampler.push(level, level) {
                assert!(l >= previous, "frame out of order: {l} after {previous}");
                previous = l;
            }
        }
    }
}
