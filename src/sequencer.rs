//! Frame sequencer
//!
//! A 512 Hz clock divider driven by the CPU cycle counter. Each of its
//! eight steps gates a fixed set of channel updates:
//!
//! | Step | Length | Sweep | Envelope |
//! |------|--------|-------|----------|
//! | 0    | yes    |       |          |
//! | 1    |        |       |          |
//! | 2    | yes    | yes   |          |
//! | 3    |        |       |          |
//! | 4    | yes    |       |          |
//! | 5    |        |       |          |
//! | 6    | yes    | yes   |          |
//! | 7    |        |       | yes      |

use crate::constants::{FRAME_SEQUENCER_PERIOD, FRAME_SEQUENCER_STEPS};
use serde::{Deserialize, Serialize};

/// A frame sequencer step that fired during a tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step(u8);

impl Step {
    /// Step index (0-7)
    pub fn index(&self) -> u8 {
        self.0
    }

    /// Length counters clock on even steps
    pub fn clocks_length(&self) -> bool {
        self.0 % 2 == 0
    }

    /// Sweep clocks on steps 2 and 6
    pub fn clocks_sweep(&self) -> bool {
        self.0 == 2 || self.0 == 6
    }

    /// Envelopes clock on step 7
    pub fn clocks_envelope(&self) -> bool {
        self.0 == 7
    }
}

/// Fixed-rate clock divider gating length, sweep and envelope updates
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameSequencer {
    /// Next step to fire (0-7, wrapping)
    step: u8,
    /// T-cycles until the next step fires
    countdown: u32,
}

impl FrameSequencer {
    /// Create a sequencer about to fire step 0
    pub fn new() -> Self {
        Self {
            step: 0,
            countdown: FRAME_SEQUENCER_PERIOD,
        }
    }

    /// Advance by one T-cycle; returns the step that fired, if any
    #[inline]
    pub fn tick(&mut self) -> Option<Step> {
        self.countdown -= 1;
        if self.countdown > 0 {
            return None;
        }
        self.countdown = FRAME_SEQUENCER_PERIOD;
        let fired = self.step;
        self.step = (self.step + 1) % FRAME_SEQUENCER_STEPS;
        Some(Step(fired))
    }

    /// Whether the next step to fire will clock length counters
    ///
    /// Register writes consult this for the extra length clock quirk.
    pub fn next_step_clocks_length(&self) -> bool {
        self.step % 2 == 0
    }

    /// Restart from step 0 (APU power-on)
    pub fn reset(&mut self) {
        self.step = 0;
        self.countdown = FRAME_SEQUENCER_PERIOD;
    }
}

impl Default for FrameSequencer {
    fn default() -> Self {
        Self::new()
    }
}
