//! Offline WAV rendering
//!
//! Runs the APU for a fixed number of host frames and writes the result to
//! a 16-bit stereo WAV file. Useful for regression captures and listening
//! tests without a live audio device.

use crate::apu::Apu;
use crate::constants::CPU_CLOCK;
use crate::{ApuError, Result};
use std::path::Path;

/// Render `frame_count` host-rate frames to a WAV file
///
/// The APU is advanced in chip-cycle batches and drained as it goes, so
/// the render works with any buffer capacity.
///
/// # Errors
///
/// Returns [`ApuError::ExportError`] when the file cannot be written.
pub fn render_wav<P: AsRef<Path>>(apu: &mut Apu, path: P, frame_count: usize) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: apu.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| ApuError::ExportError(e.to_string()))?;

    // Chip cycles per host frame, rounded up so every batch yields frames
    let cycles_per_frame = CPU_CLOCK.div_ceil(apu.sample_rate());

    let mut written = 0;
    while written < frame_count {
        apu.advance(cycles_per_frame * 64);
        for (left, right) in apu.drain_frames(frame_count - written) {
            writer
                .write_sample(left)
                .and_then(|_| writer.write_sample(right))
                .map_err(|e| ApuError::ExportError(e.to_string()))?;
            written += 1;
        }
    }

    writer
        .finalize()
        .map_err(|e| ApuError::ExportError(e.to_string()))
}
