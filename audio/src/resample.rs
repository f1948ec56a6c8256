//! Whole-buffer sample rate conversion.
//!
//! Uses rubato's FFT resampler, a pure Rust implementation without any FFI
//! dependencies. The output is aligned to the input (the resampler's
//! delay is dropped) and has `ceil(len * to_rate / from_rate)` samples.

use rubato::{FftFixedInOut, Resampler};

use crate::AudioError;

/// Number of input frames per processing block.
const CHUNK_SIZE: usize = 1024;

/// Resamples mono samples from `from_rate` to `to_rate`.
///
/// Fails on a zero rate or an empty input.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AudioError> {
    if from_rate == 0 {
        return Err(AudioError::InvalidSampleRate(from_rate));
    }
    if to_rate == 0 {
        return Err(AudioError::InvalidSampleRate(to_rate));
    }
    if samples.is_empty() {
        return Err(AudioError::Empty);
    }
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, 1)?;

    let expected = (samples.len() as u64 * to_rate as u64).div_ceil(from_rate as u64) as usize;
    let delay = resampler.output_delay();

    let mut out = Vec::with_capacity(expected + delay + CHUNK_SIZE);
    let mut output_buf = vec![Vec::new(); 1];
    let mut input_buf = vec![Vec::new(); 1];
    let mut pos = 0;

    // Full blocks first, then zero-padded blocks until the delayed output
    // covers the expected length.
    while out.len() < expected + delay {
        let frames_needed = resampler.input_frames_next();
        input_buf[0].clear();
        if pos < samples.len() {
            let n = (samples.len() - pos).min(frames_needed);
            input_buf[0].extend_from_slice(&samples[pos..pos + n]);
            pos += n;
        }
        input_buf[0].resize(frames_needed, 0.0);

        output_buf[0].clear();
        output_buf[0].resize(resampler.output_frames_next(), 0.0);

        let (_, written) = resampler.process_into_buffer(&input_buf, &mut output_buf, None)?;
        out.extend_from_slice(&output_buf[0][..written]);
    }

    out.drain(..delay);
    out.truncate(expected);
    Ok(out)
}
