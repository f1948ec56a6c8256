//! Chunked dBFS silence trimming.

use serde::{Deserialize, Serialize};

use crate::clip::dbfs;
use crate::Clip;

/// Default loudness below which a chunk counts as silent.
pub const DEFAULT_SILENCE_THRESHOLD: f64 = -50.0;

/// Default scan chunk length in milliseconds.
pub const DEFAULT_CHUNK_MS: u64 = 10;

/// Configures [`remove_silence`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceConfig {
    /// Loudness threshold in dBFS (default: -50).
    pub threshold_dbfs: f64,
    /// Scan chunk length in milliseconds (default: 10).
    pub chunk_ms: u64,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            threshold_dbfs: DEFAULT_SILENCE_THRESHOLD,
            chunk_ms: DEFAULT_CHUNK_MS,
        }
    }
}

/// Returns a new clip with silent chunks removed.
///
/// The clip is scanned in `chunk_ms` steps from the start while a full chunk
/// still fits strictly inside the clip. A chunk quieter than the threshold
/// flushes the pending segment `[start, pos)` to the output (when non-empty)
/// and moves `start` past itself; louder chunks only advance `pos`. The
/// remaining tail `[start, end)` is appended when it is louder than the
/// threshold, so the trailing partial chunk is never judged on its own.
pub fn remove_silence(clip: &Clip, cfg: &SilenceConfig) -> Clip {
    let chunk = cfg.chunk_ms.max(1);
    let len = clip.len_ms();

    let mut out = Clip::empty(clip.sample_rate());
    let mut start = 0u64;
    let mut pos = 0u64;

    while pos + chunk < len {
        if dbfs(clip.slice_ms(pos, pos + chunk)) < cfg.threshold_dbfs {
            if pos != start {
                out.extend_samples(clip.slice_ms(start, pos));
            }
            pos += chunk;
            start = pos;
        } else {
            pos += chunk;
        }
    }

    let tail = clip.tail_ms(start);
    if dbfs(tail) > cfg.threshold_dbfs {
        out.extend_samples(tail);
    }

    tracing::debug!(
        input_ms = len,
        output_ms = out.len_ms(),
        "removed silence"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Waveform;

    const RATE: u32 = 16000;

    fn tone(ms: usize, amp: f32) -> Vec<f32> {
        let n = ms * RATE as usize / 1000;
        (0..n)
            .map(|i| amp * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / RATE as f32).sin())
            .collect()
    }

    fn clip(samples: Vec<f32>) -> Clip {
        Clip::from(Waveform::new(samples, RATE).unwrap())
    }

    #[test]
    fn test_loud_clip_unchanged() {
        let c = clip(tone(505, 0.5));
        let out = remove_silence(&c, &SilenceConfig::default());
        assert_eq!(out, c);
    }

    #[test]
    fn test_silent_clip_empty() {
        let c = clip(vec![0.0; 16000]);
        let out = remove_silence(&c, &SilenceConfig::default());
        assert!(out.is_empty());
        assert_eq!(out.sample_rate(), RATE);

        // Quiet but non-zero noise below -50 dBFS.
        let c = clip(tone(1000, 0.001));
        assert!(remove_silence(&c, &SilenceConfig::default()).is_empty());
    }

    #[test]
    fn test_removes_inner_gap() {
        let mut samples = tone(100, 0.5);
        samples.extend(vec![0.0; 1600]); // 100ms
        samples.extend(tone(100, 0.5));
        let c = clip(samples);

        let out = remove_silence(&c, &SilenceConfig::default());
        assert_eq!(out.len_ms(), 200);
        assert_eq!(&out.samples()[..1600], &c.samples()[..1600]);
        assert_eq!(&out.samples()[1600..], &c.samples()[3200..]);
    }

    #[test]
    fn test_leading_and_trailing_silence() {
        let mut samples = vec![0.0; 3200]; // 200ms
        samples.extend(tone(300, 0.5));
        samples.extend(vec![0.0; 4800]); // 300ms
        let c = clip(samples);

        let out = remove_silence(&c, &SilenceConfig::default());
        assert_eq!(out.len_ms(), 300);
    }

    #[test]
    fn test_trailing_partial_chunk_only_in_tail_check() {
        // 100ms loud + 5ms loud remainder: the loop never inspects the last
        // 5ms alone, the tail check keeps the whole clip.
        let c = clip(tone(105, 0.5));
        let out = remove_silence(&c, &SilenceConfig::default());
        assert_eq!(out.len_ms(), 105);

        // Silent tail shorter than a chunk after a flush is dropped.
        let mut samples = tone(50, 0.5);
        samples.extend(vec![0.0; 160 + 80]); // 10ms silent chunk + 5ms remainder
        let c = clip(samples);
        let out = remove_silence(&c, &SilenceConfig::default());
        assert_eq!(out.len_ms(), 50);
    }

    #[test]
    fn test_idempotent() {
        let mut samples = vec![0.0; 800];
        samples.extend(tone(120, 0.3));
        samples.extend(vec![0.0; 2400]);
        samples.extend(tone(77, 0.2));
        samples.extend(vec![0.0; 333]);
        let c = clip(samples);

        let cfg = SilenceConfig::default();
        let once = remove_silence(&c, &cfg);
        let twice = remove_silence(&once, &cfg);
        assert!(twice.len_ms() <= once.len_ms());
        let thrice = remove_silence(&twice, &cfg);
        assert_eq!(thrice, twice);
    }

    #[test]
    fn test_config_defaults() {
        let cfg = SilenceConfig::default();
        assert_eq!(cfg.threshold_dbfs, -50.0);
        assert_eq!(cfg.chunk_ms, 10);
    }
}
