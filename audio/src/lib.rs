//! Audio input for the speaker feature pipeline.
//!
//! This crate provides:
//!
//! - [`Waveform`]: mono `f32` samples plus a sample rate, the input of every
//!   feature extractor
//! - [`decode_file`]: wav / mp3 / aac decoding into a mono [`Waveform`]
//! - [`resample`]: whole-buffer sample rate conversion backed by rubato
//! - [`Clip`] and [`remove_silence`]: millisecond-addressed clips and the
//!   dBFS silence trimmer
//!
//! # Example
//!
//! ```rust
//! use deepvoice_audio::{remove_silence, Clip, SilenceConfig, Waveform};
//!
//! // 200ms of a loud tone at 16kHz
//! let samples: Vec<f32> = (0..3200)
//!     .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin() * 0.5)
//!     .collect();
//! let wave = Waveform::new(samples, 16000).unwrap();
//!
//! let trimmed = remove_silence(&Clip::from(&wave), &SilenceConfig::default());
//! assert_eq!(trimmed.len_ms(), 200);
//! ```

mod clip;
mod decode;
mod error;
mod resample;
mod silence;
mod waveform;

pub use clip::Clip;
pub use decode::decode_file;
pub use error::AudioError;
pub use resample::resample;
pub use silence::{remove_silence, SilenceConfig, DEFAULT_CHUNK_MS, DEFAULT_SILENCE_THRESHOLD};
pub use waveform::Waveform;
