//! Speaker-labelled feature batches.
//!
//! Files are grouped by speaker, where the speaker of a file is the name of
//! its parent directory (`.../<speaker>/<utterance>.wav`). Each file is
//! decoded, silence-trimmed, featurised, normalised and cropped to a fixed
//! number of frames, so every item of a [`Batch`] has the same shape.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use deepvoice_audio::{decode_file, remove_silence, AudioError, Clip, SilenceConfig, Waveform};
use deepvoice_features::{FeatureExtractor, FeatureKind, FeatureMatrix};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::DatasetError;

/// How a featurised utterance is scaled before cropping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    Disabled,
    /// One mean and standard deviation over every element.
    #[default]
    Global,
    /// Mean and variance per coefficient (CMVN).
    PerFeature,
}

impl Normalization {
    pub fn apply(self, features: &mut FeatureMatrix) {
        match self {
            Normalization::Disabled => {}
            Normalization::Global => features.normalize(),
            Normalization::PerFeature => features.cmvn(),
        }
    }
}

/// Configures a [`BatchGenerator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of speakers (classes) kept, in sorted order (default: 20).
    pub num_speakers: usize,
    /// Frames per item (default: 64).
    pub frames: usize,
    /// Items per batch (default: 1).
    pub batch_size: usize,
    /// Extractor applied to each file (default: MFCC v1).
    pub features: FeatureKind,
    /// Trim silence before extraction (default: true).
    pub trim_silence: bool,
    pub silence: SilenceConfig,
    /// Normalization applied before cropping (default: global).
    pub normalization: Normalization,
    /// Restart from the first file after the last one (default: true).
    pub cycle: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            num_speakers: 20,
            frames: 64,
            batch_size: 1,
            features: FeatureKind::default(),
            trim_silence: true,
            silence: SilenceConfig::default(),
            normalization: Normalization::Global,
            cycle: true,
        }
    }
}

impl BatchConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, DatasetError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    fn validate(&self) -> Result<(), DatasetError> {
        if self.num_speakers == 0 || self.frames == 0 || self.batch_size == 0 {
            return Err(DatasetError::InvalidConfig(
                "num_speakers, frames and batch_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// One training batch: equally shaped time-major inputs and their labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// `frames x dim` feature matrices.
    pub inputs: Vec<FeatureMatrix>,
    /// Speaker index per input.
    pub labels: Vec<usize>,
    /// One-hot encoding of `labels` over `num_speakers` classes.
    pub targets: Vec<Vec<f32>>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Loads a waveform from a listed path.
pub type Loader = Arc<dyn Fn(&Path) -> Result<Waveform, AudioError> + Send + Sync>;

struct Inner {
    files: Vec<(PathBuf, usize)>,
    speakers: Vec<String>,
    cfg: BatchConfig,
    loader: Loader,
}

/// Builds [`Batch`]es from a list of audio files.
#[derive(Clone)]
pub struct BatchGenerator {
    inner: Arc<Inner>,
}

impl fmt::Debug for BatchGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchGenerator")
            .field("files", &self.inner.files.len())
            .field("speakers", &self.inner.speakers)
            .field("cfg", &self.inner.cfg)
            .finish()
    }
}

impl BatchGenerator {
    /// Groups `files` by speaker and keeps the first `num_speakers` speakers
    /// in sorted order. Files are decoded with [`decode_file`].
    pub fn new<I, P>(files: I, cfg: BatchConfig) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        cfg.validate()?;
        let mut by_speaker: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        let mut total = 0;
        for path in files {
            let path = path.into();
            total += 1;
            match speaker_of(&path) {
                Some(speaker) => by_speaker.entry(speaker).or_default().push(path),
                None => debug!("no speaker directory for {}", path.display()),
            }
        }

        let speakers: Vec<String> = by_speaker.keys().take(cfg.num_speakers).cloned().collect();
        if speakers.is_empty() {
            return Err(DatasetError::NoSpeakers { files: total });
        }

        // Round-robin over speakers so consecutive batches mix classes.
        let mut per_speaker: Vec<std::vec::IntoIter<PathBuf>> = speakers
            .iter()
            .map(|speaker| {
                let mut paths = by_speaker.remove(speaker).unwrap_or_default();
                paths.sort();
                paths.into_iter()
            })
            .collect();
        let mut selected = Vec::new();
        loop {
            let before = selected.len();
            for (label, paths) in per_speaker.iter_mut().enumerate() {
                if let Some(path) = paths.next() {
                    selected.push((path, label));
                }
            }
            if selected.len() == before {
                break;
            }
        }

        info!(
            speakers = speakers.len(),
            files = selected.len(),
            "batch generator ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                files: selected,
                speakers,
                cfg,
                loader: Arc::new(|p: &Path| decode_file(p)),
            }),
        })
    }

    /// Collects every path from a file listing first.
    pub fn from_listing<I>(files: I, cfg: BatchConfig) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = Result<String, DatasetError>>,
    {
        let files = files.into_iter().collect::<Result<Vec<String>, _>>()?;
        Self::new(files, cfg)
    }

    /// Replaces the waveform loader. Cloud listings need one, since
    /// [`decode_file`] only reads local paths.
    pub fn with_loader(self, loader: impl Fn(&Path) -> Result<Waveform, AudioError> + Send + Sync + 'static) -> Self {
        let inner = Inner {
            files: self.inner.files.clone(),
            speakers: self.inner.speakers.clone(),
            cfg: self.inner.cfg.clone(),
            loader: Arc::new(loader),
        };
        Self { inner: Arc::new(inner) }
    }

    /// Speaker names; a label is an index into this list.
    pub fn speakers(&self) -> &[String] {
        &self.inner.speakers
    }

    /// Files kept, with their labels.
    pub fn files(&self) -> &[(PathBuf, usize)] {
        &self.inner.files
    }

    pub fn num_speakers(&self) -> usize {
        self.inner.cfg.num_speakers
    }

    pub fn frames(&self) -> usize {
        self.inner.cfg.frames
    }

    /// Columns per item.
    pub fn dim(&self) -> usize {
        self.inner.cfg.features.dim()
    }

    /// Input shape `(frames, dim, 1)` expected by a convolutional model.
    pub fn input_shape(&self) -> (usize, usize, usize) {
        (self.frames(), self.dim(), 1)
    }

    /// Loads one file and turns it into a `frames x dim` matrix.
    pub fn featurize(&self, path: &Path) -> Result<FeatureMatrix, DatasetError> {
        let cfg = &self.inner.cfg;
        let wave = (self.inner.loader)(path)?;
        let wave = if cfg.trim_silence {
            remove_silence(&Clip::from(wave), &cfg.silence).into_waveform()?
        } else {
            wave
        };
        let mut features = cfg.features.extract(&wave)?;
        cfg.normalization.apply(&mut features);
        Ok(features.crop_frames(cfg.frames)?)
    }

    /// Starts iterating batches from the first file.
    pub fn batches(&self) -> Batches {
        Batches {
            generator: self.clone(),
            pos: 0,
            epoch: 0,
            produced_this_pass: 0,
            done: false,
        }
    }

    fn one_hot(&self, label: usize) -> Vec<f32> {
        let mut v = vec![0.0; self.num_speakers()];
        v[label] = 1.0;
        v
    }
}

fn speaker_of(path: &Path) -> Option<String> {
    let name = path.parent()?.file_name()?.to_str()?;
    if name.is_empty() || name.contains("://") {
        return None;
    }
    Some(name.to_string())
}

/// Iterator returned by [`BatchGenerator::batches`].
///
/// Files that cannot be featurised are skipped: too-short ones (after silence
/// trimming) at debug level, any other failure with a warning. Items already
/// collected for the current batch are kept. A cycling pass that produces
/// nothing at all ends with [`DatasetError::NoUsableFiles`].
pub struct Batches {
    generator: BatchGenerator,
    pos: usize,
    epoch: usize,
    produced_this_pass: usize,
    done: bool,
}

impl Batches {
    /// Completed passes over the file list.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Advances to the next file, wrapping when cycling. Returns `None` at
    /// the end of a non-cycling pass.
    fn next_file(&mut self) -> Option<Result<(PathBuf, usize), DatasetError>> {
        let inner = &self.generator.inner;
        if self.pos == inner.files.len() {
            if !inner.cfg.cycle {
                return None;
            }
            if self.produced_this_pass == 0 {
                return Some(Err(DatasetError::NoUsableFiles {
                    frames: inner.cfg.frames,
                }));
            }
            self.pos = 0;
            self.epoch += 1;
            self.produced_this_pass = 0;
            debug!(epoch = self.epoch, "restarting file list");
        }
        let entry = inner.files[self.pos].clone();
        self.pos += 1;
        Some(Ok(entry))
    }
}

impl Iterator for Batches {
    type Item = Result<Batch, DatasetError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let batch_size = self.generator.inner.cfg.batch_size;
        let mut batch = Batch {
            inputs: Vec::with_capacity(batch_size),
            labels: Vec::with_capacity(batch_size),
            targets: Vec::with_capacity(batch_size),
        };

        while batch.len() < batch_size {
            let (path, label) = match self.next_file() {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            };
            match self.generator.featurize(&path) {
                Ok(features) => {
                    self.produced_this_pass += 1;
                    batch.inputs.push(features);
                    batch.labels.push(label);
                    batch.targets.push(self.generator.one_hot(label));
                }
                Err(e) if e.is_too_short() => {
                    debug!("skipping {}: {}", path.display(), e);
                }
                Err(e) => {
                    warn!("skipping {}: {}", path.display(), e);
                }
            }
        }

        if batch.is_empty() { None } else { Some(Ok(batch)) }
    }
}

#[cfg(test)]
mod tests {
    use deepvoice_features::{EnergyConfig, MfccConfig};

    use super::*;

    const RATE: u32 = 16000;

    fn tone(ms: usize, freq: f32) -> Waveform {
        let n = ms * RATE as usize / 1000;
        let samples = (0..n)
            .map(|i| 0.4 * (2.0 * std::f32::consts::PI * freq * i as f32 / RATE as f32).sin())
            .collect();
        Waveform::new(samples, RATE).unwrap()
    }

    /// File names encode their duration: `<ms>.wav`.
    fn synth_loader(path: &Path) -> Result<Waveform, AudioError> {
        let ms: usize = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.split('_').next())
            .and_then(|s| s.parse().ok())
            .ok_or(AudioError::Empty)?;
        Ok(tone(ms, 300.0))
    }

    fn cfg(frames: usize, batch_size: usize) -> BatchConfig {
        BatchConfig {
            num_speakers: 2,
            frames,
            batch_size,
            features: FeatureKind::Mfcc(MfccConfig::default()),
            ..BatchConfig::default()
        }
    }

    #[test]
    fn test_selects_sorted_speakers() {
        let files = ["d/zed/500_a.wav", "d/amy/500_b.wav", "d/bob/500_c.wav", "d/amy/500_d.wav"];
        let g = BatchGenerator::new(files, cfg(10, 1)).unwrap();
        assert_eq!(g.speakers(), &["amy".to_string(), "bob".to_string()]);
        assert_eq!(g.files().len(), 3);
        assert!(g.files().iter().all(|(p, _)| !p.to_string_lossy().contains("zed")));
        assert_eq!(g.input_shape(), (10, 13, 1));
    }

    #[test]
    fn test_no_speakers() {
        let err = BatchGenerator::new(["a.wav"], cfg(10, 1)).unwrap_err();
        assert!(matches!(err, DatasetError::NoSpeakers { files: 1 }));
    }

    #[test]
    fn test_batches_have_fixed_shape_and_one_hot_targets() {
        let files = ["d/amy/500_a.wav", "d/bob/500_b.wav", "d/amy/600_c.wav", "d/bob/700_d.wav"];
        let g = BatchGenerator::new(files, cfg(20, 2)).unwrap().with_loader(synth_loader);

        let batches: Vec<Batch> = g.batches().take(3).map(Result::unwrap).collect();
        assert_eq!(batches.len(), 3);
        for b in &batches {
            assert_eq!(b.len(), 2);
            for (input, (label, target)) in b.inputs.iter().zip(b.labels.iter().zip(&b.targets)) {
                assert_eq!((input.rows(), input.cols()), (20, 13));
                assert_eq!(target.len(), 2);
                assert_eq!(target[*label], 1.0);
                assert_eq!(target.iter().sum::<f32>(), 1.0);
            }
        }
    }

    #[test]
    fn test_short_files_are_skipped() {
        // 100ms yields 8 frames, fewer than the 20 requested.
        let files = ["d/amy/100_a.wav", "d/bob/500_b.wav"];
        let mut c = cfg(20, 1);
        c.cycle = false;
        let g = BatchGenerator::new(files, c).unwrap().with_loader(synth_loader);
        let batches: Vec<Batch> = g.batches().map(Result::unwrap).collect();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].labels, vec![1]);
    }

    #[test]
    fn test_all_short_files_stop_a_cycling_generator() {
        let files = ["d/amy/100_a.wav", "d/bob/100_b.wav"];
        let g = BatchGenerator::new(files, cfg(20, 1)).unwrap().with_loader(synth_loader);
        let mut it = g.batches();
        assert!(matches!(it.next(), Some(Err(DatasetError::NoUsableFiles { frames: 20 }))));
        assert!(it.next().is_none());
    }

    #[test]
    fn test_non_cycling_emits_partial_last_batch() {
        let files = ["d/amy/500_a.wav", "d/bob/500_b.wav", "d/bob/500_c.wav"];
        let mut c = cfg(10, 2);
        c.cycle = false;
        let g = BatchGenerator::new(files, c).unwrap().with_loader(synth_loader);
        let sizes: Vec<usize> = g.batches().map(|b| b.unwrap().len()).collect();
        assert_eq!(sizes, vec![2, 1]);
    }

    #[test]
    fn test_cycling_counts_epochs() {
        let files = ["d/amy/500_a.wav", "d/bob/500_b.wav"];
        let g = BatchGenerator::new(files, cfg(10, 1)).unwrap().with_loader(synth_loader);
        let mut it = g.batches();
        for _ in 0..5 {
            it.next().unwrap().unwrap();
        }
        assert_eq!(it.epoch(), 2);
    }

    fn failing_for(name: &'static str) -> impl Fn(&Path) -> Result<Waveform, AudioError> + Send + Sync {
        move |p: &Path| {
            if p.to_string_lossy().contains(name) {
                Err(AudioError::Decode("corrupt".into()))
            } else {
                synth_loader(p)
            }
        }
    }

    #[test]
    fn test_decode_failure_keeps_partial_batch() {
        // Round-robin order: a (amy), b (bob), c (amy), d (bob).
        let files = ["d/amy/500_a.wav", "d/bob/500_b.wav", "d/amy/500_c.wav", "d/bob/500_d.wav"];
        let mut c = cfg(10, 2);
        c.cycle = false;
        let g = BatchGenerator::new(files, c).unwrap().with_loader(failing_for("_b"));

        let batches: Vec<Batch> = g.batches().map(Result::unwrap).collect();
        let delivered: usize = batches.iter().map(Batch::len).sum();
        assert_eq!(delivered, 3);
        assert_eq!(batches[0].labels, vec![0, 0]);
        assert_eq!(batches[1].labels, vec![1]);
    }

    #[test]
    fn test_unreadable_files_stop_a_cycling_generator() {
        let files = ["d/amy/500_a.wav", "d/bob/500_b.wav"];
        let g = BatchGenerator::new(files, cfg(10, 1)).unwrap().with_loader(failing_for("500"));
        let mut it = g.batches();
        assert!(matches!(it.next(), Some(Err(DatasetError::NoUsableFiles { .. }))));
        assert!(it.next().is_none());
    }

    #[test]
    fn test_normalization_modes() {
        let files = ["d/amy/500_a.wav"];
        // 500ms gives exactly 48 frames, so nothing is cropped away.
        let featurize = |normalization| {
            let c = BatchConfig { normalization, ..cfg(48, 1) };
            let g = BatchGenerator::new(files, c).unwrap().with_loader(synth_loader);
            g.featurize(Path::new(files[0])).unwrap()
        };

        let global = featurize(Normalization::Global);
        let n = global.as_slice().len() as f64;
        let mean = global.as_slice().iter().map(|&v| v as f64).sum::<f64>() / n;
        assert!(mean.abs() < 1e-3);

        let per_feature = featurize(Normalization::PerFeature);
        assert_ne!(global, per_feature);
        let raw = featurize(Normalization::Disabled);
        assert_ne!(raw, global);
        assert_eq!(BatchConfig::default().normalization, Normalization::Global);
    }

    #[test]
    fn test_silence_trimming_applies() {
        let files = ["d/amy/x.wav"];
        let mut c = cfg(20, 1);
        c.cycle = false;
        let g = BatchGenerator::new(files, c).unwrap().with_loader(|_: &Path| {
            // 150ms tone inside 1s of silence: 13 frames after trimming.
            let mut samples = vec![0.0f32; 8000];
            samples.extend(tone(150, 300.0).into_samples());
            samples.extend(vec![0.0f32; 8000]);
            Waveform::new(samples, RATE)
        });
        assert_eq!(g.batches().count(), 0);
    }

    #[test]
    fn test_energy_features_dim() {
        let c = BatchConfig {
            features: FeatureKind::Energy(EnergyConfig {
                delta: true,
                ..EnergyConfig::default()
            }),
            ..cfg(10, 1)
        };
        let g = BatchGenerator::new(["d/amy/500_a.wav"], c).unwrap().with_loader(synth_loader);
        let b = g.batches().next().unwrap().unwrap();
        assert_eq!(b.inputs[0].cols(), 2);
        assert_eq!(g.dim(), 2);
    }

    #[test]
    fn test_decodes_real_wav_files() {
        let dir = tempfile::tempdir().unwrap();
        let spk = dir.path().join("carol");
        std::fs::create_dir_all(&spk).unwrap();
        let path = spk.join("utt.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in tone(500, 440.0).samples() {
            writer.write_sample((s * 32767.0) as i16).unwrap();
        }
        writer.finalize().unwrap();

        let mut c = cfg(16, 1);
        c.cycle = false;
        let g = BatchGenerator::new([path], c).unwrap();
        let batches: Vec<Batch> = g.batches().map(Result::unwrap).collect();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].inputs[0].rows(), 16);
    }

    #[test]
    fn test_config_from_yaml() {
        let c = BatchConfig::from_yaml_str(
            "num_speakers: 5\nframes: 32\nfeatures:\n  kind: mfcc\n  strategy: v2\nsilence:\n  threshold_dbfs: -40\n",
        )
        .unwrap();
        assert_eq!(c.num_speakers, 5);
        assert_eq!(c.frames, 32);
        assert_eq!(c.silence.threshold_dbfs, -40.0);
        assert_eq!(c.silence.chunk_ms, 10);
        assert!(c.cycle);
        assert_eq!(c.features.dim(), 14);
    }
}
