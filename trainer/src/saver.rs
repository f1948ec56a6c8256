//! Periodic checkpointing.
//!
//! A [`Saver`] writes the primary checkpoint and decides which older ones
//! to delete. [`SaverCallback`] drives it at the end of every epoch and
//! additionally saves the bare weights, where a failure is only logged.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::callback::{Callback, CallbackContext};
use crate::{Logs, Model, TrainError};

/// Writes numbered checkpoints.
pub trait Saver {
    /// Saves `model` to `<prefix>-<global_step>` and returns that path.
    fn save(&mut self, model: &dyn Model, prefix: &Path, global_step: usize) -> Result<PathBuf, TrainError>;
}

/// Keeps the newest `max_to_keep` checkpoints. A checkpoint falling out of
/// that window is preserved anyway when at least `keep_every` has passed
/// since the previous preserved one.
#[derive(Debug)]
pub struct RetainingSaver {
    max_to_keep: usize,
    keep_every: Option<Duration>,
    recent: VecDeque<(PathBuf, Instant)>,
    preserved: Vec<PathBuf>,
    next_keep: Option<Instant>,
}

impl RetainingSaver {
    /// `max_to_keep == 0` keeps every checkpoint.
    pub fn new(max_to_keep: usize, keep_every: Option<Duration>) -> Self {
        Self {
            max_to_keep,
            keep_every,
            recent: VecDeque::new(),
            preserved: Vec::new(),
            next_keep: None,
        }
    }

    /// Checkpoints inside the recent window, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &Path> {
        self.recent.iter().map(|(p, _)| p.as_path())
    }

    /// Checkpoints kept past the recent window.
    pub fn preserved(&self) -> &[PathBuf] {
        &self.preserved
    }

    fn save_at(
        &mut self,
        model: &dyn Model,
        prefix: &Path,
        global_step: usize,
        now: Instant,
    ) -> Result<PathBuf, TrainError> {
        let path = checkpoint_path(prefix, global_step);
        model.write_checkpoint(&path)?;
        debug!("wrote checkpoint {}", path.display());

        let interval = self.keep_every;
        let mut next_keep = *self.next_keep.get_or_insert_with(|| now + interval.unwrap_or_default());
        self.recent.retain(|(p, _)| p != &path);
        self.recent.push_back((path.clone(), now));

        if self.max_to_keep == 0 {
            return Ok(path);
        }
        while self.recent.len() > self.max_to_keep {
            let Some((old, written)) = self.recent.pop_front() else {
                break;
            };
            match interval {
                Some(interval) if written >= next_keep => {
                    self.preserved.push(old);
                    next_keep += interval;
                    self.next_keep = Some(next_keep);
                }
                _ => remove_checkpoint(&old),
            }
        }
        Ok(path)
    }
}

impl Saver for RetainingSaver {
    fn save(&mut self, model: &dyn Model, prefix: &Path, global_step: usize) -> Result<PathBuf, TrainError> {
        self.save_at(model, prefix, global_step, Instant::now())
    }
}

fn checkpoint_path(prefix: &Path, global_step: usize) -> PathBuf {
    let mut s = prefix.as_os_str().to_owned();
    s.push(format!("-{global_step}"));
    PathBuf::from(s)
}

fn remove_checkpoint(path: &Path) {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Ok(()) => debug!("removed old checkpoint {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to remove {}: {}", path.display(), e),
    }
}

/// Saves a checkpoint and the weights after every epoch.
///
/// Files go to `<save_path>/tf_<name>.ckpt-<epoch>` through the [`Saver`]
/// and `<save_path>/keras_<name>_<epoch>.h5` through
/// [`Model::save_weights`].
pub struct SaverCallback {
    saver: Box<dyn Saver>,
    save_path: PathBuf,
    name: String,
}

impl SaverCallback {
    pub fn new(saver: Box<dyn Saver>, save_path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            saver,
            save_path: save_path.into(),
            name: name.into(),
        }
    }
}

impl Callback for SaverCallback {
    fn on_epoch_end(&mut self, ctx: &CallbackContext<'_>, _logs: &Logs) -> Result<(), TrainError> {
        info!("Epoch {}: saving checkpoint and weights", ctx.epoch);
        let prefix = self.save_path.join(format!("tf_{}.ckpt", self.name));
        self.saver.save(ctx.model, &prefix, ctx.epoch)?;

        let weights = self.save_path.join(format!("keras_{}_{}.h5", self.name, ctx.epoch));
        if let Err(e) = ctx.model.save_weights(&weights) {
            error!("failed to save weights to {}: {}", weights.display(), e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use deepvoice_dataset::Batch;

    use super::*;
    use crate::CompileOptions;

    /// Writes a marker file per checkpoint and records weight saves.
    #[derive(Default)]
    struct FileModel {
        fail_checkpoint: bool,
        fail_weights: bool,
        weights: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl Model for FileModel {
        fn compile(&mut self, _: &CompileOptions) -> Result<(), TrainError> {
            Ok(())
        }
        fn summary(&self) -> String {
            String::new()
        }
        fn train_on_batch(&mut self, _: &Batch) -> Result<Logs, TrainError> {
            Ok(Logs::new())
        }
        fn test_on_batch(&mut self, _: &Batch) -> Result<Logs, TrainError> {
            Ok(Logs::new())
        }
        fn write_checkpoint(&self, path: &Path) -> Result<(), TrainError> {
            if self.fail_checkpoint {
                return Err(TrainError::Save("disk full".into()));
            }
            std::fs::write(path, b"ckpt")?;
            Ok(())
        }
        fn save_weights(&self, path: &Path) -> Result<(), TrainError> {
            if self.fail_weights {
                return Err(TrainError::Save("h5 unavailable".into()));
            }
            self.weights.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn test_checkpoint_path_appends_step() {
        assert_eq!(
            checkpoint_path(Path::new("/runs/tf_x.ckpt"), 12),
            PathBuf::from("/runs/tf_x.ckpt-12")
        );
    }

    #[test]
    fn test_keeps_only_newest() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("tf_m.ckpt");
        let model = FileModel::default();
        let mut saver = RetainingSaver::new(3, None);
        for step in 0..6 {
            saver.save(&model, &prefix, step).unwrap();
        }
        let recent: Vec<PathBuf> = saver.recent().map(Path::to_path_buf).collect();
        assert_eq!(
            recent,
            (3..6).map(|s| checkpoint_path(&prefix, s)).collect::<Vec<_>>()
        );
        for step in 0..3 {
            assert!(!checkpoint_path(&prefix, step).exists());
        }
        for step in 3..6 {
            assert!(checkpoint_path(&prefix, step).exists());
        }
        assert!(saver.preserved().is_empty());
    }

    #[test]
    fn test_preserves_one_per_interval() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("tf_m.ckpt");
        let model = FileModel::default();
        let mut saver = RetainingSaver::new(2, Some(Duration::from_secs(60)));
        let start = Instant::now();
        // One checkpoint every 25 seconds.
        for step in 0..8 {
            let now = start + Duration::from_secs(25 * step as u64);
            saver.save_at(&model, &prefix, step, now).unwrap();
        }
        // Written at 0, 25, 50, 75, 100, 125, 150, 175s. Evicted: 0..=5.
        // Preserved when written at or after 60s, then 120s.
        assert_eq!(
            saver.preserved(),
            &[checkpoint_path(&prefix, 3), checkpoint_path(&prefix, 5)]
        );
        assert!(!checkpoint_path(&prefix, 4).exists());
        assert!(checkpoint_path(&prefix, 5).exists());
        assert_eq!(saver.recent().count(), 2);
    }

    #[test]
    fn test_zero_max_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("tf_m.ckpt");
        let mut saver = RetainingSaver::new(0, None);
        for step in 0..4 {
            saver.save(&FileModel::default(), &prefix, step).unwrap();
        }
        assert_eq!(saver.recent().count(), 4);
    }

    #[test]
    fn test_callback_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let model = FileModel::default();
        let mut cb = SaverCallback::new(Box::new(RetainingSaver::new(10, None)), dir.path(), "deep_voice_cnn");

        let ctx = CallbackContext { model: &model, epoch: 4 };
        cb.on_epoch_end(&ctx, &Logs::new()).unwrap();

        assert!(dir.path().join("tf_deep_voice_cnn.ckpt-4").exists());
        assert_eq!(
            *model.weights.lock().unwrap(),
            vec![dir.path().join("keras_deep_voice_cnn_4.h5")]
        );
    }

    #[test]
    fn test_weights_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let model = FileModel {
            fail_weights: true,
            ..FileModel::default()
        };
        let mut cb = SaverCallback::new(Box::new(RetainingSaver::new(10, None)), dir.path(), "m");
        let ctx = CallbackContext { model: &model, epoch: 0 };
        assert!(cb.on_epoch_end(&ctx, &Logs::new()).is_ok());
        assert!(dir.path().join("tf_m.ckpt-0").exists());
    }

    #[test]
    fn test_checkpoint_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let model = FileModel {
            fail_checkpoint: true,
            ..FileModel::default()
        };
        let mut cb = SaverCallback::new(Box::new(RetainingSaver::new(10, None)), dir.path(), "m");
        let ctx = CallbackContext { model: &model, epoch: 0 };
        assert!(matches!(
            cb.on_epoch_end(&ctx, &Logs::new()),
            Err(TrainError::Save(_))
        ));
        assert!(model.weights.lock().unwrap().is_empty());
    }
}
