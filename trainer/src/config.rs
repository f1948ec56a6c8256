use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::TrainError;

/// Configures [`crate::train`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Adam learning rate (default: 0.001).
    pub learning_rate: f64,
    /// Number of epochs (default: 1000).
    pub epochs: usize,
    /// Training batches per epoch (default: 20).
    pub steps_per_epoch: usize,
    /// Validation batches per epoch (default: 20).
    pub val_steps: usize,
    /// Producer threads pulling training batches (default: 4).
    pub workers: usize,
    /// Prefetched batches buffered between producers and the loop
    /// (default: 10).
    pub max_queue_size: usize,
    /// Run directory; `deep_voice_<unix seconds>` when unset.
    pub runs_dir: Option<PathBuf>,
    /// Name used in checkpoint file names (default: `deep_voice_cnn`).
    pub name: String,
    /// Recent checkpoints retained (default: 10).
    pub max_to_keep: usize,
    /// One older checkpoint is kept per this many hours (default: 0.5).
    pub keep_checkpoint_every_n_hours: Option<f64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            epochs: 1000,
            steps_per_epoch: 20,
            val_steps: 20,
            workers: 4,
            max_queue_size: 10,
            runs_dir: None,
            name: "deep_voice_cnn".to_string(),
            max_to_keep: 10,
            keep_checkpoint_every_n_hours: Some(0.5),
        }
    }
}

impl TrainConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, TrainError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrainError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> Result<(), TrainError> {
        if !(self.learning_rate > 0.0) {
            return Err(TrainError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.steps_per_epoch == 0 || self.workers == 0 || self.max_queue_size == 0 {
            return Err(TrainError::InvalidConfig(
                "steps_per_epoch, workers and max_queue_size must be positive".into(),
            ));
        }
        if let Some(hours) = self.keep_checkpoint_every_n_hours {
            if !(hours > 0.0) {
                return Err(TrainError::InvalidConfig(format!(
                    "keep_checkpoint_every_n_hours must be positive, got {hours}"
                )));
            }
        }
        Ok(())
    }

    /// Interval form of `keep_checkpoint_every_n_hours`.
    pub fn keep_every(&self) -> Option<Duration> {
        self.keep_checkpoint_every_n_hours
            .map(|h| Duration::from_secs_f64(h * 3600.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.learning_rate, 0.001);
        assert_eq!(cfg.epochs, 1000);
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.keep_every(), Some(Duration::from_secs(1800)));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = TrainConfig::from_yaml_str("epochs: 3\nsteps_per_epoch: 4\nval_steps: 2\nruns_dir: /tmp/run\n").unwrap();
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.steps_per_epoch, 4);
        assert_eq!(cfg.val_steps, 2);
        assert_eq!(cfg.runs_dir, Some(PathBuf::from("/tmp/run")));
        assert_eq!(cfg.name, "deep_voice_cnn");
        assert_eq!(cfg.max_queue_size, 10);
    }

    #[test]
    fn test_rejects_invalid() {
        let cfg = TrainConfig { workers: 0, ..TrainConfig::default() };
        assert!(matches!(cfg.validate(), Err(TrainError::InvalidConfig(_))));
        let cfg = TrainConfig { learning_rate: f64::NAN, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = TrainConfig { keep_checkpoint_every_n_hours: Some(0.0), ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
        assert!(TrainConfig::from_yaml_str("epochs: many\n").is_err());
    }
}
