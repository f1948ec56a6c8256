use std::collections::BTreeMap;
use std::path::Path;

use deepvoice_dataset::Batch;
use serde::{Deserialize, Serialize};

use crate::TrainError;

/// Metric name to value, in name order.
pub type Logs = BTreeMap<String, f64>;

/// Loss the speaker classifier is compiled with.
pub const CATEGORICAL_CROSSENTROPY: &str = "categorical_crossentropy";

/// Metric the speaker classifier reports.
pub const CATEGORICAL_ACCURACY: &str = "categorical_accuracy";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Optimizer {
    Adam { learning_rate: f64 },
}

/// What a model is compiled with before training.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    pub optimizer: Optimizer,
    pub loss: String,
    pub metrics: Vec<String>,
}

impl CompileOptions {
    /// Adam with categorical cross-entropy and categorical accuracy.
    pub fn adam(learning_rate: f64) -> Self {
        Self {
            optimizer: Optimizer::Adam { learning_rate },
            loss: CATEGORICAL_CROSSENTROPY.to_string(),
            metrics: vec![CATEGORICAL_ACCURACY.to_string()],
        }
    }
}

/// A trainable network backend.
///
/// The training loop only drives the model through this interface; graph
/// construction, gradients and the checkpoint format belong to the
/// implementation.
pub trait Model {
    fn compile(&mut self, opts: &CompileOptions) -> Result<(), TrainError>;

    /// Human-readable layer listing, logged once before training.
    fn summary(&self) -> String;

    /// Runs one optimisation step and returns the batch metrics.
    fn train_on_batch(&mut self, batch: &Batch) -> Result<Logs, TrainError>;

    /// Evaluates one batch without updating weights.
    fn test_on_batch(&mut self, batch: &Batch) -> Result<Logs, TrainError>;

    /// Writes a full training checkpoint to `path`.
    fn write_checkpoint(&self, path: &Path) -> Result<(), TrainError>;

    /// Writes only the weights to `path`.
    fn save_weights(&self, path: &Path) -> Result<(), TrainError>;
}
