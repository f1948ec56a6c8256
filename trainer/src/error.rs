use deepvoice_dataset::DatasetError;
use thiserror::Error;

/// Errors returned by the training loop and its callbacks.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("model error: {0}")]
    Model(String),

    #[error("generator exhausted at epoch {epoch}, step {step}")]
    GeneratorExhausted { epoch: usize, step: usize },

    #[error("save failed: {0}")]
    Save(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}
