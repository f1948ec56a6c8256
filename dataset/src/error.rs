use deepvoice_audio::AudioError;
use deepvoice_features::FeatureError;
use thiserror::Error;

/// Errors returned by file enumeration and batch generation.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("invalid source {0:?}")]
    InvalidSource(String),

    #[error("no bucket client configured for {0}")]
    NoClient(String),

    #[error("bucket {0} not found")]
    BucketNotFound(String),

    #[error("bucket error: {0}")]
    Bucket(String),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("no speakers found among {files} files")]
    NoSpeakers { files: usize },

    #[error("no usable files: every file was shorter than {frames} frames")]
    NoUsableFiles { frames: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Feature(#[from] FeatureError),
}

impl DatasetError {
    /// Reports whether a file failed only because it held too little audio.
    pub fn is_too_short(&self) -> bool {
        match self {
            DatasetError::Feature(e) => e.is_too_short(),
            DatasetError::Audio(AudioError::Empty) => true,
            _ => false,
        }
    }
}
