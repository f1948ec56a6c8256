//! Training loop for the speaker classifier.
//!
//! The network itself lives behind the [`Model`] trait. This crate drives it:
//! compiles it with Adam and categorical cross-entropy, feeds it batches
//! from [`deepvoice_dataset`] through a pool of producer threads, averages
//! metrics per epoch and runs [`Callback`]s for logging and checkpointing.
//!
//! ```rust,no_run
//! use deepvoice_dataset::{BatchConfig, BatchGenerator, Batches, FileLister, audio_predicate};
//! use deepvoice_trainer::{Model, TrainConfig, fit};
//!
//! # fn run(model: &mut impl Model) -> Result<(), Box<dyn std::error::Error>> {
//! deepvoice_trainer::logging::init(false);
//!
//! let lister = FileLister::new("data/train".parse()?, audio_predicate);
//! let generator = BatchGenerator::from_listing(lister.files(), BatchConfig::default())?;
//! let history = fit(model, generator.batches(), None::<Batches>, &TrainConfig::default())?;
//! println!("final loss {:?}", history.last().map(|l| l["loss"]));
//! # Ok(())
//! # }
//! ```

mod callback;
mod config;
mod error;
mod fs;
mod model;
mod saver;
mod train;

pub mod logging;

pub use callback::{Callback, CallbackContext, LoggingCallback, format_logs};
pub use config::TrainConfig;
pub use error::TrainError;
pub use fs::{default_runs_dir, ensure_dir};
pub use model::{CATEGORICAL_ACCURACY, CATEGORICAL_CROSSENTROPY, CompileOptions, Logs, Model, Optimizer};
pub use saver::{RetainingSaver, Saver, SaverCallback};
pub use train::{History, default_callbacks, fit, resolve_runs_dir, train};
