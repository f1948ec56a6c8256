//! The fit loop.
//!
//! Training batches are pulled by `workers` producer threads from one shared
//! [`SyncIter`] and handed to the loop through a bounded queue of
//! `max_queue_size` batches. Validation batches are pulled on the loop's own
//! thread after every epoch.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use deepvoice_dataset::{Batch, DatasetError, SyncIter};
use tracing::{debug, info};

use crate::callback::{Callback, CallbackContext, LoggingCallback};
use crate::fs::{default_runs_dir, ensure_dir};
use crate::saver::{RetainingSaver, SaverCallback};
use crate::{CompileOptions, Logs, Model, TrainConfig, TrainError};

/// Epoch-level metrics, one entry per completed epoch.
pub type History = Vec<Logs>;

/// Run directory for `cfg`: `runs_dir` when set, otherwise
/// `deep_voice_<unix seconds>`.
pub fn resolve_runs_dir(cfg: &TrainConfig) -> PathBuf {
    cfg.runs_dir.clone().unwrap_or_else(default_runs_dir)
}

/// Logging plus checkpointing into `runs_dir`.
pub fn default_callbacks(cfg: &TrainConfig, runs_dir: &Path) -> Vec<Box<dyn Callback>> {
    let saver = RetainingSaver::new(cfg.max_to_keep, cfg.keep_every());
    vec![
        Box::new(LoggingCallback::new()),
        Box::new(SaverCallback::new(Box::new(saver), runs_dir, cfg.name.clone())),
    ]
}

/// Trains with [`default_callbacks`].
pub fn fit<M, T, V>(model: &mut M, train_batches: T, val_batches: Option<V>, cfg: &TrainConfig) -> Result<History, TrainError>
where
    M: Model,
    T: Iterator<Item = Result<Batch, DatasetError>> + Send,
    V: Iterator<Item = Result<Batch, DatasetError>>,
{
    let mut cfg = cfg.clone();
    let runs_dir = resolve_runs_dir(&cfg);
    cfg.runs_dir = Some(runs_dir.clone());
    let mut callbacks = default_callbacks(&cfg, &runs_dir);
    train(model, train_batches, val_batches, &cfg, &mut callbacks)
}

/// Compiles `model` and runs `cfg.epochs` epochs of `cfg.steps_per_epoch`
/// steps.
///
/// Each epoch's logs are the mean of its batch metrics, plus the mean of
/// `cfg.val_steps` validation batches under `val_`-prefixed keys when
/// `val_batches` is given. Running out of either source before the schedule
/// is complete fails with [`TrainError::GeneratorExhausted`].
pub fn train<M, T, V>(
    model: &mut M,
    train_batches: T,
    mut val_batches: Option<V>,
    cfg: &TrainConfig,
    callbacks: &mut [Box<dyn Callback>],
) -> Result<History, TrainError>
where
    M: Model,
    T: Iterator<Item = Result<Batch, DatasetError>> + Send,
    V: Iterator<Item = Result<Batch, DatasetError>>,
{
    cfg.validate()?;
    let runs_dir = resolve_runs_dir(cfg);
    ensure_dir(&runs_dir, true);
    info!("run directory: {}", runs_dir.display());

    model.compile(&CompileOptions::adam(cfg.learning_rate))?;
    info!("{}", model.summary());

    let shared = SyncIter::new(train_batches);
    thread::scope(|s| {
        let (tx, rx) = mpsc::sync_channel(cfg.max_queue_size);
        for worker in 0..cfg.workers {
            let tx = tx.clone();
            let shared = &shared;
            s.spawn(move || {
                for item in shared {
                    if tx.send(item).is_err() {
                        break;
                    }
                }
                debug!("batch worker {worker} stopped");
            });
        }
        drop(tx);

        // `rx` is dropped on return, which unblocks and stops the workers.
        run_epochs(model, &rx, val_batches.as_mut(), cfg, callbacks)
    })
}

fn run_epochs<M, V>(
    model: &mut M,
    rx: &Receiver<Result<Batch, DatasetError>>,
    mut val_batches: Option<&mut V>,
    cfg: &TrainConfig,
    callbacks: &mut [Box<dyn Callback>],
) -> Result<History, TrainError>
where
    M: Model,
    V: Iterator<Item = Result<Batch, DatasetError>>,
{
    for cb in callbacks.iter_mut() {
        cb.on_train_begin(&CallbackContext { model: &*model, epoch: 0 })?;
    }

    let mut history = History::with_capacity(cfg.epochs);
    for epoch in 0..cfg.epochs {
        let mut train_logs = Vec::with_capacity(cfg.steps_per_epoch);
        for step in 0..cfg.steps_per_epoch {
            let batch = rx
                .recv()
                .map_err(|_| TrainError::GeneratorExhausted { epoch, step })??;
            let logs = model.train_on_batch(&batch)?;
            for cb in callbacks.iter_mut() {
                cb.on_batch_end(&CallbackContext { model: &*model, epoch }, step, &logs)?;
            }
            train_logs.push(logs);
        }
        let mut epoch_logs = mean_logs(&train_logs);

        if let Some(val) = val_batches.as_deref_mut() {
            let mut val_logs = Vec::with_capacity(cfg.val_steps);
            for step in 0..cfg.val_steps {
                let batch = val
                    .next()
                    .ok_or(TrainError::GeneratorExhausted { epoch, step })??;
                val_logs.push(model.test_on_batch(&batch)?);
            }
            for (k, v) in mean_logs(&val_logs) {
                epoch_logs.insert(format!("val_{k}"), v);
            }
        }

        for cb in callbacks.iter_mut() {
            cb.on_epoch_end(&CallbackContext { model: &*model, epoch }, &epoch_logs)?;
        }
        history.push(epoch_logs);
    }

    let last = cfg.epochs.saturating_sub(1);
    for cb in callbacks.iter_mut() {
        cb.on_train_end(&CallbackContext { model: &*model, epoch: last })?;
    }
    Ok(history)
}

/// Per-key mean. A key missing from some entries is averaged over the
/// entries that have it.
fn mean_logs(all: &[Logs]) -> Logs {
    let mut sums: std::collections::BTreeMap<&str, (f64, usize)> = Default::default();
    for logs in all {
        for (k, v) in logs {
            let e = sums.entry(k.as_str()).or_default();
            e.0 += v;
            e.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(k, (sum, n))| (k.to_string(), sum / n as f64))
        .collect()
}
