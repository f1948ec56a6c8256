//! Hooks invoked by the training loop.

use tracing::info;

use crate::{Logs, Model, TrainError};

/// State handed to every callback.
pub struct CallbackContext<'a> {
    pub model: &'a dyn Model,
    /// Zero-based epoch currently running.
    pub epoch: usize,
}

/// Observes training progress. Every hook defaults to a no-op.
pub trait Callback {
    fn on_train_begin(&mut self, _ctx: &CallbackContext<'_>) -> Result<(), TrainError> {
        Ok(())
    }

    fn on_batch_end(&mut self, _ctx: &CallbackContext<'_>, _batch: usize, _logs: &Logs) -> Result<(), TrainError> {
        Ok(())
    }

    fn on_epoch_end(&mut self, _ctx: &CallbackContext<'_>, _logs: &Logs) -> Result<(), TrainError> {
        Ok(())
    }

    fn on_train_end(&mut self, _ctx: &CallbackContext<'_>) -> Result<(), TrainError> {
        Ok(())
    }
}

/// Writes one line per batch and per epoch:
/// `{Epoch: 3} categorical_accuracy: 0.500000, loss: 1.250000`.
pub struct LoggingCallback {
    sink: Box<dyn FnMut(&str) + Send>,
}

impl LoggingCallback {
    /// Logs through `tracing` at info level.
    pub fn new() -> Self {
        Self::with_sink(|line| info!("{line}"))
    }

    pub fn with_sink(sink: impl FnMut(&str) + Send + 'static) -> Self {
        Self { sink: Box::new(sink) }
    }
}

impl Default for LoggingCallback {
    fn default() -> Self {
        Self::new()
    }
}

/// `k: v` pairs with six decimals, comma separated.
pub fn format_logs(logs: &Logs) -> String {
    logs.iter()
        .map(|(k, v)| format!("{k}: {v:.6}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Callback for LoggingCallback {
    fn on_batch_end(&mut self, _ctx: &CallbackContext<'_>, batch: usize, logs: &Logs) -> Result<(), TrainError> {
        (self.sink)(&format!("{{Batch: {batch}}} {}", format_logs(logs)));
        Ok(())
    }

    fn on_epoch_end(&mut self, ctx: &CallbackContext<'_>, logs: &Logs) -> Result<(), TrainError> {
        (self.sink)(&format!("{{Epoch: {}}} {}", ctx.epoch, format_logs(logs)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use deepvoice_dataset::Batch;

    use super::*;
    use crate::CompileOptions;

    struct Noop;

    impl Model for Noop {
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
        fn write_checkpoint(&self, _: &Path) -> Result<(), TrainError> {
            Ok(())
        }
        fn save_weights(&self, _: &Path) -> Result<(), TrainError> {
            Ok(())
        }
    }

    #[test]
    fn test_formats_epoch_and_batch_lines() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let mut cb = LoggingCallback::with_sink(move |l| sink.lock().unwrap().push(l.to_string()));

        let mut logs = Logs::new();
        logs.insert("loss".into(), 1.25);
        logs.insert("categorical_accuracy".into(), 0.5);

        let ctx = CallbackContext { model: &Noop, epoch: 3 };
        cb.on_epoch_end(&ctx, &logs).unwrap();
        cb.on_batch_end(&ctx, 7, &logs).unwrap();
        cb.on_epoch_end(&ctx, &Logs::new()).unwrap();

        let lines = lines.lock().unwrap();
        assert_eq!(lines[0], "{Epoch: 3} categorical_accuracy: 0.500000, loss: 1.250000");
        assert_eq!(lines[1], "{Batch: 7} categorical_accuracy: 0.500000, loss: 1.250000");
        assert_eq!(lines[2], "{Epoch: 3} ");
    }
}
