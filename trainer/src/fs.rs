use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::error;

/// Creates the directory holding `path`, or `path` itself when `is_dir`.
///
/// Does nothing when the directory already exists. Failures are logged and
/// otherwise ignored.
pub fn ensure_dir(path: &Path, is_dir: bool) {
    let dir = if is_dir { Some(path) } else { path.parent() };
    let Some(dir) = dir.filter(|d| !d.as_os_str().is_empty()) else {
        return;
    };
    if dir.exists() {
        return;
    }
    if let Err(e) = std::fs::create_dir_all(dir) {
        error!("failed to create {}: {}", dir.display(), e);
    }
}

/// `deep_voice_<unix seconds>` in the working directory.
pub fn default_runs_dir() -> PathBuf {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    PathBuf::from(format!("deep_voice_{secs}"))
}
