//! Process-wide registry of temporary config files

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Temporary files that live until the process exits
///
/// Shared behind an `Arc` between the command flow and the Ctrl-C handler.
/// Files stay on disk while subcommands run; `purge` removes them.
#[derive(Debug, Default)]
pub struct TempFiles {
    paths: Mutex<Vec<PathBuf>>,
    keep: AtomicBool,
}

impl TempFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `purge` leave files in place (for debugging)
    pub fn keep_on_exit(&self, keep: bool) {
        self.keep.store(keep, Ordering::SeqCst);
    }

    pub fn register(&self, path: PathBuf) {
        if let Ok(mut paths) = self.paths.lock() {
            paths.push(path);
        }
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Remove every registered file; failures are logged and ignored
    pub fn purge(&self) {
        let Ok(mut paths) = self.paths.lock() else {
            return;
        };
        if self.keep.load(Ordering::SeqCst) {
            debug!(count = paths.len(), "keeping temporary files");
            return;
        }
        for path in paths.drain(..) {
            if let Err(e) = fs::remove_file(&path) {
                debug!(path = %path.display(), error = %e, "cannot remove temporary file");
            }
        }
    }
}
