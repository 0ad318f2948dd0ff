//! Cooperative cancellation.
//!
//! The binary installs a Ctrl-C listener that sets the token; long loops
//! and prompts poll it so scoped resources such as the restore working
//! directory are released by normal unwinding of the call stack.
//!
//! Temporary files and directories in use are registered on the token as
//! scratch paths. A second Ctrl-C removes them before the process exits.

use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    scratch: Arc<Mutex<Vec<PathBuf>>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns [`Error::Cancelled`] once the token has been set.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Registers `path` for removal on a forced exit until the guard is dropped.
    pub fn register_scratch(&self, path: &Path) -> ScratchGuard {
        self.scratch_paths().push(path.to_path_buf());
        ScratchGuard {
            token: self.clone(),
            path: path.to_path_buf(),
        }
    }

    /// Removes every registered scratch path.
    pub fn remove_scratch(&self) {
        for path in self.scratch_paths().drain(..) {
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match result {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) => warn!("Couldn't remove {}: {e}", path.display()),
            }
        }
    }

    fn scratch_paths(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        self.scratch.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Keeps a scratch path registered on a [`CancelToken`].
#[derive(Debug)]
pub struct ScratchGuard {
    token: CancelToken,
    path: PathBuf,
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        let mut paths = self.token.scratch_paths();
        if let Some(i) = paths.iter().position(|p| *p == self.path) {
            paths.remove(i);
        }
    }
}

/// Sets `token` on the first Ctrl-C. On the second, removes the scratch
/// paths and exits the process.
pub async fn cancel_on_interrupt(token: CancelToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    warn!("Interrupt received, stopping after the current file");
    token.cancel();
    if tokio::signal::ctrl_c().await.is_ok() {
        token.remove_scratch();
        std::process::exit(crate::sysexits::EX_TEMPFAIL);
    }
}
