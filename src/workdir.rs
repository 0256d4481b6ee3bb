//! Working-directory translation around a compiler invocation.
//!
//! pawncc resolves `#include` and output paths relative to the current
//! directory, so the bridge moves into the source file's directory for the
//! duration of the call and moves back afterwards.

use std::env;
use std::path::{Path, PathBuf};

use crate::args::ArgVector;
use crate::error::BridgeError;

/// Directory part of `path`, following POSIX `dirname`.
pub fn source_dir(path: &str) -> PathBuf {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from("/")
        };
    }
    match Path::new(trimmed).parent() {
        Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
        Some(parent) => parent.to_path_buf(),
        None => PathBuf::from("/"),
    }
}

fn change_dir(dir: &Path) -> Result<(), BridgeError> {
    env::set_current_dir(dir).map_err(|e| BridgeError::WorkingDir {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })
}

/// Restores the remembered working directory on drop.
#[derive(Debug)]
pub struct WorkingDirGuard {
    previous: Option<PathBuf>,
}

impl WorkingDirGuard {
    /// Remember the current directory and, when there is a source argument,
    /// change into its directory. Failures are logged, never returned.
    pub fn enter_source_dir(args: &ArgVector) -> Self {
        let previous = match env::current_dir() {
            Ok(dir) => Some(dir),
            Err(e) => {
                log::error!("Failed to read current directory: {e}");
                None
            }
        };

        if let Some(source) = args.source_path() {
            let dir = source_dir(source);
            log::info!("Changing to directory: {}", dir.display());
            if let Err(e) = change_dir(&dir) {
                log::error!("{e}");
            }
        }

        Self { previous }
    }

    pub fn previous(&self) -> Option<&Path> {
        self.previous.as_deref()
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Some(dir) = self.previous.take() {
            if let Err(e) = change_dir(&dir) {
                log::error!("Failed to restore working directory: {e}");
            }
        }
    }
}
