//! Centralized file names and path helpers.
//!
//! Functions take plain `&Path` so they work the same from the JNI side and
//! the CLI.

use std::path::{Path, PathBuf};

use crate::error::BridgeError;

// ── Application identity ─────────────────────────────────────────

pub const APP_ID: &str = "com.rvdjv.pawnmc";

// ── Leaf filenames ───────────────────────────────────────────────

pub const SETTINGS_FILE: &str = "compiler.json";

/// Extensions pawncc accepts as top-level source files.
pub const SOURCE_EXTENSIONS: [&str; 2] = ["pwn", "p"];

/// Extension of compiled output.
pub const OUTPUT_EXTENSION: &str = "amx";

// ── Config-dir functions ─────────────────────────────────────────

pub fn settings_path(config_dir: &Path) -> PathBuf {
    config_dir.join(SETTINGS_FILE)
}

/// Default per-user config directory, `<config>/com.rvdjv.pawnmc`.
pub fn default_config_dir() -> PathBuf {
    let base = if cfg!(target_os = "windows") {
        std::env::var("APPDATA").map_or_else(|_| PathBuf::from("."), PathBuf::from)
    } else if cfg!(target_os = "macos") {
        home_dir().join("Library/Application Support")
    } else {
        std::env::var("XDG_CONFIG_HOME").map_or_else(|_| home_dir().join(".config"), PathBuf::from)
    };
    base.join(APP_ID)
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_or_else(|_| PathBuf::from("."), PathBuf::from)
}

// ── Source-file functions ────────────────────────────────────────

/// `.pwn` or `.p`, case-insensitive.
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SOURCE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Reject anything pawncc would not take as a top-level source.
pub fn require_source_file(path: &Path) -> Result<&Path, BridgeError> {
    if is_source_file(path) {
        Ok(path)
    } else {
        Err(BridgeError::InvalidSource {
            path: path.to_path_buf(),
        })
    }
}

/// Where pawncc writes its output when no `-o` is given.
pub fn output_path(source: &Path) -> PathBuf {
    source.with_extension(OUTPUT_EXTENSION)
}
