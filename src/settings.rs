use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

const SETTINGS_VERSION: u32 = 1;

/// Highest `-d` level pawncc understands.
pub const MAX_DEBUG_LEVEL: u8 = 3;
/// Highest `-O` level pawncc understands.
pub const MAX_OPTIMIZATION_LEVEL: u8 = 2;

// ── Compiler settings ────────────────────────────────────────────

/// Options the host passes to every compile, persisted as JSON.
///
/// Unset fields leave the compiler's own default in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerSettings {
    pub version: u32,
    /// `-i<dir>`, searched in order.
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    /// `-o<file>`
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// `-d<level>`
    #[serde(default)]
    pub debug_level: Option<u8>,
    /// `-O<level>`
    #[serde(default)]
    pub optimization_level: Option<u8>,
    /// `-;+` / `-;-`
    #[serde(default)]
    pub require_semicolons: Option<bool>,
    /// `-(+` / `-(-`
    #[serde(default)]
    pub require_parentheses: Option<bool>,
    /// `-t<n>`
    #[serde(default)]
    pub tab_size: Option<u8>,
    /// `-w<n>-`
    #[serde(default)]
    pub disabled_warnings: Vec<u16>,
    /// `sym=value`
    #[serde(default)]
    pub defines: BTreeMap<String, String>,
    /// Passed through verbatim, after everything else.
    #[serde(default)]
    pub extra_options: Vec<String>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            include_dirs: Vec::new(),
            output: None,
            debug_level: None,
            optimization_level: None,
            require_semicolons: None,
            require_parentheses: None,
            tab_size: None,
            disabled_warnings: Vec::new(),
            defines: BTreeMap::new(),
            extra_options: Vec::new(),
        }
    }
}

/// Values given for one run, layered over the saved settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub include_dirs: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub debug_level: Option<u8>,
    pub optimization_level: Option<u8>,
    pub extra_options: Vec<String>,
}

fn push_missing<T: PartialEq + Clone>(list: &mut Vec<T>, items: &[T]) {
    for item in items {
        if !list.contains(item) {
            list.push(item.clone());
        }
    }
}

fn toggle(flag: &str, on: bool) -> String {
    format!("-{flag}{}", if on { '+' } else { '-' })
}

impl CompilerSettings {
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.debug_level.is_some_and(|d| d > MAX_DEBUG_LEVEL) {
            return Err(BridgeError::SettingsError {
                message: format!("debug level must be 0-{MAX_DEBUG_LEVEL}"),
            });
        }
        if self
            .optimization_level
            .is_some_and(|o| o > MAX_OPTIMIZATION_LEVEL)
        {
            return Err(BridgeError::SettingsError {
                message: format!("optimization level must be 0-{MAX_OPTIMIZATION_LEVEL}"),
            });
        }
        if self.tab_size == Some(0) {
            return Err(BridgeError::SettingsError {
                message: "tab size must be positive".into(),
            });
        }
        if let Some(name) = self.defines.keys().find(|k| k.is_empty() || k.contains('=')) {
            return Err(BridgeError::SettingsError {
                message: format!("invalid symbol name {name:?}"),
            });
        }
        Ok(())
    }

    /// Render the pawncc option list, source file excluded.
    pub fn build_options(&self) -> Vec<String> {
        let mut options = Vec::new();
        options.extend(
            self.include_dirs
                .iter()
                .map(|dir| format!("-i{}", dir.display())),
        );
        if let Some(output) = &self.output {
            options.push(format!("-o{}", output.display()));
        }
        if let Some(level) = self.debug_level {
            options.push(format!("-d{level}"));
        }
        if let Some(level) = self.optimization_level {
            options.push(format!("-O{level}"));
        }
        if let Some(on) = self.require_semicolons {
            options.push(toggle(";", on));
        }
        if let Some(on) = self.require_parentheses {
            options.push(toggle("(", on));
        }
        if let Some(size) = self.tab_size {
            options.push(format!("-t{size}"));
        }
        options.extend(self.disabled_warnings.iter().map(|w| format!("-w{w}-")));
        options.extend(self.defines.iter().map(|(name, value)| format!("{name}={value}")));
        options.extend(self.extra_options.iter().cloned());
        options
    }

    /// Layer `overrides` on top. Scalars replace; list entries already present
    /// are kept once, so applying the same overrides again changes nothing.
    pub fn apply(&mut self, overrides: &SettingsOverrides) {
        push_missing(&mut self.include_dirs, &overrides.include_dirs);
        push_missing(&mut self.extra_options, &overrides.extra_options);
        if overrides.output.is_some() {
            self.output.clone_from(&overrides.output);
        }
        if overrides.debug_level.is_some() {
            self.debug_level = overrides.debug_level;
        }
        if overrides.optimization_level.is_some() {
            self.optimization_level = overrides.optimization_level;
        }
    }
}

// ── Persistence ──────────────────────────────────────────────────

/// Per-file mutex map to serialize concurrent writes to the same path.
static FILE_LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Create `tmp_path` and fill it; on failure the partial file is removed.
fn write_temp<F>(tmp_path: &Path, fill: F) -> Result<(), BridgeError>
where
    F: FnOnce(&mut fs::File) -> std::io::Result<()>,
{
    let written = fs::File::create(tmp_path).and_then(|mut file| fill(&mut file));
    if let Err(e) = written {
        let _ = fs::remove_file(tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Write-to-temp, fsync, keep a `.bak` of the old file, rename into place.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), BridgeError> {
    let lock = FILE_LOCKS
        .lock()
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone();
    let _guard = lock.lock();

    let file_name = path.file_name().unwrap_or_default();

    let mut tmp_name = OsString::from(file_name);
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(&tmp_name);

    let mut bak_name = OsString::from(file_name);
    bak_name.push(".bak");
    let bak_path = path.with_file_name(&bak_name);

    write_temp(&tmp_path, |file| {
        file.write_all(data)?;
        file.sync_all()
    })?;

    // Backup is best-effort
    if path.exists() {
        let _ = fs::rename(path, &bak_path);
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load settings from the config directory. Returns None if there is no
/// settings file or it cannot be used; the latter is logged.
pub fn load_settings(config_dir: &Path) -> Option<CompilerSettings> {
    let path = crate::paths::settings_path(config_dir);
    if !path.exists() {
        return None;
    }
    let parsed = fs::read_to_string(&path)
        .map_err(BridgeError::from)
        .and_then(|data| serde_json::from_str::<CompilerSettings>(&data).map_err(BridgeError::from))
        .and_then(|settings| settings.validate().map(|()| settings));
    match parsed {
        Ok(settings) => Some(settings),
        Err(e) => {
            log::warn!("Ignoring {}: {e}", path.display());
            None
        }
    }
}

pub fn save_settings(config_dir: &Path, settings: &CompilerSettings) -> Result<(), BridgeError> {
    settings.validate()?;
    fs::create_dir_all(config_dir)?;
    let json = serde_json::to_string_pretty(settings)?;
    atomic_write(&crate::paths::settings_path(config_dir), json.as_bytes())
}
