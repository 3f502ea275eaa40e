//! Plugin discovery and loading.
//!
//! Scans the plugin directory (non-recursively) for `*.js` files, loads each
//! one into its own script context and keeps the ones that define both
//! entry points. A broken plugin is logged and skipped; only problems with
//! the directory itself are fatal.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{LoadError, Plugin, PluginError, ScriptPlugin, PLUGIN_EXTENSION};

/// A plugin file that could not be loaded.
#[derive(Debug)]
pub struct Rejected {
    pub path: PathBuf,
    pub error: PluginError,
}

impl Rejected {
    /// File stem, used as the plugin identifier.
    pub fn id(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Result of loading a plugin directory.
#[derive(Default)]
pub struct LoadOutcome {
    /// Validated plugins, in discovery order.
    pub plugins: Vec<Box<dyn Plugin>>,
    pub rejected: Vec<Rejected>,
}

/// List plugin files in `dir`, sorted by file name.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !dir.exists() {
        return Err(LoadError::MissingDirectory(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(LoadError::NotADirectory(dir.to_path_buf()));
    }

    let read_dir_error = |source: std::io::Error| LoadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_error)? {
        let path = entry.map_err(read_dir_error)?.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == PLUGIN_EXTENSION)
        {
            files.push(path);
        }
    }
    files.sort();

    debug!("Discovered {} plugin file(s) in {}", files.len(), dir.display());
    Ok(files)
}

/// Load every plugin in `dir`.
pub fn load_plugins(dir: &Path) -> Result<LoadOutcome, LoadError> {
    load_plugins_with_timeout(dir, None)
}

/// Load every plugin in `dir`, limiting each script run to `time_limit`.
///
/// The limit applies to evaluating the file as well as to later
/// `name()`/`food()` calls.
pub fn load_plugins_with_timeout(
    dir: &Path,
    time_limit: Option<Duration>,
) -> Result<LoadOutcome, LoadError> {
    let mut outcome = LoadOutcome::default();

    for path in discover(dir)? {
        match ScriptPlugin::load_with_timeout(&path, time_limit) {
            Ok(plugin) => {
                debug!("Loaded plugin '{}' from {}", plugin.id(), path.display());
                outcome.plugins.push(Box::new(plugin));
            }
            Err(error) => {
                warn!("Skipping plugin {}: {}", path.display(), error);
                outcome.rejected.push(Rejected { path, error });
            }
        }
    }

    info!(
        "Loaded {} plugin(s), skipped {}",
        outcome.plugins.len(),
        outcome.rejected.len()
    );

    Ok(outcome)
}
