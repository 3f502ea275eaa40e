//! Settings: optional config file plus plugin directory resolution.
//!
//! The config file lives at `~/.config/mat/config.toml` (platform config
//! directory) and is optional:
//!
//! ```toml
//! plugin_directory = "/home/me/lunch-plugins"
//! color = true
//! verbose = false
//! timeout_secs = 20
//! ```

use std::num::NonZeroU64;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Directory under `$HOME` checked for plugins.
pub const MAT_DIR: &str = ".mat";

/// Relative fallback plugin directory.
pub const DEFAULT_PLUGIN_DIR: &str = "plugins";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

/// Contents of the config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub plugin_directory: Option<PathBuf>,
    pub color: bool,
    pub verbose: bool,
    pub markdown: bool,
    pub quiet: bool,
    pub with_stacktrace: bool,
    /// Per-plugin time limit; zero is rejected.
    pub timeout_secs: Option<NonZeroU64>,
}

impl FileConfig {
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Load the config file.
///
/// With an explicit path the file must exist. Without one, the default
/// location is used and a missing file means defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(FileConfig::default()),
        },
    };

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    FileConfig::parse(&content, &path)
}

/// Default config file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mat").join("config.toml"))
}

/// Pick the plugin directory.
///
/// Order: the command-line flag, the config file, `$HOME/.mat` if it is a
/// directory, then `plugins` relative to the working directory.
pub fn resolve_plugin_directory(
    flag: Option<&Path>,
    configured: Option<&Path>,
    home: Option<&Path>,
) -> PathBuf {
    if let Some(dir) = flag.or(configured) {
        return dir.to_path_buf();
    }

    if let Some(dot_mat) = home.map(|home| home.join(MAT_DIR)) {
        if dot_mat.is_dir() {
            return dot_mat;
        }
    }

    PathBuf::from(DEFAULT_PLUGIN_DIR)
}
