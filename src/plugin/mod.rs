//! Restaurant plugins.
//!
//! A plugin provides one restaurant's menu through two entry points:
//! `name()` and `food(api, date)`. Plugins are usually JavaScript files
//! discovered in the plugin directory and run in an embedded QuickJS
//! engine ([`ScriptPlugin`]); anything implementing [`Plugin`] can be
//! handed to the aggregator directly.
//!
//! # Script plugins
//!
//! ```js
//! function name() {
//!   return "Barabicu";
//! }
//!
//! function food(api, date) {
//!   if (!api.is_current_week(date) || !api.is_weekday(date)) return [];
//!   const page = api.soup(api.get("https://barabicu.se").text);
//!   return page.select("li h3").map((h) => api.food(h.text, ""));
//! }
//! ```
//!
//! `date` carries `iso`, `year`, `month`, `day`, `weekday` (Monday = 1) and
//! `week` (ISO week). `food` may return any iterable; `null` or `undefined`
//! mean no offerings.

mod bridge;
pub mod loader;
pub mod script;

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;

use crate::api::FoodApi;
use crate::food::Food;

pub use loader::{discover, load_plugins, load_plugins_with_timeout, LoadOutcome, Rejected};
pub use script::ScriptPlugin;

/// Entry points every plugin must define.
pub const ENTRY_POINTS: [&str; 2] = ["name", "food"];

/// File extension of script plugins.
pub const PLUGIN_EXTENSION: &str = "js";

/// Per-plugin failures. None of these abort a run.
#[derive(Error, Debug, Clone)]
pub enum PluginError {
    #[error("failed to load: {message}")]
    Import { message: String },

    #[error("missing required function `{entry}`")]
    MissingEntryPoint { entry: &'static str },

    #[error("{entry}() failed: {message}")]
    Runtime {
        entry: &'static str,
        message: String,
        stack: Option<String>,
    },

    #[error("script engine error: {0}")]
    Engine(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("plugin task panicked: {0}")]
    Panicked(String),
}

impl PluginError {
    /// Short label for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Import { .. } => "ImportError",
            Self::MissingEntryPoint { .. } => "ContractError",
            Self::Runtime { .. } => "RuntimeError",
            Self::Engine(_) => "EngineError",
            Self::Timeout(_) => "Timeout",
            Self::Panicked(_) => "Panic",
        }
    }

    /// Script stack trace, when the engine reported one.
    pub fn stack(&self) -> Option<&str> {
        match self {
            Self::Runtime { stack, .. } => stack.as_deref(),
            _ => None,
        }
    }
}

/// Fatal problems with the plugin directory itself.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("plugin directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to read plugin directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One restaurant's menu source.
pub trait Plugin: Send {
    /// Identifier used in logs, usually the file stem.
    fn id(&self) -> &str;

    /// Restaurant name shown in the report.
    fn name(&self) -> Result<String, PluginError>;

    /// Dishes offered on `date`. An empty list means nothing is served.
    fn food(&self, api: &FoodApi, date: NaiveDate) -> Result<Vec<Food>, PluginError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds() {
        let err = PluginError::MissingEntryPoint { entry: "food" };
        assert_eq!(err.kind(), "ContractError");
        assert_eq!(err.to_string(), "missing required function `food`");

        let err = PluginError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "timed out after 5s");
    }

    #[test]
    fn only_runtime_errors_carry_stacks() {
        let err = PluginError::Runtime {
            entry: "food",
            message: "boom".into(),
            stack: Some("    at food (barabicu.js:3)".into()),
        };
        assert_eq!(err.to_string(), "food() failed: boom");
        assert_eq!(err.stack(), Some("    at food (barabicu.js:3)"));
        assert!(PluginError::Engine("oom".into()).stack().is_none());
    }
}
