//! JavaScript plugins run in QuickJS (via rquickjs).
//!
//! Every plugin gets its own runtime and context, so plugins cannot see
//! each other's globals and a crashed or exhausted context only affects
//! its own plugin.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use rquickjs::{CatchResultExt, CaughtError, Context, Function, Runtime};
use tracing::debug;

use super::{bridge, Plugin, PluginError, ENTRY_POINTS};
use crate::api::{FoodApi, PluginDate};
use crate::food::Food;

/// Memory limit per plugin (32MB, plenty for a scraped page or two).
const MEMORY_LIMIT: usize = 32 * 1024 * 1024;

const MAX_STACK_SIZE: usize = 1024 * 1024;

/// Point in time after which the interrupt handler stops the script.
#[derive(Clone, Default)]
struct Deadline(Arc<Mutex<Option<Instant>>>);

impl Deadline {
    fn arm(&self, limit: Option<Duration>) {
        *self.lock() = limit.map(|limit| Instant::now() + limit);
    }

    fn disarm(&self) {
        *self.lock() = None;
    }

    fn expired(&self) -> bool {
        self.lock().is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Instant>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A plugin defined by a JavaScript source file.
pub struct ScriptPlugin {
    id: String,
    path: Option<PathBuf>,
    time_limit: Option<Duration>,
    deadline: Deadline,
    context: Context,
    _runtime: Runtime,
}

impl fmt::Debug for ScriptPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptPlugin")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("time_limit", &self.time_limit)
            .finish_non_exhaustive()
    }
}

impl ScriptPlugin {
    /// Load and validate the plugin at `path`. The id is the file stem.
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        Self::load_with_timeout(path, None)
    }

    /// Like [`load`](Self::load), stopping any script run (including
    /// evaluation of the file itself) that exceeds `time_limit`.
    pub fn load_with_timeout(
        path: &Path,
        time_limit: Option<Duration>,
    ) -> Result<Self, PluginError> {
        let source = fs::read_to_string(path).map_err(|e| PluginError::Import {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        let id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mut plugin = Self::from_source_with_timeout(id, &source, time_limit)?;
        plugin.path = Some(path.to_path_buf());
        Ok(plugin)
    }

    /// Evaluate `source` in a fresh context and check the entry points.
    pub fn from_source(id: impl Into<String>, source: &str) -> Result<Self, PluginError> {
        Self::from_source_with_timeout(id, source, None)
    }

    /// Like [`from_source`](Self::from_source) with a time limit per script run.
    pub fn from_source_with_timeout(
        id: impl Into<String>,
        source: &str,
        time_limit: Option<Duration>,
    ) -> Result<Self, PluginError> {
        let id = id.into();
        let runtime = Runtime::new().map_err(engine)?;
        runtime.set_memory_limit(MEMORY_LIMIT);
        runtime.set_max_stack_size(MAX_STACK_SIZE);
        let deadline = Deadline::default();
        let handler = deadline.clone();
        runtime.set_interrupt_handler(Some(Box::new(move || handler.expired())));
        let context = Context::full(&runtime).map_err(engine)?;

        debug!(plugin = %id, "Evaluating plugin: {} chars", source.len());
        deadline.arm(time_limit);
        let evaluated = context.with(|ctx| -> Result<(), PluginError> {
            bridge::install_prelude(&ctx, &id).map_err(engine)?;

            ctx.eval::<(), _>(source)
                .catch(&ctx)
                .map_err(|e| PluginError::Import {
                    message: describe(e).0,
                })?;

            // Scope lookup, so top-level `const`/`let` functions count too.
            for entry in ENTRY_POINTS {
                let defined: bool = ctx
                    .eval(format!("typeof {entry} === 'function'"))
                    .map_err(engine)?;
                if !defined {
                    return Err(PluginError::MissingEntryPoint { entry });
                }
            }
            Ok(())
        });
        finish(&deadline, time_limit, evaluated)?;

        Ok(Self {
            id,
            path: None,
            time_limit,
            deadline,
            context,
            _runtime: runtime,
        })
    }

    /// Source file, when loaded from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `call` under this plugin's time limit.
    fn limited<T>(&self, call: impl FnOnce() -> Result<T, PluginError>) -> Result<T, PluginError> {
        self.deadline.arm(self.time_limit);
        finish(&self.deadline, self.time_limit, call())
    }
}

/// Disarm `deadline`; an error raised after it expired becomes a timeout.
fn finish<T>(
    deadline: &Deadline,
    time_limit: Option<Duration>,
    result: Result<T, PluginError>,
) -> Result<T, PluginError> {
    let expired = deadline.expired();
    deadline.disarm();
    match (result, time_limit) {
        (Err(_), Some(limit)) if expired => Err(PluginError::Timeout(limit)),
        (result, _) => result,
    }
}

impl Plugin for ScriptPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> Result<String, PluginError> {
        self.limited(|| {
            self.context.with(|ctx| {
                let call: Function = ctx.globals().get("__mat_call_name").map_err(engine)?;
                call.call::<_, String>(())
                    .catch(&ctx)
                    .map_err(|e| runtime_error("name", e))
            })
        })
    }

    fn food(&self, api: &FoodApi, date: NaiveDate) -> Result<Vec<Food>, PluginError> {
        let date = serde_json::to_string(&PluginDate::from(date))
            .map_err(|e| PluginError::Engine(e.to_string()))?;

        let json = self.limited(|| {
            self.context.with(|ctx| -> Result<String, PluginError> {
                bridge::install_api(&ctx, api).map_err(engine)?;
                let call: Function = ctx.globals().get("__mat_call_food").map_err(engine)?;
                call.call::<_, String>((date,))
                    .catch(&ctx)
                    .map_err(|e| runtime_error("food", e))
            })
        })?;

        serde_json::from_str(&json).map_err(|e| PluginError::Runtime {
            entry: "food",
            message: format!("malformed result: {e}"),
            stack: None,
        })
    }
}

fn engine(err: rquickjs::Error) -> PluginError {
    PluginError::Engine(err.to_string())
}

fn runtime_error(entry: &'static str, err: CaughtError<'_>) -> PluginError {
    let (message, stack) = describe(err);
    PluginError::Runtime {
        entry,
        message,
        stack,
    }
}

/// Message and stack of a caught script error.
fn describe(err: CaughtError<'_>) -> (String, Option<String>) {
    match err {
        CaughtError::Exception(exception) => {
            let message = exception
                .message()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "uncaught exception".to_string());
            let stack = exception.stack().filter(|s| !s.trim().is_empty());
            (message, stack)
        }
        other => (other.to_string(), None),
    }
}
