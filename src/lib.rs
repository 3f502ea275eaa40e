//! `mat` - lunch menus from scriptable restaurant plugins
//!
//! # Features
//!
//! - **Plugins**: one JavaScript file per restaurant, run in QuickJS
//! - **API surface**: HTML parsing, HTTP fetching, PDF text and ISO-week
//!   helpers handed to every plugin call
//! - **Isolation**: a plugin that fails to load or run is reported and
//!   skipped; the rest of the report is unaffected
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use mat::aggregate::Aggregator;
//! use mat::api::FoodApi;
//! use mat::plugin::load_plugins;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let api = FoodApi::new()?;
//!     let today = api.today();
//!     let outcome = load_plugins(Path::new("plugins"))?;
//!     let report = Aggregator::new(api).run(outcome.plugins, today).await;
//!     for (restaurant, dishes) in report.pairs() {
//!         println!("{restaurant}: {} dish(es)", dishes.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod api;
pub mod config;
pub mod food;
pub mod plugin;
pub mod render;

pub use aggregate::{Aggregator, Failure, Menu, Report};
pub use api::{ApiError, FoodApi};
pub use food::Food;
pub use plugin::{
    load_plugins, load_plugins_with_timeout, LoadError, Plugin, PluginError, ScriptPlugin,
};

/// Version of mat
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
