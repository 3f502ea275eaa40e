//! Drives the loaded plugins and assembles the day's report.
//!
//! Plugins run one at a time, in discovery order, each on the blocking pool
//! so script code may block on HTTP. A failing plugin is logged and left out
//! of the menus; it never stops the others.

use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::api::FoodApi;
use crate::food::Food;
use crate::plugin::{Plugin, PluginError};

/// One restaurant's offerings. `dishes` may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    pub restaurant: String,
    pub dishes: Vec<Food>,
}

/// A plugin that produced no menu this run.
#[derive(Debug, Clone)]
pub struct Failure {
    /// Plugin identifier.
    pub plugin: String,
    /// Restaurant name, if `name()` got that far.
    pub restaurant: Option<String>,
    pub error: PluginError,
}

impl Failure {
    /// Restaurant name, falling back to the plugin identifier.
    pub fn label(&self) -> &str {
        self.restaurant.as_deref().unwrap_or(&self.plugin)
    }
}

/// Combined result of a run.
#[derive(Debug, Clone)]
pub struct Report {
    pub date: NaiveDate,
    /// Menus in plugin order; no sorting or merging.
    pub menus: Vec<Menu>,
    pub failures: Vec<Failure>,
}

impl Report {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            menus: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// `(restaurant, dishes)` pairs, in plugin order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &[Food])> {
        self.menus
            .iter()
            .map(|menu| (menu.restaurant.as_str(), menu.dishes.as_slice()))
    }
}

/// Runs plugins against a shared [`FoodApi`].
pub struct Aggregator {
    api: FoodApi,
    timeout: Option<Duration>,
}

impl Aggregator {
    pub fn new(api: FoodApi) -> Self {
        Self { api, timeout: None }
    }

    /// Give up on a plugin after `timeout`.
    ///
    /// The abandoned call's result is discarded. Script plugins loaded with
    /// the same limit also stop their own runaway code.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Query every plugin for `date`.
    pub async fn run(&self, plugins: Vec<Box<dyn Plugin>>, date: NaiveDate) -> Report {
        let mut report = Report::new(date);

        for plugin in plugins {
            match self.run_one(plugin, date).await {
                Ok(menu) => {
                    debug!(
                        "{} offers {} dish(es) on {date}",
                        menu.restaurant,
                        menu.dishes.len()
                    );
                    report.menus.push(menu);
                }
                Err(failure) => {
                    warn!("Plugin {} failed: {}", failure.plugin, failure.error);
                    report.failures.push(failure);
                }
            }
        }

        report
    }

    async fn run_one(&self, plugin: Box<dyn Plugin>, date: NaiveDate) -> Result<Menu, Failure> {
        let id = plugin.id().to_string();
        let api = self.api.clone();
        let task = tokio::task::spawn_blocking(move || invoke(plugin.as_ref(), &api, date));

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    return Err(Failure {
                        plugin: id,
                        restaurant: None,
                        error: PluginError::Timeout(limit),
                    })
                }
            },
            None => task.await,
        };

        joined.map_err(|e| Failure {
            plugin: id,
            restaurant: None,
            error: PluginError::Panicked(e.to_string()),
        })?
    }
}

/// Call `name()` then `food()`.
fn invoke(plugin: &dyn Plugin, api: &FoodApi, date: NaiveDate) -> Result<Menu, Failure> {
    let failure = |restaurant: Option<String>, error: PluginError| Failure {
        plugin: plugin.id().to_string(),
        restaurant,
        error,
    };

    let restaurant = plugin.name().map_err(|e| failure(None, e))?;
    let dishes = plugin
        .food(api, date)
        .map_err(|e| failure(Some(restaurant.clone()), e))?;

    Ok(Menu { restaurant, dishes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::ScriptPlugin;

    /// In-process plugin with canned behaviour.
    struct Canned {
        id: &'static str,
        name: Result<&'static str, &'static str>,
        food: Result<Vec<Food>, &'static str>,
    }

    impl Canned {
        fn serving(id: &'static str, name: &'static str, food: Vec<Food>) -> Box<dyn Plugin> {
            Box::new(Self {
                id,
                name: Ok(name),
                food: Ok(food),
            })
        }
    }

    impl Plugin for Canned {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> Result<String, PluginError> {
            self.name.map(str::to_string).map_err(|message| PluginError::Runtime {
                entry: "name",
                message: message.to_string(),
                stack: None,
            })
        }

        fn food(&self, _api: &FoodApi, _date: NaiveDate) -> Result<Vec<Food>, PluginError> {
            self.food.clone().map_err(|message| PluginError::Runtime {
                entry: "food",
                message: message.to_string(),
                stack: None,
            })
        }
    }

    struct Sleepy;

    impl Plugin for Sleepy {
        fn id(&self) -> &str {
            "sleepy"
        }

        fn name(&self) -> Result<String, PluginError> {
            Ok("Sleepy Diner".into())
        }

        fn food(&self, _api: &FoodApi, _date: NaiveDate) -> Result<Vec<Food>, PluginError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(Vec::new())
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(FoodApi::with_today(monday()).unwrap())
    }

    #[tokio::test]
    async fn no_plugins_no_menus() {
        let report = aggregator().run(Vec::new(), monday()).await;
        assert!(report.menus.is_empty());
        assert!(report.failures.is_empty());
        assert_eq!(report.date, monday());
    }

    #[tokio::test]
    async fn empty_menu_is_kept() {
        let plugins = vec![Canned::serving("closed", "Closed Today", Vec::new())];
        let report = aggregator().run(plugins, monday()).await;
        assert_eq!(
            report.menus,
            vec![Menu {
                restaurant: "Closed Today".into(),
                dishes: Vec::new()
            }]
        );
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn failing_plugin_is_isolated() {
        let plugins: Vec<Box<dyn Plugin>> = vec![
            Canned::serving("a", "Bistro A", vec![Food::new("Soup", "Tomato soup")]),
            Box::new(Canned {
                id: "b",
                name: Ok("Bistro B"),
                food: Err("connection refused"),
            }),
            Box::new(Canned {
                id: "c",
                name: Err("no name"),
                food: Ok(Vec::new()),
            }),
            Canned::serving("d", "Bistro D", vec![Food::new("Pasta", "")]),
        ];

        let report = aggregator().run(plugins, monday()).await;
        let pairs: Vec<_> = report.pairs().collect();
        assert_eq!(
            pairs,
            vec![
                ("Bistro A", &[Food::new("Soup", "Tomato soup")][..]),
                ("Bistro D", &[Food::new("Pasta", "")][..]),
            ]
        );

        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].plugin, "b");
        assert_eq!(report.failures[0].label(), "Bistro B");
        assert_eq!(report.failures[1].label(), "c");
        assert!(matches!(
            report.failures[1].error,
            PluginError::Runtime { entry: "name", .. }
        ));
    }

    #[tokio::test]
    async fn preserves_plugin_order() {
        let plugins = vec![
            Canned::serving("z", "Zeta", Vec::new()),
            Canned::serving("a", "Alpha", Vec::new()),
            Canned::serving("z2", "Zeta", Vec::new()),
        ];
        let report = aggregator().run(plugins, monday()).await;
        let names: Vec<_> = report.pairs().map(|(name, _)| name).collect();
        assert_eq!(names, ["Zeta", "Alpha", "Zeta"]);
    }

    #[tokio::test]
    async fn timeout_records_failure() {
        let plugins: Vec<Box<dyn Plugin>> = vec![
            Box::new(Sleepy),
            Canned::serving("a", "Bistro A", Vec::new()),
        ];
        let report = aggregator()
            .with_timeout(Some(Duration::from_millis(50)))
            .run(plugins, monday())
            .await;

        assert_eq!(report.menus.len(), 1);
        assert_eq!(report.failures[0].plugin, "sleepy");
        assert!(matches!(report.failures[0].error, PluginError::Timeout(_)));
    }

    #[tokio::test]
    async fn script_plugins_end_to_end() {
        let good = ScriptPlugin::from_source(
            "bistro_a",
            r#"
                function name() { return "Bistro A"; }
                function food(api, date) { return [api.food("Soup", "Tomato soup")]; }
            "#,
        )
        .unwrap();
        let broken = ScriptPlugin::from_source(
            "bistro_b",
            r#"
                function name() { return "Bistro B"; }
                function food(api, date) { return api.get("not a url").text; }
            "#,
        )
        .unwrap();

        let report = aggregator()
            .run(vec![Box::new(good), Box::new(broken)], monday())
            .await;

        assert_eq!(
            report.menus,
            vec![Menu {
                restaurant: "Bistro A".into(),
                dishes: vec![Food::new("Soup", "Tomato soup")],
            }]
        );
        assert_eq!(report.failures.len(), 1);
        match &report.failures[0].error {
            PluginError::Runtime { entry, message, .. } => {
                assert_eq!(*entry, "food");
                assert!(message.contains("invalid URL"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
