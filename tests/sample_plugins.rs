//! The plugins shipped in `plugins/` load cleanly and stay offline when the
//! requested date is outside the current week.

use std::path::PathBuf;

use chrono::NaiveDate;
use mat::{load_plugins, Aggregator, FoodApi};

fn shipped_plugins() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("plugins")
}

#[test]
fn shipped_plugins_load() {
    let outcome = load_plugins(&shipped_plugins()).unwrap();
    assert!(outcome.rejected.is_empty(), "{:?}", outcome.rejected);

    let names: Vec<String> = outcome
        .plugins
        .iter()
        .map(|plugin| plugin.name().unwrap())
        .collect();
    assert_eq!(names, ["Barabicu", "Solrosen"]);
}

#[tokio::test]
async fn other_weeks_have_no_menu() {
    let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    let last_year = NaiveDate::from_ymd_opt(2025, 10, 20).unwrap();

    let outcome = load_plugins(&shipped_plugins()).unwrap();
    let report = Aggregator::new(FoodApi::with_today(today).unwrap())
        .run(outcome.plugins, last_year)
        .await;

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.menus.len(), 2);
    assert!(report.menus.iter().all(|menu| menu.dishes.is_empty()));
}
