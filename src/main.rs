//! `mat` CLI - show today's lunch menus

use std::num::NonZeroU64;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mat::aggregate::{Aggregator, Failure};
use mat::api::{calendar, FoodApi};
use mat::config::{self, FileConfig};
use mat::plugin::load_plugins_with_timeout;
use mat::render::{render, RenderOptions};

/// Grace period for abandoned plugin calls at exit.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "mat")]
#[command(about = "Show today's food options")]
#[command(version)]
struct Cli {
    /// Show menu for tomorrow instead of today
    #[arg(short, long, conflicts_with = "date")]
    tomorrow: bool,

    /// Show menu for a specific date (YYYY-MM-DD)
    #[arg(short, long)]
    date: Option<String>,

    /// Show detailed information about food alternatives
    #[arg(short, long)]
    verbose: bool,

    /// Squelch plugin errors
    #[arg(short, long)]
    quiet: bool,

    /// Colorize restaurant names, dishes, and descriptions
    #[arg(short, long)]
    color: bool,

    /// Show script stack traces on plugin errors
    #[arg(short = 's', long)]
    with_stacktrace: bool,

    /// Load restaurant plugins from this directory
    #[arg(short, long, value_name = "DIR")]
    plugin_directory: Option<PathBuf>,

    /// Print menus as markdown
    #[arg(short, long)]
    markdown: bool,

    /// Give up on a plugin after this many seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Config file (default: ~/.config/mat/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Flags override the config file; an unset flag keeps the file's value.
    fn render_options(&self, file: &FileConfig) -> RenderOptions {
        RenderOptions {
            color: self.color || file.color,
            verbose: self.verbose || file.verbose,
            markdown: self.markdown || file.markdown,
            quiet: self.quiet || file.quiet,
            with_stacktrace: self.with_stacktrace || file.with_stacktrace,
        }
    }

    fn target_date(&self, today: NaiveDate) -> Result<NaiveDate> {
        if let Some(date) = &self.date {
            return Ok(calendar::parse_date(date)?);
        }
        if self.tomorrow {
            return today.succ_opt().context("date out of range");
        }
        Ok(today)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("MAT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let result = runtime.block_on(run(cli));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run(cli: Cli) -> Result<()> {
    let file = config::load_config(cli.config.as_deref())?;
    let options = cli.render_options(&file);

    let today = Local::now().date_naive();
    let date = cli.target_date(today)?;

    let plugin_dir = config::resolve_plugin_directory(
        cli.plugin_directory.as_deref(),
        file.plugin_directory.as_deref(),
        dirs::home_dir().as_deref(),
    );
    debug!("Plugin directory: {}", plugin_dir.display());
    let timeout = cli
        .timeout
        .or(file.timeout_secs.map(NonZeroU64::get))
        .map(Duration::from_secs);
    let outcome = load_plugins_with_timeout(&plugin_dir, timeout)?;

    let api = FoodApi::with_today(today)?;
    let mut report = Aggregator::new(api)
        .with_timeout(timeout)
        .run(outcome.plugins, date)
        .await;

    // Load failures come first, in discovery order.
    let mut failures: Vec<Failure> = outcome
        .rejected
        .into_iter()
        .map(|rejected| Failure {
            plugin: rejected.id(),
            restaurant: None,
            error: rejected.error,
        })
        .collect();
    failures.append(&mut report.failures);
    report.failures = failures;

    print!("{}", render(&report, &options));
    Ok(())
}
