//! Command line interface.
//!
//! Every command reads an entity snapshot, runs one engine operation and
//! prints the result as JSON on stdout. Logs go to stderr.

mod cache;
mod report;

pub use cache::{CacheCommand, run_cache_command};
pub use report::{ReportCommand, run_report_command};

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::engine::Engine;
use crate::model::{Snapshot, Subject};

#[derive(Parser, Debug)]
#[command(name = "burnrate", version, about = "Spend, rate and budget reports for work items")]
pub struct Cli {
    /// Entity snapshot to report on
    #[arg(short, long, env = "BURNRATE_SNAPSHOT", global = true)]
    pub snapshot: Option<PathBuf>,

    /// Holiday list (JSON), instead of fetching from gov.uk
    #[arg(long, global = true)]
    pub holidays_file: Option<PathBuf>,

    /// Persist the cache in this file
    #[arg(long, global = true)]
    pub cache_file: Option<PathBuf>,

    /// Treat this date as today
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,

    /// Ratio of total cost to budget still reported AMBER
    #[arg(long, global = true)]
    pub amber_threshold: Option<Decimal>,

    /// Emit logs as JSON lines
    #[arg(long, env = "BURNRATE_LOG_JSON", global = true)]
    pub json_logs: bool,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Report on a work item, group or area
    #[command(flatten)]
    Report(ReportCommand),

    /// Warm or clear the cache
    #[command(subcommand)]
    Cache(CacheCommand),
}

/// Selects one work item or group.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = true, multiple = false)]
pub struct Target {
    /// Work item id
    #[arg(long)]
    pub work_item: Option<Uuid>,

    /// Work item group id
    #[arg(long)]
    pub group: Option<Uuid>,
}

impl Target {
    pub fn subject(&self) -> anyhow::Result<Subject> {
        match (self.work_item, self.group) {
            (Some(id), None) => Ok(Subject::WorkItem(id)),
            (None, Some(id)) => Ok(Subject::Group(id)),
            _ => anyhow::bail!("pass exactly one of --work-item or --group"),
        }
    }
}

impl Cli {
    /// Environment configuration with this invocation's flags applied.
    pub fn config(&self) -> anyhow::Result<Config> {
        let mut config = Config::from_env()?;
        if let Some(path) = &self.holidays_file {
            config.holidays_file = Some(path.clone());
        }
        if let Some(path) = &self.cache_file {
            config.cache_file = Some(path.clone());
        }
        if let Some(today) = self.today {
            config.today = Some(today);
        }
        if let Some(threshold) = self.amber_threshold {
            config.amber_threshold = threshold;
        }
        config.validate()?;
        Ok(config)
    }

    /// Load the snapshot and build an engine around it.
    pub async fn engine(&self, config: Config) -> anyhow::Result<Arc<Engine>> {
        let Some(path) = &self.snapshot else {
            anyhow::bail!("no snapshot given, pass --snapshot or set BURNRATE_SNAPSHOT");
        };
        let snapshot = Snapshot::load(path)?;
        Ok(Arc::new(Engine::from_config(config, snapshot).await?))
    }
}

/// Run a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config()?;
    match &cli.command {
        Command::Report(cmd) => run_report_command(&cli, cmd.clone(), config).await,
        Command::Cache(cmd) => run_cache_command(&cli, cmd.clone(), config).await,
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
