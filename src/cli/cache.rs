//! Cache management commands.

use clap::Subcommand;
use serde::Serialize;
use uuid::Uuid;

use super::{Cli, print_json};
use crate::config::Config;
use crate::model::Subject;

#[derive(Subcommand, Debug, Clone)]
pub enum CacheCommand {
    /// Regenerate cached aggregates, for everything by default
    Gen {
        /// Only this work item
        #[arg(long, conflicts_with = "group")]
        work_item: Option<Uuid>,

        /// Only this group
        #[arg(long)]
        group: Option<Uuid>,

        /// Clear the cache before regenerating
        #[arg(long)]
        fresh: bool,
    },

    /// Remove every cached value
    Rm,
}

#[derive(Debug, Serialize)]
struct Regenerated {
    subject: Subject,
    entries: usize,
}

#[derive(Debug, Serialize)]
struct Removed {
    removed: usize,
}

/// Run a cache command.
pub async fn run_cache_command(cli: &Cli, cmd: CacheCommand, config: Config) -> anyhow::Result<()> {
    let engine = cli.engine(config).await?;

    match cmd {
        CacheCommand::Gen {
            work_item,
            group,
            fresh,
        } => {
            if fresh {
                engine.clear_cache();
            }
            let subject = work_item.map(Subject::WorkItem).or(group.map(Subject::Group));
            match subject {
                Some(subject) => {
                    let entries = engine.regenerate(subject)?;
                    engine.flush_cache()?;
                    print_json(&Regenerated { subject, entries })
                }
                None => {
                    let report = engine.regenerate_all().await?;
                    print_json(&report)
                }
            }
        }
        CacheCommand::Rm => {
            let removed = engine.clear_cache();
            engine.flush_cache()?;
            print_json(&Removed { removed })
        }
    }
}
