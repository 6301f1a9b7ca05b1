//! Reporting commands.

use chrono::NaiveDate;
use clap::Subcommand;
use serde::Serialize;
use uuid::Uuid;

use super::{Cli, Target, print_json};
use crate::aggregate::ProfileRequest;
use crate::calendar::{DateWindow, Frequency, WorkCalendar};
use crate::config::Config;
use crate::engine::holiday_source;

#[derive(Subcommand, Debug, Clone)]
pub enum ReportCommand {
    /// Count working days between two dates, inclusive
    Workdays { start: NaiveDate, end: NaiveDate },

    /// Spend statistics for a date window
    Stats {
        #[command(flatten)]
        target: Target,

        #[arg(long)]
        start: NaiveDate,

        #[arg(long)]
        end: NaiveDate,

        /// Ignore people costs before this date
        #[arg(long)]
        calculation_start: Option<NaiveDate>,

        /// Only report contractor costs
        #[arg(long)]
        contractor_only: bool,

        /// Only report non-contractor costs
        #[arg(long)]
        non_contractor_only: bool,
    },

    /// Full financial profile
    Profile {
        #[command(flatten)]
        target: Target,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,

        /// Time frame frequency (MS, YS or FY)
        #[arg(long)]
        freq: Option<Frequency>,

        #[arg(long)]
        calculation_start: Option<NaiveDate>,
    },

    /// Full-time equivalents over a window, last week by default
    Fte {
        #[command(flatten)]
        target: Target,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Profiles of everything in a service area
    Area {
        /// Area id
        area: Uuid,

        /// Only include these ungrouped work items
        #[arg(long)]
        only: Vec<Uuid>,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,

        #[arg(long)]
        freq: Option<Frequency>,
    },
}

#[derive(Debug, Serialize)]
struct Workdays {
    start: NaiveDate,
    end: NaiveDate,
    workdays: u32,
}

#[derive(Debug, Serialize)]
struct PeopleCosts {
    window: String,
    people_costs: rust_decimal::Decimal,
}

#[derive(Debug, Serialize)]
struct Fte {
    current_fte: rust_decimal::Decimal,
}

/// Run a reporting command.
pub async fn run_report_command(
    cli: &Cli,
    cmd: ReportCommand,
    config: Config,
) -> anyhow::Result<()> {
    if let ReportCommand::Workdays { start, end } = cmd {
        let calendar = WorkCalendar::load(holiday_source(&config).as_ref()).await?;
        return print_json(&Workdays {
            start,
            end,
            workdays: calendar.workdays(start, end),
        });
    }

    let default_freq = config.frequency;
    let engine = cli.engine(config).await?;
    let result = match cmd {
        ReportCommand::Workdays { .. } => Ok(()),
        ReportCommand::Stats {
            target,
            start,
            end,
            calculation_start,
            contractor_only,
            non_contractor_only,
        } => {
            let subject = target.subject()?;
            let window = DateWindow::new(start, end);
            if contractor_only || non_contractor_only {
                let people_costs = engine.people_costs(
                    subject,
                    window,
                    contractor_only,
                    non_contractor_only,
                    calculation_start,
                )?;
                print_json(&PeopleCosts {
                    window: window.to_string(),
                    people_costs,
                })
            } else {
                print_json(&engine.stats_between(subject, window, calculation_start)?)
            }
        }
        ReportCommand::Profile {
            target,
            start,
            end,
            freq,
            calculation_start,
        } => {
            let request = ProfileRequest::new(freq.unwrap_or(default_freq))
                .between(start, end)
                .calculated_from(calculation_start);
            print_json(&engine.profile(target.subject()?, &request)?)
        }
        ReportCommand::Fte { target, start, end } => {
            let current_fte = engine.current_fte(target.subject()?, start, end)?;
            print_json(&Fte { current_fte })
        }
        ReportCommand::Area {
            area,
            only,
            start,
            end,
            freq,
        } => {
            let request = ProfileRequest::new(freq.unwrap_or(default_freq)).between(start, end);
            let only = (!only.is_empty()).then_some(only.as_slice());
            print_json(&engine.area_profile(area, &request, only)?)
        }
    };

    // No-op for the in-memory cache.
    engine.flush_cache()?;
    result
}
