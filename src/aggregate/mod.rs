//! Roll-ups of attribution into statistics, key dates and profiles.
//!
//! [`Spend`] is implemented by work items, which price their own tasks and
//! costs, and by groups, which sum their visible members. Everything derived
//! from those primitives (stats on a date, RAG, key dates, profiles) is
//! provided by the trait, so callers never need to know which one they hold.

mod area;
mod group;
mod key_dates;
mod profile;
mod stats;
mod work_item;

pub use area::{AreaProfile, area_profile};
pub use key_dates::{KeyDate, KeyDateKind, KeyDateStats, KeyDates};
pub use profile::{AreaRef, Financial, LinkView, Managers, Profile, ProfileRequest};
pub use stats::{PeopleFilter, Rag, Stats};

#[cfg(test)]
pub(crate) use work_item::fixtures;

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::attribution::Pricing;
use crate::cache::{CacheMode, CachedCall, KeyScope, Memoizer};
use crate::calendar::{DateWindow, Frequency, WorkCalendar, slice_time_window};
use crate::costs::CostLine;
use crate::error::CalcError;
use crate::model::{Area, Budget, Link, Phase, PhaseDates, Snapshot, Status, Subject, status_on};

/// Ratio of total cost to budget up to which spend is AMBER rather than RED.
pub const DEFAULT_AMBER_THRESHOLD: Decimal = dec!(1.1);

/// Everything a roll-up reads besides the subject itself.
#[derive(Debug, Clone, Copy)]
pub struct CalcContext<'a> {
    pub calendar: &'a WorkCalendar,
    pub snapshot: &'a Snapshot,
    pub today: NaiveDate,
    pub amber_threshold: Decimal,
    /// Cached entry points go through this when set.
    pub memo: Option<&'a Memoizer>,
}

impl<'a> CalcContext<'a> {
    pub fn new(calendar: &'a WorkCalendar, snapshot: &'a Snapshot, today: NaiveDate) -> Self {
        Self {
            calendar,
            snapshot,
            today,
            amber_threshold: DEFAULT_AMBER_THRESHOLD,
            memo: None,
        }
    }

    pub fn with_memo(mut self, memo: &'a Memoizer) -> Self {
        self.memo = Some(memo);
        self
    }

    pub fn with_amber_threshold(mut self, threshold: Decimal) -> Self {
        self.amber_threshold = threshold;
        self
    }

    pub fn pricing(&self) -> Pricing<'a> {
        Pricing::new(self.calendar, self.today)
    }

    /// The week to yesterday: `[today - 8, today - 1]`.
    pub fn last_week(&self) -> DateWindow {
        let end = self.today - Duration::days(1);
        DateWindow::new(end - Duration::days(7), end)
    }

    /// What cached results computed under this context depend on.
    pub fn key_scope(&self) -> KeyScope {
        KeyScope::new(self.today, self.amber_threshold, self.calendar.fingerprint())
    }

    fn cached<T, F>(&self, call: CachedCall, mode: CacheMode, compute: F) -> Result<T, CalcError>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
        F: FnOnce() -> Result<T, CalcError>,
    {
        match self.memo {
            Some(memo) => memo.get_or_compute(&call, &self.key_scope(), mode, compute),
            None => compute(),
        }
    }
}

/// Turns the recoverable "no dated activity" error into `None`.
pub(crate) fn or_no_data<T>(result: Result<T, CalcError>) -> Result<Option<T>, CalcError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_no_data() => Ok(None),
        Err(e) => Err(e),
    }
}

pub(crate) fn next_day(day: NaiveDate) -> NaiveDate {
    day.succ_opt().unwrap_or(day)
}

/// A work item or a group of them.
pub trait Spend {
    fn subject(&self) -> Subject;

    fn name(&self) -> &str;

    /// `WorkItem` or `WorkItemGroup`.
    fn kind(&self) -> &'static str;

    fn description(&self) -> Option<&str>;

    fn phases(&self) -> &PhaseDates;

    fn statuses(&self) -> &[Status];

    /// Earliest of the first task, budget, cost and discovery date.
    fn first_date(&self, ctx: &CalcContext<'_>) -> Result<NaiveDate, CalcError>;

    /// Latest of the last task, budget, cost and end date.
    fn last_date(&self, ctx: &CalcContext<'_>) -> Result<NaiveDate, CalcError>;

    /// Budget in force on `on`, zero before the first.
    fn budget(&self, ctx: &CalcContext<'_>, on: NaiveDate) -> Result<Decimal, CalcError>;

    /// Every budget change, for key dates.
    fn budget_changes(&self, ctx: &CalcContext<'_>) -> Result<Vec<Budget>, CalcError>;

    fn people_costs(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
        filter: PeopleFilter,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Decimal, CalcError>;

    /// Non-people costs accrued in `window`.
    fn additional_costs(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
    ) -> Result<Decimal, CalcError>;

    fn savings_between(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
    ) -> Result<Decimal, CalcError>;

    /// Days of effort in `window`.
    fn time_spent(&self, ctx: &CalcContext<'_>, window: DateWindow) -> Result<Decimal, CalcError>;

    fn area<'c>(&self, ctx: &CalcContext<'c>) -> Result<Option<&'c Area>, CalcError>;

    fn links(&self, ctx: &CalcContext<'_>) -> Result<Vec<Link>, CalcError>;

    /// Groups have no managers of their own.
    fn managers(&self, _ctx: &CalcContext<'_>) -> Result<Managers, CalcError> {
        Ok(Managers::default())
    }

    fn cost_lines(&self, ctx: &CalcContext<'_>) -> Result<Vec<CostLine>, CalcError>;

    fn saving_lines(&self, ctx: &CalcContext<'_>) -> Result<Vec<CostLine>, CalcError>;

    fn compute_stats_between(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Stats, CalcError> {
        let contractor =
            self.people_costs(ctx, window, PeopleFilter::ContractorOnly, calculation_start)?;
        let non_contractor =
            self.people_costs(ctx, window, PeopleFilter::NonContractorOnly, calculation_start)?;
        let additional = self.additional_costs(ctx, window)?;
        // A budget set for the end date applies from the end of that day.
        let budget = self.budget(ctx, next_day(window.end))?;
        let savings = self.savings_between(ctx, window)?;
        Ok(Stats::new(contractor, non_contractor, additional, budget, savings))
    }

    /// Statistics for `window`, through the cache when there is one.
    fn stats_between(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Stats, CalcError> {
        self.stats_between_with(ctx, window, calculation_start, CacheMode::Reuse)
    }

    fn stats_between_with(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
        calculation_start: Option<NaiveDate>,
        mode: CacheMode,
    ) -> Result<Stats, CalcError> {
        let call = CachedCall::StatsBetween {
            subject: self.subject(),
            window,
            calculation_start,
        };
        ctx.cached(call, mode, || self.compute_stats_between(ctx, window, calculation_start))
    }

    /// Window covering everything before `on`: `[first_date, on - 1]`.
    fn window_to(&self, ctx: &CalcContext<'_>, on: NaiveDate) -> Result<DateWindow, CalcError> {
        Ok(DateWindow::new(self.first_date(ctx)?, on - Duration::days(1)))
    }

    /// Cumulative statistics up to the start of `on`; zeros when there is
    /// nothing dated.
    fn stats_on(
        &self,
        ctx: &CalcContext<'_>,
        on: NaiveDate,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Stats, CalcError> {
        match or_no_data(self.window_to(ctx, on))? {
            Some(window) => self.stats_between(ctx, window, calculation_start),
            None => Ok(Stats::zero()),
        }
    }

    /// Cost from the start up to the start of `on`.
    fn cost_to(
        &self,
        ctx: &CalcContext<'_>,
        on: NaiveDate,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Decimal, CalcError> {
        let stats = self.stats_on(ctx, on, calculation_start)?;
        Ok(stats.contractor + stats.non_contractor + stats.additional)
    }

    fn cost_to_date(
        &self,
        ctx: &CalcContext<'_>,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Decimal, CalcError> {
        self.cost_to(ctx, ctx.today, calculation_start)
    }

    /// Cost up to the end of the last date.
    fn total_cost(
        &self,
        ctx: &CalcContext<'_>,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Decimal, CalcError> {
        match or_no_data(self.last_date(ctx))? {
            Some(last) => self.cost_to(ctx, next_day(last), calculation_start),
            None => Ok(Decimal::ZERO),
        }
    }

    /// Budget on the last date.
    fn final_budget(&self, ctx: &CalcContext<'_>) -> Result<Decimal, CalcError> {
        match or_no_data(self.last_date(ctx))? {
            Some(last) => self.budget(ctx, last),
            None => Ok(Decimal::ZERO),
        }
    }

    fn financial_rag(
        &self,
        ctx: &CalcContext<'_>,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Rag, CalcError> {
        let budget = self.final_budget(ctx)?;
        let total = self.total_cost(ctx, calculation_start)?;
        Ok(Rag::assess(budget, total, ctx.amber_threshold))
    }

    fn phase(&self, ctx: &CalcContext<'_>) -> Phase {
        self.phases().phase(ctx.today)
    }

    fn status_on(&self, on: NaiveDate) -> Option<&Status> {
        status_on(self.statuses(), on)
    }

    fn compute_current_fte(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
    ) -> Result<Decimal, CalcError> {
        let workdays = ctx.calendar.workdays_in(window);
        if workdays == 0 {
            return Ok(Decimal::ZERO);
        }
        Ok(self.time_spent(ctx, window)? / Decimal::from(workdays))
    }

    /// Days of effort per working day over `[start, end]`. `end` defaults
    /// to yesterday and `start` to a week before `end`.
    fn current_fte(
        &self,
        ctx: &CalcContext<'_>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Decimal, CalcError> {
        self.current_fte_with(ctx, start, end, CacheMode::Reuse)
    }

    fn current_fte_with(
        &self,
        ctx: &CalcContext<'_>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        mode: CacheMode,
    ) -> Result<Decimal, CalcError> {
        let end = end.unwrap_or(ctx.last_week().end);
        let start = start.unwrap_or(end - Duration::days(7));
        let window = DateWindow::new(start, end);

        let call = CachedCall::CurrentFte {
            subject: self.subject(),
            window,
        };
        ctx.cached(call, mode, || self.compute_current_fte(ctx, window))
    }

    /// Dates a dashboard takes snapshots on. With `freq`, the starts of
    /// the time windows over the whole life are included.
    fn key_dates(
        &self,
        ctx: &CalcContext<'_>,
        freq: Option<Frequency>,
    ) -> Result<KeyDates, CalcError> {
        let mut dates = KeyDates::new();
        key_dates::phase_dates(&mut dates, self.phases(), ctx.today);
        key_dates::budget_dates(&mut dates, &self.budget_changes(ctx)?);

        if let Some(freq) = freq {
            let first = or_no_data(self.first_date(ctx))?;
            let last = or_no_data(self.last_date(ctx))?;
            if let (Some(first), Some(last)) = (first, last) {
                key_dates::window_dates(&mut dates, first, last, freq);
            }
        }
        Ok(dates)
    }

    fn stats_on_key_dates(
        &self,
        ctx: &CalcContext<'_>,
        freq: Option<Frequency>,
        calculation_start: Option<NaiveDate>,
    ) -> Result<BTreeMap<String, KeyDateStats>, CalcError> {
        self.key_dates(ctx, freq)?
            .into_iter()
            .map(|(key, key_date)| {
                let stats = self.stats_on(ctx, key_date.date, calculation_start)?;
                Ok((key, KeyDateStats { key_date, stats }))
            })
            .collect()
    }

    /// The windows `stats_in_time_frames` reports on: `[start, end]` sliced
    /// by `freq` and widened to whole periods. Missing bounds default to the
    /// first and last dates; with neither available there are none.
    fn time_frames(
        &self,
        ctx: &CalcContext<'_>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        freq: Option<Frequency>,
    ) -> Result<Vec<DateWindow>, CalcError> {
        let start = match start {
            Some(start) => start,
            None => match or_no_data(self.first_date(ctx))? {
                Some(first) => first,
                None => return Ok(Vec::new()),
            },
        };
        let end = match end {
            Some(end) => end,
            None => match or_no_data(self.last_date(ctx))? {
                Some(last) => last,
                None => return Ok(Vec::new()),
            },
        };

        Ok(match freq {
            Some(freq) => slice_time_window(start, end, freq, true),
            None => vec![DateWindow::new(start, end)],
        })
    }

    /// Statistics for each time frame, keyed `YYYY-MM-DD~YYYY-MM-DD`.
    fn stats_in_time_frames(
        &self,
        ctx: &CalcContext<'_>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        freq: Option<Frequency>,
        calculation_start: Option<NaiveDate>,
    ) -> Result<BTreeMap<String, Stats>, CalcError> {
        self.time_frames(ctx, start, end, freq)?
            .into_iter()
            .map(|window| {
                let stats = self.stats_between(ctx, window, calculation_start)?;
                Ok((window.to_string(), stats))
            })
            .collect()
    }

    fn compute_profile(
        &self,
        ctx: &CalcContext<'_>,
        request: &ProfileRequest,
    ) -> Result<Profile, CalcError> {
        profile::build(self, ctx, request)
    }

    /// The full financial and status picture, through the cache when there
    /// is one.
    fn profile(
        &self,
        ctx: &CalcContext<'_>,
        request: &ProfileRequest,
    ) -> Result<Profile, CalcError> {
        self.profile_with(ctx, request, CacheMode::Reuse)
    }

    fn profile_with(
        &self,
        ctx: &CalcContext<'_>,
        request: &ProfileRequest,
        mode: CacheMode,
    ) -> Result<Profile, CalcError> {
        let call = CachedCall::Profile {
            subject: self.subject(),
            start: request.start,
            end: request.end,
            freq: request.freq,
            calculation_start: request.calculation_start,
        };
        ctx.cached(call, mode, || self.compute_profile(ctx, request))
    }
}
