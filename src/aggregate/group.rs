use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{CalcContext, PeopleFilter, Spend, Stats, or_no_data};
use crate::calendar::DateWindow;
use crate::costs::CostLine;
use crate::error::CalcError;
use crate::model::{Area, Budget, Link, PhaseDates, Status, Subject, WorkItem, WorkItemGroup};

impl WorkItemGroup {
    fn members<'c>(&self, ctx: &CalcContext<'c>) -> Result<Vec<&'c WorkItem>, CalcError> {
        ctx.snapshot.visible_members(self)
    }

    /// Sum of `f` over visible members.
    fn sum_members<F>(&self, ctx: &CalcContext<'_>, f: F) -> Result<Decimal, CalcError>
    where
        F: Fn(&WorkItem) -> Result<Decimal, CalcError>,
    {
        self.members(ctx)?
            .into_iter()
            .try_fold(Decimal::ZERO, |sum, member| Ok(sum + f(member)?))
    }

    fn collect_members<T, F>(&self, ctx: &CalcContext<'_>, f: F) -> Result<Vec<T>, CalcError>
    where
        F: Fn(&WorkItem) -> &[T],
        T: Clone,
    {
        Ok(self
            .members(ctx)?
            .into_iter()
            .flat_map(|member| f(member).iter().cloned())
            .collect())
    }

    fn no_data(&self) -> CalcError {
        CalcError::no_data(format!("work item group \"{}\"", self.name))
    }
}

impl Spend for WorkItemGroup {
    fn subject(&self) -> Subject {
        Subject::Group(self.id)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "WorkItemGroup"
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn phases(&self) -> &PhaseDates {
        &self.phases
    }

    fn statuses(&self) -> &[Status] {
        &self.statuses
    }

    /// Earliest member first date. Members without dates are skipped.
    fn first_date(&self, ctx: &CalcContext<'_>) -> Result<NaiveDate, CalcError> {
        let mut first = None;
        for member in self.members(ctx)? {
            if let Some(date) = or_no_data(member.first_date(ctx))? {
                first = Some(first.map_or(date, |f: NaiveDate| f.min(date)));
            }
        }
        first.ok_or_else(|| self.no_data())
    }

    fn last_date(&self, ctx: &CalcContext<'_>) -> Result<NaiveDate, CalcError> {
        let mut last = None;
        for member in self.members(ctx)? {
            if let Some(date) = or_no_data(member.last_date(ctx))? {
                last = Some(last.map_or(date, |l: NaiveDate| l.max(date)));
            }
        }
        last.ok_or_else(|| self.no_data())
    }

    fn budget(&self, ctx: &CalcContext<'_>, on: NaiveDate) -> Result<Decimal, CalcError> {
        self.sum_members(ctx, |member| member.budget(ctx, on))
    }

    fn budget_changes(&self, ctx: &CalcContext<'_>) -> Result<Vec<Budget>, CalcError> {
        self.collect_members(ctx, |member| member.budgets.as_slice())
    }

    fn people_costs(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
        filter: PeopleFilter,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Decimal, CalcError> {
        self.sum_members(ctx, |member| member.people_costs(ctx, window, filter, calculation_start))
    }

    fn additional_costs(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
    ) -> Result<Decimal, CalcError> {
        self.sum_members(ctx, |member| member.additional_costs(ctx, window))
    }

    fn savings_between(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
    ) -> Result<Decimal, CalcError> {
        self.sum_members(ctx, |member| member.savings_between(ctx, window))
    }

    fn time_spent(&self, ctx: &CalcContext<'_>, window: DateWindow) -> Result<Decimal, CalcError> {
        self.sum_members(ctx, |member| member.time_spent(ctx, window))
    }

    /// The members' area when they all agree on one.
    fn area<'c>(&self, ctx: &CalcContext<'c>) -> Result<Option<&'c Area>, CalcError> {
        let mut areas: BTreeMap<Uuid, &'c Area> = BTreeMap::new();
        for member in self.members(ctx)? {
            if let Some(area) = member.area(ctx)? {
                areas.insert(area.id, area);
            }
        }
        if areas.len() != 1 {
            return Ok(None);
        }
        Ok(areas.into_values().next())
    }

    fn links(&self, ctx: &CalcContext<'_>) -> Result<Vec<Link>, CalcError> {
        self.collect_members(ctx, |member| member.links.as_slice())
    }

    fn cost_lines(&self, ctx: &CalcContext<'_>) -> Result<Vec<CostLine>, CalcError> {
        self.collect_members(ctx, |member| member.costs.as_slice())
    }

    fn saving_lines(&self, ctx: &CalcContext<'_>) -> Result<Vec<CostLine>, CalcError> {
        self.collect_members(ctx, |member| member.savings.as_slice())
    }

    fn compute_stats_between(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Stats, CalcError> {
        let mut stats = Stats::zero();
        for member in self.members(ctx)? {
            stats += member.stats_between(ctx, window, calculation_start)?;
        }
        Ok(stats)
    }

    fn cost_to_date(
        &self,
        ctx: &CalcContext<'_>,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Decimal, CalcError> {
        self.sum_members(ctx, |member| member.cost_to_date(ctx, calculation_start))
    }

    fn total_cost(
        &self,
        ctx: &CalcContext<'_>,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Decimal, CalcError> {
        self.sum_members(ctx, |member| member.total_cost(ctx, calculation_start))
    }

    fn final_budget(&self, ctx: &CalcContext<'_>) -> Result<Decimal, CalcError> {
        self.sum_members(ctx, |member| member.final_budget(ctx))
    }

    fn compute_current_fte(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
    ) -> Result<Decimal, CalcError> {
        self.sum_members(ctx, |member| {
            member.current_fte(ctx, Some(window.start), Some(window.end))
        })
    }
}
