use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{CalcContext, Managers, PeopleFilter, Spend};
use crate::attribution::RatePart;
use crate::calendar::{DateWindow, financial_year};
use crate::costs::{CostFilter, CostKind, CostLine, total_between};
use crate::error::CalcError;
use crate::model::{Area, Budget, Link, PhaseDates, Status, Subject, WorkItem};

impl WorkItem {
    fn priced_tasks(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
        filter: PeopleFilter,
        part: RatePart<'_>,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Decimal, CalcError> {
        let pricing = ctx.pricing();
        let mut spent = Decimal::ZERO;
        for task in self.tasks.iter().filter(|t| t.is_active_in(window)) {
            let person = ctx.snapshot.person(task.person_id)?;
            if filter.matches(person) {
                spent += task.cost(&pricing, person, window, part, calculation_start)?;
            }
        }
        Ok(spent)
    }

    /// Non-salary people costs in `window`, optionally only those called
    /// `name`. Counts contractors and non-contractors alike.
    pub fn people_additional_costs(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
        name: Option<&str>,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Decimal, CalcError> {
        let part = match name {
            Some(name) => RatePart::Named(name),
            None => RatePart::Additional,
        };
        self.priced_tasks(ctx, window, PeopleFilter::All, part, calculation_start)
    }

    /// Non-contractor costs less every non-salary people cost.
    pub fn non_contractor_salary_costs(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Decimal, CalcError> {
        let non_contractor =
            self.people_costs(ctx, window, PeopleFilter::NonContractorOnly, calculation_start)?;
        Ok(non_contractor - self.people_additional_costs(ctx, window, None, calculation_start)?)
    }

    /// Total spent from `start` up to the day before `end`. `None` unless
    /// both dates are set.
    fn cost_of_stage(
        &self,
        ctx: &CalcContext<'_>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Option<Decimal>, CalcError> {
        let (Some(start), Some(end)) = (start, end) else {
            return Ok(None);
        };
        let window = DateWindow::new(start, end - Duration::days(1));
        Ok(Some(self.stats_between(ctx, window, calculation_start)?.total))
    }

    pub fn cost_of_discovery(
        &self,
        ctx: &CalcContext<'_>,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Option<Decimal>, CalcError> {
        let phases = &self.phases;
        self.cost_of_stage(ctx, phases.discovery_date, phases.alpha_date, calculation_start)
    }

    pub fn cost_of_alpha(
        &self,
        ctx: &CalcContext<'_>,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Option<Decimal>, CalcError> {
        self.cost_of_stage(ctx, self.phases.alpha_date, self.phases.beta_date, calculation_start)
    }

    pub fn cost_of_beta(
        &self,
        ctx: &CalcContext<'_>,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Option<Decimal>, CalcError> {
        self.cost_of_stage(ctx, self.phases.beta_date, self.phases.live_date, calculation_start)
    }

    /// Total spent in the UK financial year starting in April of `year`.
    pub fn cost_in_financial_year(
        &self,
        ctx: &CalcContext<'_>,
        year: i32,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Decimal, CalcError> {
        let (start, end) = financial_year(year);
        Ok(self
            .stats_between(ctx, DateWindow::new(start, end), calculation_start)?
            .total)
    }

    fn since_live(&self, ctx: &CalcContext<'_>) -> Option<DateWindow> {
        self.phases
            .live_date
            .map(|live| DateWindow::new(live, ctx.today))
    }

    /// People costs plus one-off costs since going live. `None` before then.
    pub fn cost_of_sustaining(
        &self,
        ctx: &CalcContext<'_>,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Option<Decimal>, CalcError> {
        let Some(window) = self.since_live(ctx) else {
            return Ok(None);
        };
        let people = self.people_costs(ctx, window, PeopleFilter::All, calculation_start)?;
        let one_off = total_between(
            &self.costs,
            window,
            &CostFilter::all().of_kinds([CostKind::OneOff]),
            ctx.today,
        );
        Ok(Some(people + one_off))
    }

    /// Monthly and annual costs accrued since going live.
    pub fn total_recurring_costs(&self, ctx: &CalcContext<'_>) -> Option<Decimal> {
        let window = self.since_live(ctx)?;
        let recurring = CostFilter::all().of_kinds([CostKind::Monthly, CostKind::Annual]);
        Some(total_between(&self.costs, window, &recurring, ctx.today))
    }

    /// Savings from the first date to today.
    pub fn savings_enabled(&self, ctx: &CalcContext<'_>) -> Result<Option<Decimal>, CalcError> {
        match super::or_no_data(self.first_date(ctx))? {
            Some(first) => Ok(Some(self.savings_between(ctx, DateWindow::new(first, ctx.today))?)),
            None => Ok(None),
        }
    }

    pub fn discovery_fte(&self, ctx: &CalcContext<'_>) -> Result<Decimal, CalcError> {
        self.current_fte(ctx, self.phases.discovery_date, self.phases.alpha_date)
    }

    pub fn alpha_fte(&self, ctx: &CalcContext<'_>) -> Result<Decimal, CalcError> {
        self.current_fte(ctx, self.phases.alpha_date, self.phases.beta_date)
    }

    pub fn beta_fte(&self, ctx: &CalcContext<'_>) -> Result<Decimal, CalcError> {
        self.current_fte(ctx, self.phases.beta_date, self.phases.live_date)
    }

    pub fn live_fte(&self, ctx: &CalcContext<'_>) -> Result<Decimal, CalcError> {
        self.current_fte(ctx, self.phases.live_date, self.phases.end_date)
    }
}

impl Spend for WorkItem {
    fn subject(&self) -> Subject {
        Subject::WorkItem(self.id)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "WorkItem"
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

    fn first_date(&self, _ctx: &CalcContext<'_>) -> Result<NaiveDate, CalcError> {
        let tasks = self.tasks.iter().map(|t| t.start_date);
        let budgets = self.budgets.iter().map(|b| b.start_date);
        let costs = self.costs.iter().map(|c| c.start_date);

        tasks
            .chain(budgets)
            .chain(costs)
            .chain(self.phases.discovery_date)
            .min()
            .ok_or_else(|| CalcError::no_data(format!("work item \"{}\"", self.name)))
    }

    fn last_date(&self, _ctx: &CalcContext<'_>) -> Result<NaiveDate, CalcError> {
        let tasks = self.tasks.iter().map(|t| t.effective_end_date());
        let budgets = self.budgets.iter().map(|b| b.start_date);
        let costs = self
            .costs
            .iter()
            .map(|c| c.end_date.map_or(c.start_date, |end| end.max(c.start_date)));

        tasks
            .chain(budgets)
            .chain(costs)
            .chain(self.phases.end_date)
            .max()
            .ok_or_else(|| CalcError::no_data(format!("work item \"{}\"", self.name)))
    }

    fn budget(&self, _ctx: &CalcContext<'_>, on: NaiveDate) -> Result<Decimal, CalcError> {
        Ok(self
            .budgets
            .iter()
            .filter(|b| b.start_date <= on)
            .max_by_key(|b| b.start_date)
            .map(|b| b.amount)
            .unwrap_or_default())
    }

    fn budget_changes(&self, _ctx: &CalcContext<'_>) -> Result<Vec<Budget>, CalcError> {
        Ok(self.budgets.clone())
    }

    fn people_costs(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
        filter: PeopleFilter,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Decimal, CalcError> {
        self.priced_tasks(ctx, window, filter, RatePart::Full, calculation_start)
    }

    fn additional_costs(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
    ) -> Result<Decimal, CalcError> {
        Ok(total_between(&self.costs, window, &CostFilter::all(), ctx.today))
    }

    fn savings_between(
        &self,
        ctx: &CalcContext<'_>,
        window: DateWindow,
    ) -> Result<Decimal, CalcError> {
        Ok(total_between(&self.savings, window, &CostFilter::all(), ctx.today))
    }

    fn time_spent(&self, ctx: &CalcContext<'_>, window: DateWindow) -> Result<Decimal, CalcError> {
        Ok(self
            .tasks
            .iter()
            .map(|task| task.time_spent(ctx.calendar, window))
            .sum())
    }

    fn area<'c>(&self, ctx: &CalcContext<'c>) -> Result<Option<&'c Area>, CalcError> {
        self.area_id.map(|id| ctx.snapshot.area(id)).transpose()
    }

    fn links(&self, _ctx: &CalcContext<'_>) -> Result<Vec<Link>, CalcError> {
        Ok(self.links.clone())
    }

    fn managers(&self, ctx: &CalcContext<'_>) -> Result<Managers, CalcError> {
        let name = |id: Option<Uuid>| -> Result<Option<String>, CalcError> {
            id.map(|id| ctx.snapshot.person(id).map(|p| p.name.clone()))
                .transpose()
        };
        let service_manager = self.area(ctx)?.and_then(|area| area.manager_id);
        Ok(Managers {
            product_manager: name(self.product_manager_id)?,
            delivery_manager: name(self.delivery_manager_id)?,
            service_manager: name(service_manager)?,
        })
    }

    fn cost_lines(&self, _ctx: &CalcContext<'_>) -> Result<Vec<CostLine>, CalcError> {
        Ok(self.costs.clone())
    }

    fn saving_lines(&self, _ctx: &CalcContext<'_>) -> Result<Vec<CostLine>, CalcError> {
        Ok(self.savings.clone())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use rust_decimal_macros::dec;

    use crate::calendar::test_support::date;
    use crate::costs::{CostKind, CostLine};
    use crate::model::{Budget, Person, PhaseDates, Snapshot, Task, WorkItem};
    use crate::rates::Rate;

    /// A contractor for ten days in late May 2016 (4000) and a civil servant
    /// for half of June 2016 (3300), with hosting, a one-off and a saving.
    pub(crate) fn booking(contractor: &Person, civil_servant: &Person) -> WorkItem {
        let mut item = WorkItem::new("Booking");
        item.phases = PhaseDates {
            discovery_date: Some(date(2016, 5, 1)),
            alpha_date: Some(date(2016, 6, 1)),
            end_date: Some(date(2016, 6, 30)),
            ..PhaseDates::default()
        };
        item.tasks = vec![
            Task::new(contractor.id, date(2016, 5, 17), date(2016, 5, 31), dec!(10)),
            Task::new(civil_servant.id, date(2016, 6, 1), date(2016, 6, 30), dec!(11)),
        ];
        item.costs = vec![
            CostLine::new(CostKind::Monthly, dec!(100), date(2016, 5, 1))
                .named("hosting")
                .ending(date(2016, 6, 30)),
            CostLine::new(CostKind::OneOff, dec!(1000), date(2016, 6, 15)).named("setup"),
        ];
        item.savings = vec![CostLine::new(CostKind::OneOff, dec!(500), date(2016, 6, 20))];
        item.budgets = vec![
            Budget {
                start_date: date(2016, 5, 1),
                amount: dec!(10000),
                note: None,
            },
            Budget {
                start_date: date(2016, 6, 15),
                amount: dec!(8000),
                note: None,
            },
        ];
        item
    }

    pub(crate) fn people() -> (Person, Person) {
        (
            Person::new("Grace", true).with_rate(Rate::daily(dec!(400), date(2016, 1, 1))),
            Person::new("Ada", false).with_rate(Rate::daily(dec!(300), date(2016, 1, 1))),
        )
    }

    pub(crate) fn snapshot() -> (Snapshot, WorkItem) {
        let (grace, ada) = people();
        let item = booking(&grace, &ada);
        let snapshot = Snapshot::new()
            .with_person(grace)
            .with_person(ada)
            .with_work_item(item.clone());
        (snapshot, item)
    }
}
