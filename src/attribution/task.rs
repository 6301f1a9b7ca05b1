use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{Pricing, RatePart};
use crate::calendar::{DateWindow, WorkCalendar};
use crate::error::CalcError;
use crate::model::{Person, Task};

impl Task {
    /// Days of effort spent inside `window`.
    ///
    /// Effort is spread evenly over the working days of each occurrence. An
    /// occurrence wholly inside the window counts its full allocation.
    pub fn time_spent(&self, calendar: &WorkCalendar, window: DateWindow) -> Decimal {
        let task_workdays = calendar.workdays_in(self.span());
        if task_workdays == 0 || window.is_empty() {
            return Decimal::ZERO;
        }

        self.occurrences()
            .into_iter()
            .filter_map(|occurrence| {
                occurrence
                    .overlap(&window)
                    .map(|part| self.days_in(calendar, occurrence, part, task_workdays))
            })
            .sum()
    }

    /// Money spent inside `window`: the person's day rate over each covered
    /// part times the days spent in it.
    ///
    /// `part` picks which share of the day rate is priced. Spend before
    /// `calculation_start` is ignored. Monthly repeating tasks cost nothing.
    pub fn cost(
        &self,
        pricing: &Pricing<'_>,
        person: &Person,
        window: DateWindow,
        part_of_rate: RatePart<'_>,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Decimal, CalcError> {
        if self.repeats_monthly() {
            return Ok(Decimal::ZERO);
        }

        let mut window = window;
        if let Some(start) = calculation_start {
            window.start = window.start.max(start);
        }

        let task_workdays = pricing.calendar.workdays_in(self.span());
        if task_workdays == 0 || window.is_empty() {
            return Ok(Decimal::ZERO);
        }

        let mut spent = Decimal::ZERO;
        for occurrence in self.occurrences() {
            let Some(covered) = occurrence.overlap(&window) else {
                continue;
            };
            let rate = match part_of_rate {
                RatePart::Full => person.rate_between(pricing, covered)?,
                RatePart::Additional => person.additional_rate(pricing, covered, None, None)?,
                RatePart::Named(name) => {
                    person.additional_rate(pricing, covered, Some(name), None)?
                }
            };
            if rate.is_zero() {
                continue;
            }
            spent += rate * self.days_in(pricing.calendar, occurrence, covered, task_workdays);
        }
        Ok(spent)
    }

    fn days_in(
        &self,
        calendar: &WorkCalendar,
        occurrence: DateWindow,
        part: DateWindow,
        task_workdays: u32,
    ) -> Decimal {
        if part == occurrence {
            return self.allocated_days;
        }
        let part_workdays = Decimal::from(calendar.workdays_in(part));
        part_workdays * self.allocated_days / Decimal::from(task_workdays)
    }
}
