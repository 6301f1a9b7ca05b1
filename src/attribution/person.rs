use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::Pricing;
use crate::calendar::{DateWindow, last_day_of_month};
use crate::costs::{CostFilter, CostKind, CostLine, costs_between};
use crate::error::CalcError;
use crate::model::Person;

impl Person {
    /// Average salary day rate over `window`, zero when no rate covers it.
    pub fn base_rate_between(&self, pricing: &Pricing<'_>, window: DateWindow) -> Decimal {
        self.schedule()
            .rate_between(pricing.calendar, window)
            .unwrap_or_default()
    }

    /// Salary day rate on `on`, zero when no rate is in force.
    pub fn base_rate_on(&self, pricing: &Pricing<'_>, on: NaiveDate) -> Decimal {
        self.schedule()
            .rate_on(pricing.calendar, on)
            .unwrap_or_default()
    }

    /// Day rate of non-salary costs over `window`, optionally only those
    /// called `name`.
    ///
    /// Payroll figures land after the month they cover. When a non-contractor
    /// has no cost rows in `window`, the monthly costs of the month their
    /// current rate started in (the rate in force on `predict_based_on`, or
    /// today) stand in for them.
    pub fn additional_rate(
        &self,
        pricing: &Pricing<'_>,
        window: DateWindow,
        name: Option<&str>,
        predict_based_on: Option<NaiveDate>,
    ) -> Result<Decimal, CalcError> {
        let filter = match name {
            Some(name) => CostFilter::named(name),
            None => CostFilter::all(),
        };

        let mut window = window;
        let mut basis: Vec<&CostLine> = costs_between(&self.costs, window, &filter).collect();

        if !self.is_contractor && basis.is_empty() {
            let reference = predict_based_on.unwrap_or(pricing.today);
            if let Some(rate) = self.schedule().on(reference) {
                let from = rate.effective_from;
                window = DateWindow::new(from, last_day_of_month(from));
                let monthly = filter.of_kinds([CostKind::Monthly]);
                basis = costs_between(&self.costs, window, &monthly).collect();
                tracing::debug!(
                    "Predicting costs for {} from {} ({} rows)",
                    self.name,
                    window,
                    basis.len()
                );
            }
        }

        if basis.is_empty() {
            return Ok(Decimal::ZERO);
        }

        // Costs without an end run on, so only clip when every one has ended.
        if basis.iter().all(|c| c.end_date.is_some()) {
            if let Some(last) = basis.iter().max_by_key(|c| c.end_date) {
                if let Some(end) = last.end_date {
                    if end <= window.end {
                        window.end = end;
                    }
                    if end <= window.start {
                        window.start = last.start_date;
                    }
                }
            }
        }

        basis
            .iter()
            .try_fold(Decimal::ZERO, |sum, cost| {
                Ok(sum + cost.rate_between(pricing.calendar, window)?)
            })
    }

    /// Full day rate over `window`: salary plus non-salary costs. Zero when
    /// there is no salary rate.
    pub fn rate_between(
        &self,
        pricing: &Pricing<'_>,
        window: DateWindow,
    ) -> Result<Decimal, CalcError> {
        let base = self.base_rate_between(pricing, window);
        if base.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(base + self.additional_rate(pricing, window, None, None)?)
    }

    /// Full day rate on `on`.
    pub fn rate_on(&self, pricing: &Pricing<'_>, on: NaiveDate) -> Result<Decimal, CalcError> {
        let base = self.base_rate_on(pricing, on);
        if base.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(base + self.additional_rate(pricing, DateWindow::day(on), None, None)?)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calendar::WorkCalendar;
    use crate::calendar::test_support::{date, uk_calendar};
    use crate::rates::Rate;

    fn window(start: NaiveDate, end: NaiveDate) -> DateWindow {
        DateWindow::new(start, end)
    }

    #[test]
    fn test_rates_with_an_annual_cost() {
        let cal = uk_calendar();
        let pricing = Pricing::new(&cal, date(2017, 6, 1));
        let person = Person::new("Ada", false)
            .with_rate(Rate::daily(dec!(1), date(2015, 1, 1)))
            .with_cost(
                CostLine::new(CostKind::Annual, dec!(30000), date(2015, 1, 1)).named("ASLC"),
            );
        let jan = window(date(2015, 1, 1), date(2015, 1, 2));

        assert_eq!(person.base_rate_between(&pricing, jan), dec!(1));
        assert_eq!(
            person.additional_rate(&pricing, jan, None, None).unwrap().round_dp(2),
            dec!(118.58)
        );
        assert_eq!(
            person
                .additional_rate(&pricing, jan, Some("ASLC"), None)
                .unwrap()
                .round_dp(2),
            dec!(118.58)
        );
        assert_eq!(person.rate_between(&pricing, jan).unwrap().round_dp(2), dec!(119.58));
    }

    #[test]
    fn test_no_base_rate_means_no_rate() {
        let cal = uk_calendar();
        let pricing = Pricing::new(&cal, date(2017, 6, 1));
        let person = Person::new("Ada", false)
            .with_cost(CostLine::new(CostKind::Monthly, dec!(500), date(2015, 1, 1)));

        let jan = window(date(2015, 1, 1), date(2015, 1, 30));
        assert_eq!(person.rate_between(&pricing, jan).unwrap(), Decimal::ZERO);
        assert_eq!(person.rate_on(&pricing, date(2015, 1, 5)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_rate_on() {
        let cal = WorkCalendar::weekends_only();
        let pricing = Pricing::new(&cal, date(2017, 6, 1));
        let person = Person::new("Ada", true).with_rate(Rate::daily(dec!(350), date(2016, 1, 1)));

        assert_eq!(person.base_rate_on(&pricing, date(2015, 12, 31)), Decimal::ZERO);
        assert_eq!(person.rate_on(&pricing, date(2016, 1, 4)).unwrap(), dec!(350));
    }

    #[test]
    fn test_contractors_never_predict() {
        let cal = uk_calendar();
        let pricing = Pricing::new(&cal, date(2015, 6, 10));
        let person = Person::new("Grace", true)
            .with_rate(Rate::daily(dec!(500), date(2015, 5, 1)))
            .with_cost(
                CostLine::new(CostKind::Monthly, dec!(950), date(2015, 5, 1))
                    .ending(date(2015, 5, 31)),
            );

        let june = window(date(2015, 6, 1), date(2015, 6, 30));
        assert_eq!(person.additional_rate(&pricing, june, None, None).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_cost_prediction() {
        let cal = uk_calendar();
        let pricing = Pricing::new(&cal, date(2017, 6, 1));
        let person = Person::new("Ada", false)
            .with_rate(Rate::monthly(dec!(2000), date(2015, 5, 1)))
            .with_cost(
                CostLine::new(CostKind::Monthly, dec!(950), date(2015, 5, 1))
                    .named("ASLC")
                    .ending(date(2015, 5, 31)),
            );

        // May 2015 has 19 working days, so the cost is 50 a day whichever
        // window is asked for
        let windows = [
            (date(2015, 5, 1), date(2015, 5, 1)),
            (date(2015, 5, 1), date(2015, 5, 15)),
            (date(2015, 5, 1), date(2015, 5, 31)),
            (date(2015, 5, 1), date(2015, 6, 1)),
            (date(2015, 5, 1), date(2015, 6, 15)),
            (date(2015, 5, 1), date(2015, 6, 30)),
            (date(2015, 5, 15), date(2015, 6, 15)),
            (date(2015, 5, 31), date(2015, 6, 30)),
            (date(2015, 5, 31), date(2015, 6, 1)),
            (date(2015, 6, 1), date(2015, 6, 1)),
            (date(2015, 6, 1), date(2015, 6, 15)),
            (date(2015, 6, 1), date(2015, 6, 30)),
        ];
        for (start, end) in windows {
            let rate = person
                .additional_rate(&pricing, window(start, end), None, Some(date(2015, 5, 31)))
                .unwrap();
            assert_eq!(rate, dec!(50), "{} to {}", start, end);
        }
    }
}
