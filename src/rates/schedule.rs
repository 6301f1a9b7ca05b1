//! Validity intervals for a person's rates.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{Rate, RateSegment, average_rate_from_segments};
use crate::calendar::{DateWindow, WorkCalendar};

/// A rate together with the dates it applies to. `until` is inclusive and
/// open-ended for the latest rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateInterval<'a> {
    pub rate: &'a Rate,
    pub from: NaiveDate,
    pub until: Option<NaiveDate>,
}

impl RateInterval<'_> {
    fn window_within(&self, window: DateWindow) -> Option<DateWindow> {
        let until = self.until.unwrap_or(window.end);
        DateWindow::new(self.from, until).overlap(&window)
    }
}

/// Rates sorted by `effective_from`, each ending the day before the next.
#[derive(Debug, Clone, Default)]
pub struct RateSchedule<'a> {
    intervals: Vec<RateInterval<'a>>,
}

impl<'a> RateSchedule<'a> {
    pub fn new(rates: &'a [Rate]) -> Self {
        let mut sorted: Vec<&Rate> = rates.iter().collect();
        sorted.sort_by_key(|r| r.effective_from);

        let intervals = sorted
            .iter()
            .enumerate()
            .map(|(i, &rate)| RateInterval {
                rate,
                from: rate.effective_from,
                until: sorted
                    .get(i + 1)
                    .and_then(|next| next.effective_from.pred_opt()),
            })
            .collect();

        Self { intervals }
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[RateInterval<'a>] {
        &self.intervals
    }

    /// The rate in force on `on`.
    pub fn on(&self, on: NaiveDate) -> Option<&'a Rate> {
        self.intervals
            .iter()
            .rev()
            .find(|interval| interval.from <= on)
            .map(|interval| interval.rate)
    }

    /// Per-rate parts of `window`, each priced at that rate's average over
    /// the part.
    ///
    /// Empty when no rate is in force at `window.start`.
    pub fn segments(&self, calendar: &WorkCalendar, window: DateWindow) -> Vec<RateSegment> {
        if window.is_empty() || self.on(window.start).is_none() {
            return Vec::new();
        }

        self.intervals
            .iter()
            .filter_map(|interval| {
                interval.window_within(window).map(|part| RateSegment {
                    window: part,
                    rate: interval.rate.rate_between(calendar, part),
                })
            })
            .collect()
    }

    /// Working-day weighted day rate over `window`, `None` when there is no
    /// rate for it.
    pub fn rate_between(&self, calendar: &WorkCalendar, window: DateWindow) -> Option<Decimal> {
        average_rate_from_segments(calendar, &self.segments(calendar, window))
    }

    /// Day rate on a single date.
    pub fn rate_on(&self, calendar: &WorkCalendar, on: NaiveDate) -> Option<Decimal> {
        self.on(on).map(|rate| rate.rate_on(calendar, on))
    }
}
