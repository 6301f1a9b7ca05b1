//! Day-rate normalisation.
//!
//! Salaries are quoted per day, month or year. Monthly and yearly amounts are
//! spread over the working days of the calendar period they are paid for, so
//! the day rate of a monthly salary differs from month to month.

mod schedule;

pub use schedule::{RateInterval, RateSchedule};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar::{DateWindow, WorkCalendar, first_day_of_month, last_day_of_month};

/// Period a rate is quoted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    #[default]
    Day,
    Month,
    Year,
}

impl Cadence {
    /// The calendar period containing `day`.
    pub fn period(&self, day: NaiveDate) -> DateWindow {
        match self {
            Cadence::Day => DateWindow::day(day),
            Cadence::Month => DateWindow::new(first_day_of_month(day), last_day_of_month(day)),
            Cadence::Year => {
                let start = day.with_ordinal(1).unwrap_or(day);
                let end = NaiveDate::from_ymd_opt(day.year(), 12, 31).unwrap_or(day);
                DateWindow::new(start, end)
            }
        }
    }
}

/// A salary valid from `effective_from` until superseded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    pub amount: Decimal,
    #[serde(default)]
    pub cadence: Cadence,
    pub effective_from: NaiveDate,
}

/// A sub-window priced at a single (unrounded) day rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSegment {
    pub window: DateWindow,
    pub rate: Decimal,
}

impl Rate {
    pub fn new(amount: Decimal, cadence: Cadence, effective_from: NaiveDate) -> Self {
        Self {
            amount,
            cadence,
            effective_from,
        }
    }

    pub fn daily(amount: Decimal, effective_from: NaiveDate) -> Self {
        Self::new(amount, Cadence::Day, effective_from)
    }

    pub fn monthly(amount: Decimal, effective_from: NaiveDate) -> Self {
        Self::new(amount, Cadence::Month, effective_from)
    }

    pub fn yearly(amount: Decimal, effective_from: NaiveDate) -> Self {
        Self::new(amount, Cadence::Year, effective_from)
    }

    /// Day rate on a single date, rounded to pence.
    pub fn rate_on(&self, calendar: &WorkCalendar, on: NaiveDate) -> Decimal {
        if self.cadence == Cadence::Day {
            return self.amount;
        }
        self.period_rate(calendar, self.cadence.period(on)).round_dp(2)
    }

    /// Average day rate over `window`, rounded to pence.
    ///
    /// Each month (or year) the window touches contributes its own day rate,
    /// weighted by the working days the window shares with it. A window
    /// without working days has a rate of zero.
    pub fn rate_between(&self, calendar: &WorkCalendar, window: DateWindow) -> Decimal {
        if self.cadence == Cadence::Day {
            return self.amount;
        }
        if window.start == window.end {
            return self.rate_on(calendar, window.start);
        }

        average_rate_from_segments(calendar, &self.segments(calendar, window)).unwrap_or_default()
    }

    /// Split `window` on period boundaries, each part carrying the day rate
    /// of its whole period.
    pub fn segments(&self, calendar: &WorkCalendar, window: DateWindow) -> Vec<RateSegment> {
        let mut segments = Vec::new();
        if window.is_empty() {
            return segments;
        }

        let mut period = self.cadence.period(window.start);
        loop {
            if let Some(part) = period.overlap(&window) {
                segments.push(RateSegment {
                    window: part,
                    rate: self.period_rate(calendar, period),
                });
            }
            match period.end.succ_opt() {
                Some(next) if next <= window.end => period = self.cadence.period(next),
                _ => break,
            }
        }
        segments
    }

    fn period_rate(&self, calendar: &WorkCalendar, period: DateWindow) -> Decimal {
        match calendar.workdays_in(period) {
            0 => Decimal::ZERO,
            workdays => self.amount / Decimal::from(workdays),
        }
    }
}

/// Working-day weighted average of segment rates, rounded to pence.
///
/// Segments without working days carry no weight. Returns `None` when no
/// segment has any.
pub fn average_rate_from_segments(
    calendar: &WorkCalendar,
    segments: &[RateSegment],
) -> Option<Decimal> {
    let mut weighted = Decimal::ZERO;
    let mut total_workdays = 0u32;

    for segment in segments {
        let workdays = calendar.workdays_in(segment.window);
        if workdays == 0 {
            continue;
        }
        weighted += segment.rate * Decimal::from(workdays);
        total_workdays += workdays;
    }

    if total_workdays == 0 {
        return None;
    }
    Some((weighted / Decimal::from(total_workdays)).round_dp(2))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calendar::test_support::{date, uk_calendar};

    fn window(start: NaiveDate, end: NaiveDate) -> DateWindow {
        DateWindow::new(start, end)
    }

    #[test]
    fn test_daily_rate_is_unchanged() {
        let cal = uk_calendar();
        let rate = Rate::daily(dec!(400), date(2015, 1, 1));
        assert_eq!(rate.rate_on(&cal, date(2016, 1, 5)), dec!(400));
        assert_eq!(
            rate.rate_between(&cal, window(date(2016, 1, 1), date(2016, 6, 30))),
            dec!(400)
        );
    }

    #[test]
    fn test_monthly_rate_on() {
        let cal = uk_calendar();
        let rate = Rate::monthly(dec!(4600), date(2015, 1, 1));
        // January 2016 has 20 working days, February 21
        assert_eq!(rate.rate_on(&cal, date(2016, 1, 15)), dec!(230));
        assert_eq!(rate.rate_on(&cal, date(2016, 2, 15)), dec!(219.05));
    }

    #[test]
    fn test_yearly_rate_on() {
        let cal = uk_calendar();
        let rate = Rate::yearly(dec!(60000), date(2015, 1, 1));
        // 253 working days in 2016
        assert_eq!(rate.rate_on(&cal, date(2016, 7, 1)), dec!(237.15));
    }

    #[test]
    fn test_single_day_window_uses_rate_on() {
        let cal = uk_calendar();
        let rate = Rate::monthly(dec!(4600), date(2015, 1, 1));
        let day = date(2016, 2, 3);
        assert_eq!(rate.rate_between(&cal, DateWindow::day(day)), rate.rate_on(&cal, day));
    }

    #[test]
    fn test_rate_between_within_one_month() {
        let cal = uk_calendar();
        let rate = Rate::monthly(dec!(4600), date(2015, 1, 1));
        assert_eq!(
            rate.rate_between(&cal, window(date(2016, 1, 4), date(2016, 1, 29))),
            dec!(230)
        );
    }

    #[test]
    fn test_rate_between_across_months() {
        let cal = uk_calendar();
        let rate = Rate::monthly(dec!(4600), date(2015, 1, 1));
        // 2 days at 230, 3 days at 4600 / 21
        assert_eq!(
            rate.rate_between(&cal, window(date(2016, 1, 28), date(2016, 2, 3))),
            dec!(223.43)
        );
        assert_eq!(
            rate.rate_between(&cal, window(date(2016, 1, 28), date(2016, 2, 2))),
            dec!(224.52)
        );
    }

    #[test]
    fn test_rate_between_weights_whole_months_by_their_own_days() {
        let cal = uk_calendar();
        let rate = Rate::monthly(dec!(4600), date(2015, 1, 1));
        let segments = rate.segments(&cal, window(date(2016, 1, 28), date(2016, 6, 3)));
        assert_eq!(segments.len(), 6);
        assert_eq!(segments[1].window, window(date(2016, 2, 1), date(2016, 2, 29)));
        assert_eq!(segments[5].window, window(date(2016, 6, 1), date(2016, 6, 3)));

        assert_eq!(
            rate.rate_between(&cal, window(date(2016, 1, 28), date(2016, 6, 3))),
            dec!(221.45)
        );
    }

    #[test]
    fn test_rate_between_without_workdays() {
        let cal = uk_calendar();
        let rate = Rate::monthly(dec!(4600), date(2015, 1, 1));
        // a weekend
        assert_eq!(
            rate.rate_between(&cal, window(date(2016, 1, 30), date(2016, 1, 31))),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_rate_between_is_continuous_across_adjacent_windows() {
        let cal = uk_calendar();
        let rate = Rate::monthly(dec!(4600), date(2015, 1, 1));
        let left = window(date(2016, 1, 11), date(2016, 2, 9));
        let right = window(date(2016, 2, 10), date(2016, 4, 22));
        let union = window(left.start, right.end);

        let weighted = rate.rate_between(&cal, left) * Decimal::from(cal.workdays_in(left))
            + rate.rate_between(&cal, right) * Decimal::from(cal.workdays_in(right));
        let combined = weighted / Decimal::from(cal.workdays_in(union));

        assert!((combined - rate.rate_between(&cal, union)).abs() <= dec!(0.01));
    }

    #[test]
    fn test_yearly_segments_split_on_new_year() {
        let cal = uk_calendar();
        let rate = Rate::yearly(dec!(60000), date(2015, 1, 1));
        let segments = rate.segments(&cal, window(date(2015, 12, 1), date(2016, 1, 31)));
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].window, window(date(2015, 12, 1), date(2015, 12, 31)));
        assert_eq!(segments[1].rate, dec!(60000) / dec!(253));
    }

    #[test]
    fn test_average_of_no_segments() {
        let cal = uk_calendar();
        assert_eq!(average_rate_from_segments(&cal, &[]), None);
    }

    #[test]
    fn test_cadence_deserializes_lowercase() {
        let json = r#"{"amount": "4600", "cadence": "month", "effective_from": "2016-01-01"}"#;
        let rate: Rate = serde_json::from_str(json).unwrap();
        assert_eq!(rate.cadence, Cadence::Month);
        assert_eq!(rate.amount, dec!(4600));
    }
}
