use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::Stats;
use crate::calendar::{DateWindow, Frequency, slice_time_window};
use crate::model::{Budget, PhaseDates};

/// Why a date is of interest on a dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyDateKind {
    #[serde(rename = "phase start")]
    PhaseStart,
    #[serde(rename = "new budget set")]
    NewBudget,
    #[serde(rename = "start of a time window")]
    WindowStart,
    #[serde(rename = "first day after rear time window")]
    AfterLastWindow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDate {
    pub name: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: KeyDateKind,
}

/// Cumulative statistics up to the start of a key date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDateStats {
    #[serde(flatten)]
    pub key_date: KeyDate,
    pub stats: Stats,
}

pub type KeyDates = BTreeMap<String, KeyDate>;

fn compact(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

fn insert(dates: &mut KeyDates, key: String, name: String, date: NaiveDate, kind: KeyDateKind) {
    dates.insert(key, KeyDate { name, date, kind });
}

/// Phase starts, today, and the day after the end date.
///
/// Keys are the name with spaces hyphenated plus the date, e.g.
/// `alpha-start-20160301`.
pub(crate) fn phase_dates(dates: &mut KeyDates, phases: &PhaseDates, today: NaiveDate) {
    // Ending "on" a date means at the end of that day.
    let after_end = phases.end_date.map(|end| end + Duration::days(1));
    let named = [
        ("discovery start", phases.discovery_date),
        ("alpha start", phases.alpha_date),
        ("beta start", phases.beta_date),
        ("live start", phases.live_date),
        ("today", Some(today)),
        ("end of day on end date", after_end),
    ];

    for (name, date) in named {
        if let Some(date) = date {
            let key = format!("{}-{}", name.replace(' ', "-"), compact(date));
            insert(dates, key, name.to_string(), date, KeyDateKind::PhaseStart);
        }
    }
}

pub(crate) fn budget_dates<'b>(
    dates: &mut KeyDates,
    budgets: impl IntoIterator<Item = &'b Budget>,
) {
    for budget in budgets {
        insert(
            dates,
            format!("new-budget-{}", compact(budget.start_date)),
            format!("new budget {}", budget.amount),
            budget.start_date,
            KeyDateKind::NewBudget,
        );
    }
}

/// Start of every `freq` window over `[first, last]` widened to whole
/// periods, plus the day after the last one.
pub(crate) fn window_dates(
    dates: &mut KeyDates,
    first: NaiveDate,
    last: NaiveDate,
    freq: Frequency,
) {
    let windows = slice_time_window(first, last, freq, true);
    for window in &windows {
        let key = format!("start-of-{}-{}", compact(window.start), compact(window.end));
        insert(dates, key.clone(), key, window.start, KeyDateKind::WindowStart);
    }

    if let Some(DateWindow { start, end }) = windows.last().copied() {
        let key = format!(
            "first-day-after-rear-time-window-{}-{}",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );
        insert(dates, key.clone(), key, end + Duration::days(1), KeyDateKind::AfterLastWindow);
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calendar::test_support::date;

    #[test]
    fn test_phase_dates() {
        let phases = PhaseDates {
            discovery_date: Some(date(2016, 1, 4)),
            end_date: Some(date(2016, 8, 31)),
            ..PhaseDates::default()
        };
        let mut dates = KeyDates::new();
        phase_dates(&mut dates, &phases, date(2017, 6, 1));

        assert_eq!(dates.len(), 3);
        assert_eq!(dates["discovery-start-20160104"].name, "discovery start");
        assert_eq!(dates["today-20170601"].kind, KeyDateKind::PhaseStart);
        assert_eq!(
            dates["end-of-day-on-end-date-20160901"].date,
            date(2016, 9, 1)
        );
    }

    #[test]
    fn test_budget_dates() {
        let budgets = [Budget {
            start_date: date(2016, 1, 1),
            amount: dec!(50000),
            note: None,
        }];
        let mut dates = KeyDates::new();
        budget_dates(&mut dates, &budgets);

        let key_date = &dates["new-budget-20160101"];
        assert_eq!(key_date.name, "new budget 50000");
        assert_eq!(key_date.kind, KeyDateKind::NewBudget);
    }

    #[test]
    fn test_window_dates() {
        let mut dates = KeyDates::new();
        window_dates(&mut dates, date(2016, 1, 3), date(2016, 3, 15), Frequency::MonthStart);

        assert_eq!(dates.len(), 4);
        assert_eq!(dates["start-of-20160201-20160229"].date, date(2016, 2, 1));
        let after = &dates["first-day-after-rear-time-window-2016-03-01-2016-03-31"];
        assert_eq!(after.date, date(2016, 4, 1));
        assert_eq!(after.kind, KeyDateKind::AfterLastWindow);
    }

    #[test]
    fn test_serialised_shape() {
        let key_date = KeyDateStats {
            key_date: KeyDate {
                name: "today".to_string(),
                date: date(2017, 6, 1),
                kind: KeyDateKind::PhaseStart,
            },
            stats: Stats::zero(),
        };
        let json = serde_json::to_value(&key_date).unwrap();
        assert_eq!(json["type"], "phase start");
        assert_eq!(json["date"], "2017-06-01");
        assert!(json["stats"].get("remaining").is_some());
    }
}
