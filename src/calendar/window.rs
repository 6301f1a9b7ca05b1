//! Date windows, period slicing and recurrence dates.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// A closed date interval `[start, end]`.
///
/// A window with `start > end` is empty; it is never an error to build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A window covering a single day.
    pub fn day(day: NaiveDate) -> Self {
        Self::new(day, day)
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Intersection of two windows, `None` when either is empty or they are
    /// disjoint.
    pub fn overlap(&self, other: &DateWindow) -> Option<DateWindow> {
        if self.is_empty() || other.is_empty() {
            return None;
        }
        let window = DateWindow::new(self.start.max(other.start), self.end.min(other.end));
        (!window.is_empty()).then_some(window)
    }

    /// The same window moved by whole days.
    pub fn shifted(&self, days: i64) -> DateWindow {
        DateWindow::new(
            self.start + Duration::days(days),
            self.end + Duration::days(days),
        )
    }
}

impl fmt::Display for DateWindow {
    /// Renders as `YYYY-MM-DD~YYYY-MM-DD`, the key used for time frames.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}~{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Period used to slice a time window into sub windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Frequency {
    /// Calendar months, boundaries on the 1st.
    #[default]
    #[serde(rename = "MS")]
    MonthStart,
    /// Calendar years, boundaries on 1 January.
    #[serde(rename = "YS", alias = "AS")]
    YearStart,
    /// UK financial years, boundaries on 6 April.
    #[serde(rename = "FY")]
    FinancialYear,
}

impl Frequency {
    pub fn code(&self) -> &'static str {
        match self {
            Frequency::MonthStart => "MS",
            Frequency::YearStart => "YS",
            Frequency::FinancialYear => "FY",
        }
    }

    /// Latest period boundary on or before `day`.
    pub fn floor(&self, day: NaiveDate) -> NaiveDate {
        match self {
            Frequency::MonthStart => first_day_of_month(day),
            Frequency::YearStart => day.with_ordinal(1).unwrap_or(day),
            Frequency::FinancialYear => {
                let (start, _) = financial_year(day.year());
                if day >= start {
                    start
                } else {
                    financial_year(day.year() - 1).0
                }
            }
        }
    }

    /// First period boundary strictly after `day`.
    pub fn next_after(&self, day: NaiveDate) -> NaiveDate {
        let months = match self {
            Frequency::MonthStart => 1,
            Frequency::YearStart | Frequency::FinancialYear => 12,
        };
        self.floor(day)
            .checked_add_months(Months::new(months))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Earliest period boundary on or after `day`.
    pub fn ceil(&self, day: NaiveDate) -> NaiveDate {
        if self.floor(day) == day {
            day
        } else {
            self.next_after(day)
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ms" | "month" | "monthly" => Ok(Frequency::MonthStart),
            "ys" | "as" | "year" | "yearly" | "annual" => Ok(Frequency::YearStart),
            "fy" | "financial_year" | "financial-year" => Ok(Frequency::FinancialYear),
            _ => Err(format!(
                "invalid frequency '{}', expected 'MS', 'YS' or 'FY'",
                s
            )),
        }
    }
}

/// Slice `[start, end]` into consecutive windows on `freq` boundaries.
///
/// With `extend`, the window is first widened to whole periods, e.g. with
/// monthly slicing 2016-01-03..2016-12-25 becomes 2016-01-01..2016-12-31.
/// Returns an empty list when `start > end`.
pub fn slice_time_window(
    start: NaiveDate,
    end: NaiveDate,
    freq: Frequency,
    extend: bool,
) -> Vec<DateWindow> {
    if start > end {
        return Vec::new();
    }

    let mut start = start;
    let mut end_exclusive = end + Duration::days(1);
    if extend {
        start = freq.floor(start);
        end_exclusive = freq.ceil(end_exclusive);
    }

    let mut bounds = vec![start];
    let mut boundary = freq.next_after(start);
    while boundary < end_exclusive {
        bounds.push(boundary);
        boundary = freq.next_after(boundary);
    }
    bounds.push(end_exclusive);

    bounds
        .windows(2)
        .map(|pair| DateWindow::new(pair[0], pair[1] - Duration::days(1)))
        .collect()
}

/// Cadence of a recurring date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    Monthly,
    Annual,
}

/// Dates inside `window` on which something anchored at `anchor` recurs.
///
/// Monthly recurrences fall on the anchor's day of month, or on the last day
/// of shorter months. Annual recurrences fall on the anchor's day of year and
/// are skipped in years that do not have it (day 366).
pub fn recurrences(
    window: DateWindow,
    recurrence: Recurrence,
    anchor: NaiveDate,
) -> Vec<NaiveDate> {
    if window.is_empty() {
        return Vec::new();
    }

    let candidates: Vec<NaiveDate> = match recurrence {
        Recurrence::Monthly => {
            let mut month = first_day_of_month(window.start);
            let mut dates = Vec::new();
            while month <= window.end {
                let day = anchor.day().min(last_day_of_month(month).day());
                if let Some(date) = month.with_day(day) {
                    dates.push(date);
                }
                match month.checked_add_months(Months::new(1)) {
                    Some(next) => month = next,
                    None => break,
                }
            }
            dates
        }
        Recurrence::Annual => (window.start.year()..=window.end.year())
            .filter_map(|year| NaiveDate::from_yo_opt(year, anchor.ordinal()))
            .collect(),
    };

    candidates
        .into_iter()
        .filter(|d| window.contains(*d))
        .collect()
}

/// The UK financial year starting in `year`: 6 April to 5 April.
pub fn financial_year(year: i32) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(year, 4, 6).unwrap_or(NaiveDate::MIN);
    let end = NaiveDate::from_ymd_opt(year + 1, 4, 5).unwrap_or(NaiveDate::MAX);
    (start, end)
}

pub fn first_day_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

pub fn last_day_of_month(day: NaiveDate) -> NaiveDate {
    first_day_of_month(day)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(day)
}
