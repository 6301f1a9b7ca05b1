//! Working-day calculus over a holiday set.
//!
//! A [`WorkCalendar`] is loaded once (see [`holidays`]) and then shared
//! read-only by every calculation. Weekends are always non-working; the
//! holiday list adds the rest.

pub mod holidays;
mod window;

pub use holidays::{
    GOV_UK_ENGLAND_AND_WALES, GovUkHolidays, HolidayFile, HolidaySource, StaticHolidays,
    parse_holidays,
};
pub use window::{
    DateWindow, Frequency, Recurrence, financial_year, first_day_of_month, last_day_of_month,
    recurrences, slice_time_window,
};

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use sha2::{Digest, Sha224};

/// Immutable set of non-working dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkCalendar {
    holidays: BTreeSet<NaiveDate>,
    fingerprint: String,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::new([])
    }
}

impl WorkCalendar {
    /// Create a calendar from a holiday list.
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        let holidays: BTreeSet<NaiveDate> = holidays.into_iter().collect();
        let mut hasher = Sha224::new();
        for day in &holidays {
            hasher.update(day.to_string().as_bytes());
            hasher.update(b",");
        }
        Self {
            holidays,
            fingerprint: format!("{:x}", hasher.finalize()),
        }
    }

    /// A calendar where only weekends are non-working.
    pub fn weekends_only() -> Self {
        Self::default()
    }

    /// Hex digest of the holiday set. Equal calendars share it across runs.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Number of listed holidays.
    pub fn holiday_count(&self) -> usize {
        self.holidays.len()
    }

    pub fn is_holiday(&self, day: NaiveDate) -> bool {
        self.holidays.contains(&day)
    }

    /// True for weekdays that are not holidays.
    pub fn is_workday(&self, day: NaiveDate) -> bool {
        !is_weekend(day) && !self.is_holiday(day)
    }

    /// Count of working days in `[start, end]`, inclusive of both ends.
    ///
    /// Returns 0 when `start > end`.
    pub fn workdays(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        if start > end {
            return 0;
        }

        let total = (end - start).num_days() + 1;
        let full_weeks = total / 7;
        let mut weekdays = full_weeks * 5;

        let mut day = start + Duration::days(full_weeks * 7);
        while day <= end {
            if !is_weekend(day) {
                weekdays += 1;
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }

        let holidays = self
            .holidays
            .range(start..=end)
            .filter(|d| !is_weekend(**d))
            .count() as i64;

        u32::try_from((weekdays - holidays).max(0)).unwrap_or(u32::MAX)
    }

    /// Working days of a window.
    pub fn workdays_in(&self, window: DateWindow) -> u32 {
        self.workdays(window.start, window.end)
    }

    /// The working days themselves, in order.
    pub fn workdays_list(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        if start > end {
            return Vec::new();
        }
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| self.is_workday(*d))
            .collect()
    }
}

fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}
