//! Attribution of people's time and money to windows.
//!
//! A person's day rate is their salary rate plus the day rate of their
//! non-salary costs; a task turns its allocated days into days and money
//! for any overlapping window.

mod person;
mod task;

use chrono::NaiveDate;

use crate::calendar::WorkCalendar;

/// What every attribution needs: the working-day calendar and the date
/// treated as today.
#[derive(Debug, Clone, Copy)]
pub struct Pricing<'a> {
    pub calendar: &'a WorkCalendar,
    pub today: NaiveDate,
}

impl<'a> Pricing<'a> {
    pub fn new(calendar: &'a WorkCalendar, today: NaiveDate) -> Self {
        Self { calendar, today }
    }
}

/// The part of a person's day rate a task is priced at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RatePart<'n> {
    /// Salary plus every non-salary cost.
    #[default]
    Full,
    /// Non-salary costs only.
    Additional,
    /// One named non-salary cost.
    Named(&'n str),
}
