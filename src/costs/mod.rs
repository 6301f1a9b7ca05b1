//! One-off and recurring cost lines.
//!
//! The same shape is used for a person's non-salary costs (pension, national
//! insurance), for a work item's own costs and for its savings.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar::{DateWindow, Recurrence, WorkCalendar, recurrences};
use crate::error::CalcError;

/// How a cost line accrues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostKind {
    OneOff,
    Monthly,
    Annual,
}

impl CostKind {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, CostKind::OneOff)
    }

    fn recurrence(&self) -> Option<Recurrence> {
        match self {
            CostKind::OneOff => None,
            CostKind::Monthly => Some(Recurrence::Monthly),
            CostKind::Annual => Some(Recurrence::Annual),
        }
    }
}

/// A cost, or a saving, with its accrual rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: CostKind,
    pub amount: Decimal,
    pub start_date: NaiveDate,
    /// Ignored for one-off costs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CostLine {
    pub fn new(kind: CostKind, amount: Decimal, start_date: NaiveDate) -> Self {
        Self {
            name: None,
            kind,
            amount,
            start_date,
            end_date: None,
            note: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn ending(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// True when the line is live at some point in `window`.
    pub fn is_active_in(&self, window: DateWindow) -> bool {
        self.start_date <= window.end && self.end_date.is_none_or(|end| end >= window.start)
    }

    /// Amount accrued inside `window`.
    ///
    /// A one-off cost accrues in full on its start date. Recurring costs
    /// accrue once per occurrence of their start date's day of month (or day
    /// of year) between the start date and the end date, or `today` when
    /// they have no end.
    pub fn cost_between(&self, window: DateWindow, today: NaiveDate) -> Decimal {
        let Some(recurrence) = self.kind.recurrence() else {
            return if window.contains(self.start_date) {
                self.amount
            } else {
                Decimal::ZERO
            };
        };

        let live = DateWindow::new(self.start_date, self.end_date.unwrap_or(today));
        match live.overlap(&window) {
            Some(overlap) => {
                let count = recurrences(overlap, recurrence, self.start_date).len();
                self.amount * Decimal::from(count)
            }
            None => Decimal::ZERO,
        }
    }

    /// Last day of the period a recurring cost pays for: its end date, or
    /// one cadence period after its start.
    pub fn period_end(&self) -> Option<NaiveDate> {
        if let Some(end) = self.end_date {
            return self.kind.is_recurring().then_some(end);
        }
        let months = match self.kind {
            CostKind::OneOff => return None,
            CostKind::Monthly => 1,
            CostKind::Annual => 12,
        };
        self.start_date.checked_add_months(Months::new(months))
    }

    /// Average day rate of a recurring cost over `window`.
    ///
    /// The cost is spread over the working days of its own period, then
    /// scaled down by the share of `window` that period covers. One-off costs
    /// have no rate.
    pub fn rate_between(
        &self,
        calendar: &WorkCalendar,
        window: DateWindow,
    ) -> Result<Decimal, CalcError> {
        let period_end = self.period_end().ok_or_else(|| {
            CalcError::domain(format!(
                "a one-off cost ({}) has no day rate",
                self.name.as_deref().unwrap_or("unnamed")
            ))
        })?;

        let period = DateWindow::new(self.start_date, period_end);
        let Some(overlap) = period.overlap(&window) else {
            return Ok(Decimal::ZERO);
        };

        let period_workdays = calendar.workdays_in(period);
        let window_workdays = calendar.workdays_in(window);
        if period_workdays == 0 || window_workdays == 0 {
            return Ok(Decimal::ZERO);
        }

        let overlap_workdays = Decimal::from(calendar.workdays_in(overlap));
        Ok(self.amount / Decimal::from(period_workdays) * overlap_workdays
            / Decimal::from(window_workdays))
    }
}

/// Narrows a list of cost lines by name and kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CostFilter {
    pub name: Option<String>,
    /// Empty means every kind.
    pub kinds: Vec<CostKind>,
}

impl CostFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            kinds: Vec::new(),
        }
    }

    pub fn of_kinds(mut self, kinds: impl IntoIterator<Item = CostKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    pub fn matches(&self, line: &CostLine) -> bool {
        let name_ok = match &self.name {
            Some(name) => line.name.as_deref() == Some(name.as_str()),
            None => true,
        };
        name_ok && (self.kinds.is_empty() || self.kinds.contains(&line.kind))
    }
}

/// Lines matching `filter` that are live at some point in `window`.
pub fn costs_between<'a>(
    lines: &'a [CostLine],
    window: DateWindow,
    filter: &CostFilter,
) -> impl Iterator<Item = &'a CostLine> {
    lines
        .iter()
        .filter(move |line| line.is_active_in(window) && filter.matches(line))
}

/// Sum of what each matching line accrues in `window`.
pub fn total_between(
    lines: &[CostLine],
    window: DateWindow,
    filter: &CostFilter,
    today: NaiveDate,
) -> Decimal {
    costs_between(lines, window, filter)
        .map(|line| line.cost_between(window, today))
        .sum()
}
