use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::DateWindow;

/// How a scheduled task repeats.
///
/// Monthly repeat dates are not derivable from the first occurrence. Such a
/// task counts one occurrence of effort and is never priced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "every", rename_all = "lowercase")]
pub enum Repeat {
    #[default]
    None,
    Weekly {
        until: NaiveDate,
    },
    Monthly {
        until: NaiveDate,
    },
}

/// A person's allocation to a work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub person_id: Uuid,
    pub start_date: NaiveDate,
    /// Inclusive.
    pub end_date: NaiveDate,
    /// Total effort in working days over one occurrence of the span.
    pub allocated_days: Decimal,
    #[serde(default)]
    pub repeat: Repeat,
}

impl Task {
    pub fn new(
        person_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        allocated_days: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            person_id,
            start_date,
            end_date,
            allocated_days,
            repeat: Repeat::None,
        }
    }

    pub fn repeating_weekly_until(mut self, until: NaiveDate) -> Self {
        self.repeat = Repeat::Weekly { until };
        self
    }

    pub fn repeats_monthly(&self) -> bool {
        matches!(self.repeat, Repeat::Monthly { .. })
    }

    pub fn span(&self) -> DateWindow {
        DateWindow::new(self.start_date, self.end_date)
    }

    /// Last day any occurrence covers.
    pub fn effective_end_date(&self) -> NaiveDate {
        match self.repeat {
            Repeat::Weekly { until } => until + (self.end_date - self.start_date),
            Repeat::None | Repeat::Monthly { .. } => self.end_date,
        }
    }

    /// Each occurrence of the span, in order.
    pub fn occurrences(&self) -> Vec<DateWindow> {
        let span = self.span();
        match self.repeat {
            Repeat::Weekly { until } => {
                let mut windows = Vec::new();
                let mut week = 0;
                while span.start + Duration::weeks(week) <= until {
                    windows.push(span.shifted(week * 7));
                    week += 1;
                }
                windows
            }
            Repeat::None | Repeat::Monthly { .. } => vec![span],
        }
    }

    /// True when some occurrence touches `window`.
    pub fn is_active_in(&self, window: DateWindow) -> bool {
        self.start_date <= window.end && self.effective_end_date() >= window.start
    }
}
