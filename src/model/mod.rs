//! Entities the engine reads.
//!
//! Everything here is plain data deserialised from a [`Snapshot`]. The
//! calculations live in `attribution` and `aggregate`; nothing in the engine
//! mutates an entity.

mod person;
mod snapshot;
mod task;
mod work_item;

pub use person::Person;
pub use snapshot::Snapshot;
pub use task::{Repeat, Task};
pub use work_item::{WorkItem, WorkItemGroup};

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CalcError;

/// Something spend can be aggregated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "kebab-case")]
pub enum Subject {
    WorkItem(Uuid),
    Group(Uuid),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::WorkItem(id) => write!(f, "work-item:{}", id),
            Subject::Group(id) => write!(f, "work-item-group:{}", id),
        }
    }
}

/// A total budget, in force from `start_date` until the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub start_date: NaiveDate,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Delivery health as reported by the team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Ok,
    AtRisk,
    InTrouble,
    Paused,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusKind::Ok => "OK",
            StatusKind::AtRisk => "At risk",
            StatusKind::InTrouble => "In trouble",
            StatusKind::Paused => "Paused",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub start_date: NaiveDate,
    pub status: StatusKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Latest status starting on or before `on`.
pub fn status_on(statuses: &[Status], on: NaiveDate) -> Option<&Status> {
    statuses
        .iter()
        .filter(|s| s.start_date <= on)
        .max_by_key(|s| s.start_date)
}

/// A link to somewhere the work item lives (repository, board, site).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl Link {
    /// Host of the URL with dots replaced, e.g. `github-com`. Used by the
    /// front end to pick an icon.
    pub fn link_type(&self) -> Option<String> {
        let url = reqwest::Url::parse(&self.url).ok()?;
        url.host_str().map(|host| host.replace('.', "-"))
    }
}

/// A service area that work items belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub id: Uuid,
    pub name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// The service manager.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<Uuid>,
}

impl Area {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            visible: true,
            manager_id: None,
        }
    }
}

pub(crate) fn default_visible() -> bool {
    true
}

/// Delivery phase a work item is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "Not Defined")]
    NotDefined,
    Discovery,
    Alpha,
    Beta,
    Live,
    Ended,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::NotDefined => "Not Defined",
            Phase::Discovery => "Discovery",
            Phase::Alpha => "Alpha",
            Phase::Beta => "Beta",
            Phase::Live => "Live",
            Phase::Ended => "Ended",
        };
        f.write_str(label)
    }
}

/// Phase start dates. `end_date` is the last day of the work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDates {
    #[serde(default)]
    pub discovery_date: Option<NaiveDate>,
    #[serde(default)]
    pub alpha_date: Option<NaiveDate>,
    #[serde(default)]
    pub beta_date: Option<NaiveDate>,
    #[serde(default)]
    pub live_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl PhaseDates {
    fn ordered(&self) -> [(Phase, Option<NaiveDate>); 5] {
        [
            (Phase::Discovery, self.discovery_date),
            (Phase::Alpha, self.alpha_date),
            (Phase::Beta, self.beta_date),
            (Phase::Live, self.live_date),
            (Phase::Ended, self.end_date),
        ]
    }

    /// The most advanced phase that has started by `today`.
    pub fn phase(&self, today: NaiveDate) -> Phase {
        self.ordered()
            .into_iter()
            .rev()
            .find(|(_, date)| date.is_some_and(|d| today >= d))
            .map(|(phase, _)| phase)
            .unwrap_or(Phase::NotDefined)
    }

    /// Phase dates that are present must not go backwards.
    pub fn validate(&self) -> Result<(), CalcError> {
        let present: Vec<(Phase, NaiveDate)> = self
            .ordered()
            .into_iter()
            .filter_map(|(phase, date)| date.map(|d| (phase, d)))
            .collect();

        for pair in present.windows(2) {
            let (earlier, earlier_date) = pair[0];
            let (later, later_date) = pair[1];
            if later_date < earlier_date {
                return Err(CalcError::domain(format!(
                    "{} date {} is before {} date {}",
                    later, later_date, earlier, earlier_date
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::test_support::date;

    fn phases() -> PhaseDates {
        PhaseDates {
            discovery_date: Some(date(2016, 1, 1)),
            alpha_date: Some(date(2016, 3, 1)),
            beta_date: Some(date(2016, 6, 1)),
            live_date: None,
            end_date: Some(date(2017, 1, 1)),
        }
    }

    #[test]
    fn test_phase_on_dates() {
        let phases = phases();
        assert_eq!(phases.phase(date(2015, 12, 31)), Phase::NotDefined);
        assert_eq!(phases.phase(date(2016, 1, 1)), Phase::Discovery);
        assert_eq!(phases.phase(date(2016, 5, 31)), Phase::Alpha);
        assert_eq!(phases.phase(date(2016, 12, 31)), Phase::Beta);
        assert_eq!(phases.phase(date(2017, 1, 1)), Phase::Ended);
        assert_eq!(Phase::NotDefined.to_string(), "Not Defined");
    }

    #[test]
    fn test_phase_dates_must_not_go_backwards() {
        assert!(phases().validate().is_ok());

        let mut phases = phases();
        phases.beta_date = Some(date(2016, 2, 1));
        let err = phases.validate().unwrap_err();
        assert!(err.to_string().contains("Beta"));
    }

    #[test]
    fn test_status_on() {
        let statuses = vec![
            Status {
                start_date: date(2016, 1, 1),
                status: StatusKind::Ok,
                reason: None,
            },
            Status {
                start_date: date(2016, 4, 1),
                status: StatusKind::AtRisk,
                reason: Some("supplier late".to_string()),
            },
        ];
        assert!(status_on(&statuses, date(2015, 12, 1)).is_none());
        assert_eq!(status_on(&statuses, date(2016, 3, 1)).unwrap().status, StatusKind::Ok);
        assert_eq!(status_on(&statuses, date(2016, 5, 1)).unwrap().status, StatusKind::AtRisk);
    }

    #[test]
    fn test_link_type() {
        let link = Link {
            name: Some("repo".to_string()),
            url: "https://github.com/org/project".to_string(),
            note: None,
        };
        assert_eq!(link.link_type().as_deref(), Some("github-com"));

        let broken = Link {
            name: None,
            url: "not a url".to_string(),
            note: None,
        };
        assert_eq!(broken.link_type(), None);
    }

    #[test]
    fn test_subject_display() {
        let subject = Subject::Group(Uuid::nil());
        assert_eq!(
            subject.to_string(),
            "work-item-group:00000000-0000-0000-0000-000000000000"
        );
    }
}
