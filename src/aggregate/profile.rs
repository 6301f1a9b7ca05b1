use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CalcContext, KeyDateStats, Rag, Spend, Stats, or_no_data};
use crate::calendar::Frequency;
use crate::costs::CostLine;
use crate::error::CalcError;
use crate::model::{Link, Phase, PhaseDates, Status, Subject};

/// Arguments of a profile request. Unset bounds default to the subject's
/// first and last dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileRequest {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub freq: Frequency,
    pub calculation_start: Option<NaiveDate>,
}

impl ProfileRequest {
    pub fn new(freq: Frequency) -> Self {
        Self {
            freq,
            ..Self::default()
        }
    }

    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn calculated_from(mut self, calculation_start: Option<NaiveDate>) -> Self {
        self.calculation_start = calculation_start;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRef {
    pub id: Uuid,
    pub name: String,
}

/// Names of the people responsible for a work item. The service manager is
/// the manager of its area.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Managers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_manager: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkView {
    #[serde(flatten)]
    pub link: Link,
    #[serde(rename = "type")]
    pub link_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Financial {
    pub time_frames: BTreeMap<String, Stats>,
    pub key_dates: BTreeMap<String, KeyDateStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
    /// Status in force today.
    pub status: Option<Status>,
    pub service_area: Option<AreaRef>,
    pub managers: Managers,
    pub phase: Phase,
    #[serde(flatten)]
    pub phase_dates: PhaseDates,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub financial: Financial,
    pub financial_rag: Rag,
    /// Budget in force today.
    pub budget: Decimal,
    pub current_fte: Decimal,
    pub cost_to_date: Decimal,
    pub costs: Vec<CostLine>,
    pub savings: Vec<CostLine>,
    pub links: Vec<LinkView>,
}

pub(super) fn build<S>(
    subject: &S,
    ctx: &CalcContext<'_>,
    request: &ProfileRequest,
) -> Result<Profile, CalcError>
where
    S: Spend + ?Sized,
{
    let id = match subject.subject() {
        Subject::WorkItem(id) | Subject::Group(id) => id,
    };
    let calculation_start = request.calculation_start;

    let financial = Financial {
        time_frames: subject.stats_in_time_frames(
            ctx,
            request.start,
            request.end,
            Some(request.freq),
            calculation_start,
        )?,
        key_dates: subject.stats_on_key_dates(ctx, Some(request.freq), calculation_start)?,
    };

    let links = subject
        .links(ctx)?
        .into_iter()
        .map(|link| LinkView {
            link_type: link.link_type(),
            link,
        })
        .collect();

    Ok(Profile {
        id,
        name: subject.name().to_string(),
        kind: subject.kind().to_string(),
        description: subject.description().map(str::to_string),
        status: subject.status_on(ctx.today).cloned(),
        service_area: subject.area(ctx)?.map(|area| AreaRef {
            id: area.id,
            name: area.name.clone(),
        }),
        managers: subject.managers(ctx)?,
        phase: subject.phase(ctx),
        phase_dates: *subject.phases(),
        first_date: or_no_data(subject.first_date(ctx))?,
        last_date: or_no_data(subject.last_date(ctx))?,
        financial,
        financial_rag: subject.financial_rag(ctx, calculation_start)?,
        budget: subject.budget(ctx, ctx.today)?,
        current_fte: subject.current_fte(ctx, request.start, request.end)?,
        cost_to_date: subject.cost_to_date(ctx, calculation_start)?,
        costs: subject.cost_lines(ctx)?,
        savings: subject.saving_lines(ctx)?,
        links,
    })
}
