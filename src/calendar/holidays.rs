//! Holiday sources for the work calendar.
//!
//! Holidays change rarely, so a calendar is loaded once per process and
//! injected into the engine. Sources understand either a bare JSON list of
//! dates or the gov.uk bank-holiday document:
//!
//! ```text
//! {"division": "england-and-wales",
//!  "events": [{"title": "New Year’s Day", "date": "2016-01-01", "notes": "", "bunting": true}]}
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::calendar::WorkCalendar;
use crate::error::HolidayError;

/// Default gov.uk endpoint for England and Wales.
pub const GOV_UK_ENGLAND_AND_WALES: &str =
    "https://www.gov.uk/bank-holidays/england-and-wales.json";

/// Somewhere holidays can be loaded from.
#[async_trait]
pub trait HolidaySource: Send + Sync {
    /// Load the holiday dates.
    async fn load(&self) -> Result<Vec<NaiveDate>, HolidayError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// A fixed list of holidays.
#[derive(Debug, Clone, Default)]
pub struct StaticHolidays(pub Vec<NaiveDate>);

#[async_trait]
impl HolidaySource for StaticHolidays {
    async fn load(&self) -> Result<Vec<NaiveDate>, HolidayError> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        format!("{} static holidays", self.0.len())
    }
}

/// Holidays read from a JSON file.
#[derive(Debug, Clone)]
pub struct HolidayFile {
    path: PathBuf,
}

impl HolidayFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl HolidaySource for HolidayFile {
    async fn load(&self) -> Result<Vec<NaiveDate>, HolidayError> {
        let content =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| HolidayError::Io {
                    path: self.path.clone(),
                    source,
                })?;
        parse_holidays(&content)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Holidays fetched from the gov.uk bank-holiday API.
#[derive(Debug, Clone)]
pub struct GovUkHolidays {
    client: reqwest::Client,
    url: String,
}

impl GovUkHolidays {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn england_and_wales() -> Self {
        Self::new(GOV_UK_ENGLAND_AND_WALES)
    }
}

#[async_trait]
impl HolidaySource for GovUkHolidays {
    async fn load(&self) -> Result<Vec<NaiveDate>, HolidayError> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_holidays(&body)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HolidayDocument {
    List(Vec<NaiveDate>),
    Division(Division),
}

#[derive(Debug, Deserialize)]
struct Division {
    events: Vec<HolidayEvent>,
}

#[derive(Debug, Deserialize)]
struct HolidayEvent {
    date: NaiveDate,
}

/// Parse a holiday document, see the module docs for accepted shapes.
pub fn parse_holidays(json: &str) -> Result<Vec<NaiveDate>, HolidayError> {
    let dates = match serde_json::from_str::<HolidayDocument>(json)? {
        HolidayDocument::List(dates) => dates,
        HolidayDocument::Division(division) => {
            division.events.into_iter().map(|e| e.date).collect()
        }
    };
    Ok(dates)
}

impl WorkCalendar {
    /// Build a calendar from a holiday source.
    pub async fn load(source: &dyn HolidaySource) -> Result<Self, HolidayError> {
        let holidays = source.load().await?;
        tracing::info!(
            "Loaded {} holidays from {}",
            holidays.len(),
            source.describe()
        );
        Ok(Self::new(holidays))
    }
}
