use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224};

use crate::calendar::{DateWindow, Frequency};
use crate::model::Subject;

/// A cached operation with every argument resolved.
///
/// Callers fill in defaults (the FTE window, the profile frequency) before
/// building one, so equivalent requests produce the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedCall {
    Profile {
        subject: Subject,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        freq: Frequency,
        calculation_start: Option<NaiveDate>,
    },
    StatsBetween {
        subject: Subject,
        window: DateWindow,
        calculation_start: Option<NaiveDate>,
    },
    CurrentFte {
        subject: Subject,
        window: DateWindow,
    },
}

/// The inputs besides a call's own arguments that its result depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyScope {
    pub today: NaiveDate,
    pub amber_threshold: Decimal,
    /// [`WorkCalendar::fingerprint`](crate::calendar::WorkCalendar::fingerprint)
    pub calendar: String,
}

impl KeyScope {
    pub fn new(today: NaiveDate, amber_threshold: Decimal, calendar: impl Into<String>) -> Self {
        Self {
            today,
            amber_threshold,
            calendar: calendar.into(),
        }
    }
}

struct OptDate(Option<NaiveDate>);

impl fmt::Display for OptDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(day) => write!(f, "{}", day),
            None => f.write_str("-"),
        }
    }
}

impl CachedCall {
    pub fn operation(&self) -> &'static str {
        match self {
            CachedCall::Profile { .. } => "profile",
            CachedCall::StatsBetween { .. } => "stats_between",
            CachedCall::CurrentFte { .. } => "current_fte",
        }
    }

    pub fn subject(&self) -> Subject {
        match self {
            CachedCall::Profile { subject, .. }
            | CachedCall::StatsBetween { subject, .. }
            | CachedCall::CurrentFte { subject, .. } => *subject,
        }
    }

    /// `|`-separated arguments. Dates, windows and frequencies never contain `|`.
    fn arguments(&self) -> String {
        match self {
            CachedCall::Profile {
                subject,
                start,
                end,
                freq,
                calculation_start,
            } => format!(
                "{}|{}|{}|{}|{}",
                subject,
                OptDate(*start),
                OptDate(*end),
                freq,
                OptDate(*calculation_start)
            ),
            CachedCall::StatsBetween {
                subject,
                window,
                calculation_start,
            } => format!("{}|{}|{}", subject, window, OptDate(*calculation_start)),
            CachedCall::CurrentFte { subject, window } => format!("{}|{}", subject, window),
        }
    }

    /// SHA-224 of the operation, its arguments and the scope they ran in.
    ///
    /// The threshold is normalized so `1.1` and `1.10` share a key.
    pub fn key(&self, scope: &KeyScope) -> CacheKey {
        let mut hasher = Sha224::new();
        hasher.update(b"burnrate:");
        hasher.update(self.operation().as_bytes());
        hasher.update(b":");
        hasher.update(self.arguments().as_bytes());
        hasher.update(
            format!(
                "@{}|{}|{}",
                scope.today,
                scope.amber_threshold.normalize(),
                scope.calendar
            )
            .as_bytes(),
        );
        CacheKey(format!("{:x}", hasher.finalize()))
    }
}

/// Hex digest identifying one cached result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
