//! Engine configuration.
//!
//! Read from `BURNRATE_*` environment variables (a `.env` file is loaded by
//! the binary first). CLI flags override individual values.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::aggregate::DEFAULT_AMBER_THRESHOLD;
use crate::calendar::{Frequency, GOV_UK_ENGLAND_AND_WALES};
use crate::error::ConfigError;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 86_400;
pub const DEFAULT_WARM_CONCURRENCY: usize = 4;

/// Configuration for the spend engine and its CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Holiday list on disk. Takes precedence over `holidays_url`.
    pub holidays_file: Option<PathBuf>,
    /// gov.uk style bank-holiday endpoint.
    pub holidays_url: String,
    /// Persisted cache. In-memory only when unset.
    pub cache_file: Option<PathBuf>,
    /// How long cached values stay fresh. `None` never expires.
    pub cache_ttl: Option<Duration>,
    /// Fixed "today" for reproducible runs.
    pub today: Option<NaiveDate>,
    pub amber_threshold: Decimal,
    /// Default time-frame frequency for profiles and warming.
    pub frequency: Frequency,
    /// Work items regenerated at once while warming.
    pub warm_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            holidays_file: None,
            holidays_url: GOV_UK_ENGLAND_AND_WALES.to_string(),
            cache_file: None,
            cache_ttl: Some(Duration::from_secs(DEFAULT_CACHE_TTL_SECS)),
            today: None,
            amber_threshold: DEFAULT_AMBER_THRESHOLD,
            frequency: Frequency::MonthStart,
            warm_concurrency: DEFAULT_WARM_CONCURRENCY,
        }
    }
}

impl Config {
    /// Build from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or empty keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let cache_ttl = match get("BURNRATE_CACHE_TTL_SECS") {
            Some(raw) => match parse::<u64>("BURNRATE_CACHE_TTL_SECS", &raw)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            None => defaults.cache_ttl,
        };

        let config = Self {
            holidays_file: get("BURNRATE_HOLIDAYS_FILE").map(PathBuf::from),
            holidays_url: get("BURNRATE_HOLIDAYS_URL").unwrap_or(defaults.holidays_url),
            cache_file: get("BURNRATE_CACHE_FILE").map(PathBuf::from),
            cache_ttl,
            today: get("BURNRATE_TODAY")
                .map(|raw| parse("BURNRATE_TODAY", &raw))
                .transpose()?,
            amber_threshold: get("BURNRATE_AMBER_THRESHOLD")
                .map(|raw| parse("BURNRATE_AMBER_THRESHOLD", &raw))
                .transpose()?
                .unwrap_or(defaults.amber_threshold),
            frequency: get("BURNRATE_FREQUENCY")
                .map(|raw| parse("BURNRATE_FREQUENCY", &raw))
                .transpose()?
                .unwrap_or(defaults.frequency),
            warm_concurrency: get("BURNRATE_WARM_CONCURRENCY")
                .map(|raw| parse("BURNRATE_WARM_CONCURRENCY", &raw))
                .transpose()?
                .unwrap_or(defaults.warm_concurrency),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values no calculation can use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.amber_threshold < Decimal::ONE {
            return Err(ConfigError::InvalidValue {
                key: "BURNRATE_AMBER_THRESHOLD".to_string(),
                message: format!("{} is below 1", self.amber_threshold),
            });
        }
        if self.warm_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "BURNRATE_WARM_CONCURRENCY".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{:?}: {}", raw, e),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal_macros::dec;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.cache_ttl, Some(Duration::from_secs(86_400)));
        assert_eq!(config.amber_threshold, dec!(1.1));
        assert_eq!(config.frequency, Frequency::MonthStart);
        assert_eq!(config.warm_concurrency, 4);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("BURNRATE_HOLIDAYS_FILE", "/etc/holidays.json"),
            ("BURNRATE_CACHE_FILE", "/tmp/burnrate.json"),
            ("BURNRATE_CACHE_TTL_SECS", "0"),
            ("BURNRATE_TODAY", "2017-01-01"),
            ("BURNRATE_AMBER_THRESHOLD", "1.25"),
            ("BURNRATE_FREQUENCY", "FY"),
            ("BURNRATE_WARM_CONCURRENCY", "8"),
        ]))
        .unwrap();

        assert_eq!(config.holidays_file, Some(PathBuf::from("/etc/holidays.json")));
        assert_eq!(config.cache_file, Some(PathBuf::from("/tmp/burnrate.json")));
        assert_eq!(config.cache_ttl, None);
        assert_eq!(config.today, NaiveDate::from_ymd_opt(2017, 1, 1));
        assert_eq!(config.amber_threshold, dec!(1.25));
        assert_eq!(config.frequency, Frequency::FinancialYear);
        assert_eq!(config.warm_concurrency, 8);
    }

    #[test]
    fn test_empty_values_keep_defaults() {
        let config = Config::from_lookup(lookup(&[("BURNRATE_TODAY", "  ")])).unwrap();
        assert_eq!(config.today, None);
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup(&[("BURNRATE_TODAY", "yesterday")])).unwrap_err();
        assert!(err.to_string().contains("BURNRATE_TODAY"));

        let err = Config::from_lookup(lookup(&[("BURNRATE_AMBER_THRESHOLD", "0.9")])).unwrap_err();
        assert!(err.to_string().contains("below 1"));

        let err = Config::from_lookup(lookup(&[("BURNRATE_WARM_CONCURRENCY", "0")])).unwrap_err();
        assert!(err.to_string().contains("at least 1"));

        assert!(Config::from_lookup(lookup(&[("BURNRATE_FREQUENCY", "weekly")])).is_err());
    }
}
