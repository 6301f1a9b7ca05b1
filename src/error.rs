//! Error types for the spend engine.

use std::path::PathBuf;

use uuid::Uuid;

/// Errors raised while calculating spend, rates and statistics.
#[derive(Debug, thiserror::Error)]
pub enum CalcError {
    /// No first/last date can be derived. Recoverable: aggregators substitute
    /// zero-valued statistics.
    #[error("No dated activity for {subject}")]
    NoData { subject: String },

    /// A calculation was asked for something that has no meaning.
    #[error("Domain error: {reason}")]
    Domain { reason: String },

    /// A task or manager refers to a person missing from the snapshot.
    #[error("Unknown person {0}")]
    UnknownPerson(Uuid),

    /// A lookup for a work item missing from the snapshot.
    #[error("Unknown work item {0}")]
    UnknownWorkItem(Uuid),

    /// A lookup for a work item group missing from the snapshot.
    #[error("Unknown work item group {0}")]
    UnknownGroup(Uuid),

    /// A lookup for a service area missing from the snapshot.
    #[error("Unknown area {0}")]
    UnknownArea(Uuid),
}

impl CalcError {
    pub fn no_data(subject: impl Into<String>) -> Self {
        Self::NoData {
            subject: subject.into(),
        }
    }

    pub fn domain(reason: impl Into<String>) -> Self {
        Self::Domain {
            reason: reason.into(),
        }
    }

    /// True for the recoverable "nothing to derive dates from" condition.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData { .. })
    }
}

/// Errors from the memoization layer. Cached calls log these and fall back
/// to uncached execution; only opening and flushing a store return them.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The call could not be turned into a key.
    #[error("Cache key derivation failed: {reason}")]
    KeyDerivation { reason: String },

    /// A value could not be encoded or decoded.
    #[error("Cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing file could not be read or written.
    #[error("Cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors loading the holiday list.
#[derive(Debug, thiserror::Error)]
pub enum HolidayError {
    #[error("Failed to read holiday file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch holidays: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse holidays: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors loading or validating an entity snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid snapshot: {0}")]
    Invalid(#[from] CalcError),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Calc(#[from] CalcError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Holiday(#[from] HolidayError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
