//! Time-windowed spend calculations for people working on products.
//!
//! Given a read-only [`model::Snapshot`] of people, work items and groups,
//! the engine answers how much was spent, by whom, at what rate and against
//! what budget over any date window:
//!
//! - [`calendar`] counts working days and slices windows into periods.
//! - [`rates`] turns daily, monthly and yearly rates into day rates.
//! - [`costs`] accrues one-off and recurring costs.
//! - [`attribution`] prices tasks against the people doing them.
//! - [`aggregate`] rolls those up into statistics, key dates and profiles.
//! - [`cache`] memoizes the expensive entry points.
//! - [`engine`] ties a snapshot, calendar and cache together.

pub mod aggregate;
pub mod attribution;
pub mod cache;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod costs;
pub mod engine;
pub mod error;
pub mod model;
pub mod rates;

pub use config::Config;
pub use engine::{Engine, WarmReport};
pub use error::{Error, Result};
