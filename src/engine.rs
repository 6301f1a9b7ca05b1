//! The spend engine: one snapshot, one calendar and one cache behind the
//! cached entry points, plus cache warming.
//!
//! Warming runs one job per visible work item on the blocking pool, bounded
//! by a semaphore. Inside a job the time-frame and key-date statistics are
//! regenerated before the profile, so the profile reuses them. Groups only
//! read their members' cached statistics and are warmed after every item.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{Duration, Local, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregate::{
    AreaProfile, CalcContext, PeopleFilter, Profile, ProfileRequest, Spend, Stats, area_profile,
    or_no_data,
};
use crate::cache::{CacheMode, CacheStore, FileCache, MemoryCache, Memoizer};
use crate::calendar::{DateWindow, GovUkHolidays, HolidayFile, HolidaySource, WorkCalendar};
use crate::config::Config;
use crate::error::{CacheError, CalcError, HolidayError, Result};
use crate::model::{Snapshot, Subject};

/// Outcome of a warming run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarmReport {
    /// Subjects regenerated without error.
    pub subjects: usize,
    /// Cache entries written.
    pub entries: usize,
    /// Subjects that failed, with the reason.
    pub failures: Vec<(Subject, String)>,
}

pub struct Engine {
    calendar: RwLock<Arc<WorkCalendar>>,
    snapshot: Arc<Snapshot>,
    memo: Memoizer,
    config: Config,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("holidays", &self.calendar().holiday_count())
            .field("work_items", &self.snapshot.work_items().count())
            .field("cached", &self.memo.len())
            .finish()
    }
}

impl Engine {
    pub fn new(calendar: WorkCalendar, snapshot: Snapshot, memo: Memoizer, config: Config) -> Self {
        Self {
            calendar: RwLock::new(Arc::new(calendar)),
            snapshot: Arc::new(snapshot),
            memo,
            config,
        }
    }

    /// Build an engine from configuration: load the holidays from the
    /// configured file or URL and open the configured cache.
    pub async fn from_config(config: Config, snapshot: Snapshot) -> Result<Self> {
        let source = holiday_source(&config);
        let calendar = WorkCalendar::load(source.as_ref()).await?;

        let store: Arc<dyn CacheStore> = match &config.cache_file {
            Some(path) => Arc::new(FileCache::open(path, config.cache_ttl)?),
            None => Arc::new(MemoryCache::new(config.cache_ttl)),
        };

        let overbooked = snapshot.check_allocations(&calendar);
        if overbooked > 0 {
            warn!("{} tasks allocate more days than their span has workdays", overbooked);
        }

        Ok(Self::new(calendar, snapshot, Memoizer::new(store), config))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn memo(&self) -> &Memoizer {
        &self.memo
    }

    /// The configured date, or the local date.
    pub fn today(&self) -> NaiveDate {
        self.config.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// The calendar currently in use.
    pub fn calendar(&self) -> Arc<WorkCalendar> {
        let guard = self.calendar.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Swap in a freshly loaded holiday list and drop every cached result.
    /// Calculations already running keep the calendar they started with.
    pub async fn refresh_calendar(
        &self,
        source: &dyn HolidaySource,
    ) -> std::result::Result<(), HolidayError> {
        let calendar = WorkCalendar::load(source).await?;
        {
            let mut guard = self.calendar.write().unwrap_or_else(PoisonError::into_inner);
            *guard = Arc::new(calendar);
        }
        self.memo.clear();
        Ok(())
    }

    fn context<'a>(&'a self, calendar: &'a WorkCalendar) -> CalcContext<'a> {
        CalcContext::new(calendar, &self.snapshot, self.today())
            .with_amber_threshold(self.config.amber_threshold)
            .with_memo(&self.memo)
    }

    fn spend(&self, subject: Subject) -> std::result::Result<&dyn Spend, CalcError> {
        let spend: &dyn Spend = match subject {
            Subject::WorkItem(id) => self.snapshot.work_item(id)?,
            Subject::Group(id) => self.snapshot.group(id)?,
        };
        Ok(spend)
    }

    /// Working days in `[start, end]`.
    pub fn workdays(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        self.calendar().workdays(start, end)
    }

    pub fn stats_between(
        &self,
        subject: Subject,
        window: DateWindow,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Stats> {
        let calendar = self.calendar();
        let ctx = self.context(&calendar);
        Ok(self.spend(subject)?.stats_between(&ctx, window, calculation_start)?)
    }

    pub fn profile(&self, subject: Subject, request: &ProfileRequest) -> Result<Profile> {
        let calendar = self.calendar();
        let ctx = self.context(&calendar);
        Ok(self.spend(subject)?.profile(&ctx, request)?)
    }

    pub fn current_fte(
        &self,
        subject: Subject,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Decimal> {
        let calendar = self.calendar();
        let ctx = self.context(&calendar);
        Ok(self.spend(subject)?.current_fte(&ctx, start, end)?)
    }

    /// People costs in `window`, optionally only contractors or only
    /// non-contractors. Asking for both is a domain error.
    pub fn people_costs(
        &self,
        subject: Subject,
        window: DateWindow,
        contractor_only: bool,
        non_contractor_only: bool,
        calculation_start: Option<NaiveDate>,
    ) -> Result<Decimal> {
        let filter = PeopleFilter::from_flags(contractor_only, non_contractor_only)?;
        let calendar = self.calendar();
        let ctx = self.context(&calendar);
        Ok(self.spend(subject)?.people_costs(&ctx, window, filter, calculation_start)?)
    }

    pub fn area_profile(
        &self,
        area_id: Uuid,
        request: &ProfileRequest,
        only: Option<&[Uuid]>,
    ) -> Result<AreaProfile> {
        let calendar = self.calendar();
        let ctx = self.context(&calendar);
        Ok(area_profile(&ctx, area_id, request, only)?)
    }

    /// Recompute and overwrite every cached aggregate of `subject` for the
    /// configured frequency. Returns the number of entries written.
    pub fn regenerate(&self, subject: Subject) -> Result<usize> {
        let calendar = self.calendar();
        let ctx = self.context(&calendar);
        let spend = self.spend(subject)?;
        let freq = self.config.frequency;
        let mode = CacheMode::Regenerate;
        let mut entries = 0;

        for window in spend.time_frames(&ctx, None, None, Some(freq))? {
            spend.stats_between_with(&ctx, window, None, mode)?;
            entries += 1;
        }

        if let Some(first) = or_no_data(spend.first_date(&ctx))? {
            let mut ends: Vec<NaiveDate> = spend
                .key_dates(&ctx, Some(freq))?
                .values()
                .map(|key_date| key_date.date - Duration::days(1))
                .collect();
            ends.extend(or_no_data(spend.last_date(&ctx))?);
            ends.sort();
            ends.dedup();
            for end in ends {
                spend.stats_between_with(&ctx, DateWindow::new(first, end), None, mode)?;
                entries += 1;
            }
        }

        spend.current_fte_with(&ctx, None, None, mode)?;
        spend.profile_with(&ctx, &ProfileRequest::new(freq), mode)?;
        entries += 2;

        debug!("Regenerated {} cache entries for {}", entries, subject);
        Ok(entries)
    }

    /// Regenerate every visible work item, then every group, in parallel.
    /// A failing subject is reported and does not stop the others. The
    /// cache is flushed at the end.
    pub async fn regenerate_all(self: Arc<Self>) -> Result<WarmReport> {
        let items: Vec<Subject> = self
            .snapshot
            .work_items()
            .filter(|item| self.snapshot.is_visible(item))
            .map(|item| item.subject())
            .collect();
        let groups: Vec<Subject> = self.snapshot.groups().map(|group| group.subject()).collect();
        info!(
            "Warming cache for {} work items and {} groups",
            items.len(),
            groups.len()
        );

        let semaphore = Arc::new(Semaphore::new(self.config.warm_concurrency.max(1)));
        let mut report = WarmReport::default();

        for batch in [items, groups] {
            let mut jobs = JoinSet::new();
            for subject in batch {
                let engine = Arc::clone(&self);
                let semaphore = Arc::clone(&semaphore);
                jobs.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    let result =
                        tokio::task::spawn_blocking(move || engine.regenerate(subject)).await;
                    (subject, result)
                });
            }

            while let Some(joined) = jobs.join_next().await {
                match joined {
                    Ok((_, Ok(Ok(entries)))) => {
                        report.subjects += 1;
                        report.entries += entries;
                    }
                    Ok((subject, Ok(Err(e)))) => {
                        warn!("Failed to warm {}: {}", subject, e);
                        report.failures.push((subject, e.to_string()));
                    }
                    Ok((subject, Err(e))) => {
                        warn!("Warming job for {} did not finish: {}", subject, e);
                        report.failures.push((subject, e.to_string()));
                    }
                    Err(e) => warn!("Warming task did not finish: {}", e),
                }
            }
        }
        report.failures.sort();

        self.flush_cache()?;
        info!(
            "Warmed {} subjects ({} entries, {} failures)",
            report.subjects,
            report.entries,
            report.failures.len()
        );
        Ok(report)
    }

    /// Drop every cached value. Returns how many were removed.
    pub fn clear_cache(&self) -> usize {
        self.memo.clear()
    }

    /// Persist the cache when it is file backed.
    pub fn flush_cache(&self) -> std::result::Result<(), CacheError> {
        self.memo.flush()
    }
}

/// The holiday source named by the configuration: the file when set,
/// otherwise the URL.
pub fn holiday_source(config: &Config) -> Box<dyn HolidaySource> {
    match &config.holidays_file {
        Some(path) => Box::new(HolidayFile::new(path)),
        None => Box::new(GovUkHolidays::new(config.holidays_url.clone())),
    }
}
