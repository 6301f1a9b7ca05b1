//! End-to-end checks against the demo snapshot.

use std::sync::Arc;

use burnrate::aggregate::{ProfileRequest, Rag, Stats};
use burnrate::cache::{CacheStore, FileCache, Memoizer};
use burnrate::calendar::{DateWindow, Frequency, WorkCalendar};
use burnrate::error::{CalcError, Error};
use burnrate::model::{Phase, Snapshot, Subject};
use burnrate::{Config, Engine};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

const SNAPSHOT: &str = include_str!("../demos/snapshot.json");

const BOOKING: &str = "44444444-4444-4444-8444-444444444444";
const HOSTING: &str = "55555555-5555-4555-8555-555555555555";
const HIDDEN: &str = "77777777-7777-4777-8777-777777777777";
const GROUP: &str = "66666666-6666-4666-8666-666666666666";
const COURTS: &str = "33333333-3333-4333-8333-333333333333";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn id(raw: &str) -> Uuid {
    Uuid::parse_str(raw).unwrap()
}

fn holidays_2016() -> WorkCalendar {
    WorkCalendar::new([
        date(2016, 1, 1),
        date(2016, 3, 25),
        date(2016, 3, 28),
        date(2016, 5, 2),
        date(2016, 5, 30),
        date(2016, 8, 29),
        date(2016, 12, 26),
        date(2016, 12, 27),
    ])
}

fn engine_with(memo: Memoizer) -> Engine {
    let config = Config {
        today: Some(date(2017, 1, 1)),
        ..Config::default()
    };
    engine_configured(memo, config)
}

fn engine_configured(memo: Memoizer, config: Config) -> Engine {
    let snapshot = Snapshot::from_json(SNAPSHOT).unwrap();
    Engine::new(holidays_2016(), snapshot, memo, config)
}

fn engine() -> Engine {
    engine_with(Memoizer::in_memory())
}

fn summer() -> DateWindow {
    DateWindow::new(date(2016, 5, 1), date(2016, 6, 30))
}

#[test]
fn test_work_item_stats() {
    let engine = engine();
    let stats = engine
        .stats_between(Subject::WorkItem(id(BOOKING)), summer(), None)
        .unwrap();

    assert_eq!(
        stats,
        Stats::new(dec!(4000), dec!(3300), dec!(1200), dec!(8000), dec!(500))
    );
    assert_eq!(stats.total, dec!(8500));
    assert_eq!(stats.remaining, dec!(-500));
}

#[test]
fn test_group_is_sum_of_visible_members() {
    let engine = engine();
    let windows = [
        summer(),
        DateWindow::new(date(2016, 6, 1), date(2016, 7, 31)),
        DateWindow::new(date(2016, 1, 1), date(2016, 12, 31)),
    ];

    for window in windows {
        let group = engine.stats_between(Subject::Group(id(GROUP)), window, None).unwrap();
        let members = engine
            .stats_between(Subject::WorkItem(id(BOOKING)), window, None)
            .unwrap()
            + engine
                .stats_between(Subject::WorkItem(id(HOSTING)), window, None)
                .unwrap();
        assert_eq!(group, members, "window {}", window);
    }
}

#[test]
fn test_group_profile() {
    let engine = engine();
    let profile = engine
        .profile(
            Subject::Group(id(GROUP)),
            &ProfileRequest::new(Frequency::MonthStart),
        )
        .unwrap();

    assert_eq!(profile.name, "Court services");
    assert_eq!(profile.kind, "WorkItemGroup");
    assert_eq!(profile.first_date, Some(date(2016, 5, 1)));
    assert_eq!(profile.last_date, Some(date(2016, 7, 4)));
    assert_eq!(profile.cost_to_date, dec!(8750));
    assert_eq!(profile.financial_rag, Rag::Green);
    assert_eq!(profile.financial.time_frames.len(), 3);
    assert_eq!(
        profile.service_area.map(|area| area.name),
        Some("Courts".to_string())
    );
}

#[test]
fn test_work_item_profile_json() {
    let engine = engine();
    let profile = engine
        .profile(
            Subject::WorkItem(id(BOOKING)),
            &ProfileRequest::new(Frequency::MonthStart),
        )
        .unwrap();
    let json = serde_json::to_value(&profile).unwrap();

    assert_eq!(json["type"], "WorkItem");
    assert_eq!(json["phase"], "Ended");
    assert_eq!(json["financial_rag"], "AMBER");
    assert_eq!(json["status"]["status"], "at_risk");
    assert_eq!(json["links"][0]["type"], "github-com");
    assert_eq!(json["managers"]["product_manager"], "Ada Lovelace");
    assert_eq!(json["managers"]["service_manager"], "Grace Hopper");
    assert!(json["managers"].get("delivery_manager").is_none());
    assert!(json["financial"]["time_frames"]["2016-05-01~2016-05-31"].is_object());
    let june = &json["financial"]["time_frames"]["2016-06-01~2016-06-30"];
    let non_contractor: Decimal = june["non-contractor"].as_str().unwrap().parse().unwrap();
    assert_eq!(non_contractor, dec!(3300));
}

#[test]
fn test_area_profile_rolls_up_groups() {
    let engine = engine();
    let area = engine
        .area_profile(id(COURTS), &ProfileRequest::new(Frequency::MonthStart), None)
        .unwrap();

    assert_eq!(area.name, "Courts");
    let keys: Vec<&String> = area.work_items.keys().collect();
    assert_eq!(keys, vec![&format!("work-item-group:{}", GROUP)]);
    assert!(!area.work_items.contains_key(&format!("work-item:{}", HIDDEN)));
}

#[test]
fn test_contractor_filters_are_exclusive() {
    let engine = engine();
    let booking = Subject::WorkItem(id(BOOKING));

    assert_eq!(
        engine.people_costs(booking, summer(), true, false, None).unwrap(),
        dec!(4000)
    );
    assert!(matches!(
        engine.people_costs(booking, summer(), true, true, None),
        Err(Error::Calc(CalcError::Domain { .. }))
    ));
}

#[test]
fn test_current_fte() {
    let engine = engine();
    let booking = Subject::WorkItem(id(BOOKING));

    let june = engine
        .current_fte(booking, Some(date(2016, 6, 1)), Some(date(2016, 6, 30)))
        .unwrap();
    assert_eq!(june, dec!(0.5));

    // Nothing was booked in the last week of 2016.
    assert_eq!(engine.current_fte(booking, None, None).unwrap(), dec!(0));
}

#[test]
fn test_empty_work_item() {
    let json = r#"{"work_items": [
        {"id": "88888888-8888-4888-8888-888888888888", "name": "Empty"}
    ]}"#;
    let snapshot = Snapshot::from_json(json).unwrap();
    let engine = Engine::new(
        holidays_2016(),
        snapshot,
        Memoizer::in_memory(),
        Config::default(),
    );
    let empty = Subject::WorkItem(id("88888888-8888-4888-8888-888888888888"));

    let profile = engine
        .profile(empty, &ProfileRequest::new(Frequency::MonthStart))
        .unwrap();
    assert_eq!(profile.first_date, None);
    assert_eq!(profile.last_date, None);
    assert_eq!(profile.financial_rag, Rag::Green);
    assert_eq!(profile.cost_to_date, dec!(0));
    assert!(profile.financial.time_frames.is_empty());
}

#[tokio::test]
async fn test_warming_persists_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache").join("burnrate.json");
    let store = Arc::new(FileCache::open(&path, None).unwrap());
    let engine = Arc::new(engine_with(Memoizer::new(store)));

    let report = Arc::clone(&engine).regenerate_all().await.unwrap();
    assert_eq!(report.subjects, 3);
    assert!(report.failures.is_empty());

    let reopened = FileCache::open(&path, None).unwrap();
    assert_eq!(reopened.len(), engine.memo().len());
    assert!(!reopened.is_empty());

    // A warmed cache answers with the values a cold engine computes.
    let request = ProfileRequest::new(Frequency::MonthStart);
    let group = Subject::Group(id(GROUP));
    let warm = engine.profile(group, &request).unwrap();
    let cold = engine_with(Memoizer::in_memory()).profile(group, &request).unwrap();
    assert_eq!(warm, cold);
}

#[test]
fn test_cached_profile_depends_on_today_and_threshold() {
    let memo = Memoizer::in_memory();
    let request = ProfileRequest::new(Frequency::MonthStart);
    let booking = Subject::WorkItem(id(BOOKING));
    let earlier = Config {
        today: Some(date(2016, 5, 15)),
        amber_threshold: dec!(5),
        ..Config::default()
    };

    let late = engine_with(memo.clone()).profile(booking, &request).unwrap();
    assert_eq!(late.cost_to_date, dec!(8500));

    let early = engine_configured(memo.clone(), earlier.clone())
        .profile(booking, &request)
        .unwrap();
    let fresh = engine_configured(Memoizer::in_memory(), earlier)
        .profile(booking, &request)
        .unwrap();
    assert_eq!(early, fresh);
    assert_eq!(early.cost_to_date, dec!(100));
    assert_eq!(early.phase, Phase::Discovery);
}
