//! Dashboard engine: caching, single-flight generation, reset and validation.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use dashboard_core::{
    clock::FixedClock,
    config::EngineConfig,
    engine::DashboardEngine,
    error::EngineError,
    filter::{FilterCriteria, TimeRange},
    region::RegionLevel,
};
use std::sync::Arc;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 15)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

fn engine_with(config: EngineConfig) -> (DashboardEngine, Arc<FixedClock>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let clock = Arc::new(FixedClock::new(start()));
    let engine = DashboardEngine::new(config, clock.clone()).expect("valid config");
    (engine, clock)
}

#[test]
fn world_is_lazy_and_generated_once() {
    let (engine, _) = engine_with(EngineConfig::default_test());
    assert_eq!(engine.generation_count(), 0);

    engine.initialize().unwrap();
    let a = engine.world().unwrap();
    let b = engine.world().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(engine.generation_count(), 1);
}

#[test]
fn fresh_entry_is_returned_without_recompute() {
    let (engine, clock) = engine_with(EngineConfig::default_test());
    let filters = FilterCriteria::new(TimeRange::Month);

    let first = engine.get_data(&filters).unwrap();
    clock.advance(Duration::seconds(120));
    let second = engine.get_data(&filters).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(engine.aggregation_count(), 1);
}

#[test]
fn expired_entry_is_recomputed() {
    let (engine, clock) = engine_with(EngineConfig::default_test());
    let filters = FilterCriteria::new(TimeRange::Month);

    let first = engine.get_data(&filters).unwrap();
    clock.advance(Duration::minutes(6));
    let second = engine.get_data(&filters).unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(engine.aggregation_count(), 2);
    assert_eq!(second.generated_at, start() + Duration::minutes(6));
    // Expiry never regenerates the world.
    assert_eq!(engine.generation_count(), 1);
}

#[test]
fn ttl_boundary_is_exclusive() {
    let (engine, clock) = engine_with(EngineConfig::default_test());
    let filters = FilterCriteria::default();

    let first = engine.get_data(&filters).unwrap();
    clock.advance(Duration::seconds(299));
    assert!(Arc::ptr_eq(&first, &engine.get_data(&filters).unwrap()));
    clock.advance(Duration::seconds(1));
    assert!(!Arc::ptr_eq(&first, &engine.get_data(&filters).unwrap()));
}

#[test]
fn equivalent_criteria_share_an_entry() {
    let (engine, _) = engine_with(EngineConfig::default_test());
    let blank_province = FilterCriteria {
        province: Some(String::new()),
        ..FilterCriteria::default()
    };

    let a = engine.get_data(&blank_province).unwrap();
    let b = engine.get_data(&FilterCriteria::default()).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(b.criteria.province, None);
    assert_eq!(b.criteria, FilterCriteria::default());

    let c = engine
        .get_data(&FilterCriteria::default().with_province("sichuan"))
        .unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(engine.aggregation_count(), 2);
}

#[test]
fn expired_keys_are_evicted_on_later_misses() {
    let (engine, clock) = engine_with(EngineConfig::default_test());
    for round in 0..200 {
        engine
            .get_data(&FilterCriteria::default().with_round(round))
            .unwrap();
        clock.advance(Duration::minutes(10));
    }
    assert_eq!(engine.cached_snapshots(), 1);
    assert_eq!(engine.aggregation_count(), 200);
}

#[test]
fn fresh_keys_survive_eviction() {
    let (engine, clock) = engine_with(EngineConfig::default_test());
    let early = FilterCriteria::new(TimeRange::Week);
    let first = engine.get_data(&early).unwrap();
    clock.advance(Duration::minutes(2));
    engine.get_data(&FilterCriteria::new(TimeRange::Year)).unwrap();

    assert_eq!(engine.cached_snapshots(), 2);
    assert!(Arc::ptr_eq(&first, &engine.get_data(&early).unwrap()));
}

#[test]
fn concurrent_first_access_runs_one_generation_and_one_aggregation() {
    let mut config = EngineConfig::default_test();
    config.simulated_latency_ms = 50;
    let (engine, _) = engine_with(config);
    let filters = FilterCriteria::new(TimeRange::Week);

    let snapshots: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| engine.get_data(&filters).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(engine.generation_count(), 1);
    assert_eq!(engine.aggregation_count(), 1);
    assert!(snapshots.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[test]
fn invalidate_cache_keeps_world() {
    let (engine, _) = engine_with(EngineConfig::default_test());
    let filters = FilterCriteria::default();
    let world = engine.world().unwrap();
    let first = engine.get_data(&filters).unwrap();

    engine.invalidate_cache().unwrap();
    let second = engine.get_data(&filters).unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&world, &engine.world().unwrap()));
    assert_eq!(engine.generation_count(), 1);
}

#[test]
fn reset_regenerates_same_world_from_seed() {
    let (engine, _) = engine_with(EngineConfig::default_test());
    let before = engine.world().unwrap();
    engine.get_data(&FilterCriteria::default()).unwrap();

    engine.reset().unwrap();
    let after = engine.world().unwrap();

    assert_eq!(engine.generation_count(), 2);
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(before.stores, after.stores);
    assert_eq!(before.transactions, after.transactions);
}

#[test]
fn region_children_are_served_from_world() {
    let (engine, _) = engine_with(EngineConfig::default_test());
    let cities = engine.region_children("guangdong", RegionLevel::City).unwrap();
    assert_eq!(cities.len(), 4);
    assert!(cities.iter().all(|c| c.parent_code.as_deref() == Some("guangdong")));
    assert!(engine
        .region_children("nowhere", RegionLevel::City)
        .unwrap()
        .is_empty());
}

#[test]
fn snapshot_echoes_criteria_and_clock() {
    let (engine, _) = engine_with(EngineConfig::default_test());
    let filters = FilterCriteria::new(TimeRange::Quarter).with_round(31);
    let snap = engine.get_data(&filters).unwrap();
    assert_eq!(snap.criteria, filters);
    assert_eq!(snap.generated_at, start());
    assert_eq!(snap.dividend.current_round, 31);
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let mut config = EngineConfig::default_test();
    config.dividend.weights.partners = 0.5;
    let err = DashboardEngine::new(config, Arc::new(FixedClock::new(start()))).err();
    assert!(matches!(err, Some(EngineError::InvalidConfig { .. })), "{err:?}");

    let mut config = EngineConfig::default_test();
    config.generation.daily_transactions.min = 40;
    config.generation.daily_transactions.max = 10;
    let err = DashboardEngine::new(config, Arc::new(FixedClock::new(start()))).err();
    assert!(matches!(err, Some(EngineError::InvalidConfig { field: "generation.daily_transactions", .. })));

    let mut config = EngineConfig::default_test();
    config.generation.transaction_amount.max = u64::MAX;
    let err = DashboardEngine::new(config, Arc::new(FixedClock::new(start()))).err();
    assert!(matches!(err, Some(EngineError::InvalidConfig { field: "generation.transaction_amount", .. })));

    let mut config = EngineConfig::default_test();
    config.cache_ttl_secs = 0;
    assert!(DashboardEngine::new(config, Arc::new(FixedClock::new(start()))).is_err());
}
