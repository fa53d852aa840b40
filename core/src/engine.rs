//! The dashboard engine: the single entry point for UI collaborators.
//!
//! REQUEST FLOW (fixed):
//!   1. World       (generated lazily, exactly once, behind a guard)
//!   2. Cache       (fresh entry for the criteria key → return it)
//!   3. Latency     (optional emulated network delay, misses only)
//!   4. Filter      (FilterEngine::apply against the world)
//!   5. Aggregate   (AggregationEngine::compute on the subset)
//!   6. Store       (cache entry stamped with the clock)
//!
//! RULES:
//!   - The engine is an owned value built by the composition root.
//!     There is no global state.
//!   - All time comes from the injected Clock, all randomness from the
//!     RngBank seeded by the config.
//!   - Configuration is validated in `new`; nothing later can fail on it.

use crate::{
    aggregation::AggregationEngine,
    cache::SnapshotCache,
    clock::{Clock, SystemClock},
    config::EngineConfig,
    error::{EngineError, EngineResult},
    filter::{FilterCriteria, FilterEngine},
    region::{Region, RegionLevel},
    rng::{RngBank, StreamSlot},
    snapshot::DashboardSnapshot,
    world::{World, WorldGenerator},
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

pub struct DashboardEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    rng_bank: RngBank,
    world: Mutex<Option<Arc<World>>>,
    cache: SnapshotCache,
    generations: AtomicU64,
    aggregations: AtomicU64,
}

impl DashboardEngine {
    /// Validate `config` and build an engine. The world is not generated yet.
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            rng_bank: RngBank::new(config.generation.seed),
            cache: SnapshotCache::new(config.cache_ttl(), Arc::clone(&clock)),
            world: Mutex::new(None),
            generations: AtomicU64::new(0),
            aggregations: AtomicU64::new(0),
            config,
            clock,
        })
    }

    /// Engine on the local system clock.
    pub fn with_system_clock(config: EngineConfig) -> EngineResult<Self> {
        Self::new(config, Arc::new(SystemClock))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generate the world if it does not exist yet. No-op afterwards.
    pub fn initialize(&self) -> EngineResult<()> {
        self.world().map(|_| ())
    }

    /// The world, generated on first access. Concurrent first callers
    /// wait on the guard; exactly one of them runs the generator.
    pub fn world(&self) -> EngineResult<Arc<World>> {
        let mut guard = self.world.lock().map_err(|_| EngineError::LockPoisoned {
            what: "world",
        })?;
        if let Some(world) = guard.as_ref() {
            return Ok(Arc::clone(world));
        }

        let world = Arc::new(WorldGenerator::new(&self.config.generation).generate(self.clock.now())?);
        self.generations.fetch_add(1, Ordering::SeqCst);
        *guard = Some(Arc::clone(&world));
        Ok(world)
    }

    /// The snapshot for `filters`, served from cache while fresh.
    pub fn get_data(&self, filters: &FilterCriteria) -> EngineResult<Arc<DashboardSnapshot>> {
        let world = self.world()?;
        self.cache.get_or_compute(filters, || {
            if let Some(latency) = self.config.simulated_latency() {
                std::thread::sleep(latency);
            }
            Ok(self.aggregate(&world, filters))
        })
    }

    /// Filter and aggregate without touching the cache.
    pub fn aggregate(&self, world: &World, filters: &FilterCriteria) -> DashboardSnapshot {
        let now = self.clock.now();
        let nonce = self.aggregations.fetch_add(1, Ordering::SeqCst);
        let mut rng = self.rng_bank.for_stream_at(StreamSlot::Display, nonce);
        let subset = FilterEngine::apply(world, filters, now);
        AggregationEngine::new(&self.config).compute(&subset, world, filters, now, &mut rng)
    }

    /// Child regions of `parent_code` at `level`, for region selectors.
    pub fn region_children(&self, parent_code: &str, level: RegionLevel) -> EngineResult<Vec<Region>> {
        Ok(self.world()?.region_children(parent_code, level))
    }

    /// Drop the world and every cached snapshot. The next request regenerates.
    pub fn reset(&self) -> EngineResult<()> {
        let mut guard = self.world.lock().map_err(|_| EngineError::LockPoisoned {
            what: "world",
        })?;
        *guard = None;
        self.cache.clear()?;
        log::info!("engine reset: world and snapshot cache dropped");
        Ok(())
    }

    pub fn invalidate_cache(&self) -> EngineResult<()> {
        self.cache.clear()
    }

    /// Number of criteria keys currently held by the snapshot cache.
    pub fn cached_snapshots(&self) -> usize {
        self.cache.len()
    }

    /// How many times the world has been generated.
    pub fn generation_count(&self) -> u64 {
        self.generations.load(Ordering::SeqCst)
    }

    /// How many aggregations have run (cache misses plus direct calls).
    pub fn aggregation_count(&self) -> u64 {
        self.aggregations.load(Ordering::SeqCst)
    }
}
