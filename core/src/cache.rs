//! Snapshot cache: TTL memoization keyed by canonical FilterCriteria.
//!
//! RULES:
//!   - An entry is fresh while `now - stored_at < ttl`. Fresh entries are
//!     returned as-is (same Arc), never recomputed.
//!   - Each key owns its own guard. Concurrent callers with the same key
//!     wait on that guard, so at most one computation per key runs at a
//!     time, and the waiters then read the fresh entry.
//!   - Different keys never wait on each other.
//!   - Every miss also evicts the expired entries of other keys, so the
//!     key space stays bounded by what was requested within one TTL.
//!   - A compute that panics leaves the previous entry untouched; the
//!     slot guard is recovered rather than reported as poisoned.

use crate::{
    clock::Clock,
    error::{EngineError, EngineResult},
    filter::FilterCriteria,
    snapshot::DashboardSnapshot,
};
use chrono::{Duration, NaiveDateTime};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, TryLockError},
};

struct CacheEntry<V> {
    value: Arc<V>,
    stored_at: NaiveDateTime,
}

type Slot<V> = Arc<Mutex<Option<CacheEntry<V>>>>;

pub struct SnapshotCache<V = DashboardSnapshot> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slots: Mutex<HashMap<String, Slot<V>>>,
}

impl<V> SnapshotCache<V> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the fresh entry for `criteria`, or run `compute` and store it.
    pub fn get_or_compute<F>(&self, criteria: &FilterCriteria, compute: F) -> EngineResult<Arc<V>>
    where
        F: FnOnce() -> EngineResult<V>,
    {
        let key = criteria.cache_key()?;
        let slot = self.slot(&key)?;
        let mut entry = slot.lock().unwrap_or_else(|e| e.into_inner());

        let now = self.clock.now();
        match entry.as_ref() {
            Some(cached) if now - cached.stored_at < self.ttl => {
                log::debug!("snapshot cache hit: {key}");
                return Ok(Arc::clone(&cached.value));
            }
            Some(_) => log::debug!("snapshot cache expired: {key}"),
            None => log::debug!("snapshot cache miss: {key}"),
        }

        self.purge_expired()?;
        let value = Arc::new(compute()?);
        *entry = Some(CacheEntry {
            value: Arc::clone(&value),
            stored_at: self.clock.now(),
        });
        Ok(value)
    }

    /// Drop every entry.
    pub fn clear(&self) -> EngineResult<()> {
        self.lock_slots()?.clear();
        Ok(())
    }

    /// Drop expired entries. Returns how many were removed.
    /// Slots another caller holds or is computing are left alone.
    pub fn purge_expired(&self) -> EngineResult<usize> {
        let now = self.clock.now();
        let mut slots = self.lock_slots()?;
        let before = slots.len();
        let fresh = |entry: &Option<CacheEntry<V>>| {
            entry
                .as_ref()
                .is_some_and(|cached| now - cached.stored_at < self.ttl)
        };
        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(entry) => fresh(&*entry),
                Err(TryLockError::Poisoned(poisoned)) => fresh(&*poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => true,
            }
        });
        let removed = before - slots.len();
        if removed > 0 {
            log::debug!("snapshot cache evicted {removed} expired entries");
        }
        Ok(removed)
    }

    /// Number of keys with a slot, fresh or not.
    pub fn len(&self) -> usize {
        self.lock_slots().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &str) -> EngineResult<Slot<V>> {
        let mut slots = self.lock_slots()?;
        Ok(Arc::clone(slots.entry(key.to_string()).or_default()))
    }

    fn lock_slots(&self) -> EngineResult<std::sync::MutexGuard<'_, HashMap<String, Slot<V>>>> {
        self.slots.lock().map_err(|_| EngineError::LockPoisoned {
            what: "snapshot cache index",
        })
    }
}
