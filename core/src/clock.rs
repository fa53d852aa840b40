//! Wall clock: the single source of "now" for filters, generation and the cache.
//!
//! RULE: No module reads the system time directly. Everything asks the
//! engine's Clock, so tests can pin and advance time.

use chrono::{Duration, Local, NaiveDateTime};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    /// Current local wall time.
    fn now(&self) -> NaiveDateTime;
}

/// Reads the local system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    instant: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(instant: NaiveDateTime) -> Self {
        Self {
            instant: Mutex::new(instant),
        }
    }

    pub fn set(&self, instant: NaiveDateTime) {
        let mut guard = self.instant.lock().unwrap_or_else(|e| e.into_inner());
        *guard = instant;
    }

    /// Move the clock forward. Returns the new instant.
    pub fn advance(&self, by: Duration) -> NaiveDateTime {
        let mut guard = self.instant.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
        *guard
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.instant.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn fixed_clock_holds_until_advanced() {
        let clock = FixedClock::new(noon());
        assert_eq!(clock.now(), noon());
        assert_eq!(clock.now(), noon());

        let later = clock.advance(Duration::minutes(5));
        assert_eq!(later, noon() + Duration::minutes(5));
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn set_overrides_instant() {
        let clock = FixedClock::new(noon());
        let other = noon() - Duration::days(3);
        clock.set(other);
        assert_eq!(clock.now(), other);
    }
}
