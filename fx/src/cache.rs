//! Single-slot persisted caches with freshness windows.

use std::marker::PhantomData;

use chrono::Duration;
use parking_lot::Mutex;
use pesopro_common::time::{self, constants, Timestamp};
use pesopro_common::{normalize_history, validate_rate, HistoryPoint, Rate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::FxResult;
use crate::store::SharedStore;

/// Store key of the current-rate record.
pub const RATE_KEY: &str = "pesopro.rate";

/// Store key of the history record.
pub const HISTORY_KEY: &str = "pesopro.history_15d";

/// A cached value together with the time it was stamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<T> {
    pub value: T,
    pub stamped_at: Timestamp,
}

/// Outcome of a store attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The record was replaced.
    Written,
    /// A record with a newer stamp was already present; nothing was written.
    Superseded,
}

/// One persisted value with a timestamp, stored as a single record under a
/// single key so value and stamp are always replaced together.
pub struct TimestampedCache<T> {
    key: String,
    window: Duration,
    store: SharedStore,
    write_lock: Mutex<()>,
    _value: PhantomData<fn() -> T>,
}

impl<T> TimestampedCache<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Create a cache slot under `key` with the given freshness window.
    pub fn new(store: SharedStore, key: impl Into<String>, window: Duration) -> Self {
        Self {
            key: key.into(),
            window,
            store,
            write_lock: Mutex::new(()),
            _value: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Load the record. Unreadable records are logged and treated as absent.
    pub fn load(&self) -> FxResult<Option<Entry<T>>> {
        let Some(raw) = self.store.get(&self.key)? else {
            debug!(key = %self.key, "Cache miss");
            return Ok(None);
        };

        match serde_json::from_str::<Entry<T>>(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Discarding unreadable cache record");
                Ok(None)
            }
        }
    }

    /// Whether `entry` is within the window at `now`.
    pub fn is_entry_fresh(&self, entry: &Entry<T>, now: Timestamp) -> bool {
        time::is_fresh(entry.stamped_at, now, self.window)
    }

    /// Whether a record exists and is within the window at `now`.
    pub fn is_fresh(&self, now: Timestamp) -> FxResult<bool> {
        Ok(self
            .load()?
            .map(|entry| self.is_entry_fresh(&entry, now))
            .unwrap_or(false))
    }

    /// Replace the record unless the stored one carries a newer stamp.
    pub fn store(&self, value: T, stamped_at: Timestamp) -> FxResult<StoreOutcome> {
        let _guard = self.write_lock.lock();

        if let Some(existing) = self.load()? {
            if existing.stamped_at > stamped_at {
                debug!(
                    key = %self.key,
                    existing = %existing.stamped_at,
                    incoming = %stamped_at,
                    "Keeping newer cache record"
                );
                return Ok(StoreOutcome::Superseded);
            }
        }

        let body = serde_json::to_string(&Entry { value, stamped_at })?;
        self.store.set(&self.key, body)?;
        debug!(key = %self.key, stamped_at = %stamped_at, "Cache record written");
        Ok(StoreOutcome::Written)
    }

    /// Delete the record.
    pub fn clear(&self) -> FxResult<()> {
        let _guard = self.write_lock.lock();
        self.store.remove(&self.key)
    }
}

/// Where a served rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    /// Read from the cache (fresh or stale).
    Cache,
    /// Fetched from the provider during this load.
    Fresh,
    /// Fixed conservative constant; no rate was ever obtained.
    Fallback,
}

/// A rate ready for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedRate {
    /// Quote per base.
    pub value: f64,
    /// When the value was stored (or observed, for fresh values).
    pub observed_at: Timestamp,
    pub source: RateSource,
}

impl CachedRate {
    /// Whether the value is within `window` at `now`.
    pub fn is_fresh(&self, now: Timestamp, window: Duration) -> bool {
        time::is_fresh(self.observed_at, now, window)
    }
}

/// Cache of the current rate, fresh for four hours by default.
pub struct RateCache {
    inner: TimestampedCache<Rate>,
}

impl RateCache {
    pub fn new(store: SharedStore) -> Self {
        Self::with_window(store, constants::rate_freshness_window())
    }

    pub fn with_window(store: SharedStore, window: Duration) -> Self {
        Self {
            inner: TimestampedCache::new(store, RATE_KEY, window),
        }
    }

    /// Load the cached rate, `None` if never written or unusable.
    pub fn load(&self) -> FxResult<Option<CachedRate>> {
        Ok(self.inner.load()?.and_then(|entry| {
            match validate_rate(entry.value.value()) {
                Ok(value) => Some(CachedRate {
                    value,
                    observed_at: entry.stamped_at,
                    source: RateSource::Cache,
                }),
                Err(e) => {
                    warn!(error = %e, "Ignoring cached rate");
                    None
                }
            }
        }))
    }

    /// Whether a usable rate is cached and younger than the window at `now`.
    pub fn is_fresh(&self, now: Timestamp) -> bool {
        match self.load() {
            Ok(Some(cached)) => cached.is_fresh(now, self.inner.window()),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Rate cache unreadable");
                false
            }
        }
    }

    /// Persist `rate` stamped with `now`.
    pub fn store(&self, rate: Rate, now: Timestamp) -> FxResult<StoreOutcome> {
        self.inner.store(rate, now)
    }

    pub fn window(&self) -> Duration {
        self.inner.window()
    }

    pub fn clear(&self) -> FxResult<()> {
        self.inner.clear()
    }
}

/// Cache of the trailing history series, fresh for 24 hours by default.
pub struct HistoryCache {
    inner: TimestampedCache<Vec<HistoryPoint>>,
}

impl HistoryCache {
    pub fn new(store: SharedStore) -> Self {
        Self::with_window(store, constants::history_freshness_window())
    }

    pub fn with_window(store: SharedStore, window: Duration) -> Self {
        Self {
            inner: TimestampedCache::new(store, HISTORY_KEY, window),
        }
    }

    /// Load the cached series in canonical order.
    pub fn load(&self) -> FxResult<Option<Entry<Vec<HistoryPoint>>>> {
        Ok(self.inner.load()?.map(|entry| Entry {
            value: normalize_history(entry.value),
            stamped_at: entry.stamped_at,
        }))
    }

    pub fn is_fresh(&self, now: Timestamp) -> bool {
        match self.load() {
            Ok(Some(entry)) => self.inner.is_entry_fresh(&entry, now),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "History cache unreadable");
                false
            }
        }
    }

    /// Persist `points` stamped with `now`.
    pub fn store(&self, points: Vec<HistoryPoint>, now: Timestamp) -> FxResult<StoreOutcome> {
        self.inner.store(normalize_history(points), now)
    }

    pub fn window(&self) -> Duration {
        self.inner.window()
    }

    pub fn clear(&self) -> FxResult<()> {
        self.inner.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyValueStore, MemoryStore};
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::sync::Arc;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn rate(value: f64) -> Rate {
        Rate::new(value, t0()).unwrap()
    }

    #[test]
    fn test_rate_cache_absent() {
        let cache = RateCache::new(Arc::new(MemoryStore::new()));
        assert!(cache.load().unwrap().is_none());
        assert!(!cache.is_fresh(t0()));
    }

    #[test]
    fn test_rate_cache_freshness_window() {
        let cache = RateCache::new(Arc::new(MemoryStore::new()));
        cache.store(rate(17.1), t0()).unwrap();

        assert!(cache.is_fresh(t0() + Duration::hours(3) + Duration::minutes(59)));
        assert!(!cache.is_fresh(t0() + Duration::hours(4) + Duration::minutes(1)));

        let cached = cache.load().unwrap().unwrap();
        assert_eq!(cached.value, 17.1);
        assert_eq!(cached.observed_at, t0());
        assert_eq!(cached.source, RateSource::Cache);
    }

    #[test]
    fn test_store_writes_value_and_stamp_as_one_record() {
        let store = Arc::new(MemoryStore::new());
        let cache = RateCache::new(store.clone());
        cache.store(rate(17.1), t0()).unwrap();

        assert_eq!(store.len(), 1);
        let raw = store.get(RATE_KEY).unwrap().unwrap();
        let entry: Entry<Rate> = serde_json::from_str(&raw).unwrap();
        assert_eq!(entry.value.value(), 17.1);
        assert_eq!(entry.stamped_at, t0());
    }

    #[test]
    fn test_older_write_does_not_replace_newer() {
        let cache = RateCache::new(Arc::new(MemoryStore::new()));

        let newer = cache.store(rate(17.3), t0() + Duration::minutes(10)).unwrap();
        let older = cache.store(rate(17.0), t0()).unwrap();

        assert_eq!(newer, StoreOutcome::Written);
        assert_eq!(older, StoreOutcome::Superseded);
        assert_eq!(cache.load().unwrap().unwrap().value, 17.3);
    }

    #[test]
    fn test_unreadable_record_is_absent() {
        let store = Arc::new(MemoryStore::new());
        store.set(RATE_KEY, "19.5".to_string()).unwrap();

        let cache = RateCache::new(store);
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn test_history_cache_round_trip() {
        let cache = HistoryCache::new(Arc::new(MemoryStore::new()));
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();

        cache
            .store(
                vec![HistoryPoint::new(d(2), 17.2), HistoryPoint::new(d(1), 17.1)],
                t0(),
            )
            .unwrap();

        let entry = cache.load().unwrap().unwrap();
        assert_eq!(entry.value[0].date, d(1));
        assert_eq!(entry.value.len(), 2);
        assert!(cache.is_fresh(t0() + Duration::hours(23)));
        assert!(!cache.is_fresh(t0() + Duration::hours(25)));
    }

    #[test]
    fn test_clear() {
        let cache = TimestampedCache::<u32>::new(
            Arc::new(MemoryStore::new()),
            "counter",
            Duration::minutes(1),
        );
        cache.store(7, t0()).unwrap();
        assert!(cache.is_fresh(t0()).unwrap());

        cache.clear().unwrap();
        assert!(cache.load().unwrap().is_none());
    }
}
