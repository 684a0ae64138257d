//! Rate and history acquisition with stale-while-revalidate caching.

use std::sync::Arc;

use chrono::NaiveDate;
use pesopro_common::time::{age, is_fresh, trailing_range, Timestamp};
use pesopro_common::{normalize_history, HistoryPoint, Rate};
use tracing::{debug, error, info, instrument, warn};

use crate::cache::{CachedRate, HistoryCache, RateCache, RateSource, StoreOutcome};
use crate::config::{FxServiceConfig, RefreshPolicy};
use crate::error::{FxError, FxResult};
use crate::provider::{HistoryProvider, RateProvider};
use crate::store::SharedStore;

/// Acquires the current rate and the history series, backed by two caches.
pub struct FxService {
    rate_provider: Arc<dyn RateProvider>,
    history_provider: Arc<dyn HistoryProvider>,
    rate_cache: RateCache,
    history_cache: HistoryCache,
    config: FxServiceConfig,
}

impl FxService {
    /// Create a new service persisting into `store`.
    pub fn new(
        rate_provider: Arc<dyn RateProvider>,
        history_provider: Arc<dyn HistoryProvider>,
        store: SharedStore,
        config: FxServiceConfig,
    ) -> Self {
        Self {
            rate_provider,
            history_provider,
            rate_cache: RateCache::with_window(store.clone(), config.rate_freshness),
            history_cache: HistoryCache::with_window(store, config.history_freshness),
            config,
        }
    }

    pub fn config(&self) -> &FxServiceConfig {
        &self.config
    }

    pub fn rate_cache(&self) -> &RateCache {
        &self.rate_cache
    }

    pub fn history_cache(&self) -> &HistoryCache {
        &self.history_cache
    }

    /// The best rate available without touching the network: the cached
    /// value, fresh or stale, else the fallback constant.
    pub fn snapshot_rate(&self, now: Timestamp) -> CachedRate {
        match self.rate_cache.load() {
            Ok(Some(cached)) => cached,
            Ok(None) => self.fallback(now),
            Err(e) => {
                warn!(error = %e, "Rate cache unreadable, using fallback");
                self.fallback(now)
            }
        }
    }

    /// Whether a load at `now` should go to the provider.
    pub fn needs_rate_refresh(&self, now: Timestamp) -> bool {
        match self.config.refresh_policy {
            RefreshPolicy::Always => true,
            RefreshPolicy::WhenStale => !self.rate_cache.is_fresh(now),
        }
    }

    /// Resolve the rate to display.
    ///
    /// A fresh cached value is served as is. Otherwise the provider is asked;
    /// on failure the stale cached value, or the fallback, is served.
    #[instrument(skip(self))]
    pub async fn resolve_rate(&self, now: Timestamp) -> CachedRate {
        let snapshot = self.snapshot_rate(now);
        if !self.needs_rate_refresh(now) {
            debug!(rate = snapshot.value, "Serving fresh cached rate");
            return snapshot;
        }

        match self.refresh_rate(now).await {
            Ok(rate) => rate,
            Err(e) if e.is_absorbed() => {
                warn!(
                    error = %e,
                    code = e.error_code(),
                    source = ?snapshot.source,
                    rate = snapshot.value,
                    age_minutes = age(snapshot.observed_at, now).num_minutes(),
                    "Rate refresh failed, serving best available rate"
                );
                snapshot
            }
            Err(e) => {
                error!(
                    error = %e,
                    code = e.error_code(),
                    rate = snapshot.value,
                    "Rate refresh could not be recorded, serving best available rate"
                );
                snapshot
            }
        }
    }

    /// Fetch a new rate and store it stamped with `requested_at`.
    ///
    /// If a newer record was stored while this fetch was outstanding, that
    /// record is returned instead.
    #[instrument(skip(self))]
    pub async fn refresh_rate(&self, requested_at: Timestamp) -> FxResult<CachedRate> {
        let rate = self.fetch_rate().await?;

        match self.rate_cache.store(rate, requested_at)? {
            StoreOutcome::Written => {
                info!(
                    provider = self.rate_provider.name(),
                    rate = rate.value(),
                    "Stored fresh rate"
                );
                Ok(CachedRate {
                    value: rate.value(),
                    observed_at: requested_at,
                    source: RateSource::Fresh,
                })
            }
            StoreOutcome::Superseded => self
                .rate_cache
                .load()?
                .ok_or_else(|| FxError::RateUnavailable("cache record vanished".to_string())),
        }
    }

    async fn fetch_rate(&self) -> FxResult<Rate> {
        let rate = self
            .rate_provider
            .fetch()
            .await
            .map_err(|e| FxError::RateUnavailable(e.to_string()))?;
        // Providers may hand back a rate deserialized around the constructor.
        Rate::new(rate.value(), rate.observed_at()).map_err(FxError::from)
    }

    /// Resolve the history series for the window ending `today`.
    ///
    /// A fresh cached series is served as is. Otherwise the provider is
    /// asked for `[today - history_days, today]`; a non-empty answer replaces
    /// the cache. On failure the series is empty, unless the config asks
    /// for the stale cached series to be kept.
    #[instrument(skip(self))]
    pub async fn resolve_history(&self, today: NaiveDate, now: Timestamp) -> Vec<HistoryPoint> {
        let cached = match self.history_cache.load() {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "History cache unreadable");
                None
            }
        };

        let fresh = cached
            .as_ref()
            .map(|entry| is_fresh(entry.stamped_at, now, self.history_cache.window()))
            .unwrap_or(false);
        if fresh && self.config.refresh_policy == RefreshPolicy::WhenStale {
            if let Some(entry) = cached {
                debug!(points = entry.value.len(), "Serving fresh cached history");
                return entry.value;
            }
        }

        match self.refresh_history(today, now).await {
            Ok(points) => points,
            Err(e) => {
                let served = if self.config.serve_stale_history {
                    cached.map(|entry| entry.value).unwrap_or_default()
                } else {
                    Vec::new()
                };
                warn!(
                    error = %e,
                    code = e.error_code(),
                    served_points = served.len(),
                    "History refresh failed"
                );
                served
            }
        }
    }

    /// Fetch the history window ending `today` and store it stamped with
    /// `requested_at`.
    #[instrument(skip(self))]
    pub async fn refresh_history(
        &self,
        today: NaiveDate,
        requested_at: Timestamp,
    ) -> FxResult<Vec<HistoryPoint>> {
        let (start, end) = trailing_range(today, self.config.history_days);
        let points = self
            .history_provider
            .fetch(start, end)
            .await
            .map_err(|e| FxError::HistoryUnavailable(e.to_string()))?;

        let points = normalize_history(points);
        if points.is_empty() {
            return Err(FxError::HistoryUnavailable(format!(
                "no points between {} and {}",
                start, end
            )));
        }

        match self.history_cache.store(points.clone(), requested_at)? {
            StoreOutcome::Written => {
                info!(
                    provider = self.history_provider.name(),
                    points = points.len(),
                    %start,
                    %end,
                    "Stored fresh history"
                );
                Ok(points)
            }
            StoreOutcome::Superseded => Ok(self
                .history_cache
                .load()?
                .map(|entry| entry.value)
                .unwrap_or(points)),
        }
    }

    fn fallback(&self, now: Timestamp) -> CachedRate {
        CachedRate {
            value: self.config.fallback_rate,
            observed_at: now,
            source: RateSource::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockHistoryProvider, MockRateProvider};
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};

    struct Harness {
        rates: Arc<MockRateProvider>,
        history: Arc<MockHistoryProvider>,
        service: FxService,
    }

    fn harness(config: FxServiceConfig) -> Harness {
        let rates = Arc::new(MockRateProvider::new("rates"));
        let history = Arc::new(MockHistoryProvider::new("history"));
        let service = FxService::new(
            rates.clone(),
            history.clone(),
            Arc::new(MemoryStore::new()),
            config,
        );
        Harness {
            rates,
            history,
            service,
        }
    }

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn rate(value: f64) -> Rate {
        Rate::new(value, t0()).unwrap()
    }

    fn series(days: &[(u32, f64)]) -> Vec<HistoryPoint> {
        days.iter()
            .map(|&(d, r)| HistoryPoint::new(NaiveDate::from_ymd_opt(2024, 3, d).unwrap(), r))
            .collect()
    }

    #[tokio::test]
    async fn test_cold_start_fetches_and_stores() {
        let h = harness(FxServiceConfig::default());
        h.rates.set_rate(rate(17.05));

        let resolved = h.service.resolve_rate(t0()).await;

        assert_eq!(resolved.value, 17.05);
        assert_eq!(resolved.source, RateSource::Fresh);
        assert!(h.service.rate_cache().is_fresh(t0() + Duration::hours(1)));
    }

    #[tokio::test]
    async fn test_cold_start_offline_uses_fallback() {
        let h = harness(FxServiceConfig::default());

        let resolved = h.service.resolve_rate(t0()).await;

        assert_eq!(resolved.value, 19.50);
        assert_eq!(resolved.source, RateSource::Fallback);
        assert!(h.service.rate_cache().load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_provider() {
        let h = harness(FxServiceConfig::default());
        h.rates.set_rate(rate(17.05));
        h.service.resolve_rate(t0()).await;

        h.rates.set_rate(rate(18.0));
        let resolved = h.service.resolve_rate(t0() + Duration::hours(2)).await;

        assert_eq!(resolved.value, 17.05);
        assert_eq!(resolved.source, RateSource::Cache);
        assert_eq!(h.rates.calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_cache_is_replaced_on_success() {
        let h = harness(FxServiceConfig::default());
        h.rates.set_rate(rate(17.05));
        h.service.resolve_rate(t0()).await;

        let later = t0() + Duration::hours(5);
        assert_eq!(h.service.snapshot_rate(later).value, 17.05);

        h.rates.set_rate(rate(17.40));
        let resolved = h.service.resolve_rate(later).await;

        assert_eq!(resolved.value, 17.40);
        assert_eq!(resolved.source, RateSource::Fresh);
        assert_eq!(h.service.rate_cache().load().unwrap().unwrap().observed_at, later);
    }

    #[tokio::test]
    async fn test_stale_cache_served_when_offline() {
        let h = harness(FxServiceConfig::default());
        h.rates.set_rate(rate(17.05));
        h.service.resolve_rate(t0()).await;

        h.rates.set_offline();
        let resolved = h.service.resolve_rate(t0() + Duration::days(3)).await;

        assert_eq!(resolved.value, 17.05);
        assert_eq!(resolved.source, RateSource::Cache);
    }

    #[tokio::test]
    async fn test_always_policy_revalidates_fresh_cache() {
        let config = FxServiceConfig {
            refresh_policy: RefreshPolicy::Always,
            ..Default::default()
        };
        let h = harness(config);
        h.rates.set_rate(rate(17.05));
        h.service.resolve_rate(t0()).await;

        h.rates.set_rate(rate(17.10));
        let resolved = h.service.resolve_rate(t0() + Duration::minutes(10)).await;

        assert_eq!(resolved.value, 17.10);
        assert_eq!(h.rates.calls(), 2);
    }

    #[tokio::test]
    async fn test_late_fetch_does_not_overwrite_newer() {
        let h = harness(FxServiceConfig::default());
        h.rates.set_rate(rate(17.30));
        h.service.refresh_rate(t0() + Duration::minutes(5)).await.unwrap();

        // A fetch that started earlier completes afterwards.
        h.rates.set_rate(rate(17.00));
        let late = h.service.refresh_rate(t0()).await.unwrap();

        assert_eq!(late.value, 17.30);
        assert_eq!(h.service.rate_cache().load().unwrap().unwrap().value, 17.30);
    }

    #[tokio::test]
    async fn test_history_requests_trailing_window() {
        let h = harness(FxServiceConfig::default());
        h.history.set_points(series(&[(1, 17.0), (4, 17.2), (15, 17.1)]));

        let points = h.service.resolve_history(today(), t0()).await;

        assert_eq!(points.len(), 3);
        let (start, end) = h.history.requests()[0];
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(end, today());
    }

    #[tokio::test]
    async fn test_fresh_history_served_from_cache() {
        let h = harness(FxServiceConfig::default());
        h.history.set_points(series(&[(1, 17.0), (4, 17.2)]));
        h.service.resolve_history(today(), t0()).await;

        h.history.set_offline();
        let points = h.service.resolve_history(today(), t0() + Duration::hours(23)).await;

        assert_eq!(points.len(), 2);
        assert_eq!(h.history.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_history_replaced_in_one_write() {
        let h = harness(FxServiceConfig::default());
        h.history.set_points(series(&[(1, 17.0), (4, 17.2)]));
        h.service.resolve_history(today(), t0()).await;

        let later = t0() + Duration::hours(25);
        h.history.set_points(series(&[(4, 17.2), (5, 17.3), (6, 17.4)]));
        let points = h.service.resolve_history(today(), later).await;

        assert_eq!(points.len(), 3);
        let entry = h.service.history_cache().load().unwrap().unwrap();
        assert_eq!(entry.stamped_at, later);
        assert_eq!(entry.value, points);
    }

    #[tokio::test]
    async fn test_history_failure_without_cache_is_empty() {
        let h = harness(FxServiceConfig::default());

        let points = h.service.resolve_history(today(), t0()).await;

        assert!(points.is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_drops_stale_history() {
        let h = harness(FxServiceConfig::default());
        h.history.set_points(series(&[(1, 17.0), (4, 17.2)]));
        h.service.resolve_history(today(), t0()).await;

        h.history.set_offline();
        let points = h.service.resolve_history(today(), t0() + Duration::hours(25)).await;

        assert!(points.is_empty());
        assert_eq!(h.history.requests().len(), 2);
        // The stale record stays on disk for the next successful refresh to replace.
        assert_eq!(h.service.history_cache().load().unwrap().unwrap().value.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_can_keep_stale_history() {
        let config = FxServiceConfig {
            serve_stale_history: true,
            ..Default::default()
        };
        let h = harness(config);
        h.history.set_points(series(&[(1, 17.0), (4, 17.2)]));
        h.service.resolve_history(today(), t0()).await;

        h.history.set_offline();
        let points = h.service.resolve_history(today(), t0() + Duration::hours(25)).await;

        assert_eq!(points, series(&[(1, 17.0), (4, 17.2)]));
    }

    #[tokio::test]
    async fn test_empty_history_is_not_cached() {
        let h = harness(FxServiceConfig::default());
        h.history.set_points(Vec::new());

        let points = h.service.resolve_history(today(), t0()).await;

        assert!(points.is_empty());
        assert!(h.service.history_cache().load().unwrap().is_none());
    }
}
