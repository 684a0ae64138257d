//! Rate and history provider traits and test implementations.

use async_trait::async_trait;
use chrono::NaiveDate;
use pesopro_common::{HistoryPoint, Rate};

use crate::error::FxResult;

/// Source of the latest quote-per-base rate.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Fetch the current rate.
    async fn fetch(&self) -> FxResult<Rate>;
}

/// Source of daily historical rates.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Fetch daily rates for the inclusive range `[start, end]`.
    ///
    /// Providers may return points in any order; callers normalize them.
    async fn fetch(&self, start: NaiveDate, end: NaiveDate) -> FxResult<Vec<HistoryPoint>>;
}

/// Mock rate provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateProvider {
    name: String,
    rate: parking_lot::Mutex<Option<Rate>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateProvider {
    /// Create a new mock provider that fails until a rate is set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rate: parking_lot::Mutex::new(None),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Set the rate returned by subsequent fetches.
    pub fn set_rate(&self, rate: Rate) {
        *self.rate.lock() = Some(rate);
    }

    /// Make subsequent fetches fail.
    pub fn set_offline(&self) {
        *self.rate.lock() = None;
    }

    /// Number of fetches made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateProvider for MockRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> FxResult<Rate> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        (*self.rate.lock()).ok_or_else(|| {
            crate::error::FxError::ProviderError(format!("{} is offline", self.name))
        })
    }
}

/// Mock history provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockHistoryProvider {
    name: String,
    points: parking_lot::Mutex<Option<Vec<HistoryPoint>>>,
    requests: parking_lot::Mutex<Vec<(NaiveDate, NaiveDate)>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockHistoryProvider {
    /// Create a new mock provider that fails until points are set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: parking_lot::Mutex::new(None),
            requests: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Set the points returned by subsequent fetches (filtered to the range).
    pub fn set_points(&self, points: Vec<HistoryPoint>) {
        *self.points.lock() = Some(points);
    }

    /// Make subsequent fetches fail.
    pub fn set_offline(&self) {
        *self.points.lock() = None;
    }

    /// Ranges requested so far.
    pub fn requests(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.requests.lock().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl HistoryProvider for MockHistoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, start: NaiveDate, end: NaiveDate) -> FxResult<Vec<HistoryPoint>> {
        self.requests.lock().push((start, end));
        match &*self.points.lock() {
            Some(points) => Ok(points
                .iter()
                .filter(|p| p.date >= start && p.date <= end)
                .copied()
                .collect()),
            None => Err(crate::error::FxError::ProviderError(format!(
                "{} is offline",
                self.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FxError;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_mock_rate_provider() {
        let provider = MockRateProvider::new("test");
        assert!(matches!(provider.fetch().await, Err(FxError::ProviderError(_))));

        let observed = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        provider.set_rate(Rate::new(17.05, observed).unwrap());

        let rate = provider.fetch().await.unwrap();
        assert_eq!(rate.value(), 17.05);
        assert_eq!(provider.calls(), 2);
    }

    #[test]
    fn test_mock_history_provider_filters_range() {
        let provider = MockHistoryProvider::new("test");
        provider.set_points(vec![
            HistoryPoint::new(day(1), 17.0),
            HistoryPoint::new(day(5), 17.1),
            HistoryPoint::new(day(9), 17.2),
        ]);

        let points = tokio_test::block_on(provider.fetch(day(2), day(9))).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, day(5));
        assert_eq!(provider.requests(), vec![(day(2), day(9))]);
    }
}
