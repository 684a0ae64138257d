//! Simulated USD/MXN market serving both provider traits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use parking_lot::Mutex;
use pesopro_common::{HistoryPoint, Rate};
use pesopro_fx::{FxError, FxResult, HistoryProvider, RateProvider};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::SimClock;

/// Faults that can be injected into the market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultType {
    /// Rate endpoint unreachable.
    RateOffline,
    /// History endpoint unreachable.
    HistoryOffline,
    /// Every request is delayed.
    Latency { delay_ms: u64 },
    /// History responses carry unusable rates.
    MalformedHistory,
}

#[derive(Debug, Clone, Copy, Default)]
struct Faults {
    rate_offline: bool,
    history_offline: bool,
    delay_ms: u64,
    malformed_history: bool,
}

/// Market parameters.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub seed: u64,
    pub base_rate: f64,
    /// Maximum relative move per fetch.
    pub volatility: f64,
    /// Probability that any request fails.
    pub failure_rate: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            base_rate: 17.05,
            volatility: 0.002,
            failure_rate: 0.0,
        }
    }
}

/// Seeded random-walk market with weekday-only daily history.
pub struct SimulatedMarket {
    config: MarketConfig,
    clock: Arc<SimClock>,
    rng: Mutex<StdRng>,
    current: Mutex<f64>,
    faults: Mutex<Faults>,
    rate_requests: AtomicUsize,
    history_requests: AtomicUsize,
}

impl SimulatedMarket {
    pub fn new(config: MarketConfig, clock: Arc<SimClock>) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(config.seed)),
            current: Mutex::new(config.base_rate),
            clock,
            config,
            faults: Mutex::new(Faults::default()),
            rate_requests: AtomicUsize::new(0),
            history_requests: AtomicUsize::new(0),
        }
    }

    pub fn inject(&self, fault: FaultType) {
        let mut faults = self.faults.lock();
        match fault {
            FaultType::RateOffline => faults.rate_offline = true,
            FaultType::HistoryOffline => faults.history_offline = true,
            FaultType::Latency { delay_ms } => faults.delay_ms = delay_ms,
            FaultType::MalformedHistory => faults.malformed_history = true,
        }
        warn!(?fault, "Injected market fault");
    }

    pub fn clear_faults(&self) {
        *self.faults.lock() = Faults::default();
        debug!("Cleared market faults");
    }

    pub fn rate_requests(&self) -> usize {
        self.rate_requests.load(Ordering::SeqCst)
    }

    pub fn history_requests(&self) -> usize {
        self.history_requests.load(Ordering::SeqCst)
    }

    /// Daily close for `date`; identical for every request of the same date.
    pub fn close_for(&self, date: NaiveDate) -> f64 {
        let mut rng = StdRng::seed_from_u64(self.config.seed ^ date.num_days_from_ce() as u64);
        let swing = self.config.volatility * 10.0;
        let drift = if swing > 0.0 {
            rng.gen_range(-swing..swing)
        } else {
            0.0
        };
        self.config.base_rate * (1.0 + drift)
    }

    async fn before_request(&self, offline: bool, endpoint: &str) -> FxResult<()> {
        let delay_ms = self.faults.lock().delay_ms;
        if delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        }

        if offline {
            return Err(FxError::ProviderError(format!("{} endpoint offline", endpoint)));
        }

        let roll: f64 = self.rng.lock().gen();
        if roll < self.config.failure_rate {
            return Err(FxError::ProviderError(format!(
                "{} endpoint returned a transient error",
                endpoint
            )));
        }
        Ok(())
    }

    fn step(&self) -> f64 {
        let volatility = self.config.volatility;
        let change = if volatility > 0.0 {
            self.rng.lock().gen_range(-volatility..volatility)
        } else {
            0.0
        };
        let mut current = self.current.lock();
        *current *= 1.0 + change;
        *current
    }
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[async_trait]
impl RateProvider for SimulatedMarket {
    fn name(&self) -> &str {
        "simulated-latest"
    }

    async fn fetch(&self) -> FxResult<Rate> {
        self.rate_requests.fetch_add(1, Ordering::SeqCst);
        let offline = self.faults.lock().rate_offline;
        self.before_request(offline, "latest").await?;

        let value = self.step();
        debug!(rate = value, "Market quoted rate");
        Ok(Rate::new(value, self.clock.now())?)
    }
}

#[async_trait]
impl HistoryProvider for SimulatedMarket {
    fn name(&self) -> &str {
        "simulated-daily"
    }

    async fn fetch(&self, start: NaiveDate, end: NaiveDate) -> FxResult<Vec<HistoryPoint>> {
        self.history_requests.fetch_add(1, Ordering::SeqCst);
        let (offline, malformed) = {
            let faults = self.faults.lock();
            (faults.history_offline, faults.malformed_history)
        };
        self.before_request(offline, "history").await?;

        let mut points: Vec<HistoryPoint> = start
            .iter_days()
            .take_while(|date| *date <= end)
            .filter(|date| is_weekday(*date))
            .map(|date| {
                let rate = if malformed { f64::NAN } else { self.close_for(date) };
                HistoryPoint::new(date, rate)
            })
            .collect();
        // The feed does not promise ordering.
        points.reverse();

        debug!(points = points.len(), %start, %end, "Market served history");
        Ok(points)
    }
}
