//! Simulation metrics.

use pesopro_fx::RateSource;
use serde::Serialize;

/// Counters collected over a session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationMetrics {
    /// Rate loads performed.
    pub rate_loads: u64,
    /// Loads answered from the cache.
    pub cache_hits: u64,
    /// Loads answered by a fresh fetch.
    pub fresh_fetches: u64,
    /// Loads that fell back to the constant rate.
    pub fallbacks: u64,
    /// History loads performed.
    pub history_loads: u64,
    /// History loads that came back empty.
    pub empty_histories: u64,
    /// Keys accepted by the converter.
    pub keys_accepted: u64,
    /// Keys rejected by the converter.
    pub keys_rejected: u64,
    pub assertions_passed: u64,
    pub assertions_failed: u64,
}

impl SimulationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_rate(&mut self, source: RateSource) {
        self.rate_loads += 1;
        match source {
            RateSource::Cache => self.cache_hits += 1,
            RateSource::Fresh => self.fresh_fetches += 1,
            RateSource::Fallback => self.fallbacks += 1,
        }
    }

    pub fn record_history(&mut self, points: usize) {
        self.history_loads += 1;
        if points == 0 {
            self.empty_histories += 1;
        }
    }

    pub fn record_key(&mut self, accepted: bool) {
        if accepted {
            self.keys_accepted += 1;
        } else {
            self.keys_rejected += 1;
        }
    }

    pub fn record_assertion(&mut self, passed: bool) {
        if passed {
            self.assertions_passed += 1;
        } else {
            self.assertions_failed += 1;
        }
    }

    /// Share of rate loads served from the cache.
    pub fn cache_hit_ratio(&self) -> f64 {
        if self.rate_loads == 0 {
            return 0.0;
        }

        self.cache_hits as f64 / self.rate_loads as f64
    }

    /// Fold another session's counters into this one.
    pub fn merge(&mut self, other: &SimulationMetrics) {
        self.rate_loads += other.rate_loads;
        self.cache_hits += other.cache_hits;
        self.fresh_fetches += other.fresh_fetches;
        self.fallbacks += other.fallbacks;
        self.history_loads += other.history_loads;
        self.empty_histories += other.empty_histories;
        self.keys_accepted += other.keys_accepted;
        self.keys_rejected += other.keys_rejected;
        self.assertions_passed += other.assertions_passed;
        self.assertions_failed += other.assertions_failed;
    }
}
