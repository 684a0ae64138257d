//! Simulated wall clock.

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use parking_lot::RwLock;
use pesopro_common::Timestamp;

/// Manually advanced clock shared by the session and the market.
#[derive(Debug)]
pub struct SimClock {
    now: RwLock<Timestamp>,
}

impl SimClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Noon UTC on `date`.
    pub fn noon_on(date: NaiveDate) -> Timestamp {
        Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN + Duration::hours(12)))
    }

    /// Clock starting at noon UTC on a fixed Friday.
    pub fn default_start() -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .map(Self::noon_on)
            .unwrap_or_else(pesopro_common::now)
    }

    pub fn now(&self) -> Timestamp {
        *self.now.read()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    pub fn advance(&self, by: Duration) -> Timestamp {
        let mut now = self.now.write();
        *now += by;
        *now
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(Self::default_start())
    }
}
