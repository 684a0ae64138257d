//! Monetary types for PesoPro.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;
use crate::time::Timestamp;

/// Conservative USD/MXN rate used when no rate has ever been obtained.
pub const FALLBACK_USD_MXN: f64 = 19.50;

/// ISO 4217 currency code. Only the two currencies of the converter are modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Mxn,
}

impl Currency {
    /// Get the currency code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Mxn => "MXN",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "MXN" => Ok(Currency::Mxn),
            other => Err(DomainError::UnsupportedCurrency(other.to_string())),
        }
    }
}

/// A currency pair. The rate is expressed as units of `quote` per one `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Base currency.
    pub base: Currency,
    /// Quote (pricing) currency.
    pub quote: Currency,
}

impl CurrencyPair {
    /// Create a new currency pair.
    pub fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }

    /// The pair the converter works with.
    pub fn usd_mxn() -> Self {
        Self::new(Currency::Usd, Currency::Mxn)
    }
}

impl Default for CurrencyPair {
    fn default() -> Self {
        Self::usd_mxn()
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Check that a rate value can be used as a divisor and multiplier.
pub fn validate_rate(value: f64) -> Result<f64, DomainError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(DomainError::InvalidRate(value))
    }
}

/// An observed exchange rate. Superseded by newer observations, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    /// Units of quote currency per one unit of base currency.
    value: f64,
    /// When the provider observed this rate.
    observed_at: Timestamp,
}

impl Rate {
    /// Create a new rate. Fails unless `value` is finite and positive.
    pub fn new(value: f64, observed_at: Timestamp) -> Result<Self, DomainError> {
        Ok(Self {
            value: validate_rate(value)?,
            observed_at,
        })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn observed_at(&self) -> Timestamp {
        self.observed_at
    }
}

/// A single historical daily rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Calendar date of the observation.
    pub date: NaiveDate,
    /// Quote per base on that date.
    pub rate: f64,
}

impl HistoryPoint {
    /// Create a new history point.
    pub fn new(date: NaiveDate, rate: f64) -> Self {
        Self { date, rate }
    }

    /// Whether the rate is usable for display.
    pub fn is_valid(&self) -> bool {
        validate_rate(self.rate).is_ok()
    }
}

/// Bring a provider series into canonical form: ascending dates, one point per
/// date (the last one wins), unusable rates dropped.
pub fn normalize_history(points: impl IntoIterator<Item = HistoryPoint>) -> Vec<HistoryPoint> {
    let mut points: Vec<HistoryPoint> = points.into_iter().filter(HistoryPoint::is_valid).collect();
    // Stable sort keeps provider order within a date so the later duplicate survives.
    points.sort_by_key(|p| p.date);

    let mut out: Vec<HistoryPoint> = Vec::with_capacity(points.len());
    for point in points {
        match out.last_mut() {
            Some(last) if last.date == point.date => *last = point,
            _ => out.push(point),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_rate_rejects_non_positive() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert!(Rate::new(19.5, now).is_ok());
        assert!(matches!(Rate::new(0.0, now), Err(DomainError::InvalidRate(_))));
        assert!(Rate::new(-1.0, now).is_err());
        assert!(Rate::new(f64::NAN, now).is_err());
        assert!(Rate::new(f64::INFINITY, now).is_err());
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!(" MXN ".parse::<Currency>().unwrap(), Currency::Mxn);
        assert!("EUR".parse::<Currency>().is_err());
        assert_eq!(CurrencyPair::usd_mxn().to_string(), "USD/MXN");
    }

    #[test]
    fn test_normalize_history() {
        let raw = vec![
            HistoryPoint::new(day(3), 17.2),
            HistoryPoint::new(day(1), 17.0),
            HistoryPoint::new(day(2), 0.0),
            HistoryPoint::new(day(3), 17.3),
            HistoryPoint::new(day(4), f64::NAN),
        ];

        let normalized = normalize_history(raw);

        assert_eq!(
            normalized,
            vec![HistoryPoint::new(day(1), 17.0), HistoryPoint::new(day(3), 17.3)]
        );
    }

    #[test]
    fn test_history_point_serializes_calendar_date() {
        let point = HistoryPoint::new(day(5), 17.1);
        let json = serde_json::to_string(&point).unwrap();
        assert_eq!(json, r#"{"date":"2024-03-05","rate":17.1}"#);
    }
}
