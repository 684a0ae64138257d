//! PesoPro FX
//!
//! Rate acquisition, caching and conversion for the USD/MXN converter.
//!
//! # Features
//!
//! - Rate and history provider traits
//! - Single-slot persisted caches with freshness windows
//! - Stale-while-revalidate rate resolution with a fallback constant
//! - Keypad-driven two-field conversion state machine
//!
//! # Example
//!
//! ```rust,ignore
//! use pesopro_fx::{FxService, FxServiceConfig, MemoryStore, ConversionEngine};
//!
//! let service = FxService::new(rates, history, Arc::new(MemoryStore::new()), FxServiceConfig::default());
//!
//! // Best rate available right now, then the resolved one
//! let shown = service.snapshot_rate(now);
//! let rate = service.resolve_rate(now).await;
//!
//! let mut engine = ConversionEngine::new(rate.value)?;
//! engine.append_digit('5');
//! let display = engine.display();
//! ```

pub mod engine;
pub mod provider;
pub mod cache;
pub mod config;
pub mod conversion;
pub mod format;
pub mod store;
pub mod error;

pub use engine::FxService;
pub use provider::{HistoryProvider, RateProvider};
pub use cache::{CachedRate, Entry, HistoryCache, RateCache, RateSource, StoreOutcome, TimestampedCache};
pub use config::{FxServiceConfig, RefreshPolicy};
pub use conversion::{AmountPair, ConversionEngine, ConverterEvent, DisplayAmounts, KeypadKey, Side};
pub use store::{FileStore, KeyValueStore, MemoryStore, SharedStore};
pub use error::{FxError, FxResult};
