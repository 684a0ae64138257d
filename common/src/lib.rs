//! PesoPro Common Types
//!
//! Shared types for the PesoPro converter: the USD/MXN currency pair,
//! observed rates, historical points and time/freshness helpers.

pub mod monetary;
pub mod error;
pub mod time;

pub use monetary::*;
pub use error::*;
pub use time::{Timestamp, now};
