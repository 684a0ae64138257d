//! Two-field converter state machine.
//!
//! One side is edited as raw text, the other is derived from it through the
//! rate. Every keypad event is a transition `(state, event) -> state`.

use pesopro_common::{validate_rate, CurrencyPair};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{FxError, FxResult};
use crate::format::{format_amount, format_input_display, format_input_value, format_rate};

/// Keys are rejected once the raw input is longer than this.
pub const MAX_INPUT_LEN: usize = 10;

/// Amount shown when a session starts.
pub const DEFAULT_INPUT: &str = "10";

/// Which field of the converter is being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Base,
    Quote,
}

impl Side {
    pub fn other(&self) -> Self {
        match self {
            Side::Base => Side::Quote,
            Side::Quote => Side::Base,
        }
    }
}

/// A key on the converter keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypadKey {
    Digit(u8),
    Point,
    Delete,
    Clear,
}

impl KeypadKey {
    /// Map a typed character: digits, `.`, `<` (delete), `C` (clear).
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '0'..='9' => Some(KeypadKey::Digit(ch as u8 - b'0')),
            '.' => Some(KeypadKey::Point),
            '<' => Some(KeypadKey::Delete),
            'c' | 'C' => Some(KeypadKey::Clear),
            _ => None,
        }
    }

    /// Parse a key sequence, rejecting unknown characters.
    pub fn parse_sequence(keys: &str) -> FxResult<Vec<Self>> {
        keys.chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| {
                Self::from_char(c)
                    .ok_or_else(|| FxError::InvalidInput(format!("Unknown key '{}'", c)))
            })
            .collect()
    }
}

/// An input event for the converter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConverterEvent {
    Key(KeypadKey),
    SwitchSide(Side),
    RateUpdated(f64),
}

/// The two linked amounts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountPair {
    pub base: f64,
    pub quote: f64,
    pub active: Side,
}

impl AmountPair {
    pub fn get(&self, side: Side) -> f64 {
        match side {
            Side::Base => self.base,
            Side::Quote => self.quote,
        }
    }
}

/// Display text for both fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayAmounts {
    pub base: String,
    pub quote: String,
}

/// Converter session state.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionEngine {
    pair: CurrencyPair,
    active: Side,
    raw: String,
    rate: f64,
}

impl ConversionEngine {
    /// Start a session at `rate`, editing the quote side with the default amount.
    pub fn new(rate: f64) -> FxResult<Self> {
        Ok(Self {
            pair: CurrencyPair::usd_mxn(),
            active: Side::Quote,
            raw: DEFAULT_INPUT.to_string(),
            rate: validate_rate(rate)?,
        })
    }

    /// Start editing `side` with `raw` text.
    pub fn with_input(mut self, side: Side, raw: impl Into<String>) -> Self {
        self.active = side;
        self.raw = raw.into();
        self
    }

    pub fn active_side(&self) -> Side {
        self.active
    }

    pub fn raw_input(&self) -> &str {
        &self.raw
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Apply an event. Rejected keys leave the state unchanged.
    pub fn apply(&mut self, event: ConverterEvent) -> FxResult<bool> {
        match event {
            ConverterEvent::Key(KeypadKey::Digit(d)) if d <= 9 => {
                Ok(self.append_digit(char::from(b'0' + d)))
            }
            ConverterEvent::Key(KeypadKey::Digit(d)) => {
                Err(FxError::InvalidInput(format!("Digit out of range: {}", d)))
            }
            ConverterEvent::Key(KeypadKey::Point) => Ok(self.append_digit('.')),
            ConverterEvent::Key(KeypadKey::Delete) => {
                self.delete_last();
                Ok(true)
            }
            ConverterEvent::Key(KeypadKey::Clear) => {
                self.clear();
                Ok(true)
            }
            ConverterEvent::SwitchSide(side) => Ok(self.switch_active_side(side)),
            ConverterEvent::RateUpdated(rate) => {
                self.set_rate(rate)?;
                Ok(true)
            }
        }
    }

    /// Pure form of [`apply`](Self::apply).
    pub fn transition(mut self, event: ConverterEvent) -> FxResult<Self> {
        self.apply(event)?;
        Ok(self)
    }

    /// Append a digit or decimal point. Returns whether the key was accepted.
    pub fn append_digit(&mut self, ch: char) -> bool {
        let is_point = ch == '.';
        if !is_point && !ch.is_ascii_digit() {
            trace!(key = %ch, "Rejected non-numeric key");
            return false;
        }

        // A lone zero, or a small decimal left over from a side switch, is
        // replaced by the first digit typed.
        if !is_point && (self.raw == "0" || is_small_decimal(&self.raw)) {
            self.raw = ch.to_string();
            return true;
        }
        if is_point && self.raw.contains('.') {
            trace!("Rejected second decimal point");
            return false;
        }
        if self.raw.len() > MAX_INPUT_LEN {
            trace!(len = self.raw.len(), "Rejected key past maximum length");
            return false;
        }

        self.raw.push(ch);
        true
    }

    /// Remove the last character; an emptied field becomes `"0"`.
    pub fn delete_last(&mut self) {
        self.raw.pop();
        if self.raw.is_empty() {
            self.raw.push('0');
        }
    }

    /// Reset the edited field to `"0"`.
    pub fn clear(&mut self) {
        self.raw = "0".to_string();
    }

    /// Make `side` the edited field, carrying over its current value.
    /// Returns `false` when `side` is already active.
    pub fn switch_active_side(&mut self, side: Side) -> bool {
        if side == self.active {
            return false;
        }
        let carried = self.current_amounts().get(side);
        self.raw = format_input_value(carried);
        self.active = side;
        true
    }

    /// Replace the rate, keeping the text being edited and the active side.
    pub fn set_rate(&mut self, rate: f64) -> FxResult<()> {
        self.rate = validate_rate(rate)?;
        Ok(())
    }

    /// Numeric value of the raw text; anything unparseable is zero.
    pub fn input_value(&self) -> f64 {
        self.raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    /// Both amounts under the current rate.
    pub fn current_amounts(&self) -> AmountPair {
        let input = self.input_value();
        match self.active {
            Side::Base => AmountPair {
                base: input,
                quote: input * self.rate,
                active: Side::Base,
            },
            Side::Quote => AmountPair {
                base: input / self.rate,
                quote: input,
                active: Side::Quote,
            },
        }
    }

    /// Display text for both fields.
    pub fn display(&self) -> DisplayAmounts {
        let amounts = self.current_amounts();
        let edited = format_input_display(&self.raw);
        match self.active {
            Side::Base => DisplayAmounts {
                base: edited,
                quote: format_amount(amounts.quote),
            },
            Side::Quote => DisplayAmounts {
                base: format_amount(amounts.base),
                quote: edited,
            },
        }
    }

    /// Inverse rate label, e.g. `1 MXN ≈ 0.0513 USD`.
    pub fn inverse_rate_label(&self) -> String {
        format!(
            "1 {} ≈ {} {}",
            self.pair.quote,
            format_rate(1.0 / self.rate, 4),
            self.pair.base
        )
    }
}

/// Base amounts listed in the quick conversion table.
pub const QUICK_TABLE_AMOUNTS: [f64; 6] = [1.0, 5.0, 10.0, 20.0, 50.0, 100.0];

/// Quick conversion table rows: base amount and quote amount rounded to whole units.
pub fn quick_table(rate: f64) -> Vec<(f64, f64)> {
    QUICK_TABLE_AMOUNTS
        .iter()
        .map(|&amount| (amount, (amount * rate).round()))
        .collect()
}

/// `0.` followed by at least one digit and nothing else.
fn is_small_decimal(raw: &str) -> bool {
    raw.strip_prefix("0.")
        .map(|frac| !frac.is_empty() && frac.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}
