//! Display formatting for converter amounts and rates.

/// Group an unsigned run of integer digits with commas (`1234567` -> `1,234,567`).
fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Strip redundant leading zeros, keeping a single `0` for zero.
fn trim_leading_zeros(digits: &str) -> &str {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0"
    } else {
        trimmed
    }
}

/// Format a computed amount: thousands grouping and 0 to 2 fraction digits.
pub fn format_amount(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return "0".to_string();
    }

    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut out = String::new();
    if value < 0.0 && (int_part != "0" || !frac_part.is_empty()) {
        out.push('-');
    }
    out.push_str(&group_digits(int_part));
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Format the text being edited: grouping on the integer part only, the
/// fraction exactly as typed, a trailing decimal point kept.
pub fn format_input_display(raw: &str) -> String {
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (raw, None),
    };

    if !int_part.chars().all(|c| c.is_ascii_digit()) {
        return raw.to_string();
    }

    let mut out = group_digits(trim_leading_zeros(int_part));
    if let Some(frac_part) = frac_part {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Editable text for a computed value: up to 10 fraction digits, trailing
/// zeros and a bare decimal point removed.
pub fn format_input_value(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return "0".to_string();
    }

    let fixed = format!("{:.10}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Format a rate with a fixed number of decimals.
pub fn format_rate(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

/// Size tier for rendering display text, by digit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayTier {
    /// Up to 6 digits.
    Large,
    /// 7 to 8 digits.
    Medium,
    /// 9 to 10 digits.
    Small,
    /// More than 10 digits.
    Compact,
}

impl DisplayTier {
    /// Classify display text by the number of digits it contains.
    pub fn for_text(text: &str) -> Self {
        match text.chars().filter(|c| c.is_ascii_digit()).count() {
            0..=6 => DisplayTier::Large,
            7..=8 => DisplayTier::Medium,
            9..=10 => DisplayTier::Small,
            _ => DisplayTier::Compact,
        }
    }
}
