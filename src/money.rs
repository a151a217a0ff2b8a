//! Display formatting for integer currency amounts and shift timestamps.
//!
//! Amounts are always `i64` in the currency's minor unit; nothing here does
//! arithmetic beyond splitting whole and fractional parts.

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Fraction digits above this would overflow the `10^n` scale on large amounts.
const MAX_FRACTION_DIGITS: u8 = 6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SymbolPosition {
    Before,
    After,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyFormat {
    pub symbol: String,
    pub fraction_digits: u8,
    pub thousands_separator: char,
    pub decimal_separator: char,
    pub symbol_position: SymbolPosition,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self {
            symbol: "₫".to_string(),
            fraction_digits: 0,
            thousands_separator: '.',
            decimal_separator: ',',
            symbol_position: SymbolPosition::After,
        }
    }
}

/// Format an amount with grouping and the currency symbol, e.g. `755.000 ₫`.
pub fn format_amount(amount: i64, currency: &CurrencyFormat) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    with_symbol(sign, &format_number(amount.unsigned_abs(), currency), currency)
}

/// Like [`format_amount`] but always carries a sign; used for variances.
pub fn format_signed(amount: i64, currency: &CurrencyFormat) -> String {
    let sign = match amount {
        a if a > 0 => "+",
        a if a < 0 => "-",
        _ => "",
    };
    with_symbol(sign, &format_number(amount.unsigned_abs(), currency), currency)
}

/// Format a timestamp in the till's local offset as `dd/mm/yyyy HH:MM`.
pub fn format_time(at: DateTime<Utc>, utc_offset_minutes: i32) -> String {
    let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60))
        .unwrap_or_else(|| Utc.fix());
    at.with_timezone(&offset).format("%d/%m/%Y %H:%M").to_string()
}

/// Format a shift duration as `3h 05m`. Negative durations show as zero.
pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

fn format_number(magnitude: u64, currency: &CurrencyFormat) -> String {
    let digits = currency.fraction_digits.min(MAX_FRACTION_DIGITS);
    let scale = 10u64.pow(u32::from(digits));
    let mut out = group_thousands(magnitude / scale, currency.thousands_separator);
    if digits > 0 {
        out.push(currency.decimal_separator);
        out.push_str(&format!(
            "{:0width$}",
            magnitude % scale,
            width = usize::from(digits)
        ));
    }
    out
}

fn group_thousands(whole: u64, separator: char) -> String {
    let raw = whole.to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

fn with_symbol(sign: &str, number: &str, currency: &CurrencyFormat) -> String {
    match currency.symbol_position {
        SymbolPosition::Before => format!("{sign}{}{number}", currency.symbol),
        SymbolPosition::After => format!("{sign}{number} {}", currency.symbol),
    }
}
