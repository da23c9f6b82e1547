//! Amount, phone and locale formatting for gateway payloads.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::consts::{CURRENCY_DECIMALS, DEFAULT_CURRENCY_DECIMALS, DEFAULT_LOCALE, LOCALE_MAPPING};

/// Placeholder for the gateway's required phone field when none is known.
const PLACEHOLDER_PHONE: &str = "+905000000000";

/// Format an amount as the fixed-point decimal string the gateway expects,
/// using the decimal places registered for the currency (2 if unknown).
/// Rounding is half-up: 99.999 TRY becomes "100.00".
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let decimals = CURRENCY_DECIMALS
        .get(currency)
        .copied()
        .unwrap_or(DEFAULT_CURRENCY_DECIMALS);
    let rounded = amount.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", decimals as usize, rounded)
}

/// Normalize a phone number: keep digits and a leading `+`; numbers without
/// a country code are assumed Turkish (`0xxx` -> `+9xxx`, bare digits get
/// `+90`). Empty input yields a fixed placeholder.
pub fn format_phone(raw: &str) -> String {
    if raw.is_empty() {
        return PLACEHOLDER_PHONE.to_string();
    }

    let cleaned: String = raw
        .chars()
        .enumerate()
        .filter(|(i, c)| c.is_ascii_digit() || (*c == '+' && *i == 0))
        .map(|(_, c)| c)
        .collect();

    if cleaned.is_empty() {
        return PLACEHOLDER_PHONE.to_string();
    }
    if cleaned.starts_with('+') {
        return cleaned;
    }
    if cleaned.starts_with('0') {
        format!("+9{}", cleaned)
    } else {
        format!("+90{}", cleaned)
    }
}

/// Map a host language tag to the gateway locale code, falling back to the
/// default locale for unknown tags.
pub fn resolve_locale(language_tag: &str) -> &'static str {
    LOCALE_MAPPING
        .get(language_tag)
        .copied()
        .unwrap_or(DEFAULT_LOCALE)
}
