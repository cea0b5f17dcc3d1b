//! Utility functions for formatting and common operations
//!
//! Centralized formatting helpers so currency and share values render
//! consistently across CLI tables.

use rust_decimal::Decimal;

/// Format a Decimal as US-locale currency: "$1,234.56", "-$500.00".
pub fn format_usd(value: Decimal) -> String {
    let is_negative = value < Decimal::ZERO;
    let abs_value = value.abs();

    let formatted = format!("{:.2}", abs_value);
    let parts: Vec<&str> = formatted.split('.').collect();

    let integer_part = parts[0];
    let decimal_part = parts.get(1).unwrap_or(&"00");

    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec![',', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative { "-" } else { "" };
    format!("{}${}.{}", sign, with_separators, decimal_part)
}

/// Format a share quantity with up to four decimal places, trailing zeros
/// trimmed ("10", "4.8", "0.3333").
pub fn format_shares(value: Decimal) -> String {
    let rounded = value.round_dp(4).normalize();
    rounded.to_string()
}
