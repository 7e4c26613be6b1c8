//! Utility functions for formatting amounts in terminal output

use rust_decimal::Decimal;

/// Formats a Decimal with `,` thousands separators and two decimal places,
/// right-aligned to `width` (0 for no padding).
///
/// # Examples
/// ```
/// use pocketbook::utils::format_amount_with_width;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_amount_with_width(dec!(1234.56), 0), "1,234.56");
/// assert_eq!(format_amount_with_width(dec!(1234), 12), "    1,234.00");
/// ```
pub fn format_amount_with_width(value: Decimal, width: usize) -> String {
    let is_negative = value < Decimal::ZERO;
    let formatted = format!("{:.2}", value.abs());
    let (integer_part, decimal_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

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
    let result = format!("{}{}.{}", sign, with_separators, decimal_part);

    if width > 0 && result.len() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// "1,234.56"
pub fn format_amount(value: Decimal) -> String {
    format_amount_with_width(value, 0)
}

/// Blank for zero, so a withdrawal/deposit column reads like a statement
pub fn format_amount_or_blank(value: Decimal) -> String {
    if value.is_zero() {
        String::new()
    } else {
        format_amount(value)
    }
}
