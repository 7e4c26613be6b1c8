//! Normalization of raw statement rows into transaction candidates
//!
//! Dates are tried against a fixed list of formats, first match wins, with
//! day-first layouts ahead of month-first ones. Years must have four digits;
//! `01/02/24` is rejected rather than guessed.
//!
//! Amounts are cleaned of currency symbols, grouping commas and whitespace and
//! parsed into fixed-point [`Decimal`]s. An empty cell or a lone dash means
//! zero; any other non-numeric content rejects the row.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use tracing::trace;

use crate::db::models::TransactionCandidate;
use crate::error::RowRejection;
use crate::importers::extractor::RawRow;

/// Date-time layouts, checked before the date-only ones
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d-%b-%Y %H:%M:%S",
    "%d-%b-%Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d-%B-%Y",
    "%d %B %Y",
];

/// Cells that stand for "no amount"
const AMOUNT_PLACEHOLDERS: &[&str] = &["-", "--", "\u{2013}", "\u{2014}"];

/// Currency codes and abbreviations stripped from amount text
const CURRENCY_CODES: &[&str] = &["INR", "USD", "EUR", "GBP", "RS.", "RS", "R$"];

static FOUR_DIGIT_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|\D)\d{4}(\D|$)").expect("valid year regex"));

static PLAIN_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(\.\d*)?|\.\d+)$").expect("valid number regex"));

fn is_currency_symbol(c: char) -> bool {
    matches!(
        c,
        '$' | '€' | '£' | '₹' | '¥' | '₩' | '₽' | '₺' | '₫' | '฿' | '¢' | '₱' | '₦'
    )
}

/// Parse a statement date under the accepted formats
pub fn parse_date(text: &str) -> Result<NaiveDateTime, RowRejection> {
    let trimmed = text.trim();
    let reject = || RowRejection::UnparseableDate(trimmed.to_string());

    if trimmed.is_empty() || !FOUR_DIGIT_YEAR.is_match(trimmed) {
        return Err(reject());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0).ok_or_else(reject);
        }
    }

    Err(reject())
}

/// Parse a currency-like amount into a non-negative two-place decimal
///
/// The sign is dropped: the column (withdrawal or deposit) already carries the
/// direction, and some banks print debits as negative numbers.
pub fn parse_amount(text: &str, column: &'static str) -> Result<Decimal, RowRejection> {
    let trimmed = text.trim();
    if trimmed.is_empty() || AMOUNT_PLACEHOLDERS.contains(&trimmed) {
        return Ok(Decimal::ZERO);
    }

    let reject = || RowRejection::UnparseableAmount {
        column,
        value: trimmed.to_string(),
    };

    let compact: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect::<String>()
        .to_ascii_uppercase();

    let (negative, unsigned) = match compact.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, compact.as_str()),
    };
    let mut digits = unsigned;
    for &code in CURRENCY_CODES {
        if let Some(rest) = digits.strip_prefix(code) {
            digits = rest;
            break;
        }
        if let Some(rest) = digits.strip_suffix(code) {
            digits = rest;
            break;
        }
    }
    digits = digits
        .trim_start_matches(is_currency_symbol)
        .trim_end_matches(is_currency_symbol);
    // "Rs-12.00" puts the sign after the currency code
    let (negative, digits) = match digits.strip_prefix('-') {
        Some(rest) if !negative => (true, rest),
        _ => (negative, digits),
    };

    if !PLAIN_NUMBER.is_match(digits) {
        return Err(reject());
    }
    let literal = if digits.starts_with('.') {
        format!("0{}", digits)
    } else {
        digits.trim_end_matches('.').to_string()
    };
    let value = Decimal::from_str(&literal).map_err(|_| reject())?;
    if negative {
        trace!("Negative {} amount '{}' stored as magnitude", column, trimmed);
    }

    Ok(value
        .abs()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Converts raw rows into typed transaction candidates
#[derive(Debug, Clone, Default)]
pub struct RecordNormalizer {
    /// Lowercased narration fragments that mark summary lines
    skip_keywords: Vec<String>,
}

impl RecordNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter rows whose narration contains one of these keywords
    pub fn with_skip_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            skip_keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn normalize(
        &self,
        raw: &RawRow,
        account_id: i64,
    ) -> Result<TransactionCandidate, RowRejection> {
        let narration = raw.narration.trim().to_string();
        let withdrawal_amount = parse_amount(&raw.withdrawal, "withdrawal")?;
        let deposit_amount = parse_amount(&raw.deposit, "deposit")?;

        if withdrawal_amount.is_zero() && deposit_amount.is_zero() && narration.is_empty() {
            return Err(RowRejection::BlankRow);
        }
        // money moved but nothing says what for
        if narration.is_empty() {
            return Err(RowRejection::MissingNarration);
        }

        let lowered = narration.to_lowercase();
        if self.skip_keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return Err(RowRejection::SummaryRow(narration));
        }

        let occurred_at = parse_date(&raw.date)?;

        Ok(TransactionCandidate {
            account_id,
            occurred_at,
            narration,
            withdrawal_amount,
            deposit_amount,
            row_index: raw.row_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn raw(date: &str, narration: &str, withdrawal: &str, deposit: &str) -> RawRow {
        RawRow {
            row_index: 7,
            date: date.to_string(),
            narration: narration.to_string(),
            withdrawal: withdrawal.to_string(),
            deposit: deposit.to_string(),
        }
    }

    #[test]
    fn test_parse_date_iso() {
        assert_eq!(parse_date("2024-02-01").unwrap(), ymd(2024, 2, 1));
        assert_eq!(
            parse_date("2024-02-01T10:30:00").unwrap(),
            ymd(2024, 2, 1).with_hour_min(10, 30)
        );
        assert_eq!(
            parse_date("2024-02-01 10:30:00").unwrap(),
            ymd(2024, 2, 1).with_hour_min(10, 30)
        );
        assert_eq!(
            parse_date("2024-02-01T10:30:00Z").unwrap(),
            ymd(2024, 2, 1).with_hour_min(10, 30)
        );
    }

    #[test]
    fn test_parse_date_prefers_day_first() {
        assert_eq!(parse_date("03/02/2024").unwrap(), ymd(2024, 2, 3));
        assert_eq!(parse_date("01-02-2024").unwrap(), ymd(2024, 2, 1));
        assert_eq!(parse_date("01.02.2024").unwrap(), ymd(2024, 2, 1));
    }

    #[test]
    fn test_parse_date_falls_back_to_month_first() {
        // 25 cannot be a month, so only MM/DD/YYYY fits
        assert_eq!(parse_date("02/25/2024").unwrap(), ymd(2024, 2, 25));
        assert_eq!(
            parse_date("02/25/2024 08:15").unwrap(),
            ymd(2024, 2, 25).with_hour_min(8, 15)
        );
    }

    #[test]
    fn test_parse_date_month_names() {
        assert_eq!(parse_date("01-Feb-2024").unwrap(), ymd(2024, 2, 1));
        assert_eq!(parse_date("1 feb 2024").unwrap(), ymd(2024, 2, 1));
        assert_eq!(parse_date("15 March 2024").unwrap(), ymd(2024, 3, 15));
        assert_eq!(
            parse_date("01-Feb-2024 18:05").unwrap().format("%H:%M").to_string(),
            "18:05"
        );
    }

    #[test]
    fn test_parse_date_rejections() {
        assert_eq!(
            parse_date("31/13/2024"),
            Err(RowRejection::UnparseableDate("31/13/2024".into()))
        );
        assert!(parse_date("01/02/24").is_err());
        assert!(parse_date("").is_err());
        assert!(parse_date("Opening balance").is_err());
        assert!(parse_date("2024").is_err());
    }

    #[test]
    fn test_parse_amount_plain_and_formatted() {
        assert_eq!(parse_amount("4.50", "withdrawal").unwrap(), dec!(4.50));
        assert_eq!(parse_amount(" 2000 ", "deposit").unwrap(), dec!(2000));
        assert_eq!(parse_amount("1,23,456.78", "deposit").unwrap(), dec!(123456.78));
        assert_eq!(parse_amount("$1,234.56", "deposit").unwrap(), dec!(1234.56));
        assert_eq!(parse_amount("₹ 99.90", "deposit").unwrap(), dec!(99.90));
        assert_eq!(parse_amount("Rs. 500", "deposit").unwrap(), dec!(500));
        assert_eq!(parse_amount("250.00 INR", "deposit").unwrap(), dec!(250));
        assert_eq!(parse_amount(".5", "deposit").unwrap(), dec!(0.5));
    }

    #[test]
    fn test_parse_amount_sign_is_dropped() {
        assert_eq!(parse_amount("-4.50", "withdrawal").unwrap(), dec!(4.50));
        assert_eq!(parse_amount("-$12", "withdrawal").unwrap(), dec!(12));
        assert_eq!(parse_amount("Rs-12.00", "withdrawal").unwrap(), dec!(12));
    }

    #[test]
    fn test_parse_amount_placeholders_are_zero() {
        for text in ["", "   ", "-", "--", "\u{2013}", "\u{2014}"] {
            assert_eq!(parse_amount(text, "deposit").unwrap(), Decimal::ZERO, "{:?}", text);
        }
    }

    #[test]
    fn test_parse_amount_rounds_to_cents() {
        assert_eq!(parse_amount("10.005", "deposit").unwrap(), dec!(10.01));
        assert_eq!(parse_amount("10.004", "deposit").unwrap(), dec!(10.00));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        for text in ["abc", "12abc", "1.2.3", "--5", "N/A", "12-"] {
            assert_eq!(
                parse_amount(text, "withdrawal"),
                Err(RowRejection::UnparseableAmount {
                    column: "withdrawal",
                    value: text.to_string()
                }),
                "{:?}",
                text
            );
        }
    }

    #[test]
    fn test_normalize_accepts_single_sided_rows() {
        let normalizer = RecordNormalizer::new();
        let candidate = normalizer
            .normalize(&raw("01/02/2024", "  Coffee ", "4.50", ""), 42)
            .unwrap();
        assert_eq!(candidate.account_id, 42);
        assert_eq!(candidate.narration, "Coffee");
        assert_eq!(candidate.occurred_at, ymd(2024, 2, 1));
        assert_eq!(candidate.withdrawal_amount, dec!(4.50));
        assert_eq!(candidate.deposit_amount, Decimal::ZERO);
        assert_eq!(candidate.row_index, 7);
    }

    #[test]
    fn test_normalize_blank_row_is_filtered() {
        let normalizer = RecordNormalizer::new();
        assert_eq!(
            normalizer.normalize(&raw("01/02/2024", "", "", "-"), 1),
            Err(RowRejection::BlankRow)
        );
    }

    #[test]
    fn test_normalize_amount_without_narration_is_rejected() {
        let normalizer = RecordNormalizer::new();
        let result = normalizer.normalize(&raw("01/02/2024", "   ", "4.50", ""), 1);
        assert_eq!(result, Err(RowRejection::MissingNarration));
        assert!(!result.unwrap_err().is_filtered());
    }

    #[test]
    fn test_normalize_zero_amounts_with_narration_accepted() {
        let normalizer = RecordNormalizer::new();
        let candidate = normalizer
            .normalize(&raw("01/02/2024", "Cheque book issued", "", ""), 1)
            .unwrap();
        assert!(candidate.withdrawal_amount.is_zero());
        assert!(candidate.deposit_amount.is_zero());
    }

    #[test]
    fn test_normalize_rejects_malformed_amount_with_narration() {
        let normalizer = RecordNormalizer::new();
        let result = normalizer.normalize(&raw("01/02/2024", "Coffee", "four", ""), 1);
        assert!(matches!(result, Err(RowRejection::UnparseableAmount { .. })));
    }

    #[test]
    fn test_normalize_invalid_date() {
        let normalizer = RecordNormalizer::new();
        let result = normalizer.normalize(&raw("31/13/2024", "Coffee", "4.50", ""), 1);
        assert_eq!(result.unwrap_err().kind(), "UnparseableDate");
    }

    #[test]
    fn test_normalize_summary_keywords() {
        let normalizer = RecordNormalizer::with_skip_keywords(["Closing Balance", " "]);
        let result = normalizer.normalize(&raw("", "CLOSING BALANCE", "", "1995.50"), 1);
        assert_eq!(
            result,
            Err(RowRejection::SummaryRow("CLOSING BALANCE".to_string()))
        );
        assert!(normalizer
            .normalize(&raw("01/02/2024", "Coffee", "4.50", ""), 1)
            .is_ok());
    }

    trait WithHourMin {
        fn with_hour_min(self, hour: u32, min: u32) -> NaiveDateTime;
    }

    impl WithHourMin for NaiveDateTime {
        fn with_hour_min(self, hour: u32, min: u32) -> NaiveDateTime {
            self.date().and_hms_opt(hour, min, 0).unwrap()
        }
    }
}
