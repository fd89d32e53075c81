//! Custom test assertions
//!
//! Specialized assertion helpers for domain types that give more
//! meaningful error messages than standard assertions.

use rust_decimal::Decimal;

use domain_reporting::ReportNumber;

/// Asserts decimal equality with both values in the failure message
pub fn assert_decimal_eq(actual: Decimal, expected: Decimal, context: &str) {
    assert_eq!(
        actual, expected,
        "{context}: expected {expected}, got {actual}"
    );
}

/// Asserts that a string is a well-formed AMLO report number
pub fn assert_valid_amlo_number(raw: &str) {
    let parsed = ReportNumber::parse(raw)
        .unwrap_or_else(|e| panic!("'{raw}' is not a valid report number: {e}"));
    assert!(
        parsed.currency.is_some(),
        "'{raw}' parses but lacks the AMLO currency suffix"
    );
}

/// Asserts that a string is a well-formed BOT report number
pub fn assert_valid_bot_number(raw: &str) {
    let parsed = ReportNumber::parse(raw)
        .unwrap_or_else(|e| panic!("'{raw}' is not a valid report number: {e}"));
    assert!(
        parsed.currency.is_none(),
        "'{raw}' carries a currency suffix; BOT numbers have none"
    );
}

/// Asserts that report numbers are strictly increasing in sequence
pub fn assert_sequence_strictly_increasing(numbers: &[String]) {
    let mut previous: Option<u32> = None;
    for raw in numbers {
        let parsed = ReportNumber::parse(raw)
            .unwrap_or_else(|e| panic!("'{raw}' is not a valid report number: {e}"));
        if let Some(prev) = previous {
            assert!(
                parsed.sequence > prev,
                "sequence not strictly increasing: {prev} then {} in '{raw}'",
                parsed.sequence
            );
        }
        previous = Some(parsed.sequence);
    }
}
