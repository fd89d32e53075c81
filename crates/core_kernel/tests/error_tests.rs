//! Unit tests for core error types

use core_kernel::{CoreError, MoneyError};

#[test]
fn test_helper_constructors() {
    let validation = CoreError::validation("amount must be positive");
    assert!(matches!(validation, CoreError::Validation(_)));
    assert!(validation.to_string().contains("amount must be positive"));

    let state = CoreError::invalid_state("pending -> completed");
    assert!(state.to_string().contains("pending -> completed"));

    let missing = CoreError::not_found("reservation RSV-42");
    assert!(missing.to_string().contains("RSV-42"));
}

#[test]
fn test_money_errors_convert() {
    let source = MoneyError::InvalidCurrencyCode("US".to_string());
    let wrapped: CoreError = source.into();
    assert!(matches!(wrapped, CoreError::Money(_)));
    assert!(wrapped.to_string().contains("US"));
}
