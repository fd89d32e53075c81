//! Report-number format tests
//!
//! The seed cases the downstream regulator systems were verified against,
//! plus the month-boundary and uniqueness properties.

use core_kernel::{CurrencyCode, YearMonth};
use domain_reporting::{BranchCodes, ReportNumber};

fn branch() -> BranchCodes {
    BranchCodes {
        institution_code: "001".to_string(),
        branch_code: "001".to_string(),
        bot_sender_code: "C001".to_string(),
        bot_branch_area_code: "10".to_string(),
        license_no: "MC-123/2560".to_string(),
        license_holder: "Siam Exchange Co., Ltd.".to_string(),
        branch_name: "Silom Road Branch".to_string(),
    }
}

/// October 2025 (Buddhist 2568) USD numbers, first and second of month.
#[test]
fn amlo_usd_numbers_for_october_2568() {
    let ym = YearMonth::new(2025, 10).unwrap();

    let first = ReportNumber::compose_amlo(&branch(), ym, 1, CurrencyCode::USD).unwrap();
    assert_eq!(first, "001-001-68-100001USD");

    let second = ReportNumber::compose_amlo(&branch(), ym, 2, CurrencyCode::USD).unwrap();
    assert_eq!(second, "001-001-68-100002USD");
}

/// The first number of a new month restarts at sequence 1 while the old
/// month retains its maximum.
#[test]
fn month_boundary_resets_sequence() {
    let october = YearMonth::new(2025, 10).unwrap();
    let november = october.succ();

    let last_of_october =
        ReportNumber::compose_amlo(&branch(), october, 412, CurrencyCode::USD).unwrap();
    let first_of_november =
        ReportNumber::compose_amlo(&branch(), november, 1, CurrencyCode::USD).unwrap();

    assert_eq!(last_of_october, "001-001-68-100412USD");
    assert_eq!(first_of_november, "001-001-68-110001USD");

    let parsed_oct = ReportNumber::parse(&last_of_october).unwrap();
    let parsed_nov = ReportNumber::parse(&first_of_november).unwrap();
    assert_eq!(parsed_oct.sequence, 412);
    assert_eq!(parsed_nov.sequence, 1);
    assert_ne!(parsed_oct.month, parsed_nov.month);
}

/// Buddhist year rolls with the Gregorian year in the number.
#[test]
fn year_boundary_changes_be_digits() {
    let december = YearMonth::new(2025, 12).unwrap();
    let january = december.succ();

    let dec_no = ReportNumber::compose_bot(&branch(), december, 9).unwrap();
    let jan_no = ReportNumber::compose_bot(&branch(), january, 1).unwrap();
    assert_eq!(dec_no, "001-001-68-120009");
    assert_eq!(jan_no, "001-001-69-010001");
}

/// Distinct (currency, sequence) pairs can never compose to the same
/// AMLO number within a month.
#[test]
fn numbers_are_unique_across_currency_and_sequence() {
    let ym = YearMonth::new(2025, 10).unwrap();
    let mut seen = std::collections::HashSet::new();

    for currency in [CurrencyCode::USD, CurrencyCode::EUR, CurrencyCode::THB] {
        for seq in 1..=50 {
            let number = ReportNumber::compose_amlo(&branch(), ym, seq, currency).unwrap();
            assert!(seen.insert(number.clone()), "duplicate number {number}");
        }
    }
    assert_eq!(seen.len(), 150);
}

/// Every number the composer emits satisfies the wire format the
/// regulator validates, and BOT numbers never carry a currency.
#[test]
fn composed_numbers_always_parse_back() {
    let ym = YearMonth::new(2026, 2).unwrap();

    let amlo = ReportNumber::compose_amlo(&branch(), ym, 777, CurrencyCode::EUR).unwrap();
    let parsed = ReportNumber::parse(&amlo).unwrap();
    assert_eq!(parsed.currency, Some(CurrencyCode::EUR));
    assert_eq!(parsed.sequence, 777);
    assert_eq!(parsed.be_year_2digit, 69);

    let bot = ReportNumber::compose_bot(&branch(), ym, 777).unwrap();
    let parsed = ReportNumber::parse(&bot).unwrap();
    assert_eq!(parsed.currency, None);
    assert_eq!(parsed.sequence, 777);
}
