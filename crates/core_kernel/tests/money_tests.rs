//! Unit tests for the money module
//!
//! Covers currency-code parsing, money arithmetic, rounding behavior, and
//! rate conversion edge cases.

use core_kernel::{CurrencyCode, ExchangeRate, Money, MoneyError};
use rust_decimal_macros::dec;

mod currency_codes {
    use super::*;

    #[test]
    fn test_parse_normalizes_case() {
        assert_eq!(CurrencyCode::new("usd").unwrap(), CurrencyCode::USD);
        assert_eq!(CurrencyCode::new("Thb").unwrap().as_str(), "THB");
    }

    #[test]
    fn test_parse_rejects_wrong_length_and_digits() {
        for bad in ["", "US", "USDT", "U1D", "฿฿฿"] {
            assert!(
                CurrencyCode::new(bad).is_err(),
                "accepted invalid code '{bad}'"
            );
        }
    }

    #[test]
    fn test_from_str_roundtrip() {
        let code: CurrencyCode = "JPY".parse().unwrap();
        assert_eq!(code.to_string(), "JPY");
    }

    #[test]
    fn test_serde_roundtrip() {
        let encoded = serde_json::to_string(&CurrencyCode::EUR).unwrap();
        assert_eq!(encoded, "\"EUR\"");
        let decoded: CurrencyCode = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, CurrencyCode::EUR);
    }

    #[test]
    fn test_serde_rejects_invalid() {
        assert!(serde_json::from_str::<CurrencyCode>("\"EURO\"").is_err());
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_checked_ops_same_currency() {
        let a = Money::new(dec!(2130000.00), CurrencyCode::THB);
        let b = Money::new(dec!(130000.00), CurrencyCode::THB);

        assert_eq!(a.checked_add(&b).unwrap().amount(), dec!(2260000.00));
        assert_eq!(a.checked_sub(&b).unwrap().amount(), dec!(2000000.00));
    }

    #[test]
    fn test_mismatch_is_an_error_not_a_panic() {
        let baht = Money::new(dec!(1), CurrencyCode::THB);
        let dollars = Money::new(dec!(1), CurrencyCode::USD);
        assert!(matches!(
            baht.checked_add(&dollars),
            Err(MoneyError::CurrencyMismatch(_, _))
        ));
    }

    #[test]
    fn test_negation_and_abs() {
        let m = Money::new(dec!(35500), CurrencyCode::THB);
        assert!((-m).is_negative());
        assert_eq!((-m).abs(), m);
    }

    #[test]
    fn test_round_cash_is_bankers() {
        // Half to even at the second decimal
        assert_eq!(
            Money::new(dec!(1.125), CurrencyCode::THB).round_cash().amount(),
            dec!(1.12)
        );
        assert_eq!(
            Money::new(dec!(1.135), CurrencyCode::THB).round_cash().amount(),
            dec!(1.14)
        );
    }
}

mod rates {
    use super::*;

    #[test]
    fn test_conversion_seed_case() {
        // 60,000 USD at 35.50 is the CTR seed trade
        let rate = ExchangeRate::new(dec!(35.50)).unwrap();
        assert_eq!(rate.convert(dec!(60000)), dec!(2130000.00));
    }

    #[test]
    fn test_conversion_rounds_half_up_to_satang() {
        let rate = ExchangeRate::new(dec!(35.555)).unwrap();
        assert_eq!(rate.convert(dec!(1)), dec!(35.56));
        assert_eq!(rate.convert(dec!(0.01)), dec!(0.36));
    }

    #[test]
    fn test_zero_and_negative_rates_rejected() {
        assert!(matches!(
            ExchangeRate::new(dec!(0)),
            Err(MoneyError::InvalidRate(_))
        ));
        assert!(ExchangeRate::new(dec!(-35.50)).is_err());
    }
}
