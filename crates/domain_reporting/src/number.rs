//! Report-number format
//!
//! Both regulators key filings on a fixed-width number. The format is
//! bit-exact for compatibility with downstream regulator systems:
//!
//! - AMLO: `III-BBB-YY-MMSSSSCCC` — institution (3 digits), branch (3
//!   digits), Buddhist-era year last two digits, month, four-digit
//!   month-sequence, ISO currency code.
//! - BOT: `III-BBB-YY-MMSSSS` — the same prefix without the currency.
//!
//! The month-sequence resets at month boundaries and is allocated by the
//! sequence ledger in `infra_db`; this module only composes and parses.

use core_kernel::{CurrencyCode, YearMonth};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ReportingError;

/// The highest sequence the four-digit field can carry
pub const MAX_MONTH_SEQUENCE: u32 = 9999;

/// Regulatory identity of a branch
///
/// Master data owned by the admin system; immutable from the core's view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchCodes {
    /// Three-digit institution code assigned by the regulator
    pub institution_code: String,
    /// Three-digit branch code within the institution
    pub branch_code: String,
    /// Sender code on BOT submissions
    pub bot_sender_code: String,
    /// BOT branch area code
    pub bot_branch_area_code: String,
    /// Money-changer license number
    pub license_no: String,
    /// Name the license was issued to
    pub license_holder: String,
    /// Branch display name
    pub branch_name: String,
}

impl BranchCodes {
    /// Validates the fixed-width regulator codes
    pub fn validate(&self) -> Result<(), ReportingError> {
        for (label, code) in [
            ("institution_code", &self.institution_code),
            ("branch_code", &self.branch_code),
        ] {
            if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ReportingError::InvalidBranchCode(format!(
                    "{label} must be exactly three digits, got '{code}'"
                )));
            }
        }
        Ok(())
    }
}

/// A parsed report number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportNumber {
    pub institution_code: String,
    pub branch_code: String,
    /// Buddhist-era year, last two digits
    pub be_year_2digit: u32,
    pub month: u32,
    pub sequence: u32,
    /// Present on AMLO numbers, absent on BOT
    pub currency: Option<CurrencyCode>,
}

impl ReportNumber {
    /// Composes an AMLO report number
    pub fn compose_amlo(
        codes: &BranchCodes,
        ym: YearMonth,
        sequence: u32,
        currency: CurrencyCode,
    ) -> Result<String, ReportingError> {
        codes.validate()?;
        if sequence == 0 || sequence > MAX_MONTH_SEQUENCE {
            return Err(ReportingError::SequenceExhausted(sequence));
        }
        Ok(format!(
            "{}-{}-{:02}-{:02}{:04}{}",
            codes.institution_code,
            codes.branch_code,
            ym.buddhist_year().rem_euclid(100),
            ym.month,
            sequence,
            currency
        ))
    }

    /// Composes a BOT report number
    pub fn compose_bot(
        codes: &BranchCodes,
        ym: YearMonth,
        sequence: u32,
    ) -> Result<String, ReportingError> {
        codes.validate()?;
        if sequence == 0 || sequence > MAX_MONTH_SEQUENCE {
            return Err(ReportingError::SequenceExhausted(sequence));
        }
        Ok(format!(
            "{}-{}-{:02}-{:02}{:04}",
            codes.institution_code,
            codes.branch_code,
            ym.buddhist_year().rem_euclid(100),
            ym.month,
            sequence
        ))
    }

    /// Parses either format, validating field widths and digit classes
    pub fn parse(raw: &str) -> Result<Self, ReportingError> {
        let invalid = || ReportingError::InvalidReportNumber(raw.to_string());

        if !raw.is_ascii() {
            return Err(invalid());
        }

        let mut parts = raw.split('-');
        let institution = parts.next().ok_or_else(invalid)?;
        let branch = parts.next().ok_or_else(invalid)?;
        let year = parts.next().ok_or_else(invalid)?;
        let tail = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        if institution.len() != 3 || !institution.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if branch.len() != 3 || !branch.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if year.len() != 2 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        // Tail is MMSSSS for BOT, MMSSSSCCC for AMLO
        let currency = match tail.len() {
            6 => None,
            9 => {
                let code = &tail[6..];
                if !code.bytes().all(|b| b.is_ascii_uppercase()) {
                    return Err(invalid());
                }
                Some(CurrencyCode::new(code).map_err(|_| invalid())?)
            }
            _ => return Err(invalid()),
        };
        let digits = &tail[..6];
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let month: u32 = digits[..2].parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        let sequence: u32 = digits[2..].parse().map_err(|_| invalid())?;

        Ok(Self {
            institution_code: institution.to_string(),
            branch_code: branch.to_string(),
            be_year_2digit: year.parse().map_err(|_| invalid())?,
            month,
            sequence,
            currency,
        })
    }
}

impl fmt::Display for ReportNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{:02}-{:02}{:04}",
            self.institution_code, self.branch_code, self.be_year_2digit, self.month, self.sequence
        )?;
        if let Some(currency) = self.currency {
            write!(f, "{currency}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn codes() -> BranchCodes {
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

    #[test]
    fn test_compose_amlo_first_of_month() {
        // 2025-10 is Buddhist year 2568
        let ym = YearMonth::new(2025, 10).unwrap();
        let no = ReportNumber::compose_amlo(&codes(), ym, 1, CurrencyCode::USD).unwrap();
        assert_eq!(no, "001-001-68-100001USD");

        let second = ReportNumber::compose_amlo(&codes(), ym, 2, CurrencyCode::USD).unwrap();
        assert_eq!(second, "001-001-68-100002USD");
    }

    #[test]
    fn test_compose_bot() {
        let ym = YearMonth::new(2025, 10).unwrap();
        let no = ReportNumber::compose_bot(&codes(), ym, 17).unwrap();
        assert_eq!(no, "001-001-68-100017");
    }

    #[test]
    fn test_compose_rejects_bad_sequence() {
        let ym = YearMonth::new(2025, 10).unwrap();
        assert!(ReportNumber::compose_amlo(&codes(), ym, 0, CurrencyCode::USD).is_err());
        assert!(ReportNumber::compose_amlo(&codes(), ym, 10_000, CurrencyCode::USD).is_err());
    }

    #[test]
    fn test_compose_rejects_bad_branch_codes() {
        let mut bad = codes();
        bad.branch_code = "1".to_string();
        let ym = YearMonth::new(2025, 10).unwrap();
        assert!(ReportNumber::compose_bot(&bad, ym, 1).is_err());
    }

    #[test]
    fn test_parse_amlo() {
        let parsed = ReportNumber::parse("001-001-68-100001USD").unwrap();
        assert_eq!(parsed.institution_code, "001");
        assert_eq!(parsed.branch_code, "001");
        assert_eq!(parsed.be_year_2digit, 68);
        assert_eq!(parsed.month, 10);
        assert_eq!(parsed.sequence, 1);
        assert_eq!(parsed.currency, Some(CurrencyCode::USD));
    }

    #[test]
    fn test_parse_bot() {
        let parsed = ReportNumber::parse("001-002-68-120042").unwrap();
        assert_eq!(parsed.branch_code, "002");
        assert_eq!(parsed.month, 12);
        assert_eq!(parsed.sequence, 42);
        assert_eq!(parsed.currency, None);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "001-001-68-100001usd", // lowercase currency
            "001-001-68-100001US",  // two-letter currency
            "01-001-68-100001USD",  // short institution
            "001-001-680-100001",   // wide year
            "001-001-68-130001",    // month 13
            "001-001-68-1001",      // short tail
            "001-001-68-100001USD-X",
            "garbage",
        ] {
            assert!(ReportNumber::parse(bad).is_err(), "accepted '{bad}'");
        }
    }
}
