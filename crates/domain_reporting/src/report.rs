//! Report records and BOT event classification

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use core_kernel::{
    AdjustmentId, AmloReportId, BotEventId, BranchId, CurrencyCode, OperatorId, ReservationId,
    TransactionId,
};
use domain_compliance::{BotForm, ReportType};
use domain_exchange::{ExchangeTransaction, TradeDirection};

/// One AMLO filing
///
/// Exactly one report exists per reservation; approval-path creation is
/// idempotent so a retried approval returns the existing row instead of
/// burning a second number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmloReport {
    pub id: AmloReportId,
    pub report_no: String,
    pub report_format: ReportType,
    pub reservation_id: ReservationId,
    pub transaction_id: Option<TransactionId>,
    /// Customer identity copied at creation time; later master-data edits
    /// must not rewrite a filed report
    pub customer_id: String,
    pub customer_name: String,
    pub customer_country: String,
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    /// Unset until the PDF renders; a retry pass fills it in later
    pub pdf_path: Option<PathBuf>,
    pub is_reported: bool,
    pub reported_at: Option<DateTime<Utc>>,
    pub branch_id: BranchId,
    pub operator_id: OperatorId,
    pub created_at: DateTime<Utc>,
}

/// Identification document classes the BOT taxonomy distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdType {
    ThaiCitizenId,
    Passport,
    CorporateRegistration,
}

impl IdType {
    /// Infers the document class from the identifier shape
    ///
    /// Thai citizen ids and corporate registration numbers are both 13
    /// digits; registration numbers lead with 0, citizen ids never do.
    /// Everything else is treated as a passport number.
    pub fn infer(id_number: &str) -> IdType {
        let digits_only =
            id_number.len() == 13 && id_number.bytes().all(|b| b.is_ascii_digit());
        if digits_only {
            if id_number.starts_with('0') {
                IdType::CorporateRegistration
            } else {
                IdType::ThaiCitizenId
            }
        } else {
            IdType::Passport
        }
    }

    /// BOT id-type code column value
    pub fn code(&self) -> &'static str {
        match self {
            IdType::ThaiCitizenId => "1",
            IdType::Passport => "2",
            IdType::CorporateRegistration => "3",
        }
    }
}

/// BOT customer-type codes derived from the id document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerTypeCode {
    /// Resident individual, code 110
    IndividualResident,
    /// Juristic person, code 120
    LegalEntity,
    /// Non-resident individual, code 210
    IndividualNonResident,
}

impl CustomerTypeCode {
    pub fn from_id_type(id_type: IdType) -> Self {
        match id_type {
            IdType::ThaiCitizenId => CustomerTypeCode::IndividualResident,
            IdType::Passport => CustomerTypeCode::IndividualNonResident,
            IdType::CorporateRegistration => CustomerTypeCode::LegalEntity,
        }
    }

    /// The workbook column value
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerTypeCode::IndividualResident => "110",
            CustomerTypeCode::LegalEntity => "120",
            CustomerTypeCode::IndividualNonResident => "210",
        }
    }
}

/// One monthly Buy FX or Sell FX row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotFxEvent {
    pub id: BotEventId,
    pub branch_id: BranchId,
    pub transaction_id: TransactionId,
    pub customer_type: CustomerTypeCode,
    pub customer_name: String,
    pub id_type: IdType,
    pub id_number: String,
    pub country_code: String,
    pub currency_code: CurrencyCode,
    pub rate: Decimal,
    pub foreign_amount: Decimal,
    pub local_amount: Decimal,
    /// Computed at event time from the day's reference rates
    pub usd_equivalent: Decimal,
    pub payment_method: String,
    pub remarks: Option<String>,
    pub event_time: DateTime<Utc>,
    pub is_reported: bool,
    pub reported_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One monthly FCD row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotFcdEvent {
    pub id: BotEventId,
    pub branch_id: BranchId,
    pub transaction_id: TransactionId,
    pub event_date: NaiveDate,
    pub bank_name: String,
    pub account_no: String,
    pub currency_code: CurrencyCode,
    /// Account balance after the movement
    pub balance: Decimal,
    pub amount: Decimal,
    pub remarks: Option<String>,
    pub event_time: DateTime<Utc>,
    pub is_reported: bool,
    pub reported_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One Provider balance-adjustment row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotProviderEvent {
    pub id: BotEventId,
    pub branch_id: BranchId,
    pub adjustment_id: AdjustmentId,
    pub currency_code: CurrencyCode,
    /// Signed inventory delta the adjustment applied
    pub delta_amount: Decimal,
    pub usd_equivalent: Decimal,
    pub remarks: Option<String>,
    pub event_time: DateTime<Utc>,
    pub is_reported: bool,
    pub reported_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Derives BOT-classified outcomes from exchange activity
///
/// Classification is deterministic over the transaction log, which is what
/// makes the monthly event tables reconstructible: dropping them and
/// re-running the classifier over a month reproduces the same rows.
#[derive(Debug, Clone)]
pub struct BotClassifier {
    /// Provider rows exist only for adjustments at or above this
    /// USD-equivalent (regulatory floor: 20,000)
    pub provider_threshold_usd: Decimal,
    /// Reference rate used when USD itself is unpriced for the day
    pub usd_fallback_rate: Decimal,
}

impl BotClassifier {
    pub fn new(provider_threshold_usd: Decimal, usd_fallback_rate: Decimal) -> Self {
        Self {
            provider_threshold_usd,
            usd_fallback_rate,
        }
    }

    /// The BOT forms a committed trade reports under
    pub fn classify_trade(&self, txn: &ExchangeTransaction, fcd_funded: bool) -> Vec<BotForm> {
        let mut forms = match txn.direction {
            TradeDirection::Buy => vec![BotForm::BuyFx],
            TradeDirection::Sell => vec![BotForm::SellFx],
        };
        if fcd_funded {
            forms.push(BotForm::Fcd);
        }
        forms
    }

    /// USD equivalent of a foreign amount
    ///
    /// Non-USD amounts convert through their local-currency rate and the
    /// day's USD rate: `amount × rate ÷ usd_rate`, rounded to 2 places.
    pub fn usd_equivalent(
        &self,
        currency: CurrencyCode,
        amount: Decimal,
        currency_rate: Decimal,
        usd_rate: Option<Decimal>,
    ) -> Decimal {
        if currency == CurrencyCode::USD {
            return amount.abs();
        }
        let usd = usd_rate.unwrap_or(self.usd_fallback_rate);
        (amount.abs() * currency_rate / usd)
            .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
    }

    /// Whether a balance adjustment produces a Provider row
    ///
    /// Only increases count; drawdowns are not reportable events.
    pub fn classify_adjustment(
        &self,
        currency: CurrencyCode,
        delta: Decimal,
        currency_rate: Decimal,
        usd_rate: Option<Decimal>,
    ) -> Option<Decimal> {
        if delta <= Decimal::ZERO {
            return None;
        }
        let equivalent = self.usd_equivalent(currency, delta, currency_rate, usd_rate);
        (equivalent >= self.provider_threshold_usd).then_some(equivalent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::CurrencyId;
    use rust_decimal_macros::dec;

    fn classifier() -> BotClassifier {
        BotClassifier::new(dec!(20000), dec!(35.0))
    }

    fn trade(direction: TradeDirection) -> ExchangeTransaction {
        ExchangeTransaction {
            id: TransactionId::new(),
            transaction_no: 1,
            branch_id: BranchId::new(),
            currency_id: CurrencyId::new(),
            currency_code: CurrencyCode::USD,
            direction,
            foreign_amount: dec!(1000),
            local_amount: dec!(-35500),
            rate: dec!(35.50),
            customer_id: "1234567890123".to_string(),
            customer_name: "Test".to_string(),
            customer_country: "TH".to_string(),
            executed_at: Utc::now(),
            operator_id: OperatorId::new(),
            business_group_id: None,
            group_sequence: None,
            amlo_flag: false,
            bot_flag: false,
            fcd_flag: false,
            reversal_of: None,
        }
    }

    #[test]
    fn test_id_type_inference() {
        assert_eq!(IdType::infer("1234567890123"), IdType::ThaiCitizenId);
        assert_eq!(IdType::infer("0105536041711"), IdType::CorporateRegistration);
        assert_eq!(IdType::infer("AB1234567"), IdType::Passport);
        assert_eq!(IdType::infer("12345"), IdType::Passport);
    }

    #[test]
    fn test_customer_type_codes() {
        assert_eq!(
            CustomerTypeCode::from_id_type(IdType::ThaiCitizenId).as_str(),
            "110"
        );
        assert_eq!(
            CustomerTypeCode::from_id_type(IdType::Passport).as_str(),
            "210"
        );
        assert_eq!(
            CustomerTypeCode::from_id_type(IdType::CorporateRegistration).as_str(),
            "120"
        );
    }

    #[test]
    fn test_classify_trade_by_direction() {
        let c = classifier();
        assert_eq!(
            c.classify_trade(&trade(TradeDirection::Buy), false),
            vec![BotForm::BuyFx]
        );
        assert_eq!(
            c.classify_trade(&trade(TradeDirection::Sell), false),
            vec![BotForm::SellFx]
        );
        assert_eq!(
            c.classify_trade(&trade(TradeDirection::Buy), true),
            vec![BotForm::BuyFx, BotForm::Fcd]
        );
    }

    #[test]
    fn test_usd_equivalent_for_usd_is_identity() {
        let c = classifier();
        assert_eq!(
            c.usd_equivalent(CurrencyCode::USD, dec!(25000), dec!(35.50), Some(dec!(34))),
            dec!(25000)
        );
    }

    #[test]
    fn test_usd_equivalent_cross_rate() {
        // 20,000 EUR at EUR rate 38 and USD rate 34 -> 22,352.94
        let c = classifier();
        assert_eq!(
            c.usd_equivalent(CurrencyCode::EUR, dec!(20000), dec!(38), Some(dec!(34))),
            dec!(22352.94)
        );
    }

    #[test]
    fn test_usd_equivalent_fallback_rate() {
        let c = classifier();
        // No USD rate today: the documented 35.0 fallback applies
        assert_eq!(
            c.usd_equivalent(CurrencyCode::EUR, dec!(3500), dec!(35.0), None),
            dec!(3500)
        );
    }

    #[test]
    fn test_provider_threshold() {
        let c = classifier();

        // USD increase of 25,000 triggers
        assert_eq!(
            c.classify_adjustment(CurrencyCode::USD, dec!(25000), dec!(35.5), Some(dec!(34))),
            Some(dec!(25000))
        );
        // Below threshold: no row
        assert_eq!(
            c.classify_adjustment(CurrencyCode::USD, dec!(19999), dec!(35.5), Some(dec!(34))),
            None
        );
        // Decreases never report
        assert_eq!(
            c.classify_adjustment(CurrencyCode::USD, dec!(-25000), dec!(35.5), Some(dec!(34))),
            None
        );
        // EUR cross-rate case from the seed scenario
        assert_eq!(
            c.classify_adjustment(CurrencyCode::EUR, dec!(20000), dec!(38), Some(dec!(34))),
            Some(dec!(22352.94))
        );
    }
}
