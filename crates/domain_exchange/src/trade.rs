//! Trade model
//!
//! Transactions are append-only: once committed they are immutable except
//! for the three regulatory flag bits, and corrections are recorded as new
//! reversal rows pointing back at the original.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{
    BranchId, CurrencyCode, CurrencyId, ExchangeRate, GroupId, OperatorId, TransactionId,
};

use crate::error::ExchangeError;

/// Trade direction from the branch's perspective
///
/// `Buy` means the branch acquires foreign currency and pays local;
/// `Sell` is the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl TradeDirection {
    /// Sign applied to the foreign-leg balance delta
    pub fn foreign_sign(&self) -> Decimal {
        match self {
            TradeDirection::Buy => Decimal::ONE,
            TradeDirection::Sell => -Decimal::ONE,
        }
    }

    /// Sign applied to the local-leg balance delta, always opposite
    pub fn local_sign(&self) -> Decimal {
        -self.foreign_sign()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Buy => "buy",
            TradeDirection::Sell => "sell",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ExchangeError> {
        match s {
            "buy" => Ok(TradeDirection::Buy),
            "sell" => Ok(TradeDirection::Sell),
            other => Err(ExchangeError::InvalidDirection(other.to_string())),
        }
    }
}

impl std::fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The two signed balance deltas a committed trade applies
///
/// Invariant: the legs carry opposite signs; a buy adds foreign inventory
/// and drains local, a sell does the reverse. Both legs commit in the same
/// database transaction or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedLegs {
    pub foreign_delta: Decimal,
    pub local_delta: Decimal,
}

impl SignedLegs {
    /// Computes the signed deltas for a trade
    ///
    /// `foreign_amount` and `local_amount` are the unsigned trade amounts.
    pub fn for_trade(
        direction: TradeDirection,
        foreign_amount: Decimal,
        local_amount: Decimal,
    ) -> Result<Self, ExchangeError> {
        if foreign_amount <= Decimal::ZERO || local_amount <= Decimal::ZERO {
            return Err(ExchangeError::InvalidAmount(format!(
                "trade amounts must be positive: foreign={foreign_amount} local={local_amount}"
            )));
        }
        Ok(Self {
            foreign_delta: direction.foreign_sign() * foreign_amount,
            local_delta: direction.local_sign() * local_amount,
        })
    }
}

/// An executed trade, as recorded in the append-only transaction log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeTransaction {
    /// Unique identifier
    pub id: TransactionId,
    /// Per-branch monotonic transaction number
    pub transaction_no: i64,
    /// Executing branch
    pub branch_id: BranchId,
    /// Foreign-leg currency
    pub currency_id: CurrencyId,
    /// Foreign-leg currency code, denormalized for reporting
    pub currency_code: CurrencyCode,
    /// Direction from the branch's perspective
    pub direction: TradeDirection,
    /// Foreign amount, signed per direction (positive on buy)
    pub foreign_amount: Decimal,
    /// Local amount, signed opposite to the foreign leg
    pub local_amount: Decimal,
    /// Rate used for the conversion
    pub rate: Decimal,
    /// Customer identification document number; may be empty for small trades
    pub customer_id: String,
    pub customer_name: String,
    pub customer_country: String,
    /// When the trade executed
    pub executed_at: DateTime<Utc>,
    /// Operator who keyed the trade
    pub operator_id: OperatorId,
    /// Split-order group, when this row is one leg of a mixed-denomination order
    pub business_group_id: Option<GroupId>,
    pub group_sequence: Option<i32>,
    /// Regulatory flags, the only mutable bits after commit
    pub amlo_flag: bool,
    pub bot_flag: bool,
    pub fcd_flag: bool,
    /// Back-reference when this row reverses an earlier trade
    pub reversal_of: Option<TransactionId>,
}

impl ExchangeTransaction {
    /// Absolute local-leg value, the figure regulatory thresholds compare
    pub fn local_value(&self) -> Decimal {
        self.local_amount.abs()
    }

    /// Absolute foreign-leg value
    pub fn foreign_value(&self) -> Decimal {
        self.foreign_amount.abs()
    }

    /// Builds the reversal row for this trade
    ///
    /// A reversal is a fresh transaction with both legs negated; the
    /// original row is never touched.
    pub fn reversal(&self, id: TransactionId, transaction_no: i64, operator_id: OperatorId, at: DateTime<Utc>) -> Self {
        Self {
            id,
            transaction_no,
            foreign_amount: -self.foreign_amount,
            local_amount: -self.local_amount,
            executed_at: at,
            operator_id,
            business_group_id: None,
            group_sequence: None,
            amlo_flag: false,
            bot_flag: false,
            fcd_flag: false,
            reversal_of: Some(self.id),
            ..self.clone()
        }
    }
}

/// One denomination leg of a split order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitLeg {
    pub foreign_amount: Decimal,
    pub local_amount: Decimal,
    pub rate: Decimal,
    pub group_sequence: i32,
}

/// A mixed-denomination customer order decomposed into trade legs
///
/// A customer handing over e.g. large and small USD notes priced at
/// different denominations becomes several persisted transactions sharing
/// one `business_group_id`, numbered from 1 in `group_sequence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitOrder {
    pub group_id: GroupId,
    pub legs: Vec<SplitLeg>,
}

impl SplitOrder {
    /// Decomposes `(foreign_amount, rate)` pairs into a grouped order
    ///
    /// Each pair becomes one leg; the local amount is computed at that
    /// leg's rate. Rejects empty input and non-positive amounts.
    pub fn decompose(parts: &[(Decimal, ExchangeRate)]) -> Result<Self, ExchangeError> {
        if parts.is_empty() {
            return Err(ExchangeError::InvalidAmount(
                "split order needs at least one leg".to_string(),
            ));
        }
        let mut legs = Vec::with_capacity(parts.len());
        for (i, (foreign_amount, rate)) in parts.iter().enumerate() {
            if *foreign_amount <= Decimal::ZERO {
                return Err(ExchangeError::InvalidAmount(format!(
                    "split leg {} has non-positive amount {foreign_amount}",
                    i + 1
                )));
            }
            legs.push(SplitLeg {
                foreign_amount: *foreign_amount,
                local_amount: rate.convert(*foreign_amount),
                rate: rate.as_decimal(),
                group_sequence: (i + 1) as i32,
            });
        }
        Ok(Self {
            group_id: GroupId::new_v7(),
            legs,
        })
    }

    /// Total foreign amount across the legs
    pub fn total_foreign(&self) -> Decimal {
        self.legs.iter().map(|l| l.foreign_amount).sum()
    }

    /// Total local amount across the legs
    ///
    /// This is the figure the compliance rules see: the regulator treats a
    /// split order as one economic transaction.
    pub fn total_local(&self) -> Decimal {
        self.legs.iter().map(|l| l.local_amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_signed_legs_buy() {
        let legs = SignedLegs::for_trade(TradeDirection::Buy, dec!(1000), dec!(35500)).unwrap();
        assert_eq!(legs.foreign_delta, dec!(1000));
        assert_eq!(legs.local_delta, dec!(-35500));
    }

    #[test]
    fn test_signed_legs_sell() {
        let legs = SignedLegs::for_trade(TradeDirection::Sell, dec!(1000), dec!(35500)).unwrap();
        assert_eq!(legs.foreign_delta, dec!(-1000));
        assert_eq!(legs.local_delta, dec!(35500));
    }

    #[test]
    fn test_signed_legs_oppose() {
        for direction in [TradeDirection::Buy, TradeDirection::Sell] {
            let legs = SignedLegs::for_trade(direction, dec!(500), dec!(17750)).unwrap();
            assert!(legs.foreign_delta.is_sign_positive() != legs.local_delta.is_sign_positive());
        }
    }

    #[test]
    fn test_signed_legs_reject_non_positive() {
        assert!(SignedLegs::for_trade(TradeDirection::Buy, dec!(0), dec!(1)).is_err());
        assert!(SignedLegs::for_trade(TradeDirection::Buy, dec!(1), dec!(-1)).is_err());
    }

    #[test]
    fn test_direction_parse_roundtrip() {
        assert_eq!(TradeDirection::parse("buy").unwrap(), TradeDirection::Buy);
        assert_eq!(TradeDirection::parse("sell").unwrap(), TradeDirection::Sell);
        assert!(TradeDirection::parse("short").is_err());
    }

    #[test]
    fn test_split_order_groups_and_numbers_legs() {
        let rate_big = core_kernel::ExchangeRate::new(dec!(35.50)).unwrap();
        let rate_small = core_kernel::ExchangeRate::new(dec!(35.10)).unwrap();

        let order =
            SplitOrder::decompose(&[(dec!(10000), rate_big), (dec!(500), rate_small)]).unwrap();

        assert_eq!(order.legs.len(), 2);
        assert_eq!(order.legs[0].group_sequence, 1);
        assert_eq!(order.legs[1].group_sequence, 2);
        assert_eq!(order.legs[0].local_amount, dec!(355000.00));
        assert_eq!(order.legs[1].local_amount, dec!(17550.00));
        assert_eq!(order.total_foreign(), dec!(10500));
        assert_eq!(order.total_local(), dec!(372550.00));
    }

    #[test]
    fn test_split_order_rejects_empty_and_non_positive() {
        assert!(SplitOrder::decompose(&[]).is_err());
        let rate = core_kernel::ExchangeRate::new(dec!(35.50)).unwrap();
        assert!(SplitOrder::decompose(&[(dec!(0), rate)]).is_err());
    }

    #[test]
    fn test_reversal_negates_both_legs() {
        let original = sample_transaction();
        let rev = original.reversal(
            TransactionId::new(),
            original.transaction_no + 1,
            OperatorId::new(),
            Utc::now(),
        );

        assert_eq!(rev.foreign_amount, -original.foreign_amount);
        assert_eq!(rev.local_amount, -original.local_amount);
        assert_eq!(rev.reversal_of, Some(original.id));
        assert!(!rev.amlo_flag && !rev.bot_flag && !rev.fcd_flag);
    }

    fn sample_transaction() -> ExchangeTransaction {
        ExchangeTransaction {
            id: TransactionId::new(),
            transaction_no: 41,
            branch_id: BranchId::new(),
            currency_id: CurrencyId::new(),
            currency_code: CurrencyCode::USD,
            direction: TradeDirection::Buy,
            foreign_amount: dec!(1000),
            local_amount: dec!(-35500),
            rate: dec!(35.50),
            customer_id: "1234567890123".to_string(),
            customer_name: "Test Customer".to_string(),
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
}
