//! Evaluation snapshots
//!
//! The rule engine sees a flat field → JSON value map: the planned trade
//! enriched with the customer's windowed history. Amount fields are encoded
//! as decimal strings so predicates compare exactly, never through binary
//! floats.

use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;

use crate::aggregates::CustomerAggregates;

/// Flat data snapshot evaluated by the rule engine
#[derive(Debug, Clone, Default)]
pub struct DataSnapshot {
    fields: HashMap<String, Value>,
}

impl DataSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a raw JSON field
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> &mut Self {
        self.fields.insert(field.into(), value);
        self
    }

    /// Sets a decimal field, encoded as a string for exact comparison
    pub fn set_decimal(&mut self, field: impl Into<String>, value: Decimal) -> &mut Self {
        self.fields
            .insert(field.into(), Value::String(value.to_string()));
        self
    }

    /// Looks up a field; absent fields make predicates evaluate false
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Builds the snapshot for a planned trade
    ///
    /// `local_amount` is the unsigned local-leg value, the figure thresholds
    /// compare. `cumulative_with_current` projects the customer's trailing
    /// 30-day total as it would stand after this trade commits, which is
    /// what cumulative STR rules test.
    #[allow(clippy::too_many_arguments)]
    pub fn for_trade(
        direction: &str,
        currency_code: &str,
        foreign_amount: Decimal,
        local_amount: Decimal,
        rate: Decimal,
        customer_id: &str,
        customer_country: &str,
        aggregates: &CustomerAggregates,
    ) -> Self {
        let mut snapshot = Self::new();
        snapshot
            .set("direction", Value::String(direction.to_string()))
            .set("currency_code", Value::String(currency_code.to_string()))
            .set_decimal("foreign_amount", foreign_amount)
            .set_decimal("local_amount", local_amount)
            .set_decimal("rate", rate)
            .set("customer_id", Value::String(customer_id.to_string()))
            .set(
                "customer_country",
                Value::String(customer_country.to_string()),
            )
            .set_decimal("cumulative_amount_30d", aggregates.cumulative_amount_30d)
            .set_decimal(
                "cumulative_with_current",
                aggregates.cumulative_amount_30d + local_amount,
            )
            .set(
                "transaction_count_24h",
                Value::from(aggregates.transaction_count_24h),
            )
            .set(
                "transaction_count_30d",
                Value::from(aggregates.transaction_count_30d),
            );
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_trade_snapshot_fields() {
        let aggregates = CustomerAggregates {
            cumulative_amount_30d: dec!(4100000),
            transaction_count_24h: 2,
            transaction_count_30d: 9,
            last_transaction_at: None,
        };
        let snapshot = DataSnapshot::for_trade(
            "buy",
            "USD",
            dec!(30000),
            dec!(1065000),
            dec!(35.50),
            "TEST9876543210",
            "TH",
            &aggregates,
        );

        assert_eq!(
            snapshot.get("direction"),
            Some(&Value::String("buy".to_string()))
        );
        assert_eq!(
            snapshot.get("local_amount"),
            Some(&Value::String("1065000".to_string()))
        );
        // Projected cumulative includes the current trade
        assert_eq!(
            snapshot.get("cumulative_with_current"),
            Some(&Value::String("5165000".to_string()))
        );
        assert_eq!(snapshot.get("transaction_count_24h"), Some(&Value::from(2)));
        assert_eq!(snapshot.get("missing_field"), None);
    }
}
