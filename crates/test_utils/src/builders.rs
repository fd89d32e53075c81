//! Test data builders
//!
//! Builder patterns for constructing test data with sensible defaults;
//! tests specify only the fields they care about.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use core_kernel::{BranchId, CurrencyId, OperatorId, RuleId};
use domain_compliance::{Op, ReportType, RuleExpr, TriggerRule};
use domain_exchange::{ExecuteRequest, TradeDirection};
use domain_reservation::SaveReservation;

use crate::fixtures::CustomerFixtures;

/// Builder for trade execution requests
pub struct ExecuteRequestBuilder {
    branch_id: BranchId,
    currency_id: CurrencyId,
    direction: TradeDirection,
    amount: Decimal,
    rate: Decimal,
    customer_id: String,
    customer_name: String,
    operator_id: OperatorId,
}

impl Default for ExecuteRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecuteRequestBuilder {
    pub fn new() -> Self {
        Self {
            branch_id: BranchId::new(),
            currency_id: CurrencyId::new(),
            direction: TradeDirection::Buy,
            amount: dec!(1000),
            rate: dec!(35.50),
            customer_id: CustomerFixtures::thai_citizen_id().to_string(),
            customer_name: CustomerFixtures::name().to_string(),
            operator_id: OperatorId::new(),
        }
    }

    pub fn with_branch(mut self, branch_id: BranchId) -> Self {
        self.branch_id = branch_id;
        self
    }

    pub fn with_currency(mut self, currency_id: CurrencyId) -> Self {
        self.currency_id = currency_id;
        self
    }

    pub fn with_direction(mut self, direction: TradeDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_rate(mut self, rate: Decimal) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_customer(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.customer_id = id.into();
        self.customer_name = name.into();
        self
    }

    pub fn with_operator(mut self, operator_id: OperatorId) -> Self {
        self.operator_id = operator_id;
        self
    }

    pub fn build(self) -> ExecuteRequest {
        let local_amount = (self.amount * self.rate).round_dp(2);
        ExecuteRequest {
            branch_id: self.branch_id,
            currency_id: self.currency_id,
            direction: self.direction,
            amount: self.amount,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            customer_country: "TH".to_string(),
            exchange_rate: self.rate,
            local_amount,
            operator_id: self.operator_id,
            purpose: None,
            remarks: None,
            fcd_account: None,
        }
    }
}

/// Builder for reservation submissions
pub struct SaveReservationBuilder {
    branch_id: BranchId,
    currency_id: CurrencyId,
    direction: TradeDirection,
    amount: Decimal,
    local_amount: Decimal,
    rate: Decimal,
    report_type: ReportType,
    customer_id: String,
    operator_id: OperatorId,
}

impl Default for SaveReservationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveReservationBuilder {
    pub fn new() -> Self {
        Self {
            branch_id: BranchId::new(),
            currency_id: CurrencyId::new(),
            direction: TradeDirection::Buy,
            amount: dec!(70000),
            local_amount: dec!(2485000),
            rate: dec!(35.50),
            report_type: ReportType::Amlo101,
            customer_id: CustomerFixtures::thai_citizen_id().to_string(),
            operator_id: OperatorId::new(),
        }
    }

    pub fn with_branch(mut self, branch_id: BranchId) -> Self {
        self.branch_id = branch_id;
        self
    }

    pub fn with_currency(mut self, currency_id: CurrencyId) -> Self {
        self.currency_id = currency_id;
        self
    }

    pub fn with_amounts(mut self, foreign: Decimal, local: Decimal) -> Self {
        self.amount = foreign;
        self.local_amount = local;
        self
    }

    pub fn with_report_type(mut self, report_type: ReportType) -> Self {
        self.report_type = report_type;
        self
    }

    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = customer_id.into();
        self
    }

    pub fn with_operator(mut self, operator_id: OperatorId) -> Self {
        self.operator_id = operator_id;
        self
    }

    pub fn build(self) -> SaveReservation {
        SaveReservation {
            customer_id: self.customer_id,
            customer_name: CustomerFixtures::name().to_string(),
            customer_country: "TH".to_string(),
            currency_id: self.currency_id,
            direction: self.direction,
            amount: self.amount,
            local_amount: self.local_amount,
            rate: self.rate,
            trigger_type: "threshold".to_string(),
            report_type: self.report_type,
            form_data: json!({
                "id_type": "citizen",
                "occupation": "merchant",
            }),
            exchange_type: None,
            funding_source: None,
            branch_id: self.branch_id,
            operator_id: self.operator_id,
        }
    }
}

/// Builder for trigger rules
pub struct RuleBuilder {
    id: RuleId,
    report_type: ReportType,
    expression: RuleExpr,
    priority: i32,
    allow_continue: bool,
    branch_id: Option<BranchId>,
    active: bool,
    branch_scope_aggregates: bool,
}

impl Default for RuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleBuilder {
    pub fn new() -> Self {
        Self {
            id: RuleId::from_uuid(Uuid::new_v4()),
            report_type: ReportType::Amlo101,
            expression: RuleExpr::predicate("local_amount", Op::Ge, json!("2000000")),
            priority: 0,
            allow_continue: false,
            branch_id: None,
            active: true,
            branch_scope_aggregates: false,
        }
    }

    pub fn with_expression(mut self, expression: RuleExpr) -> Self {
        self.expression = expression;
        self
    }

    pub fn with_report_type(mut self, report_type: ReportType) -> Self {
        self.report_type = report_type;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn allow_continue(mut self, allow: bool) -> Self {
        self.allow_continue = allow;
        self
    }

    pub fn scoped_to(mut self, branch_id: BranchId) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn branch_local_aggregates(mut self) -> Self {
        self.branch_scope_aggregates = true;
        self
    }

    pub fn build(self) -> TriggerRule {
        TriggerRule {
            id: self.id,
            name: HashMap::from([("en".to_string(), "test rule".to_string())]),
            report_type: self.report_type,
            expression: self.expression,
            priority: self.priority,
            allow_continue: self.allow_continue,
            warnings: HashMap::new(),
            branch_id: self.branch_id,
            active: self.active,
            branch_scope_aggregates: self.branch_scope_aggregates,
        }
    }
}
