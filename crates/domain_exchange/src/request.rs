//! Validate/execute wire contracts
//!
//! These are the inbound shapes the HTTP layer maps onto. Validation never
//! mutates state; execution returns the persisted transaction together with
//! the compliance outcome for both regulators.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{BranchId, CurrencyId, OperatorId, ReservationId};

use crate::trade::{ExchangeTransaction, TradeDirection};

/// Request to validate a planned trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub branch_id: BranchId,
    pub currency_id: CurrencyId,
    pub direction: TradeDirection,
    /// Unsigned foreign amount the customer wants to exchange
    pub amount: Decimal,
    pub customer_id: String,
    pub customer_name: String,
    /// Rate the front-end displayed; execution re-resolves the board rate
    pub rate_hint: Option<Decimal>,
}

/// One matched trigger rule, surfaced to the operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerDetail {
    pub rule_name: String,
    pub report_type: String,
    pub allow_continue: bool,
    pub warning: Option<String>,
}

/// Outcome of validating a planned trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResult {
    pub ok: bool,
    pub buy_rate: Option<Decimal>,
    pub sell_rate: Option<Decimal>,
    /// Paying-side inventory available for this trade
    pub available_amount: Decimal,
    pub triggered: bool,
    pub trigger_details: Vec<TriggerDetail>,
    /// Set when an approved reservation covers this trade
    pub bypass_reservation: Option<ReservationId>,
}

/// Foreign-currency deposit account details, present when the trade is
/// funded through an FCD account and must produce an FCD event row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcdAccount {
    pub bank_name: String,
    pub account_no: String,
    /// Account balance after the movement
    pub balance: Decimal,
}

/// Request to execute a trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub branch_id: BranchId,
    pub currency_id: CurrencyId,
    pub direction: TradeDirection,
    pub amount: Decimal,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_country: String,
    pub exchange_rate: Decimal,
    /// Local amount the cashier settled; re-derived and checked server-side
    pub local_amount: Decimal,
    pub operator_id: OperatorId,
    pub purpose: Option<String>,
    pub remarks: Option<String>,
    pub fcd_account: Option<FcdAccount>,
}

/// Per-regime compliance outcome of an executed trade
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegimeOutcome {
    pub triggered: bool,
    /// Report numbers created by this execution
    pub reports: Vec<String>,
}

/// Compliance outcome across both regulators
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplianceOutcome {
    pub amlo: RegimeOutcome,
    pub bot: RegimeOutcome,
}

/// Result of executing a trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResult {
    pub transaction: ExchangeTransaction,
    pub compliance: ComplianceOutcome,
    pub executed_at: DateTime<Utc>,
}
