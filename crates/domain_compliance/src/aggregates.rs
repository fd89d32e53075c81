//! Customer history aggregates
//!
//! Cumulative AMLO rules look at the customer, not the branch: a customer
//! splitting 5M THB of trades across three branches is still one customer
//! to the regulator. Aggregates therefore default to cross-branch; a rule
//! may opt into branch-local scope. The SQL window queries live in
//! `infra_db`; this module owns the shapes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Scope of the history window feeding cumulative rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateScope {
    /// All branches; the regulator's default view of a customer
    #[default]
    CrossBranch,
    /// Requesting branch only; per-rule opt-in
    BranchLocal,
}

/// Windowed sums and counts over one customer's completed transactions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAggregates {
    /// Sum of absolute local amounts over the trailing 30 days
    pub cumulative_amount_30d: Decimal,
    /// Completed transactions in the trailing 24 hours
    pub transaction_count_24h: i64,
    /// Completed transactions in the trailing 30 days
    pub transaction_count_30d: i64,
    pub last_transaction_at: Option<DateTime<Utc>>,
}

impl CustomerAggregates {
    /// Aggregates for a customer with no history
    pub fn empty() -> Self {
        Self::default()
    }

    /// The trailing total as it would stand after a trade of `local_amount`
    pub fn projected_cumulative(&self, local_amount: Decimal) -> Decimal {
        self.cumulative_amount_30d + local_amount
    }
}
