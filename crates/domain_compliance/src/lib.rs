//! Compliance domain - data-driven trigger rules for AMLO reporting
//!
//! Branch staff never hard-code thresholds: each report type carries a set
//! of trigger rules persisted as JSON expression trees, evaluated against a
//! flat snapshot of the trade plus the customer's cumulative history. A
//! matched rule either blocks the trade until an auditor approves a
//! reservation (`allow_continue = false`) or lets it proceed with a warning.

pub mod aggregates;
pub mod engine;
pub mod error;
pub mod expression;
pub mod rules;
pub mod snapshot;

pub use aggregates::{AggregateScope, CustomerAggregates};
pub use engine::{evaluate, RuleVerdict};
pub use error::ComplianceError;
pub use expression::{Logic, Op, RuleExpr};
pub use rules::{rules_in_scope, BotForm, ReportType, TriggerRule};
pub use snapshot::DataSnapshot;
