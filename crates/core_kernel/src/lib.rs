//! Core Kernel - Foundational types and utilities for the exchange platform
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Temporal types for Buddhist-era reporting periods
//! - Common identifiers and value objects

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod error;

pub use money::{CurrencyCode, ExchangeRate, Money, MoneyError};
pub use temporal::{ReportingWindow, ThaiMonth, YearMonth, bangkok_today, buddhist_year};
pub use identifiers::{
    AdjustmentId, AmloReportId, BotEventId, BranchId, CurrencyId, FieldDefId,
    GroupId, OperatorId, ReservationId, RuleId, SequenceRowId, TransactionId,
};
pub use error::CoreError;
