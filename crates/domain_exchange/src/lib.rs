//! Exchange domain - trades against branch currency inventories
//!
//! A trade is a two-sided mutation: the branch either buys foreign currency
//! from a walk-in customer (foreign inventory up, local inventory down) or
//! sells to one (the reverse). This crate owns the trade model, the
//! validate/execute wire contracts, split-order decomposition, and the
//! balance-lock ordering rule. Persistence lives in `infra_db`.

pub mod balance;
pub mod error;
pub mod request;
pub mod trade;

pub use balance::{Balance, BalanceMutation, lock_order};
pub use error::{ExchangeError, ShortSide};
pub use request::{
    ComplianceOutcome, ExecuteRequest, ExecuteResult, FcdAccount, RegimeOutcome,
    TriggerDetail, ValidateRequest, ValidateResult,
};
pub use trade::{ExchangeTransaction, SignedLegs, SplitOrder, SplitLeg, TradeDirection};
