//! Exchange domain errors

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which side of the trade is short of inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortSide {
    /// The branch lacks foreign notes to sell
    Foreign,
    /// The branch lacks local currency to pay out
    Local,
}

/// Errors that can occur in the exchange domain
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("No rate published for {currency_code} at branch {branch} on {date}")]
    NoRateToday {
        branch: String,
        currency_code: String,
        date: chrono::NaiveDate,
    },

    #[error(
        "Insufficient {currency_code} balance on the {side:?} side: available {available}, required {required}, short by {shortfall}"
    )]
    InsufficientBalance {
        side: ShortSide,
        available: Decimal,
        required: Decimal,
        shortfall: Decimal,
        currency_code: String,
    },

    #[error("Amount exceeds the approved reservation envelope: approved {approved}, requested {requested}")]
    AmountExceedsApproved {
        approved: Decimal,
        requested: Decimal,
    },

    #[error("Balance would go negative: {0}")]
    BalanceUnderflow(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid trade direction: {0}")]
    InvalidDirection(String),

    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
}

impl ExchangeError {
    /// Builds an insufficient-balance error from the observed figures
    pub fn insufficient(
        side: ShortSide,
        available: Decimal,
        required: Decimal,
        currency_code: &str,
    ) -> Self {
        ExchangeError::InsufficientBalance {
            side,
            available,
            required,
            shortfall: required - available,
            currency_code: currency_code.to_string(),
        }
    }
}
