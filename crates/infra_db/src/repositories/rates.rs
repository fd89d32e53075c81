//! Rate-board lookups
//!
//! Rates are published per (branch, currency, date) by the rate-board
//! system. The core reads the row for the Bangkok business day; a missing
//! row blocks the trade at validation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Database row for a published rate
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RateRow {
    pub branch_id: Uuid,
    pub currency_id: Uuid,
    pub rate_date: NaiveDate,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
}

/// Read-only repository over the rate board
#[derive(Debug, Clone)]
pub struct RateRepository {
    pool: PgPool,
}

impl RateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The rate published for a currency at a branch on a date
    pub async fn rate_for(
        &self,
        branch_id: Uuid,
        currency_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<RateRow>, DatabaseError> {
        let row = sqlx::query_as(
            "SELECT branch_id, currency_id, rate_date, buy_rate, sell_rate \
             FROM exchange_rates \
             WHERE branch_id = $1 AND currency_id = $2 AND rate_date = $3",
        )
        .bind(branch_id)
        .bind(currency_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// The day's USD reference rate at a branch, if USD is priced
    pub async fn usd_rate_for(
        &self,
        branch_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<RateRow>, DatabaseError> {
        let row = sqlx::query_as(
            "SELECT r.branch_id, r.currency_id, r.rate_date, r.buy_rate, r.sell_rate \
             FROM exchange_rates r \
             JOIN currencies c ON c.id = r.currency_id \
             WHERE r.branch_id = $1 AND c.code = 'USD' AND r.rate_date = $2",
        )
        .bind(branch_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
