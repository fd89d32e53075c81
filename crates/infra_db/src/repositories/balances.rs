//! Balance repository
//!
//! Per-(branch, currency) inventory rows. Rows appear lazily at zero on
//! first reference and are mutated only under a row lock held to the end
//! of the enclosing transaction. Sufficiency is the validator's concern;
//! this layer only enforces the optional non-negative floor.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use domain_exchange::BalanceMutation;

use crate::error::DatabaseError;

/// Database row for a balance
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BalanceRow {
    pub branch_id: Uuid,
    pub currency_id: Uuid,
    pub amount: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Repository for branch currency inventories
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    pool: PgPool,
}

impl BalanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reads a balance without locking; absent rows read as zero
    pub async fn get(&self, branch_id: Uuid, currency_id: Uuid) -> Result<Decimal, DatabaseError> {
        let row: Option<(Decimal,)> = sqlx::query_as(
            "SELECT amount FROM exchange_balances WHERE branch_id = $1 AND currency_id = $2",
        )
        .bind(branch_id)
        .bind(currency_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(amount,)| amount).unwrap_or_default())
    }

    /// Applies a signed delta to one balance row inside the caller's
    /// transaction
    ///
    /// Creates the row at zero on first reference. With `lock_for_update`
    /// the row lock is held until the enclosing transaction ends, and the
    /// returned pair is the before/after observed within that locked view.
    /// When `allow_overdraw` is false a mutation that would leave the row
    /// negative fails instead of writing.
    pub async fn mutate(
        conn: &mut PgConnection,
        branch_id: Uuid,
        currency_id: Uuid,
        delta: Decimal,
        lock_for_update: bool,
        allow_overdraw: bool,
    ) -> Result<BalanceMutation, DatabaseError> {
        sqlx::query(
            "INSERT INTO exchange_balances (branch_id, currency_id, amount, updated_at) \
             VALUES ($1, $2, 0, now()) \
             ON CONFLICT (branch_id, currency_id) DO NOTHING",
        )
        .bind(branch_id)
        .bind(currency_id)
        .execute(&mut *conn)
        .await?;

        let select = if lock_for_update {
            "SELECT amount FROM exchange_balances \
             WHERE branch_id = $1 AND currency_id = $2 FOR UPDATE"
        } else {
            "SELECT amount FROM exchange_balances \
             WHERE branch_id = $1 AND currency_id = $2"
        };
        let (before,): (Decimal,) = sqlx::query_as(select)
            .bind(branch_id)
            .bind(currency_id)
            .fetch_one(&mut *conn)
            .await?;

        let after = before + delta;
        if after < Decimal::ZERO && !allow_overdraw {
            return Err(DatabaseError::ConstraintViolation(format!(
                "balance underflow on ({branch_id}, {currency_id}): {before} + {delta} < 0"
            )));
        }

        sqlx::query(
            "UPDATE exchange_balances SET amount = $3, updated_at = now() \
             WHERE branch_id = $1 AND currency_id = $2",
        )
        .bind(branch_id)
        .bind(currency_id)
        .bind(after)
        .execute(&mut *conn)
        .await?;

        Ok(BalanceMutation { before, after })
    }

    /// Records a manual inventory adjustment inside the caller's transaction
    pub async fn insert_adjustment(
        conn: &mut PgConnection,
        adjustment: &NewAdjustment,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO balance_adjustments (id, branch_id, currency_id, delta, operator_id, remarks, adjusted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(adjustment.id)
        .bind(adjustment.branch_id)
        .bind(adjustment.currency_id)
        .bind(adjustment.delta)
        .bind(adjustment.operator_id)
        .bind(adjustment.remarks.as_deref())
        .bind(adjustment.adjusted_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Adjustments at a branch inside a window, oldest first
    pub async fn list_adjustments_in_window(
        &self,
        branch_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AdjustmentRow>, DatabaseError> {
        let rows = sqlx::query_as(
            "SELECT id, branch_id, currency_id, delta, operator_id, remarks, adjusted_at \
             FROM balance_adjustments \
             WHERE branch_id = $1 AND adjusted_at >= $2 AND adjusted_at < $3 \
             ORDER BY adjusted_at, id",
        )
        .bind(branch_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Database row for a balance adjustment
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdjustmentRow {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub currency_id: Uuid,
    pub delta: Decimal,
    pub operator_id: Uuid,
    pub remarks: Option<String>,
    pub adjusted_at: DateTime<Utc>,
}

/// Data for recording an adjustment
#[derive(Debug, Clone)]
pub struct NewAdjustment {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub currency_id: Uuid,
    pub delta: Decimal,
    pub operator_id: Uuid,
    pub remarks: Option<String>,
    pub adjusted_at: DateTime<Utc>,
}
